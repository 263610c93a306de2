use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::string_enum;

/// Working days per month used to derive a daily rate from a monthly salary.
pub const WORKING_DAYS_PER_MONTH: f64 = 22.0;
/// Hours per working day used to derive an hourly rate from a daily rate.
pub const HOURS_PER_DAY: f64 = 8.0;
/// Default premium applied to the hourly rate for ordinary-day overtime.
pub const DEFAULT_OVERTIME_MULTIPLIER: f64 = 1.25;

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "snake_case")]
    pub enum EmploymentType {
        Regular => "regular",
        Probationary => "probationary",
        Contractual => "contractual",
        PartTime => "part_time",
        Daily => "daily",
        Hourly => "hourly",
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "snake_case")]
    pub enum EmployeeStatus {
        Active => "active",
        Inactive => "inactive",
        Deleted => "deleted",
    }
}

/// The one rate that is authoritative for an employment type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "basis", content = "amount", rename_all = "snake_case")]
pub enum Compensation {
    Monthly(f64),
    Daily(f64),
    Hourly(f64),
}

impl EmploymentType {
    /// Wraps `amount` in the compensation basis this employment type is paid on.
    pub fn compensation(&self, amount: f64) -> Compensation {
        match self {
            EmploymentType::Regular | EmploymentType::Probationary | EmploymentType::Contractual => {
                Compensation::Monthly(amount)
            }
            EmploymentType::Daily => Compensation::Daily(amount),
            EmploymentType::PartTime | EmploymentType::Hourly => Compensation::Hourly(amount),
        }
    }
}

/// Every rate derived from the authoritative one, computed once.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Rates {
    pub monthly: f64,
    pub daily: f64,
    pub hourly: f64,
    pub overtime: f64,
}

impl Rates {
    pub fn derive(compensation: Compensation, overtime_override: Option<f64>) -> Self {
        let (monthly, daily, hourly) = match compensation {
            Compensation::Monthly(monthly) => {
                let daily = monthly / WORKING_DAYS_PER_MONTH;
                (monthly, daily, daily / HOURS_PER_DAY)
            }
            Compensation::Daily(daily) => (daily * WORKING_DAYS_PER_MONTH, daily, daily / HOURS_PER_DAY),
            Compensation::Hourly(hourly) => {
                let daily = hourly * HOURS_PER_DAY;
                (daily * WORKING_DAYS_PER_MONTH, daily, hourly)
            }
        };

        let overtime = overtime_override
            .filter(|rate| *rate > 0.0)
            .unwrap_or(hourly * DEFAULT_OVERTIME_MULTIPLIER);

        Rates {
            monthly,
            daily,
            hourly,
            overtime,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Employee {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub employment_type: EmploymentType,
    pub compensation: Compensation,
    pub rates: Rates,
    pub site_id: Option<Uuid>,
    pub status: EmployeeStatus,
}

impl Employee {
    /// `rate` is read as monthly salary, daily rate or hourly rate depending on
    /// `employment_type`.
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        employment_type: EmploymentType,
        rate: f64,
        overtime_rate: Option<f64>,
    ) -> Self {
        let compensation = employment_type.compensation(rate);

        Employee {
            id: Uuid::new_v4(),
            code: code.into(),
            name: name.into(),
            employment_type,
            compensation,
            rates: Rates::derive(compensation, overtime_rate),
            site_id: None,
            status: EmployeeStatus::Active,
        }
    }

    pub fn with_site(mut self, site_id: Uuid) -> Self {
        self.site_id = Some(site_id);
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == EmployeeStatus::Active
    }

    /// Hourly rate for regular hours, read off the authoritative basis.
    pub fn regular_hourly_rate(&self) -> f64 {
        match self.compensation {
            Compensation::Monthly(monthly) => monthly / WORKING_DAYS_PER_MONTH / HOURS_PER_DAY,
            Compensation::Daily(daily) => daily / HOURS_PER_DAY,
            Compensation::Hourly(hourly) => hourly,
        }
    }
}

/// Employee row as stored; every rate column is cached, one of them authoritative.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EmployeeRow {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub employment_type: EmploymentType,
    pub base_salary: Option<f64>,
    pub daily_rate: Option<f64>,
    pub hourly_rate: Option<f64>,
    pub overtime_rate: Option<f64>,
    pub site_id: Option<Uuid>,
    pub status: EmployeeStatus,
}

impl TryFrom<EmployeeRow> for Employee {
    type Error = String;

    fn try_from(row: EmployeeRow) -> Result<Self, Self::Error> {
        let authoritative = match row.employment_type.compensation(0.0) {
            Compensation::Monthly(_) => row.base_salary,
            Compensation::Daily(_) => row.daily_rate,
            Compensation::Hourly(_) => row.hourly_rate,
        };
        let rate = authoritative.ok_or_else(|| {
            format!(
                "employee {} ({}) has no {} rate",
                row.code, row.id, row.employment_type
            )
        })?;
        let compensation = row.employment_type.compensation(rate);

        Ok(Employee {
            id: row.id,
            code: row.code,
            name: row.name,
            employment_type: row.employment_type,
            compensation,
            rates: Rates::derive(compensation, row.overtime_rate),
            site_id: row.site_id,
            status: row.status,
        })
    }
}

/// A work site with an optional geofence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Site {
    pub id: Uuid,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn monthly_salary_derives_daily_and_hourly() {
        let rates = Rates::derive(Compensation::Monthly(17_600.0), None);

        assert_eq!(rates.daily, 800.0);
        assert_eq!(rates.hourly, 100.0);
        assert_eq!(rates.overtime, 125.0);
    }

    #[test]
    fn explicit_overtime_rate_wins_over_default_premium() {
        let rates = Rates::derive(Compensation::Hourly(100.0), Some(140.0));

        assert_eq!(rates.overtime, 140.0);
        assert_eq!(rates.monthly, 17_600.0);
    }

    #[test]
    fn row_without_authoritative_rate_is_rejected() {
        let row = EmployeeRow {
            id: Uuid::new_v4(),
            code: "E-001".to_string(),
            name: "Row".to_string(),
            employment_type: EmploymentType::Daily,
            base_salary: Some(20_000.0),
            daily_rate: None,
            hourly_rate: None,
            overtime_rate: None,
            site_id: None,
            status: EmployeeStatus::Active,
        };

        assert!(Employee::try_from(row).is_err());
    }
}
