use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::string_enum;

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
    #[serde(rename_all = "snake_case")]
    pub enum ContributionKind {
        Sss => "sss",
        PhilHealth => "philhealth",
        PagIbig => "pagibig",
    }
}

/// Row of a salary-bracket table. Lookups pick the latest `effective_date`
/// among rows whose inclusive range contains the salary.
pub trait SalaryBracket {
    fn salary_range_min(&self) -> f64;
    fn salary_range_max(&self) -> f64;
    fn effective_date(&self) -> NaiveDate;

    fn contains(&self, salary: f64) -> bool {
        salary >= self.salary_range_min() && salary <= self.salary_range_max()
    }
}

/// SSS / PhilHealth / Pag-IBIG contribution bracket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct ContributionBracket {
    pub id: Uuid,
    pub kind: ContributionKind,
    pub salary_range_min: f64,
    pub salary_range_max: f64,
    pub employee_share: f64,
    pub employer_share: f64,
    pub effective_date: NaiveDate,
}

/// BIR withholding bracket: `fixed_tax + (salary - excess_over) * percentage_rate`,
/// with `percentage_rate` stored as a fraction (0.20 for 20%).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct TaxBracket {
    pub id: Uuid,
    pub salary_range_min: f64,
    pub salary_range_max: f64,
    pub fixed_tax: f64,
    pub excess_over: f64,
    pub percentage_rate: f64,
    pub effective_date: NaiveDate,
}

impl SalaryBracket for ContributionBracket {
    fn salary_range_min(&self) -> f64 {
        self.salary_range_min
    }
    fn salary_range_max(&self) -> f64 {
        self.salary_range_max
    }
    fn effective_date(&self) -> NaiveDate {
        self.effective_date
    }
}

impl SalaryBracket for TaxBracket {
    fn salary_range_min(&self) -> f64 {
        self.salary_range_min
    }
    fn salary_range_max(&self) -> f64 {
        self.salary_range_max
    }
    fn effective_date(&self) -> NaiveDate {
        self.effective_date
    }
}

/// Marks a pay period as paid. Unique on (period_from, period_to).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct PayrollRun {
    pub id: Uuid,
    pub period_from: NaiveDate,
    pub period_to: NaiveDate,
    pub total_gross: f64,
    pub actor_user_id: Uuid,
    pub created_at: DateTime<Utc>,
}
