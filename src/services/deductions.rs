use serde::{Deserialize, Serialize};

use crate::database::models::{ContributionBracket, ContributionKind, SalaryBracket, TaxBracket};
use crate::database::PayrollStore;
use crate::error::{SoftFailure, SoftFallback};
use crate::services::time_math::round2;

/// Gross-to-net reduction for one pay period. Employer shares are informational
/// and never subtracted from the employee's net.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DeductionBreakdown {
    pub sss_employee: f64,
    pub sss_employer: f64,
    pub philhealth: f64,
    pub pagibig_employee: f64,
    pub pagibig_employer: f64,
    pub bir_tax: f64,
    pub total_deductions: f64,
    pub net_salary: f64,
}

/// Row whose inclusive range contains `salary`, latest `effective_date` first.
pub fn match_bracket<B: SalaryBracket>(brackets: &[B], salary: f64) -> Result<&B, SoftFailure> {
    brackets
        .iter()
        .filter(|bracket| bracket.contains(salary))
        .max_by_key(|bracket| bracket.effective_date())
        .ok_or(SoftFailure::NoMatchingRow(salary))
}

pub fn withholding_tax(bracket: &TaxBracket, salary: f64) -> f64 {
    round2(bracket.fixed_tax + (salary - bracket.excess_over).max(0.0) * bracket.percentage_rate)
}

/// Snapshot of every bracket table. A table that cannot be read is empty.
#[derive(Debug, Clone, Default)]
pub struct DeductionTables {
    pub sss: Vec<ContributionBracket>,
    pub philhealth: Vec<ContributionBracket>,
    pub pagibig: Vec<ContributionBracket>,
    pub tax: Vec<TaxBracket>,
}

impl DeductionTables {
    pub async fn load<S: PayrollStore>(store: &S) -> Self {
        DeductionTables {
            sss: Self::load_contributions(store, ContributionKind::Sss).await,
            philhealth: Self::load_contributions(store, ContributionKind::PhilHealth).await,
            pagibig: Self::load_contributions(store, ContributionKind::PagIbig).await,
            tax: store
                .list_tax_brackets()
                .await
                .map_err(|err| SoftFailure::TableUnavailable(format!("tax brackets: {}", err)))
                .or_soft_default("tax brackets"),
        }
    }

    async fn load_contributions<S: PayrollStore>(
        store: &S,
        kind: ContributionKind,
    ) -> Vec<ContributionBracket> {
        store
            .list_contribution_brackets(kind)
            .await
            .map_err(|err| SoftFailure::TableUnavailable(format!("{} brackets: {}", kind, err)))
            .or_soft_default("contribution brackets")
    }

    fn shares(&self, kind: ContributionKind, salary: f64) -> (f64, f64) {
        let table = match kind {
            ContributionKind::Sss => &self.sss,
            ContributionKind::PhilHealth => &self.philhealth,
            ContributionKind::PagIbig => &self.pagibig,
        };

        match match_bracket(table, salary) {
            Ok(bracket) => (round2(bracket.employee_share), round2(bracket.employer_share)),
            Err(failure) => {
                log::warn!("{} contribution is zero: {}", kind, failure);
                (0.0, 0.0)
            }
        }
    }

    pub fn calculate(&self, gross_salary: f64) -> DeductionBreakdown {
        calculate_deductions(self, gross_salary)
    }
}

pub fn calculate_deductions(tables: &DeductionTables, gross_salary: f64) -> DeductionBreakdown {
    let (sss_employee, sss_employer) = tables.shares(ContributionKind::Sss, gross_salary);
    let (philhealth, _) = tables.shares(ContributionKind::PhilHealth, gross_salary);
    let (pagibig_employee, pagibig_employer) = tables.shares(ContributionKind::PagIbig, gross_salary);

    let bir_tax = match_bracket(&tables.tax, gross_salary)
        .map(|bracket| withholding_tax(bracket, gross_salary))
        .or_soft_default("withholding tax");

    let total_deductions = round2(sss_employee + philhealth + pagibig_employee + bir_tax);

    DeductionBreakdown {
        sss_employee,
        sss_employer,
        philhealth,
        pagibig_employee,
        pagibig_employer,
        bir_tax,
        total_deductions,
        net_salary: round2(gross_salary - total_deductions),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::{MemoryStore, ReferenceTable};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn contribution(
        kind: ContributionKind,
        range: (f64, f64),
        shares: (f64, f64),
        effective: &str,
    ) -> ContributionBracket {
        ContributionBracket {
            id: Uuid::new_v4(),
            kind,
            salary_range_min: range.0,
            salary_range_max: range.1,
            employee_share: shares.0,
            employer_share: shares.1,
            effective_date: effective.parse::<NaiveDate>().unwrap(),
        }
    }

    fn tax(range: (f64, f64), fixed_tax: f64, excess_over: f64, rate: f64) -> TaxBracket {
        TaxBracket {
            id: Uuid::new_v4(),
            salary_range_min: range.0,
            salary_range_max: range.1,
            fixed_tax,
            excess_over,
            percentage_rate: rate,
            effective_date: "2023-01-01".parse().unwrap(),
        }
    }

    fn tables() -> DeductionTables {
        DeductionTables {
            sss: vec![
                contribution(ContributionKind::Sss, (0.0, 99_999.0), (500.0, 1_000.0), "2023-01-01"),
                contribution(ContributionKind::Sss, (0.0, 99_999.0), (600.0, 1_200.0), "2025-01-01"),
            ],
            philhealth: vec![contribution(
                ContributionKind::PhilHealth,
                (10_000.0, 99_999.0),
                (250.0, 250.0),
                "2024-01-01",
            )],
            pagibig: vec![contribution(
                ContributionKind::PagIbig,
                (0.0, 99_999.0),
                (100.0, 100.0),
                "2024-01-01",
            )],
            tax: vec![
                tax((0.0, 20_833.0), 0.0, 0.0, 0.0),
                tax((20_833.01, 33_332.0), 0.0, 20_833.0, 0.15),
            ],
        }
    }

    #[test]
    fn latest_effective_row_wins() {
        let tables = tables();
        let bracket = match_bracket(&tables.sss, 20_000.0).unwrap();

        assert_eq!(bracket.employee_share, 600.0);
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let tables = tables();

        assert!(match_bracket(&tables.philhealth, 10_000.0).is_ok());
        assert!(match_bracket(&tables.philhealth, 99_999.0).is_ok());
        assert_eq!(
            match_bracket(&tables.philhealth, 9_999.99).unwrap_err(),
            SoftFailure::NoMatchingRow(9_999.99)
        );
    }

    #[test]
    fn progressive_tax_applies_excess_rate() {
        let breakdown = calculate_deductions(&tables(), 25_833.0);

        assert_eq!(breakdown.bir_tax, 750.0);
        assert_eq!(breakdown.sss_employee, 600.0);
        assert_eq!(breakdown.sss_employer, 1_200.0);
        assert_eq!(breakdown.philhealth, 250.0);
        assert_eq!(breakdown.pagibig_employee, 100.0);
        assert_eq!(breakdown.total_deductions, 1_700.0);
        assert_eq!(breakdown.net_salary, 24_133.0);
    }

    #[test]
    fn missing_rows_contribute_zero() {
        let breakdown = calculate_deductions(&tables(), 5_000.0);

        assert_eq!(breakdown.philhealth, 0.0);
        assert_eq!(breakdown.bir_tax, 0.0);
        assert_eq!(breakdown.total_deductions, 700.0);
        assert_eq!(breakdown.net_salary, 4_300.0);
    }

    #[tokio::test]
    async fn unavailable_tables_degrade_to_zero() {
        let store = MemoryStore::new();
        store
            .insert_contribution_bracket(contribution(
                ContributionKind::PagIbig,
                (0.0, 99_999.0),
                (100.0, 100.0),
                "2024-01-01",
            ))
            .unwrap();
        store.make_unavailable(ReferenceTable::Tax).unwrap();
        store
            .make_unavailable(ReferenceTable::Contributions(ContributionKind::Sss))
            .unwrap();

        let tables = DeductionTables::load(&store).await;
        let breakdown = tables.calculate(30_000.0);

        assert_eq!(breakdown.sss_employee, 0.0);
        assert_eq!(breakdown.bir_tax, 0.0);
        assert_eq!(breakdown.pagibig_employee, 100.0);
        assert_eq!(breakdown.net_salary, 29_900.0);
    }
}
