use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::database::models::{
    Action, AttendanceFilter, AttendanceRecord, Employee, EmploymentType, PayBreakdown,
    PayrollRun, PunchState,
};
use crate::database::PayrollStore;
use crate::error::AppError;
use crate::services::activity_logger::ActivityLogger;
use crate::services::attendance::find_employee;
use crate::services::deductions::{DeductionBreakdown, DeductionTables};
use crate::services::time_math::round2;

/// Per-employee totals over a pay period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub days_worked: u32,
    pub leave_days: u32,
    /// Records with a time-in and no time-out.
    pub open_records: u32,
    pub late_minutes: i64,
    pub early_out_minutes: i64,
    #[serde(flatten)]
    pub totals: PayBreakdown,
}

impl PeriodSummary {
    pub fn gross_pay(&self) -> f64 {
        self.totals.total_daily_pay
    }
}

pub fn summarize(records: &[AttendanceRecord]) -> PeriodSummary {
    let mut summary = PeriodSummary::default();

    for record in records {
        if record.is_leave() {
            summary.leave_days += 1;
            continue;
        }
        match record.punch_state() {
            PunchState::Complete => summary.days_worked += 1,
            PunchState::InProgress => summary.open_records += 1,
            PunchState::NoRecord => {}
        }
        summary.late_minutes += record.late_minutes as i64;
        summary.early_out_minutes += record.early_out_minutes as i64;

        let totals = &mut summary.totals;
        let pay = &record.pay;
        totals.hours_worked += pay.hours_worked;
        totals.regular_hours += pay.regular_hours;
        totals.overtime_hours += pay.overtime_hours;
        totals.night_differential_hours += pay.night_differential_hours;
        totals.regular_pay += pay.regular_pay;
        totals.overtime_pay += pay.overtime_pay;
        totals.night_differential_pay += pay.night_differential_pay;
        totals.holiday_pay += pay.holiday_pay;
        totals.rest_day_pay += pay.rest_day_pay;
        totals.total_daily_pay += pay.total_daily_pay;
    }

    let totals = &mut summary.totals;
    for value in [
        &mut totals.hours_worked,
        &mut totals.regular_hours,
        &mut totals.overtime_hours,
        &mut totals.night_differential_hours,
        &mut totals.regular_pay,
        &mut totals.overtime_pay,
        &mut totals.night_differential_pay,
        &mut totals.holiday_pay,
        &mut totals.rest_day_pay,
        &mut totals.total_daily_pay,
    ] {
        *value = round2(*value);
    }

    summary
}

fn check_period(from: NaiveDate, to: NaiveDate) -> Result<(), AppError> {
    if from > to {
        return Err(AppError::BadRequest(format!(
            "Period start {} is after period end {}",
            from, to
        )));
    }
    Ok(())
}

pub async fn summarize_period<S: PayrollStore>(
    store: &S,
    employee_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<PeriodSummary, AppError> {
    check_period(from, to)?;
    let records = store
        .list_attendance(&AttendanceFilter {
            employee_id: Some(employee_id),
            from: Some(from),
            to: Some(to),
        })
        .await?;

    Ok(summarize(&records))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayslipEmployee {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub employment_type: EmploymentType,
}

impl From<&Employee> for PayslipEmployee {
    fn from(employee: &Employee) -> Self {
        PayslipEmployee {
            id: employee.id,
            code: employee.code.clone(),
            name: employee.name.clone(),
            employment_type: employee.employment_type,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payslip {
    pub employee: PayslipEmployee,
    pub period_from: NaiveDate,
    pub period_to: NaiveDate,
    pub summary: PeriodSummary,
    pub gross_pay: f64,
    pub deductions: DeductionBreakdown,
}

async fn build_payslip<S: PayrollStore>(
    store: &S,
    tables: &DeductionTables,
    employee: &Employee,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Payslip, AppError> {
    let summary = summarize_period(store, employee.id, from, to).await?;
    let gross_pay = summary.gross_pay();

    Ok(Payslip {
        employee: employee.into(),
        period_from: from,
        period_to: to,
        deductions: tables.calculate(gross_pay),
        gross_pay,
        summary,
    })
}

/// Period summary plus statutory deductions on the period's gross pay.
pub async fn payslip<S: PayrollStore>(
    store: &S,
    employee_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Payslip, AppError> {
    check_period(from, to)?;
    let employee = find_employee(store, employee_id).await?;
    let tables = DeductionTables::load(store).await;

    build_payslip(store, &tables, &employee, from, to).await
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayrollPreview {
    pub period_from: NaiveDate,
    pub period_to: NaiveDate,
    pub total_gross: f64,
    pub total_deductions: f64,
    pub total_net: f64,
    pub payslips: Vec<Payslip>,
}

/// Payslips for every active employee. Bracket tables are read once.
pub async fn preview_all<S: PayrollStore>(
    store: &S,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<PayrollPreview, AppError> {
    check_period(from, to)?;
    let tables = DeductionTables::load(store).await;
    let employees = store.list_active_employees().await?;

    let mut payslips = Vec::with_capacity(employees.len());
    for employee in &employees {
        payslips.push(build_payslip(store, &tables, employee, from, to).await?);
    }

    let total_gross = round2(payslips.iter().map(|slip| slip.gross_pay).sum());
    let total_deductions = round2(
        payslips
            .iter()
            .map(|slip| slip.deductions.total_deductions)
            .sum(),
    );
    let total_net = round2(payslips.iter().map(|slip| slip.deductions.net_salary).sum());

    Ok(PayrollPreview {
        period_from: from,
        period_to: to,
        total_gross,
        total_deductions,
        total_net,
        payslips,
    })
}

/// Marks a period as paid with the preview's total gross. A period can be marked
/// once; a second attempt is a conflict.
pub async fn mark_paid<S: PayrollStore>(
    store: &S,
    actor_user_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
    now: DateTime<Utc>,
) -> Result<PayrollRun, AppError> {
    let preview = preview_all(store, from, to).await?;

    let run = PayrollRun {
        id: Uuid::new_v4(),
        period_from: from,
        period_to: to,
        total_gross: preview.total_gross,
        actor_user_id,
        created_at: now,
    };
    store.insert_payroll_run(&run).await?;

    log::info!(
        "Payroll {} to {} marked paid: gross {:.2} for {} employees",
        from,
        to,
        run.total_gross,
        preview.payslips.len()
    );
    ActivityLogger::new(store)
        .log_payroll_activity(
            actor_user_id,
            run.id,
            Action::MARKED_PAID,
            format!("Payroll {} to {} marked as paid", from, to),
            Some(json!({
                "total_gross": preview.total_gross,
                "total_net": preview.total_net,
                "employees": preview.payslips.len(),
            })),
        )
        .await;

    Ok(run)
}

pub async fn list_runs<S: PayrollStore>(store: &S) -> Result<Vec<PayrollRun>, AppError> {
    store.list_payroll_runs().await
}
