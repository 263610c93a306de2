use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::database::models::{
    AttendanceFilter, AttendanceRecord, AuditEvent, ContributionBracket, ContributionKind,
    Employee, HolidayCalendarEntry, LeaveBalance, LeaveType, PayrollRun, Request,
    RequestDecision, RequestFilter, RequestLog, Site, TaxBracket,
};
use crate::error::AppError;

/// Everything the payroll engine reads and writes.
///
/// Reads and writes are keyed by equality or range predicates only. Writes that
/// guard a state transition are conditional and report a lost race as
/// [`AppError::Conflict`]:
/// - `insert_attendance` on the (employee_id, work_date) key,
/// - `open_attendance` only while `time_in` is unset and the day is not leave,
/// - `close_attendance` only while `time_out` is unset,
/// - `decide_request` only while the stored request is pending and, for leave,
///   while the balance still covers the days taken,
/// - `insert_payroll_run` on the (period_from, period_to) key.
///
/// `decide_request` is all-or-nothing: a failed condition or write leaves the
/// request, balance, attendance and log untouched.
#[allow(async_fn_in_trait)]
pub trait PayrollStore: Send + Sync {
    async fn get_employee(&self, id: Uuid) -> Result<Option<Employee>, AppError>;
    async fn list_active_employees(&self) -> Result<Vec<Employee>, AppError>;
    async fn save_employee(&self, employee: &Employee) -> Result<(), AppError>;
    async fn get_site(&self, id: Uuid) -> Result<Option<Site>, AppError>;

    async fn get_attendance(
        &self,
        employee_id: Uuid,
        work_date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, AppError>;
    /// Instant of the employee's most recent recorded time-in, on any date.
    async fn latest_time_in(&self, employee_id: Uuid) -> Result<Option<DateTime<Utc>>, AppError>;
    async fn insert_attendance(&self, record: &AttendanceRecord) -> Result<(), AppError>;
    /// Sets the time-in on an existing row that has none.
    async fn open_attendance(&self, record: &AttendanceRecord) -> Result<(), AppError>;
    async fn close_attendance(&self, record: &AttendanceRecord) -> Result<(), AppError>;
    async fn upsert_attendance(&self, record: &AttendanceRecord) -> Result<(), AppError>;
    async fn list_attendance(
        &self,
        filter: &AttendanceFilter,
    ) -> Result<Vec<AttendanceRecord>, AppError>;

    async fn list_holidays(&self) -> Result<Vec<HolidayCalendarEntry>, AppError>;
    async fn save_holiday(&self, entry: &HolidayCalendarEntry) -> Result<(), AppError>;
    async fn delete_holiday(&self, id: Uuid) -> Result<bool, AppError>;

    async fn get_leave_type(&self, id: Uuid) -> Result<Option<LeaveType>, AppError>;
    async fn get_leave_balance(
        &self,
        employee_id: Uuid,
        leave_type_id: Uuid,
        year: i32,
    ) -> Result<Option<LeaveBalance>, AppError>;
    async fn save_leave_balance(&self, balance: &LeaveBalance) -> Result<(), AppError>;

    async fn insert_request(&self, request: &Request) -> Result<(), AppError>;
    async fn get_request(&self, id: Uuid) -> Result<Option<Request>, AppError>;
    async fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<Request>, AppError>;
    async fn decide_request(&self, decision: &RequestDecision) -> Result<(), AppError>;
    async fn append_request_log(&self, entry: &RequestLog) -> Result<(), AppError>;
    async fn list_request_logs(&self, request_id: Uuid) -> Result<Vec<RequestLog>, AppError>;

    async fn list_contribution_brackets(
        &self,
        kind: ContributionKind,
    ) -> Result<Vec<ContributionBracket>, AppError>;
    async fn list_tax_brackets(&self) -> Result<Vec<TaxBracket>, AppError>;

    async fn insert_payroll_run(&self, run: &PayrollRun) -> Result<(), AppError>;
    async fn list_payroll_runs(&self) -> Result<Vec<PayrollRun>, AppError>;

    async fn get_policy_settings(&self) -> Result<HashMap<String, String>, AppError>;
    async fn save_policy_setting(&self, key: &str, value: &str) -> Result<(), AppError>;

    async fn append_audit_event(&self, event: &AuditEvent) -> Result<(), AppError>;
}
