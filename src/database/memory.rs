use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::database::models::{
    AttendanceFilter, AttendanceRecord, AuditEvent, ContributionBracket, ContributionKind,
    Employee, HolidayCalendarEntry, LeaveBalance, LeaveType, PayrollRun, Request,
    RequestDecision, RequestFilter, RequestLog, RequestStatus, Site, TaxBracket,
};
use crate::database::store::PayrollStore;
use crate::error::AppError;

/// Reference tables that can be made to fail, to exercise soft-fail paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceTable {
    Holidays,
    Contributions(ContributionKind),
    Tax,
    Policy,
}

#[derive(Default)]
struct MemoryState {
    employees: HashMap<Uuid, Employee>,
    sites: HashMap<Uuid, Site>,
    attendance: HashMap<(Uuid, NaiveDate), AttendanceRecord>,
    holidays: Vec<HolidayCalendarEntry>,
    leave_types: HashMap<Uuid, LeaveType>,
    leave_balances: HashMap<(Uuid, Uuid, i32), LeaveBalance>,
    requests: HashMap<Uuid, Request>,
    request_logs: Vec<RequestLog>,
    contribution_brackets: Vec<ContributionBracket>,
    tax_brackets: Vec<TaxBracket>,
    payroll_runs: Vec<PayrollRun>,
    policy: HashMap<String, String>,
    audit_events: Vec<AuditEvent>,
    unavailable: HashSet<ReferenceTable>,
}

impl MemoryState {
    /// Replaces the row for the record's key, keeping the stored id and creation time.
    fn upsert_attendance(&mut self, record: &AttendanceRecord) {
        let key = (record.employee_id, record.work_date);
        let mut stored = record.clone();
        if let Some(existing) = self.attendance.get(&key) {
            stored.id = existing.id;
            stored.created_at = existing.created_at;
        }
        self.attendance.insert(key, stored);
    }
}

/// In-process store. Every method takes the lock once, so each call is atomic.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, AppError> {
        self.state
            .lock()
            .map_err(|_| AppError::internal_server_error_message("memory store lock poisoned"))
    }

    fn check_available(state: &MemoryState, table: ReferenceTable) -> Result<(), AppError> {
        if state.unavailable.contains(&table) {
            return Err(AppError::internal_server_error_message(format!(
                "{:?} table unavailable",
                table
            )));
        }
        Ok(())
    }

    pub fn make_unavailable(&self, table: ReferenceTable) -> Result<(), AppError> {
        self.lock()?.unavailable.insert(table);
        Ok(())
    }

    pub fn insert_site(&self, site: Site) -> Result<(), AppError> {
        self.lock()?.sites.insert(site.id, site);
        Ok(())
    }

    pub fn insert_leave_type(&self, leave_type: LeaveType) -> Result<(), AppError> {
        self.lock()?.leave_types.insert(leave_type.id, leave_type);
        Ok(())
    }

    pub fn insert_contribution_bracket(&self, bracket: ContributionBracket) -> Result<(), AppError> {
        self.lock()?.contribution_brackets.push(bracket);
        Ok(())
    }

    pub fn insert_tax_bracket(&self, bracket: TaxBracket) -> Result<(), AppError> {
        self.lock()?.tax_brackets.push(bracket);
        Ok(())
    }

    pub fn audit_events(&self) -> Result<Vec<AuditEvent>, AppError> {
        Ok(self.lock()?.audit_events.clone())
    }
}

impl PayrollStore for MemoryStore {
    async fn get_employee(&self, id: Uuid) -> Result<Option<Employee>, AppError> {
        Ok(self.lock()?.employees.get(&id).cloned())
    }

    async fn list_active_employees(&self) -> Result<Vec<Employee>, AppError> {
        let state = self.lock()?;
        let mut employees: Vec<Employee> = state
            .employees
            .values()
            .filter(|employee| employee.is_active())
            .cloned()
            .collect();
        employees.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(employees)
    }

    async fn save_employee(&self, employee: &Employee) -> Result<(), AppError> {
        self.lock()?.employees.insert(employee.id, employee.clone());
        Ok(())
    }

    async fn get_site(&self, id: Uuid) -> Result<Option<Site>, AppError> {
        Ok(self.lock()?.sites.get(&id).cloned())
    }

    async fn get_attendance(
        &self,
        employee_id: Uuid,
        work_date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, AppError> {
        Ok(self.lock()?.attendance.get(&(employee_id, work_date)).cloned())
    }

    async fn latest_time_in(&self, employee_id: Uuid) -> Result<Option<DateTime<Utc>>, AppError> {
        Ok(self
            .lock()?
            .attendance
            .values()
            .filter(|record| record.employee_id == employee_id)
            .filter_map(|record| record.time_in_recorded_at)
            .max())
    }

    async fn insert_attendance(&self, record: &AttendanceRecord) -> Result<(), AppError> {
        let mut state = self.lock()?;
        let key = (record.employee_id, record.work_date);
        if state.attendance.contains_key(&key) {
            return Err(AppError::Conflict(format!(
                "Attendance for {} already exists",
                record.work_date
            )));
        }
        state.attendance.insert(key, record.clone());
        Ok(())
    }

    async fn open_attendance(&self, record: &AttendanceRecord) -> Result<(), AppError> {
        let mut state = self.lock()?;
        let openable = match state.attendance.get(&(record.employee_id, record.work_date)) {
            Some(existing) => existing.time_in.is_none() && !existing.is_leave(),
            None => {
                return Err(AppError::NotFound(format!(
                    "No attendance for {}",
                    record.work_date
                )));
            }
        };
        if !openable {
            return Err(AppError::Conflict(format!(
                "Already timed in for {}",
                record.work_date
            )));
        }

        state.upsert_attendance(record);
        Ok(())
    }

    async fn close_attendance(&self, record: &AttendanceRecord) -> Result<(), AppError> {
        let mut state = self.lock()?;
        match state.attendance.get_mut(&(record.employee_id, record.work_date)) {
            Some(existing) if existing.time_out.is_none() => {
                *existing = record.clone();
                Ok(())
            }
            Some(_) => Err(AppError::Conflict(format!(
                "Already timed out for {}",
                record.work_date
            ))),
            None => Err(AppError::NotFound(format!(
                "No attendance for {}",
                record.work_date
            ))),
        }
    }

    async fn upsert_attendance(&self, record: &AttendanceRecord) -> Result<(), AppError> {
        self.lock()?.upsert_attendance(record);
        Ok(())
    }

    async fn list_attendance(
        &self,
        filter: &AttendanceFilter,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        let state = self.lock()?;
        let mut records: Vec<AttendanceRecord> = state
            .attendance
            .values()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect();
        records.sort_by_key(|record| (record.work_date, record.employee_id));
        Ok(records)
    }

    async fn list_holidays(&self) -> Result<Vec<HolidayCalendarEntry>, AppError> {
        let state = self.lock()?;
        Self::check_available(&state, ReferenceTable::Holidays)?;
        Ok(state.holidays.clone())
    }

    async fn save_holiday(&self, entry: &HolidayCalendarEntry) -> Result<(), AppError> {
        let mut state = self.lock()?;
        state.holidays.retain(|existing| existing.id != entry.id);
        state.holidays.push(entry.clone());
        Ok(())
    }

    async fn delete_holiday(&self, id: Uuid) -> Result<bool, AppError> {
        let mut state = self.lock()?;
        let before = state.holidays.len();
        state.holidays.retain(|existing| existing.id != id);
        Ok(state.holidays.len() != before)
    }

    async fn get_leave_type(&self, id: Uuid) -> Result<Option<LeaveType>, AppError> {
        Ok(self.lock()?.leave_types.get(&id).cloned())
    }

    async fn get_leave_balance(
        &self,
        employee_id: Uuid,
        leave_type_id: Uuid,
        year: i32,
    ) -> Result<Option<LeaveBalance>, AppError> {
        Ok(self
            .lock()?
            .leave_balances
            .get(&(employee_id, leave_type_id, year))
            .cloned())
    }

    async fn save_leave_balance(&self, balance: &LeaveBalance) -> Result<(), AppError> {
        self.lock()?.leave_balances.insert(
            (balance.employee_id, balance.leave_type_id, balance.year),
            balance.clone(),
        );
        Ok(())
    }

    async fn insert_request(&self, request: &Request) -> Result<(), AppError> {
        self.lock()?.requests.insert(request.id, request.clone());
        Ok(())
    }

    async fn get_request(&self, id: Uuid) -> Result<Option<Request>, AppError> {
        Ok(self.lock()?.requests.get(&id).cloned())
    }

    async fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<Request>, AppError> {
        let state = self.lock()?;
        let mut requests: Vec<Request> = state
            .requests
            .values()
            .filter(|request| filter.matches(request))
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    async fn decide_request(&self, decision: &RequestDecision) -> Result<(), AppError> {
        let mut state = self.lock()?;
        let request = &decision.request;

        match state.requests.get(&request.id) {
            Some(existing) if existing.status == RequestStatus::Pending => {}
            Some(existing) => {
                return Err(AppError::Conflict(format!(
                    "Request {} is already {}",
                    request.id, existing.status
                )));
            }
            None => return Err(AppError::NotFound(format!("Request {} not found", request.id))),
        }

        if let Some(usage) = &decision.leave_usage {
            let key = (usage.employee_id, usage.leave_type_id, usage.year);
            let balance = state
                .leave_balances
                .get_mut(&key)
                .filter(|balance| balance.remaining_days >= usage.days)
                .ok_or_else(|| {
                    AppError::Conflict(format!(
                        "Leave balance no longer covers {} days",
                        usage.days
                    ))
                })?;
            balance.consume(usage.days);
        }

        for record in &decision.attendance {
            state.upsert_attendance(record);
        }
        state.requests.insert(request.id, request.clone());
        state.request_logs.push(decision.log.clone());
        Ok(())
    }

    async fn append_request_log(&self, entry: &RequestLog) -> Result<(), AppError> {
        self.lock()?.request_logs.push(entry.clone());
        Ok(())
    }

    async fn list_request_logs(&self, request_id: Uuid) -> Result<Vec<RequestLog>, AppError> {
        Ok(self
            .lock()?
            .request_logs
            .iter()
            .filter(|entry| entry.request_id == request_id)
            .cloned()
            .collect())
    }

    async fn list_contribution_brackets(
        &self,
        kind: ContributionKind,
    ) -> Result<Vec<ContributionBracket>, AppError> {
        let state = self.lock()?;
        Self::check_available(&state, ReferenceTable::Contributions(kind))?;
        Ok(state
            .contribution_brackets
            .iter()
            .filter(|bracket| bracket.kind == kind)
            .cloned()
            .collect())
    }

    async fn list_tax_brackets(&self) -> Result<Vec<TaxBracket>, AppError> {
        let state = self.lock()?;
        Self::check_available(&state, ReferenceTable::Tax)?;
        Ok(state.tax_brackets.clone())
    }

    async fn insert_payroll_run(&self, run: &PayrollRun) -> Result<(), AppError> {
        let mut state = self.lock()?;
        let duplicate = state.payroll_runs.iter().any(|existing| {
            existing.period_from == run.period_from && existing.period_to == run.period_to
        });
        if duplicate {
            return Err(AppError::Conflict(format!(
                "Payroll for {} to {} is already marked as paid",
                run.period_from, run.period_to
            )));
        }
        state.payroll_runs.push(run.clone());
        Ok(())
    }

    async fn list_payroll_runs(&self) -> Result<Vec<PayrollRun>, AppError> {
        let mut runs = self.lock()?.payroll_runs.clone();
        runs.sort_by(|a, b| b.period_from.cmp(&a.period_from));
        Ok(runs)
    }

    async fn get_policy_settings(&self) -> Result<HashMap<String, String>, AppError> {
        let state = self.lock()?;
        Self::check_available(&state, ReferenceTable::Policy)?;
        Ok(state.policy.clone())
    }

    async fn save_policy_setting(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.lock()?
            .policy
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn append_audit_event(&self, event: &AuditEvent) -> Result<(), AppError> {
        self.lock()?.audit_events.push(event.clone());
        Ok(())
    }
}
