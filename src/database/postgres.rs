use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::database::{
    models::{
        AttendanceFilter, AttendanceRecord, AuditEvent, ContributionBracket, ContributionKind,
        AttendanceStatus, Employee, EmployeeRow, HolidayCalendarEntry, LeaveBalance, LeaveType,
        PayrollRun, Request, RequestDecision, RequestFilter, RequestLog, RequestRow,
        RequestStatus, Site, TaxBracket,
    },
    store::PayrollStore,
    utils::sql,
};
use crate::error::AppError;

const EMPLOYEE_COLUMNS: &str = r#"
    id, code, name, employment_type, base_salary, daily_rate, hourly_rate,
    overtime_rate, site_id, status
"#;

const ATTENDANCE_COLUMNS: &str = r#"
    id, employee_id, work_date, status, time_in, time_out, time_in_recorded_at,
    break_minutes, day_type, manual_overtime_hours, approved_overtime_hours, hours_worked,
    regular_hours, overtime_hours, night_differential_hours, regular_pay, overtime_pay,
    night_differential_pay, holiday_pay, rest_day_pay, total_daily_pay, is_holiday,
    holiday_type, time_in_photo, time_in_lat, time_in_lng, time_in_distance_m,
    time_in_in_range, time_out_photo, time_out_lat, time_out_lng, time_out_distance_m,
    time_out_in_range, late_minutes, early_out_minutes, created_at, updated_at
"#;

const REQUEST_COLUMNS: &str = r#"
    id, employee_id, request_type, start_date, end_date, leave_type_id, total_days,
    time_in, time_out, break_minutes, ot_hours, reason, status, approver_user_id,
    decision_note, created_at, updated_at, decided_at
"#;

/// Binds every attendance column in `ATTENDANCE_COLUMNS` order.
macro_rules! bind_attendance {
    ($query:expr, $record:expr) => {
        $query
            .bind($record.id)
            .bind($record.employee_id)
            .bind($record.work_date)
            .bind($record.status)
            .bind(&$record.time_in)
            .bind(&$record.time_out)
            .bind($record.time_in_recorded_at)
            .bind($record.break_minutes)
            .bind($record.day_type)
            .bind($record.manual_overtime_hours)
            .bind($record.approved_overtime_hours)
            .bind($record.pay.hours_worked)
            .bind($record.pay.regular_hours)
            .bind($record.pay.overtime_hours)
            .bind($record.pay.night_differential_hours)
            .bind($record.pay.regular_pay)
            .bind($record.pay.overtime_pay)
            .bind($record.pay.night_differential_pay)
            .bind($record.pay.holiday_pay)
            .bind($record.pay.rest_day_pay)
            .bind($record.pay.total_daily_pay)
            .bind($record.is_holiday)
            .bind($record.holiday_type)
            .bind(&$record.time_in_photo)
            .bind($record.time_in_lat)
            .bind($record.time_in_lng)
            .bind($record.time_in_distance_m)
            .bind($record.time_in_in_range)
            .bind(&$record.time_out_photo)
            .bind($record.time_out_lat)
            .bind($record.time_out_lng)
            .bind($record.time_out_distance_m)
            .bind($record.time_out_in_range)
            .bind($record.late_minutes)
            .bind($record.early_out_minutes)
            .bind($record.created_at)
            .bind($record.updated_at)
    };
}

const ATTENDANCE_VALUES: &str = r#"
    (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?,
     ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

const ATTENDANCE_UPDATE_SET: &str = r#"
    status = EXCLUDED.status,
    time_in = EXCLUDED.time_in,
    time_out = EXCLUDED.time_out,
    time_in_recorded_at = EXCLUDED.time_in_recorded_at,
    break_minutes = EXCLUDED.break_minutes,
    day_type = EXCLUDED.day_type,
    manual_overtime_hours = EXCLUDED.manual_overtime_hours,
    approved_overtime_hours = EXCLUDED.approved_overtime_hours,
    hours_worked = EXCLUDED.hours_worked,
    regular_hours = EXCLUDED.regular_hours,
    overtime_hours = EXCLUDED.overtime_hours,
    night_differential_hours = EXCLUDED.night_differential_hours,
    regular_pay = EXCLUDED.regular_pay,
    overtime_pay = EXCLUDED.overtime_pay,
    night_differential_pay = EXCLUDED.night_differential_pay,
    holiday_pay = EXCLUDED.holiday_pay,
    rest_day_pay = EXCLUDED.rest_day_pay,
    total_daily_pay = EXCLUDED.total_daily_pay,
    is_holiday = EXCLUDED.is_holiday,
    holiday_type = EXCLUDED.holiday_type,
    time_in_photo = EXCLUDED.time_in_photo,
    time_in_lat = EXCLUDED.time_in_lat,
    time_in_lng = EXCLUDED.time_in_lng,
    time_in_distance_m = EXCLUDED.time_in_distance_m,
    time_in_in_range = EXCLUDED.time_in_in_range,
    time_out_photo = EXCLUDED.time_out_photo,
    time_out_lat = EXCLUDED.time_out_lat,
    time_out_lng = EXCLUDED.time_out_lng,
    time_out_distance_m = EXCLUDED.time_out_distance_m,
    time_out_in_range = EXCLUDED.time_out_in_range,
    late_minutes = EXCLUDED.late_minutes,
    early_out_minutes = EXCLUDED.early_out_minutes,
    updated_at = EXCLUDED.updated_at
"#;

const REQUEST_LOG_INSERT: &str = r#"
    INSERT INTO
        request_logs (id, request_id, actor_user_id, action, note, created_at)
    VALUES
        (?, ?, ?, ?, ?, ?)
"#;

fn upsert_attendance_query() -> String {
    sql(&format!(
        "INSERT INTO attendance ({}) VALUES {} ON CONFLICT (employee_id, work_date) DO UPDATE SET {}",
        ATTENDANCE_COLUMNS, ATTENDANCE_VALUES, ATTENDANCE_UPDATE_SET
    ))
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn to_employee(row: EmployeeRow) -> Result<Employee, AppError> {
        Employee::try_from(row).map_err(AppError::internal_server_error_message)
    }

    fn to_request(row: RequestRow) -> Result<Request, AppError> {
        Request::try_from(row).map_err(AppError::internal_server_error_message)
    }

    /// Every write of one decision, on the caller's transaction.
    async fn write_decision(
        tx: &mut Transaction<'_, Postgres>,
        decision: &RequestDecision,
    ) -> Result<(), AppError> {
        let request = &decision.request;
        let result = sqlx::query(&sql(r#"
            UPDATE
                requests
            SET
                status = ?,
                approver_user_id = ?,
                decision_note = ?,
                updated_at = ?,
                decided_at = ?
            WHERE
                id = ?
                AND status = ?
        "#))
        .bind(request.status)
        .bind(request.approver_user_id)
        .bind(&request.decision_note)
        .bind(request.updated_at)
        .bind(request.decided_at)
        .bind(request.id)
        .bind(RequestStatus::Pending)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "Request {} has already been decided",
                request.id
            )));
        }

        if let Some(usage) = &decision.leave_usage {
            let result = sqlx::query(&sql(r#"
                UPDATE
                    leave_balances
                SET
                    used_days = used_days + ?,
                    remaining_days = remaining_days - ?
                WHERE
                    employee_id = ?
                    AND leave_type_id = ?
                    AND year = ?
                    AND remaining_days >= ?
            "#))
            .bind(usage.days)
            .bind(usage.days)
            .bind(usage.employee_id)
            .bind(usage.leave_type_id)
            .bind(usage.year)
            .bind(usage.days)
            .execute(&mut **tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(AppError::Conflict(format!(
                    "Leave balance no longer covers {} days",
                    usage.days
                )));
            }
        }

        let upsert = upsert_attendance_query();
        for record in &decision.attendance {
            bind_attendance!(sqlx::query(&upsert), record)
                .execute(&mut **tx)
                .await?;
        }

        let log = &decision.log;
        sqlx::query(&sql(REQUEST_LOG_INSERT))
            .bind(log.id)
            .bind(log.request_id)
            .bind(log.actor_user_id)
            .bind(log.action)
            .bind(&log.note)
            .bind(log.created_at)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }
}

impl PayrollStore for PgStore {
    async fn get_employee(&self, id: Uuid) -> Result<Option<Employee>, AppError> {
        let row = sqlx::query_as::<_, EmployeeRow>(&sql(&format!(
            "SELECT {} FROM employees WHERE id = ?",
            EMPLOYEE_COLUMNS
        )))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::to_employee).transpose()
    }

    async fn list_active_employees(&self) -> Result<Vec<Employee>, AppError> {
        let rows = sqlx::query_as::<_, EmployeeRow>(&sql(&format!(
            "SELECT {} FROM employees WHERE status = 'active' ORDER BY code",
            EMPLOYEE_COLUMNS
        )))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::to_employee).collect()
    }

    async fn save_employee(&self, employee: &Employee) -> Result<(), AppError> {
        sqlx::query(&sql(r#"
            INSERT INTO
                employees (
                    id,
                    code,
                    name,
                    employment_type,
                    base_salary,
                    daily_rate,
                    hourly_rate,
                    overtime_rate,
                    site_id,
                    status
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                code = EXCLUDED.code,
                name = EXCLUDED.name,
                employment_type = EXCLUDED.employment_type,
                base_salary = EXCLUDED.base_salary,
                daily_rate = EXCLUDED.daily_rate,
                hourly_rate = EXCLUDED.hourly_rate,
                overtime_rate = EXCLUDED.overtime_rate,
                site_id = EXCLUDED.site_id,
                status = EXCLUDED.status
        "#))
        .bind(employee.id)
        .bind(&employee.code)
        .bind(&employee.name)
        .bind(employee.employment_type)
        .bind(employee.rates.monthly)
        .bind(employee.rates.daily)
        .bind(employee.rates.hourly)
        .bind(employee.rates.overtime)
        .bind(employee.site_id)
        .bind(employee.status)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_site(&self, id: Uuid) -> Result<Option<Site>, AppError> {
        let site = sqlx::query_as::<_, Site>(&sql(r#"
            SELECT
                id,
                name,
                latitude,
                longitude,
                radius_meters
            FROM
                sites
            WHERE
                id = ?
        "#))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(site)
    }

    async fn get_attendance(
        &self,
        employee_id: Uuid,
        work_date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, AppError> {
        let record = sqlx::query_as::<_, AttendanceRecord>(&sql(&format!(
            "SELECT {} FROM attendance WHERE employee_id = ? AND work_date = ?",
            ATTENDANCE_COLUMNS
        )))
        .bind(employee_id)
        .bind(work_date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn latest_time_in(&self, employee_id: Uuid) -> Result<Option<DateTime<Utc>>, AppError> {
        let latest = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(&sql(r#"
            SELECT
                MAX(time_in_recorded_at)
            FROM
                attendance
            WHERE
                employee_id = ?
        "#))
        .bind(employee_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(latest)
    }

    async fn insert_attendance(&self, record: &AttendanceRecord) -> Result<(), AppError> {
        let query = sql(&format!(
            "INSERT INTO attendance ({}) VALUES {}",
            ATTENDANCE_COLUMNS, ATTENDANCE_VALUES
        ));

        bind_attendance!(sqlx::query(&query), record)
            .execute(&self.pool)
            .await
            .map_err(|err| {
                AppError::conflict_on_unique(
                    err,
                    format!("Attendance for {} already exists", record.work_date),
                )
            })?;

        Ok(())
    }

    async fn open_attendance(&self, record: &AttendanceRecord) -> Result<(), AppError> {
        let result = sqlx::query(&sql(r#"
            UPDATE
                attendance
            SET
                time_in = ?,
                time_in_recorded_at = ?,
                time_in_photo = ?,
                time_in_lat = ?,
                time_in_lng = ?,
                time_in_distance_m = ?,
                time_in_in_range = ?,
                late_minutes = ?,
                is_holiday = ?,
                holiday_type = ?,
                updated_at = ?
            WHERE
                employee_id = ?
                AND work_date = ?
                AND time_in IS NULL
                AND status <> ?
        "#))
        .bind(&record.time_in)
        .bind(record.time_in_recorded_at)
        .bind(&record.time_in_photo)
        .bind(record.time_in_lat)
        .bind(record.time_in_lng)
        .bind(record.time_in_distance_m)
        .bind(record.time_in_in_range)
        .bind(record.late_minutes)
        .bind(record.is_holiday)
        .bind(record.holiday_type)
        .bind(record.updated_at)
        .bind(record.employee_id)
        .bind(record.work_date)
        .bind(AttendanceStatus::Leave)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "Already timed in for {}",
                record.work_date
            )));
        }

        Ok(())
    }

    async fn close_attendance(&self, record: &AttendanceRecord) -> Result<(), AppError> {
        let result = sqlx::query(&sql(r#"
            UPDATE
                attendance
            SET
                time_out = ?,
                hours_worked = ?,
                regular_hours = ?,
                overtime_hours = ?,
                night_differential_hours = ?,
                regular_pay = ?,
                overtime_pay = ?,
                night_differential_pay = ?,
                holiday_pay = ?,
                rest_day_pay = ?,
                total_daily_pay = ?,
                is_holiday = ?,
                holiday_type = ?,
                time_out_photo = ?,
                time_out_lat = ?,
                time_out_lng = ?,
                time_out_distance_m = ?,
                time_out_in_range = ?,
                early_out_minutes = ?,
                updated_at = ?
            WHERE
                employee_id = ?
                AND work_date = ?
                AND time_out IS NULL
        "#))
        .bind(&record.time_out)
        .bind(record.pay.hours_worked)
        .bind(record.pay.regular_hours)
        .bind(record.pay.overtime_hours)
        .bind(record.pay.night_differential_hours)
        .bind(record.pay.regular_pay)
        .bind(record.pay.overtime_pay)
        .bind(record.pay.night_differential_pay)
        .bind(record.pay.holiday_pay)
        .bind(record.pay.rest_day_pay)
        .bind(record.pay.total_daily_pay)
        .bind(record.is_holiday)
        .bind(record.holiday_type)
        .bind(&record.time_out_photo)
        .bind(record.time_out_lat)
        .bind(record.time_out_lng)
        .bind(record.time_out_distance_m)
        .bind(record.time_out_in_range)
        .bind(record.early_out_minutes)
        .bind(record.updated_at)
        .bind(record.employee_id)
        .bind(record.work_date)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "Already timed out for {}",
                record.work_date
            )));
        }

        Ok(())
    }

    async fn upsert_attendance(&self, record: &AttendanceRecord) -> Result<(), AppError> {
        let query = upsert_attendance_query();

        bind_attendance!(sqlx::query(&query), record)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn list_attendance(
        &self,
        filter: &AttendanceFilter,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        let records = sqlx::query_as::<_, AttendanceRecord>(&sql(&format!(
            r#"
            SELECT {}
            FROM attendance
            WHERE (?::uuid IS NULL OR employee_id = ?)
              AND (?::date IS NULL OR work_date >= ?)
              AND (?::date IS NULL OR work_date <= ?)
            ORDER BY work_date, employee_id
            "#,
            ATTENDANCE_COLUMNS
        )))
        .bind(filter.employee_id)
        .bind(filter.employee_id)
        .bind(filter.from)
        .bind(filter.from)
        .bind(filter.to)
        .bind(filter.to)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn list_holidays(&self) -> Result<Vec<HolidayCalendarEntry>, AppError> {
        let holidays = sqlx::query_as::<_, HolidayCalendarEntry>(&sql(r#"
            SELECT
                id,
                name,
                holiday_date,
                holiday_type,
                is_recurring
            FROM
                holidays
            ORDER BY
                holiday_date
        "#))
        .fetch_all(&self.pool)
        .await?;

        Ok(holidays)
    }

    async fn save_holiday(&self, entry: &HolidayCalendarEntry) -> Result<(), AppError> {
        sqlx::query(&sql(r#"
            INSERT INTO
                holidays (id, name, holiday_date, holiday_type, is_recurring)
            VALUES
                (?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                holiday_date = EXCLUDED.holiday_date,
                holiday_type = EXCLUDED.holiday_type,
                is_recurring = EXCLUDED.is_recurring
        "#))
        .bind(entry.id)
        .bind(&entry.name)
        .bind(entry.holiday_date)
        .bind(entry.holiday_type)
        .bind(entry.is_recurring)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_holiday(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(&sql("DELETE FROM holidays WHERE id = ?"))
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_leave_type(&self, id: Uuid) -> Result<Option<LeaveType>, AppError> {
        let leave_type = sqlx::query_as::<_, LeaveType>(&sql(r#"
            SELECT
                id,
                code,
                name,
                is_paid,
                max_days_per_year
            FROM
                leave_types
            WHERE
                id = ?
        "#))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(leave_type)
    }

    async fn get_leave_balance(
        &self,
        employee_id: Uuid,
        leave_type_id: Uuid,
        year: i32,
    ) -> Result<Option<LeaveBalance>, AppError> {
        let balance = sqlx::query_as::<_, LeaveBalance>(&sql(r#"
            SELECT
                id,
                employee_id,
                leave_type_id,
                year,
                allocated_days,
                used_days,
                remaining_days
            FROM
                leave_balances
            WHERE
                employee_id = ?
                AND leave_type_id = ?
                AND year = ?
        "#))
        .bind(employee_id)
        .bind(leave_type_id)
        .bind(year)
        .fetch_optional(&self.pool)
        .await?;

        Ok(balance)
    }

    async fn save_leave_balance(&self, balance: &LeaveBalance) -> Result<(), AppError> {
        sqlx::query(&sql(r#"
            INSERT INTO
                leave_balances (
                    id,
                    employee_id,
                    leave_type_id,
                    year,
                    allocated_days,
                    used_days,
                    remaining_days
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (employee_id, leave_type_id, year) DO UPDATE SET
                allocated_days = EXCLUDED.allocated_days,
                used_days = EXCLUDED.used_days,
                remaining_days = EXCLUDED.remaining_days
        "#))
        .bind(balance.id)
        .bind(balance.employee_id)
        .bind(balance.leave_type_id)
        .bind(balance.year)
        .bind(balance.allocated_days)
        .bind(balance.used_days)
        .bind(balance.remaining_days)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_request(&self, request: &Request) -> Result<(), AppError> {
        let row = RequestRow::from(request);

        sqlx::query(&sql(&format!(
            "INSERT INTO requests ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            REQUEST_COLUMNS
        )))
        .bind(row.id)
        .bind(row.employee_id)
        .bind(row.request_type)
        .bind(row.start_date)
        .bind(row.end_date)
        .bind(row.leave_type_id)
        .bind(row.total_days)
        .bind(row.time_in)
        .bind(row.time_out)
        .bind(row.break_minutes)
        .bind(row.ot_hours)
        .bind(row.reason)
        .bind(row.status)
        .bind(row.approver_user_id)
        .bind(row.decision_note)
        .bind(row.created_at)
        .bind(row.updated_at)
        .bind(row.decided_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_request(&self, id: Uuid) -> Result<Option<Request>, AppError> {
        let row = sqlx::query_as::<_, RequestRow>(&sql(&format!(
            "SELECT {} FROM requests WHERE id = ?",
            REQUEST_COLUMNS
        )))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::to_request).transpose()
    }

    async fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<Request>, AppError> {
        let mut query = format!("SELECT {} FROM requests", REQUEST_COLUMNS);
        let mut conditions = vec![];

        if filter.employee_id.is_some() {
            conditions.push("employee_id = ?");
        }
        if filter.status.is_some() {
            conditions.push("status = ?");
        }
        if filter.request_type.is_some() {
            conditions.push("request_type = ?");
        }

        if !conditions.is_empty() {
            query.push_str(" WHERE ");
            query.push_str(&conditions.join(" AND "));
        }
        query.push_str(" ORDER BY created_at DESC");

        let query = sql(&query);
        let mut prepared = sqlx::query_as::<_, RequestRow>(&query);
        if let Some(employee_id) = filter.employee_id {
            prepared = prepared.bind(employee_id);
        }
        if let Some(status) = filter.status {
            prepared = prepared.bind(status);
        }
        if let Some(request_type) = filter.request_type {
            prepared = prepared.bind(request_type);
        }

        let rows = prepared.fetch_all(&self.pool).await?;

        rows.into_iter().map(Self::to_request).collect()
    }

    async fn decide_request(&self, decision: &RequestDecision) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        match Self::write_decision(&mut tx, decision).await {
            Ok(()) => {
                tx.commit().await?;
                Ok(())
            }
            Err(err) => {
                log::warn!(
                    "Decision on request {} failed, rolling back: {}",
                    decision.request.id,
                    err
                );
                if let Err(rollback_err) = tx.rollback().await {
                    log::error!(
                        "Rollback failed for request {} (orig: {}, rollback: {})",
                        decision.request.id,
                        err,
                        rollback_err
                    );
                }
                Err(err)
            }
        }
    }

    async fn append_request_log(&self, entry: &RequestLog) -> Result<(), AppError> {
        sqlx::query(&sql(REQUEST_LOG_INSERT))
            .bind(entry.id)
            .bind(entry.request_id)
            .bind(entry.actor_user_id)
            .bind(entry.action)
            .bind(&entry.note)
            .bind(entry.created_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn list_request_logs(&self, request_id: Uuid) -> Result<Vec<RequestLog>, AppError> {
        let logs = sqlx::query_as::<_, RequestLog>(&sql(r#"
            SELECT
                id,
                request_id,
                actor_user_id,
                action,
                note,
                created_at
            FROM
                request_logs
            WHERE
                request_id = ?
            ORDER BY
                created_at
        "#))
        .bind(request_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(logs)
    }

    async fn list_contribution_brackets(
        &self,
        kind: ContributionKind,
    ) -> Result<Vec<ContributionBracket>, AppError> {
        let brackets = sqlx::query_as::<_, ContributionBracket>(&sql(r#"
            SELECT
                id,
                kind,
                salary_range_min,
                salary_range_max,
                employee_share,
                employer_share,
                effective_date
            FROM
                contribution_brackets
            WHERE
                kind = ?
        "#))
        .bind(kind)
        .fetch_all(&self.pool)
        .await?;

        Ok(brackets)
    }

    async fn list_tax_brackets(&self) -> Result<Vec<TaxBracket>, AppError> {
        let brackets = sqlx::query_as::<_, TaxBracket>(&sql(r#"
            SELECT
                id,
                salary_range_min,
                salary_range_max,
                fixed_tax,
                excess_over,
                percentage_rate,
                effective_date
            FROM
                tax_brackets
        "#))
        .fetch_all(&self.pool)
        .await?;

        Ok(brackets)
    }

    async fn insert_payroll_run(&self, run: &PayrollRun) -> Result<(), AppError> {
        sqlx::query(&sql(r#"
            INSERT INTO
                payroll_runs (id, period_from, period_to, total_gross, actor_user_id, created_at)
            VALUES
                (?, ?, ?, ?, ?, ?)
        "#))
        .bind(run.id)
        .bind(run.period_from)
        .bind(run.period_to)
        .bind(run.total_gross)
        .bind(run.actor_user_id)
        .bind(run.created_at)
        .execute(&self.pool)
        .await
        .map_err(|err| {
            AppError::conflict_on_unique(
                err,
                format!(
                    "Payroll for {} to {} is already marked as paid",
                    run.period_from, run.period_to
                ),
            )
        })?;

        Ok(())
    }

    async fn list_payroll_runs(&self) -> Result<Vec<PayrollRun>, AppError> {
        let runs = sqlx::query_as::<_, PayrollRun>(&sql(r#"
            SELECT
                id,
                period_from,
                period_to,
                total_gross,
                actor_user_id,
                created_at
            FROM
                payroll_runs
            ORDER BY
                period_from DESC
        "#))
        .fetch_all(&self.pool)
        .await?;

        Ok(runs)
    }

    async fn get_policy_settings(&self) -> Result<HashMap<String, String>, AppError> {
        let rows = sqlx::query_as::<_, (String, String)>(&sql(
            "SELECT key, value FROM policy_settings",
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    async fn save_policy_setting(&self, key: &str, value: &str) -> Result<(), AppError> {
        sqlx::query(&sql(r#"
            INSERT INTO
                policy_settings (key, value)
            VALUES
                (?, ?)
            ON CONFLICT (key) DO UPDATE SET
                value = EXCLUDED.value
        "#))
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn append_audit_event(&self, event: &AuditEvent) -> Result<(), AppError> {
        sqlx::query(&sql(r#"
            INSERT INTO
                audit_events (
                    id,
                    actor_user_id,
                    entity_type,
                    entity_id,
                    action,
                    description,
                    metadata,
                    created_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?)
        "#))
        .bind(event.id)
        .bind(event.actor_user_id)
        .bind(&event.entity_type)
        .bind(event.entity_id)
        .bind(&event.action)
        .bind(&event.description)
        .bind(&event.metadata)
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
