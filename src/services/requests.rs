use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::database::models::{
    Action, AttendanceRecord, Employee, LeaveBalance, LeaveUsage, Request, RequestAction,
    RequestDecision, RequestFilter, RequestLog, RequestPayload, RequestStatus, RequestType,
};
use crate::database::PayrollStore;
use crate::error::AppError;
use crate::services::activity_logger::ActivityLogger;
use crate::services::attendance::{find_employee, recompute_record};
use crate::services::holiday_calendar::HolidayCalendar;
use crate::services::policy::AttendancePolicy;
use crate::services::time_math;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveSubmission {
    pub leave_type_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeCorrectionSubmission {
    pub work_date: NaiveDate,
    pub time_in: String,
    pub time_out: String,
    #[serde(default)]
    pub break_minutes: i32,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OvertimeSubmission {
    pub work_date: NaiveDate,
    pub ot_hours: f64,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestDetail {
    #[serde(flatten)]
    pub request: Request,
    pub logs: Vec<RequestLog>,
}

/// Inclusive day count; zero or negative when `end` precedes `start`.
pub fn leave_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

fn dates_between(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |date| *date <= end)
}

async fn leave_balance<S: PayrollStore>(
    store: &S,
    employee_id: Uuid,
    leave_type_id: Uuid,
    year: i32,
) -> Result<LeaveBalance, AppError> {
    store
        .get_leave_balance(employee_id, leave_type_id, year)
        .await?
        .ok_or_else(|| AppError::BadRequest(format!("No leave balance for {}", year)))
}

async fn submit<S: PayrollStore>(
    store: &S,
    actor_user_id: Uuid,
    request: Request,
) -> Result<Request, AppError> {
    store.insert_request(&request).await?;
    store
        .append_request_log(&RequestLog::new(
            request.id,
            actor_user_id,
            RequestAction::Submitted,
            request.reason.clone(),
            request.created_at,
        ))
        .await?;

    let (start, end) = request.payload.date_range();
    log::info!(
        "{} request {} submitted for {} to {}",
        request.request_type(),
        request.id,
        start,
        end
    );
    ActivityLogger::new(store)
        .log_request_activity(
            actor_user_id,
            request.id,
            Action::SUBMITTED,
            format!("{} request submitted", request.request_type()),
            Some(json!({ "employee_id": request.employee_id, "start": start, "end": end })),
        )
        .await;

    Ok(request)
}

/// Files a leave request after checking the day count, the remaining balance for
/// the start date's year, and overlap with the employee's live leave requests.
pub async fn submit_leave<S: PayrollStore>(
    store: &S,
    employee_id: Uuid,
    actor_user_id: Uuid,
    submission: LeaveSubmission,
    now: DateTime<Utc>,
) -> Result<Request, AppError> {
    find_employee(store, employee_id).await?;

    let total_days = leave_days(submission.start_date, submission.end_date);
    if total_days <= 0 {
        return Err(AppError::BadRequest(
            "end_date must not be before start_date".to_string(),
        ));
    }

    store
        .get_leave_type(submission.leave_type_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Leave type {} not found", submission.leave_type_id))
        })?;

    let balance = leave_balance(
        store,
        employee_id,
        submission.leave_type_id,
        submission.start_date.year(),
    )
    .await?;
    if total_days as f64 > balance.remaining_days {
        return Err(AppError::BadRequest(format!(
            "Requested {} days but only {} remain",
            total_days, balance.remaining_days
        )));
    }

    let live_leave = store
        .list_requests(&RequestFilter {
            employee_id: Some(employee_id),
            status: None,
            request_type: Some(RequestType::Leave),
        })
        .await?;
    let overlapping = live_leave.iter().find(|existing| {
        matches!(existing.status, RequestStatus::Pending | RequestStatus::Approved)
            && existing.overlaps(submission.start_date, submission.end_date)
    });
    if let Some(existing) = overlapping {
        return Err(AppError::Conflict(format!(
            "Overlaps {} leave request {}",
            existing.status, existing.id
        )));
    }

    let payload = RequestPayload::Leave {
        leave_type_id: submission.leave_type_id,
        start_date: submission.start_date,
        end_date: submission.end_date,
        total_days: total_days as i32,
    };
    submit(store, actor_user_id, Request::new(employee_id, payload, submission.reason, now)).await
}

pub async fn submit_time_correction<S: PayrollStore>(
    store: &S,
    employee_id: Uuid,
    actor_user_id: Uuid,
    submission: TimeCorrectionSubmission,
    now: DateTime<Utc>,
) -> Result<Request, AppError> {
    find_employee(store, employee_id).await?;

    for time in [&submission.time_in, &submission.time_out] {
        if !time_math::is_valid_hhmm(time) {
            return Err(AppError::BadRequest(format!("Invalid time {:?}, expected HH:MM", time)));
        }
    }
    if submission.break_minutes < 0 {
        return Err(AppError::BadRequest("break_minutes cannot be negative".to_string()));
    }

    let payload = RequestPayload::TimeCorrection {
        work_date: submission.work_date,
        time_in: submission.time_in,
        time_out: submission.time_out,
        break_minutes: submission.break_minutes,
    };
    submit(store, actor_user_id, Request::new(employee_id, payload, submission.reason, now)).await
}

pub async fn submit_overtime<S: PayrollStore>(
    store: &S,
    employee_id: Uuid,
    actor_user_id: Uuid,
    submission: OvertimeSubmission,
    now: DateTime<Utc>,
) -> Result<Request, AppError> {
    find_employee(store, employee_id).await?;

    if !submission.ot_hours.is_finite() || submission.ot_hours <= 0.0 || submission.ot_hours > 24.0 {
        return Err(AppError::BadRequest(
            "ot_hours must be greater than 0 and at most 24".to_string(),
        ));
    }

    let payload = RequestPayload::Overtime {
        work_date: submission.work_date,
        ot_hours: submission.ot_hours,
    };
    submit(store, actor_user_id, Request::new(employee_id, payload, submission.reason, now)).await
}

async fn pending_request<S: PayrollStore>(store: &S, request_id: Uuid) -> Result<Request, AppError> {
    let request = store
        .get_request(request_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Request {} not found", request_id)))?;

    if request.status.is_terminal() {
        return Err(AppError::Conflict(format!(
            "Request {} is already {}",
            request_id, request.status
        )));
    }
    Ok(request)
}

/// Attendance rows and balance usage a decision writes along with its status.
#[derive(Debug, Default)]
struct SideEffects {
    attendance: Vec<AttendanceRecord>,
    leave_usage: Option<LeaveUsage>,
}

/// Moves a pending request to `status` and writes its side effects with it. The
/// store applies the decision only while the request is still pending, so exactly
/// one decision wins and a lost race leaves nothing half-applied.
async fn decide<S: PayrollStore>(
    store: &S,
    mut request: Request,
    status: RequestStatus,
    actor_user_id: Uuid,
    note: Option<String>,
    now: DateTime<Utc>,
    effects: SideEffects,
) -> Result<Request, AppError> {
    request.status = status;
    request.decision_note = note.clone();
    request.updated_at = now;
    request.decided_at = Some(now);
    if status != RequestStatus::Cancelled {
        request.approver_user_id = Some(actor_user_id);
    }

    let (action, audit_action) = match status {
        RequestStatus::Approved => (RequestAction::Approved, Action::APPROVED),
        RequestStatus::Rejected => (RequestAction::Rejected, Action::REJECTED),
        _ => (RequestAction::Cancelled, Action::CANCELLED),
    };
    let decision = RequestDecision {
        log: RequestLog::new(request.id, actor_user_id, action, note, now),
        request,
        attendance: effects.attendance,
        leave_usage: effects.leave_usage,
    };
    store.decide_request(&decision).await?;
    let request = decision.request;

    log::info!("{} request {} {}", request.request_type(), request.id, status);
    ActivityLogger::new(store)
        .log_request_activity(
            actor_user_id,
            request.id,
            audit_action,
            format!("{} request {}", request.request_type(), status),
            Some(json!({ "employee_id": request.employee_id })),
        )
        .await;

    Ok(request)
}

async fn attendance_outside_leave<S: PayrollStore>(
    store: &S,
    employee_id: Uuid,
    work_date: NaiveDate,
) -> Result<Option<AttendanceRecord>, AppError> {
    let record = store.get_attendance(employee_id, work_date).await?;
    if record.as_ref().is_some_and(AttendanceRecord::is_leave) {
        return Err(AppError::Conflict(format!(
            "{} is an approved leave day",
            work_date
        )));
    }
    Ok(record)
}

/// Checks an approval's preconditions and prepares the rows it writes.
async fn approval_effects<S: PayrollStore>(
    store: &S,
    policy: &AttendancePolicy,
    employee: &Employee,
    payload: &RequestPayload,
    now: DateTime<Utc>,
) -> Result<SideEffects, AppError> {
    let calendar = HolidayCalendar::load_or_empty(store).await;

    match payload {
        RequestPayload::Leave {
            leave_type_id,
            start_date,
            end_date,
            total_days,
        } => {
            let days = *total_days as f64;
            let balance =
                leave_balance(store, employee.id, *leave_type_id, start_date.year()).await?;
            if days > balance.remaining_days {
                return Err(AppError::Conflict(format!(
                    "Leave balance no longer covers {} days ({} remain)",
                    total_days, balance.remaining_days
                )));
            }

            let mut attendance = Vec::new();
            for date in dates_between(*start_date, *end_date) {
                let mut record = store
                    .get_attendance(employee.id, date)
                    .await?
                    .unwrap_or_else(|| AttendanceRecord::new(employee.id, date, now));
                record.mark_leave(now);
                record.set_holiday(calendar.holiday_on(date));
                attendance.push(record);
            }

            Ok(SideEffects {
                attendance,
                leave_usage: Some(LeaveUsage {
                    employee_id: employee.id,
                    leave_type_id: *leave_type_id,
                    year: start_date.year(),
                    days,
                }),
            })
        }
        RequestPayload::TimeCorrection {
            work_date,
            time_in,
            time_out,
            break_minutes,
        } => {
            let mut record = attendance_outside_leave(store, employee.id, *work_date)
                .await?
                .unwrap_or_else(|| AttendanceRecord::new(employee.id, *work_date, now));
            record.time_in = Some(time_in.clone());
            record.time_out = Some(time_out.clone());
            record.break_minutes = *break_minutes;
            record.updated_at = now;
            recompute_record(&mut record, employee, &calendar, policy);

            Ok(SideEffects {
                attendance: vec![record],
                leave_usage: None,
            })
        }
        RequestPayload::Overtime {
            work_date,
            ot_hours,
        } => {
            let mut record = attendance_outside_leave(store, employee.id, *work_date)
                .await?
                .ok_or_else(|| {
                    AppError::BadRequest(format!(
                        "No attendance on {} to award overtime to",
                        work_date
                    ))
                })?;
            record.approved_overtime_hours = *ot_hours;
            record.updated_at = now;
            recompute_record(&mut record, employee, &calendar, policy);

            Ok(SideEffects {
                attendance: vec![record],
                leave_usage: None,
            })
        }
    }
}

/// Approves a pending request and applies its attendance side effects.
///
/// Preconditions are checked first. The decision, balance usage, attendance rows
/// and log entry are then written together.
pub async fn approve<S: PayrollStore>(
    store: &S,
    policy: &AttendancePolicy,
    request_id: Uuid,
    approver_user_id: Uuid,
    note: Option<String>,
    now: DateTime<Utc>,
) -> Result<Request, AppError> {
    let request = pending_request(store, request_id).await?;
    let employee = find_employee(store, request.employee_id).await?;
    let effects = approval_effects(store, policy, &employee, &request.payload, now).await?;

    decide(
        store,
        request,
        RequestStatus::Approved,
        approver_user_id,
        note,
        now,
        effects,
    )
    .await
}

pub async fn reject<S: PayrollStore>(
    store: &S,
    request_id: Uuid,
    approver_user_id: Uuid,
    note: Option<String>,
    now: DateTime<Utc>,
) -> Result<Request, AppError> {
    let request = pending_request(store, request_id).await?;
    decide(
        store,
        request,
        RequestStatus::Rejected,
        approver_user_id,
        note,
        now,
        SideEffects::default(),
    )
    .await
}

/// Withdraws a pending request. Only the employee who filed it may cancel.
pub async fn cancel<S: PayrollStore>(
    store: &S,
    request_id: Uuid,
    employee_id: Uuid,
    actor_user_id: Uuid,
    note: Option<String>,
    now: DateTime<Utc>,
) -> Result<Request, AppError> {
    let request = store
        .get_request(request_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Request {} not found", request_id)))?;
    if request.employee_id != employee_id {
        return Err(AppError::PermissionDenied(
            "Only the requesting employee can cancel a request".to_string(),
        ));
    }

    let request = pending_request(store, request_id).await?;
    decide(
        store,
        request,
        RequestStatus::Cancelled,
        actor_user_id,
        note,
        now,
        SideEffects::default(),
    )
    .await
}

pub async fn list_requests<S: PayrollStore>(
    store: &S,
    filter: &RequestFilter,
) -> Result<Vec<Request>, AppError> {
    store.list_requests(filter).await
}

pub async fn request_detail<S: PayrollStore>(
    store: &S,
    request_id: Uuid,
) -> Result<RequestDetail, AppError> {
    let request = store
        .get_request(request_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Request {} not found", request_id)))?;
    let logs = store.list_request_logs(request_id).await?;

    Ok(RequestDetail { request, logs })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(value: &str) -> NaiveDate {
        value.parse().unwrap()
    }

    #[test]
    fn leave_days_are_inclusive() {
        assert_eq!(leave_days(date("2025-03-03"), date("2025-03-03")), 1);
        assert_eq!(leave_days(date("2025-03-03"), date("2025-03-07")), 5);
        assert_eq!(leave_days(date("2025-03-07"), date("2025-03-03")), -3);
    }

    #[test]
    fn date_range_spans_month_end() {
        let dates: Vec<NaiveDate> = dates_between(date("2025-01-30"), date("2025-02-02")).collect();

        assert_eq!(
            dates,
            vec![
                date("2025-01-30"),
                date("2025-01-31"),
                date("2025-02-01"),
                date("2025-02-02"),
            ]
        );
    }
}
