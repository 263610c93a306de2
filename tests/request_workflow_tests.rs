use chrono::Utc;
use pretty_assertions::assert_eq;

use ph_payroll::database::models::{
    AttendanceRecord, AttendanceStatus, LeaveUsage, Request, RequestAction, RequestDecision,
    RequestFilter, RequestLog, RequestStatus, RequestType,
};
use ph_payroll::database::PayrollStore;
use ph_payroll::error::AppError;
use ph_payroll::services::attendance::{self, AttendanceEdit};
use ph_payroll::services::payroll;
use ph_payroll::services::recalc::{self, RecalcRequest};
use ph_payroll::services::requests::{
    self, LeaveSubmission, OvertimeSubmission, TimeCorrectionSubmission,
};

mod common;
use common::{date, TestContext, ALLOCATED_LEAVE_DAYS, LEAVE_YEAR};

fn leave(ctx: &TestContext, start: &str, end: &str) -> LeaveSubmission {
    LeaveSubmission {
        leave_type_id: ctx.vacation.id,
        start_date: date(start),
        end_date: date(end),
        reason: Some("Family trip".to_string()),
    }
}

async fn submit_leave(ctx: &TestContext, start: &str, end: &str) -> Result<Request, AppError> {
    requests::submit_leave(
        &ctx.store,
        ctx.employee.id,
        ctx.user_id,
        leave(ctx, start, end),
        Utc::now(),
    )
    .await
}

async fn work_day(ctx: &TestContext, work_date: &str) {
    attendance::admin_edit(
        &ctx.store,
        &ctx.policy,
        ctx.manager_id,
        ctx.employee.id,
        date(work_date),
        AttendanceEdit {
            time_in: Some("08:00".to_string()),
            time_out: Some("17:00".to_string()),
            break_minutes: 60,
            ..Default::default()
        },
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn leave_equal_to_remaining_balance_is_approved_and_consumes_it() {
    let ctx = TestContext::new().await;

    let request = submit_leave(&ctx, "2025-03-03", "2025-03-07").await.unwrap();
    assert_eq!(request.status, RequestStatus::Pending);

    let approved = requests::approve(
        &ctx.store,
        &ctx.policy,
        request.id,
        ctx.manager_id,
        Some("Enjoy".to_string()),
        Utc::now(),
    )
    .await
    .unwrap();
    assert_eq!(approved.status, RequestStatus::Approved);
    assert_eq!(approved.approver_user_id, Some(ctx.manager_id));
    assert!(approved.decided_at.is_some());

    let balance = ctx
        .store
        .get_leave_balance(ctx.employee.id, ctx.vacation.id, LEAVE_YEAR)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(balance.used_days, ALLOCATED_LEAVE_DAYS);
    assert_eq!(balance.remaining_days, 0.0);
}

#[tokio::test]
async fn leave_beyond_remaining_balance_is_rejected() {
    let ctx = TestContext::new().await;

    let err = submit_leave(&ctx, "2025-03-03", "2025-03-08").await.unwrap_err();

    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn leave_ending_before_it_starts_is_rejected() {
    let ctx = TestContext::new().await;

    let err = submit_leave(&ctx, "2025-03-07", "2025-03-03").await.unwrap_err();

    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn overlapping_leave_is_a_conflict() {
    let ctx = TestContext::new().await;
    submit_leave(&ctx, "2025-03-03", "2025-03-04").await.unwrap();

    let err = submit_leave(&ctx, "2025-03-04", "2025-03-05").await.unwrap_err();

    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn cancelled_leave_no_longer_blocks_the_dates() {
    let ctx = TestContext::new().await;
    let first = submit_leave(&ctx, "2025-03-03", "2025-03-04").await.unwrap();
    requests::cancel(&ctx.store, first.id, ctx.employee.id, ctx.user_id, None, Utc::now())
        .await
        .unwrap();

    let second = submit_leave(&ctx, "2025-03-04", "2025-03-05").await;

    assert!(second.is_ok());
}

#[tokio::test]
async fn approved_leave_zeroes_pay_for_every_covered_day() {
    let ctx = TestContext::new().await;
    work_day(&ctx, "2025-03-03").await;
    let before = payroll::summarize_period(&ctx.store, ctx.employee.id, date("2025-03-03"), date("2025-03-04"))
        .await
        .unwrap();
    assert_eq!(before.gross_pay(), 800.0);

    let request = submit_leave(&ctx, "2025-03-03", "2025-03-04").await.unwrap();
    requests::approve(&ctx.store, &ctx.policy, request.id, ctx.manager_id, None, Utc::now())
        .await
        .unwrap();

    for day in ["2025-03-03", "2025-03-04"] {
        let record = ctx
            .store
            .get_attendance(ctx.employee.id, date(day))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.status, AttendanceStatus::Leave);
        assert_eq!(record.time_in, None);
        assert_eq!(record.pay.total_daily_pay, 0.0);
    }

    let after = payroll::summarize_period(&ctx.store, ctx.employee.id, date("2025-03-03"), date("2025-03-04"))
        .await
        .unwrap();
    assert_eq!(after.leave_days, 2);
    assert_eq!(after.days_worked, 0);
    assert_eq!(after.gross_pay(), 0.0);
}

#[tokio::test]
async fn approving_time_correction_reprices_the_day() {
    let ctx = TestContext::new().await;
    let request = requests::submit_time_correction(
        &ctx.store,
        ctx.employee.id,
        ctx.user_id,
        TimeCorrectionSubmission {
            work_date: date("2025-03-05"),
            time_in: "08:00".to_string(),
            time_out: "19:00".to_string(),
            break_minutes: 60,
            reason: Some("Forgot to punch".to_string()),
        },
        Utc::now(),
    )
    .await
    .unwrap();

    requests::approve(&ctx.store, &ctx.policy, request.id, ctx.manager_id, None, Utc::now())
        .await
        .unwrap();

    let record = ctx
        .store
        .get_attendance(ctx.employee.id, date("2025-03-05"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.time_in.as_deref(), Some("08:00"));
    assert_eq!(record.time_out.as_deref(), Some("19:00"));
    assert_eq!(record.pay.hours_worked, 10.0);
    assert_eq!(record.pay.regular_hours, 8.0);
    assert_eq!(record.pay.overtime_hours, 2.0);
    assert_eq!(record.pay.regular_pay, 800.0);
    assert_eq!(record.pay.overtime_pay, 250.0);
    assert_eq!(record.pay.total_daily_pay, 1050.0);
}

#[tokio::test]
async fn time_correction_with_malformed_time_is_rejected() {
    let ctx = TestContext::new().await;

    let err = requests::submit_time_correction(
        &ctx.store,
        ctx.employee.id,
        ctx.user_id,
        TimeCorrectionSubmission {
            work_date: date("2025-03-05"),
            time_in: "8am".to_string(),
            time_out: "17:00".to_string(),
            break_minutes: 0,
            reason: None,
        },
        Utc::now(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn approved_overtime_keeps_regular_hours() {
    let ctx = TestContext::new().await;
    work_day(&ctx, "2025-03-05").await;
    let request = requests::submit_overtime(
        &ctx.store,
        ctx.employee.id,
        ctx.user_id,
        OvertimeSubmission {
            work_date: date("2025-03-05"),
            ot_hours: 2.0,
            reason: Some("Month-end close".to_string()),
        },
        Utc::now(),
    )
    .await
    .unwrap();

    requests::approve(&ctx.store, &ctx.policy, request.id, ctx.manager_id, None, Utc::now())
        .await
        .unwrap();

    let record = ctx
        .store
        .get_attendance(ctx.employee.id, date("2025-03-05"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.approved_overtime_hours, 2.0);
    assert_eq!(record.manual_overtime_hours, 0.0);
    assert_eq!(record.pay.regular_hours, 8.0);
    assert_eq!(record.pay.overtime_hours, 2.0);
    assert_eq!(record.pay.overtime_pay, 250.0);
    assert_eq!(record.pay.total_daily_pay, 1050.0);
}

async fn submit_overtime(ctx: &TestContext, work_date: &str, ot_hours: f64) -> Request {
    requests::submit_overtime(
        &ctx.store,
        ctx.employee.id,
        ctx.user_id,
        OvertimeSubmission {
            work_date: date(work_date),
            ot_hours,
            reason: None,
        },
        Utc::now(),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn approved_overtime_survives_recalculation() {
    let ctx = TestContext::new().await;
    work_day(&ctx, "2025-03-05").await;
    let request = submit_overtime(&ctx, "2025-03-05", 2.0).await;
    requests::approve(&ctx.store, &ctx.policy, request.id, ctx.manager_id, None, Utc::now())
        .await
        .unwrap();
    let approved = ctx
        .store
        .get_attendance(ctx.employee.id, date("2025-03-05"))
        .await
        .unwrap()
        .unwrap();

    recalc::recalculate(
        &ctx.store,
        &ctx.policy,
        ctx.manager_id,
        &RecalcRequest {
            from: date("2025-03-01"),
            to: date("2025-03-31"),
            employee_id: Some(ctx.employee.id),
        },
    )
    .await
    .unwrap();

    let recalculated = ctx
        .store
        .get_attendance(ctx.employee.id, date("2025-03-05"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(recalculated.pay, approved.pay);
    assert_eq!(recalculated.pay.regular_hours, 8.0);
    assert_eq!(recalculated.pay.total_daily_pay, 1050.0);
}

#[tokio::test]
async fn overtime_on_a_leave_day_is_a_conflict() {
    let ctx = TestContext::new().await;
    let leave = submit_leave(&ctx, "2025-03-05", "2025-03-05").await.unwrap();
    requests::approve(&ctx.store, &ctx.policy, leave.id, ctx.manager_id, None, Utc::now())
        .await
        .unwrap();
    let overtime = submit_overtime(&ctx, "2025-03-05", 3.0).await;

    let err = requests::approve(&ctx.store, &ctx.policy, overtime.id, ctx.manager_id, None, Utc::now())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Conflict(_)));
    let stored = ctx.store.get_request(overtime.id).await.unwrap().unwrap();
    assert_eq!(stored.status, RequestStatus::Pending);
    let record = ctx
        .store
        .get_attendance(ctx.employee.id, date("2025-03-05"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, AttendanceStatus::Leave);
    assert_eq!(record.pay.total_daily_pay, 0.0);
}

#[tokio::test]
async fn time_correction_on_a_leave_day_is_a_conflict() {
    let ctx = TestContext::new().await;
    let leave = submit_leave(&ctx, "2025-03-05", "2025-03-05").await.unwrap();
    requests::approve(&ctx.store, &ctx.policy, leave.id, ctx.manager_id, None, Utc::now())
        .await
        .unwrap();
    let correction = requests::submit_time_correction(
        &ctx.store,
        ctx.employee.id,
        ctx.user_id,
        TimeCorrectionSubmission {
            work_date: date("2025-03-05"),
            time_in: "08:00".to_string(),
            time_out: "17:00".to_string(),
            break_minutes: 60,
            reason: None,
        },
        Utc::now(),
    )
    .await
    .unwrap();

    let err = requests::approve(&ctx.store, &ctx.policy, correction.id, ctx.manager_id, None, Utc::now())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Conflict(_)));
    let record = ctx
        .store
        .get_attendance(ctx.employee.id, date("2025-03-05"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, AttendanceStatus::Leave);
    assert_eq!(record.time_in, None);
}

#[tokio::test]
async fn approvals_accumulate_used_days() {
    let ctx = TestContext::new().await;
    let first = submit_leave(&ctx, "2025-03-03", "2025-03-05").await.unwrap();
    let second = submit_leave(&ctx, "2025-03-10", "2025-03-11").await.unwrap();

    for request in [&first, &second] {
        requests::approve(&ctx.store, &ctx.policy, request.id, ctx.manager_id, None, Utc::now())
            .await
            .unwrap();
    }

    let balance = ctx
        .store
        .get_leave_balance(ctx.employee.id, ctx.vacation.id, LEAVE_YEAR)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(balance.used_days, 5.0);
    assert_eq!(balance.remaining_days, 0.0);
}

#[tokio::test]
async fn decision_on_a_spent_balance_writes_nothing() {
    let ctx = TestContext::new().await;
    let first = submit_leave(&ctx, "2025-03-03", "2025-03-05").await.unwrap();
    let second = submit_leave(&ctx, "2025-03-10", "2025-03-12").await.unwrap();
    requests::approve(&ctx.store, &ctx.policy, first.id, ctx.manager_id, None, Utc::now())
        .await
        .unwrap();

    // Written as if the second approval had read the balance before the first landed.
    let now = Utc::now();
    let mut approved = second.clone();
    approved.status = RequestStatus::Approved;
    approved.approver_user_id = Some(ctx.manager_id);
    approved.decided_at = Some(now);
    let mut leave_day = AttendanceRecord::new(ctx.employee.id, date("2025-03-10"), now);
    leave_day.mark_leave(now);
    let decision = RequestDecision {
        log: RequestLog::new(second.id, ctx.manager_id, RequestAction::Approved, None, now),
        request: approved,
        attendance: vec![leave_day],
        leave_usage: Some(LeaveUsage {
            employee_id: ctx.employee.id,
            leave_type_id: ctx.vacation.id,
            year: LEAVE_YEAR,
            days: 3.0,
        }),
    };

    let err = ctx.store.decide_request(&decision).await.unwrap_err();

    assert!(matches!(err, AppError::Conflict(_)));
    let detail = requests::request_detail(&ctx.store, second.id).await.unwrap();
    assert_eq!(detail.request.status, RequestStatus::Pending);
    assert_eq!(detail.logs.len(), 1);
    assert!(ctx
        .store
        .get_attendance(ctx.employee.id, date("2025-03-10"))
        .await
        .unwrap()
        .is_none());
    let balance = ctx
        .store
        .get_leave_balance(ctx.employee.id, ctx.vacation.id, LEAVE_YEAR)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(balance.used_days, 3.0);
}

#[tokio::test]
async fn overtime_without_attendance_cannot_be_approved() {
    let ctx = TestContext::new().await;
    let request = requests::submit_overtime(
        &ctx.store,
        ctx.employee.id,
        ctx.user_id,
        OvertimeSubmission {
            work_date: date("2025-03-06"),
            ot_hours: 1.5,
            reason: None,
        },
        Utc::now(),
    )
    .await
    .unwrap();

    let err = requests::approve(&ctx.store, &ctx.policy, request.id, ctx.manager_id, None, Utc::now())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::BadRequest(_)));
    let stored = ctx.store.get_request(request.id).await.unwrap().unwrap();
    assert_eq!(stored.status, RequestStatus::Pending);
}

#[tokio::test]
async fn overtime_hours_must_be_within_a_day() {
    let ctx = TestContext::new().await;

    for ot_hours in [0.0, -1.0, 24.5] {
        let result = requests::submit_overtime(
            &ctx.store,
            ctx.employee.id,
            ctx.user_id,
            OvertimeSubmission {
                work_date: date("2025-03-06"),
                ot_hours,
                reason: None,
            },
            Utc::now(),
        )
        .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))), "ot_hours {}", ot_hours);
    }
}

#[tokio::test]
async fn a_decided_request_cannot_be_decided_again() {
    let ctx = TestContext::new().await;
    let request = submit_leave(&ctx, "2025-03-03", "2025-03-03").await.unwrap();
    requests::reject(&ctx.store, request.id, ctx.manager_id, Some("Busy week".to_string()), Utc::now())
        .await
        .unwrap();

    let approve = requests::approve(&ctx.store, &ctx.policy, request.id, ctx.manager_id, None, Utc::now()).await;
    let cancel = requests::cancel(&ctx.store, request.id, ctx.employee.id, ctx.user_id, None, Utc::now()).await;

    assert!(matches!(approve, Err(AppError::Conflict(_))));
    assert!(matches!(cancel, Err(AppError::Conflict(_))));

    let balance = ctx
        .store
        .get_leave_balance(ctx.employee.id, ctx.vacation.id, LEAVE_YEAR)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(balance.remaining_days, ALLOCATED_LEAVE_DAYS);
}

#[tokio::test]
async fn only_the_requester_can_cancel() {
    let ctx = TestContext::new().await;
    let request = submit_leave(&ctx, "2025-03-03", "2025-03-03").await.unwrap();

    let err = requests::cancel(&ctx.store, request.id, uuid::Uuid::new_v4(), ctx.manager_id, None, Utc::now())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::PermissionDenied(_)));
}

#[tokio::test]
async fn request_detail_lists_every_transition() {
    let ctx = TestContext::new().await;
    let request = submit_leave(&ctx, "2025-03-03", "2025-03-03").await.unwrap();
    requests::cancel(
        &ctx.store,
        request.id,
        ctx.employee.id,
        ctx.user_id,
        Some("Plans changed".to_string()),
        Utc::now(),
    )
    .await
    .unwrap();

    let detail = requests::request_detail(&ctx.store, request.id).await.unwrap();

    assert_eq!(detail.request.status, RequestStatus::Cancelled);
    assert_eq!(detail.request.approver_user_id, None);
    let actions: Vec<RequestAction> = detail.logs.iter().map(|log| log.action).collect();
    assert_eq!(actions, vec![RequestAction::Submitted, RequestAction::Cancelled]);
}

#[tokio::test]
async fn requests_can_be_filtered_by_status_and_type() {
    let ctx = TestContext::new().await;
    submit_leave(&ctx, "2025-03-03", "2025-03-03").await.unwrap();
    requests::submit_overtime(
        &ctx.store,
        ctx.employee.id,
        ctx.user_id,
        OvertimeSubmission {
            work_date: date("2025-03-04"),
            ot_hours: 1.0,
            reason: None,
        },
        Utc::now(),
    )
    .await
    .unwrap();

    let leave_only = requests::list_requests(
        &ctx.store,
        &RequestFilter {
            employee_id: Some(ctx.employee.id),
            status: Some(RequestStatus::Pending),
            request_type: Some(RequestType::Leave),
        },
    )
    .await
    .unwrap();

    assert_eq!(leave_only.len(), 1);
    assert_eq!(leave_only[0].request_type(), RequestType::Leave);
}
