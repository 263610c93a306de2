use chrono::Utc;
use pretty_assertions::assert_eq;
use uuid::Uuid;

use ph_payroll::database::models::{Action, HolidayCalendarEntry, HolidayType};
use ph_payroll::database::PayrollStore;
use ph_payroll::error::AppError;
use ph_payroll::services::attendance::{self, AttendanceEdit};
use ph_payroll::services::payroll;
use ph_payroll::services::recalc::{self, RecalcReport, RecalcRequest};
use ph_payroll::services::requests::{self, LeaveSubmission};

mod common;
use common::{date, TestContext};

async fn complete_day(ctx: &TestContext, work_date: &str) {
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

fn june(employee_id: Option<Uuid>) -> RecalcRequest {
    RecalcRequest {
        from: date("2025-06-01"),
        to: date("2025-06-30"),
        employee_id,
    }
}

#[tokio::test]
async fn punches_price_the_day_and_are_audited() {
    let ctx = TestContext::new().await;

    attendance::time_in(&ctx.store, &ctx.policy, ctx.punch("2025-06-10", "08:00"))
        .await
        .unwrap();
    let outcome = attendance::time_out(&ctx.store, &ctx.policy, ctx.punch("2025-06-10", "17:00"))
        .await
        .unwrap();

    // No break recorded on punches: nine hours, one of them overtime.
    assert_eq!(outcome.record.pay.hours_worked, 9.0);
    assert_eq!(outcome.record.pay.regular_pay, 800.0);
    assert_eq!(outcome.record.pay.overtime_pay, 125.0);
    assert_eq!(outcome.record.pay.total_daily_pay, 925.0);
    assert!(outcome.warnings.is_empty());

    let actions: Vec<String> = ctx
        .store
        .audit_events()
        .unwrap()
        .into_iter()
        .map(|event| event.action)
        .collect();
    assert_eq!(actions, vec![Action::TIME_IN.to_string(), Action::TIME_OUT.to_string()]);
}

#[tokio::test]
async fn time_in_on_approved_leave_day_is_a_conflict() {
    let ctx = TestContext::new().await;
    let request = requests::submit_leave(
        &ctx.store,
        ctx.employee.id,
        ctx.user_id,
        LeaveSubmission {
            leave_type_id: ctx.vacation.id,
            start_date: date("2025-06-16"),
            end_date: date("2025-06-16"),
            reason: None,
        },
        Utc::now(),
    )
    .await
    .unwrap();
    requests::approve(&ctx.store, &ctx.policy, request.id, ctx.manager_id, None, Utc::now())
        .await
        .unwrap();

    let err = attendance::time_in(&ctx.store, &ctx.policy, ctx.punch("2025-06-16", "08:00"))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn recalculation_picks_up_a_holiday_added_afterwards() {
    let ctx = TestContext::new().await;
    complete_day(&ctx, "2025-06-12").await;
    ctx.store
        .save_holiday(&HolidayCalendarEntry {
            id: Uuid::new_v4(),
            name: "Independence Day".to_string(),
            holiday_date: date("2025-06-12"),
            holiday_type: HolidayType::RegularHoliday,
            is_recurring: true,
        })
        .await
        .unwrap();

    let report = recalc::recalculate(&ctx.store, &ctx.policy, ctx.manager_id, &june(None))
        .await
        .unwrap();

    assert_eq!(
        report,
        RecalcReport {
            scanned: 1,
            updated: 1,
            skipped: 0,
            failed: 0,
        }
    );
    let record = ctx
        .store
        .get_attendance(ctx.employee.id, date("2025-06-12"))
        .await
        .unwrap()
        .unwrap();
    assert!(record.is_holiday);
    assert_eq!(record.holiday_type, Some(HolidayType::RegularHoliday));
    assert_eq!(record.pay.holiday_pay, 800.0);
    assert_eq!(record.pay.total_daily_pay, 1600.0);
}

#[tokio::test]
async fn recalculation_skips_open_and_leave_records() {
    let ctx = TestContext::new().await;
    complete_day(&ctx, "2025-06-12").await;
    attendance::time_in(&ctx.store, &ctx.policy, ctx.punch("2025-06-13", "08:00"))
        .await
        .unwrap();
    let request = requests::submit_leave(
        &ctx.store,
        ctx.employee.id,
        ctx.user_id,
        LeaveSubmission {
            leave_type_id: ctx.vacation.id,
            start_date: date("2025-06-16"),
            end_date: date("2025-06-16"),
            reason: None,
        },
        Utc::now(),
    )
    .await
    .unwrap();
    requests::approve(&ctx.store, &ctx.policy, request.id, ctx.manager_id, None, Utc::now())
        .await
        .unwrap();

    let report = recalc::recalculate(
        &ctx.store,
        &ctx.policy,
        ctx.manager_id,
        &june(Some(ctx.employee.id)),
    )
    .await
    .unwrap();

    assert_eq!(report.scanned, 3);
    assert_eq!(report.updated, 1);
    assert_eq!(report.skipped, 2);
    assert_eq!(report.failed, 0);
}

#[tokio::test]
async fn recalculation_rejects_an_inverted_range() {
    let ctx = TestContext::new().await;

    let err = recalc::recalculate(
        &ctx.store,
        &ctx.policy,
        ctx.manager_id,
        &RecalcRequest {
            from: date("2025-06-30"),
            to: date("2025-06-01"),
            employee_id: None,
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn period_summary_counts_open_records_and_lateness() {
    let ctx = TestContext::new().await;
    attendance::time_in(&ctx.store, &ctx.policy, ctx.punch("2025-06-12", "08:30"))
        .await
        .unwrap();
    attendance::time_out(&ctx.store, &ctx.policy, ctx.punch("2025-06-12", "17:30"))
        .await
        .unwrap();
    attendance::time_in(&ctx.store, &ctx.policy, ctx.punch("2025-06-13", "08:00"))
        .await
        .unwrap();

    let summary = payroll::summarize_period(
        &ctx.store,
        ctx.employee.id,
        date("2025-06-01"),
        date("2025-06-30"),
    )
    .await
    .unwrap();

    assert_eq!(summary.days_worked, 1);
    assert_eq!(summary.open_records, 1);
    assert_eq!(summary.leave_days, 0);
    assert_eq!(summary.late_minutes, 30);
    assert_eq!(summary.totals.hours_worked, 9.0);
    assert_eq!(summary.gross_pay(), 925.0);
}

#[tokio::test]
async fn my_attendance_is_limited_to_the_range() {
    let ctx = TestContext::new().await;
    complete_day(&ctx, "2025-06-12").await;
    complete_day(&ctx, "2025-07-01").await;

    let records = attendance::my_attendance(
        &ctx.store,
        ctx.employee.id,
        Some(date("2025-06-01")),
        Some(date("2025-06-30")),
    )
    .await
    .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].work_date, date("2025-06-12"));
}

#[tokio::test]
async fn an_empty_row_is_opened_only_once() {
    let ctx = TestContext::new().await;
    attendance::admin_edit(
        &ctx.store,
        &ctx.policy,
        ctx.manager_id,
        ctx.employee.id,
        date("2025-06-20"),
        AttendanceEdit::default(),
    )
    .await
    .unwrap();
    let mut stale = ctx
        .store
        .get_attendance(ctx.employee.id, date("2025-06-20"))
        .await
        .unwrap()
        .unwrap();

    let opened = attendance::time_in(&ctx.store, &ctx.policy, ctx.punch("2025-06-20", "08:00"))
        .await
        .unwrap();
    assert_eq!(opened.record.time_in.as_deref(), Some("08:00"));

    // A second punch that read the row before the first one landed.
    stale.time_in = Some("08:05".to_string());
    let err = ctx.store.open_attendance(&stale).await.unwrap_err();

    assert!(matches!(err, AppError::Conflict(_)));
    let stored = ctx
        .store
        .get_attendance(ctx.employee.id, date("2025-06-20"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.time_in.as_deref(), Some("08:00"));
}
