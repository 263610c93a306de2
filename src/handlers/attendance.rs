use actix_web::{web, HttpResponse};
use chrono::{Local, NaiveDate};
use uuid::Uuid;

use crate::database::models::PunchProof;
use crate::database::PayrollStore;
use crate::error::AppError;
use crate::handlers::shared::{ApiResponse, DateRangeQuery, PeriodQuery};
use crate::services::attendance::{self, AttendanceEdit, PunchClock, PunchRequest};
use crate::services::auth::Claims;
use crate::services::payroll;
use crate::services::policy::PolicyCache;
use crate::services::recalc::{self, RecalcRequest};

fn punch_request(claims: &Claims, proof: PunchProof) -> Result<PunchRequest, AppError> {
    Ok(PunchRequest {
        employee_id: claims.requires_employee()?,
        actor_user_id: claims.user_id(),
        clock: PunchClock::from_local(Local::now()),
        proof,
    })
}

pub async fn time_in<S: PayrollStore + 'static>(
    claims: Claims,
    store: web::Data<S>,
    policy: web::Data<PolicyCache>,
    input: web::Json<PunchProof>,
) -> Result<HttpResponse, AppError> {
    let request = punch_request(&claims, input.into_inner())?;
    let policy = policy.get(store.get_ref()).await;

    let outcome = attendance::time_in(store.get_ref(), &policy, request).await?;

    Ok(HttpResponse::Created().json(ApiResponse::success(outcome)))
}

pub async fn time_out<S: PayrollStore + 'static>(
    claims: Claims,
    store: web::Data<S>,
    policy: web::Data<PolicyCache>,
    input: web::Json<PunchProof>,
) -> Result<HttpResponse, AppError> {
    let request = punch_request(&claims, input.into_inner())?;
    let policy = policy.get(store.get_ref()).await;

    let outcome = attendance::time_out(store.get_ref(), &policy, request).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(outcome)))
}

/// The caller's own attendance, optionally limited to a date range
pub async fn my_attendance<S: PayrollStore + 'static>(
    claims: Claims,
    store: web::Data<S>,
    query: web::Query<DateRangeQuery>,
) -> Result<HttpResponse, AppError> {
    let employee_id = claims.requires_employee()?;

    let records =
        attendance::my_attendance(store.get_ref(), employee_id, query.from, query.to).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(records)))
}

pub async fn my_summary<S: PayrollStore + 'static>(
    claims: Claims,
    store: web::Data<S>,
    query: web::Query<PeriodQuery>,
) -> Result<HttpResponse, AppError> {
    let employee_id = claims.requires_employee()?;

    let summary =
        payroll::summarize_period(store.get_ref(), employee_id, query.from, query.to).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(summary)))
}

pub async fn edit_attendance<S: PayrollStore + 'static>(
    claims: Claims,
    store: web::Data<S>,
    policy: web::Data<PolicyCache>,
    path: web::Path<(Uuid, NaiveDate)>,
    input: web::Json<AttendanceEdit>,
) -> Result<HttpResponse, AppError> {
    claims.requires_manager()?;
    let (employee_id, work_date) = path.into_inner();
    let policy = policy.get(store.get_ref()).await;

    let record = attendance::admin_edit(
        store.get_ref(),
        &policy,
        claims.user_id(),
        employee_id,
        work_date,
        input.into_inner(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(record)))
}

pub async fn recalculate<S: PayrollStore + 'static>(
    claims: Claims,
    store: web::Data<S>,
    policy: web::Data<PolicyCache>,
    input: web::Json<RecalcRequest>,
) -> Result<HttpResponse, AppError> {
    claims.requires_manager()?;
    let policy = policy.get(store.get_ref()).await;

    let report = recalc::recalculate(store.get_ref(), &policy, claims.user_id(), &input).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(report)))
}
