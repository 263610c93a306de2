use actix_web::{web, HttpResponse};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::PayrollStore;
use crate::error::AppError;
use crate::handlers::shared::{ApiResponse, PeriodQuery};
use crate::services::auth::Claims;
use crate::services::payroll;

#[derive(Debug, Deserialize)]
pub struct PayrollRunInput {
    pub period_from: NaiveDate,
    pub period_to: NaiveDate,
}

/// Payslips for every active employee over the period
pub async fn preview_payslips<S: PayrollStore + 'static>(
    claims: Claims,
    store: web::Data<S>,
    query: web::Query<PeriodQuery>,
) -> Result<HttpResponse, AppError> {
    claims.requires_manager()?;

    let preview = payroll::preview_all(store.get_ref(), query.from, query.to).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(preview)))
}

pub async fn get_payslip<S: PayrollStore + 'static>(
    claims: Claims,
    store: web::Data<S>,
    path: web::Path<Uuid>,
    query: web::Query<PeriodQuery>,
) -> Result<HttpResponse, AppError> {
    let employee_id = path.into_inner();
    claims.requires_same_employee(employee_id)?;

    let payslip = payroll::payslip(store.get_ref(), employee_id, query.from, query.to).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(payslip)))
}

pub async fn create_run<S: PayrollStore + 'static>(
    claims: Claims,
    store: web::Data<S>,
    input: web::Json<PayrollRunInput>,
) -> Result<HttpResponse, AppError> {
    claims.requires_manager()?;

    let run = payroll::mark_paid(
        store.get_ref(),
        claims.user_id(),
        input.period_from,
        input.period_to,
        Utc::now(),
    )
    .await?;

    Ok(HttpResponse::Created().json(ApiResponse::success_with_message(
        run,
        "Payroll period marked as paid",
    )))
}

pub async fn list_runs<S: PayrollStore + 'static>(
    claims: Claims,
    store: web::Data<S>,
) -> Result<HttpResponse, AppError> {
    claims.requires_manager()?;

    let runs = payroll::list_runs(store.get_ref()).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(runs)))
}
