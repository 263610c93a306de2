use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::database::models::{RequestFilter, RequestStatus, RequestType};
use crate::database::PayrollStore;
use crate::error::AppError;
use crate::handlers::shared::{parse_filter, ApiResponse, DecisionInput};
use crate::services::auth::Claims;
use crate::services::policy::PolicyCache;
use crate::services::requests::{
    self, LeaveSubmission, OvertimeSubmission, TimeCorrectionSubmission,
};

#[derive(Debug, Deserialize)]
pub struct RequestQuery {
    pub employee_id: Option<Uuid>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub request_type: Option<String>,
}

pub async fn submit_leave<S: PayrollStore + 'static>(
    claims: Claims,
    store: web::Data<S>,
    input: web::Json<LeaveSubmission>,
) -> Result<HttpResponse, AppError> {
    let employee_id = claims.requires_employee()?;

    let request = requests::submit_leave(
        store.get_ref(),
        employee_id,
        claims.user_id(),
        input.into_inner(),
        Utc::now(),
    )
    .await?;

    Ok(HttpResponse::Created().json(ApiResponse::success(request)))
}

pub async fn submit_time_correction<S: PayrollStore + 'static>(
    claims: Claims,
    store: web::Data<S>,
    input: web::Json<TimeCorrectionSubmission>,
) -> Result<HttpResponse, AppError> {
    let employee_id = claims.requires_employee()?;

    let request = requests::submit_time_correction(
        store.get_ref(),
        employee_id,
        claims.user_id(),
        input.into_inner(),
        Utc::now(),
    )
    .await?;

    Ok(HttpResponse::Created().json(ApiResponse::success(request)))
}

pub async fn submit_overtime<S: PayrollStore + 'static>(
    claims: Claims,
    store: web::Data<S>,
    input: web::Json<OvertimeSubmission>,
) -> Result<HttpResponse, AppError> {
    let employee_id = claims.requires_employee()?;

    let request = requests::submit_overtime(
        store.get_ref(),
        employee_id,
        claims.user_id(),
        input.into_inner(),
        Utc::now(),
    )
    .await?;

    Ok(HttpResponse::Created().json(ApiResponse::success(request)))
}

/// Employees only ever see their own requests; managers may filter by employee
pub async fn list_requests<S: PayrollStore + 'static>(
    claims: Claims,
    store: web::Data<S>,
    query: web::Query<RequestQuery>,
) -> Result<HttpResponse, AppError> {
    let employee_id = if claims.is_manager_or_admin() {
        query.employee_id
    } else {
        Some(claims.requires_employee()?)
    };

    let filter = RequestFilter {
        employee_id,
        status: parse_filter::<RequestStatus>(query.status.as_deref(), "status")?,
        request_type: parse_filter::<RequestType>(query.request_type.as_deref(), "type")?,
    };

    let requests = requests::list_requests(store.get_ref(), &filter).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(requests)))
}

pub async fn get_request<S: PayrollStore + 'static>(
    claims: Claims,
    store: web::Data<S>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let detail = requests::request_detail(store.get_ref(), path.into_inner()).await?;
    claims.requires_same_employee(detail.request.employee_id)?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(detail)))
}

pub async fn approve_request<S: PayrollStore + 'static>(
    claims: Claims,
    store: web::Data<S>,
    policy: web::Data<PolicyCache>,
    path: web::Path<Uuid>,
    input: web::Json<DecisionInput>,
) -> Result<HttpResponse, AppError> {
    claims.requires_manager()?;
    let policy = policy.get(store.get_ref()).await;

    let request = requests::approve(
        store.get_ref(),
        &policy,
        path.into_inner(),
        claims.user_id(),
        input.into_inner().note,
        Utc::now(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(request)))
}

pub async fn reject_request<S: PayrollStore + 'static>(
    claims: Claims,
    store: web::Data<S>,
    path: web::Path<Uuid>,
    input: web::Json<DecisionInput>,
) -> Result<HttpResponse, AppError> {
    claims.requires_manager()?;

    let request = requests::reject(
        store.get_ref(),
        path.into_inner(),
        claims.user_id(),
        input.into_inner().note,
        Utc::now(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(request)))
}

pub async fn cancel_request<S: PayrollStore + 'static>(
    claims: Claims,
    store: web::Data<S>,
    path: web::Path<Uuid>,
    input: web::Json<DecisionInput>,
) -> Result<HttpResponse, AppError> {
    let employee_id = claims.requires_employee()?;

    let request = requests::cancel(
        store.get_ref(),
        path.into_inner(),
        employee_id,
        claims.user_id(),
        input.into_inner().note,
        Utc::now(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(request)))
}
