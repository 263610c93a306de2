use std::collections::HashMap;

use actix_web::{web, HttpResponse};
use serde_json::json;
use uuid::Uuid;

use crate::database::models::{Action, EntityType, HolidayCalendarEntry, HolidayInput};
use crate::database::PayrollStore;
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::activity_logger::ActivityLogger;
use crate::services::auth::Claims;
use crate::services::policy::PolicyCache;

pub async fn list_holidays<S: PayrollStore + 'static>(
    claims: Claims,
    store: web::Data<S>,
) -> Result<HttpResponse, AppError> {
    claims.requires_manager()?;

    let holidays = store.list_holidays().await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(holidays)))
}

pub async fn create_holiday<S: PayrollStore + 'static>(
    claims: Claims,
    store: web::Data<S>,
    input: web::Json<HolidayInput>,
) -> Result<HttpResponse, AppError> {
    claims.requires_manager()?;
    let input = input.into_inner();
    if input.name.trim().is_empty() {
        return Err(AppError::BadRequest("Holiday name is required".to_string()));
    }

    let entry = HolidayCalendarEntry::from(input);
    store.save_holiday(&entry).await?;

    log::info!("Holiday {} added on {}", entry.name, entry.holiday_date);
    ActivityLogger::new(store.get_ref())
        .log_reference_activity(
            claims.user_id(),
            EntityType::HOLIDAY,
            entry.id,
            Action::CREATED,
            format!("Holiday {} added on {}", entry.name, entry.holiday_date),
            Some(json!({
                "holiday_type": entry.holiday_type,
                "is_recurring": entry.is_recurring,
            })),
        )
        .await;

    Ok(HttpResponse::Created().json(ApiResponse::success(entry)))
}

pub async fn delete_holiday<S: PayrollStore + 'static>(
    claims: Claims,
    store: web::Data<S>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    claims.requires_manager()?;
    let holiday_id = path.into_inner();

    if !store.delete_holiday(holiday_id).await? {
        return Err(AppError::NotFound("Holiday not found".to_string()));
    }

    ActivityLogger::new(store.get_ref())
        .log_reference_activity(
            claims.user_id(),
            EntityType::HOLIDAY,
            holiday_id,
            Action::DELETED,
            "Holiday removed from the calendar".to_string(),
            None,
        )
        .await;

    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        holiday_id,
        "Holiday deleted",
    )))
}

pub async fn get_policy<S: PayrollStore + 'static>(
    claims: Claims,
    store: web::Data<S>,
    policy: web::Data<PolicyCache>,
) -> Result<HttpResponse, AppError> {
    claims.requires_manager()?;

    let policy = policy.get(store.get_ref()).await;

    Ok(HttpResponse::Ok().json(ApiResponse::success(policy.to_settings())))
}

/// Updates any subset of policy keys; an unknown key or bad value rejects the whole update.
pub async fn update_policy<S: PayrollStore + 'static>(
    claims: Claims,
    store: web::Data<S>,
    policy: web::Data<PolicyCache>,
    input: web::Json<HashMap<String, String>>,
) -> Result<HttpResponse, AppError> {
    claims.requires_manager()?;
    let settings = input.into_inner();

    let updated = policy.update(store.get_ref(), &settings).await?;

    ActivityLogger::new(store.get_ref())
        .log_reference_activity(
            claims.user_id(),
            EntityType::POLICY,
            Uuid::nil(),
            Action::UPDATED,
            "Attendance policy updated".to_string(),
            Some(json!(settings)),
        )
        .await;

    Ok(HttpResponse::Ok().json(ApiResponse::success(updated.to_settings())))
}
