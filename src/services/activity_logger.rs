use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::database::models::{AuditEvent, EntityType};
use crate::database::PayrollStore;
use crate::error::AppError;

/// Appends audit events. A failed append is logged and never fails the caller.
pub struct ActivityLogger<'a, S: PayrollStore> {
    store: &'a S,
}

impl<'a, S: PayrollStore> ActivityLogger<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Generic activity logging for custom cases
    pub async fn log_activity(
        &self,
        actor_user_id: Option<Uuid>,
        entity_type: &str,
        entity_id: Uuid,
        action: &str,
        description: String,
        metadata: Option<Value>,
    ) -> Result<(), AppError> {
        let event = AuditEvent {
            id: Uuid::new_v4(),
            actor_user_id,
            entity_type: entity_type.to_string(),
            entity_id,
            action: action.to_string(),
            description,
            metadata,
            created_at: Utc::now(),
        };

        self.store.append_audit_event(&event).await
    }

    async fn record(
        &self,
        actor_user_id: Option<Uuid>,
        entity_type: &str,
        entity_id: Uuid,
        action: &str,
        description: String,
        metadata: Option<Value>,
    ) {
        if let Err(e) = self
            .log_activity(actor_user_id, entity_type, entity_id, action, description, metadata)
            .await
        {
            log::warn!("Failed to log {} {} activity: {}", entity_type, action, e);
        }
    }

    /// Punches and admin edits of an attendance row
    pub async fn log_attendance_activity(
        &self,
        actor_user_id: Option<Uuid>,
        attendance_id: Uuid,
        action: &str,
        description: String,
        metadata: Option<Value>,
    ) {
        self.record(
            actor_user_id,
            EntityType::ATTENDANCE,
            attendance_id,
            action,
            description,
            metadata,
        )
        .await
    }

    /// Request submissions and decisions
    pub async fn log_request_activity(
        &self,
        actor_user_id: Uuid,
        request_id: Uuid,
        action: &str,
        description: String,
        metadata: Option<Value>,
    ) {
        self.record(
            Some(actor_user_id),
            EntityType::REQUEST,
            request_id,
            action,
            description,
            metadata,
        )
        .await
    }

    pub async fn log_payroll_activity(
        &self,
        actor_user_id: Uuid,
        run_id: Uuid,
        action: &str,
        description: String,
        metadata: Option<Value>,
    ) {
        self.record(
            Some(actor_user_id),
            EntityType::PAYROLL_RUN,
            run_id,
            action,
            description,
            metadata,
        )
        .await
    }

    /// Holiday calendar and policy changes
    pub async fn log_reference_activity(
        &self,
        actor_user_id: Uuid,
        entity_type: &str,
        entity_id: Uuid,
        action: &str,
        description: String,
        metadata: Option<Value>,
    ) {
        self.record(
            Some(actor_user_id),
            entity_type,
            entity_id,
            action,
            description,
            metadata,
        )
        .await
    }
}
