use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Append-only audit trail entry. Never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct AuditEvent {
    pub id: Uuid,
    pub actor_user_id: Option<Uuid>,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub action: String,
    pub description: String,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

// Common entity types
#[allow(non_snake_case)]
pub mod EntityType {
    pub const ATTENDANCE: &str = "attendance";
    pub const REQUEST: &str = "request";
    pub const PAYROLL_RUN: &str = "payroll_run";
    pub const HOLIDAY: &str = "holiday";
    pub const POLICY: &str = "policy";
}

// Common actions
#[allow(non_snake_case)]
pub mod Action {
    pub const TIME_IN: &str = "time_in";
    pub const TIME_OUT: &str = "time_out";
    pub const EDITED: &str = "edited";
    pub const RECALCULATED: &str = "recalculated";
    pub const SUBMITTED: &str = "submitted";
    pub const APPROVED: &str = "approved";
    pub const REJECTED: &str = "rejected";
    pub const CANCELLED: &str = "cancelled";
    pub const MARKED_PAID: &str = "marked_paid";
    pub const CREATED: &str = "created";
    pub const UPDATED: &str = "updated";
    pub const DELETED: &str = "deleted";
}
