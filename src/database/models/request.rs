use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::attendance::AttendanceRecord;
use super::leave::LeaveUsage;
use super::macros::string_enum;

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "snake_case")]
    pub enum RequestType {
        Leave => "leave",
        TimeCorrection => "time_correction",
        Overtime => "overtime",
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "snake_case")]
    pub enum RequestStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
        Cancelled => "cancelled",
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "snake_case")]
    pub enum RequestAction {
        Submitted => "submitted",
        Approved => "approved",
        Rejected => "rejected",
        Cancelled => "cancelled",
    }
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

/// What the employee is asking for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequestPayload {
    Leave {
        leave_type_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
        total_days: i32,
    },
    TimeCorrection {
        work_date: NaiveDate,
        time_in: String,
        time_out: String,
        break_minutes: i32,
    },
    Overtime {
        work_date: NaiveDate,
        ot_hours: f64,
    },
}

impl RequestPayload {
    pub fn request_type(&self) -> RequestType {
        match self {
            RequestPayload::Leave { .. } => RequestType::Leave,
            RequestPayload::TimeCorrection { .. } => RequestType::TimeCorrection,
            RequestPayload::Overtime { .. } => RequestType::Overtime,
        }
    }

    /// Inclusive date span the request touches.
    pub fn date_range(&self) -> (NaiveDate, NaiveDate) {
        match self {
            RequestPayload::Leave {
                start_date,
                end_date,
                ..
            } => (*start_date, *end_date),
            RequestPayload::TimeCorrection { work_date, .. }
            | RequestPayload::Overtime { work_date, .. } => (*work_date, *work_date),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
    pub id: Uuid,
    pub employee_id: Uuid,
    #[serde(flatten)]
    pub payload: RequestPayload,
    pub reason: Option<String>,
    pub status: RequestStatus,
    pub approver_user_id: Option<Uuid>,
    pub decision_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl Request {
    pub fn new(
        employee_id: Uuid,
        payload: RequestPayload,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Request {
            id: Uuid::new_v4(),
            employee_id,
            payload,
            reason,
            status: RequestStatus::Pending,
            approver_user_id: None,
            decision_note: None,
            created_at: now,
            updated_at: now,
            decided_at: None,
        }
    }

    pub fn request_type(&self) -> RequestType {
        self.payload.request_type()
    }

    /// Inclusive intersection of the two requests' date spans.
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        let (own_start, own_end) = self.payload.date_range();
        own_start <= end && start <= own_end
    }
}

/// Flat request row; payload columns are nullable per request type.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RequestRow {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub request_type: RequestType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub leave_type_id: Option<Uuid>,
    pub total_days: Option<i32>,
    pub time_in: Option<String>,
    pub time_out: Option<String>,
    pub break_minutes: Option<i32>,
    pub ot_hours: Option<f64>,
    pub reason: Option<String>,
    pub status: RequestStatus,
    pub approver_user_id: Option<Uuid>,
    pub decision_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl TryFrom<RequestRow> for Request {
    type Error = String;

    fn try_from(row: RequestRow) -> Result<Self, Self::Error> {
        let missing = |field: &str| format!("{} request {} has no {}", row.request_type, row.id, field);

        let payload = match row.request_type {
            RequestType::Leave => RequestPayload::Leave {
                leave_type_id: row.leave_type_id.ok_or_else(|| missing("leave_type_id"))?,
                start_date: row.start_date,
                end_date: row.end_date,
                total_days: row.total_days.ok_or_else(|| missing("total_days"))?,
            },
            RequestType::TimeCorrection => RequestPayload::TimeCorrection {
                work_date: row.start_date,
                time_in: row.time_in.clone().ok_or_else(|| missing("time_in"))?,
                time_out: row.time_out.clone().ok_or_else(|| missing("time_out"))?,
                break_minutes: row.break_minutes.unwrap_or(0),
            },
            RequestType::Overtime => RequestPayload::Overtime {
                work_date: row.start_date,
                ot_hours: row.ot_hours.ok_or_else(|| missing("ot_hours"))?,
            },
        };

        Ok(Request {
            id: row.id,
            employee_id: row.employee_id,
            payload,
            reason: row.reason,
            status: row.status,
            approver_user_id: row.approver_user_id,
            decision_note: row.decision_note,
            created_at: row.created_at,
            updated_at: row.updated_at,
            decided_at: row.decided_at,
        })
    }
}

impl From<&Request> for RequestRow {
    fn from(request: &Request) -> Self {
        let (start_date, end_date) = request.payload.date_range();
        let mut row = RequestRow {
            id: request.id,
            employee_id: request.employee_id,
            request_type: request.request_type(),
            start_date,
            end_date,
            leave_type_id: None,
            total_days: None,
            time_in: None,
            time_out: None,
            break_minutes: None,
            ot_hours: None,
            reason: request.reason.clone(),
            status: request.status,
            approver_user_id: request.approver_user_id,
            decision_note: request.decision_note.clone(),
            created_at: request.created_at,
            updated_at: request.updated_at,
            decided_at: request.decided_at,
        };

        match &request.payload {
            RequestPayload::Leave {
                leave_type_id,
                total_days,
                ..
            } => {
                row.leave_type_id = Some(*leave_type_id);
                row.total_days = Some(*total_days);
            }
            RequestPayload::TimeCorrection {
                time_in,
                time_out,
                break_minutes,
                ..
            } => {
                row.time_in = Some(time_in.clone());
                row.time_out = Some(time_out.clone());
                row.break_minutes = Some(*break_minutes);
            }
            RequestPayload::Overtime { ot_hours, .. } => {
                row.ot_hours = Some(*ot_hours);
            }
        }

        row
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestFilter {
    pub employee_id: Option<Uuid>,
    pub status: Option<RequestStatus>,
    pub request_type: Option<RequestType>,
}

impl RequestFilter {
    pub fn matches(&self, request: &Request) -> bool {
        self.employee_id.is_none_or(|id| id == request.employee_id)
            && self.status.is_none_or(|status| status == request.status)
            && self
                .request_type
                .is_none_or(|request_type| request_type == request.request_type())
    }
}

/// Append-only record of one request transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct RequestLog {
    pub id: Uuid,
    pub request_id: Uuid,
    pub actor_user_id: Uuid,
    pub action: RequestAction,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl RequestLog {
    pub fn new(
        request_id: Uuid,
        actor_user_id: Uuid,
        action: RequestAction,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        RequestLog {
            id: Uuid::new_v4(),
            request_id,
            actor_user_id,
            action,
            note,
            created_at: now,
        }
    }
}

/// A decided request together with everything the decision writes. Stores apply
/// it as one unit: the status change, any balance usage, the attendance rows and
/// the log entry land together or not at all.
#[derive(Debug, Clone)]
pub struct RequestDecision {
    pub request: Request,
    pub log: RequestLog,
    pub attendance: Vec<AttendanceRecord>,
    pub leave_usage: Option<LeaveUsage>,
}
