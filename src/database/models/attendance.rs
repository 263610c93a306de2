use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::holiday::HolidayType;
use super::macros::string_enum;

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
    #[serde(rename_all = "snake_case")]
    pub enum DayType {
        #[default]
        Regular => "regular",
        RestDay => "rest_day",
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
    #[serde(rename_all = "snake_case")]
    pub enum AttendanceStatus {
        #[default]
        Present => "present",
        Leave => "leave",
    }
}

/// Hours buckets and amounts computed for one attendance day.
///
/// Field names are the export contract for CSV/PDF writers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default, sqlx::FromRow)]
pub struct PayBreakdown {
    pub hours_worked: f64,
    pub regular_hours: f64,
    pub overtime_hours: f64,
    pub night_differential_hours: f64,
    pub regular_pay: f64,
    pub overtime_pay: f64,
    pub night_differential_pay: f64,
    pub holiday_pay: f64,
    pub rest_day_pay: f64,
    pub total_daily_pay: f64,
}

/// Where a punch was made from. Photos are opaque references to stored files.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PunchProof {
    pub photo_ref: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl PunchProof {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => Some((lat, lng)),
            _ => None,
        }
    }
}

/// Lifecycle of a (employee, work_date) row as seen by punches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PunchState {
    NoRecord,
    InProgress,
    Complete,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub work_date: NaiveDate,
    pub status: AttendanceStatus,
    pub time_in: Option<String>,
    pub time_out: Option<String>,
    pub time_in_recorded_at: Option<DateTime<Utc>>,
    pub break_minutes: i32,
    pub day_type: DayType,
    pub manual_overtime_hours: f64,
    /// Overtime granted by an approved request. Regular hours stay as worked.
    pub approved_overtime_hours: f64,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub pay: PayBreakdown,
    pub is_holiday: bool,
    pub holiday_type: Option<HolidayType>,
    pub time_in_photo: Option<String>,
    pub time_in_lat: Option<f64>,
    pub time_in_lng: Option<f64>,
    pub time_in_distance_m: Option<f64>,
    pub time_in_in_range: Option<bool>,
    pub time_out_photo: Option<String>,
    pub time_out_lat: Option<f64>,
    pub time_out_lng: Option<f64>,
    pub time_out_distance_m: Option<f64>,
    pub time_out_in_range: Option<bool>,
    pub late_minutes: i32,
    pub early_out_minutes: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AttendanceRecord {
    pub fn new(employee_id: Uuid, work_date: NaiveDate, now: DateTime<Utc>) -> Self {
        AttendanceRecord {
            id: Uuid::new_v4(),
            employee_id,
            work_date,
            status: AttendanceStatus::Present,
            time_in: None,
            time_out: None,
            time_in_recorded_at: None,
            break_minutes: 0,
            day_type: DayType::Regular,
            manual_overtime_hours: 0.0,
            approved_overtime_hours: 0.0,
            pay: PayBreakdown::default(),
            is_holiday: false,
            holiday_type: None,
            time_in_photo: None,
            time_in_lat: None,
            time_in_lng: None,
            time_in_distance_m: None,
            time_in_in_range: None,
            time_out_photo: None,
            time_out_lat: None,
            time_out_lng: None,
            time_out_distance_m: None,
            time_out_in_range: None,
            late_minutes: 0,
            early_out_minutes: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn punch_state(&self) -> PunchState {
        match (&self.time_in, &self.time_out) {
            (None, _) => PunchState::NoRecord,
            (Some(_), None) => PunchState::InProgress,
            (Some(_), Some(_)) => PunchState::Complete,
        }
    }

    /// Time-in recorded without a matching time-out.
    pub fn is_open(&self) -> bool {
        self.punch_state() == PunchState::InProgress
    }

    pub fn is_leave(&self) -> bool {
        self.status == AttendanceStatus::Leave
    }

    pub fn set_holiday(&mut self, holiday: Option<HolidayType>) {
        self.is_holiday = holiday.is_some();
        self.holiday_type = holiday;
    }

    /// Turns the row into a leave day: no punches, no hours, no computed pay.
    pub fn mark_leave(&mut self, now: DateTime<Utc>) {
        self.status = AttendanceStatus::Leave;
        self.time_in = None;
        self.time_out = None;
        self.time_in_recorded_at = None;
        self.break_minutes = 0;
        self.manual_overtime_hours = 0.0;
        self.approved_overtime_hours = 0.0;
        self.pay = PayBreakdown::default();
        self.late_minutes = 0;
        self.early_out_minutes = 0;
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttendanceFilter {
    pub employee_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl AttendanceFilter {
    pub fn matches(&self, record: &AttendanceRecord) -> bool {
        self.employee_id.is_none_or(|id| id == record.employee_id)
            && self.from.is_none_or(|from| record.work_date >= from)
            && self.to.is_none_or(|to| record.work_date <= to)
    }
}
