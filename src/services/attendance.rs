use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::database::models::{
    Action, AttendanceFilter, AttendanceRecord, AttendanceStatus, DayType, Employee, PunchProof,
    PunchState,
};
use crate::database::PayrollStore;
use crate::error::AppError;
use crate::services::activity_logger::ActivityLogger;
use crate::services::geo::{self, GeofenceCheck};
use crate::services::holiday_calendar::HolidayCalendar;
use crate::services::pay_calculator::{self, PayInput};
use crate::services::policy::AttendancePolicy;
use crate::services::time_math;

/// Wall-clock reading a punch is stamped with.
#[derive(Debug, Clone, PartialEq)]
pub struct PunchClock {
    pub work_date: NaiveDate,
    pub time: String,
    pub instant: DateTime<Utc>,
}

impl PunchClock {
    pub fn from_local<Tz: TimeZone>(now: DateTime<Tz>) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        PunchClock {
            work_date: now.date_naive(),
            time: now.format("%H:%M").to_string(),
            instant: now.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PunchRequest {
    pub employee_id: Uuid,
    pub actor_user_id: Uuid,
    pub clock: PunchClock,
    pub proof: PunchProof,
}

/// Advisory conditions. They are reported with the saved record, never block it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PunchWarning {
    OutOfRange { distance_m: f64, radius_m: f64 },
    SoftMaxShiftExceeded { hours_worked: f64, max_hours: f64 },
    NoWorkedHours { time_in: String, time_out: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PunchOutcome {
    pub record: AttendanceRecord,
    pub warnings: Vec<PunchWarning>,
}

/// Explicit values an administrator sets on one attendance day.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttendanceEdit {
    pub time_in: Option<String>,
    pub time_out: Option<String>,
    #[serde(default)]
    pub break_minutes: i32,
    #[serde(default)]
    pub day_type: DayType,
    #[serde(default)]
    pub manual_overtime_hours: f64,
}

pub(crate) async fn find_employee<S: PayrollStore>(
    store: &S,
    employee_id: Uuid,
) -> Result<Employee, AppError> {
    store
        .get_employee(employee_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Employee {} not found", employee_id)))
}

async fn find_active_employee<S: PayrollStore>(
    store: &S,
    employee_id: Uuid,
) -> Result<Employee, AppError> {
    let employee = find_employee(store, employee_id).await?;
    if !employee.is_active() {
        return Err(AppError::BadRequest(format!(
            "Employee {} is {}",
            employee.code, employee.status
        )));
    }
    Ok(employee)
}

fn check_proof(
    proof: &PunchProof,
    require_photo: bool,
    require_geo: bool,
    direction: &str,
) -> Result<(), AppError> {
    let has_photo = proof
        .photo_ref
        .as_deref()
        .is_some_and(|photo| !photo.trim().is_empty());
    if require_photo && !has_photo {
        return Err(AppError::BadRequest(format!("A photo is required to {}", direction)));
    }
    if require_geo && proof.coordinates().is_none() {
        return Err(AppError::BadRequest(format!("Location is required to {}", direction)));
    }
    Ok(())
}

async fn geofence<S: PayrollStore>(
    store: &S,
    employee: &Employee,
    proof: &PunchProof,
    warnings: &mut Vec<PunchWarning>,
) -> Result<Option<GeofenceCheck>, AppError> {
    let Some(site_id) = employee.site_id else {
        return Ok(None);
    };
    let Some(site) = store.get_site(site_id).await? else {
        log::warn!("Employee {} is assigned to missing site {}", employee.code, site_id);
        return Ok(None);
    };

    let check = geo::check_geofence(&site, proof);
    if let Some(check) = check.filter(|check| !check.in_range) {
        log::warn!(
            "Punch by {} is {:.0}m from {} (radius {:.0}m)",
            employee.code,
            check.distance_m,
            site.name,
            site.radius_meters
        );
        warnings.push(PunchWarning::OutOfRange {
            distance_m: check.distance_m,
            radius_m: site.radius_meters,
        });
    }
    Ok(check)
}

fn crossed_midnight(time_in: &str, time_out: &str) -> bool {
    matches!(
        (time_math::parse_hhmm(time_in), time_math::parse_hhmm(time_out)),
        (Some(start), Some(end)) if end <= start
    )
}

/// Reprices a record from its punches: holiday flag, hours, pay, late and
/// early-out minutes. Leave rows carry no pay and are left untouched.
pub fn recompute_record(
    record: &mut AttendanceRecord,
    employee: &Employee,
    calendar: &HolidayCalendar,
    policy: &AttendancePolicy,
) {
    record.set_holiday(calendar.holiday_on(record.work_date));
    if record.is_leave() {
        return;
    }

    record.pay = pay_calculator::calculate_daily_pay(
        employee,
        &PayInput::from_record(record, policy.allow_cross_midnight),
    );

    record.late_minutes = record
        .time_in
        .as_deref()
        .map(|time_in| {
            time_math::late_minutes(time_in, &policy.workday_start, policy.grace_minutes)
        })
        .unwrap_or(0);

    record.early_out_minutes = match (record.time_in.as_deref(), record.time_out.as_deref()) {
        (Some(time_in), Some(time_out)) => time_math::early_out_minutes(
            time_out,
            &policy.workday_end,
            policy.allow_cross_midnight && crossed_midnight(time_in, time_out),
        ),
        _ => 0,
    };
}

/// Opens the day for an employee.
///
/// Rejects a missing required proof (400), a repeat within the cooldown (429)
/// and a second time-in for the same day (409). Out-of-range punches are
/// recorded and flagged.
pub async fn time_in<S: PayrollStore>(
    store: &S,
    policy: &AttendancePolicy,
    request: PunchRequest,
) -> Result<PunchOutcome, AppError> {
    let employee = find_active_employee(store, request.employee_id).await?;
    check_proof(&request.proof, policy.require_photo_in, policy.require_geo, "time in")?;

    if policy.punch_cooldown_seconds > 0 {
        if let Some(last) = store.latest_time_in(employee.id).await? {
            let elapsed = request.clock.instant.signed_duration_since(last);
            let cooldown = i64::try_from(policy.punch_cooldown_seconds)
                .ok()
                .and_then(Duration::try_seconds)
                .unwrap_or(Duration::MAX);
            if elapsed < cooldown {
                return Err(AppError::TooManyRequests(format!(
                    "Time-in repeated too soon; wait {} seconds between punches",
                    policy.punch_cooldown_seconds
                )));
            }
        }
    }

    let work_date = request.clock.work_date;
    let existing = store.get_attendance(employee.id, work_date).await?;
    if let Some(existing) = &existing {
        if existing.punch_state() != PunchState::NoRecord {
            return Err(AppError::Conflict(format!("Already timed in for {}", work_date)));
        }
        if existing.is_leave() {
            return Err(AppError::Conflict(format!("{} is an approved leave day", work_date)));
        }
    }

    let mut warnings = Vec::new();
    let check = geofence(store, &employee, &request.proof, &mut warnings).await?;
    let calendar = HolidayCalendar::load_or_empty(store).await;

    let mut record = existing
        .clone()
        .unwrap_or_else(|| AttendanceRecord::new(employee.id, work_date, request.clock.instant));
    let time_in = time_math::round_to_step(&request.clock.time, policy.rounding_minutes);
    record.late_minutes =
        time_math::late_minutes(&time_in, &policy.workday_start, policy.grace_minutes);
    record.time_in = Some(time_in);
    record.time_in_recorded_at = Some(request.clock.instant);
    record.time_in_photo = request.proof.photo_ref.clone();
    record.time_in_lat = request.proof.latitude;
    record.time_in_lng = request.proof.longitude;
    record.time_in_distance_m = check.map(|check| check.distance_m);
    record.time_in_in_range = check.map(|check| check.in_range);
    record.set_holiday(calendar.holiday_on(work_date));
    record.updated_at = request.clock.instant;

    if existing.is_some() {
        store.open_attendance(&record).await?;
    } else {
        store.insert_attendance(&record).await?;
    }

    log::info!(
        "{} timed in at {} on {}",
        employee.code,
        record.time_in.as_deref().unwrap_or_default(),
        work_date
    );
    ActivityLogger::new(store)
        .log_attendance_activity(
            Some(request.actor_user_id),
            record.id,
            Action::TIME_IN,
            format!("{} timed in", employee.code),
            Some(json!({ "work_date": work_date, "time_in": record.time_in, "late_minutes": record.late_minutes })),
        )
        .await;

    Ok(PunchOutcome { record, warnings })
}

/// Record a time-out closes: today's, or yesterday's open record when shifts may
/// cross midnight and nothing was opened today.
async fn record_to_close<S: PayrollStore>(
    store: &S,
    policy: &AttendancePolicy,
    employee_id: Uuid,
    work_date: NaiveDate,
) -> Result<AttendanceRecord, AppError> {
    let today = store.get_attendance(employee_id, work_date).await?;
    if let Some(record) = &today {
        match record.punch_state() {
            PunchState::InProgress => return Ok(record.clone()),
            PunchState::Complete => {
                return Err(AppError::Conflict(format!("Already timed out for {}", work_date)));
            }
            PunchState::NoRecord => {}
        }
    }

    if policy.allow_cross_midnight {
        if let Some(previous_day) = work_date.pred_opt() {
            if let Some(record) = store.get_attendance(employee_id, previous_day).await? {
                if record.is_open() {
                    return Ok(record);
                }
            }
        }
    }

    Err(AppError::BadRequest(format!("No time-in recorded for {}", work_date)))
}

/// Closes the open record and prices the day.
///
/// Rejects a missing time-in (400) and a second time-out (409). Exceeding the
/// soft shift maximum or leaving the geofence only adds warnings.
pub async fn time_out<S: PayrollStore>(
    store: &S,
    policy: &AttendancePolicy,
    request: PunchRequest,
) -> Result<PunchOutcome, AppError> {
    let employee = find_active_employee(store, request.employee_id).await?;
    check_proof(&request.proof, policy.require_photo_out, policy.require_geo, "time out")?;

    let mut record = record_to_close(store, policy, employee.id, request.clock.work_date).await?;

    let mut warnings = Vec::new();
    let check = geofence(store, &employee, &request.proof, &mut warnings).await?;
    let calendar = HolidayCalendar::load_or_empty(store).await;

    let time_out = time_math::round_to_step(&request.clock.time, policy.rounding_minutes);
    record.time_out = Some(time_out);
    record.time_out_photo = request.proof.photo_ref.clone();
    record.time_out_lat = request.proof.latitude;
    record.time_out_lng = request.proof.longitude;
    record.time_out_distance_m = check.map(|check| check.distance_m);
    record.time_out_in_range = check.map(|check| check.in_range);
    record.updated_at = request.clock.instant;
    recompute_record(&mut record, &employee, &calendar, policy);

    if let (Some(time_in), Some(time_out)) = (record.time_in.clone(), record.time_out.clone()) {
        if record.pay.hours_worked == 0.0 {
            log::warn!(
                "{} timed out at {} after time-in {}; no hours counted",
                employee.code,
                time_out,
                time_in
            );
            warnings.push(PunchWarning::NoWorkedHours { time_in, time_out });
        }
    }
    if record.pay.hours_worked > policy.max_shift_hours_soft {
        log::warn!(
            "{} worked {:.2}h on {}, above the {:.2}h soft maximum",
            employee.code,
            record.pay.hours_worked,
            record.work_date,
            policy.max_shift_hours_soft
        );
        warnings.push(PunchWarning::SoftMaxShiftExceeded {
            hours_worked: record.pay.hours_worked,
            max_hours: policy.max_shift_hours_soft,
        });
    }

    store.close_attendance(&record).await?;

    log::info!(
        "{} timed out on {}: {:.2}h, pay {:.2}",
        employee.code,
        record.work_date,
        record.pay.hours_worked,
        record.pay.total_daily_pay
    );
    ActivityLogger::new(store)
        .log_attendance_activity(
            Some(request.actor_user_id),
            record.id,
            Action::TIME_OUT,
            format!("{} timed out", employee.code),
            Some(json!({
                "work_date": record.work_date,
                "time_out": record.time_out,
                "hours_worked": record.pay.hours_worked,
                "total_daily_pay": record.pay.total_daily_pay,
            })),
        )
        .await;

    Ok(PunchOutcome { record, warnings })
}

fn validate_edit(edit: &AttendanceEdit) -> Result<(), AppError> {
    for time in [&edit.time_in, &edit.time_out].into_iter().flatten() {
        if !time_math::is_valid_hhmm(time) {
            return Err(AppError::BadRequest(format!("Invalid time {:?}, expected HH:MM", time)));
        }
    }
    if edit.time_out.is_some() && edit.time_in.is_none() {
        return Err(AppError::BadRequest("time_out requires time_in".to_string()));
    }
    if edit.break_minutes < 0 {
        return Err(AppError::BadRequest("break_minutes cannot be negative".to_string()));
    }
    if !edit.manual_overtime_hours.is_finite() || edit.manual_overtime_hours < 0.0 {
        return Err(AppError::BadRequest(
            "manual_overtime_hours must be zero or positive".to_string(),
        ));
    }
    Ok(())
}

/// Sets explicit values on an employee's day and reprices it. Unlike punches,
/// this may amend a completed record.
pub async fn admin_edit<S: PayrollStore>(
    store: &S,
    policy: &AttendancePolicy,
    actor_user_id: Uuid,
    employee_id: Uuid,
    work_date: NaiveDate,
    edit: AttendanceEdit,
) -> Result<AttendanceRecord, AppError> {
    validate_edit(&edit)?;
    let employee = find_employee(store, employee_id).await?;
    let calendar = HolidayCalendar::load_or_empty(store).await;
    let now = Utc::now();

    let mut record = store
        .get_attendance(employee_id, work_date)
        .await?
        .unwrap_or_else(|| AttendanceRecord::new(employee_id, work_date, now));
    let previous = record.clone();

    record.status = AttendanceStatus::Present;
    record.time_in = edit.time_in;
    record.time_out = edit.time_out;
    record.break_minutes = edit.break_minutes;
    record.day_type = edit.day_type;
    record.manual_overtime_hours = edit.manual_overtime_hours;
    record.updated_at = now;
    recompute_record(&mut record, &employee, &calendar, policy);

    store.upsert_attendance(&record).await?;

    log::info!("Attendance for {} on {} edited by {}", employee.code, work_date, actor_user_id);
    ActivityLogger::new(store)
        .log_attendance_activity(
            Some(actor_user_id),
            record.id,
            Action::EDITED,
            format!("Attendance for {} on {} edited", employee.code, work_date),
            Some(json!({
                "before": { "time_in": previous.time_in, "time_out": previous.time_out, "total_daily_pay": previous.pay.total_daily_pay },
                "after": { "time_in": record.time_in, "time_out": record.time_out, "total_daily_pay": record.pay.total_daily_pay },
            })),
        )
        .await;

    Ok(record)
}

/// An employee's own records over an inclusive date range.
pub async fn my_attendance<S: PayrollStore>(
    store: &S,
    employee_id: Uuid,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<Vec<AttendanceRecord>, AppError> {
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(AppError::BadRequest("from must not be after to".to_string()));
        }
    }

    store
        .list_attendance(&AttendanceFilter {
            employee_id: Some(employee_id),
            from,
            to,
        })
        .await
}
