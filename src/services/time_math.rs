use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{SoftFailure, SoftFallback};

pub const MINUTES_PER_DAY: u32 = 24 * 60;
/// Hours paid at the regular rate before overtime starts.
pub const REGULAR_HOURS_CAP: f64 = 8.0;

const NIGHT_START: u32 = 22 * 60;
const NIGHT_END: u32 = 6 * 60;

static HHMM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([01]\d|2[0-3]):([0-5]\d)$").expect("valid HH:MM pattern"));

/// Hours buckets derived from one pair of punches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HoursTotals {
    pub hours_worked: f64,
    pub regular_hours: f64,
    pub overtime_hours: f64,
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Minutes since midnight for a 24-hour "HH:MM" string.
pub fn parse_hhmm(value: &str) -> Option<u32> {
    let captures = HHMM.captures(value.trim())?;
    let hours: u32 = captures[1].parse().ok()?;
    let minutes: u32 = captures[2].parse().ok()?;
    Some(hours * 60 + minutes)
}

pub fn format_hhmm(minutes: u32) -> String {
    let minutes = minutes % MINUTES_PER_DAY;
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

pub fn is_valid_hhmm(value: &str) -> bool {
    parse_hhmm(value).is_some()
}

/// Rounds a clock time to the nearest multiple of `step_minutes`, wrapping past
/// midnight. A zero step or an unparseable time is returned unchanged.
pub fn round_to_step(time: &str, step_minutes: u32) -> String {
    if step_minutes == 0 {
        return time.to_string();
    }

    match parse_hhmm(time) {
        Some(minutes) => {
            let rounded = minutes.saturating_add(step_minutes / 2) / step_minutes * step_minutes;
            format_hhmm(rounded)
        }
        None => time.to_string(),
    }
}

/// Start and end of the worked span in minutes. The end is shifted by a day when
/// the shift crosses midnight.
pub fn shift_span(
    time_in: &str,
    time_out: &str,
    allow_cross_midnight: bool,
) -> Result<(u32, u32), SoftFailure> {
    let start = parse_hhmm(time_in)
        .ok_or_else(|| SoftFailure::MalformedAttendance(format!("bad time_in {:?}", time_in)))?;
    let end = parse_hhmm(time_out)
        .ok_or_else(|| SoftFailure::MalformedAttendance(format!("bad time_out {:?}", time_out)))?;

    if end > start {
        Ok((start, end))
    } else if allow_cross_midnight {
        Ok((start, end + MINUTES_PER_DAY))
    } else {
        Err(SoftFailure::MalformedAttendance(format!(
            "time_out {} is not after time_in {}",
            time_out, time_in
        )))
    }
}

pub fn try_compute_totals(
    time_in: &str,
    time_out: &str,
    break_minutes: i32,
    allow_cross_midnight: bool,
) -> Result<HoursTotals, SoftFailure> {
    let (start, end) = shift_span(time_in, time_out, allow_cross_midnight)?;
    let span = (end - start) as f64;
    let worked = (span - break_minutes.max(0) as f64).max(0.0) / 60.0;

    Ok(HoursTotals {
        hours_worked: round2(worked),
        regular_hours: round2(worked.min(REGULAR_HOURS_CAP)),
        overtime_hours: round2((worked - REGULAR_HOURS_CAP).max(0.0)),
    })
}

/// Never fails: malformed or missing punches yield all-zero totals.
pub fn compute_totals(
    time_in: Option<&str>,
    time_out: Option<&str>,
    break_minutes: i32,
    allow_cross_midnight: bool,
) -> HoursTotals {
    match (time_in, time_out) {
        (Some(time_in), Some(time_out)) => {
            try_compute_totals(time_in, time_out, break_minutes, allow_cross_midnight)
                .or_soft_default("compute_totals")
        }
        _ => HoursTotals::default(),
    }
}

fn is_night_minute(minute: u32) -> bool {
    let minute = minute % MINUTES_PER_DAY;
    minute >= NIGHT_START || minute < NIGHT_END
}

/// Hours of the worked span inside 22:00-06:00, counted per minute and capped at
/// `hours_worked`.
pub fn night_differential_hours(
    time_in: &str,
    time_out: &str,
    hours_worked: f64,
    allow_cross_midnight: bool,
) -> f64 {
    let Ok((start, end)) = shift_span(time_in, time_out, allow_cross_midnight) else {
        return 0.0;
    };

    let night_minutes = (start..end).filter(|minute| is_night_minute(*minute)).count();
    round2((night_minutes as f64 / 60.0).min(hours_worked.max(0.0)))
}

/// Minutes after `workday_start + grace` the employee clocked in.
pub fn late_minutes(actual_in: &str, workday_start: &str, grace_minutes: u32) -> i32 {
    match (parse_hhmm(actual_in), parse_hhmm(workday_start)) {
        (Some(actual), Some(start)) => {
            let late = i64::from(actual) - i64::from(start) - i64::from(grace_minutes);
            i32::try_from(late.max(0)).unwrap_or(i32::MAX)
        }
        _ => 0,
    }
}

/// Minutes before `workday_end` the employee clocked out. A shift that ended after
/// midnight is never early.
pub fn early_out_minutes(actual_out: &str, workday_end: &str, crossed_midnight: bool) -> i32 {
    if crossed_midnight {
        return 0;
    }
    match (parse_hhmm(actual_out), parse_hhmm(workday_end)) {
        (Some(actual), Some(end)) => (end as i32 - actual as i32).max(0),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn standard_day_with_lunch_break_is_eight_regular_hours() {
        let totals = compute_totals(Some("08:00"), Some("17:00"), 60, false);

        assert_eq!(
            totals,
            HoursTotals {
                hours_worked: 8.0,
                regular_hours: 8.0,
                overtime_hours: 0.0,
            }
        );
    }

    #[test]
    fn hours_past_eight_become_overtime() {
        let totals = compute_totals(Some("08:00"), Some("19:00"), 60, false);

        assert_eq!(totals.hours_worked, 10.0);
        assert_eq!(totals.regular_hours, 8.0);
        assert_eq!(totals.overtime_hours, 2.0);
    }

    #[test]
    fn regular_plus_overtime_equals_worked() {
        let cases = [
            ("06:15", "23:40", 45),
            ("09:00", "12:30", 0),
            ("07:07", "18:53", 90),
            ("00:00", "23:59", 0),
        ];

        for (time_in, time_out, break_minutes) in cases {
            let totals = compute_totals(Some(time_in), Some(time_out), break_minutes, false);
            assert!((totals.regular_hours + totals.overtime_hours - totals.hours_worked).abs() < 0.011);
            assert!(totals.regular_hours <= REGULAR_HOURS_CAP);
        }
    }

    #[test]
    fn malformed_or_missing_times_give_zero() {
        assert_eq!(compute_totals(Some("8:00"), Some("17:00"), 0, false), HoursTotals::default());
        assert_eq!(compute_totals(Some("08:00"), Some("24:00"), 0, false), HoursTotals::default());
        assert_eq!(compute_totals(Some("08:00"), None, 0, false), HoursTotals::default());
        assert_eq!(compute_totals(None, None, 0, true), HoursTotals::default());
    }

    #[test]
    fn out_before_in_requires_cross_midnight() {
        assert_eq!(compute_totals(Some("22:00"), Some("06:00"), 0, false), HoursTotals::default());

        let totals = compute_totals(Some("22:00"), Some("06:00"), 0, true);
        assert_eq!(totals.hours_worked, 8.0);
        assert_eq!(totals.overtime_hours, 0.0);
    }

    #[test]
    fn break_longer_than_shift_clamps_to_zero() {
        let totals = compute_totals(Some("08:00"), Some("09:00"), 120, false);
        assert_eq!(totals.hours_worked, 0.0);
    }

    #[test]
    fn round_to_step_picks_nearest_multiple() {
        assert_eq!(round_to_step("08:07", 15), "08:00");
        assert_eq!(round_to_step("08:08", 15), "08:15");
        assert_eq!(round_to_step("23:55", 15), "00:00");
        assert_eq!(round_to_step("08:07", 0), "08:07");
        assert_eq!(round_to_step("garbage", 15), "garbage");
    }

    #[test]
    fn night_differential_counts_only_night_window() {
        assert_eq!(night_differential_hours("08:00", "17:00", 8.0, false), 0.0);
        assert_eq!(night_differential_hours("18:00", "23:30", 5.5, false), 1.5);
        assert_eq!(night_differential_hours("22:00", "07:00", 8.0, true), 8.0);
        assert_eq!(night_differential_hours("04:00", "08:00", 4.0, false), 2.0);
    }

    #[test]
    fn late_and_early_out_respect_grace_and_midnight() {
        assert_eq!(late_minutes("08:20", "08:00", 10), 10);
        assert_eq!(late_minutes("07:55", "08:00", 0), 0);
        assert_eq!(early_out_minutes("16:30", "17:00", false), 30);
        assert_eq!(early_out_minutes("02:00", "17:00", true), 0);
    }

    #[test]
    fn oversized_grace_and_step_do_not_overflow() {
        assert_eq!(late_minutes("23:59", "00:00", u32::MAX), 0);
        assert_eq!(round_to_step("23:59", u32::MAX), "00:00");
    }
}
