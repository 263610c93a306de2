use crate::database::models::{
    AttendanceRecord, DayType, Employee, HolidayType, PayBreakdown, Rates,
};
use crate::error::{SoftFailure, SoftFallback};
use crate::services::time_math::{self, round2, HoursTotals};

/// Hours a holiday or rest-day premium is computed on, whatever was worked.
pub const PREMIUM_BASE_HOURS: f64 = 8.0;
pub const HOLIDAY_OVERTIME_MULTIPLIER: f64 = 2.00;
pub const REST_DAY_OVERTIME_MULTIPLIER: f64 = 1.30;
pub const NIGHT_DIFFERENTIAL_PREMIUM: f64 = 0.10;
pub const SPECIAL_HOLIDAY_PREMIUM: f64 = 0.30;
pub const REST_DAY_PREMIUM: f64 = 0.30;

/// What kind of day is being paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DayKind {
    pub holiday: Option<HolidayType>,
    pub rest_day: bool,
}

impl DayKind {
    pub fn of(record: &AttendanceRecord) -> Self {
        DayKind {
            holiday: record.holiday_type,
            rest_day: record.day_type == DayType::RestDay,
        }
    }

    pub fn is_holiday(&self) -> bool {
        self.holiday.is_some()
    }
}

/// One row of the overtime precedence table.
pub struct OvertimeRule {
    pub name: &'static str,
    pub applies: fn(&DayKind) -> bool,
    pub rate: fn(&Rates) -> f64,
}

/// Evaluated top-down; the first rule that applies sets the overtime rate.
pub static OVERTIME_RULES: [OvertimeRule; 3] = [
    OvertimeRule {
        name: "holiday",
        applies: |day| day.is_holiday(),
        rate: |rates| rates.hourly * HOLIDAY_OVERTIME_MULTIPLIER,
    },
    OvertimeRule {
        name: "rest_day",
        applies: |day| day.rest_day,
        rate: |rates| rates.hourly * REST_DAY_OVERTIME_MULTIPLIER,
    },
    OvertimeRule {
        name: "ordinary",
        applies: |_| true,
        rate: |rates| rates.overtime,
    },
];

pub fn overtime_rule(day: &DayKind) -> &'static OvertimeRule {
    OVERTIME_RULES
        .iter()
        .find(|rule| (rule.applies)(day))
        .unwrap_or(&OVERTIME_RULES[OVERTIME_RULES.len() - 1])
}

pub fn overtime_rate(rates: &Rates, day: &DayKind) -> f64 {
    (overtime_rule(day).rate)(rates)
}

/// Inputs a daily pay computation reads off an attendance row.
#[derive(Debug, Clone, Copy)]
pub struct PayInput<'a> {
    pub time_in: Option<&'a str>,
    pub time_out: Option<&'a str>,
    pub break_minutes: i32,
    pub manual_overtime_hours: f64,
    pub approved_overtime_hours: f64,
    pub day: DayKind,
    pub allow_cross_midnight: bool,
}

impl<'a> PayInput<'a> {
    pub fn from_record(record: &'a AttendanceRecord, allow_cross_midnight: bool) -> Self {
        PayInput {
            time_in: record.time_in.as_deref(),
            time_out: record.time_out.as_deref(),
            break_minutes: record.break_minutes,
            manual_overtime_hours: record.manual_overtime_hours,
            approved_overtime_hours: record.approved_overtime_hours,
            day: DayKind::of(record),
            allow_cross_midnight,
        }
    }
}

fn holiday_pay(rates: &Rates, day: &DayKind) -> f64 {
    match day.holiday {
        Some(HolidayType::RegularHoliday) => rates.hourly * PREMIUM_BASE_HOURS,
        Some(HolidayType::SpecialNonWorking) => {
            rates.hourly * PREMIUM_BASE_HOURS * SPECIAL_HOLIDAY_PREMIUM
        }
        None => 0.0,
    }
}

fn rest_day_pay(rates: &Rates, day: &DayKind) -> f64 {
    if day.rest_day && !day.is_holiday() {
        rates.hourly * PREMIUM_BASE_HOURS * REST_DAY_PREMIUM
    } else {
        0.0
    }
}

fn check_rates(employee: &Employee) -> Result<(), SoftFailure> {
    let rates = &employee.rates;
    let all_valid = [rates.hourly, rates.overtime, employee.regular_hourly_rate()]
        .iter()
        .all(|rate| rate.is_finite() && *rate >= 0.0);

    if all_valid {
        Ok(())
    } else {
        Err(SoftFailure::MalformedAttendance(format!(
            "employee {} has invalid rates",
            employee.code
        )))
    }
}

fn try_totals(input: &PayInput) -> Result<(HoursTotals, f64), SoftFailure> {
    match (input.time_in, input.time_out) {
        (Some(time_in), Some(time_out)) => {
            let totals = time_math::try_compute_totals(
                time_in,
                time_out,
                input.break_minutes,
                input.allow_cross_midnight,
            )?;
            let night = time_math::night_differential_hours(
                time_in,
                time_out,
                totals.hours_worked,
                input.allow_cross_midnight,
            );
            Ok((totals, night))
        }
        _ => Ok((HoursTotals::default(), 0.0)),
    }
}

/// Pay breakdown for one day. Each amount is rounded on its own before summing.
pub fn try_calculate_daily_pay(
    employee: &Employee,
    input: &PayInput,
) -> Result<PayBreakdown, SoftFailure> {
    check_rates(employee)?;
    let (totals, night_hours) = try_totals(input)?;

    let mut regular_hours = totals.regular_hours;
    let mut overtime_hours = totals.overtime_hours;
    if input.manual_overtime_hours > 0.0 {
        let manual = input.manual_overtime_hours;
        overtime_hours = manual.min(regular_hours + overtime_hours);
        regular_hours = (regular_hours - manual).max(0.0);
    }
    if input.approved_overtime_hours > 0.0 {
        overtime_hours = input.approved_overtime_hours;
    }

    let rates = &employee.rates;
    let regular_pay = round2(employee.regular_hourly_rate() * regular_hours);
    let overtime_pay = round2(overtime_rate(rates, &input.day) * overtime_hours);
    let night_differential_pay = round2(night_hours * rates.hourly * NIGHT_DIFFERENTIAL_PREMIUM);
    let holiday_pay = round2(holiday_pay(rates, &input.day));
    let rest_day_pay = round2(rest_day_pay(rates, &input.day));

    Ok(PayBreakdown {
        hours_worked: totals.hours_worked,
        regular_hours: round2(regular_hours),
        overtime_hours: round2(overtime_hours),
        night_differential_hours: night_hours,
        regular_pay,
        overtime_pay,
        night_differential_pay,
        holiday_pay,
        rest_day_pay,
        total_daily_pay: round2(
            regular_pay + overtime_pay + night_differential_pay + holiday_pay + rest_day_pay,
        ),
    })
}

/// Never fails: a malformed row pays zero instead of blocking the batch.
pub fn calculate_daily_pay(employee: &Employee, input: &PayInput) -> PayBreakdown {
    try_calculate_daily_pay(employee, input).or_soft_default("calculate_daily_pay")
}
