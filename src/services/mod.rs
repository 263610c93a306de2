pub mod activity_logger;
pub mod attendance;
pub mod auth;
pub mod deductions;
pub mod geo;
pub mod holiday_calendar;
pub mod pay_calculator;
pub mod payroll;
pub mod policy;
pub mod recalc;
pub mod requests;
pub mod time_math;

pub use activity_logger::ActivityLogger;
pub use auth::Claims;
pub use holiday_calendar::HolidayCalendar;
pub use policy::{AttendancePolicy, PolicyCache};
