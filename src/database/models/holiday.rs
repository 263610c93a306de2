use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::string_enum;

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "snake_case")]
    pub enum HolidayType {
        RegularHoliday => "regular_holiday",
        SpecialNonWorking => "special_non_working",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct HolidayCalendarEntry {
    pub id: Uuid,
    pub name: String,
    pub holiday_date: NaiveDate,
    pub holiday_type: HolidayType,
    /// Matches the same month/day every year when set.
    pub is_recurring: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HolidayInput {
    pub name: String,
    pub holiday_date: NaiveDate,
    pub holiday_type: HolidayType,
    #[serde(default)]
    pub is_recurring: bool,
}

impl From<HolidayInput> for HolidayCalendarEntry {
    fn from(input: HolidayInput) -> Self {
        HolidayCalendarEntry {
            id: Uuid::new_v4(),
            name: input.name,
            holiday_date: input.holiday_date,
            holiday_type: input.holiday_type,
            is_recurring: input.is_recurring,
        }
    }
}
