use chrono::{Datelike, NaiveDate};

use crate::database::models::{HolidayCalendarEntry, HolidayType};
use crate::database::PayrollStore;
use crate::error::{SoftFailure, SoftFallback};

/// In-memory holiday lookup over a snapshot of the calendar table.
#[derive(Debug, Clone, Default)]
pub struct HolidayCalendar {
    entries: Vec<HolidayCalendarEntry>,
}

impl HolidayCalendar {
    pub fn new(entries: Vec<HolidayCalendarEntry>) -> Self {
        Self { entries }
    }

    pub async fn try_load<S: PayrollStore>(store: &S) -> Result<Self, SoftFailure> {
        store
            .list_holidays()
            .await
            .map(Self::new)
            .map_err(|err| SoftFailure::TableUnavailable(format!("holidays: {}", err)))
    }

    /// A calendar that cannot be read behaves as if no day were a holiday.
    pub async fn load_or_empty<S: PayrollStore>(store: &S) -> Self {
        Self::try_load(store).await.or_soft_default("holiday calendar")
    }

    /// Holiday type for `date`. Exact-date entries win over recurring ones, and a
    /// regular holiday wins over a special non-working day on the same date.
    pub fn holiday_on(&self, date: NaiveDate) -> Option<HolidayType> {
        let exact = self
            .entries
            .iter()
            .filter(|entry| entry.holiday_date == date)
            .map(|entry| entry.holiday_type);
        if let Some(found) = Self::strongest(exact) {
            return Some(found);
        }

        let recurring = self
            .entries
            .iter()
            .filter(|entry| {
                entry.is_recurring
                    && entry.holiday_date.month() == date.month()
                    && entry.holiday_date.day() == date.day()
            })
            .map(|entry| entry.holiday_type);
        Self::strongest(recurring)
    }

    fn strongest(types: impl Iterator<Item = HolidayType>) -> Option<HolidayType> {
        types.max_by_key(|holiday_type| match holiday_type {
            HolidayType::RegularHoliday => 1,
            HolidayType::SpecialNonWorking => 0,
        })
    }
}
