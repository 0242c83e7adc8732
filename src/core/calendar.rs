//! Working-day calendar
//!
//! The simulation advances over working days only. The calendar is an
//! injected value: weekends are always non-working and the caller supplies
//! whatever holiday set its jurisdiction uses. The core bakes in no
//! jurisdictional constants.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Court working-day calendar: weekends plus an injected holiday set.
///
/// # Example
/// ```
/// use court_sim_core::core::CourtCalendar;
/// use chrono::NaiveDate;
///
/// let mut calendar = CourtCalendar::new();
/// let holiday = NaiveDate::from_ymd_opt(2024, 1, 26).unwrap();
/// calendar.add_holiday(holiday);
///
/// assert!(!calendar.is_working_day(holiday));
/// let monday = NaiveDate::from_ymd_opt(2024, 1, 29).unwrap();
/// assert!(calendar.is_working_day(monday));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CourtCalendar {
    holidays: BTreeSet<NaiveDate>,
}

impl CourtCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a date as a holiday.
    pub fn add_holiday(&mut self, date: NaiveDate) {
        self.holidays.insert(date);
    }

    /// Mark several dates as holidays.
    pub fn add_holidays<I: IntoIterator<Item = NaiveDate>>(&mut self, dates: I) {
        self.holidays.extend(dates);
    }

    pub fn holiday_count(&self) -> usize {
        self.holidays.len()
    }

    /// Whether the court sits on `date`.
    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            return false;
        }
        !self.holidays.contains(&date)
    }

    /// The working day `days_ahead` working days after `start`.
    pub fn next_working_day(&self, start: NaiveDate, days_ahead: u32) -> NaiveDate {
        let mut current = start;
        let mut found = 0;

        while found < days_ahead.max(1) {
            current = next_day(current);
            if self.is_working_day(current) {
                found += 1;
            }
        }
        current
    }

    /// Count working days in `[start, end]`.
    pub fn working_days_between(&self, start: NaiveDate, end: NaiveDate) -> u32 {
        if start > end {
            return 0;
        }

        let mut count = 0;
        let mut current = start;
        while current <= end {
            if self.is_working_day(current) {
                count += 1;
            }
            current = next_day(current);
        }
        count
    }

    /// Iterate the first `count` working days starting at `start`
    /// (inclusive when `start` itself is a working day).
    pub fn working_days_from(&self, start: NaiveDate, count: u32) -> Vec<NaiveDate> {
        let mut days = Vec::with_capacity(count as usize);
        let mut current = start;

        while days.len() < count as usize {
            if self.is_working_day(current) {
                days.push(current);
            }
            current = next_day(current);
        }
        days
    }
}

fn next_day(date: NaiveDate) -> NaiveDate {
    date.succ_opt().expect("date out of supported range")
}
