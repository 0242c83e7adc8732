//! Courtroom resource
//!
//! A courtroom has a nominal daily capacity, an optional per-date capacity
//! override (set through the override layer, valid only for that date), and
//! a per-date list of scheduled case ids.
//!
//! Invariant: the scheduled count for a date never exceeds the effective
//! capacity for that date.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single courtroom.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Courtroom {
    id: u32,
    daily_capacity: u32,
    capacity_overrides: BTreeMap<NaiveDate, u32>,
    schedule: BTreeMap<NaiveDate, Vec<String>>,
    hearings_held: u64,
}

impl Courtroom {
    /// Create a courtroom with a nominal daily capacity.
    pub fn new(id: u32, daily_capacity: u32) -> Self {
        Self {
            id,
            daily_capacity,
            capacity_overrides: BTreeMap::new(),
            schedule: BTreeMap::new(),
            hearings_held: 0,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Nominal daily capacity (ignores per-date overrides).
    pub fn nominal_capacity(&self) -> u32 {
        self.daily_capacity
    }

    /// Effective capacity for a date: the override if present, else nominal.
    pub fn effective_capacity(&self, date: NaiveDate) -> u32 {
        self.capacity_overrides
            .get(&date)
            .copied()
            .unwrap_or(self.daily_capacity)
    }

    /// Set a capacity override valid only for `date`.
    pub fn set_capacity_override(&mut self, date: NaiveDate, capacity: u32) {
        self.capacity_overrides.insert(date, capacity);
    }

    /// Number of cases already scheduled on `date`.
    pub fn scheduled_count(&self, date: NaiveDate) -> u32 {
        self.schedule.get(&date).map(|c| c.len() as u32).unwrap_or(0)
    }

    /// Remaining slots on `date`.
    pub fn remaining_capacity(&self, date: NaiveDate) -> u32 {
        self.effective_capacity(date)
            .saturating_sub(self.scheduled_count(date))
    }

    /// Whether `case_id` can be placed on `date`.
    pub fn can_schedule(&self, date: NaiveDate, case_id: &str) -> bool {
        match self.schedule.get(&date) {
            None => self.effective_capacity(date) > 0,
            Some(list) => {
                !list.iter().any(|id| id == case_id)
                    && (list.len() as u32) < self.effective_capacity(date)
            }
        }
    }

    /// Place a case on the cause list for `date`.
    ///
    /// Returns false (and does nothing) when the room is at capacity or the
    /// case is already on the list.
    pub fn schedule_case(&mut self, date: NaiveDate, case_id: &str) -> bool {
        if !self.can_schedule(date, case_id) {
            return false;
        }
        self.schedule
            .entry(date)
            .or_default()
            .push(case_id.to_string());
        true
    }

    /// Cause list for `date`, in scheduling order.
    pub fn scheduled_on(&self, date: NaiveDate) -> &[String] {
        self.schedule.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Record that a hearing actually took place.
    pub fn record_hearing_held(&mut self) {
        self.hearings_held += 1;
    }

    /// Lifetime count of hearings held in this room.
    pub fn hearings_held(&self) -> u64 {
        self.hearings_held
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_capacity_enforced() {
        let mut room = Courtroom::new(1, 2);
        let date = d(2024, 3, 1);

        assert!(room.schedule_case(date, "A"));
        assert!(room.schedule_case(date, "B"));
        assert!(!room.schedule_case(date, "C"));
        assert_eq!(room.scheduled_on(date), &["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_duplicate_case_rejected() {
        let mut room = Courtroom::new(1, 10);
        let date = d(2024, 3, 1);

        assert!(room.schedule_case(date, "A"));
        assert!(!room.schedule_case(date, "A"));
        assert_eq!(room.scheduled_count(date), 1);
    }

    #[test]
    fn test_capacity_override_scoped_to_date() {
        let mut room = Courtroom::new(1, 5);
        room.set_capacity_override(d(2024, 3, 1), 0);

        assert_eq!(room.effective_capacity(d(2024, 3, 1)), 0);
        assert_eq!(room.effective_capacity(d(2024, 3, 2)), 5);
        assert!(!room.schedule_case(d(2024, 3, 1), "A"));
        assert!(room.schedule_case(d(2024, 3, 2), "A"));
    }

    #[test]
    fn test_zero_capacity_room() {
        let mut room = Courtroom::new(1, 0);
        assert!(!room.schedule_case(d(2024, 3, 1), "A"));
        assert_eq!(room.remaining_capacity(d(2024, 3, 1)), 0);
    }
}
