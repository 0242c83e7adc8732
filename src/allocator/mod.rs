//! Courtroom allocation
//!
//! Distributes an ordered candidate list across courtrooms for one day.
//! Strategy is least-loaded-first: each case goes to the room with the
//! smallest current count that still has capacity, ties broken by room id.
//! The result is fully determined by the input ordering and capacities.
//!
//! The allocator also keeps the load-balance bookkeeping (per-day count
//! vectors and lifetime totals per room) that the metrics layer turns into
//! a Gini coefficient at finalization.

use crate::models::case::Case;
use crate::models::courtroom::Courtroom;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Result of one day's allocation.
#[derive(Debug, Clone, Default)]
pub struct AllocationOutcome {
    /// Room id → case indices, in cause-list order.
    pub per_room: BTreeMap<u32, Vec<usize>>,
    /// Case indices that did not fit anywhere.
    pub capacity_limited: Vec<usize>,
}

impl AllocationOutcome {
    pub fn total_allocated(&self) -> usize {
        self.per_room.values().map(Vec::len).sum()
    }
}

/// Load-balancing allocator with lifetime statistics.
#[derive(Debug, Clone, Default)]
pub struct CourtroomAllocator {
    daily_loads: BTreeMap<NaiveDate, BTreeMap<u32, u32>>,
    totals: BTreeMap<u32, u64>,
    capacity_rejections: u64,
}

impl CourtroomAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an ordered case list to courtrooms for `today`.
    ///
    /// `ordered` holds indices into `pool`, already policy-ordered and
    /// override-adjusted. Cases are written onto each room's cause list;
    /// a case for which every room is full is recorded capacity-limited.
    pub fn allocate(
        &mut self,
        ordered: &[usize],
        pool: &[Case],
        courtrooms: &mut [Courtroom],
        today: NaiveDate,
    ) -> AllocationOutcome {
        let mut outcome = AllocationOutcome::default();
        let mut loads: BTreeMap<u32, u32> = courtrooms.iter().map(|r| (r.id(), 0)).collect();
        let caps: BTreeMap<u32, u32> = courtrooms
            .iter()
            .map(|r| (r.id(), r.effective_capacity(today)))
            .collect();
        let positions: BTreeMap<u32, usize> = courtrooms
            .iter()
            .enumerate()
            .map(|(pos, r)| (r.id(), pos))
            .collect();

        for room in courtrooms.iter() {
            outcome.per_room.insert(room.id(), Vec::new());
        }

        for &idx in ordered {
            let case = &pool[idx];

            let target = loads
                .iter()
                .filter(|(room_id, count)| **count < caps[*room_id])
                .min_by_key(|(room_id, count)| (**count, **room_id))
                .map(|(room_id, _)| *room_id);

            match target {
                Some(room_id) => {
                    let room = &mut courtrooms[positions[&room_id]];
                    if room.schedule_case(today, case.id()) {
                        *loads.entry(room_id).or_insert(0) += 1;
                        *self.totals.entry(room_id).or_insert(0) += 1;
                        outcome.per_room.entry(room_id).or_default().push(idx);
                    } else {
                        // Room refused (duplicate id on the list).
                        self.capacity_rejections += 1;
                        outcome.capacity_limited.push(idx);
                    }
                }
                None => {
                    self.capacity_rejections += 1;
                    outcome.capacity_limited.push(idx);
                }
            }
        }

        self.daily_loads.insert(today, loads);
        outcome
    }

    /// Per-room counts for a day, if that day was allocated.
    pub fn daily_loads(&self, date: NaiveDate) -> Option<&BTreeMap<u32, u32>> {
        self.daily_loads.get(&date)
    }

    /// Lifetime total allocations per room.
    pub fn totals(&self) -> &BTreeMap<u32, u64> {
        &self.totals
    }

    /// Lifetime count of cases that fit nowhere.
    pub fn capacity_rejections(&self) -> u64 {
        self.capacity_rejections
    }
}
