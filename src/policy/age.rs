//! Age-first policy
//!
//! Prioritizes the oldest cases to bound maximum pendency and prevent
//! starvation of long-running matters.

use super::{tiebreak, DayContext, SchedulingPolicy};
use crate::models::case::Case;

/// Age policy: oldest cases first.
///
/// Requires `advance_age` to have run for the day (the scheduling
/// algorithm guarantees this before ordering).
#[derive(Debug, Default)]
pub struct AgePolicy;

impl AgePolicy {
    pub fn new() -> Self {
        Self
    }
}

impl SchedulingPolicy for AgePolicy {
    fn name(&self) -> &'static str {
        "age"
    }

    fn prioritize(
        &self,
        pool: &[Case],
        mut candidates: Vec<usize>,
        _ctx: &DayContext,
    ) -> Vec<usize> {
        candidates.sort_by(|&a, &b| {
            pool[b]
                .age_days()
                .cmp(&pool[a].age_days())
                .then_with(|| tiebreak(&pool[a], &pool[b]))
        });
        candidates
    }
}
