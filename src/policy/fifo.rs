//! FIFO (First-In-First-Out) policy
//!
//! Simplest baseline: hear cases in the order they were filed. No
//! consideration of readiness, urgency, or adjournment history.

use super::{tiebreak, DayContext, SchedulingPolicy};
use crate::models::case::Case;

/// FIFO policy: order by filing date.
///
/// # Example
/// ```
/// use court_sim_core::policy::{FifoPolicy, SchedulingPolicy, DayContext};
/// use court_sim_core::models::{Case, CaseType};
/// use chrono::NaiveDate;
///
/// let filed = |d: u32| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
/// let pool = vec![
///     Case::new("B", CaseType::Crp, filed(2)),
///     Case::new("A", CaseType::Crp, filed(1)),
/// ];
/// let ctx = DayContext {
///     today: filed(20),
///     min_gap_days: 0,
///     total_capacity: 10,
///     remaining_capacity: 10,
///     preferred_case_type: None,
/// };
///
/// let ordered = FifoPolicy::new().prioritize(&pool, vec![0, 1], &ctx);
/// assert_eq!(ordered, vec![1, 0]); // "A" filed first
/// ```
#[derive(Debug, Default)]
pub struct FifoPolicy;

impl FifoPolicy {
    pub fn new() -> Self {
        Self
    }
}

impl SchedulingPolicy for FifoPolicy {
    fn name(&self) -> &'static str {
        "fifo"
    }

    fn prioritize(
        &self,
        pool: &[Case],
        mut candidates: Vec<usize>,
        _ctx: &DayContext,
    ) -> Vec<usize> {
        candidates.sort_by(|&a, &b| tiebreak(&pool[a], &pool[b]));
        candidates
    }
}
