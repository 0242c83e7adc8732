//! External scorer policy
//!
//! Accepts an opaque scoring function (e.g. a trained agent exported from a
//! learning harness) and orders cases by its score. The core treats the
//! function as a black box over a fixed, documented feature vector; no
//! learning happens inside the loop.

use super::{tiebreak, DayContext, ScoreFn, SchedulingPolicy};
use crate::models::case::Case;
use serde::Serialize;

/// The fixed feature vector exposed to external scorers.
///
/// Field order is part of the contract; scorers that discretise or embed
/// these values do so on their side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseFeatures {
    /// Position of the current stage in the canonical stage order.
    pub stage_index: u32,
    pub age_days: i64,
    pub days_since_last_hearing: i64,
    /// 1 if the case is flagged urgent, else 0.
    pub urgency: u8,
    /// 1 if the case's current ripeness verdict is ripe, else 0.
    pub ripe: u8,
    pub hearing_count: u32,
    /// Remaining day capacity divided by total day capacity.
    pub capacity_ratio: f64,
    pub min_gap_days: i64,
    /// 1.0 when the case type matches the day's configured preference.
    pub preference_score: f64,
}

impl CaseFeatures {
    /// Extract the feature vector for a case in today's context.
    pub fn extract(case: &Case, ctx: &DayContext) -> Self {
        let capacity_ratio = if ctx.total_capacity > 0 {
            ctx.remaining_capacity as f64 / ctx.total_capacity as f64
        } else {
            0.0
        };

        let preference_score = match ctx.preferred_case_type {
            Some(preferred) if preferred == case.case_type() => 1.0,
            _ => 0.0,
        };

        Self {
            stage_index: case.stage().index() as u32,
            age_days: case.age_days(),
            days_since_last_hearing: case.days_since_last_hearing(),
            urgency: u8::from(case.is_urgent()),
            ripe: u8::from(case.ripeness().status.is_ripe()),
            hearing_count: case.hearing_count(),
            capacity_ratio,
            min_gap_days: ctx.min_gap_days,
            preference_score,
        }
    }
}

/// Policy ordering by an injected scoring function, highest score first.
pub struct ExternalScorerPolicy {
    scorer: ScoreFn,
}

impl ExternalScorerPolicy {
    pub fn new(scorer: ScoreFn) -> Self {
        Self { scorer }
    }
}

impl std::fmt::Debug for ExternalScorerPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalScorerPolicy").finish_non_exhaustive()
    }
}

impl SchedulingPolicy for ExternalScorerPolicy {
    fn name(&self) -> &'static str {
        "external"
    }

    fn prioritize(
        &self,
        pool: &[Case],
        mut candidates: Vec<usize>,
        ctx: &DayContext,
    ) -> Vec<usize> {
        let scores: std::collections::HashMap<usize, f64> = candidates
            .iter()
            .map(|&idx| {
                let features = CaseFeatures::extract(&pool[idx], ctx);
                (idx, (self.scorer)(&features))
            })
            .collect();

        candidates.sort_by(|&a, &b| {
            scores[&b]
                .total_cmp(&scores[&a])
                .then_with(|| tiebreak(&pool[a], &pool[b]))
        });
        candidates
    }
}
