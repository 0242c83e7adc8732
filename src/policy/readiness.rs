//! Composite readiness policy
//!
//! Orders by the cached composite priority score (age, readiness, urgency,
//! adjournment boost). The scheduling algorithm computes and caches the
//! score for every candidate before ordering, so this policy is a pure sort
//! over `priority_score`.

use super::{tiebreak, DayContext, SchedulingPolicy};
use crate::models::case::Case;

/// Readiness policy: highest composite priority first.
#[derive(Debug, Default)]
pub struct ReadinessPolicy;

impl ReadinessPolicy {
    pub fn new() -> Self {
        Self
    }
}

impl SchedulingPolicy for ReadinessPolicy {
    fn name(&self) -> &'static str {
        "readiness"
    }

    fn prioritize(
        &self,
        pool: &[Case],
        mut candidates: Vec<usize>,
        _ctx: &DayContext,
    ) -> Vec<usize> {
        candidates.sort_by(|&a, &b| {
            pool[b]
                .priority_score()
                .total_cmp(&pool[a].priority_score())
                .then_with(|| tiebreak(&pool[a], &pool[b]))
        });
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::ctx;
    use super::*;
    use crate::models::stage::CaseType;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_highest_priority_first() {
        let mut pool = vec![
            Case::new("A", CaseType::Crp, d(2024, 1, 1)),
            Case::new("B", CaseType::Crp, d(2024, 1, 1)),
        ];
        pool[0].set_priority_score(0.3);
        pool[1].set_priority_score(0.8);

        let ordered = ReadinessPolicy::new().prioritize(&pool, vec![0, 1], &ctx(d(2024, 2, 1)));
        let ids: Vec<&str> = ordered.iter().map(|&i| pool[i].id()).collect();
        assert_eq!(ids, vec!["B", "A"]);
    }

    #[test]
    fn test_tie_broken_by_filing_then_id() {
        let mut pool = vec![
            Case::new("B", CaseType::Crp, d(2024, 1, 1)),
            Case::new("A", CaseType::Crp, d(2024, 1, 1)),
            Case::new("C", CaseType::Crp, d(2023, 12, 1)),
        ];
        for case in &mut pool {
            case.set_priority_score(0.5);
        }

        let ordered = ReadinessPolicy::new().prioritize(&pool, vec![0, 1, 2], &ctx(d(2024, 2, 1)));
        let ids: Vec<&str> = ordered.iter().map(|&i| pool[i].id()).collect();
        assert_eq!(ids, vec!["C", "A", "B"]);
    }
}
