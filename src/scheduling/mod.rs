//! Daily scheduling algorithm
//!
//! `schedule_day` composes the whole per-day pipeline into one
//! `SchedulingResult`:
//!
//! 1. Exclude disposed cases.
//! 2. Refresh age, readiness, and the cached priority score.
//! 3. Ripeness filter (override directives consulted; rejects recorded).
//! 4. Eligibility filter (minimum hearing gap).
//! 5. Policy ordering.
//! 6. Override application (fixed order, see the overrides module).
//! 7. Load-balanced courtroom allocation.
//! 8. Mark scheduled, assign courtrooms, compose explanations.
//! 9. Drop the per-day overlays (nothing persists onto cases).
//!
//! The algorithm mutates the population only through the documented case
//! operations and is deterministic given its inputs.

use crate::allocator::CourtroomAllocator;
use crate::models::case::{Case, PriorityWeights};
use crate::models::courtroom::Courtroom;
use crate::models::pool::CasePool;
use crate::models::stage::{CaseType, Stage};
use crate::overrides::{
    apply_day_overrides, ripeness_directives, DayOverlays, Override, OverrideOutcome,
    OverrideRejection,
};
use crate::policy::{DayContext, SchedulingPolicy};
use crate::ripeness::{RipenessClassifier, RipenessStatus};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// One scheduled case on a cause list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledEntry {
    /// 1-based position on the courtroom's list.
    pub sequence: u32,
    pub case_id: String,
    pub case_type: CaseType,
    pub stage: Stage,
    /// Effective priority at scheduling time (override-adjusted).
    pub priority_score: f64,
    pub explanation: String,
}

/// A ripeness verdict written back to a case during the filter step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RipenessChange {
    pub case_id: String,
    pub from: RipenessStatus,
    pub to: RipenessStatus,
    pub reason: String,
}

/// Full transparency record for one scheduled day.
#[derive(Debug, Clone, Default)]
pub struct SchedulingResult {
    pub date: NaiveDate,
    pub policy: String,

    /// Courtroom id → ordered cause list.
    pub cause_lists: BTreeMap<u32, Vec<ScheduledEntry>>,

    pub applied_overrides: Vec<Override>,
    pub rejected_overrides: Vec<OverrideRejection>,
    pub ripeness_changes: Vec<RipenessChange>,

    pub unripe_filtered: u32,
    pub gap_blocked: u32,
    pub capacity_limited: u32,
    pub disposed_skipped: u32,
    pub invariant_violations: u32,

    pub total_scheduled: u32,
}

impl SchedulingResult {
    fn empty(date: NaiveDate, policy: &str) -> Self {
        Self {
            date,
            policy: policy.to_string(),
            ..Self::default()
        }
    }

    /// Scheduled case ids in deterministic order (room id, then sequence).
    pub fn scheduled_case_ids(&self) -> Vec<(u32, String)> {
        self.cause_lists
            .iter()
            .flat_map(|(room_id, entries)| {
                entries.iter().map(move |e| (*room_id, e.case_id.clone()))
            })
            .collect()
    }

    /// Explanation for a scheduled case, if it was scheduled.
    pub fn explanation_for(&self, case_id: &str) -> Option<&str> {
        self.cause_lists.values().flatten().find_map(|entry| {
            (entry.case_id == case_id).then_some(entry.explanation.as_str())
        })
    }
}

/// The per-day scheduling pipeline.
pub struct SchedulingAlgorithm {
    policy: Box<dyn SchedulingPolicy>,
    classifier: RipenessClassifier,
    min_gap_days: i64,
    priority_weights: PriorityWeights,
    preferred_case_type: Option<CaseType>,
}

impl SchedulingAlgorithm {
    pub fn new(
        policy: Box<dyn SchedulingPolicy>,
        classifier: RipenessClassifier,
        min_gap_days: i64,
        priority_weights: PriorityWeights,
    ) -> Self {
        Self {
            policy,
            classifier,
            min_gap_days,
            priority_weights,
            preferred_case_type: None,
        }
    }

    /// Configure a case-type preference fed to the external scorer.
    pub fn with_preferred_case_type(mut self, case_type: CaseType) -> Self {
        self.preferred_case_type = Some(case_type);
        self
    }

    pub fn policy_name(&self) -> &str {
        self.policy.name()
    }

    pub fn classifier(&self) -> &RipenessClassifier {
        &self.classifier
    }

    pub fn min_gap_days(&self) -> i64 {
        self.min_gap_days
    }

    /// Schedule one day.
    pub fn schedule_day(
        &self,
        pool: &mut CasePool,
        courtrooms: &mut [Courtroom],
        allocator: &mut CourtroomAllocator,
        today: NaiveDate,
        overrides: &[Override],
    ) -> SchedulingResult {
        let mut result = SchedulingResult::empty(today, self.policy.name());
        let mut overlays = DayOverlays::default();
        let mut outcome = OverrideOutcome::default();

        // Step 1: exclude disposed cases.
        let mut candidates: Vec<usize> = Vec::with_capacity(pool.len());
        for idx in 0..pool.len() {
            if pool.get(idx).is_disposed() {
                result.disposed_skipped += 1;
            } else {
                candidates.push(idx);
            }
        }
        if candidates.is_empty() {
            // Nothing to filter, order, or allocate.
            return result;
        }

        // Step 2: refresh derived state for the day.
        for &idx in &candidates {
            let case = pool.get_mut(idx);
            case.advance_age(today);
            case.compute_readiness();
            let priority = case.compute_priority(&self.priority_weights);
            case.set_priority_score(priority);
        }

        // Ripeness override directives are consumed by the filter below.
        ripeness_directives(overrides, pool, &mut overlays, &mut outcome);

        // Step 3: ripeness filter.
        let mut ripe: Vec<usize> = Vec::with_capacity(candidates.len());
        for &idx in &candidates {
            if let Some(&forced) = overlays.forced_ripeness.get(&idx) {
                // Forced verdicts are valid for this day only and are not
                // written back to the case.
                if forced {
                    ripe.push(idx);
                } else {
                    result.unripe_filtered += 1;
                }
                continue;
            }

            let verdict = self.classifier.classify(pool.get(idx), today);
            let case = pool.get_mut(idx);
            if case.ripeness().status != verdict.status {
                let from = case.ripeness().status;
                if verdict.status.is_ripe() {
                    case.mark_ripe(today);
                } else {
                    case.mark_unripe(verdict.status, verdict.reason.clone(), today);
                }
                result.ripeness_changes.push(RipenessChange {
                    case_id: case.id().to_string(),
                    from,
                    to: verdict.status,
                    reason: verdict.reason.clone(),
                });
            }

            if verdict.status.is_ripe() {
                ripe.push(idx);
            } else {
                result.unripe_filtered += 1;
            }
        }

        // Step 4: eligibility filter (minimum gap between hearings).
        let mut eligible: Vec<usize> = Vec::with_capacity(ripe.len());
        for idx in ripe {
            if pool.get(idx).is_ready_for_scheduling(self.min_gap_days) {
                eligible.push(idx);
            } else {
                result.gap_blocked += 1;
            }
        }

        // Step 5: policy ordering.
        let total_capacity: u32 = courtrooms
            .iter()
            .map(|r| r.effective_capacity(today))
            .sum();
        let ctx = DayContext {
            today,
            min_gap_days: self.min_gap_days,
            total_capacity,
            remaining_capacity: total_capacity,
            preferred_case_type: self.preferred_case_type,
        };
        let mut ordered = self.policy.prioritize(pool.cases(), eligible, &ctx);

        // Step 6: apply overrides in the documented order.
        apply_day_overrides(
            &mut ordered,
            overrides,
            pool,
            courtrooms,
            today,
            &mut overlays,
            &mut outcome,
        );

        // A disposed case past this point is a bug, not a data condition.
        ordered.retain(|&idx| {
            if pool.get(idx).is_disposed() {
                debug_assert!(
                    false,
                    "disposed case {} reached the allocator",
                    pool.get(idx).id()
                );
                result.invariant_violations += 1;
                false
            } else {
                true
            }
        });

        // Step 7: allocate to courtrooms.
        let allocation = allocator.allocate(&ordered, pool.cases(), courtrooms, today);
        result.capacity_limited = allocation.capacity_limited.len() as u32;

        // Step 8: mark scheduled and compose explanations.
        for (room_id, indices) in &allocation.per_room {
            let mut entries = Vec::with_capacity(indices.len());
            for (pos, &idx) in indices.iter().enumerate() {
                let sequence = pos as u32 + 1;
                let effective_priority = overlays.effective_priority(idx, pool.get(idx));

                let case = pool.get_mut(idx);
                if case.mark_scheduled(today).is_err() {
                    result.invariant_violations += 1;
                    continue;
                }
                case.assign_courtroom(*room_id);

                let explanation =
                    explain_scheduled(case, *room_id, sequence, effective_priority);
                entries.push(ScheduledEntry {
                    sequence,
                    case_id: case.id().to_string(),
                    case_type: case.case_type(),
                    stage: case.stage(),
                    priority_score: effective_priority,
                    explanation,
                });
            }
            result.cause_lists.insert(*room_id, entries);
        }

        result.total_scheduled = result
            .cause_lists
            .values()
            .map(|entries| entries.len() as u32)
            .sum();
        result.applied_overrides = outcome.applied;
        result.rejected_overrides = outcome.rejected;

        // Step 9: `overlays` drops here; forced-ripeness and priority bumps
        // never outlive the day.
        result
    }
}

fn explain_scheduled(case: &Case, room_id: u32, sequence: u32, priority: f64) -> String {
    let urgency = if case.is_urgent() { "urgent; " } else { "" };
    format!(
        "{}stage {}; priority {:.4}; listed #{} in courtroom {} (least loaded)",
        urgency,
        case.stage(),
        priority,
        sequence,
        room_id
    )
}
