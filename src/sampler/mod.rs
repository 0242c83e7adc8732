//! Stochastic hearing outcome sampling
//!
//! For each scheduled case the sampler draws from its own RNG sub-stream,
//! keyed by `(master_seed, case_id, day_ordinal)`. Re-running with the same
//! seed therefore reproduces every outcome bit-for-bit, and sampling the
//! day's cases in any order (or in parallel) cannot change a single draw.
//!
//! Per hearing:
//! 1. Draw `u ∈ [0, 1)`; if `u < adjournment(stage, type)` the hearing is
//!    adjourned and the stage is unchanged.
//! 2. Otherwise the case is heard. When the stage gate allows a transition,
//!    the next stage is sampled from `transition(stage, type)`; a terminal
//!    successor disposes the case.
//! 3. `last_hearing_date` is updated on every record; `hearing_count` on
//!    heard/adjourned records only.

use crate::models::case::{Case, CaseError};
use crate::models::hearing::{HearingOutcome, HearingRecord};
use crate::models::stage::Stage;
use crate::params::ParameterTables;
use crate::rng::{substream_seed, RngManager};
use chrono::{Datelike, NaiveDate};
use std::sync::atomic::{AtomicU64, Ordering};

/// What happened at one hearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HearingDraw {
    pub outcome: HearingOutcome,
    pub stage_before: Stage,
    pub stage_after: Stage,
}

/// Seeded per-hearing outcome sampler.
///
/// Holds no per-case state; every call derives its stream from scratch, so
/// the sampler is safe to share immutably across worker threads.
#[derive(Debug)]
pub struct OutcomeSampler {
    master_seed: u64,
    clamp_warnings: AtomicU64,
}

impl OutcomeSampler {
    pub fn new(master_seed: u64) -> Self {
        Self {
            master_seed,
            clamp_warnings: AtomicU64::new(0),
        }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Times a numerically short distribution had to be clamped to its
    /// last successor.
    pub fn clamp_warnings(&self) -> u64 {
        self.clamp_warnings.load(Ordering::Relaxed)
    }

    /// Sample and apply the outcome of `case`'s hearing on `today`.
    ///
    /// `allow_transition` is the engine's stage-residency gate: when false a
    /// heard hearing keeps the current stage (recorded with
    /// `stage_after == stage_before`).
    pub fn step(
        &self,
        case: &mut Case,
        params: &ParameterTables,
        today: NaiveDate,
        courtroom_id: u32,
        allow_transition: bool,
    ) -> Result<HearingDraw, CaseError> {
        if case.is_disposed() {
            return Err(CaseError::AlreadyDisposed(case.id().to_string()));
        }
        debug_assert!(
            !case.stage().is_terminal(),
            "terminal stage {} as a sampling source",
            case.stage()
        );

        let seed = substream_seed(self.master_seed, case.id(), today.num_days_from_ce());
        let mut rng = RngManager::new(seed);

        let stage_before = case.stage();
        let u = rng.next_f64();
        let p_adjourn = params.adjournment(stage_before, case.case_type());

        let draw = if u < p_adjourn {
            HearingDraw {
                outcome: HearingOutcome::Adjourned,
                stage_before,
                stage_after: stage_before,
            }
        } else {
            let stage_after = if allow_transition {
                self.sample_next_stage(&mut rng, params, case)
            } else {
                stage_before
            };

            let outcome = if stage_after.is_terminal() {
                HearingOutcome::Disposed
            } else {
                HearingOutcome::Heard
            };
            HearingDraw {
                outcome,
                stage_before,
                stage_after,
            }
        };

        case.record_hearing(HearingRecord {
            date: today,
            outcome: draw.outcome,
            stage_before: draw.stage_before,
            stage_after: draw.stage_after,
            courtroom_id,
        })?;

        Ok(draw)
    }

    /// Sample the successor stage from the transition distribution.
    ///
    /// If floating-point accumulation leaves the draw beyond the cumulative
    /// mass, clamp to the last listed successor and count a warning.
    fn sample_next_stage(
        &self,
        rng: &mut RngManager,
        params: &ParameterTables,
        case: &Case,
    ) -> Stage {
        let dist = params.transition(case.stage(), case.case_type());
        if dist.is_empty() {
            return case.stage();
        }

        let r = rng.next_f64();
        let mut cumulative = 0.0;
        for (stage, p) in &dist {
            cumulative += p;
            if r < cumulative {
                return *stage;
            }
        }

        self.clamp_warnings.fetch_add(1, Ordering::Relaxed);
        dist[dist.len() - 1].0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::stage::CaseType;
    use crate::params::CapacityParams;
    use std::collections::HashMap;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn capacity() -> CapacityParams {
        CapacityParams { nominal: 10, p90: 15 }
    }

    fn tables_with_adjournment(p: f64) -> ParameterTables {
        let mut adjournments = HashMap::new();
        for stage in Stage::ALL {
            if !stage.is_terminal() {
                adjournments.insert((stage, CaseType::Crp), p);
            }
        }
        ParameterTables::new(
            HashMap::new(),
            HashMap::new(),
            adjournments,
            HashMap::new(),
            capacity(),
        )
        .unwrap()
    }

    #[test]
    fn test_adjournment_frequency_matches_table() {
        // Seed 42, p = 0.38: over 10,000 keyed draws the measured
        // frequency must sit within ±0.01 of the table value.
        let sampler = OutcomeSampler::new(42);
        let tables = tables_with_adjournment(0.38);

        let mut adjourned = 0u32;
        let start = d(2024, 1, 1);
        for i in 0..10_000 {
            let mut case = Case::new("CRP/2020/00001", CaseType::Crp, d(2019, 1, 1));
            let day = start + chrono::Duration::days(i);
            let draw = sampler.step(&mut case, &tables, day, 1, false).unwrap();
            if draw.outcome == HearingOutcome::Adjourned {
                adjourned += 1;
            }
        }

        let freq = adjourned as f64 / 10_000.0;
        assert!(
            (freq - 0.38).abs() < 0.01,
            "adjournment frequency {} too far from 0.38",
            freq
        );
    }

    #[test]
    fn test_same_seed_same_outcome() {
        let tables = tables_with_adjournment(0.5);
        let sampler_a = OutcomeSampler::new(7);
        let sampler_b = OutcomeSampler::new(7);

        let mut case_a = Case::new("C1", CaseType::Crp, d(2024, 1, 1));
        let mut case_b = Case::new("C1", CaseType::Crp, d(2024, 1, 1));

        let draw_a = sampler_a
            .step(&mut case_a, &tables, d(2024, 2, 1), 1, true)
            .unwrap();
        let draw_b = sampler_b
            .step(&mut case_b, &tables, d(2024, 2, 1), 1, true)
            .unwrap();

        assert_eq!(draw_a, draw_b);
    }

    #[test]
    fn test_terminal_transition_disposes() {
        // Admission always transitions straight to final disposal.
        let mut transitions = HashMap::new();
        transitions.insert(
            (Stage::Admission, CaseType::Crp),
            vec![(Stage::FinalDisposal, 1.0)],
        );
        let tables = ParameterTables::new(
            transitions,
            HashMap::new(),
            [((Stage::Admission, CaseType::Crp), 0.0)].into_iter().collect(),
            HashMap::new(),
            capacity(),
        )
        .unwrap();

        let sampler = OutcomeSampler::new(5);
        let mut case = Case::new("C1", CaseType::Crp, d(2024, 1, 1));
        let draw = sampler
            .step(&mut case, &tables, d(2024, 2, 1), 1, true)
            .unwrap();

        assert_eq!(draw.outcome, HearingOutcome::Disposed);
        assert!(case.is_disposed());
        assert_eq!(case.disposal_date(), Some(d(2024, 2, 1)));
        // Disposal records do not count as hearings.
        assert_eq!(case.hearing_count(), 0);
        assert_eq!(case.last_hearing_date(), Some(d(2024, 2, 1)));
    }

    #[test]
    fn test_transition_gate_holds_stage() {
        let mut transitions = HashMap::new();
        transitions.insert(
            (Stage::Admission, CaseType::Crp),
            vec![(Stage::Evidence, 1.0)],
        );
        let tables = ParameterTables::new(
            transitions,
            HashMap::new(),
            [((Stage::Admission, CaseType::Crp), 0.0)].into_iter().collect(),
            HashMap::new(),
            capacity(),
        )
        .unwrap();

        let sampler = OutcomeSampler::new(5);
        let mut case = Case::new("C1", CaseType::Crp, d(2024, 1, 1));
        let draw = sampler
            .step(&mut case, &tables, d(2024, 2, 1), 1, false)
            .unwrap();

        assert_eq!(draw.outcome, HearingOutcome::Heard);
        assert_eq!(case.stage(), Stage::Admission);
    }

    #[test]
    fn test_step_rejects_disposed_case() {
        let tables = tables_with_adjournment(0.0);
        let sampler = OutcomeSampler::new(5);
        let mut case = Case::new("C1", CaseType::Crp, d(2024, 1, 1));
        case.mark_disposed(d(2024, 1, 15));

        assert!(sampler
            .step(&mut case, &tables, d(2024, 2, 1), 1, true)
            .is_err());
    }

    #[test]
    fn test_adjournment_updates_hearing_count_and_date() {
        let tables = tables_with_adjournment(1.0);
        let sampler = OutcomeSampler::new(5);
        let mut case = Case::new("C1", CaseType::Crp, d(2024, 1, 1));

        let draw = sampler
            .step(&mut case, &tables, d(2024, 2, 1), 2, true)
            .unwrap();

        assert_eq!(draw.outcome, HearingOutcome::Adjourned);
        assert_eq!(case.hearing_count(), 1);
        assert_eq!(case.last_hearing_date(), Some(d(2024, 2, 1)));
        assert_eq!(case.stage(), Stage::Admission);
    }
}
