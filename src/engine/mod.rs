//! Simulation engine
//!
//! Owns the case population, the courtroom set, the calendar, and the RNG
//! discipline, and drives the working-day loop:
//!
//! ```text
//! for each working day d in the horizon:
//!   1. Check the cancellation flag (clean partial shutdown).
//!   2. Re-evaluate ripeness for the whole population (every N days).
//!   3. Sample case inflow (Poisson filings) when enabled.
//!   4. schedule_day(...) → SchedulingResult.
//!   5. Sample a hearing outcome for every scheduled case.
//!   6. Observe metrics; append events.
//! ```
//!
//! The engine is single-threaded and deterministic by construction: the
//! only RNG streams are keyed sub-streams (`(seed, case_id, day)` for
//! outcomes, `(seed, "inflow", day)` for filings), so identical inputs and
//! seed reproduce identical cause lists, events, and counters.

use crate::allocator::CourtroomAllocator;
use crate::core::calendar::CourtCalendar;
use crate::metrics::{DailyMetrics, MetricsCollector, RunSummary};
use crate::models::case::{Case, CaseError, CaseIntake, PriorityWeights};
use crate::models::courtroom::Courtroom;
use crate::models::event::{Event, EventLog};
use crate::models::hearing::HearingOutcome;
use crate::models::pool::{CasePool, PoolError};
use crate::models::stage::{CaseType, Stage};
use crate::overrides::Override;
use crate::params::{DurationPercentile, ParamError, ParameterTables};
use crate::policy::{build_policy, PolicyConfig, ScoreFn};
use crate::ripeness::{RipenessClassifier, RipenessThresholds};
use crate::rng::{substream_seed, RngManager};
use crate::sampler::OutcomeSampler;
use crate::scheduling::{SchedulingAlgorithm, SchedulingResult};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Simulation error types.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Configuration validation failed (fatal at construction).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Parameter table validation failed.
    #[error(transparent)]
    Param(#[from] ParamError),

    /// Case lifecycle operation failed.
    #[error(transparent)]
    Case(#[from] CaseError),

    /// Population assembly failed.
    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Identifier and nominal capacity for one courtroom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourtroomConfig {
    pub id: u32,
    pub daily_capacity: u32,
}

/// Simulated case inflow configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InflowConfig {
    /// Expected filings per working day (Poisson rate).
    pub rate_per_day: f64,
    /// Case type sampling weights.
    pub type_weights: Vec<(CaseType, f64)>,
    /// Initial stage sampling weights (non-terminal stages only).
    pub stage_weights: Vec<(Stage, f64)>,
    /// Probability a new filing is flagged urgent.
    pub urgent_fraction: f64,
}

impl InflowConfig {
    /// Inflow at `rate_per_day` with the empirical case-type mix, all
    /// filings starting at admission, 5% urgent.
    pub fn new(rate_per_day: f64) -> Self {
        Self {
            rate_per_day,
            type_weights: vec![
                (CaseType::Crp, 0.201),
                (CaseType::Ca, 0.200),
                (CaseType::Rsa, 0.196),
                (CaseType::Rfa, 0.167),
                (CaseType::Ccc, 0.111),
                (CaseType::Cp, 0.096),
                (CaseType::Cmp, 0.028),
            ],
            stage_weights: vec![(Stage::Admission, 1.0)],
            urgent_fraction: 0.05,
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub start_date: NaiveDate,
    /// Simulation length in working days.
    pub horizon_days: u32,
    /// Master RNG seed.
    pub seed: u64,
    pub courtrooms: Vec<CourtroomConfig>,
    pub policy: PolicyConfig,
    pub priority_weights: PriorityWeights,
    /// Minimum calendar days between two hearings of the same case.
    pub min_gap_days: i64,
    /// Re-evaluate ripeness for the whole population every N calendar days.
    pub ripeness_eval_period_days: i64,
    pub strict_ripeness: bool,
    pub ripeness_thresholds: RipenessThresholds,
    /// `None` means a closed population.
    pub inflow: Option<InflowConfig>,
    /// Which stage-duration figure gates transitions.
    pub duration_percentile: DurationPercentile,
    /// Case type preferred by the court today (external scorer feature).
    pub preferred_case_type: Option<CaseType>,
}

impl EngineConfig {
    /// A configuration with the documented defaults for everything not
    /// passed explicitly.
    pub fn new(
        start_date: NaiveDate,
        horizon_days: u32,
        seed: u64,
        courtrooms: Vec<CourtroomConfig>,
    ) -> Self {
        Self {
            start_date,
            horizon_days,
            seed,
            courtrooms,
            policy: PolicyConfig::Readiness,
            priority_weights: PriorityWeights::default(),
            min_gap_days: 14,
            ripeness_eval_period_days: 7,
            strict_ripeness: false,
            ripeness_thresholds: RipenessThresholds::default(),
            inflow: None,
            duration_percentile: DurationPercentile::Median,
            preferred_case_type: None,
        }
    }
}

/// The discrete-event simulation engine.
pub struct SimulationEngine {
    config: EngineConfig,
    calendar: CourtCalendar,
    params: Arc<ParameterTables>,

    pool: CasePool,
    courtrooms: Vec<Courtroom>,
    algorithm: SchedulingAlgorithm,
    allocator: CourtroomAllocator,
    sampler: OutcomeSampler,

    metrics: MetricsCollector,
    event_log: EventLog,

    /// Earliest date each case may leave its current stage.
    stage_ready: HashMap<String, NaiveDate>,
    /// Overrides queued for specific days.
    pending_overrides: BTreeMap<NaiveDate, Vec<Override>>,

    cancel: Arc<AtomicBool>,
    last_ripeness_eval: Option<NaiveDate>,
    inflow_seq: u64,
}

impl SimulationEngine {
    /// Build an engine over an intake population.
    pub fn new(
        config: EngineConfig,
        intakes: Vec<CaseIntake>,
        params: Arc<ParameterTables>,
        calendar: CourtCalendar,
    ) -> Result<Self, SimulationError> {
        Self::with_scorer(config, intakes, params, calendar, None)
    }

    /// Build an engine, supplying the scoring function for the external
    /// policy variant.
    pub fn with_scorer(
        config: EngineConfig,
        intakes: Vec<CaseIntake>,
        params: Arc<ParameterTables>,
        calendar: CourtCalendar,
        scorer: Option<ScoreFn>,
    ) -> Result<Self, SimulationError> {
        Self::validate_config(&config)?;

        let policy = build_policy(config.policy, scorer)
            .map_err(|e| SimulationError::InvalidConfig(e.to_string()))?;
        let classifier =
            RipenessClassifier::new(config.ripeness_thresholds.clone(), config.strict_ripeness);
        let mut algorithm = SchedulingAlgorithm::new(
            policy,
            classifier,
            config.min_gap_days,
            config.priority_weights,
        );
        if let Some(preferred) = config.preferred_case_type {
            algorithm = algorithm.with_preferred_case_type(preferred);
        }

        let mut pool = CasePool::new();
        for intake in intakes {
            let case = Case::from_intake(intake)?;
            pool.insert(case)?;
        }

        let courtrooms: Vec<Courtroom> = config
            .courtrooms
            .iter()
            .map(|c| Courtroom::new(c.id, c.daily_capacity))
            .collect();

        let nominal_daily_capacity: u64 = config
            .courtrooms
            .iter()
            .map(|c| u64::from(c.daily_capacity))
            .sum();
        let metrics = MetricsCollector::new(
            config.start_date,
            nominal_daily_capacity,
            pool.len() as u32,
        );

        let sampler = OutcomeSampler::new(config.seed);

        let mut engine = Self {
            config,
            calendar,
            params,
            pool,
            courtrooms,
            algorithm,
            allocator: CourtroomAllocator::new(),
            sampler,
            metrics,
            event_log: EventLog::new(),
            stage_ready: HashMap::new(),
            pending_overrides: BTreeMap::new(),
            cancel: Arc::new(AtomicBool::new(false)),
            last_ripeness_eval: None,
            inflow_seq: 0,
        };
        engine.init_stage_ready();
        Ok(engine)
    }

    fn validate_config(config: &EngineConfig) -> Result<(), SimulationError> {
        if config.courtrooms.is_empty() {
            return Err(SimulationError::InvalidConfig(
                "courtroom set must not be empty".to_string(),
            ));
        }

        let mut ids: Vec<u32> = config.courtrooms.iter().map(|c| c.id).collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.len() != config.courtrooms.len() {
            return Err(SimulationError::InvalidConfig(
                "courtroom ids must be unique".to_string(),
            ));
        }

        if !config.priority_weights.is_valid() {
            return Err(SimulationError::InvalidConfig(
                "priority weights must be non-negative and sum to 1".to_string(),
            ));
        }

        if config.min_gap_days < 0 {
            return Err(SimulationError::InvalidConfig(
                "min_gap_days must be non-negative".to_string(),
            ));
        }

        if config.ripeness_eval_period_days < 1 {
            return Err(SimulationError::InvalidConfig(
                "ripeness_eval_period_days must be at least 1".to_string(),
            ));
        }

        if let Some(inflow) = &config.inflow {
            if !inflow.rate_per_day.is_finite() || inflow.rate_per_day < 0.0 {
                return Err(SimulationError::InvalidConfig(
                    "inflow rate must be finite and non-negative".to_string(),
                ));
            }
            if inflow.type_weights.is_empty()
                || inflow.type_weights.iter().map(|(_, w)| w).sum::<f64>() <= 0.0
            {
                return Err(SimulationError::InvalidConfig(
                    "inflow type weights must have positive total mass".to_string(),
                ));
            }
            if inflow.stage_weights.is_empty()
                || inflow.stage_weights.iter().map(|(_, w)| w).sum::<f64>() <= 0.0
            {
                return Err(SimulationError::InvalidConfig(
                    "inflow stage weights must have positive total mass".to_string(),
                ));
            }
            if inflow.stage_weights.iter().any(|(s, _)| s.is_terminal()) {
                return Err(SimulationError::InvalidConfig(
                    "inflow must not file cases into a terminal stage".to_string(),
                ));
            }
            if !(0.0..=1.0).contains(&inflow.urgent_fraction) {
                return Err(SimulationError::InvalidConfig(
                    "inflow urgent_fraction must lie in [0, 1]".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Seed each case's stage-ready date from the duration table: last
    /// hearing (or filing) plus the typical residence time of its stage.
    fn init_stage_ready(&mut self) {
        let percentile = self.config.duration_percentile;
        for case in self.pool.iter() {
            if case.is_disposed() {
                continue;
            }
            let anchor = case.last_hearing_date().unwrap_or(case.filed_date());
            let ready = add_duration_days(
                anchor,
                self.params.duration(case.stage(), percentile),
            );
            self.stage_ready.insert(case.id().to_string(), ready);
        }
    }

    /// A clonable handle; setting it stops the run at the next day boundary.
    pub fn cancellation_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Queue an override for a specific day.
    pub fn queue_override(&mut self, date: NaiveDate, ov: Override) {
        self.pending_overrides.entry(date).or_default().push(ov);
    }

    /// Run the configured horizon.
    ///
    /// On cancellation the loop stops at the next day boundary and the
    /// summary covers the days completed, flagged `cancelled`.
    pub fn run(&mut self) -> Result<RunSummary, SimulationError> {
        let mut cancelled = false;
        let mut current = self.config.start_date;
        let mut days_done = 0u32;

        while days_done < self.config.horizon_days {
            if self.cancel.load(Ordering::Relaxed) {
                cancelled = true;
                break;
            }
            if !self.calendar.is_working_day(current) {
                current = next_day(current);
                continue;
            }

            self.process_day(current);
            days_done += 1;
            current = next_day(current);
        }

        Ok(self.summary_with(cancelled))
    }

    /// Summary over the days completed so far.
    pub fn summary(&self) -> RunSummary {
        self.summary_with(self.cancel.load(Ordering::Relaxed))
    }

    fn summary_with(&self, cancelled: bool) -> RunSummary {
        self.metrics.finalize(
            &self.pool,
            &self.allocator,
            self.params.misses(),
            self.sampler.clamp_warnings(),
            cancelled,
        )
    }

    fn process_day(&mut self, today: NaiveDate) {
        let due_for_eval = match self.last_ripeness_eval {
            None => true,
            Some(last) => (today - last).num_days() >= self.config.ripeness_eval_period_days,
        };
        if due_for_eval {
            self.evaluate_ripeness(today);
            self.last_ripeness_eval = Some(today);
        }

        if let Some(inflow) = self.config.inflow.clone() {
            if inflow.rate_per_day > 0.0 {
                self.file_new_cases(today, &inflow);
            }
        }

        let overrides = self.pending_overrides.remove(&today).unwrap_or_default();
        let result = self.algorithm.schedule_day(
            &mut self.pool,
            self.courtrooms.as_mut_slice(),
            &mut self.allocator,
            today,
            &overrides,
        );

        self.emit_scheduling_events(&result);
        let (heard, adjourned, disposed) = self.sample_outcomes(&result, today);

        let active_cases = self.pool.iter().filter(|c| !c.is_disposed()).count() as u32;
        self.metrics
            .observe_day(&result, heard, adjourned, disposed, active_cases);
    }

    /// Periodic full-population ripeness re-evaluation.
    fn evaluate_ripeness(&mut self, today: NaiveDate) {
        let classifier = self.algorithm.classifier().clone();
        let mut transitions = 0u64;

        for case in self.pool.iter_mut() {
            if case.is_disposed() {
                continue;
            }
            case.advance_age(today);

            let verdict = classifier.classify(case, today);
            if verdict.status == case.ripeness().status {
                continue;
            }

            let from = case.ripeness().status;
            if verdict.status.is_ripe() {
                case.mark_ripe(today);
            } else {
                case.mark_unripe(verdict.status, verdict.reason.clone(), today);
            }
            transitions += 1;
            self.event_log.push(Event::RipenessChanged {
                date: today,
                case_id: case.id().to_string(),
                from,
                to: verdict.status,
                reason: verdict.reason,
            });
        }

        self.metrics.observe_ripeness_transitions(transitions);
    }

    /// Sample Poisson filings for the day and insert them at their initial
    /// stage. Filing ids are sequential, so runs stay reproducible.
    fn file_new_cases(&mut self, today: NaiveDate, inflow: &InflowConfig) {
        let seed = substream_seed(self.config.seed, "inflow", today.num_days_from_ce());
        let mut rng = RngManager::new(seed);

        let count = rng.poisson(inflow.rate_per_day);
        let mut filed = 0u32;

        for _ in 0..count {
            let case_type = match sample_weighted(&mut rng, &inflow.type_weights) {
                Some(t) => t,
                None => break,
            };
            let stage = match sample_weighted(&mut rng, &inflow.stage_weights) {
                Some(s) => s,
                None => break,
            };
            let urgent = rng.next_f64() < inflow.urgent_fraction;

            self.inflow_seq += 1;
            let case_id = format!("SIM/{}/{:06}", today.year(), self.inflow_seq);

            let mut case = Case::new(case_id.clone(), case_type, today).with_stage(stage);
            if urgent {
                case = case.with_urgent();
            }

            // Ids are generated from a private counter, so insertion
            // cannot collide with intake ids using the SIM prefix.
            if self.pool.insert(case).is_ok() {
                let ready = add_duration_days(
                    today,
                    self.params.duration(stage, self.config.duration_percentile),
                );
                self.stage_ready.insert(case_id.clone(), ready);
                self.event_log.push(Event::Filing {
                    date: today,
                    case_id,
                    case_type,
                    stage,
                });
                filed += 1;
            }
        }

        self.metrics.observe_inflow(filed);
    }

    fn emit_scheduling_events(&mut self, result: &SchedulingResult) {
        for change in &result.ripeness_changes {
            self.event_log.push(Event::RipenessChanged {
                date: result.date,
                case_id: change.case_id.clone(),
                from: change.from,
                to: change.to,
                reason: change.reason.clone(),
            });
        }
        for ov in &result.applied_overrides {
            self.event_log.push(Event::OverrideApplied {
                date: result.date,
                override_id: ov.id.clone(),
                kind: ov.kind,
                actor_id: ov.actor_id.clone(),
            });
        }
        for rejection in &result.rejected_overrides {
            self.event_log.push(Event::OverrideRejected {
                date: result.date,
                override_id: rejection.override_id.clone(),
                kind: rejection.kind,
                reason: rejection.reason.clone(),
            });
        }
        for (room_id, entries) in &result.cause_lists {
            for entry in entries {
                self.event_log.push(Event::Scheduled {
                    date: result.date,
                    case_id: entry.case_id.clone(),
                    courtroom_id: *room_id,
                    sequence: entry.sequence,
                    stage: entry.stage,
                    priority_score: entry.priority_score,
                });
            }
        }
    }

    /// Apply the outcome sampler to every scheduled case, in deterministic
    /// (room id, sequence) order. Returns `(heard, adjourned, disposed)`.
    fn sample_outcomes(&mut self, result: &SchedulingResult, today: NaiveDate) -> (u32, u32, u32) {
        let mut heard = 0u32;
        let mut adjourned = 0u32;
        let mut disposed = 0u32;

        for (room_id, case_id) in result.scheduled_case_ids() {
            let idx = match self.pool.index_of(&case_id) {
                Some(idx) => idx,
                None => {
                    self.metrics.observe_invariant_violations(1);
                    continue;
                }
            };

            let allow_transition = self
                .stage_ready
                .get(&case_id)
                .map(|ready| today >= *ready)
                .unwrap_or(true);

            let params = Arc::clone(&self.params);
            let draw = {
                let case = self.pool.get_mut(idx);
                self.sampler
                    .step(case, &params, today, room_id, allow_transition)
            };

            let draw = match draw {
                Ok(draw) => draw,
                Err(_) => {
                    // Recorded and skipped in production; the sampler's
                    // debug assertions make this fatal under test.
                    self.metrics.observe_invariant_violations(1);
                    continue;
                }
            };

            self.event_log.push(Event::HearingHeld {
                date: today,
                case_id: case_id.clone(),
                courtroom_id: room_id,
                outcome: draw.outcome,
                stage_before: draw.stage_before,
                stage_after: draw.stage_after,
            });

            match draw.outcome {
                HearingOutcome::Adjourned => adjourned += 1,
                HearingOutcome::Heard => {
                    heard += 1;
                    if let Some(room) = self.courtrooms.iter_mut().find(|r| r.id() == room_id) {
                        room.record_hearing_held();
                    }
                }
                HearingOutcome::Disposed => {
                    disposed += 1;
                    if let Some(room) = self.courtrooms.iter_mut().find(|r| r.id() == room_id) {
                        room.record_hearing_held();
                    }
                }
            }

            if draw.stage_after != draw.stage_before {
                self.event_log.push(Event::StageChanged {
                    date: today,
                    case_id: case_id.clone(),
                    from: draw.stage_before,
                    to: draw.stage_after,
                });
            }

            if draw.outcome == HearingOutcome::Disposed {
                self.stage_ready.remove(&case_id);
                self.event_log.push(Event::Disposed {
                    date: today,
                    case_id: case_id.clone(),
                    stage: draw.stage_after,
                });
            } else if draw.stage_after != draw.stage_before {
                let ready = add_duration_days(
                    today,
                    self.params
                        .duration(draw.stage_after, self.config.duration_percentile),
                );
                self.stage_ready.insert(case_id.clone(), ready);
            }
        }

        (heard, adjourned, disposed)
    }

    // ------------------------------------------------------------------
    // Accessors (snapshots for external consumers)
    // ------------------------------------------------------------------

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn pool(&self) -> &CasePool {
        &self.pool
    }

    pub fn case(&self, case_id: &str) -> Option<&Case> {
        self.pool.by_id(case_id)
    }

    pub fn courtrooms(&self) -> &[Courtroom] {
        &self.courtrooms
    }

    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    pub fn daily_metrics(&self) -> &[DailyMetrics] {
        self.metrics.days()
    }

    pub fn allocator(&self) -> &CourtroomAllocator {
        &self.allocator
    }

    pub fn params(&self) -> &ParameterTables {
        &self.params
    }
}

/// Sample from a weight table; `None` only for non-positive total mass.
fn sample_weighted<T: Copy>(rng: &mut RngManager, weights: &[(T, f64)]) -> Option<T> {
    let total: f64 = weights.iter().map(|(_, w)| w).sum();
    if total <= 0.0 {
        return None;
    }

    let r = rng.next_f64() * total;
    let mut cumulative = 0.0;
    for (item, weight) in weights {
        cumulative += weight;
        if r < cumulative {
            return Some(*item);
        }
    }
    weights.last().map(|(item, _)| *item)
}

fn next_day(date: NaiveDate) -> NaiveDate {
    date.succ_opt().expect("date out of supported range")
}

/// Anchor plus a table duration, rounded, at least one day.
fn add_duration_days(anchor: NaiveDate, duration_days: f64) -> NaiveDate {
    let days = duration_days.round().max(1.0) as i64;
    anchor + Duration::days(days)
}
