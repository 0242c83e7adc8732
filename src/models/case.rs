//! Case entity and lifecycle
//!
//! A `Case` carries all per-case mutable state: stage, status, hearing
//! history, ripeness, and the derived scores the policies order by. All
//! mutation goes through the documented operations below; the engine
//! guarantees those are called serially per case.
//!
//! # Scores
//!
//! Readiness (in `[0, 1]`):
//!
//! ```text
//! readiness = 0.4 * clamp(hearing_count / 50)
//!           + 0.3 * clamp(100 / max(mean_gap_days, 1))
//!           + 0.3 * [stage is advanced]
//! ```
//!
//! Priority (in `[0, 1]`):
//!
//! ```text
//! priority = w_age * clamp(age_days / 365)
//!          + w_readiness * readiness
//!          + w_urgency * (urgent ? 1.0 : 0.5)
//!          + w_adjournment * exp(-days_since_last_hearing / 21)
//! ```
//!
//! where the adjournment boost is 0 for cases with no hearing yet. Ties are
//! broken by (older filed date, then lexicographic case id) wherever scores
//! are sorted on.

use crate::models::hearing::{HearingOutcome, HearingRecord};
use crate::models::stage::{CaseType, Stage};
use crate::ripeness::RipenessStatus;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Readiness formula weights (fixed).
pub const READINESS_HEARINGS_WEIGHT: f64 = 0.4;
pub const READINESS_GAP_WEIGHT: f64 = 0.3;
pub const READINESS_STAGE_WEIGHT: f64 = 0.3;

/// Hearing count above which the readiness hearings component saturates.
pub const READINESS_HEARINGS_CAP: f64 = 50.0;

/// Numerator of the readiness gap component.
pub const READINESS_GAP_NUMERATOR: f64 = 100.0;

/// Age (days) at which the priority age component saturates.
pub const PRIORITY_AGE_NORM_DAYS: f64 = 365.0;

/// Exponential decay constant (days) for the adjournment boost.
pub const ADJOURNMENT_BOOST_DECAY_DAYS: f64 = 21.0;

/// Urgency component values.
pub const URGENT_COMPONENT: f64 = 1.0;
pub const NON_URGENT_COMPONENT: f64 = 0.5;

/// Weights for the composite priority score.
///
/// Validated at engine construction: non-negative, summing to 1 within
/// `1e-6`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriorityWeights {
    pub age: f64,
    pub readiness: f64,
    pub urgency: f64,
    pub adjournment: f64,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            age: 0.35,
            readiness: 0.25,
            urgency: 0.25,
            adjournment: 0.15,
        }
    }
}

impl PriorityWeights {
    /// Check the weights are non-negative and sum to 1 within tolerance.
    pub fn is_valid(&self) -> bool {
        let parts = [self.age, self.readiness, self.urgency, self.adjournment];
        if parts.iter().any(|w| *w < 0.0 || !w.is_finite()) {
            return false;
        }
        (parts.iter().sum::<f64>() - 1.0).abs() <= 1e-6
    }
}

/// Lifecycle status of a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaseStatus {
    /// Filed, no hearing yet.
    Pending,
    /// At least one hearing heard.
    Active,
    /// Last hearing was adjourned.
    Adjourned,
    /// On today's cause list, outcome not yet sampled.
    Scheduled,
    /// Terminal; no further scheduling permitted.
    Disposed,
}

impl std::fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CaseStatus::Pending => "pending",
            CaseStatus::Active => "active",
            CaseStatus::Adjourned => "adjourned",
            CaseStatus::Scheduled => "scheduled",
            CaseStatus::Disposed => "disposed",
        };
        write!(f, "{}", name)
    }
}

/// Errors from case lifecycle operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CaseError {
    #[error("case {0} is disposed; no further mutation permitted")]
    AlreadyDisposed(String),

    #[error("hearing on {hearing} predates filing {filed} for case {case_id}")]
    HearingBeforeFiling {
        case_id: String,
        hearing: NaiveDate,
        filed: NaiveDate,
    },
}

/// Ripeness state carried on a case.
///
/// Written only by the engine/algorithm from classifier verdicts; the
/// reason is always present for non-ripe states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RipenessState {
    pub status: RipenessStatus,
    pub reason: Option<String>,
    pub evaluated_at: Option<NaiveDate>,
}

impl Default for RipenessState {
    fn default() -> Self {
        Self {
            status: RipenessStatus::Unknown,
            reason: Some("not yet evaluated".to_string()),
            evaluated_at: None,
        }
    }
}

/// Intake record for seeding the population (external generator format).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseIntake {
    pub case_id: String,
    pub case_type: CaseType,
    pub filed_date: NaiveDate,
    pub current_stage: Stage,
    pub hearing_count: u32,
    pub last_hearing_date: Option<NaiveDate>,
    pub last_hearing_purpose: Option<String>,
    pub is_urgent: bool,
}

/// A single court case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    id: String,
    case_type: CaseType,
    filed_date: NaiveDate,
    stage: Stage,
    status: CaseStatus,
    courtroom_id: Option<u32>,
    is_urgent: bool,

    hearing_count: u32,
    last_hearing_date: Option<NaiveDate>,
    last_hearing_purpose: Option<String>,

    age_days: i64,
    days_since_last_hearing: i64,
    stage_start_date: Option<NaiveDate>,
    days_in_stage: i64,
    disposal_date: Option<NaiveDate>,

    readiness_score: f64,
    priority_score: f64,
    ripeness: RipenessState,

    last_scheduled_date: Option<NaiveDate>,
    days_since_last_scheduled: i64,

    history: Vec<HearingRecord>,
}

impl Case {
    /// Create a fresh case at the admission stage with no history.
    pub fn new(id: impl Into<String>, case_type: CaseType, filed_date: NaiveDate) -> Self {
        Self {
            id: id.into(),
            case_type,
            filed_date,
            stage: Stage::Admission,
            status: CaseStatus::Pending,
            courtroom_id: None,
            is_urgent: false,
            hearing_count: 0,
            last_hearing_date: None,
            last_hearing_purpose: None,
            age_days: 0,
            days_since_last_hearing: 0,
            stage_start_date: Some(filed_date),
            days_in_stage: 0,
            disposal_date: None,
            readiness_score: 0.0,
            priority_score: 0.0,
            ripeness: RipenessState::default(),
            last_scheduled_date: None,
            days_since_last_scheduled: 0,
            history: Vec::new(),
        }
    }

    /// Build a case from an intake record.
    ///
    /// Rejects records whose last hearing predates the filing date
    /// (invariant: `last_hearing_date >= filed_date` when set).
    pub fn from_intake(intake: CaseIntake) -> Result<Self, CaseError> {
        if let Some(last) = intake.last_hearing_date {
            if last < intake.filed_date {
                return Err(CaseError::HearingBeforeFiling {
                    case_id: intake.case_id,
                    hearing: last,
                    filed: intake.filed_date,
                });
            }
        }

        let status = if intake.current_stage.is_terminal() {
            CaseStatus::Disposed
        } else if intake.hearing_count > 0 {
            CaseStatus::Active
        } else {
            CaseStatus::Pending
        };

        let disposal_date = if intake.current_stage.is_terminal() {
            Some(intake.last_hearing_date.unwrap_or(intake.filed_date))
        } else {
            None
        };

        Ok(Self {
            id: intake.case_id,
            case_type: intake.case_type,
            filed_date: intake.filed_date,
            stage: intake.current_stage,
            status,
            courtroom_id: None,
            is_urgent: intake.is_urgent,
            hearing_count: intake.hearing_count,
            last_hearing_date: intake.last_hearing_date,
            last_hearing_purpose: intake.last_hearing_purpose,
            age_days: 0,
            days_since_last_hearing: 0,
            stage_start_date: intake.last_hearing_date.or(Some(intake.filed_date)),
            days_in_stage: 0,
            disposal_date,
            readiness_score: 0.0,
            priority_score: 0.0,
            ripeness: RipenessState::default(),
            last_scheduled_date: None,
            days_since_last_scheduled: 0,
            history: Vec::new(),
        })
    }

    /// Set the stage (builder).
    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stage = stage;
        if stage.is_terminal() {
            self.status = CaseStatus::Disposed;
            self.disposal_date = Some(self.filed_date);
        }
        self
    }

    /// Mark urgent (builder).
    pub fn with_urgent(mut self) -> Self {
        self.is_urgent = true;
        self
    }

    /// Set hearing summary fields without history (builder, intake-style).
    pub fn with_hearing_summary(
        mut self,
        hearing_count: u32,
        last_hearing_date: Option<NaiveDate>,
    ) -> Self {
        self.hearing_count = hearing_count;
        self.last_hearing_date = last_hearing_date;
        if hearing_count > 0 {
            self.status = CaseStatus::Active;
        }
        self
    }

    /// Set the last hearing purpose text (builder).
    pub fn with_purpose(mut self, purpose: impl Into<String>) -> Self {
        self.last_hearing_purpose = Some(purpose.into());
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn case_type(&self) -> CaseType {
        self.case_type
    }

    pub fn filed_date(&self) -> NaiveDate {
        self.filed_date
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn status(&self) -> CaseStatus {
        self.status
    }

    pub fn courtroom_id(&self) -> Option<u32> {
        self.courtroom_id
    }

    pub fn is_urgent(&self) -> bool {
        self.is_urgent
    }

    pub fn hearing_count(&self) -> u32 {
        self.hearing_count
    }

    pub fn last_hearing_date(&self) -> Option<NaiveDate> {
        self.last_hearing_date
    }

    pub fn last_hearing_purpose(&self) -> Option<&str> {
        self.last_hearing_purpose.as_deref()
    }

    pub fn age_days(&self) -> i64 {
        self.age_days
    }

    pub fn days_since_last_hearing(&self) -> i64 {
        self.days_since_last_hearing
    }

    pub fn days_in_stage(&self) -> i64 {
        self.days_in_stage
    }

    pub fn disposal_date(&self) -> Option<NaiveDate> {
        self.disposal_date
    }

    pub fn readiness_score(&self) -> f64 {
        self.readiness_score
    }

    pub fn priority_score(&self) -> f64 {
        self.priority_score
    }

    pub fn ripeness(&self) -> &RipenessState {
        &self.ripeness
    }

    pub fn last_scheduled_date(&self) -> Option<NaiveDate> {
        self.last_scheduled_date
    }

    pub fn days_since_last_scheduled(&self) -> i64 {
        self.days_since_last_scheduled
    }

    pub fn history(&self) -> &[HearingRecord] {
        &self.history
    }

    /// Whether the case has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.status == CaseStatus::Disposed || self.stage.is_terminal()
    }

    /// Mean gap in days between hearings so far.
    ///
    /// Before the first hearing this falls back to the time since filing,
    /// which equals `days_since_last_hearing` after `advance_age`.
    pub fn mean_hearing_gap_days(&self) -> f64 {
        if self.hearing_count > 0 {
            self.age_days as f64 / self.hearing_count as f64
        } else {
            self.days_since_last_hearing as f64
        }
    }

    // ------------------------------------------------------------------
    // Mutating operations (engine/algorithm only)
    // ------------------------------------------------------------------

    /// Refresh all date-derived counters for `today`.
    pub fn advance_age(&mut self, today: NaiveDate) {
        self.age_days = (today - self.filed_date).num_days().max(0);

        self.days_since_last_hearing = match self.last_hearing_date {
            Some(last) => (today - last).num_days().max(0),
            None => self.age_days,
        };

        self.days_in_stage = match self.stage_start_date {
            Some(start) => (today - start).num_days().max(0),
            None => self.age_days,
        };

        self.days_since_last_scheduled = match self.last_scheduled_date {
            Some(last) => (today - last).num_days().max(0),
            None => self.age_days,
        };
    }

    /// Compute and cache the readiness score.
    ///
    /// Requires `advance_age` to have been called for the current day.
    pub fn compute_readiness(&mut self) -> f64 {
        let hearings_component = READINESS_HEARINGS_WEIGHT
            * (self.hearing_count as f64 / READINESS_HEARINGS_CAP).clamp(0.0, 1.0);

        let gap = self.mean_hearing_gap_days().max(1.0);
        let gap_component = READINESS_GAP_WEIGHT * (READINESS_GAP_NUMERATOR / gap).clamp(0.0, 1.0);

        let stage_component = if self.stage.is_advanced() {
            READINESS_STAGE_WEIGHT
        } else {
            0.0
        };

        self.readiness_score =
            (hearings_component + gap_component + stage_component).clamp(0.0, 1.0);
        self.readiness_score
    }

    /// Compute the composite priority score without caching it.
    ///
    /// Requires `compute_readiness` to have been called for the current day.
    pub fn compute_priority(&self, weights: &PriorityWeights) -> f64 {
        let age_component = (self.age_days as f64 / PRIORITY_AGE_NORM_DAYS).clamp(0.0, 1.0);

        let urgency_component = if self.is_urgent {
            URGENT_COMPONENT
        } else {
            NON_URGENT_COMPONENT
        };

        let adjournment_boost = if self.last_hearing_date.is_some() {
            (-(self.days_since_last_hearing as f64) / ADJOURNMENT_BOOST_DECAY_DAYS).exp()
        } else {
            0.0
        };

        weights.age * age_component
            + weights.readiness * self.readiness_score
            + weights.urgency * urgency_component
            + weights.adjournment * adjournment_boost
    }

    /// Cache a computed priority score on the case.
    pub fn set_priority_score(&mut self, score: f64) {
        self.priority_score = score;
    }

    /// Whether the case may be placed on a cause list today.
    ///
    /// True iff not disposed and either no hearing has happened yet or at
    /// least `min_gap_days` have elapsed since the last one.
    pub fn is_ready_for_scheduling(&self, min_gap_days: i64) -> bool {
        if self.is_disposed() {
            return false;
        }

        match self.last_hearing_date {
            None => true,
            Some(_) => self.days_since_last_hearing >= min_gap_days,
        }
    }

    /// Mark the case as scheduled for today.
    pub fn mark_scheduled(&mut self, today: NaiveDate) -> Result<(), CaseError> {
        if self.is_disposed() {
            return Err(CaseError::AlreadyDisposed(self.id.clone()));
        }

        self.status = CaseStatus::Scheduled;
        self.last_scheduled_date = Some(today);
        self.days_since_last_scheduled = 0;
        Ok(())
    }

    /// Record the courtroom the case was allocated to.
    pub fn assign_courtroom(&mut self, courtroom_id: u32) {
        self.courtroom_id = Some(courtroom_id);
    }

    /// Append a hearing record and apply its consequences.
    ///
    /// Updates `last_hearing_date` on every record; bumps `hearing_count`
    /// only for heard/adjourned records; applies the stage transition when
    /// `stage_after` differs; disposes the case when the record is terminal.
    pub fn record_hearing(&mut self, record: HearingRecord) -> Result<(), CaseError> {
        if self.status == CaseStatus::Disposed {
            return Err(CaseError::AlreadyDisposed(self.id.clone()));
        }
        if record.date < self.filed_date {
            return Err(CaseError::HearingBeforeFiling {
                case_id: self.id.clone(),
                hearing: record.date,
                filed: self.filed_date,
            });
        }

        self.last_hearing_date = Some(record.date);
        self.days_since_last_hearing = 0;

        if record.counts_as_hearing() {
            self.hearing_count += 1;
        }

        if record.stage_after != record.stage_before {
            self.stage = record.stage_after;
            self.stage_start_date = Some(record.date);
            self.days_in_stage = 0;
        }

        match record.outcome {
            HearingOutcome::Heard => self.status = CaseStatus::Active,
            HearingOutcome::Adjourned => self.status = CaseStatus::Adjourned,
            HearingOutcome::Disposed => self.mark_disposed(record.date),
        }
        if record.stage_after.is_terminal() {
            self.mark_disposed(record.date);
        }

        self.history.push(record);
        Ok(())
    }

    /// Dispose the case as of `today`.
    ///
    /// Idempotent: the first disposal date is kept.
    pub fn mark_disposed(&mut self, today: NaiveDate) {
        self.status = CaseStatus::Disposed;
        if self.disposal_date.is_none() {
            self.disposal_date = Some(today);
        }
    }

    /// Record a ripe verdict (written by the engine, not the classifier).
    pub fn mark_ripe(&mut self, today: NaiveDate) {
        self.ripeness = RipenessState {
            status: RipenessStatus::Ripe,
            reason: None,
            evaluated_at: Some(today),
        };
    }

    /// Record a non-ripe verdict with its mandatory reason.
    pub fn mark_unripe(&mut self, status: RipenessStatus, reason: String, today: NaiveDate) {
        debug_assert!(!status.is_ripe(), "mark_unripe called with a ripe status");
        self.ripeness = RipenessState {
            status,
            reason: Some(reason),
            evaluated_at: Some(today),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn record(
        date: NaiveDate,
        outcome: HearingOutcome,
        before: Stage,
        after: Stage,
    ) -> HearingRecord {
        HearingRecord {
            date,
            outcome,
            stage_before: before,
            stage_after: after,
            courtroom_id: 1,
        }
    }

    #[test]
    fn test_advance_age_without_history() {
        let mut case = Case::new("C1", CaseType::Crp, d(2024, 1, 1));
        case.advance_age(d(2024, 2, 1));

        assert_eq!(case.age_days(), 31);
        assert_eq!(case.days_since_last_hearing(), 31);
        assert_eq!(case.days_since_last_scheduled(), 31);
    }

    #[test]
    fn test_record_hearing_updates_counters() {
        let mut case = Case::new("C1", CaseType::Rsa, d(2024, 1, 1));
        case.record_hearing(record(
            d(2024, 2, 1),
            HearingOutcome::Heard,
            Stage::Admission,
            Stage::Evidence,
        ))
        .unwrap();

        assert_eq!(case.hearing_count(), 1);
        assert_eq!(case.stage(), Stage::Evidence);
        assert_eq!(case.status(), CaseStatus::Active);
        assert_eq!(case.last_hearing_date(), Some(d(2024, 2, 1)));
    }

    #[test]
    fn test_adjournment_keeps_stage() {
        let mut case = Case::new("C1", CaseType::Rsa, d(2024, 1, 1));
        case.record_hearing(record(
            d(2024, 2, 1),
            HearingOutcome::Adjourned,
            Stage::Admission,
            Stage::Admission,
        ))
        .unwrap();

        assert_eq!(case.stage(), Stage::Admission);
        assert_eq!(case.status(), CaseStatus::Adjourned);
        assert_eq!(case.hearing_count(), 1);
    }

    #[test]
    fn test_disposal_record_not_counted_as_hearing() {
        let mut case = Case::new("C1", CaseType::Ca, d(2024, 1, 1));
        case.record_hearing(record(
            d(2024, 2, 1),
            HearingOutcome::Heard,
            Stage::Admission,
            Stage::OrdersJudgment,
        ))
        .unwrap();
        case.record_hearing(record(
            d(2024, 3, 1),
            HearingOutcome::Disposed,
            Stage::OrdersJudgment,
            Stage::FinalDisposal,
        ))
        .unwrap();

        assert!(case.is_disposed());
        assert_eq!(case.hearing_count(), 1);
        assert_eq!(case.disposal_date(), Some(d(2024, 3, 1)));
        assert_eq!(case.history().len(), 2);
    }

    #[test]
    fn test_no_mutation_after_disposal() {
        let mut case = Case::new("C1", CaseType::Ca, d(2024, 1, 1));
        case.mark_disposed(d(2024, 2, 1));

        let err = case
            .record_hearing(record(
                d(2024, 3, 1),
                HearingOutcome::Heard,
                Stage::Admission,
                Stage::Evidence,
            ))
            .unwrap_err();
        assert_eq!(err, CaseError::AlreadyDisposed("C1".to_string()));

        assert!(case.mark_scheduled(d(2024, 3, 1)).is_err());
    }

    #[test]
    fn test_hearing_before_filing_rejected() {
        let intake = CaseIntake {
            case_id: "C1".to_string(),
            case_type: CaseType::Crp,
            filed_date: d(2024, 1, 10),
            current_stage: Stage::Admission,
            hearing_count: 1,
            last_hearing_date: Some(d(2024, 1, 5)),
            last_hearing_purpose: None,
            is_urgent: false,
        };
        assert!(Case::from_intake(intake).is_err());
    }

    #[test]
    fn test_readiness_components() {
        let mut case = Case::new("C1", CaseType::Crp, d(2023, 1, 1))
            .with_stage(Stage::Arguments)
            .with_hearing_summary(50, Some(d(2023, 12, 1)));
        case.advance_age(d(2024, 1, 1));

        // hearings saturated (0.4), advanced stage (0.3); gap component is
        // 0.3 * clamp(100 / (365/50)) = 0.3 since the mean gap is ~7.3 days.
        let readiness = case.compute_readiness();
        assert!((readiness - 1.0).abs() < 1e-9, "readiness = {}", readiness);
    }

    #[test]
    fn test_priority_urgent_beats_non_urgent() {
        let weights = PriorityWeights::default();

        let mut urgent = Case::new("A", CaseType::Crp, d(2024, 1, 1)).with_urgent();
        let mut plain = Case::new("B", CaseType::Crp, d(2024, 1, 1));

        for case in [&mut urgent, &mut plain] {
            case.advance_age(d(2024, 6, 1));
            case.compute_readiness();
        }

        assert!(urgent.compute_priority(&weights) > plain.compute_priority(&weights));
    }

    #[test]
    fn test_adjournment_boost_requires_history() {
        let weights = PriorityWeights::default();

        let mut fresh = Case::new("A", CaseType::Crp, d(2024, 1, 1));
        fresh.advance_age(d(2024, 1, 2));
        fresh.compute_readiness();

        let mut recent = Case::new("B", CaseType::Crp, d(2024, 1, 1));
        recent
            .record_hearing(record(
                d(2024, 1, 1),
                HearingOutcome::Adjourned,
                Stage::Admission,
                Stage::Admission,
            ))
            .unwrap();
        recent.advance_age(d(2024, 1, 2));
        recent.compute_readiness();

        // Same age and urgency; the adjournment boost separates them.
        assert!(recent.compute_priority(&weights) > fresh.compute_priority(&weights));
    }

    #[test]
    fn test_is_ready_for_scheduling_gap() {
        let mut case = Case::new("C", CaseType::Crp, d(2024, 1, 1));
        case.record_hearing(record(
            d(2024, 3, 1),
            HearingOutcome::Heard,
            Stage::Admission,
            Stage::Admission,
        ))
        .unwrap();

        case.advance_age(d(2024, 3, 10));
        assert!(!case.is_ready_for_scheduling(14));

        case.advance_age(d(2024, 3, 15));
        assert!(case.is_ready_for_scheduling(14));
    }

    #[test]
    fn test_priority_weights_validation() {
        assert!(PriorityWeights::default().is_valid());
        assert!(!PriorityWeights {
            age: 0.5,
            readiness: 0.5,
            urgency: 0.5,
            adjournment: 0.5,
        }
        .is_valid());
        assert!(!PriorityWeights {
            age: -0.1,
            readiness: 0.6,
            urgency: 0.3,
            adjournment: 0.2,
        }
        .is_valid());
    }
}
