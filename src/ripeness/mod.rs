//! Case ripeness classification
//!
//! Ripe cases are ready for substantive judicial time; unripe cases are
//! blocked on a bottleneck (summons service, a dependent matter, a party,
//! or documents). The classifier reads case state and returns a verdict
//! value; the engine writes the verdict back onto the case.
//!
//! Decision order (first match wins, deterministic):
//! 1. Bottleneck keywords in the last hearing purpose.
//! 2. Early admission: admission stage with too few hearings.
//! 3. Stuck: many hearings with a large mean inter-hearing gap.
//! 4. Advanced stage → ripe.
//! 5. Fallthrough: ripe, or `Unknown` in strict mode (filtered like
//!    non-ripe by the scheduling pipeline).

use crate::models::case::Case;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::stage::Stage;

/// Whether a case is ready to be heard, with the bottleneck type when not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RipenessStatus {
    /// Ready for hearing.
    Ripe,
    /// Waiting for summons service or a notice response.
    UnripeSummons,
    /// Waiting for a dependent case or court order.
    UnripeDependent,
    /// Party or lawyer unavailable.
    UnripeParty,
    /// Missing documents or records.
    UnripeDocument,
    /// Cannot determine (strict-mode fallthrough).
    Unknown,
}

impl RipenessStatus {
    pub fn is_ripe(self) -> bool {
        self == RipenessStatus::Ripe
    }

    pub fn is_unripe(self) -> bool {
        matches!(
            self,
            RipenessStatus::UnripeSummons
                | RipenessStatus::UnripeDependent
                | RipenessStatus::UnripeParty
                | RipenessStatus::UnripeDocument
        )
    }
}

impl fmt::Display for RipenessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RipenessStatus::Ripe => "RIPE",
            RipenessStatus::UnripeSummons => "UNRIPE_SUMMONS",
            RipenessStatus::UnripeDependent => "UNRIPE_DEPENDENT",
            RipenessStatus::UnripeParty => "UNRIPE_PARTY",
            RipenessStatus::UnripeDocument => "UNRIPE_DOCUMENT",
            RipenessStatus::Unknown => "UNKNOWN",
        };
        write!(f, "{}", name)
    }
}

/// A classification outcome: status plus a human-readable reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RipenessVerdict {
    pub status: RipenessStatus,
    pub reason: String,
}

/// Tunable thresholds for the structural rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RipenessThresholds {
    /// Hearings required before an admission-stage case counts as served.
    pub min_service_hearings: u32,
    /// Hearing count above which the stuck rule is considered.
    pub stuck_hearing_count: u32,
    /// Mean inter-hearing gap (days) above which a case counts as stuck.
    pub stuck_avg_gap_days: f64,
    /// Stages treated as substantive for rule 4.
    pub advanced_stages: Vec<Stage>,
}

impl Default for RipenessThresholds {
    fn default() -> Self {
        Self {
            min_service_hearings: 3,
            stuck_hearing_count: 10,
            stuck_avg_gap_days: 60.0,
            advanced_stages: vec![Stage::Evidence, Stage::Arguments, Stage::OrdersJudgment],
        }
    }
}

/// Heuristic days-until-ripe per bottleneck, for reporting only.
const ETA_SUMMONS_DAYS: i64 = 30;
const ETA_DEPENDENT_DAYS: i64 = 60;
const ETA_PARTY_DAYS: i64 = 14;
const ETA_DOCUMENT_DAYS: i64 = 21;

/// Keywords in the last hearing purpose that flag a bottleneck.
const SUMMONS_KEYWORDS: [&str; 2] = ["SUMMONS", "NOTICE"];
const DEPENDENT_KEYWORDS: [&str; 2] = ["STAY", "PENDING"];
const DOCUMENT_KEYWORDS: [&str; 2] = ["DOCUMENT", "RECORD"];

/// Classifies cases as ripe or unripe for scheduling.
///
/// Holds only its threshold configuration; never mutates cases.
#[derive(Debug, Clone)]
pub struct RipenessClassifier {
    thresholds: RipenessThresholds,
    strict: bool,
}

impl RipenessClassifier {
    /// Create a classifier. In strict mode the fallthrough verdict is
    /// `Unknown` instead of `Ripe`.
    pub fn new(thresholds: RipenessThresholds, strict: bool) -> Self {
        Self { thresholds, strict }
    }

    pub fn strict(&self) -> bool {
        self.strict
    }

    pub fn thresholds(&self) -> &RipenessThresholds {
        &self.thresholds
    }

    /// Replace the threshold bundle (calibration hook).
    pub fn set_thresholds(&mut self, thresholds: RipenessThresholds) {
        self.thresholds = thresholds;
    }

    /// Classify a case as of `today`.
    pub fn classify(&self, case: &Case, _today: NaiveDate) -> RipenessVerdict {
        // 1. Explicit bottleneck keywords in the last hearing purpose.
        if let Some(purpose) = case.last_hearing_purpose() {
            let upper = purpose.to_uppercase();

            if SUMMONS_KEYWORDS.iter().any(|k| upper.contains(k)) {
                return verdict(
                    RipenessStatus::UnripeSummons,
                    "waiting for summons service or notice response",
                );
            }
            if DEPENDENT_KEYWORDS.iter().any(|k| upper.contains(k)) {
                return verdict(
                    RipenessStatus::UnripeDependent,
                    "waiting for another case or court order",
                );
            }
            if DOCUMENT_KEYWORDS.iter().any(|k| upper.contains(k)) {
                return verdict(
                    RipenessStatus::UnripeDocument,
                    "missing documents or records",
                );
            }
        }

        // 2. Admission-stage cases with too few hearings to confirm service.
        if case.stage() == Stage::Admission
            && case.hearing_count() < self.thresholds.min_service_hearings
        {
            return verdict(
                RipenessStatus::UnripeSummons,
                "admission stage with service not yet confirmed",
            );
        }

        // 3. Stuck: many hearings, little movement.
        if case.hearing_count() > self.thresholds.stuck_hearing_count
            && case.mean_hearing_gap_days() > self.thresholds.stuck_avg_gap_days
        {
            return verdict(
                RipenessStatus::UnripeParty,
                "long hearing history with large gaps suggests an unavailable party",
            );
        }

        // 4. Substantive stage.
        if self.thresholds.advanced_stages.contains(&case.stage()) {
            return verdict(RipenessStatus::Ripe, "substantive stage reached");
        }

        // 5. Fallthrough.
        if self.strict {
            verdict(
                RipenessStatus::Unknown,
                "insufficient readiness evidence; routed to manual triage",
            )
        } else {
            verdict(RipenessStatus::Ripe, "no bottleneck detected")
        }
    }

    /// Convenience for the engine: can this case be heard today at all?
    pub fn schedulable(&self, case: &Case, today: NaiveDate) -> bool {
        !case.is_disposed() && self.classify(case, today).status.is_ripe()
    }

    /// Expected days until the case becomes ripe (reporting only).
    ///
    /// Returns `Some(0)` when already ripe and `None` when no estimate
    /// exists (unknown verdicts).
    pub fn ripening_eta(&self, case: &Case, today: NaiveDate) -> Option<i64> {
        match self.classify(case, today).status {
            RipenessStatus::Ripe => Some(0),
            RipenessStatus::UnripeSummons => Some(ETA_SUMMONS_DAYS),
            RipenessStatus::UnripeDependent => Some(ETA_DEPENDENT_DAYS),
            RipenessStatus::UnripeParty => Some(ETA_PARTY_DAYS),
            RipenessStatus::UnripeDocument => Some(ETA_DOCUMENT_DAYS),
            RipenessStatus::Unknown => None,
        }
    }
}

impl Default for RipenessClassifier {
    fn default() -> Self {
        Self::new(RipenessThresholds::default(), false)
    }
}

fn verdict(status: RipenessStatus, reason: &str) -> RipenessVerdict {
    RipenessVerdict {
        status,
        reason: reason.to_string(),
    }
}
