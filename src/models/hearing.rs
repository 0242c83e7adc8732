//! Hearing records
//!
//! A hearing record is the append-only audit unit of the simulator: one row
//! per hearing that actually took place, never mutated after the fact.

use crate::models::stage::Stage;
use serde::{Deserialize, Serialize};
use std::fmt;

use chrono::NaiveDate;

/// Outcome of a single hearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HearingOutcome {
    /// Hearing proceeded; the case may have moved stage.
    Heard,
    /// Hearing was postponed; the stage is unchanged.
    Adjourned,
    /// Hearing concluded the case (transition into a terminal stage).
    Disposed,
}

impl fmt::Display for HearingOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HearingOutcome::Heard => "heard",
            HearingOutcome::Adjourned => "adjourned",
            HearingOutcome::Disposed => "disposed",
        };
        write!(f, "{}", name)
    }
}

/// A single hearing event for a case.
///
/// Records are appended by the outcome sampler and never rewritten. The
/// `stage_before`/`stage_after` pair makes stage progression auditable from
/// the history alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HearingRecord {
    pub date: NaiveDate,
    pub outcome: HearingOutcome,
    pub stage_before: Stage,
    pub stage_after: Stage,
    pub courtroom_id: u32,
}

impl HearingRecord {
    /// Whether this record counts toward `hearing_count`.
    ///
    /// Disposal records close the case but are not counted as hearings, so
    /// `hearing_count` stays equal to the number of heard/adjourned records.
    pub fn counts_as_hearing(&self) -> bool {
        matches!(
            self.outcome,
            HearingOutcome::Heard | HearingOutcome::Adjourned
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_counts_as_hearing() {
        let mut record = HearingRecord {
            date: d(2024, 3, 1),
            outcome: HearingOutcome::Heard,
            stage_before: Stage::Admission,
            stage_after: Stage::Evidence,
            courtroom_id: 1,
        };
        assert!(record.counts_as_hearing());

        record.outcome = HearingOutcome::Adjourned;
        assert!(record.counts_as_hearing());

        record.outcome = HearingOutcome::Disposed;
        assert!(!record.counts_as_hearing());
    }
}
