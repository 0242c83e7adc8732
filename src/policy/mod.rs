//! Scheduling policies
//!
//! A policy is a pure ordering function over the day's eligible case set:
//! it receives case indices into the population and returns them reordered.
//! Policies never mutate cases; the algorithm caches derived scores before
//! ordering and writes nothing else.
//!
//! # Variants
//!
//! 1. **Fifo**: filing order (oldest filing first) - baseline.
//! 2. **Age**: oldest cases first, to cap maximum pendency.
//! 3. **Readiness**: composite priority score (age, readiness, urgency,
//!    adjournment boost), highest first.
//! 4. **External**: an opaque scoring function over the fixed feature
//!    vector, highest first. Selected at configuration time; the function
//!    value is supplied at engine construction.
//!
//! All orderings share the deterministic tie-break: older filed date first,
//! then lexicographic case id.

mod age;
mod fifo;
mod readiness;
mod scorer;

pub use age::AgePolicy;
pub use fifo::FifoPolicy;
pub use readiness::ReadinessPolicy;
pub use scorer::{CaseFeatures, ExternalScorerPolicy};

use crate::models::case::Case;
use crate::models::stage::CaseType;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

/// Read-only per-day context handed to policies.
#[derive(Debug, Clone)]
pub struct DayContext {
    pub today: NaiveDate,
    pub min_gap_days: i64,
    /// Total effective capacity across courtrooms today.
    pub total_capacity: u32,
    /// Capacity still unassigned when the policy runs (equals
    /// `total_capacity` at ordering time).
    pub remaining_capacity: u32,
    /// Case type preferred today, if any (feeds the external scorer's
    /// preference feature).
    pub preferred_case_type: Option<CaseType>,
}

/// Opaque scoring function for the external policy variant.
pub type ScoreFn = Box<dyn Fn(&CaseFeatures) -> f64 + Send + Sync>;

/// Pluggable ordering over an eligible case set.
pub trait SchedulingPolicy: Send + Sync {
    /// Policy name for result metadata and logs.
    fn name(&self) -> &'static str;

    /// Return the candidate indices in scheduling order.
    ///
    /// `candidates` indexes into `pool`; implementations must be
    /// deterministic given their inputs.
    fn prioritize(&self, pool: &[Case], candidates: Vec<usize>, ctx: &DayContext) -> Vec<usize>;
}

/// Policy selection, fixed at configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyConfig {
    /// Filing order (baseline).
    Fifo,
    /// Oldest first.
    Age,
    /// Composite readiness priority.
    Readiness,
    /// External scoring function (supplied separately at construction).
    External,
}

/// Errors building a policy from configuration.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("external policy selected but no scoring function supplied")]
    MissingScorer,
}

/// Instantiate the configured policy.
///
/// `scorer` is consumed only by the `External` variant; passing one with
/// another variant is allowed and ignored.
pub fn build_policy(
    config: PolicyConfig,
    scorer: Option<ScoreFn>,
) -> Result<Box<dyn SchedulingPolicy>, PolicyError> {
    match config {
        PolicyConfig::Fifo => Ok(Box::new(FifoPolicy::new())),
        PolicyConfig::Age => Ok(Box::new(AgePolicy::new())),
        PolicyConfig::Readiness => Ok(Box::new(ReadinessPolicy::new())),
        PolicyConfig::External => match scorer {
            Some(f) => Ok(Box::new(ExternalScorerPolicy::new(f))),
            None => Err(PolicyError::MissingScorer),
        },
    }
}

/// Deterministic tie-break: older filing first, then case id.
pub(crate) fn tiebreak(a: &Case, b: &Case) -> Ordering {
    a.filed_date()
        .cmp(&b.filed_date())
        .then_with(|| a.id().cmp(b.id()))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_policy_names() {
        assert_eq!(build_policy(PolicyConfig::Fifo, None).unwrap().name(), "fifo");
        assert_eq!(build_policy(PolicyConfig::Age, None).unwrap().name(), "age");
        assert_eq!(
            build_policy(PolicyConfig::Readiness, None).unwrap().name(),
            "readiness"
        );
    }

    #[test]
    fn test_external_requires_scorer() {
        assert!(matches!(
            build_policy(PolicyConfig::External, None),
            Err(PolicyError::MissingScorer)
        ));

        let policy = build_policy(PolicyConfig::External, Some(Box::new(|_f| 0.0))).unwrap();
        assert_eq!(policy.name(), "external");
    }
}
