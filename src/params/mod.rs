//! Empirically fitted parameter tables
//!
//! Immutable once loaded and safe to share read-only across runs. The
//! tables are injected as in-memory structures; how they were fitted is an
//! external concern.
//!
//! Lookups fail closed: a missing `(stage, case_type)` entry yields a
//! documented default and increments an atomic miss counter, so a sparse
//! table never aborts a run but the gap is visible in the run summary.
//!
//! The default transition distribution for a missing entry is a self-loop
//! with probability 0.9 and a uniform 0.1 tail over the stages strictly
//! after the source stage in canonical order (all mass on the self-loop
//! when the source stage is last).

use crate::models::stage::{CaseType, Stage};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Tolerance for probability sums.
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Self-loop mass of the default transition distribution.
pub const DEFAULT_SELF_LOOP_PROBABILITY: f64 = 0.9;

/// Default adjournment probability for a missing `(stage, type)` entry.
pub const DEFAULT_ADJOURNMENT_PROBABILITY: f64 = 0.30;

/// Fallback stage durations (days) for a missing stage entry.
pub const DEFAULT_STAGE_MEDIAN_DAYS: f64 = 30.0;
pub const DEFAULT_STAGE_P90_DAYS: f64 = 90.0;

/// Errors raised while validating injected tables.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParamError {
    #[error("transition distribution for ({stage}, {case_type}) sums to {sum}, expected 1")]
    InvalidDistribution {
        stage: Stage,
        case_type: CaseType,
        sum: f64,
    },

    #[error("transition from terminal stage {stage} for {case_type}")]
    TerminalTransitionSource { stage: Stage, case_type: CaseType },

    #[error("adjournment probability {value} for ({stage}, {case_type}) outside [0, 1]")]
    InvalidProbability {
        stage: Stage,
        case_type: CaseType,
        value: f64,
    },
}

/// Which duration figure a lookup should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DurationPercentile {
    Median,
    P90,
}

impl FromStr for DurationPercentile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "median" | "p50" => Ok(DurationPercentile::Median),
            "p90" => Ok(DurationPercentile::P90),
            other => Err(format!("Unknown duration percentile: '{}'", other)),
        }
    }
}

/// Residence time figures for one stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageDuration {
    pub median_days: f64,
    pub p90_days: f64,
}

/// Summary statistics for one case type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaseTypeStats {
    /// Median hearings before disposal.
    pub median_hearings: f64,
    /// Median gap between hearings (days).
    pub median_gap_days: f64,
    /// Median filing-to-disposal time (days).
    pub median_disposal_days: f64,
}

impl Default for CaseTypeStats {
    fn default() -> Self {
        Self {
            median_hearings: 5.0,
            median_gap_days: 30.0,
            median_disposal_days: 365.0,
        }
    }
}

/// Court-wide daily capacity priors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapacityParams {
    /// Nominal cases per courtroom per day.
    pub nominal: u32,
    /// High-percentile figure, carried for reporting.
    pub p90: u32,
}

/// Snapshot of how often each table had to fall back to a default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterMisses {
    pub transition: u64,
    pub adjournment: u64,
    pub duration: u64,
    pub type_stats: u64,
}

impl ParameterMisses {
    pub fn total(&self) -> u64 {
        self.transition + self.adjournment + self.duration + self.type_stats
    }
}

#[derive(Debug, Default)]
struct MissCounters {
    transition: AtomicU64,
    adjournment: AtomicU64,
    duration: AtomicU64,
    type_stats: AtomicU64,
}

/// The immutable parameter bundle.
#[derive(Debug)]
pub struct ParameterTables {
    transitions: HashMap<(Stage, CaseType), Vec<(Stage, f64)>>,
    durations: HashMap<Stage, StageDuration>,
    adjournments: HashMap<(Stage, CaseType), f64>,
    type_stats: HashMap<CaseType, CaseTypeStats>,
    capacity: CapacityParams,
    misses: MissCounters,
}

impl ParameterTables {
    /// Assemble and validate a parameter bundle.
    ///
    /// Distributions must sum to 1 within [`PROBABILITY_TOLERANCE`], no
    /// transition row may originate from a terminal stage, and adjournment
    /// probabilities must lie in `[0, 1]`.
    pub fn new(
        transitions: HashMap<(Stage, CaseType), Vec<(Stage, f64)>>,
        durations: HashMap<Stage, StageDuration>,
        adjournments: HashMap<(Stage, CaseType), f64>,
        type_stats: HashMap<CaseType, CaseTypeStats>,
        capacity: CapacityParams,
    ) -> Result<Self, ParamError> {
        for ((stage, case_type), dist) in &transitions {
            if stage.is_terminal() {
                return Err(ParamError::TerminalTransitionSource {
                    stage: *stage,
                    case_type: *case_type,
                });
            }
            let sum: f64 = dist.iter().map(|(_, p)| p).sum();
            if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
                return Err(ParamError::InvalidDistribution {
                    stage: *stage,
                    case_type: *case_type,
                    sum,
                });
            }
        }

        for ((stage, case_type), p) in &adjournments {
            if !(0.0..=1.0).contains(p) {
                return Err(ParamError::InvalidProbability {
                    stage: *stage,
                    case_type: *case_type,
                    value: *p,
                });
            }
        }

        Ok(Self {
            transitions,
            durations,
            adjournments,
            type_stats,
            capacity,
            misses: MissCounters::default(),
        })
    }

    /// A minimal bundle with empty tables; every lookup falls back to its
    /// documented default. Useful in tests.
    pub fn empty(capacity: CapacityParams) -> Self {
        Self {
            transitions: HashMap::new(),
            durations: HashMap::new(),
            adjournments: HashMap::new(),
            type_stats: HashMap::new(),
            capacity,
            misses: MissCounters::default(),
        }
    }

    /// Next-stage distribution for `(stage, case_type)`.
    pub fn transition(&self, stage: Stage, case_type: CaseType) -> Vec<(Stage, f64)> {
        match self.transitions.get(&(stage, case_type)) {
            Some(dist) => dist.clone(),
            None => {
                self.misses.transition.fetch_add(1, Ordering::Relaxed);
                default_transition(stage)
            }
        }
    }

    /// Residence time for a stage at the requested percentile, in days.
    pub fn duration(&self, stage: Stage, percentile: DurationPercentile) -> f64 {
        match self.durations.get(&stage) {
            Some(d) => match percentile {
                DurationPercentile::Median => d.median_days,
                DurationPercentile::P90 => d.p90_days,
            },
            None => {
                self.misses.duration.fetch_add(1, Ordering::Relaxed);
                match percentile {
                    DurationPercentile::Median => DEFAULT_STAGE_MEDIAN_DAYS,
                    DurationPercentile::P90 => DEFAULT_STAGE_P90_DAYS,
                }
            }
        }
    }

    /// Adjournment probability for `(stage, case_type)`.
    pub fn adjournment(&self, stage: Stage, case_type: CaseType) -> f64 {
        match self.adjournments.get(&(stage, case_type)) {
            Some(p) => *p,
            None => {
                self.misses.adjournment.fetch_add(1, Ordering::Relaxed);
                DEFAULT_ADJOURNMENT_PROBABILITY
            }
        }
    }

    /// Summary statistics for a case type.
    pub fn type_stats(&self, case_type: CaseType) -> CaseTypeStats {
        match self.type_stats.get(&case_type) {
            Some(stats) => *stats,
            None => {
                self.misses.type_stats.fetch_add(1, Ordering::Relaxed);
                CaseTypeStats::default()
            }
        }
    }

    /// Nominal daily capacity per courtroom.
    pub fn capacity(&self) -> u32 {
        self.capacity.nominal
    }

    /// High-percentile daily capacity per courtroom.
    pub fn capacity_p90(&self) -> u32 {
        self.capacity.p90
    }

    /// Snapshot of the miss counters.
    pub fn misses(&self) -> ParameterMisses {
        ParameterMisses {
            transition: self.misses.transition.load(Ordering::Relaxed),
            adjournment: self.misses.adjournment.load(Ordering::Relaxed),
            duration: self.misses.duration.load(Ordering::Relaxed),
            type_stats: self.misses.type_stats.load(Ordering::Relaxed),
        }
    }
}

/// The documented fail-closed transition distribution.
fn default_transition(stage: Stage) -> Vec<(Stage, f64)> {
    let successors = stage.successors();
    if successors.is_empty() {
        return vec![(stage, 1.0)];
    }

    let tail = (1.0 - DEFAULT_SELF_LOOP_PROBABILITY) / successors.len() as f64;
    let mut dist = Vec::with_capacity(successors.len() + 1);
    dist.push((stage, DEFAULT_SELF_LOOP_PROBABILITY));
    dist.extend(successors.into_iter().map(|s| (s, tail)));
    dist
}
