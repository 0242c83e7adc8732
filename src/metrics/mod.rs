//! Metrics accumulation and run finalization
//!
//! Per-day counters are observed as the engine processes each working day;
//! `finalize` turns the accumulated state into a `RunSummary` with the
//! aggregate measures: disposal rate, adjournment rate, utilization, the
//! load-balance Gini coefficient, and case coverage.

use crate::allocator::CourtroomAllocator;
use crate::models::pool::CasePool;
use crate::params::ParameterMisses;
use crate::scheduling::SchedulingResult;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Counters for one simulated working day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyMetrics {
    pub date: NaiveDate,
    /// Cases not yet disposed at the end of the day.
    pub active_cases: u32,
    pub scheduled: u32,
    pub heard: u32,
    pub adjourned: u32,
    pub disposed: u32,
    pub unripe_filtered: u32,
    pub gap_blocked: u32,
    pub capacity_limited: u32,
    /// Courtroom id → cases scheduled there today.
    pub per_courtroom: BTreeMap<u32, u32>,
}

/// Aggregate results for a full (or cancelled) run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days_simulated: u32,
    pub cancelled: bool,

    pub initial_population: u32,
    pub inflow: u32,

    /// Disposals during the run / initial population.
    pub disposal_rate: f64,
    /// Adjourned / (heard + adjourned).
    pub adjournment_rate: f64,
    /// Mean of scheduled / (courtrooms × nominal capacity) across days.
    pub utilization: f64,
    /// Gini coefficient over per-courtroom total counts.
    pub load_gini: f64,
    /// Fraction of cases scheduled at least once.
    pub coverage: f64,

    pub total_scheduled: u64,
    pub total_heard: u64,
    pub total_adjourned: u64,
    pub total_disposed: u64,

    pub unripe_filtered: u64,
    pub gap_blocked: u64,
    pub capacity_limited: u64,
    pub disposed_skipped: u64,

    pub overrides_applied: u64,
    pub overrides_rejected: u64,
    pub ripeness_transitions: u64,
    pub parameter_misses: ParameterMisses,
    pub sampler_clamp_warnings: u64,
    pub invariant_violations: u64,
}

/// Accumulates per-day observations over a run.
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    start_date: NaiveDate,
    nominal_daily_capacity: u64,
    initial_population: u32,

    days: Vec<DailyMetrics>,

    inflow: u32,
    total_heard: u64,
    total_adjourned: u64,
    total_disposed: u64,
    total_scheduled: u64,
    unripe_filtered: u64,
    gap_blocked: u64,
    capacity_limited: u64,
    disposed_skipped: u64,
    overrides_applied: u64,
    overrides_rejected: u64,
    ripeness_transitions: u64,
    invariant_violations: u64,
}

impl MetricsCollector {
    /// `nominal_daily_capacity` is the utilization denominator:
    /// `|courtrooms| × nominal capacity`, fixed for the run.
    pub fn new(
        start_date: NaiveDate,
        nominal_daily_capacity: u64,
        initial_population: u32,
    ) -> Self {
        Self {
            start_date,
            nominal_daily_capacity,
            initial_population,
            days: Vec::new(),
            inflow: 0,
            total_heard: 0,
            total_adjourned: 0,
            total_disposed: 0,
            total_scheduled: 0,
            unripe_filtered: 0,
            gap_blocked: 0,
            capacity_limited: 0,
            disposed_skipped: 0,
            overrides_applied: 0,
            overrides_rejected: 0,
            ripeness_transitions: 0,
            invariant_violations: 0,
        }
    }

    /// Record one day's scheduling result plus its sampled outcomes.
    pub fn observe_day(
        &mut self,
        result: &SchedulingResult,
        heard: u32,
        adjourned: u32,
        disposed: u32,
        active_cases: u32,
    ) {
        let per_courtroom: BTreeMap<u32, u32> = result
            .cause_lists
            .iter()
            .map(|(room, entries)| (*room, entries.len() as u32))
            .collect();

        self.days.push(DailyMetrics {
            date: result.date,
            active_cases,
            scheduled: result.total_scheduled,
            heard,
            adjourned,
            disposed,
            unripe_filtered: result.unripe_filtered,
            gap_blocked: result.gap_blocked,
            capacity_limited: result.capacity_limited,
            per_courtroom,
        });

        self.total_scheduled += u64::from(result.total_scheduled);
        self.total_heard += u64::from(heard);
        self.total_adjourned += u64::from(adjourned);
        self.total_disposed += u64::from(disposed);
        self.unripe_filtered += u64::from(result.unripe_filtered);
        self.gap_blocked += u64::from(result.gap_blocked);
        self.capacity_limited += u64::from(result.capacity_limited);
        self.disposed_skipped += u64::from(result.disposed_skipped);
        self.overrides_applied += result.applied_overrides.len() as u64;
        self.overrides_rejected += result.rejected_overrides.len() as u64;
        self.ripeness_transitions += result.ripeness_changes.len() as u64;
        self.invariant_violations += u64::from(result.invariant_violations);
    }

    /// Record simulated filings.
    pub fn observe_inflow(&mut self, count: u32) {
        self.inflow += count;
    }

    /// Record ripeness transitions from the periodic re-evaluation.
    pub fn observe_ripeness_transitions(&mut self, count: u64) {
        self.ripeness_transitions += count;
    }

    /// Record invariant violations detected outside `schedule_day`.
    pub fn observe_invariant_violations(&mut self, count: u64) {
        self.invariant_violations += count;
    }

    /// Daily records observed so far.
    pub fn days(&self) -> &[DailyMetrics] {
        &self.days
    }

    pub fn initial_population(&self) -> u32 {
        self.initial_population
    }

    /// Produce the aggregate summary over the days completed so far.
    pub fn finalize(
        &self,
        pool: &CasePool,
        allocator: &CourtroomAllocator,
        parameter_misses: ParameterMisses,
        sampler_clamp_warnings: u64,
        cancelled: bool,
    ) -> RunSummary {
        let disposal_rate = if self.initial_population > 0 {
            self.total_disposed as f64 / f64::from(self.initial_population)
        } else {
            0.0
        };

        let hearings = self.total_heard + self.total_adjourned;
        let adjournment_rate = if hearings > 0 {
            self.total_adjourned as f64 / hearings as f64
        } else {
            0.0
        };

        let utilization = if self.days.is_empty() || self.nominal_daily_capacity == 0 {
            0.0
        } else {
            let per_day: f64 = self
                .days
                .iter()
                .map(|day| f64::from(day.scheduled) / self.nominal_daily_capacity as f64)
                .sum();
            per_day / self.days.len() as f64
        };

        let totals: Vec<u64> = allocator.totals().values().copied().collect();
        let load_gini = gini(&totals);

        let coverage = if pool.is_empty() {
            0.0
        } else {
            let scheduled_once = pool
                .iter()
                .filter(|case| case.last_scheduled_date().is_some())
                .count();
            scheduled_once as f64 / pool.len() as f64
        };

        let end_date = self
            .days
            .last()
            .map(|day| day.date)
            .unwrap_or(self.start_date);

        RunSummary {
            start_date: self.start_date,
            end_date,
            days_simulated: self.days.len() as u32,
            cancelled,
            initial_population: self.initial_population,
            inflow: self.inflow,
            disposal_rate,
            adjournment_rate,
            utilization,
            load_gini,
            coverage,
            total_scheduled: self.total_scheduled,
            total_heard: self.total_heard,
            total_adjourned: self.total_adjourned,
            total_disposed: self.total_disposed,
            unripe_filtered: self.unripe_filtered,
            gap_blocked: self.gap_blocked,
            capacity_limited: self.capacity_limited,
            disposed_skipped: self.disposed_skipped,
            overrides_applied: self.overrides_applied,
            overrides_rejected: self.overrides_rejected,
            ripeness_transitions: self.ripeness_transitions,
            parameter_misses,
            sampler_clamp_warnings,
            invariant_violations: self.invariant_violations,
        }
    }
}

/// Gini coefficient over nonnegative counts.
///
/// 0 is perfect balance; approaches 1 as load concentrates in one bucket.
/// Zero-sum or empty inputs yield 0.
pub fn gini(counts: &[u64]) -> f64 {
    let n = counts.len();
    if n == 0 {
        return 0.0;
    }
    let total: u64 = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }

    let mut sorted = counts.to_vec();
    sorted.sort_unstable();

    let weighted: f64 = sorted
        .iter()
        .enumerate()
        .map(|(i, value)| (i as f64 + 1.0) * *value as f64)
        .sum();

    (2.0 * weighted) / (n as f64 * total as f64) - (n as f64 + 1.0) / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gini_perfect_balance() {
        assert_eq!(gini(&[80, 80, 80, 80, 80]), 0.0);
    }

    #[test]
    fn test_gini_empty_and_zero() {
        assert_eq!(gini(&[]), 0.0);
        assert_eq!(gini(&[0, 0, 0]), 0.0);
    }

    #[test]
    fn test_gini_total_concentration() {
        // All load in one of n buckets: gini = (n-1)/n.
        let g = gini(&[100, 0, 0, 0]);
        assert!((g - 0.75).abs() < 1e-12, "gini = {}", g);
    }

    #[test]
    fn test_gini_monotone_in_imbalance() {
        let balanced = gini(&[50, 50]);
        let skewed = gini(&[90, 10]);
        assert!(skewed > balanced);
    }
}
