//! Judicial override layer
//!
//! Overrides are human modifications to a single day's candidate list or
//! capacity. They are values: the core validates and applies them but never
//! mutates the request itself. Invalid overrides are dropped into a
//! rejection list with a reason and never abort the day.
//!
//! Application order within a day is fixed:
//! `add → remove → priority → ripeness → capacity → reorder`.
//! After priority overrides the list is re-sorted by effective priority;
//! reorder overrides come last so explicit positions survive the re-sort.
//! Per-day effects (forced ripeness, priority bumps) live in a `DayOverlays`
//! value owned by the scheduling pass and are dropped with it - nothing
//! leaks onto the case across days.

use crate::models::case::Case;
use crate::models::courtroom::Courtroom;
use crate::models::pool::CasePool;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Hard ceiling for capacity overrides.
pub const CAPACITY_HARD_MAX: u32 = 200;

/// Kind of modification requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OverrideKind {
    /// Manually add a case to the day's candidate list.
    AddCase,
    /// Remove a case from the candidate list.
    RemoveCase,
    /// Move a case to an explicit position.
    Reorder,
    /// Force a priority score for the day.
    Priority,
    /// Force-ripen a case for the day.
    Ripeness,
    /// Adjust a courtroom's capacity for the day.
    Capacity,
}

impl fmt::Display for OverrideKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OverrideKind::AddCase => "add",
            OverrideKind::RemoveCase => "remove",
            OverrideKind::Reorder => "reorder",
            OverrideKind::Priority => "priority",
            OverrideKind::Ripeness => "ripeness",
            OverrideKind::Capacity => "capacity",
        };
        write!(f, "{}", name)
    }
}

/// A single override request.
///
/// Payload fields are kind-specific; irrelevant fields are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Override {
    pub id: String,
    pub kind: OverrideKind,
    pub case_id: Option<String>,
    pub courtroom_id: Option<u32>,
    pub actor_id: String,
    pub timestamp: NaiveDateTime,
    pub position: Option<usize>,
    pub new_priority: Option<f64>,
    pub make_ripe: Option<bool>,
    pub new_capacity: Option<u32>,
    pub reason: String,
}

impl Override {
    /// Minimal constructor; payload set through the `with_*` builders.
    pub fn new(
        id: impl Into<String>,
        kind: OverrideKind,
        actor_id: impl Into<String>,
        timestamp: NaiveDateTime,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            case_id: None,
            courtroom_id: None,
            actor_id: actor_id.into(),
            timestamp,
            position: None,
            new_priority: None,
            make_ripe: None,
            new_capacity: None,
            reason: String::new(),
        }
    }

    pub fn with_case(mut self, case_id: impl Into<String>) -> Self {
        self.case_id = Some(case_id.into());
        self
    }

    pub fn with_courtroom(mut self, courtroom_id: u32) -> Self {
        self.courtroom_id = Some(courtroom_id);
        self
    }

    pub fn with_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_priority(mut self, priority: f64) -> Self {
        self.new_priority = Some(priority);
        self
    }

    pub fn with_make_ripe(mut self, make_ripe: bool) -> Self {
        self.make_ripe = Some(make_ripe);
        self
    }

    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.new_capacity = Some(capacity);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }
}

/// A rejected override with the validation failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideRejection {
    pub override_id: String,
    pub kind: OverrideKind,
    pub reason: String,
}

/// Outcome of applying a day's overrides.
#[derive(Debug, Clone, Default)]
pub struct OverrideOutcome {
    pub applied: Vec<Override>,
    pub rejected: Vec<OverrideRejection>,
}

/// Per-day scratch state produced by overrides.
///
/// Owned by the scheduling pass for exactly one day; dropping it is the
/// "clear overlay flags" step, so nothing persists onto cases.
#[derive(Debug, Clone, Default)]
pub struct DayOverlays {
    /// Case index → forced ripeness verdict for today.
    pub forced_ripeness: BTreeMap<usize, bool>,
    /// Case index → priority score override for today.
    pub priority: BTreeMap<usize, f64>,
}

impl DayOverlays {
    /// Effective priority for a case: the overlay if present, else the
    /// cached score on the case.
    pub fn effective_priority(&self, idx: usize, case: &Case) -> f64 {
        self.priority
            .get(&idx)
            .copied()
            .unwrap_or_else(|| case.priority_score())
    }
}

/// Extract ripeness directives before the ripeness filter runs.
///
/// Valid ripeness overrides land in the overlays (and the applied list);
/// invalid ones are rejected here so the filter never sees them.
pub fn ripeness_directives(
    overrides: &[Override],
    pool: &CasePool,
    overlays: &mut DayOverlays,
    outcome: &mut OverrideOutcome,
) {
    for ov in overrides.iter().filter(|o| o.kind == OverrideKind::Ripeness) {
        let case_id = match ov.case_id.as_deref() {
            Some(id) => id,
            None => {
                reject(outcome, ov, "ripeness override requires a case id");
                continue;
            }
        };
        let idx = match pool.index_of(case_id) {
            Some(idx) => idx,
            None => {
                reject(outcome, ov, &format!("case {} does not exist", case_id));
                continue;
            }
        };
        if pool.get(idx).is_disposed() {
            reject(outcome, ov, &format!("case {} is disposed", case_id));
            continue;
        }
        let make_ripe = match ov.make_ripe {
            Some(v) => v,
            None => {
                reject(outcome, ov, "ripeness override requires make_ripe");
                continue;
            }
        };

        overlays.forced_ripeness.insert(idx, make_ripe);
        outcome.applied.push(ov.clone());
    }
}

/// Apply the non-ripeness overrides to an ordered candidate list.
///
/// `list` holds case indices into the pool, already policy-ordered.
/// Follows the documented order; ripeness entries are skipped here because
/// `ripeness_directives` consumed them before the filter stage.
#[allow(clippy::too_many_arguments)]
pub fn apply_day_overrides(
    list: &mut Vec<usize>,
    overrides: &[Override],
    pool: &CasePool,
    courtrooms: &mut [Courtroom],
    today: NaiveDate,
    overlays: &mut DayOverlays,
    outcome: &mut OverrideOutcome,
) {
    apply_adds(list, overrides, pool, outcome);
    apply_removes(list, overrides, pool, outcome);

    let priority_applied = apply_priorities(list, overrides, pool, overlays, outcome);
    if priority_applied {
        resort_by_priority(list, pool, overlays);
    }

    apply_capacities(overrides, courtrooms, today, outcome);
    apply_reorders(list, overrides, pool, outcome);
}

fn apply_adds(
    list: &mut Vec<usize>,
    overrides: &[Override],
    pool: &CasePool,
    outcome: &mut OverrideOutcome,
) {
    for ov in overrides.iter().filter(|o| o.kind == OverrideKind::AddCase) {
        let case_id = match ov.case_id.as_deref() {
            Some(id) => id,
            None => {
                reject(outcome, ov, "add override requires a case id");
                continue;
            }
        };
        let idx = match pool.index_of(case_id) {
            Some(idx) => idx,
            None => {
                reject(outcome, ov, &format!("case {} does not exist", case_id));
                continue;
            }
        };
        if pool.get(idx).is_disposed() {
            reject(outcome, ov, &format!("case {} is disposed", case_id));
            continue;
        }
        if list.contains(&idx) {
            reject(
                outcome,
                ov,
                &format!("case {} already in candidate list", case_id),
            );
            continue;
        }

        let position = ov.position.unwrap_or(0).min(list.len());
        list.insert(position, idx);
        outcome.applied.push(ov.clone());
    }
}

fn apply_removes(
    list: &mut Vec<usize>,
    overrides: &[Override],
    pool: &CasePool,
    outcome: &mut OverrideOutcome,
) {
    for ov in overrides.iter().filter(|o| o.kind == OverrideKind::RemoveCase) {
        let case_id = match ov.case_id.as_deref() {
            Some(id) => id,
            None => {
                reject(outcome, ov, "remove override requires a case id");
                continue;
            }
        };
        let position = pool
            .index_of(case_id)
            .and_then(|idx| list.iter().position(|i| *i == idx));

        match position {
            Some(pos) => {
                list.remove(pos);
                outcome.applied.push(ov.clone());
            }
            None => reject(
                outcome,
                ov,
                &format!("case {} not in candidate list", case_id),
            ),
        }
    }
}

fn apply_priorities(
    list: &[usize],
    overrides: &[Override],
    pool: &CasePool,
    overlays: &mut DayOverlays,
    outcome: &mut OverrideOutcome,
) -> bool {
    let mut any = false;

    for ov in overrides.iter().filter(|o| o.kind == OverrideKind::Priority) {
        let case_id = match ov.case_id.as_deref() {
            Some(id) => id,
            None => {
                reject(outcome, ov, "priority override requires a case id");
                continue;
            }
        };
        let idx = match pool.index_of(case_id) {
            Some(idx) if list.contains(&idx) => idx,
            _ => {
                reject(
                    outcome,
                    ov,
                    &format!("case {} not in candidate list", case_id),
                );
                continue;
            }
        };
        let priority = match ov.new_priority {
            Some(p) if (0.0..=1.0).contains(&p) => p,
            Some(p) => {
                reject(outcome, ov, &format!("priority {} outside [0, 1]", p));
                continue;
            }
            None => {
                reject(outcome, ov, "priority override requires new_priority");
                continue;
            }
        };

        overlays.priority.insert(idx, priority);
        outcome.applied.push(ov.clone());
        any = true;
    }

    any
}

fn apply_capacities(
    overrides: &[Override],
    courtrooms: &mut [Courtroom],
    today: NaiveDate,
    outcome: &mut OverrideOutcome,
) {
    for ov in overrides.iter().filter(|o| o.kind == OverrideKind::Capacity) {
        let room_id = match ov.courtroom_id {
            Some(id) => id,
            None => {
                reject(outcome, ov, "capacity override requires a courtroom id");
                continue;
            }
        };
        let capacity = match ov.new_capacity {
            Some(c) if c <= CAPACITY_HARD_MAX => c,
            Some(c) => {
                reject(
                    outcome,
                    ov,
                    &format!("capacity {} exceeds hard maximum {}", c, CAPACITY_HARD_MAX),
                );
                continue;
            }
            None => {
                reject(outcome, ov, "capacity override requires new_capacity");
                continue;
            }
        };

        match courtrooms.iter_mut().find(|room| room.id() == room_id) {
            Some(room) => {
                room.set_capacity_override(today, capacity);
                outcome.applied.push(ov.clone());
            }
            None => reject(
                outcome,
                ov,
                &format!("courtroom {} does not exist", room_id),
            ),
        }
    }
}

fn apply_reorders(
    list: &mut Vec<usize>,
    overrides: &[Override],
    pool: &CasePool,
    outcome: &mut OverrideOutcome,
) {
    for ov in overrides.iter().filter(|o| o.kind == OverrideKind::Reorder) {
        let case_id = match ov.case_id.as_deref() {
            Some(id) => id,
            None => {
                reject(outcome, ov, "reorder override requires a case id");
                continue;
            }
        };
        let current = pool
            .index_of(case_id)
            .and_then(|idx| list.iter().position(|i| *i == idx));
        let current = match current {
            Some(pos) => pos,
            None => {
                reject(
                    outcome,
                    ov,
                    &format!("case {} not in candidate list", case_id),
                );
                continue;
            }
        };
        let target = match ov.position {
            Some(p) if p < list.len() => p,
            Some(p) => {
                reject(
                    outcome,
                    ov,
                    &format!("position {} outside [0, {})", p, list.len()),
                );
                continue;
            }
            None => {
                reject(outcome, ov, "reorder override requires a position");
                continue;
            }
        };

        let idx = list.remove(current);
        list.insert(target, idx);
        outcome.applied.push(ov.clone());
    }
}

/// Re-sort the list by effective priority, descending, with the documented
/// deterministic tie-break (older filing first, then case id).
fn resort_by_priority(list: &mut [usize], pool: &CasePool, overlays: &DayOverlays) {
    let scores: HashMap<usize, f64> = list
        .iter()
        .map(|&idx| (idx, overlays.effective_priority(idx, pool.get(idx))))
        .collect();

    list.sort_by(|&a, &b| {
        let sa = scores[&a];
        let sb = scores[&b];
        sb.total_cmp(&sa)
            .then_with(|| pool.get(a).filed_date().cmp(&pool.get(b).filed_date()))
            .then_with(|| pool.get(a).id().cmp(pool.get(b).id()))
    });
}

fn reject(outcome: &mut OverrideOutcome, ov: &Override, reason: &str) {
    outcome.rejected.push(OverrideRejection {
        override_id: ov.id.clone(),
        kind: ov.kind,
        reason: reason.to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::case::Case;
    use crate::models::stage::CaseType;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn ts() -> NaiveDateTime {
        d(2024, 3, 1).and_hms_opt(8, 0, 0).unwrap()
    }

    fn pool_with(ids: &[&str]) -> CasePool {
        let mut pool = CasePool::new();
        for id in ids {
            pool.insert(Case::new(*id, CaseType::Crp, d(2024, 1, 1)))
                .unwrap();
        }
        pool
    }

    #[test]
    fn test_add_then_reorder() {
        // Candidate list [X, Y, Z]; add(W, 0) then reorder(Z, 0)
        // must yield [Z, W, X, Y].
        let pool = pool_with(&["X", "Y", "Z", "W"]);
        let mut list = vec![0, 1, 2];
        let mut rooms = vec![Courtroom::new(1, 3)];
        let mut overlays = DayOverlays::default();
        let mut outcome = OverrideOutcome::default();

        let overrides = vec![
            Override::new("o1", OverrideKind::AddCase, "J001", ts())
                .with_case("W")
                .with_position(0),
            Override::new("o2", OverrideKind::Reorder, "J001", ts())
                .with_case("Z")
                .with_position(0),
        ];

        apply_day_overrides(
            &mut list,
            &overrides,
            &pool,
            &mut rooms,
            d(2024, 3, 1),
            &mut overlays,
            &mut outcome,
        );

        let ids: Vec<&str> = list.iter().map(|&i| pool.get(i).id()).collect();
        assert_eq!(ids, vec!["Z", "W", "X", "Y"]);
        assert_eq!(outcome.applied.len(), 2);
        assert!(outcome.rejected.is_empty());
    }

    #[test]
    fn test_add_duplicate_rejected() {
        let pool = pool_with(&["X", "Y"]);
        let mut list = vec![0, 1];
        let mut rooms = vec![Courtroom::new(1, 3)];
        let mut overlays = DayOverlays::default();
        let mut outcome = OverrideOutcome::default();

        let overrides =
            vec![Override::new("o1", OverrideKind::AddCase, "J001", ts()).with_case("X")];

        apply_day_overrides(
            &mut list,
            &overrides,
            &pool,
            &mut rooms,
            d(2024, 3, 1),
            &mut overlays,
            &mut outcome,
        );

        assert_eq!(list, vec![0, 1]);
        assert_eq!(outcome.rejected.len(), 1);
        assert!(outcome.rejected[0].reason.contains("already in candidate list"));
    }

    #[test]
    fn test_remove_missing_rejected() {
        let pool = pool_with(&["X"]);
        let mut list = vec![0];
        let mut rooms = vec![Courtroom::new(1, 3)];
        let mut overlays = DayOverlays::default();
        let mut outcome = OverrideOutcome::default();

        let overrides =
            vec![Override::new("o1", OverrideKind::RemoveCase, "J001", ts()).with_case("NOPE")];

        apply_day_overrides(
            &mut list,
            &overrides,
            &pool,
            &mut rooms,
            d(2024, 3, 1),
            &mut overlays,
            &mut outcome,
        );

        assert_eq!(list, vec![0]);
        assert_eq!(outcome.rejected.len(), 1);
    }

    #[test]
    fn test_priority_override_resorts() {
        let mut pool = pool_with(&["A", "B", "C"]);
        for idx in 0..3 {
            pool.get_mut(idx).set_priority_score(0.5);
        }
        let mut list = vec![0, 1, 2];
        let mut rooms = vec![Courtroom::new(1, 3)];
        let mut overlays = DayOverlays::default();
        let mut outcome = OverrideOutcome::default();

        let overrides = vec![Override::new("o1", OverrideKind::Priority, "J001", ts())
            .with_case("C")
            .with_priority(0.9)];

        apply_day_overrides(
            &mut list,
            &overrides,
            &pool,
            &mut rooms,
            d(2024, 3, 1),
            &mut overlays,
            &mut outcome,
        );

        let ids: Vec<&str> = list.iter().map(|&i| pool.get(i).id()).collect();
        assert_eq!(ids, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_priority_out_of_range_rejected() {
        let pool = pool_with(&["A"]);
        let mut list = vec![0];
        let mut rooms = vec![Courtroom::new(1, 3)];
        let mut overlays = DayOverlays::default();
        let mut outcome = OverrideOutcome::default();

        let overrides = vec![Override::new("o1", OverrideKind::Priority, "J001", ts())
            .with_case("A")
            .with_priority(1.5)];

        apply_day_overrides(
            &mut list,
            &overrides,
            &pool,
            &mut rooms,
            d(2024, 3, 1),
            &mut overlays,
            &mut outcome,
        );

        assert!(overlays.priority.is_empty());
        assert_eq!(outcome.rejected.len(), 1);
    }

    #[test]
    fn test_capacity_override_applied_and_bounded() {
        let pool = pool_with(&[]);
        let mut list: Vec<usize> = vec![];
        let mut rooms = vec![Courtroom::new(1, 5)];
        let mut overlays = DayOverlays::default();
        let mut outcome = OverrideOutcome::default();
        let today = d(2024, 3, 1);

        let overrides = vec![
            Override::new("o1", OverrideKind::Capacity, "J001", ts())
                .with_courtroom(1)
                .with_capacity(10),
            Override::new("o2", OverrideKind::Capacity, "J001", ts())
                .with_courtroom(1)
                .with_capacity(CAPACITY_HARD_MAX + 1),
            Override::new("o3", OverrideKind::Capacity, "J001", ts())
                .with_courtroom(99)
                .with_capacity(10),
        ];

        apply_day_overrides(
            &mut list,
            &overrides,
            &pool,
            &mut rooms,
            today,
            &mut overlays,
            &mut outcome,
        );

        assert_eq!(rooms[0].effective_capacity(today), 10);
        assert_eq!(outcome.applied.len(), 1);
        assert_eq!(outcome.rejected.len(), 2);
    }

    #[test]
    fn test_reorder_position_out_of_bounds() {
        let pool = pool_with(&["A", "B"]);
        let mut list = vec![0, 1];
        let mut rooms = vec![Courtroom::new(1, 3)];
        let mut overlays = DayOverlays::default();
        let mut outcome = OverrideOutcome::default();

        let overrides = vec![Override::new("o1", OverrideKind::Reorder, "J001", ts())
            .with_case("A")
            .with_position(2)];

        apply_day_overrides(
            &mut list,
            &overrides,
            &pool,
            &mut rooms,
            d(2024, 3, 1),
            &mut overlays,
            &mut outcome,
        );

        assert_eq!(list, vec![0, 1]);
        assert_eq!(outcome.rejected.len(), 1);
    }

    #[test]
    fn test_ripeness_directive_validation() {
        let mut pool = pool_with(&["A", "B"]);
        pool.get_mut(1).mark_disposed(d(2024, 2, 1));

        let mut overlays = DayOverlays::default();
        let mut outcome = OverrideOutcome::default();

        let overrides = vec![
            Override::new("o1", OverrideKind::Ripeness, "J001", ts())
                .with_case("A")
                .with_make_ripe(true),
            Override::new("o2", OverrideKind::Ripeness, "J001", ts())
                .with_case("B")
                .with_make_ripe(true),
        ];

        ripeness_directives(&overrides, &pool, &mut overlays, &mut outcome);

        assert_eq!(overlays.forced_ripeness.get(&0), Some(&true));
        assert!(!overlays.forced_ripeness.contains_key(&1));
        assert_eq!(outcome.applied.len(), 1);
        assert_eq!(outcome.rejected.len(), 1);
    }
}
