//! Event logging for simulation replay and auditing.
//!
//! Every significant state change during a run is captured as an `Event`.
//! The log is append-only, ordered by emission (days are sequential, and
//! within a day events follow the pipeline order), and supports streaming
//! export as JSON lines.

use crate::models::hearing::HearingOutcome;
use crate::models::stage::{CaseType, Stage};
use crate::overrides::OverrideKind;
use crate::ripeness::RipenessStatus;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::io;

/// A simulation event. All variants carry the date they occurred on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A new case entered the system (simulated filing).
    Filing {
        date: NaiveDate,
        case_id: String,
        case_type: CaseType,
        stage: Stage,
    },

    /// A case's ripeness verdict changed.
    RipenessChanged {
        date: NaiveDate,
        case_id: String,
        from: RipenessStatus,
        to: RipenessStatus,
        reason: String,
    },

    /// A case was placed on a cause list.
    Scheduled {
        date: NaiveDate,
        case_id: String,
        courtroom_id: u32,
        sequence: u32,
        stage: Stage,
        priority_score: f64,
    },

    /// A scheduled hearing took place (heard, adjourned, or disposing).
    HearingHeld {
        date: NaiveDate,
        case_id: String,
        courtroom_id: u32,
        outcome: HearingOutcome,
        stage_before: Stage,
        stage_after: Stage,
    },

    /// A case moved to a new stage.
    StageChanged {
        date: NaiveDate,
        case_id: String,
        from: Stage,
        to: Stage,
    },

    /// A case was disposed.
    Disposed {
        date: NaiveDate,
        case_id: String,
        stage: Stage,
    },

    /// An override passed validation and was applied.
    OverrideApplied {
        date: NaiveDate,
        override_id: String,
        kind: OverrideKind,
        actor_id: String,
    },

    /// An override failed validation.
    OverrideRejected {
        date: NaiveDate,
        override_id: String,
        kind: OverrideKind,
        reason: String,
    },
}

impl Event {
    /// The date the event occurred on.
    pub fn date(&self) -> NaiveDate {
        match self {
            Event::Filing { date, .. }
            | Event::RipenessChanged { date, .. }
            | Event::Scheduled { date, .. }
            | Event::HearingHeld { date, .. }
            | Event::StageChanged { date, .. }
            | Event::Disposed { date, .. }
            | Event::OverrideApplied { date, .. }
            | Event::OverrideRejected { date, .. } => *date,
        }
    }
}

/// Append-only event log.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    /// Stream the log as JSON lines (one event per line).
    pub fn write_jsonl<W: io::Write>(&self, mut writer: W) -> io::Result<()> {
        for event in &self.events {
            let line = serde_json::to_string(event)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\n")?;
        }
        Ok(())
    }
}
