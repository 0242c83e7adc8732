//! Domain types: cases, hearings, courtrooms, vocabularies, and events.

pub mod case;
pub mod courtroom;
pub mod event;
pub mod hearing;
pub mod pool;
pub mod stage;

pub use case::{Case, CaseError, CaseIntake, CaseStatus, PriorityWeights, RipenessState};
pub use courtroom::Courtroom;
pub use event::{Event, EventLog};
pub use hearing::{HearingOutcome, HearingRecord};
pub use pool::{CasePool, PoolError};
pub use stage::{CaseType, Stage};
