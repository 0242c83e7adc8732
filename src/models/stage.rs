//! Stage and case-type vocabularies
//!
//! The stage vocabulary is ordered: a case normally moves forward through
//! the list, and the transition tables are expressed over it. The terminal
//! set is `{SETTLEMENT, FINAL DISPOSAL}` - sampling a transition into either
//! disposes the case.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Position in the case lifecycle.
///
/// Variants are listed in canonical order; `index()` exposes that order for
/// feature extraction and for building default transition tails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    PreAdmission,
    Admission,
    FramingOfCharges,
    Evidence,
    Arguments,
    InterlocutoryApplication,
    Settlement,
    OrdersJudgment,
    FinalDisposal,
}

impl Stage {
    /// All stages in canonical order.
    pub const ALL: [Stage; 9] = [
        Stage::PreAdmission,
        Stage::Admission,
        Stage::FramingOfCharges,
        Stage::Evidence,
        Stage::Arguments,
        Stage::InterlocutoryApplication,
        Stage::Settlement,
        Stage::OrdersJudgment,
        Stage::FinalDisposal,
    ];

    /// Zero-based position in the canonical order.
    pub fn index(self) -> usize {
        Stage::ALL
            .iter()
            .position(|s| *s == self)
            .unwrap_or(Stage::ALL.len() - 1)
    }

    /// Terminal stages: reaching one disposes the case and no further
    /// transitions are defined from it.
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Settlement | Stage::FinalDisposal)
    }

    /// Advanced stages indicate the case is in substantive judicial work.
    pub fn is_advanced(self) -> bool {
        matches!(self, Stage::Evidence | Stage::Arguments | Stage::OrdersJudgment)
    }

    /// Stages strictly after this one in canonical order.
    ///
    /// Used to build the documented default transition distribution when a
    /// `(stage, case_type)` pair is missing from the tables.
    pub fn successors(self) -> Vec<Stage> {
        let idx = self.index();
        Stage::ALL[idx + 1..].to_vec()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::PreAdmission => "PRE-ADMISSION",
            Stage::Admission => "ADMISSION",
            Stage::FramingOfCharges => "FRAMING OF CHARGES",
            Stage::Evidence => "EVIDENCE",
            Stage::Arguments => "ARGUMENTS",
            Stage::InterlocutoryApplication => "INTERLOCUTORY APPLICATION",
            Stage::Settlement => "SETTLEMENT",
            Stage::OrdersJudgment => "ORDERS / JUDGMENT",
            Stage::FinalDisposal => "FINAL DISPOSAL",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PRE-ADMISSION" | "PRE ADMISSION" => Ok(Stage::PreAdmission),
            "ADMISSION" => Ok(Stage::Admission),
            "FRAMING OF CHARGES" => Ok(Stage::FramingOfCharges),
            "EVIDENCE" => Ok(Stage::Evidence),
            "ARGUMENTS" => Ok(Stage::Arguments),
            "INTERLOCUTORY APPLICATION" => Ok(Stage::InterlocutoryApplication),
            "SETTLEMENT" => Ok(Stage::Settlement),
            "ORDERS / JUDGMENT" | "ORDERS/JUDGMENT" | "ORDERS" => Ok(Stage::OrdersJudgment),
            "FINAL DISPOSAL" => Ok(Stage::FinalDisposal),
            other => Err(format!("Unknown stage: '{}'", other)),
        }
    }
}

/// Categorical code for a civil case class.
///
/// Drives the transition and adjournment table lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CaseType {
    /// Civil Revision Petition
    Crp,
    /// Civil Appeal
    Ca,
    /// Regular Second Appeal
    Rsa,
    /// Regular First Appeal
    Rfa,
    /// Civil Contempt Petition
    Ccc,
    /// Civil Petition
    Cp,
    /// Civil Miscellaneous Petition
    Cmp,
}

impl CaseType {
    /// All case types.
    pub const ALL: [CaseType; 7] = [
        CaseType::Crp,
        CaseType::Ca,
        CaseType::Rsa,
        CaseType::Rfa,
        CaseType::Ccc,
        CaseType::Cp,
        CaseType::Cmp,
    ];
}

impl fmt::Display for CaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            CaseType::Crp => "CRP",
            CaseType::Ca => "CA",
            CaseType::Rsa => "RSA",
            CaseType::Rfa => "RFA",
            CaseType::Ccc => "CCC",
            CaseType::Cp => "CP",
            CaseType::Cmp => "CMP",
        };
        write!(f, "{}", code)
    }
}

impl FromStr for CaseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CRP" => Ok(CaseType::Crp),
            "CA" => Ok(CaseType::Ca),
            "RSA" => Ok(CaseType::Rsa),
            "RFA" => Ok(CaseType::Rfa),
            "CCC" => Ok(CaseType::Ccc),
            "CP" => Ok(CaseType::Cp),
            "CMP" => Ok(CaseType::Cmp),
            other => Err(format!("Unknown case type: '{}'", other)),
        }
    }
}
