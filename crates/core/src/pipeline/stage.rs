//! # Run State Machine
//!
//! Defines the states of a pipeline run. Transitions are strictly
//! forward; there is no re-entry and no branching by content. `Aborted`
//! is reachable from any non-terminal state.

use crate::stages::StageName;
use serde::{Deserialize, Serialize};

/// State of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    /// Consulting the catalog
    Lookup,
    /// Validating applications against governance rules
    Validating,
    /// Assessing risks for violations
    Assessing,
    /// Generating remediation recommendations
    Recommending,
    /// Consolidating the compliance report
    Reporting,
    /// Scoring the generated report
    Evaluating,
    /// Complete
    Complete,
    /// Aborted
    Aborted,
}

impl RunStage {
    /// Advance to the next state. Terminal states stay put.
    pub fn next(self) -> RunStage {
        match self {
            RunStage::Lookup => RunStage::Validating,
            RunStage::Validating => RunStage::Assessing,
            RunStage::Assessing => RunStage::Recommending,
            RunStage::Recommending => RunStage::Reporting,
            RunStage::Reporting => RunStage::Evaluating,
            RunStage::Evaluating => RunStage::Complete,
            RunStage::Complete => RunStage::Complete,
            RunStage::Aborted => RunStage::Aborted,
        }
    }

    /// Processing stage active in this state, if any
    pub fn stage_name(self) -> Option<StageName> {
        match self {
            RunStage::Lookup => Some(StageName::Lookup),
            RunStage::Validating => Some(StageName::ComplianceValidate),
            RunStage::Assessing => Some(StageName::RiskAssess),
            RunStage::Recommending => Some(StageName::Recommend),
            RunStage::Reporting => Some(StageName::Report),
            RunStage::Evaluating => Some(StageName::Evaluate),
            RunStage::Complete | RunStage::Aborted => None,
        }
    }

    /// Check if the run has finished (successfully or not)
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStage::Complete | RunStage::Aborted)
    }
}
