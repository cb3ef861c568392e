//! # Recommendation Stage
//!
//! Fourth pipeline stage. Turns each identified risk into a single
//! actionable remediation item with an implementation priority.

use crate::error::ExtractError;
use crate::reasoning::extract::{self, ExpectedShape};
use crate::stages::risk::RiskFinding;
use crate::stages::{instruction_with_schema, StageName, StageTask};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

const INSTRUCTION: &str = include_str!("defaults/recommend.md");

/// Implementation priority of a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// One remediation item tied to an identified risk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Recommendation {
    /// The originating risk description
    pub risk: String,
    /// Action-verb-led remediation text
    pub recommendation: String,
    pub priority: Priority,
}

impl Recommendation {
    pub fn validate(&self) -> Result<(), String> {
        if self.recommendation.trim().is_empty() {
            return Err("recommendation text is empty".to_string());
        }
        if self.risk.trim().is_empty() {
            return Err("recommendation does not reference its originating risk".to_string());
        }
        Ok(())
    }
}

/// Build the reasoning task for this stage from the assessed risks.
pub fn task(risks: &[RiskFinding]) -> StageTask {
    StageTask::new(
        StageName::Recommend,
        instruction_with_schema::<Vec<Recommendation>>(INSTRUCTION),
        json!({ "identifiedRisks": risks }),
    )
}

/// Extract and validate the stage payload from raw response text.
pub fn parse(raw: &str) -> Result<Vec<Recommendation>, ExtractError> {
    let value = extract::extract(raw, ExpectedShape::Array)?;
    let recommendations: Vec<Recommendation> = extract::decode(&value)?;
    for recommendation in &recommendations {
        recommendation.validate().map_err(ExtractError::new)?;
    }
    Ok(recommendations)
}
