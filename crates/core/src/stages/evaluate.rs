//! # Evaluation Stage
//!
//! Final pipeline stage. Scores the generated report against the risks
//! it was built from.

use crate::error::ExtractError;
use crate::reasoning::extract::{self, ExpectedShape};
use crate::stages::reporting::ComplianceReport;
use crate::stages::risk::RiskFinding;
use crate::stages::{instruction_with_schema, StageName, StageTask};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

const INSTRUCTION: &str = include_str!("defaults/evaluate.md");

/// Quality assessment of the generated report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EvaluationResult {
    /// 1-100
    pub score: u8,
    pub feedback: String,
}

impl EvaluationResult {
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=100).contains(&self.score) {
            return Err(format!("score {} is outside 1-100", self.score));
        }
        Ok(())
    }
}

/// Build the reasoning task for this stage.
pub fn task(report: &ComplianceReport, risks: &[RiskFinding]) -> StageTask {
    StageTask::new(
        StageName::Evaluate,
        instruction_with_schema::<EvaluationResult>(INSTRUCTION),
        json!({ "report": report, "risks": risks }),
    )
}

/// Extract and validate the stage payload from raw response text.
pub fn parse(raw: &str) -> Result<EvaluationResult, ExtractError> {
    let value = extract::extract(raw, ExpectedShape::Object)?;
    let evaluation: EvaluationResult = extract::decode(&value)?;
    evaluation.validate().map_err(ExtractError::new)?;
    Ok(evaluation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_valid_score() {
        let raw = r#"{"score": 85, "feedback": "Action items cover every high-priority risk."}"#;
        let evaluation = parse(raw).unwrap();
        assert_eq!(evaluation.score, 85);
    }

    #[test]
    fn test_parse_rejects_out_of_range_score() {
        assert!(parse(r#"{"score": 0, "feedback": "f"}"#)
            .unwrap_err()
            .reason
            .contains("outside"));
        assert!(parse(r#"{"score": 250, "feedback": "f"}"#).is_err());
    }

    #[test]
    fn test_task_context_carries_report_and_risks() {
        let report = ComplianceReport {
            summary: "ok".to_string(),
            action_items: vec![],
        };
        let task = task(&report, &[]);
        assert_eq!(task.stage, StageName::Evaluate);
        assert_eq!(task.context["report"]["summary"], json!("ok"));
    }
}
