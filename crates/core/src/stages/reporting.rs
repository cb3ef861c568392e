//! # Report Stage
//!
//! Fifth pipeline stage. Consolidates the accumulated findings, risks
//! and recommendations into a [`ComplianceReport`]: a summary plus an
//! ordered list of action items.

use crate::error::ExtractError;
use crate::reasoning::extract::{self, ExpectedShape};
use crate::stages::compliance::ComplianceFinding;
use crate::stages::recommend::Recommendation;
use crate::stages::risk::RiskFinding;
use crate::stages::{instruction_with_schema, StageName, StageTask};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

const INSTRUCTION: &str = include_str!("defaults/reporting.md");

/// The consolidated compliance report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ComplianceReport {
    pub summary: String,
    #[serde(rename = "actionItems")]
    pub action_items: Vec<String>,
}

impl ComplianceReport {
    pub fn validate(&self) -> Result<(), String> {
        if self.summary.trim().is_empty() {
            return Err("report summary is empty".to_string());
        }
        Ok(())
    }
}

/// Build the reasoning task for this stage from all prior artifacts.
/// Only the non-compliant findings travel as violations.
pub fn task(
    findings: &[ComplianceFinding],
    risks: &[RiskFinding],
    recommendations: &[Recommendation],
) -> StageTask {
    let violations: Vec<&ComplianceFinding> =
        findings.iter().filter(|f| !f.is_compliant).collect();
    StageTask::new(
        StageName::Report,
        instruction_with_schema::<ComplianceReport>(INSTRUCTION),
        json!({
            "violations": violations,
            "risks": risks,
            "recommendations": recommendations,
        }),
    )
}

/// Extract and validate the stage payload from raw response text.
pub fn parse(raw: &str) -> Result<ComplianceReport, ExtractError> {
    let value = extract::extract(raw, ExpectedShape::Object)?;
    let report: ComplianceReport = extract::decode(&value)?;
    report.validate().map_err(ExtractError::new)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_filters_compliant_findings() {
        let findings = vec![
            ComplianceFinding {
                application_id: 1,
                app_name: "A".to_string(),
                is_compliant: true,
                reason: None,
            },
            ComplianceFinding {
                application_id: 2,
                app_name: "B".to_string(),
                is_compliant: false,
                reason: Some("rule failed".to_string()),
            },
        ];
        let task = task(&findings, &[], &[]);
        assert_eq!(task.context["violations"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_parse_expects_object() {
        let raw = "```json\n{\"summary\": \"3 of 5 applications non-compliant\", \"actionItems\": [\"Migrate PCI Feature Dev out of sandbox\"]}\n```";
        let report = parse(raw).unwrap();
        assert_eq!(report.action_items.len(), 1);

        assert!(parse("[]").is_err());
    }

    #[test]
    fn test_parse_rejects_empty_summary() {
        let raw = r#"{"summary": "", "actionItems": []}"#;
        assert!(parse(raw).unwrap_err().reason.contains("summary"));
    }
}
