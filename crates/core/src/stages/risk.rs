//! # Risk Assessment Stage
//!
//! Third pipeline stage. Consumes the non-compliant subset of the
//! compliance findings and produces one [`RiskFinding`] per application.

use crate::error::ExtractError;
use crate::reasoning::extract::{self, ExpectedShape};
use crate::stages::compliance::ComplianceFinding;
use crate::stages::{instruction_with_schema, StageName, StageTask};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

const INSTRUCTION: &str = include_str!("defaults/risk.md");

/// Severity of a risk
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// A risk attached to a non-compliant application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RiskFinding {
    #[serde(rename = "applicationId")]
    pub application_id: u32,
    #[serde(rename = "appName")]
    pub app_name: String,
    /// Free-text description of the primary risk
    pub risk: String,
    pub severity: Severity,
}

impl RiskFinding {
    pub fn validate(&self) -> Result<(), String> {
        if self.risk.trim().is_empty() {
            return Err(format!(
                "risk for application {} has an empty description",
                self.application_id
            ));
        }
        Ok(())
    }
}

/// Build the reasoning task for this stage from the upstream findings.
/// Only the non-compliant subset travels in the context.
pub fn task(findings: &[ComplianceFinding]) -> StageTask {
    let non_compliant: Vec<&ComplianceFinding> =
        findings.iter().filter(|f| !f.is_compliant).collect();
    StageTask::new(
        StageName::RiskAssess,
        instruction_with_schema::<Vec<RiskFinding>>(INSTRUCTION),
        json!({ "nonCompliantApplications": non_compliant }),
    )
}

/// Extract and validate the stage payload from raw response text.
pub fn parse(raw: &str) -> Result<Vec<RiskFinding>, ExtractError> {
    let value = extract::extract(raw, ExpectedShape::Array)?;
    let risks: Vec<RiskFinding> = extract::decode(&value)?;
    for risk in &risks {
        risk.validate().map_err(ExtractError::new)?;
    }
    Ok(risks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(id: u32, compliant: bool) -> ComplianceFinding {
        ComplianceFinding {
            application_id: id,
            app_name: format!("App {}", id),
            is_compliant: compliant,
            reason: (!compliant).then(|| "rule failed".to_string()),
        }
    }

    #[test]
    fn test_task_keeps_only_non_compliant_findings() {
        let task = task(&[finding(1, true), finding(2, false), finding(3, false)]);
        let apps = task.context["nonCompliantApplications"].as_array().unwrap();
        assert_eq!(apps.len(), 2);
        assert_eq!(apps[0]["applicationId"], json!(2));
    }

    #[test]
    fn test_parse_severity_wire_format() {
        let raw = r#"[{"applicationId": 3, "appName": "PCI Feature Dev", "risk": "Cardholder data exposed outside certified controls", "severity": "Critical"}]"#;
        let risks = parse(raw).unwrap();
        assert_eq!(risks[0].severity, Severity::Critical);
    }

    #[test]
    fn test_parse_rejects_unknown_severity() {
        let raw = r#"[{"applicationId": 3, "appName": "X", "risk": "r", "severity": "Severe"}]"#;
        assert!(parse(raw).unwrap_err().reason.contains("schema"));
    }

    #[test]
    fn test_parse_rejects_empty_risk_description() {
        let raw = r#"[{"applicationId": 3, "appName": "X", "risk": "  ", "severity": "Low"}]"#;
        assert!(parse(raw).unwrap_err().reason.contains("empty"));
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::Medium > Severity::Low);
    }
}
