//! # Report Assembler
//!
//! Merges the final stage artifacts into the single object returned to
//! the caller. Pure merge; no retries, no further validation. This is
//! the only component that formats output.

use crate::stages::{
    ComplianceFinding, ComplianceReport, EvaluationResult, Recommendation, RiskFinding,
};
use serde::{Deserialize, Serialize};

/// The consolidated governance report returned by a successful run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceReport {
    pub findings: Vec<ComplianceFinding>,
    pub risks: Vec<RiskFinding>,
    pub recommendations: Vec<Recommendation>,
    pub report: ComplianceReport,
    pub evaluation: EvaluationResult,
}

/// Merge the accumulated typed payloads into the final output object.
pub fn assemble(
    findings: Vec<ComplianceFinding>,
    risks: Vec<RiskFinding>,
    recommendations: Vec<Recommendation>,
    report: ComplianceReport,
    evaluation: EvaluationResult,
) -> GovernanceReport {
    GovernanceReport {
        findings,
        risks,
        recommendations,
        report,
        evaluation,
    }
}

impl GovernanceReport {
    /// Pretty-printed JSON for display
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_preserves_payloads() {
        let report = assemble(
            vec![ComplianceFinding {
                application_id: 3,
                app_name: "PCI Feature Dev".to_string(),
                is_compliant: false,
                reason: Some("PCI in sandbox".to_string()),
            }],
            vec![],
            vec![],
            ComplianceReport {
                summary: "1 violation".to_string(),
                action_items: vec!["Migrate PCI Feature Dev".to_string()],
            },
            EvaluationResult {
                score: 90,
                feedback: "complete".to_string(),
            },
        );

        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.evaluation.score, 90);

        let json = report.to_pretty_json();
        assert!(json.contains("\"applicationId\": 3"));
        assert!(json.contains("\"actionItems\""));
    }
}
