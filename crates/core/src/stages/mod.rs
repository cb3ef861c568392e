//! # Pipeline Stages
//!
//! One module per reasoning stage. Each stage owns its typed payload,
//! its instruction template (embedded markdown), its context builder,
//! and its parse-and-validate entry point. The orchestrator threads
//! their artifacts in a fixed order:
//!
//! lookup → compliance-validate → risk-assess → recommend → report → evaluate
//!
//! Upstream artifacts travel as the structured context payload of each
//! reasoning call; they are never spliced into instruction text.

pub mod compliance;
pub mod evaluate;
pub mod recommend;
pub mod reporting;
pub mod risk;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// Re-exports for convenience
pub use compliance::ComplianceFinding;
pub use evaluate::EvaluationResult;
pub use recommend::{Priority, Recommendation};
pub use reporting::ComplianceReport;
pub use risk::{RiskFinding, Severity};

/// Name of a pipeline stage, in fixed execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageName {
    Lookup,
    ComplianceValidate,
    RiskAssess,
    Recommend,
    Report,
    Evaluate,
}

impl StageName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::Lookup => "lookup",
            StageName::ComplianceValidate => "compliance-validate",
            StageName::RiskAssess => "risk-assess",
            StageName::Recommend => "recommend",
            StageName::Report => "report",
            StageName::Evaluate => "evaluate",
        }
    }
}

impl std::fmt::Display for StageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One call to the reasoning service: the stage's task description plus
/// the serialized upstream artifacts as a structured context payload.
#[derive(Debug, Clone, Serialize)]
pub struct StageTask {
    pub stage: StageName,
    pub instruction: String,
    pub context: serde_json::Value,
}

impl StageTask {
    pub fn new(stage: StageName, instruction: String, context: serde_json::Value) -> Self {
        Self {
            stage,
            instruction,
            context,
        }
    }
}

/// Validation status of a stage artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    Valid,
    Invalid,
}

/// The unit passed along the pipeline: every stage output is wrapped in
/// one of these before being handed forward.
#[derive(Debug, Clone, Serialize)]
pub struct StageArtifact {
    pub stage: StageName,
    /// Raw text response the payload was recovered from
    pub raw: String,
    /// Parsed structured value, when extraction succeeded
    pub value: Option<serde_json::Value>,
    pub status: ArtifactStatus,
}

impl StageArtifact {
    /// A validated artifact
    pub fn valid(stage: StageName, raw: String, value: serde_json::Value) -> Self {
        Self {
            stage,
            raw,
            value: Some(value),
            status: ArtifactStatus::Valid,
        }
    }

    /// A failed artifact; the raw text is kept for diagnostics
    pub fn invalid(stage: StageName, raw: String) -> Self {
        Self {
            stage,
            raw,
            value: None,
            status: ArtifactStatus::Invalid,
        }
    }
}

/// Append the JSON schema of the expected payload to a stage instruction
/// so the reasoning service knows the exact output contract.
pub(crate) fn instruction_with_schema<T: JsonSchema>(base: &str) -> String {
    let schema = schemars::schema_for!(T);
    let rendered = serde_json::to_string_pretty(&schema).unwrap_or_default();
    format!(
        "{}\n\nThe response must contain a single JSON value matching this schema:\n{}",
        base.trim_end(),
        rendered
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_name_wire_format() {
        assert_eq!(
            serde_json::to_string(&StageName::ComplianceValidate).unwrap(),
            "\"compliance-validate\""
        );
        assert_eq!(StageName::RiskAssess.to_string(), "risk-assess");
    }

    #[test]
    fn test_artifact_constructors() {
        let ok = StageArtifact::valid(
            StageName::Lookup,
            "[]".to_string(),
            serde_json::json!([]),
        );
        assert_eq!(ok.status, ArtifactStatus::Valid);
        assert!(ok.value.is_some());

        let bad = StageArtifact::invalid(StageName::Report, "garbage".to_string());
        assert_eq!(bad.status, ArtifactStatus::Invalid);
        assert_eq!(bad.raw, "garbage");
        assert!(bad.value.is_none());
    }

    #[test]
    fn test_instruction_with_schema_embeds_contract() {
        let instruction = instruction_with_schema::<Vec<ComplianceFinding>>("Check compliance.");
        assert!(instruction.starts_with("Check compliance."));
        assert!(instruction.contains("applicationId"));
        assert!(instruction.contains("isCompliant"));
    }
}
