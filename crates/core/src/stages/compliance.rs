//! # Compliance Validation Stage
//!
//! Second pipeline stage. Consumes the catalog lookup artifact and
//! produces one [`ComplianceFinding`] per application. The three
//! governance rules are policy constants evaluated here, not derived
//! from any external document at runtime; the deterministic assessment
//! travels in the stage context so the reasoning output stays grounded.

use crate::catalog::{ApplicationRecord, DeploymentEnv, Obligation};
use crate::error::ExtractError;
use crate::reasoning::extract::{self, ExpectedShape};
use crate::stages::{instruction_with_schema, StageName, StageTask};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

const INSTRUCTION: &str = include_str!("defaults/compliance.md");

/// Compliance status of one application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ComplianceFinding {
    #[serde(rename = "applicationId")]
    pub application_id: u32,
    #[serde(rename = "appName")]
    pub app_name: String,
    #[serde(rename = "isCompliant")]
    pub is_compliant: bool,
    /// Rule citation; present iff non-compliant
    #[serde(default)]
    pub reason: Option<String>,
}

impl ComplianceFinding {
    /// Field-level contract: reason present iff non-compliant.
    pub fn validate(&self) -> Result<(), String> {
        match (&self.is_compliant, &self.reason) {
            (true, Some(_)) => Err(format!(
                "finding for application {} is compliant but carries a reason",
                self.application_id
            )),
            (false, None) => Err(format!(
                "finding for application {} is non-compliant but has no reason",
                self.application_id
            )),
            (false, Some(reason)) if reason.trim().is_empty() => Err(format!(
                "finding for application {} has an empty reason",
                self.application_id
            )),
            _ => Ok(()),
        }
    }
}

/// Apply the governance rules to one record. Returns the violation
/// reason, or `None` when the record is compliant.
pub fn rule_violation(record: &ApplicationRecord) -> Option<String> {
    if record.has_obligation(Obligation::Pci)
        && matches!(
            record.deployment,
            DeploymentEnv::Sandbox | DeploymentEnv::Qa
        )
    {
        return Some(format!(
            "Subject to PCI compliance but deployed in the '{}' environment",
            record.deployment
        ));
    }
    if record.has_obligation(Obligation::Gdpr)
        && record.users > 10_000
        && record.deployment == DeploymentEnv::Uat
    {
        return Some(format!(
            "Subject to GDPR compliance with {} users in the 'uat' environment",
            record.users
        ));
    }
    if record.has_obligation(Obligation::Soc2) && record.deployment == DeploymentEnv::Sandbox {
        return Some(
            "Subject to SOC2 compliance but deployed in the 'sandbox' environment".to_string(),
        );
    }
    None
}

/// Deterministic findings for a record set, in catalog order.
pub fn evaluate_rules(records: &[ApplicationRecord]) -> Vec<ComplianceFinding> {
    records
        .iter()
        .map(|record| {
            let reason = rule_violation(record);
            ComplianceFinding {
                application_id: record.id,
                app_name: record.name.clone(),
                is_compliant: reason.is_none(),
                reason,
            }
        })
        .collect()
}

/// Build the reasoning task for this stage.
pub fn task(records: &[ApplicationRecord]) -> StageTask {
    StageTask::new(
        StageName::ComplianceValidate,
        instruction_with_schema::<Vec<ComplianceFinding>>(INSTRUCTION),
        json!({
            "applications": records,
            "policyAssessment": evaluate_rules(records),
        }),
    )
}

/// Extract and validate the stage payload from raw response text.
pub fn parse(raw: &str) -> Result<Vec<ComplianceFinding>, ExtractError> {
    let value = extract::extract(raw, ExpectedShape::Array)?;
    let findings: Vec<ComplianceFinding> = extract::decode(&value)?;
    for finding in &findings {
        finding.validate().map_err(ExtractError::new)?;
    }
    Ok(findings)
}
