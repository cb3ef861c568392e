//! # Pipeline Orchestrator
//!
//! Drives the fixed stage sequence from catalog lookup to report
//! evaluation. Each transition builds context from all prior validated
//! artifacts, calls the reasoning adapter, extracts and validates the
//! typed payload, and appends the artifact to the run's accumulated
//! state. Any fatal failure aborts the run and preserves everything
//! accumulated so far.

use crate::catalog::{ApplicationRecord, Catalog, LookupOutcome};
use crate::error::PipelineError;
use crate::pipeline::events::{RunEvent, RunEventKind};
use crate::pipeline::stage::RunStage;
use crate::reasoning::adapter::ReasoningAdapter;
use crate::reasoning::cancel::CancelToken;
use crate::report::{self, GovernanceReport};
use crate::stages::{compliance, evaluate, recommend, reporting, risk};
use crate::stages::{StageArtifact, StageName, StageTask};
use serde::Serialize;
use serde_json::json;
use tokio::sync::mpsc;

/// Record of the stage at which a run failed
#[derive(Debug, Clone, Serialize)]
pub struct StageFailure {
    pub stage: StageName,
    pub reason: String,
    /// Raw offending text, when the failure preserved one
    pub raw: Option<String>,
}

/// Result of one pipeline run
#[derive(Debug, Serialize)]
pub struct RunSummary {
    /// Final state of the run
    pub stage: RunStage,
    /// The consolidated report, on success
    pub report: Option<GovernanceReport>,
    /// Failure record, on abort
    pub failure: Option<StageFailure>,
    /// Artifacts accumulated before completion or failure
    pub artifacts: Vec<StageArtifact>,
    /// Events that occurred
    pub events: Vec<RunEvent>,
    /// Whether the pipeline produced a full report
    pub success: bool,
}

/// The pipeline orchestrator
///
/// One orchestrator drives one run at a time; the catalog and the
/// adapter's client are safely shared, so independent runs can execute
/// concurrently with their own orchestrators.
pub struct Orchestrator {
    catalog: Catalog,
    adapter: ReasoningAdapter,
    stage: RunStage,
    events: Vec<RunEvent>,
    event_tx: Option<mpsc::Sender<RunEvent>>,
    cancel: CancelToken,
}

impl Orchestrator {
    /// Create a new orchestrator over a catalog snapshot
    pub fn new(catalog: Catalog, adapter: ReasoningAdapter) -> Self {
        Self {
            catalog,
            adapter,
            stage: RunStage::Lookup,
            events: Vec::new(),
            event_tx: None,
            cancel: CancelToken::inert(),
        }
    }

    /// Set event channel for streaming run events
    pub fn with_event_channel(mut self, tx: mpsc::Sender<RunEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Attach a run-scoped cancellation token
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Current state of the run
    pub fn stage(&self) -> RunStage {
        self.stage
    }

    /// Emit an event
    async fn emit(&mut self, event: RunEvent) {
        self.events.push(event.clone());
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event).await;
        }
    }

    /// Dispatch one reasoning call for a stage
    async fn dispatch(&mut self, task: &StageTask) -> Result<String, PipelineError> {
        self.emit(RunEvent::new(RunEventKind::StageStarted).with_stage(task.stage))
            .await;
        self.adapter.invoke(task, &self.cancel).await
    }

    /// Record a validated artifact and advance the state machine
    async fn complete_stage(
        &mut self,
        artifacts: &mut Vec<StageArtifact>,
        stage: StageName,
        raw: String,
        value: serde_json::Value,
        data: serde_json::Value,
    ) {
        artifacts.push(StageArtifact::valid(stage, raw, value));
        self.emit(
            RunEvent::new(RunEventKind::StageCompleted)
                .with_stage(stage)
                .with_data(data),
        )
        .await;
        self.stage = self.stage.next();
    }

    /// Every finding must reference an id present in the catalog snapshot
    fn check_ids<'a>(
        &self,
        stage: StageName,
        ids: impl Iterator<Item = &'a u32>,
    ) -> Result<(), PipelineError> {
        for id in ids {
            if !self.catalog.contains_id(*id) {
                return Err(PipelineError::ContractViolation {
                    stage,
                    detail: format!("finding references unknown application id {}", id),
                });
            }
        }
        Ok(())
    }

    /// Run the pipeline against a catalog query ("all" or an application
    /// name). All failures are captured in the returned summary.
    #[tracing::instrument(skip(self), fields(query = %query))]
    pub async fn run(&mut self, query: &str) -> RunSummary {
        self.emit(RunEvent::new(RunEventKind::RunStarted).with_data(json!({ "query": query })))
            .await;

        let mut artifacts = Vec::new();
        match self.drive(query, &mut artifacts).await {
            Ok(report) => {
                self.emit(RunEvent::new(RunEventKind::RunCompleted)).await;
                tracing::info!(findings = report.findings.len(), "pipeline run complete");
                RunSummary {
                    stage: self.stage,
                    report: Some(report),
                    failure: None,
                    artifacts,
                    events: self.events.clone(),
                    success: true,
                }
            }
            Err(err) => {
                let failure = StageFailure {
                    stage: err.stage(),
                    reason: err.to_string(),
                    raw: err.raw_output().map(str::to_string),
                };
                // Keep the offending text available next to the artifacts
                if let PipelineError::MalformedOutput { stage, raw, .. } = &err {
                    artifacts.push(StageArtifact::invalid(*stage, raw.clone()));
                }
                tracing::error!(stage = %failure.stage, "pipeline run aborted: {}", failure.reason);
                self.stage = RunStage::Aborted;
                self.emit(
                    RunEvent::new(RunEventKind::StageFailed)
                        .with_stage(failure.stage)
                        .with_data(json!({ "reason": failure.reason })),
                )
                .await;
                self.emit(RunEvent::new(RunEventKind::RunAborted)).await;
                RunSummary {
                    stage: RunStage::Aborted,
                    report: None,
                    failure: Some(failure),
                    artifacts,
                    events: self.events.clone(),
                    success: false,
                }
            }
        }
    }

    /// The forward-only stage sequence. Returns the assembled report or
    /// the first fatal failure.
    async fn drive(
        &mut self,
        query: &str,
        artifacts: &mut Vec<StageArtifact>,
    ) -> Result<GovernanceReport, PipelineError> {
        // Stage: lookup. The only stage that touches the catalog; no
        // reasoning call involved.
        self.emit(RunEvent::new(RunEventKind::StageStarted).with_stage(StageName::Lookup))
            .await;
        if self.cancel.is_cancelled() {
            return Err(PipelineError::Cancelled {
                stage: StageName::Lookup,
            });
        }

        let (records, lookup_value) = match self.catalog.lookup(query) {
            LookupOutcome::All(records) => {
                let value = json!({ "applications": &records });
                (records, value)
            }
            LookupOutcome::Match(record) => {
                let records = vec![record];
                let value = json!({ "applications": &records });
                (records, value)
            }
            LookupOutcome::NotFound {
                requested,
                available,
            } => {
                // A miss is data, not a failure: record it and continue
                // with an empty record set.
                tracing::warn!(requested = %requested, "application not found in catalog");
                let value = json!({
                    "applications": [],
                    "notFound": requested,
                    "available": available,
                });
                (Vec::<ApplicationRecord>::new(), value)
            }
        };

        let raw = serde_json::to_string_pretty(&lookup_value).unwrap_or_default();
        self.complete_stage(
            artifacts,
            StageName::Lookup,
            raw,
            lookup_value,
            json!({ "applications": records.len() }),
        )
        .await;

        // Stage: compliance-validate
        let findings = {
            let task = compliance::task(&records);
            let raw = self.dispatch(&task).await?;
            let findings = compliance::parse(&raw).map_err(|e| PipelineError::MalformedOutput {
                stage: task.stage,
                raw: raw.clone(),
                reason: e.reason,
            })?;
            self.check_ids(task.stage, findings.iter().map(|f| &f.application_id))?;
            let value = serde_json::to_value(&findings).unwrap_or_default();
            let violations = findings.iter().filter(|f| !f.is_compliant).count();
            self.complete_stage(
                artifacts,
                task.stage,
                raw,
                value,
                json!({ "findings": findings.len(), "violations": violations }),
            )
            .await;
            findings
        };

        // Stage: risk-assess
        let risks = {
            let task = risk::task(&findings);
            let raw = self.dispatch(&task).await?;
            let risks = risk::parse(&raw).map_err(|e| PipelineError::MalformedOutput {
                stage: task.stage,
                raw: raw.clone(),
                reason: e.reason,
            })?;
            self.check_ids(task.stage, risks.iter().map(|r| &r.application_id))?;
            let value = serde_json::to_value(&risks).unwrap_or_default();
            self.complete_stage(
                artifacts,
                task.stage,
                raw,
                value,
                json!({ "risks": risks.len() }),
            )
            .await;
            risks
        };

        // Stage: recommend
        let recommendations = {
            let task = recommend::task(&risks);
            let raw = self.dispatch(&task).await?;
            let recommendations =
                recommend::parse(&raw).map_err(|e| PipelineError::MalformedOutput {
                    stage: task.stage,
                    raw: raw.clone(),
                    reason: e.reason,
                })?;
            let value = serde_json::to_value(&recommendations).unwrap_or_default();
            self.complete_stage(
                artifacts,
                task.stage,
                raw,
                value,
                json!({ "recommendations": recommendations.len() }),
            )
            .await;
            recommendations
        };

        // Stage: report
        let compliance_report = {
            let task = reporting::task(&findings, &risks, &recommendations);
            let raw = self.dispatch(&task).await?;
            let report = reporting::parse(&raw).map_err(|e| PipelineError::MalformedOutput {
                stage: task.stage,
                raw: raw.clone(),
                reason: e.reason,
            })?;
            let value = serde_json::to_value(&report).unwrap_or_default();
            self.complete_stage(
                artifacts,
                task.stage,
                raw,
                value,
                json!({ "action_items": report.action_items.len() }),
            )
            .await;
            report
        };

        // Stage: evaluate
        let evaluation = {
            let task = evaluate::task(&compliance_report, &risks);
            let raw = self.dispatch(&task).await?;
            let evaluation = evaluate::parse(&raw).map_err(|e| PipelineError::MalformedOutput {
                stage: task.stage,
                raw: raw.clone(),
                reason: e.reason,
            })?;
            let value = serde_json::to_value(&evaluation).unwrap_or_default();
            self.complete_stage(
                artifacts,
                task.stage,
                raw,
                value,
                json!({ "score": evaluation.score }),
            )
            .await;
            evaluation
        };

        Ok(report::assemble(
            findings,
            risks,
            recommendations,
            compliance_report,
            evaluation,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::models::RetryPolicy;
    use crate::reasoning::client::StubReasoningClient;
    use crate::stages::reporting::ComplianceReport;
    use crate::stages::risk::{RiskFinding, Severity};
    use crate::stages::ArtifactStatus;
    use std::sync::Arc;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            initial_delay_ms: 1,
            ..RetryPolicy::default()
        }
    }

    fn orchestrator(stub: Arc<StubReasoningClient>) -> Orchestrator {
        Orchestrator::new(
            Catalog::builtin(),
            ReasoningAdapter::new(stub, fast_policy()),
        )
    }

    /// Scripted responses for a clean run over the built-in catalog,
    /// wrapped in the variety of framings the service produces.
    fn scripted_responses() -> Vec<Result<String, ServiceError>> {
        let catalog = Catalog::builtin();
        let findings = compliance::evaluate_rules(catalog.records());
        let findings_json = serde_json::to_string(&findings).unwrap();

        let risks: Vec<RiskFinding> = findings
            .iter()
            .filter(|f| !f.is_compliant)
            .map(|f| RiskFinding {
                application_id: f.application_id,
                app_name: f.app_name.clone(),
                risk: format!("Unmitigated exposure: {}", f.reason.clone().unwrap()),
                severity: Severity::High,
            })
            .collect();
        let risks_json = serde_json::to_string(&risks).unwrap();

        let recommendations_json = serde_json::to_string(
            &risks
                .iter()
                .map(|r| crate::stages::Recommendation {
                    risk: r.risk.clone(),
                    recommendation: format!("Migrate '{}' to a compliant environment", r.app_name),
                    priority: crate::stages::Priority::High,
                })
                .collect::<Vec<_>>(),
        )
        .unwrap();

        let report = ComplianceReport {
            summary: "3 of 5 applications are non-compliant".to_string(),
            action_items: risks
                .iter()
                .map(|r| format!("Remediate {}", r.app_name))
                .collect(),
        };
        let report_json = serde_json::to_string(&report).unwrap();

        vec![
            Ok(format!("```json\n{}\n```", findings_json)),
            Ok(format!(
                "Here is the risk assessment you asked for:\n\n{}",
                risks_json
            )),
            Ok(recommendations_json),
            Ok(format!("```\n{}\n```", report_json)),
            Ok(r#"{"score": 92, "feedback": "All high-priority risks have action items."}"#
                .to_string()),
        ]
    }

    #[tokio::test]
    async fn test_full_run_over_builtin_catalog() {
        let stub = Arc::new(StubReasoningClient::new(scripted_responses()));
        let mut orchestrator = orchestrator(stub.clone());

        let summary = orchestrator.run("all").await;

        assert!(summary.success);
        assert_eq!(summary.stage, RunStage::Complete);
        assert!(summary.failure.is_none());
        assert_eq!(summary.artifacts.len(), 6);
        assert_eq!(
            stub.seen_stages(),
            vec![
                StageName::ComplianceValidate,
                StageName::RiskAssess,
                StageName::Recommend,
                StageName::Report,
                StageName::Evaluate,
            ]
        );

        let report = summary.report.unwrap();
        assert_eq!(report.findings.len(), 5);
        let non_compliant: Vec<u32> = report
            .findings
            .iter()
            .filter(|f| !f.is_compliant)
            .map(|f| f.application_id)
            .collect();
        assert_eq!(non_compliant, vec![2, 3, 5]);
        assert_eq!(report.risks.len(), 3);
        assert_eq!(report.recommendations.len(), 3);
        assert_eq!(report.evaluation.score, 92);
    }

    #[tokio::test]
    async fn test_malformed_stage_output_aborts_at_that_stage() {
        let mut responses = scripted_responses();
        responses[1] = Ok("I'm sorry, I cannot produce that assessment.".to_string());
        let stub = Arc::new(StubReasoningClient::new(responses));
        let mut orchestrator = orchestrator(stub);

        let summary = orchestrator.run("all").await;

        assert!(!summary.success);
        assert_eq!(summary.stage, RunStage::Aborted);
        let failure = summary.failure.unwrap();
        assert_eq!(failure.stage, StageName::RiskAssess);
        assert_eq!(
            failure.raw.as_deref(),
            Some("I'm sorry, I cannot produce that assessment.")
        );
        // lookup + validated compliance + the invalid risk artifact
        assert_eq!(summary.artifacts.len(), 3);
        assert_eq!(summary.artifacts[2].status, ArtifactStatus::Invalid);
        assert_eq!(summary.artifacts[2].raw, failure.raw.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_application_id_is_a_contract_violation() {
        let mut responses = scripted_responses();
        responses[0] = Ok(
            r#"[{"applicationId": 99, "appName": "Ghost", "isCompliant": false, "reason": "PCI"}]"#
                .to_string(),
        );
        let stub = Arc::new(StubReasoningClient::new(responses));
        let mut orchestrator = orchestrator(stub.clone());

        let summary = orchestrator.run("all").await;

        assert!(!summary.success);
        let failure = summary.failure.unwrap();
        assert_eq!(failure.stage, StageName::ComplianceValidate);
        assert!(failure.reason.contains("unknown application id 99"));
        // Nothing after the failing stage ran.
        assert_eq!(stub.call_count(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_service_aborts_with_cause() {
        let stub = Arc::new(StubReasoningClient::always_err(
            ServiceError::status(503, true, "unavailable"),
            10,
        ));
        let mut orchestrator = orchestrator(stub.clone());

        let summary = orchestrator.run("all").await;

        assert!(!summary.success);
        let failure = summary.failure.unwrap();
        assert_eq!(failure.stage, StageName::ComplianceValidate);
        assert!(failure.reason.contains("unavailable"));
        // Only the lookup artifact survived.
        assert_eq!(summary.artifacts.len(), 1);
        assert_eq!(summary.artifacts[0].stage, StageName::Lookup);
        assert_eq!(stub.call_count(), 6);
    }

    #[tokio::test]
    async fn test_catalog_miss_is_handled_as_data() {
        let responses = vec![
            Ok("[]".to_string()),
            Ok("[]".to_string()),
            Ok("[]".to_string()),
            Ok(r#"{"summary": "No applications matched the query.", "actionItems": []}"#
                .to_string()),
            Ok(r#"{"score": 60, "feedback": "Nothing to evaluate."}"#.to_string()),
        ];
        let stub = Arc::new(StubReasoningClient::new(responses));
        let mut orchestrator = orchestrator(stub);

        let summary = orchestrator.run("Billing Engine").await;

        assert!(summary.success, "a lookup miss must not abort the run");
        let lookup = &summary.artifacts[0];
        let value = lookup.value.as_ref().unwrap();
        assert_eq!(value["notFound"], json!("Billing Engine"));
        assert_eq!(value["available"].as_array().unwrap().len(), 5);
        assert!(summary.report.unwrap().findings.is_empty());
    }

    #[tokio::test]
    async fn test_single_application_query() {
        let catalog = Catalog::builtin();
        let target = &catalog.records()[2]; // PCI Feature Dev
        let findings = compliance::evaluate_rules(std::slice::from_ref(target));
        let findings_json = serde_json::to_string(&findings).unwrap();

        let responses = vec![
            Ok(findings_json),
            Ok(format!(
                r#"[{{"applicationId": 3, "appName": "{}", "risk": "Cardholder data outside certified controls", "severity": "Critical"}}]"#,
                target.name
            )),
            Ok(r#"[{"risk": "Cardholder data outside certified controls", "recommendation": "Migrate the workload to a PCI-certified environment", "priority": "High"}]"#.to_string()),
            Ok(r#"{"summary": "1 of 1 applications non-compliant", "actionItems": ["Migrate PCI Feature Dev"]}"#.to_string()),
            Ok(r#"{"score": 88, "feedback": "Focused and complete."}"#.to_string()),
        ];
        let stub = Arc::new(StubReasoningClient::new(responses));
        let mut orchestrator = orchestrator(stub);

        let summary = orchestrator.run("pci feature dev").await;

        assert!(summary.success);
        let report = summary.report.unwrap();
        assert_eq!(report.findings.len(), 1);
        assert!(!report.findings[0].is_compliant);
        assert_eq!(report.risks[0].severity, Severity::Critical);
    }
}
