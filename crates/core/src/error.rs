//! # Error Taxonomy
//!
//! Typed failures for the governance pipeline. Transient service errors
//! are retried inside the reasoning adapter and never surface past it
//! unless the attempt budget is exhausted; everything else propagates to
//! the orchestrator, which aborts the run and preserves diagnostics.

use crate::stages::StageName;
use thiserror::Error;

/// A single failed call to the reasoning service.
#[derive(Debug, Clone, Error)]
#[error("reasoning service error: {message}")]
pub struct ServiceError {
    /// HTTP status code, if the failure came from a response
    pub status: Option<u16>,
    /// Whether the retry policy classifies this failure as retryable
    pub transient: bool,
    pub message: String,
}

impl ServiceError {
    /// Transport-level failure (timeout, connect). Always transient.
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            transient: true,
            message: message.into(),
        }
    }

    /// Failure derived from an HTTP status code.
    pub fn status(status: u16, transient: bool, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            transient,
            message: message.into(),
        }
    }

    /// Permanent failure with no status code (e.g., unparseable response body).
    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            status: None,
            transient: false,
            message: message.into(),
        }
    }
}

/// A stage response that could not be turned into a structured payload.
///
/// The raw text is attached by the orchestrator when it records the
/// failure; the extractor only knows the reason.
#[derive(Debug, Clone, Error)]
#[error("{reason}")]
pub struct ExtractError {
    pub reason: String,
}

impl ExtractError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Fatal pipeline failures. Any of these aborts the run at the
/// orchestrator; artifacts accumulated before the failure stay available.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Retry budget exhausted, or a non-transient service failure
    #[error("reasoning service unavailable at stage '{stage}' after {attempts} attempt(s): {source}")]
    ServiceUnavailable {
        stage: StageName,
        attempts: u32,
        #[source]
        source: ServiceError,
    },

    /// A stage response failed extraction or schema validation
    #[error("stage '{stage}' returned malformed output: {reason}")]
    MalformedOutput {
        stage: StageName,
        raw: String,
        reason: String,
    },

    /// A cross-stage invariant failed (e.g., a finding references an
    /// application id absent from the catalog snapshot)
    #[error("contract violation at stage '{stage}': {detail}")]
    ContractViolation { stage: StageName, detail: String },

    /// The run-scoped cancellation signal fired
    #[error("run cancelled during stage '{stage}'")]
    Cancelled { stage: StageName },
}

impl PipelineError {
    /// Stage at which the run failed
    pub fn stage(&self) -> StageName {
        match self {
            PipelineError::ServiceUnavailable { stage, .. }
            | PipelineError::MalformedOutput { stage, .. }
            | PipelineError::ContractViolation { stage, .. }
            | PipelineError::Cancelled { stage } => *stage,
        }
    }

    /// Raw offending text, when the failure preserved one
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            PipelineError::MalformedOutput { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_classification() {
        assert!(ServiceError::transport("timed out").transient);
        assert!(!ServiceError::permanent("bad body").transient);
        let err = ServiceError::status(429, true, "rate limited");
        assert_eq!(err.status, Some(429));
        assert!(err.transient);
    }

    #[test]
    fn test_pipeline_error_accessors() {
        let err = PipelineError::MalformedOutput {
            stage: StageName::RiskAssess,
            raw: "not json".to_string(),
            reason: "no JSON array found".to_string(),
        };
        assert_eq!(err.stage(), StageName::RiskAssess);
        assert_eq!(err.raw_output(), Some("not json"));

        let err = PipelineError::Cancelled {
            stage: StageName::Report,
        };
        assert!(err.raw_output().is_none());
        assert!(err.to_string().contains("report"));
    }
}
