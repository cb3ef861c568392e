//! # Reasoning Adapter
//!
//! Wraps a [`ReasoningClient`] with the retry policy for transient
//! failures. Transient errors are retried with exponential backoff up to
//! the attempt budget; non-transient errors fail immediately. Both the
//! in-flight call and the backoff sleep race the run's cancellation
//! token.

use crate::error::PipelineError;
use crate::models::{ReasoningConfig, RetryPolicy};
use crate::reasoning::cancel::CancelToken;
use crate::reasoning::client::{HttpReasoningClient, ReasoningClient};
use crate::stages::StageTask;
use std::sync::Arc;

pub struct ReasoningAdapter {
    client: Arc<dyn ReasoningClient>,
    policy: RetryPolicy,
}

impl ReasoningAdapter {
    /// Wrap an arbitrary client (e.g., a stub in tests)
    pub fn new(client: Arc<dyn ReasoningClient>, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// HTTP adapter from a reasoning config
    pub fn http(config: &ReasoningConfig) -> anyhow::Result<Self> {
        let client = HttpReasoningClient::new(config)?;
        Ok(Self::new(Arc::new(client), config.retry.clone()))
    }

    /// Send a stage task, retrying transient failures per the policy.
    ///
    /// Returns the raw response text; the adapter never interprets it.
    pub async fn invoke(
        &self,
        task: &StageTask,
        cancel: &CancelToken,
    ) -> Result<String, PipelineError> {
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled { stage: task.stage });
            }
            attempt += 1;

            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(PipelineError::Cancelled { stage: task.stage });
                }
                result = self.client.complete(task) => result,
            };

            match result {
                Ok(text) => {
                    if attempt > 1 {
                        tracing::debug!(stage = %task.stage, attempt, "reasoning call recovered");
                    }
                    return Ok(text);
                }
                Err(err) if err.transient && attempt <= self.policy.max_retries => {
                    let delay = self.policy.delay_for(attempt);
                    tracing::warn!(
                        stage = %task.stage,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient reasoning failure, backing off"
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            return Err(PipelineError::Cancelled { stage: task.stage });
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(err) => {
                    return Err(PipelineError::ServiceUnavailable {
                        stage: task.stage,
                        attempts: attempt,
                        source: err,
                    });
                }
            }
        }
    }
}
