//! # Run Events
//!
//! Event types emitted while a pipeline run progresses. Consumers can
//! mirror them over a channel for live display; the orchestrator also
//! keeps them in the run summary.

use crate::stages::StageName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of run event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunEventKind {
    /// Run started
    RunStarted,
    /// A stage began working
    StageStarted,
    /// A stage produced a validated artifact
    StageCompleted,
    /// A stage failed; the run is aborting
    StageFailed,
    /// Run finished with a full report
    RunCompleted,
    /// Run aborted before completion
    RunAborted,
}

/// An event in a pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEvent {
    /// Unique event ID
    pub id: String,
    /// Timestamp
    pub timestamp: DateTime<Utc>,
    /// Kind of event
    pub kind: RunEventKind,
    /// Stage the event relates to, if any
    #[serde(default)]
    pub stage: Option<StageName>,
    /// Associated data (JSON)
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl RunEvent {
    /// Create a new event
    pub fn new(kind: RunEventKind) -> Self {
        Self {
            id: event_id(),
            timestamp: Utc::now(),
            kind,
            stage: None,
            data: None,
        }
    }

    /// Attach the stage this event relates to
    pub fn with_stage(mut self, stage: StageName) -> Self {
        self.stage = Some(stage);
        self
    }

    /// Add data to the event
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Generate a simple unique event id
fn event_id() -> String {
    use std::time::{Duration, SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_nanos();
    format!("{:x}-{:x}", nanos, rand_u32())
}

/// Simple random number (not cryptographic)
fn rand_u32() -> u32 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};
    RandomState::new().build_hasher().finish() as u32
}
