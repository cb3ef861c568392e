//! # Argus Core
//!
//! The engine of the Argus governance system - evaluates a catalog of
//! applications against compliance rules and produces a consolidated
//! governance report.
//!
//! ## Architecture
//!
//! - `catalog/` - Static application inventory (read-only lookup)
//! - `reasoning/` - External service transport, retry/backoff, contract extraction
//! - `stages/` - Typed stage definitions (payloads, instructions, validation)
//! - `pipeline/` - State machine, events, and the run orchestrator
//! - `report` - Final report assembly
//! - `models` - Reasoning-service configuration
//!
//! ## Usage
//!
//! ```rust,ignore
//! use argus_core::catalog::Catalog;
//! use argus_core::models::ReasoningConfig;
//! use argus_core::pipeline::Orchestrator;
//! use argus_core::reasoning::ReasoningAdapter;
//!
//! let config = ReasoningConfig::default();
//! let adapter = ReasoningAdapter::http(&config)?;
//! let mut orchestrator = Orchestrator::new(Catalog::builtin(), adapter);
//! let summary = orchestrator.run("all").await;
//! ```

pub mod catalog;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod reasoning;
pub mod report;
pub mod stages;
