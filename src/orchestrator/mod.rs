//! Ledger workflow orchestrator.
//!
//! - `core`: `LedgerOrchestrator` struct, workflow states, construction
//! - `workflow`: the steps, one testable function per transition
//! - `tests`: unit tests against the mock CA and mock ledger

pub mod core;
pub mod workflow;

pub use self::core::{LedgerOrchestrator, WorkflowState};
