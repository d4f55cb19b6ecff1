//! Reconciliation engine: lifecycle orchestration and batch re-analysis

pub mod batch;
pub mod core;
pub mod state_machine;

pub use batch::{BatchError, BatchReport};
pub use core::ReconciliationEngine;
pub use state_machine::AnalysisOutcome;
