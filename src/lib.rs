//! # Reconciliation Core
//!
//! A payment reconciliation engine that associates supplier invoices with
//! actual cash and bank movements, decides a payment method, proposes
//! corrections when ledger evidence contradicts an earlier decision, and
//! raises anomalies when no evidence can be found.
//!
//! ## Features
//!
//! - **Fuzzy matching**: confidence scoring from amount proximity, date
//!   proximity, and counterparty-name similarity
//! - **Status lifecycle**: an explicit state machine guards every
//!   transition; invalid ones are reported, never silently applied
//! - **Batch re-analysis**: idempotent re-scoring over a growing ledger,
//!   partial-failure tolerant, with deterministic 1:1 transaction claims
//! - **Manual lock**: human overrides freeze an invoice against any
//!   automated change until explicitly released
//! - **Alerting**: advisory alerts with human-dispositioned cleanup
//! - **Storage abstraction**: database-agnostic design with trait-based
//!   storage
//!
//! ## Quick Start
//!
//! ```rust
//! use reconciliation_core::ReconciliationEngine;
//! use reconciliation_core::utils::MemoryStorage;
//!
//! let storage = MemoryStorage::new();
//! let engine = ReconciliationEngine::new(storage);
//! assert_eq!(engine.config().date_horizon_days, 120);
//! ```

pub mod alerts;
pub mod dashboard;
pub mod engine;
pub mod matching;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use alerts::{AlertManager, CleanupAction};
pub use engine::{AnalysisOutcome, BatchError, BatchReport, ReconciliationEngine};
pub use matching::{MatchClassification, MatchConfig};
pub use traits::*;
pub use types::*;
