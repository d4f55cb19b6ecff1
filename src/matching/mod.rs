//! Matching scorer: confidence scoring of invoice / transaction pairs
//!
//! Given an invoice and a candidate ledger movement, computes a composite
//! confidence score from amount proximity, counterparty-name similarity,
//! and date proximity. Amount carries the most weight (amount equality is
//! the strongest signal), counterparty next; date is the weakest and also
//! acts as the candidate-generation filter.

pub mod similarity;

use bigdecimal::{BigDecimal, ToPrimitive};
use serde::{Deserialize, Serialize};

use crate::types::{Invoice, LedgerSnapshot, LedgerTransaction, MatchProposal, TransactionSource};

pub use similarity::{normalize, token_set_similarity};

/// Tunable scoring parameters
///
/// The numeric defaults mirror the UI's classification bands (>= 85%
/// auto-reconcilable, >= 50% surfaced for confirmation) and are meant to
/// be overridden, not hard-coded against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Candidates farther than this many days from the issue date are not
    /// generated at all
    pub date_horizon_days: i64,
    pub amount_weight: f64,
    pub counterparty_weight: f64,
    pub date_weight: f64,
    /// Score at or above which a match is confident
    pub confident_threshold: f64,
    /// Score at or above which a match is surfaced as uncertain
    pub uncertain_threshold: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            date_horizon_days: 120,
            amount_weight: 0.5,
            counterparty_weight: 0.3,
            date_weight: 0.2,
            confident_threshold: 0.85,
            uncertain_threshold: 0.5,
        }
    }
}

/// Score-based classification of a proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchClassification {
    /// Eligible for automatic reconciliation
    Confident,
    /// Requires human confirmation
    Uncertain,
}

impl MatchConfig {
    /// Classify a score against the configured thresholds
    pub fn classify(&self, score: f64) -> Option<MatchClassification> {
        if score >= self.confident_threshold {
            Some(MatchClassification::Confident)
        } else if score >= self.uncertain_threshold {
            Some(MatchClassification::Uncertain)
        } else {
            None
        }
    }
}

/// Score one invoice / transaction pair
///
/// Pure and deterministic: same inputs, same output. Returns `None` when
/// the transaction falls outside the date horizon or scores below the
/// uncertain threshold — no proposal is generated in either case.
pub fn score(
    invoice: &Invoice,
    transaction: &LedgerTransaction,
    config: &MatchConfig,
) -> Option<MatchProposal> {
    let date_delta_days = (transaction.date - invoice.issue_date).num_days();
    if date_delta_days.abs() > config.date_horizon_days {
        return None;
    }

    let amount_delta = &invoice.total_amount - transaction.amount.abs();
    let amount_term = amount_term(&invoice.total_amount, &amount_delta);
    let name_term = token_set_similarity(&invoice.counterparty, &transaction.description);
    let date_term = 1.0 - (date_delta_days.abs() as f64 / config.date_horizon_days as f64);

    let composite = config.amount_weight * amount_term
        + config.counterparty_weight * name_term
        + config.date_weight * date_term;

    if composite < config.uncertain_threshold {
        return None;
    }

    let mut rationale = Vec::new();
    if amount_delta == BigDecimal::from(0) {
        rationale.push("exact amount match".to_string());
    } else {
        rationale.push(format!("amount differs by {amount_delta}"));
    }
    rationale.push(format!("{} day(s) apart", date_delta_days.abs()));
    rationale.push(format!("counterparty similarity {name_term:.2}"));

    Some(MatchProposal {
        invoice_id: invoice.id.clone(),
        transaction_id: transaction.id.clone(),
        transaction_source: transaction.source,
        transaction_description: transaction.description.clone(),
        transaction_amount: transaction.amount.clone(),
        transaction_date: transaction.date,
        score: composite,
        amount_delta,
        date_delta_days,
        rationale,
    })
}

/// `1 - min(|invoice - |tx|| / invoice, 1)`; exact match scores 1.0
fn amount_term(invoice_amount: &BigDecimal, delta: &BigDecimal) -> f64 {
    let ratio = (delta.abs() / invoice_amount)
        .to_f64()
        .unwrap_or(1.0)
        .min(1.0);
    1.0 - ratio
}

/// Rank all candidates for an invoice from one source ledger
///
/// Transactions whose ids appear in `exclude` (already claimed by another
/// invoice) are never proposed. Ordering is deterministic: score
/// descending, then smaller date distance, then transaction id.
pub fn rank_candidates(
    invoice: &Invoice,
    snapshot: &LedgerSnapshot,
    source: TransactionSource,
    config: &MatchConfig,
    exclude: &std::collections::BTreeSet<String>,
) -> Vec<MatchProposal> {
    let mut proposals: Vec<MatchProposal> = snapshot
        .from_source(source)
        .filter(|t| !exclude.contains(&t.id))
        .filter_map(|t| score(invoice, t, config))
        .collect();

    proposals.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.date_delta_days.abs().cmp(&b.date_delta_days.abs()))
            .then_with(|| a.transaction_id.cmp(&b.transaction_id))
    });
    proposals
}

/// Best-ranked candidate for an invoice from one source ledger, if any
pub fn best_candidate(
    invoice: &Invoice,
    snapshot: &LedgerSnapshot,
    source: TransactionSource,
    config: &MatchConfig,
    exclude: &std::collections::BTreeSet<String>,
) -> Option<MatchProposal> {
    rank_candidates(invoice, snapshot, source, config, exclude)
        .into_iter()
        .next()
}
