//! Batch re-analysis over all invoices in re-analyzable states
//!
//! Runs invoice-by-invoice in stable id order against one ledger
//! snapshot. Each invoice's transition is independent: a failure is
//! recorded and the run continues. Transactions claimed store-wide or
//! earlier in the same run are removed from the candidate pool, so a
//! single pass never allocates one movement to two invoices.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::engine::core::ReconciliationEngine;
use crate::engine::state_machine::AnalysisOutcome;
use crate::traits::ReconciliationStorage;
use crate::types::*;

/// Per-invoice failure collected during a batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchError {
    pub invoice_id: String,
    pub error: String,
}

/// Outcome of one batch re-analysis run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Invoices auto-reconciled by a confident declared-ledger match
    pub reconciled: Vec<String>,
    /// Cross-ledger move proposals awaiting user confirmation
    pub proposed_moves: Vec<MatchProposal>,
    /// Uncertain matches awaiting human adjudication
    pub uncertain: Vec<MatchProposal>,
    /// Invoices that became (or remain) genuine discrepancies
    pub anomalies: Vec<String>,
    /// Locked invoices skipped entirely
    pub skipped_locked: usize,
    /// Per-invoice failures; the run continues past them
    pub errors: Vec<BatchError>,
}

impl BatchReport {
    /// True when every processed invoice succeeded
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// One-line summary for logs
    pub fn summary(&self) -> String {
        format!(
            "batch re-analysis: {} reconciled, {} moves proposed, {} uncertain, {} anomalies, {} locked skipped, {} errors",
            self.reconciled.len(),
            self.proposed_moves.len(),
            self.uncertain.len(),
            self.anomalies.len(),
            self.skipped_locked,
            self.errors.len()
        )
    }
}

impl<S: ReconciliationStorage> ReconciliationEngine<S> {
    /// Re-analyze every invoice in a re-analyzable state
    ///
    /// Processing order is stable (invoice id ascending), so when two
    /// invoices could both match one transaction the earlier-ordered
    /// invoice wins and the later one falls back to its next-best
    /// candidate or to no match.
    pub async fn reanalyze_all(
        &mut self,
        snapshot: &LedgerSnapshot,
    ) -> ReconcileResult<BatchReport> {
        let mut invoices = self.storage.list_invoices(None).await?;
        invoices.sort_by(|a, b| a.id.cmp(&b.id));

        let claimed = self.claimed_transactions().await?;
        let mut pool: BTreeSet<String> = claimed.into_keys().collect();

        let mut report = BatchReport::default();
        for listed in invoices {
            if listed.reconciliation_status == ReconciliationStatus::LockManuale {
                report.skipped_locked += 1;
                continue;
            }
            if !listed.reconciliation_status.is_reanalyzable() {
                continue;
            }

            // Re-read immediately before applying: a concurrent user
            // transition wins and this invoice's proposal is dropped
            let fresh = match self.storage.get_invoice(&listed.id).await? {
                Some(inv) => inv,
                None => continue,
            };
            if fresh.reconciliation_status != listed.reconciliation_status {
                debug!(
                    invoice_id = %listed.id,
                    "state changed during batch, dropping proposal"
                );
                continue;
            }

            match self
                .reanalyze_with_exclusions(&listed.id, snapshot, &pool)
                .await
            {
                Ok(AnalysisOutcome::Reconciled(proposal)) => {
                    pool.insert(proposal.transaction_id.clone());
                    report.reconciled.push(listed.id);
                }
                Ok(AnalysisOutcome::ProposedMove(proposal)) => {
                    report.proposed_moves.push(proposal);
                }
                Ok(AnalysisOutcome::Uncertain(proposal)) => {
                    report.uncertain.push(proposal);
                }
                Ok(AnalysisOutcome::Anomaly) => {
                    report.anomalies.push(listed.id);
                }
                Ok(AnalysisOutcome::Suspended | AnalysisOutcome::NoEvidence) => {}
                Err(err) => {
                    warn!(invoice_id = %listed.id, error = %err, "re-analysis failed");
                    report.errors.push(BatchError {
                        invoice_id: listed.id,
                        error: err.to_string(),
                    });
                }
            }
        }

        info!("{}", report.summary());
        Ok(report)
    }
}
