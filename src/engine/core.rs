//! Engine orchestrator: user-facing transitions over the storage seam
//!
//! All status mutation goes through here; callers (UI handlers, the batch
//! job) never write invoice fields directly. Every committed transition
//! advances `last_analyzed_at` and is guarded by the transition table in
//! [`state_machine`](super::state_machine).

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::engine::state_machine::{self, AnalysisOutcome};
use crate::matching::{self, MatchConfig};
use crate::traits::{DefaultInvoiceValidator, InvoiceValidator, ReconciliationStorage};
use crate::types::*;

/// Main reconciliation engine over a storage backend
pub struct ReconciliationEngine<S: ReconciliationStorage> {
    pub(crate) storage: S,
    pub(crate) config: MatchConfig,
    validator: Box<dyn InvoiceValidator>,
}

impl<S: ReconciliationStorage> ReconciliationEngine<S> {
    /// Create an engine with default scoring parameters
    pub fn new(storage: S) -> Self {
        Self::with_config(storage, MatchConfig::default())
    }

    /// Create an engine with custom scoring parameters
    pub fn with_config(storage: S, config: MatchConfig) -> Self {
        Self {
            storage,
            config,
            validator: Box::new(DefaultInvoiceValidator),
        }
    }

    /// Create an engine with a custom invoice validator
    pub fn with_validator(
        storage: S,
        config: MatchConfig,
        validator: Box<dyn InvoiceValidator>,
    ) -> Self {
        Self {
            storage,
            config,
            validator,
        }
    }

    /// Access the scoring configuration
    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Read-only access to the underlying storage, for reporting reads
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Register an invoice entering the engine in the initial state
    ///
    /// Called by the invoice-ingestion collaborator; the engine itself
    /// never creates or deletes invoices after this point.
    pub async fn register_invoice(&mut self, invoice: Invoice) -> ReconcileResult<Invoice> {
        self.validator.validate_invoice(&invoice)?;
        if self.storage.get_invoice(&invoice.id).await?.is_some() {
            return Err(ReconcileError::Validation(format!(
                "Invoice with ID '{}' already exists",
                invoice.id
            )));
        }
        self.storage.save_invoice(&invoice).await?;
        Ok(invoice)
    }

    /// Get an invoice by ID
    pub async fn get_invoice(&self, invoice_id: &str) -> ReconcileResult<Option<Invoice>> {
        self.storage.get_invoice(invoice_id).await
    }

    /// Get an invoice by ID, returning an error if not found
    pub async fn get_invoice_required(&self, invoice_id: &str) -> ReconcileResult<Invoice> {
        self.storage
            .get_invoice(invoice_id)
            .await?
            .ok_or_else(|| ReconcileError::InvoiceNotFound(invoice_id.to_string()))
    }

    /// Build a ledger snapshot from storage for one scoring or batch pass
    pub async fn load_snapshot(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> ReconcileResult<LedgerSnapshot> {
        let transactions = self
            .storage
            .list_transactions(None, start_date, end_date)
            .await
            .map_err(|e| ReconcileError::LedgerUnavailable(e.to_string()))?;
        let (cash_through, bank_through) = self
            .storage
            .ledger_complete_through()
            .await
            .map_err(|e| ReconcileError::LedgerUnavailable(e.to_string()))?;
        Ok(LedgerSnapshot::new(transactions).with_completeness(cash_through, bank_through))
    }

    /// Transaction ids currently claimed by a reconciled invoice, mapped
    /// to the claiming invoice id
    pub(crate) async fn claimed_transactions(&self) -> ReconcileResult<BTreeMap<String, String>> {
        let invoices = self.storage.list_invoices(None).await?;
        Ok(invoices
            .into_iter()
            .filter_map(|inv| inv.matched_transaction_id.map(|tx| (tx, inv.id)))
            .collect())
    }

    /// User declares the payment method for an invoice
    ///
    /// Valid only from `in_attesa_conferma`. Scores the declared ledger
    /// and, for cash declarations, the bank ledger too — cash-declared
    /// invoices that were actually paid by bank are the common data-entry
    /// slip this engine exists to catch.
    pub async fn confirm_payment_method(
        &mut self,
        invoice_id: &str,
        method: PaymentMethod,
        snapshot: &LedgerSnapshot,
    ) -> ReconcileResult<ReconciliationStatus> {
        if method == PaymentMethod::Unset {
            return Err(ReconcileError::Validation(
                "A declared payment method must be cash or bank".to_string(),
            ));
        }

        let mut invoice = self.get_invoice_required(invoice_id).await?;
        state_machine::check(invoice.reconciliation_status, TransitionEvent::ConfirmMethod)?;

        invoice.payment_method_declared = method;

        let claimed = self.claimed_transactions().await?;
        let exclude: BTreeSet<String> = claimed.keys().cloned().collect();
        let outcome = self.analyze(&invoice, snapshot, &exclude);

        let status = self.commit_outcome(invoice, outcome).await?;
        info!(invoice_id, ?method, ?status, "payment method confirmed");
        Ok(status)
    }

    /// User accepts or rejects a proposed match
    ///
    /// Valid only from `da_verificare_spostamento` or
    /// `da_verificare_match_incerto`. Accepting claims the transaction,
    /// flips the method to bank, and reconciles. Rejecting returns the
    /// invoice to its declared method's confirmed state and leaves the
    /// candidate transaction available for other invoices.
    pub async fn apply_move(
        &mut self,
        invoice_id: &str,
        transaction_id: &str,
        confirm: bool,
    ) -> ReconcileResult<ReconciliationStatus> {
        let mut invoice = self.get_invoice_required(invoice_id).await?;
        state_machine::check(invoice.reconciliation_status, TransitionEvent::ApplyMove)?;

        let now = chrono::Utc::now().naive_utc();
        if confirm {
            if self.storage.get_transaction(transaction_id).await?.is_none() {
                return Err(ReconcileError::TransactionNotFound(
                    transaction_id.to_string(),
                ));
            }
            let claimed = self.claimed_transactions().await?;
            if let Some(claimed_by) = claimed.get(transaction_id) {
                if claimed_by != invoice_id {
                    return Err(ReconcileError::TransactionAlreadyClaimed {
                        transaction_id: transaction_id.to_string(),
                        claimed_by: claimed_by.clone(),
                    });
                }
            }
            invoice.matched_transaction_id = Some(transaction_id.to_string());
            invoice.payment_method_declared = PaymentMethod::Bank;
            invoice.reconciliation_status = ReconciliationStatus::Riconciliata;
        } else {
            // Keep the original declaration; the candidate stays free
            invoice.matched_transaction_id = None;
            invoice.reconciliation_status = match invoice.payment_method_declared {
                PaymentMethod::Bank => ReconciliationStatus::ConfermataBanca,
                _ => ReconciliationStatus::ConfermataCassa,
            };
        }
        invoice.touch_analyzed(now);
        self.storage.update_invoice(&invoice).await?;
        info!(
            invoice_id,
            transaction_id,
            confirm,
            status = ?invoice.reconciliation_status,
            "move proposal resolved"
        );
        Ok(invoice.reconciliation_status)
    }

    /// Re-run scoring for a single invoice against the given snapshot
    ///
    /// Valid from any non-locked, non-reconciled state. Safe to run
    /// repeatedly: with an unchanged ledger the second run commits the
    /// same status it found the first time.
    pub async fn reanalyze(
        &mut self,
        invoice_id: &str,
        snapshot: &LedgerSnapshot,
    ) -> ReconcileResult<AnalysisOutcome> {
        let claimed = self.claimed_transactions().await?;
        let exclude: BTreeSet<String> = claimed.keys().cloned().collect();
        self.reanalyze_with_exclusions(invoice_id, snapshot, &exclude)
            .await
    }

    /// Re-analysis with an explicit claimed-transaction pool, shared with
    /// the batch job so one run never double-allocates a transaction
    pub(crate) async fn reanalyze_with_exclusions(
        &mut self,
        invoice_id: &str,
        snapshot: &LedgerSnapshot,
        exclude: &BTreeSet<String>,
    ) -> ReconcileResult<AnalysisOutcome> {
        let invoice = self.get_invoice_required(invoice_id).await?;
        state_machine::check(invoice.reconciliation_status, TransitionEvent::Reanalyze)?;

        let outcome = self.analyze(&invoice, snapshot, exclude);
        self.commit_outcome(invoice, outcome.clone()).await?;
        Ok(outcome)
    }

    /// Freeze an invoice against automated transitions
    ///
    /// Idempotent when re-locked with the same reason; a different reason
    /// is treated as a human updating the note.
    pub async fn lock(&mut self, invoice_id: &str, reason: &str) -> ReconcileResult<()> {
        crate::utils::validation::validate_lock_reason(reason)?;
        let mut invoice = self.get_invoice_required(invoice_id).await?;
        state_machine::check(invoice.reconciliation_status, TransitionEvent::Lock)?;

        if invoice.reconciliation_status == ReconciliationStatus::LockManuale
            && invoice.lock_reason.as_deref() == Some(reason)
        {
            return Ok(());
        }

        invoice.reconciliation_status = ReconciliationStatus::LockManuale;
        invoice.lock_reason = Some(reason.to_string());
        invoice.touch_analyzed(chrono::Utc::now().naive_utc());
        self.storage.update_invoice(&invoice).await?;
        info!(invoice_id, reason, "invoice locked");
        Ok(())
    }

    /// Release a manual lock, returning the invoice to the initial state
    ///
    /// Conservative by design: the prior state is not guessed, the user
    /// re-declares the payment method.
    pub async fn unlock(&mut self, invoice_id: &str) -> ReconcileResult<()> {
        let mut invoice = self.get_invoice_required(invoice_id).await?;
        state_machine::check(invoice.reconciliation_status, TransitionEvent::Unlock)?;

        invoice.reconciliation_status = ReconciliationStatus::InAttesaConferma;
        invoice.payment_method_declared = PaymentMethod::Unset;
        invoice.matched_transaction_id = None;
        invoice.lock_reason = None;
        invoice.touch_analyzed(chrono::Utc::now().naive_utc());
        self.storage.update_invoice(&invoice).await?;
        info!(invoice_id, "invoice unlocked");
        Ok(())
    }

    /// Ranked match proposals for an invoice, for display to the user
    pub async fn proposals_for(
        &self,
        invoice_id: &str,
        snapshot: &LedgerSnapshot,
        source: TransactionSource,
    ) -> ReconcileResult<Vec<MatchProposal>> {
        let invoice = self.get_invoice_required(invoice_id).await?;
        let claimed = self.claimed_transactions().await?;
        let exclude: BTreeSet<String> = claimed.keys().cloned().collect();
        Ok(matching::rank_candidates(
            &invoice,
            snapshot,
            source,
            &self.config,
            &exclude,
        ))
    }

    /// Pure scoring pass: declared ledger plus, for cash, the bank ledger
    pub(crate) fn analyze(
        &self,
        invoice: &Invoice,
        snapshot: &LedgerSnapshot,
        exclude: &BTreeSet<String>,
    ) -> AnalysisOutcome {
        let method = invoice.payment_method_declared;
        let Some(declared_source) = method.expected_source() else {
            return AnalysisOutcome::NoEvidence;
        };

        let classified = |p: MatchProposal| self.config.classify(p.score).map(|c| (c, p));

        let declared_best =
            matching::best_candidate(invoice, snapshot, declared_source, &self.config, exclude)
                .and_then(classified);
        let cross_best = if declared_source == TransactionSource::Cash {
            matching::best_candidate(
                invoice,
                snapshot,
                TransactionSource::Bank,
                &self.config,
                exclude,
            )
            .and_then(classified)
        } else {
            None
        };

        // The statement must be complete through the whole match horizon
        // before a missing payment counts as an anomaly. An anomaly already
        // on record stays one until evidence appears; a later snapshot with
        // weaker completeness metadata does not demote it to suspended.
        let horizon_end =
            invoice.issue_date + chrono::Duration::days(self.config.date_horizon_days);
        let bank_complete = snapshot.bank_complete_for(horizon_end)
            || invoice.reconciliation_status == ReconciliationStatus::AnomaliaNonInEstratto;

        state_machine::route_analysis(method, declared_best, cross_best, bank_complete)
    }

    /// Persist the routed outcome for an invoice; the single commit point
    /// for analysis-driven transitions
    pub(crate) async fn commit_outcome(
        &mut self,
        mut invoice: Invoice,
        outcome: AnalysisOutcome,
    ) -> ReconcileResult<ReconciliationStatus> {
        let now = chrono::Utc::now().naive_utc();

        if let AnalysisOutcome::Reconciled(proposal) = &outcome {
            // Claim check against the live store; the candidate pool is
            // advisory, this is the authoritative 1:1 guard
            let claimed = self.claimed_transactions().await?;
            if let Some(claimed_by) = claimed.get(&proposal.transaction_id) {
                if claimed_by != &invoice.id {
                    return Err(ReconcileError::TransactionAlreadyClaimed {
                        transaction_id: proposal.transaction_id.clone(),
                        claimed_by: claimed_by.clone(),
                    });
                }
            }
            invoice.matched_transaction_id = Some(proposal.transaction_id.clone());
            if proposal.transaction_source == TransactionSource::Bank {
                invoice.payment_method_declared = PaymentMethod::Bank;
            }
        } else {
            invoice.matched_transaction_id = None;
        }

        let status = outcome.target_status(invoice.payment_method_declared);
        let previous = invoice.reconciliation_status;
        invoice.reconciliation_status = status;
        invoice.touch_analyzed(now);
        self.storage.update_invoice(&invoice).await?;

        if previous != status {
            debug!(invoice_id = %invoice.id, ?previous, ?status, "status transition");
        }
        if status == ReconciliationStatus::AnomaliaNonInEstratto
            && previous != ReconciliationStatus::AnomaliaNonInEstratto
        {
            let alert = Alert::new(
                AlertKind::MissingStatementEntry,
                Some(invoice.id.clone()),
                format!(
                    "Invoice {} declared paid by bank but absent from a complete statement",
                    invoice.id
                ),
            );
            self.storage.save_alert(&alert).await?;
        }

        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_storage::MemoryStorage;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn cash_declaration_with_bank_evidence_proposes_move() {
        let storage = MemoryStorage::new();
        storage.add_transaction(LedgerTransaction {
            id: "tx-bank-1".to_string(),
            source: TransactionSource::Bank,
            amount: BigDecimal::from(-120),
            date: date(2024, 3, 3),
            description: "BONIFICO ROSSI FORNITURE SRL".to_string(),
        });
        let mut engine = ReconciliationEngine::new(storage);

        engine
            .register_invoice(Invoice::new(
                "inv-1".to_string(),
                BigDecimal::from(120),
                date(2024, 3, 1),
                "Rossi Forniture SRL".to_string(),
            ))
            .await
            .unwrap();

        let snapshot = engine.load_snapshot(None, None).await.unwrap();
        let status = engine
            .confirm_payment_method("inv-1", PaymentMethod::Cash, &snapshot)
            .await
            .unwrap();
        assert_eq!(status, ReconciliationStatus::DaVerificareSpostamento);

        let invoice = engine.get_invoice_required("inv-1").await.unwrap();
        // The proposal is advisory: nothing claimed yet
        assert_eq!(invoice.matched_transaction_id, None);
        assert!(invoice.last_analyzed_at.is_some());
    }

    #[tokio::test]
    async fn invalid_transition_is_reported_without_mutation() {
        let storage = MemoryStorage::new();
        let mut engine = ReconciliationEngine::new(storage);

        engine
            .register_invoice(Invoice::new(
                "inv-1".to_string(),
                BigDecimal::from(80),
                date(2024, 3, 1),
                "Bianchi SPA".to_string(),
            ))
            .await
            .unwrap();

        let err = engine.apply_move("inv-1", "tx-x", true).await.unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::InvalidStateTransition {
                current: ReconciliationStatus::InAttesaConferma,
                event: TransitionEvent::ApplyMove,
            }
        ));

        let invoice = engine.get_invoice_required("inv-1").await.unwrap();
        assert_eq!(
            invoice.reconciliation_status,
            ReconciliationStatus::InAttesaConferma
        );
        assert_eq!(invoice.matched_transaction_id, None);
    }

    #[tokio::test]
    async fn unlock_resets_to_initial_state() {
        let storage = MemoryStorage::new();
        let mut engine = ReconciliationEngine::new(storage);

        engine
            .register_invoice(Invoice::new(
                "inv-1".to_string(),
                BigDecimal::from(80),
                date(2024, 3, 1),
                "Bianchi SPA".to_string(),
            ))
            .await
            .unwrap();

        engine.lock("inv-1", "under review").await.unwrap();
        // Same reason is idempotent
        engine.lock("inv-1", "under review").await.unwrap();

        engine.unlock("inv-1").await.unwrap();
        let invoice = engine.get_invoice_required("inv-1").await.unwrap();
        assert_eq!(
            invoice.reconciliation_status,
            ReconciliationStatus::InAttesaConferma
        );
        assert_eq!(invoice.payment_method_declared, PaymentMethod::Unset);
        assert_eq!(invoice.lock_reason, None);
    }
}
