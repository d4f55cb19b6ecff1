//! In-memory storage implementation for testing and development

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::traits::ReconciliationStorage;
use crate::types::*;

/// In-memory storage backed by shared maps
///
/// Clones share the underlying data, so an engine, an alert manager, and
/// a test can observe the same state.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    invoices: Arc<RwLock<HashMap<String, Invoice>>>,
    transactions: Arc<RwLock<HashMap<String, LedgerTransaction>>>,
    alerts: Arc<RwLock<HashMap<String, Alert>>>,
    complete_through: Arc<RwLock<(Option<NaiveDate>, Option<NaiveDate>)>>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self {
            invoices: Arc::new(RwLock::new(HashMap::new())),
            transactions: Arc::new(RwLock::new(HashMap::new())),
            alerts: Arc::new(RwLock::new(HashMap::new())),
            complete_through: Arc::new(RwLock::new((None, None))),
        }
    }

    /// Ingest a ledger movement (the ledger is append-only; this stands in
    /// for the upstream feed)
    pub fn add_transaction(&self, transaction: LedgerTransaction) {
        self.transactions
            .write()
            .unwrap()
            .insert(transaction.id.clone(), transaction);
    }

    /// Record how far each ledger is known complete
    pub fn set_complete_through(
        &self,
        cash_through: Option<NaiveDate>,
        bank_through: Option<NaiveDate>,
    ) {
        *self.complete_through.write().unwrap() = (cash_through, bank_through);
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) {
        self.invoices.write().unwrap().clear();
        self.transactions.write().unwrap().clear();
        self.alerts.write().unwrap().clear();
        *self.complete_through.write().unwrap() = (None, None);
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReconciliationStorage for MemoryStorage {
    async fn save_invoice(&mut self, invoice: &Invoice) -> ReconcileResult<()> {
        self.invoices
            .write()
            .unwrap()
            .insert(invoice.id.clone(), invoice.clone());
        Ok(())
    }

    async fn get_invoice(&self, invoice_id: &str) -> ReconcileResult<Option<Invoice>> {
        Ok(self.invoices.read().unwrap().get(invoice_id).cloned())
    }

    async fn list_invoices(
        &self,
        status: Option<ReconciliationStatus>,
    ) -> ReconcileResult<Vec<Invoice>> {
        let invoices = self.invoices.read().unwrap();
        Ok(invoices
            .values()
            .filter(|inv| status.is_none_or(|s| inv.reconciliation_status == s))
            .cloned()
            .collect())
    }

    async fn update_invoice(&mut self, invoice: &Invoice) -> ReconcileResult<()> {
        if self.invoices.read().unwrap().contains_key(&invoice.id) {
            self.invoices
                .write()
                .unwrap()
                .insert(invoice.id.clone(), invoice.clone());
            Ok(())
        } else {
            Err(ReconcileError::InvoiceNotFound(invoice.id.clone()))
        }
    }

    async fn list_transactions(
        &self,
        source: Option<TransactionSource>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> ReconcileResult<Vec<LedgerTransaction>> {
        let transactions = self.transactions.read().unwrap();
        let mut filtered: Vec<LedgerTransaction> = transactions
            .values()
            .filter(|txn| {
                if source.is_some_and(|s| txn.source != s) {
                    return false;
                }
                if let Some(start) = start_date {
                    if txn.date < start {
                        return false;
                    }
                }
                if let Some(end) = end_date {
                    if txn.date > end {
                        return false;
                    }
                }
                true
            })
            .cloned()
            .collect();
        filtered.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(filtered)
    }

    async fn get_transaction(
        &self,
        transaction_id: &str,
    ) -> ReconcileResult<Option<LedgerTransaction>> {
        Ok(self
            .transactions
            .read()
            .unwrap()
            .get(transaction_id)
            .cloned())
    }

    async fn ledger_complete_through(
        &self,
    ) -> ReconcileResult<(Option<NaiveDate>, Option<NaiveDate>)> {
        Ok(*self.complete_through.read().unwrap())
    }

    async fn save_alert(&mut self, alert: &Alert) -> ReconcileResult<()> {
        self.alerts
            .write()
            .unwrap()
            .insert(alert.id.clone(), alert.clone());
        Ok(())
    }

    async fn get_alert(&self, alert_id: &str) -> ReconcileResult<Option<Alert>> {
        Ok(self.alerts.read().unwrap().get(alert_id).cloned())
    }

    async fn list_alerts(&self, status: Option<AlertStatus>) -> ReconcileResult<Vec<Alert>> {
        let alerts = self.alerts.read().unwrap();
        Ok(alerts
            .values()
            .filter(|a| status.is_none_or(|s| a.status == s))
            .cloned()
            .collect())
    }

    async fn update_alert(&mut self, alert: &Alert) -> ReconcileResult<()> {
        if self.alerts.read().unwrap().contains_key(&alert.id) {
            self.alerts
                .write()
                .unwrap()
                .insert(alert.id.clone(), alert.clone());
            Ok(())
        } else {
            Err(ReconcileError::AlertNotFound(alert.id.clone()))
        }
    }
}
