//! Traits for storage abstraction and extensibility

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::types::*;

/// Storage abstraction for the reconciliation engine
///
/// The engine reads invoices, ledger movements, and alerts through this
/// trait and writes back only the reconciliation-owned invoice fields
/// (status, declared method, matched transaction, lock reason, analysis
/// timestamp). Any backend (PostgreSQL, SQLite, in-memory, ...) can be
/// plugged in by implementing these methods. The ledger is read-only.
#[async_trait]
pub trait ReconciliationStorage: Send + Sync {
    /// Save a new invoice projection
    async fn save_invoice(&mut self, invoice: &Invoice) -> ReconcileResult<()>;

    /// Get an invoice by ID
    async fn get_invoice(&self, invoice_id: &str) -> ReconcileResult<Option<Invoice>>;

    /// List invoices, optionally filtered by status
    async fn list_invoices(
        &self,
        status: Option<ReconciliationStatus>,
    ) -> ReconcileResult<Vec<Invoice>>;

    /// Write back an invoice's reconciliation fields
    async fn update_invoice(&mut self, invoice: &Invoice) -> ReconcileResult<()>;

    /// List ledger movements within a date range, optionally by source
    async fn list_transactions(
        &self,
        source: Option<TransactionSource>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> ReconcileResult<Vec<LedgerTransaction>>;

    /// Get a ledger movement by ID
    async fn get_transaction(
        &self,
        transaction_id: &str,
    ) -> ReconcileResult<Option<LedgerTransaction>>;

    /// Date through which each ledger is known complete (cash, bank)
    async fn ledger_complete_through(
        &self,
    ) -> ReconcileResult<(Option<NaiveDate>, Option<NaiveDate>)>;

    /// Save a new alert
    async fn save_alert(&mut self, alert: &Alert) -> ReconcileResult<()>;

    /// Get an alert by ID
    async fn get_alert(&self, alert_id: &str) -> ReconcileResult<Option<Alert>>;

    /// List alerts, optionally filtered by status
    async fn list_alerts(&self, status: Option<AlertStatus>) -> ReconcileResult<Vec<Alert>>;

    /// Update an alert's disposition
    async fn update_alert(&mut self, alert: &Alert) -> ReconcileResult<()>;
}

/// Trait for implementing custom invoice validation rules
pub trait InvoiceValidator: Send + Sync {
    /// Validate an invoice projection before the engine acts on it
    fn validate_invoice(&self, invoice: &Invoice) -> ReconcileResult<()>;
}

/// Default invoice validator with basic rules
pub struct DefaultInvoiceValidator;

impl InvoiceValidator for DefaultInvoiceValidator {
    fn validate_invoice(&self, invoice: &Invoice) -> ReconcileResult<()> {
        if invoice.id.trim().is_empty() {
            return Err(ReconcileError::Validation(
                "Invoice ID cannot be empty".to_string(),
            ));
        }

        if invoice.total_amount <= bigdecimal::BigDecimal::from(0) {
            return Err(ReconcileError::Validation(
                "Invoice amount must be positive".to_string(),
            ));
        }

        if invoice.counterparty.trim().is_empty() {
            return Err(ReconcileError::Validation(
                "Invoice counterparty cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
