//! Core types and data structures for the reconciliation engine

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Payment method declared for an invoice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// No method declared yet
    Unset,
    /// Paid from the cash ledger
    Cash,
    /// Paid through the bank
    Bank,
}

impl PaymentMethod {
    /// The ledger a declared method is expected to show evidence in
    pub fn expected_source(&self) -> Option<TransactionSource> {
        match self {
            PaymentMethod::Unset => None,
            PaymentMethod::Cash => Some(TransactionSource::Cash),
            PaymentMethod::Bank => Some(TransactionSource::Bank),
        }
    }
}

/// Reconciliation lifecycle status of an invoice
///
/// This is a closed vocabulary exposed to the UI layer; the serialized
/// names are stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationStatus {
    /// Waiting for the user to declare a payment method
    InAttesaConferma,
    /// User declared cash; no ledger evidence yet
    ConfermataCassa,
    /// User declared bank; no ledger evidence yet
    ConfermataBanca,
    /// Declared bank, no match, statement history still incomplete
    SospesaAttesaEstratto,
    /// Declared cash but a confident bank match exists; move proposed
    DaVerificareSpostamento,
    /// An uncertain-score match needs human adjudication
    DaVerificareMatchIncerto,
    /// Declared bank, statement complete, and no evidence found
    AnomaliaNonInEstratto,
    /// Matched to a ledger transaction
    Riconciliata,
    /// Frozen by explicit human action
    LockManuale,
}

impl ReconciliationStatus {
    /// Whether automated re-analysis may touch an invoice in this status
    pub fn is_reanalyzable(&self) -> bool {
        !matches!(
            self,
            ReconciliationStatus::Riconciliata | ReconciliationStatus::LockManuale
        )
    }

    /// Whether the invoice currently owns a matched transaction
    pub fn holds_match(&self) -> bool {
        matches!(self, ReconciliationStatus::Riconciliata)
    }
}

/// Source ledger of a monetary movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionSource {
    Cash,
    Bank,
}

/// Reconciliation-relevant projection of a supplier invoice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    /// Unique identifier (assigned by the upstream invoice store)
    pub id: String,
    /// Total invoice amount, always positive
    pub total_amount: BigDecimal,
    /// Issue date from the invoice header
    pub issue_date: NaiveDate,
    /// Supplier name as written on the invoice
    pub counterparty: String,
    /// Payment method declared by the user
    pub payment_method_declared: PaymentMethod,
    /// Current lifecycle status
    pub reconciliation_status: ReconciliationStatus,
    /// Ledger transaction this invoice is matched to, if any
    pub matched_transaction_id: Option<String>,
    /// Reason recorded when the invoice was manually locked
    pub lock_reason: Option<String>,
    /// Last time the engine analyzed this invoice; never decreases
    pub last_analyzed_at: Option<NaiveDateTime>,
    /// When the invoice entered the engine
    pub created_at: NaiveDateTime,
    /// When the invoice was last updated by the engine
    pub updated_at: NaiveDateTime,
}

impl Invoice {
    /// Create an invoice in the initial lifecycle state
    pub fn new(
        id: String,
        total_amount: BigDecimal,
        issue_date: NaiveDate,
        counterparty: String,
    ) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            id,
            total_amount,
            issue_date,
            counterparty,
            payment_method_declared: PaymentMethod::Unset,
            reconciliation_status: ReconciliationStatus::InAttesaConferma,
            matched_transaction_id: None,
            lock_reason: None,
            last_analyzed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Advance the analysis timestamp, keeping it monotone
    pub(crate) fn touch_analyzed(&mut self, at: NaiveDateTime) {
        match self.last_analyzed_at {
            Some(prev) if prev >= at => {}
            _ => self.last_analyzed_at = Some(at),
        }
        self.updated_at = at;
    }
}

/// A dated, signed monetary movement from the cash ledger or a bank
/// statement feed
///
/// Immutable once ingested; the ledger is append-only from the engine's
/// point of view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub id: String,
    pub source: TransactionSource,
    /// Signed amount, outflows negative
    pub amount: BigDecimal,
    pub date: NaiveDate,
    /// Free-text description / counterparty as recorded by the ledger
    pub description: String,
}

/// A scored candidate pairing between an invoice and a ledger transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchProposal {
    pub invoice_id: String,
    pub transaction_id: String,
    pub transaction_source: TransactionSource,
    pub transaction_description: String,
    pub transaction_amount: BigDecimal,
    pub transaction_date: NaiveDate,
    /// Composite confidence score in [0, 1]
    pub score: f64,
    /// invoice amount minus |transaction amount|
    pub amount_delta: BigDecimal,
    /// transaction date minus invoice issue date, in days
    pub date_delta_days: i64,
    /// Human-readable notes explaining the score
    pub rationale: Vec<String>,
}

impl MatchProposal {
    /// Score rendered as a whole percentage, the way the UI displays it
    pub fn score_percent(&self) -> u8 {
        (self.score * 100.0).round().clamp(0.0, 100.0) as u8
    }
}

/// Alert lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Pending,
    Resolved,
    Ignored,
}

/// Kind of advisory alert raised by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// A duplicate submission superseded by a correcting one
    DuplicateSuperseded,
    /// Declared bank payment missing from a complete statement
    MissingStatementEntry,
    /// An uncertain match waiting for human adjudication
    ManualReview,
}

/// Advisory alert requiring explicit human disposition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub invoice_id: Option<String>,
    pub kind: AlertKind,
    pub message: String,
    pub status: AlertStatus,
    pub created_at: NaiveDateTime,
    pub resolved_at: Option<NaiveDateTime>,
}

impl Alert {
    /// Create a pending alert with a freshly minted id
    pub fn new(kind: AlertKind, invoice_id: Option<String>, message: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            invoice_id,
            kind,
            message,
            status: AlertStatus::Pending,
            created_at: chrono::Utc::now().naive_utc(),
            resolved_at: None,
        }
    }
}

/// Immutable view of the ledgers used by one scoring or batch pass
///
/// Scorer and batch calls take the snapshot explicitly so a run is
/// reproducible given fixed inputs; there is no ambient "current ledger".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub transactions: Vec<LedgerTransaction>,
    /// Date through which the cash ledger is known complete
    pub cash_complete_through: Option<NaiveDate>,
    /// Date through which the bank statement feed is known complete
    pub bank_complete_through: Option<NaiveDate>,
}

impl LedgerSnapshot {
    pub fn new(transactions: Vec<LedgerTransaction>) -> Self {
        Self {
            transactions,
            cash_complete_through: None,
            bank_complete_through: None,
        }
    }

    /// Mark how far each ledger is known complete
    pub fn with_completeness(
        mut self,
        cash_through: Option<NaiveDate>,
        bank_through: Option<NaiveDate>,
    ) -> Self {
        self.cash_complete_through = cash_through;
        self.bank_complete_through = bank_through;
        self
    }

    /// Transactions from one source, in ledger order
    pub fn from_source(
        &self,
        source: TransactionSource,
    ) -> impl Iterator<Item = &LedgerTransaction> {
        self.transactions.iter().filter(move |t| t.source == source)
    }

    /// Whether the bank statement is known complete through the given date
    pub fn bank_complete_for(&self, date: NaiveDate) -> bool {
        self.bank_complete_through
            .is_some_and(|through| through >= date)
    }
}

/// Events the state machine can be asked to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionEvent {
    ConfirmMethod,
    ApplyMove,
    Reanalyze,
    Lock,
    Unlock,
}

/// Errors that can occur in the reconciliation engine
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("invalid transition: {event:?} not allowed from {current:?}")]
    InvalidStateTransition {
        current: ReconciliationStatus,
        event: TransitionEvent,
    },
    #[error("transaction {transaction_id} already claimed by invoice {claimed_by}")]
    TransactionAlreadyClaimed {
        transaction_id: String,
        claimed_by: String,
    },
    #[error("ledger unavailable: {0}")]
    LedgerUnavailable(String),
    #[error("invoice not found: {0}")]
    InvoiceNotFound(String),
    #[error("transaction not found: {0}")]
    TransactionNotFound(String),
    #[error("alert not found: {0}")]
    AlertNotFound(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("validation error: {0}")]
    Validation(String),
}

/// Result type for engine operations
pub type ReconcileResult<T> = Result<T, ReconcileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_vocabulary_is_stable() {
        let rendered: Vec<String> = [
            ReconciliationStatus::InAttesaConferma,
            ReconciliationStatus::ConfermataCassa,
            ReconciliationStatus::ConfermataBanca,
            ReconciliationStatus::SospesaAttesaEstratto,
            ReconciliationStatus::DaVerificareSpostamento,
            ReconciliationStatus::DaVerificareMatchIncerto,
            ReconciliationStatus::AnomaliaNonInEstratto,
            ReconciliationStatus::Riconciliata,
            ReconciliationStatus::LockManuale,
        ]
        .iter()
        .map(|s| serde_json::to_string(s).unwrap())
        .collect();

        assert_eq!(
            rendered,
            vec![
                "\"in_attesa_conferma\"",
                "\"confermata_cassa\"",
                "\"confermata_banca\"",
                "\"sospesa_attesa_estratto\"",
                "\"da_verificare_spostamento\"",
                "\"da_verificare_match_incerto\"",
                "\"anomalia_non_in_estratto\"",
                "\"riconciliata\"",
                "\"lock_manuale\"",
            ]
        );
    }

    #[test]
    fn analyzed_timestamp_never_decreases() {
        let mut invoice = Invoice::new(
            "inv-1".to_string(),
            BigDecimal::from(100),
            chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            "Fornitore SRL".to_string(),
        );

        let later = chrono::NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let earlier = chrono::NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();

        invoice.touch_analyzed(later);
        assert_eq!(invoice.last_analyzed_at, Some(later));

        invoice.touch_analyzed(earlier);
        assert_eq!(invoice.last_analyzed_at, Some(later));
    }

    #[test]
    fn score_percent_rounds() {
        let proposal = MatchProposal {
            invoice_id: "inv-1".to_string(),
            transaction_id: "tx-1".to_string(),
            transaction_source: TransactionSource::Bank,
            transaction_description: "BONIFICO FORNITORE".to_string(),
            transaction_amount: BigDecimal::from(-120),
            transaction_date: chrono::NaiveDate::from_ymd_opt(2024, 3, 3).unwrap(),
            score: 0.874,
            amount_delta: BigDecimal::from(0),
            date_delta_days: 2,
            rationale: vec![],
        };
        assert_eq!(proposal.score_percent(), 87);
    }

    #[test]
    fn bank_completeness_is_a_date_bound() {
        let snapshot = LedgerSnapshot::new(vec![]).with_completeness(
            None,
            Some(chrono::NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()),
        );
        assert!(snapshot.bank_complete_for(chrono::NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()));
        assert!(!snapshot.bank_complete_for(chrono::NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()));
    }
}
