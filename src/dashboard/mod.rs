//! Dashboard aggregation: status counts over the invoice snapshot
//!
//! Pure reads with no side effects; after a transition commits, the next
//! read reflects it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::traits::ReconciliationStorage;
use crate::types::{ReconcileResult, ReconciliationStatus};

/// Invoice counts grouped by reconciliation status
pub async fn counts_by_status<S: ReconciliationStorage>(
    storage: &S,
) -> ReconcileResult<HashMap<ReconciliationStatus, usize>> {
    let invoices = storage.list_invoices(None).await?;
    let mut counts: HashMap<ReconciliationStatus, usize> = HashMap::new();
    for invoice in invoices {
        *counts.entry(invoice.reconciliation_status).or_default() += 1;
    }
    Ok(counts)
}

/// Snapshot report of the reconciliation workload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusBreakdown {
    pub counts: HashMap<ReconciliationStatus, usize>,
    /// All invoices known to the engine
    pub total: usize,
    /// Invoices still needing attention (not reconciled, not locked)
    pub open: usize,
}

/// Build a status breakdown from the current invoice snapshot
pub async fn status_breakdown<S: ReconciliationStorage>(
    storage: &S,
) -> ReconcileResult<StatusBreakdown> {
    let counts = counts_by_status(storage).await?;
    let total = counts.values().sum();
    let open = counts
        .iter()
        .filter(|(status, _)| status.is_reanalyzable())
        .map(|(_, n)| n)
        .sum();
    Ok(StatusBreakdown {
        counts,
        total,
        open,
    })
}
