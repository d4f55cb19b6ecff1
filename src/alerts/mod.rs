//! Advisory alerts requiring explicit human disposition
//!
//! Alerts are never auto-applied: resolving one returns the cleanup
//! action coupled to it (by alert id) for the upstream collaborator to
//! execute. The engine itself does not delete invoices or documents.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::traits::ReconciliationStorage;
use crate::types::*;

/// Cleanup action coupled to an alert's resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action")]
pub enum CleanupAction {
    /// Delete the superseded duplicate record upstream
    DeleteSupersededRecord { invoice_id: String },
}

/// Alert manager over the storage seam
pub struct AlertManager<S: ReconciliationStorage> {
    storage: S,
}

impl<S: ReconciliationStorage> AlertManager<S> {
    /// Create a new alert manager
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Raise a pending alert
    pub async fn raise(
        &mut self,
        kind: AlertKind,
        invoice_id: Option<String>,
        message: &str,
    ) -> ReconcileResult<Alert> {
        let alert = Alert::new(kind, invoice_id, message.to_string());
        self.storage.save_alert(&alert).await?;
        info!(alert_id = %alert.id, ?kind, "alert raised");
        Ok(alert)
    }

    /// Get an alert by ID, returning an error if not found
    pub async fn get_alert_required(&self, alert_id: &str) -> ReconcileResult<Alert> {
        self.storage
            .get_alert(alert_id)
            .await?
            .ok_or_else(|| ReconcileError::AlertNotFound(alert_id.to_string()))
    }

    /// List all pending alerts
    pub async fn list_pending(&self) -> ReconcileResult<Vec<Alert>> {
        self.storage.list_alerts(Some(AlertStatus::Pending)).await
    }

    /// Resolve a pending alert, returning the coupled cleanup action the
    /// caller must carry out
    pub async fn resolve(&mut self, alert_id: &str) -> ReconcileResult<Option<CleanupAction>> {
        let mut alert = self.get_alert_required(alert_id).await?;
        if alert.status != AlertStatus::Pending {
            return Err(ReconcileError::Validation(format!(
                "Alert '{}' has already been dispositioned",
                alert_id
            )));
        }

        alert.status = AlertStatus::Resolved;
        alert.resolved_at = Some(chrono::Utc::now().naive_utc());
        self.storage.update_alert(&alert).await?;
        info!(alert_id, "alert resolved");

        let cleanup = match (alert.kind, alert.invoice_id) {
            (AlertKind::DuplicateSuperseded, Some(invoice_id)) => {
                Some(CleanupAction::DeleteSupersededRecord { invoice_id })
            }
            _ => None,
        };
        Ok(cleanup)
    }

    /// Dismiss a pending alert without any cleanup
    pub async fn ignore(&mut self, alert_id: &str) -> ReconcileResult<()> {
        let mut alert = self.get_alert_required(alert_id).await?;
        if alert.status != AlertStatus::Pending {
            return Err(ReconcileError::Validation(format!(
                "Alert '{}' has already been dispositioned",
                alert_id
            )));
        }

        alert.status = AlertStatus::Ignored;
        alert.resolved_at = Some(chrono::Utc::now().naive_utc());
        self.storage.update_alert(&alert).await?;
        info!(alert_id, "alert ignored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_storage::MemoryStorage;

    #[tokio::test]
    async fn resolve_couples_cleanup_by_id() {
        let storage = MemoryStorage::new();
        let mut alerts = AlertManager::new(storage);

        let alert = alerts
            .raise(
                AlertKind::DuplicateSuperseded,
                Some("inv-dup".to_string()),
                "Duplicate F24 superseded by correction",
            )
            .await
            .unwrap();

        let cleanup = alerts.resolve(&alert.id).await.unwrap();
        assert_eq!(
            cleanup,
            Some(CleanupAction::DeleteSupersededRecord {
                invoice_id: "inv-dup".to_string()
            })
        );

        // A second disposition is rejected
        assert!(alerts.resolve(&alert.id).await.is_err());
    }

    #[tokio::test]
    async fn ignore_has_no_cleanup_and_is_final() {
        let storage = MemoryStorage::new();
        let mut alerts = AlertManager::new(storage);

        let alert = alerts
            .raise(AlertKind::ManualReview, None, "Uncertain match")
            .await
            .unwrap();

        alerts.ignore(&alert.id).await.unwrap();
        let stored = alerts.get_alert_required(&alert.id).await.unwrap();
        assert_eq!(stored.status, AlertStatus::Ignored);
        assert!(stored.resolved_at.is_some());

        assert!(alerts.ignore(&alert.id).await.is_err());
        assert!(alerts.list_pending().await.unwrap().is_empty());
    }
}
