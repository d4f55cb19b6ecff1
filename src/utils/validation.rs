//! Validation utilities

use bigdecimal::BigDecimal;

use crate::traits::InvoiceValidator;
use crate::types::*;

/// Validate that an amount is positive
pub fn validate_positive_amount(amount: &BigDecimal) -> ReconcileResult<()> {
    if *amount <= BigDecimal::from(0) {
        Err(ReconcileError::Validation(
            "Amount must be positive".to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Validate that an invoice ID is valid
pub fn validate_invoice_id(invoice_id: &str) -> ReconcileResult<()> {
    if invoice_id.trim().is_empty() {
        return Err(ReconcileError::Validation(
            "Invoice ID cannot be empty".to_string(),
        ));
    }

    if invoice_id.len() > 50 {
        return Err(ReconcileError::Validation(
            "Invoice ID cannot exceed 50 characters".to_string(),
        ));
    }

    Ok(())
}

/// Validate that a counterparty name is usable for matching
pub fn validate_counterparty(name: &str) -> ReconcileResult<()> {
    if name.trim().is_empty() {
        return Err(ReconcileError::Validation(
            "Counterparty cannot be empty".to_string(),
        ));
    }

    if name.len() > 200 {
        return Err(ReconcileError::Validation(
            "Counterparty cannot exceed 200 characters".to_string(),
        ));
    }

    Ok(())
}

/// Validate a manual-lock reason
pub fn validate_lock_reason(reason: &str) -> ReconcileResult<()> {
    if reason.trim().is_empty() {
        return Err(ReconcileError::Validation(
            "Lock reason cannot be empty".to_string(),
        ));
    }

    if reason.len() > 500 {
        return Err(ReconcileError::Validation(
            "Lock reason cannot exceed 500 characters".to_string(),
        ));
    }

    Ok(())
}

/// Enhanced invoice validator with detailed checks
pub struct EnhancedInvoiceValidator;

impl InvoiceValidator for EnhancedInvoiceValidator {
    fn validate_invoice(&self, invoice: &Invoice) -> ReconcileResult<()> {
        validate_invoice_id(&invoice.id)?;
        validate_positive_amount(&invoice.total_amount)?;
        validate_counterparty(&invoice.counterparty)?;

        if let Some(reason) = &invoice.lock_reason {
            validate_lock_reason(reason)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_amounts() {
        assert!(validate_positive_amount(&BigDecimal::from(0)).is_err());
        assert!(validate_positive_amount(&BigDecimal::from(-5)).is_err());
        assert!(validate_positive_amount(&BigDecimal::from(1)).is_ok());
    }

    #[test]
    fn rejects_blank_lock_reason() {
        assert!(validate_lock_reason("   ").is_err());
        assert!(validate_lock_reason("duplicate under review").is_ok());
    }
}
