//! Reconciliation state machine: transition table and evidence routing
//!
//! The status lifecycle is driven by an explicit state x event table, so
//! an invalid transition is a single guard check rather than an `if`
//! fallthrough scattered across call sites. Routing from scoring evidence
//! to a target status is a pure function over the evidence, testable in
//! isolation from storage.

use crate::matching::MatchClassification;
use crate::types::{
    MatchProposal, PaymentMethod, ReconcileError, ReconcileResult, ReconciliationStatus,
    TransitionEvent,
};

use ReconciliationStatus::*;
use TransitionEvent::*;

/// Whether `event` may be applied to an invoice in `status`
pub fn is_allowed(status: ReconciliationStatus, event: TransitionEvent) -> bool {
    match (status, event) {
        // Declaring a payment method is the only way out of the initial state
        (InAttesaConferma, ConfirmMethod) => true,
        (_, ConfirmMethod) => false,

        // Move confirmation/rejection only from the two proposal states
        (DaVerificareSpostamento | DaVerificareMatchIncerto, ApplyMove) => true,
        (_, ApplyMove) => false,

        // Re-analysis from any non-locked, non-reconciled state
        (Riconciliata | LockManuale, Reanalyze) => false,
        (_, Reanalyze) => true,

        // A human can freeze anything that is not already settled;
        // re-locking is handled idempotently by the engine
        (Riconciliata, Lock) => false,
        (_, Lock) => true,

        // Only an explicit human unlock leaves the locked state
        (LockManuale, Unlock) => true,
        (_, Unlock) => false,
    }
}

/// Guard check that reports the violated transition without mutating
pub fn check(status: ReconciliationStatus, event: TransitionEvent) -> ReconcileResult<()> {
    if is_allowed(status, event) {
        Ok(())
    } else {
        Err(ReconcileError::InvalidStateTransition {
            current: status,
            event,
        })
    }
}

/// Result of routing scoring evidence for one invoice
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    /// Confident match in the declared ledger: reconcile and claim
    Reconciled(MatchProposal),
    /// Declared cash but the confident evidence is in the bank ledger
    ProposedMove(MatchProposal),
    /// Uncertain-score match needing human adjudication
    Uncertain(MatchProposal),
    /// Declared bank, no evidence, statement history still incomplete
    Suspended,
    /// Declared bank, statement complete, no evidence: genuine discrepancy
    Anomaly,
    /// Declared cash with no ledger evidence at all; an empty cash book is
    /// not proof of anomaly the way a complete bank statement is
    NoEvidence,
}

impl AnalysisOutcome {
    /// Target status for this outcome given the declared method
    pub fn target_status(&self, method: PaymentMethod) -> ReconciliationStatus {
        match self {
            AnalysisOutcome::Reconciled(_) => Riconciliata,
            AnalysisOutcome::ProposedMove(_) => DaVerificareSpostamento,
            AnalysisOutcome::Uncertain(_) => DaVerificareMatchIncerto,
            AnalysisOutcome::Suspended => SospesaAttesaEstratto,
            AnalysisOutcome::Anomaly => AnomaliaNonInEstratto,
            AnalysisOutcome::NoEvidence => match method {
                PaymentMethod::Bank => ConfermataBanca,
                PaymentMethod::Cash => ConfermataCassa,
                // No declaration yet: re-analysis must not invent one
                PaymentMethod::Unset => InAttesaConferma,
            },
        }
    }
}

/// Route scoring evidence to an outcome
///
/// `declared_best` is the top candidate from the ledger matching the
/// declared method; `cross_best` is the top candidate from the bank
/// ledger, scanned only for cash declarations to catch
/// cash-declared-but-actually-paid-by-bank cases. `bank_complete` states
/// whether the bank feed is known complete through the relevant period;
/// it is what escalates a suspension into an anomaly.
pub fn route_analysis(
    method: PaymentMethod,
    declared_best: Option<(MatchClassification, MatchProposal)>,
    cross_best: Option<(MatchClassification, MatchProposal)>,
    bank_complete: bool,
) -> AnalysisOutcome {
    match method {
        PaymentMethod::Cash => {
            // Declared-ledger confidence wins over a cross-ledger move
            if let Some((MatchClassification::Confident, p)) = &declared_best {
                return AnalysisOutcome::Reconciled(p.clone());
            }
            if let Some((MatchClassification::Confident, p)) = &cross_best {
                return AnalysisOutcome::ProposedMove(p.clone());
            }
            // Strongest uncertain candidate from either ledger
            let uncertain = match (&declared_best, &cross_best) {
                (Some((_, a)), Some((_, b))) => {
                    Some(if b.score > a.score { b.clone() } else { a.clone() })
                }
                (Some((_, a)), None) => Some(a.clone()),
                (None, Some((_, b))) => Some(b.clone()),
                (None, None) => None,
            };
            match uncertain {
                Some(p) => AnalysisOutcome::Uncertain(p),
                None => AnalysisOutcome::NoEvidence,
            }
        }
        PaymentMethod::Bank => match declared_best {
            Some((MatchClassification::Confident, p)) => AnalysisOutcome::Reconciled(p),
            Some((MatchClassification::Uncertain, p)) => AnalysisOutcome::Uncertain(p),
            None if bank_complete => AnalysisOutcome::Anomaly,
            None => AnalysisOutcome::Suspended,
        },
        // No declared method: nothing to score against
        PaymentMethod::Unset => AnalysisOutcome::NoEvidence,
    }
}
