use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    db_types::OrderId,
    traits::{EscrowLedgerError, GatewayError, GatewayErrorKind},
};

/// Error type for all engine APIs. Every variant maps onto one error class of the taxonomy
/// ([`ErrorKind`]), so callers can branch on retryability without string-matching messages.
#[derive(Debug, Clone, Error)]
pub enum EscrowApiError {
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("{0}")]
    Gateway(#[from] GatewayError),
    #[error("State conflict. Expected {expected}, but the record is {actual}")]
    StateConflict { expected: String, actual: String },
    #[error("No orders are eligible for payout for provider {0}")]
    NoEligibleOrders(String),
    #[error("Provider {0} has no payout account on file")]
    NoPayoutAccount(String),
    #[error("{0}")]
    PartialBatch(PartialBatchError),
    #[error("Ledger error: {0}")]
    Ledger(EscrowLedgerError),
}

/// The error classes of the engine. `GatewayUnknown` is deliberately distinct from both success
/// and failure: the gateway outcome is ambiguous and must be reconciled, not retried blindly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Validation,
    NotFound,
    StateConflict,
    GatewayDeclined,
    GatewayTransient,
    GatewayUnknown,
    PartialBatch,
    Internal,
}

impl EscrowApiError {
    pub fn conflict<E: ToString, A: ToString>(expected: E, actual: A) -> Self {
        Self::StateConflict { expected: expected.to_string(), actual: actual.to_string() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::NoEligibleOrders(_) | Self::NoPayoutAccount(_) => ErrorKind::Validation,
            Self::OrderNotFound(_) => ErrorKind::NotFound,
            Self::StateConflict { .. } => ErrorKind::StateConflict,
            Self::Gateway(e) => match e.kind {
                GatewayErrorKind::Declined => ErrorKind::GatewayDeclined,
                GatewayErrorKind::Transient => ErrorKind::GatewayTransient,
                GatewayErrorKind::Unknown => ErrorKind::GatewayUnknown,
            },
            Self::PartialBatch(_) => ErrorKind::PartialBatch,
            Self::Ledger(_) => ErrorKind::Internal,
        }
    }

    /// True only for failures where an identical retry (with the same idempotency key) is safe
    /// and has a chance of succeeding.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::GatewayTransient
    }
}

impl From<EscrowLedgerError> for EscrowApiError {
    fn from(e: EscrowLedgerError) -> Self {
        match e {
            EscrowLedgerError::OrderNotFound(oid) => Self::OrderNotFound(oid),
            EscrowLedgerError::StateConflict { expected, actual } => Self::StateConflict { expected, actual },
            EscrowLedgerError::InvalidRecord(msg) => Self::Validation(msg),
            // referencing a non-existent entry or hold is a caller error, not a backend fault
            EscrowLedgerError::EntryNotFound(id) => Self::Validation(format!("time entry {id} does not exist")),
            EscrowLedgerError::HoldNotFound(id) => Self::Validation(format!("escrow hold {id} does not exist")),
            other => Self::Ledger(other),
        }
    }
}

/// A batch operation that succeeded at the gateway but could not be fully recorded in the
/// ledger, or that completed only partially. The money movement has already happened and cannot
/// be rolled back; this error carries everything needed to replay the failed subset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartialBatchError {
    /// The gateway payout id, when the failure happened after the payout was requested.
    pub payout_id: Option<String>,
    /// The orders whose ledger state may not reflect the gateway state.
    pub order_ids: Vec<OrderId>,
    pub detail: String,
}

impl Display for PartialBatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Partial batch failure: {}", self.detail)?;
        if let Some(pid) = &self.payout_id {
            write!(f, " (gateway payout {pid})")?;
        }
        if !self.order_ids.is_empty() {
            let ids = self.order_ids.iter().map(OrderId::as_str).collect::<Vec<_>>().join(", ");
            write!(f, " affecting orders [{ids}]")?;
        }
        Ok(())
    }
}
