use epe_common::MinorUnits;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::db_types::OrderId;

/// Classification of a gateway failure. Callers branch on this instead of string-matching
/// messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatewayErrorKind {
    /// The gateway rejected the request outright (invalid destination account, card declined).
    /// Retrying the same request will fail again.
    Declined,
    /// A network or rate-limit failure. The request may be retried with the same idempotency
    /// key.
    Transient,
    /// The outcome is unknown (timeout, ambiguous response). The request must not be blindly
    /// retried without an idempotency key; reconciliation resolves the ambiguity.
    Unknown,
}

/// A gateway failure with the gateway's own code and message preserved verbatim for support
/// diagnosis.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("Payment gateway error ({code}): {message}")]
pub struct GatewayError {
    pub kind: GatewayErrorKind,
    pub code: String,
    pub message: String,
}

impl GatewayError {
    pub fn declined<C: Into<String>, M: Into<String>>(code: C, message: M) -> Self {
        Self { kind: GatewayErrorKind::Declined, code: code.into(), message: message.into() }
    }

    pub fn transient<C: Into<String>, M: Into<String>>(code: C, message: M) -> Self {
        Self { kind: GatewayErrorKind::Transient, code: code.into(), message: message.into() }
    }

    pub fn unknown<C: Into<String>, M: Into<String>>(code: C, message: M) -> Self {
        Self { kind: GatewayErrorKind::Unknown, code: code.into(), message: message.into() }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind == GatewayErrorKind::Transient
    }
}

/// Request for an authorization-only hold. The gateway reserves `amount` from the customer,
/// earmarks `platform_fee` for the platform and the remainder for `destination_account`, but
/// moves nothing until the hold is captured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldRequest {
    pub order_id: OrderId,
    pub amount: MinorUnits,
    pub currency: String,
    pub destination_account: String,
    pub platform_fee: MinorUnits,
    pub idempotency_key: String,
}

/// A hold as acknowledged by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayHold {
    pub hold_id: String,
    pub amount: MinorUnits,
    pub status: GatewayObjectStatus,
}

/// Result of capturing a hold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureResult {
    pub hold_id: String,
    pub captured_amount: MinorUnits,
    pub status: GatewayObjectStatus,
}

/// Request for an immediate transfer to a provider's connected account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    pub amount: MinorUnits,
    pub currency: String,
    pub destination_account: String,
    pub metadata: Value,
}

/// Request for a bank payout of accumulated provider earnings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutRequest {
    pub amount: MinorUnits,
    pub currency: String,
    pub destination_account: String,
    pub metadata: Value,
    pub idempotency_key: String,
}

/// Status of a gateway-side object, as reported by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayObjectStatus {
    RequiresCapture,
    Succeeded,
    Pending,
    Failed,
    Canceled,
    Unknown,
}

/// The contract the engine requires from the payment gateway. All amounts are integer minor
/// currency units in the order's settlement currency.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway: Clone {
    /// Reserve funds without capturing them. Idempotent on `idempotency_key`: retrying with the
    /// same key returns the original hold rather than double-reserving funds.
    async fn authorize_hold(&self, request: HoldRequest) -> Result<GatewayHold, GatewayError>;

    /// Convert a hold into an actual funds movement.
    async fn capture_hold(&self, hold_id: &str) -> Result<CaptureResult, GatewayError>;

    /// Immediately transfer `amount` to the destination account.
    async fn create_transfer(&self, request: TransferRequest) -> Result<String, GatewayError>;

    /// Request a bank payout to the destination account. Idempotent on `idempotency_key`.
    async fn create_payout(&self, request: PayoutRequest) -> Result<String, GatewayError>;

    /// Fetch the gateway's current view of an object's status. Used by reconciliation when an
    /// earlier call had an ambiguous outcome.
    async fn retrieve_object(&self, id: &str) -> Result<GatewayObjectStatus, GatewayError>;
}
