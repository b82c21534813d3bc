use epe_common::MinorUnits;
use escrow_payment_engine::db_types::{CompletingParty, EntryId, OrderId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizeEscrowRequest {
    pub order_id: OrderId,
    pub entry_ids: Vec<EntryId>,
    /// Optional caller-supplied idempotency key. When absent a deterministic key is derived from
    /// the entry-id set, so retries are safe either way.
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseEscrowRequest {
    pub order_id: OrderId,
    pub hold_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutRequestParams {
    pub provider_id: String,
    /// Soft cap on the payout amount. The full available total is paid when absent.
    #[serde(default)]
    pub amount: Option<MinorUnits>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteOrderParams {
    pub completed_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkCompleteParams {
    pub party: CompletingParty,
}

/// Wraps a typed result with the success flag every endpoint returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse<T> {
    pub success: bool,
    #[serde(flatten)]
    pub result: T,
}

impl<T> SuccessResponse<T> {
    pub fn new(result: T) -> Self {
        Self { success: true, result }
    }
}
