//! Result objects returned by the engine APIs.
use epe_common::MinorUnits;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{EntryId, EscrowHold, OrderId, PayoutStatus},
    traits::GatewayError,
};

/// Result of a successful (or idempotently replayed) hold authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizedHold {
    pub hold_id: String,
    pub order_id: OrderId,
    pub entry_ids: Vec<EntryId>,
    pub gross_amount: MinorUnits,
    pub platform_fee: MinorUnits,
    pub provider_net: MinorUnits,
}

impl From<EscrowHold> for AuthorizedHold {
    fn from(hold: EscrowHold) -> Self {
        Self {
            hold_id: hold.hold_id,
            order_id: hold.order_id,
            entry_ids: hold.entry_ids,
            gross_amount: hold.gross_amount,
            platform_fee: hold.platform_fee,
            provider_net: hold.provider_net,
        }
    }
}

/// One hold that was captured during a release batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleasedHold {
    pub hold_id: String,
    pub amount: MinorUnits,
    pub entry_ids: Vec<EntryId>,
}

/// One hold that could not be captured during a release batch. The gateway's code and message
/// are preserved for remediation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedHold {
    pub hold_id: String,
    pub error: GatewayError,
}

/// Outcome of a release batch. Holds are financially independent, so one failure never blocks or
/// rolls back another hold's success; both groups are enumerated exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseResult {
    pub order_id: OrderId,
    pub released: Vec<ReleasedHold>,
    pub failed: Vec<FailedHold>,
}

impl ReleaseResult {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    pub fn released_amount(&self) -> MinorUnits {
        self.released.iter().map(|h| h.amount).sum()
    }
}

/// Summary of a requested payout batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutSummary {
    pub payout_id: String,
    pub provider_id: String,
    pub amount: MinorUnits,
    pub order_count: usize,
    pub order_ids: Vec<OrderId>,
}

/// One order's contribution to the available payout total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutOrderSummary {
    pub order_id: OrderId,
    pub net_amount: MinorUnits,
}

/// The provider's currently payable earnings. Pure read; calling this never changes anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailablePayout {
    pub provider_id: String,
    pub total: MinorUnits,
    pub orders: Vec<PayoutOrderSummary>,
}

/// Outcome of the direct-transfer completion path. `transfer_id` is `None` when the transfer
/// failed and the payout is awaiting administrative retry; the completion itself still stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionResult {
    pub order_id: OrderId,
    pub transfer_id: Option<String>,
    pub payout_status: PayoutStatus,
}
