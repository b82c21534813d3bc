use epe_common::MinorUnits;
use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderId};

/// Emitted when an order reaches `Completed`, either via the direct-transfer path or once its
/// escrow release batch has been processed. Notification delivery subscribes here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCompletedEvent {
    pub order: Order,
}

impl OrderCompletedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Emitted after a release batch has been attempted. Carries the split between holds that were
/// captured and holds that failed, for out-of-band remediation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowReleasedEvent {
    pub order_id: OrderId,
    pub released_amount: MinorUnits,
    pub released_holds: Vec<String>,
    pub failed_holds: Vec<String>,
}

/// Emitted once a payout has been requested at the gateway and recorded in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutRequestedEvent {
    pub provider_id: String,
    pub payout_id: String,
    pub amount: MinorUnits,
    pub order_ids: Vec<OrderId>,
}
