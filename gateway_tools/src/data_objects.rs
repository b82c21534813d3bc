//! Wire objects for the gateway's REST API.
use epe_common::MinorUnits;
use escrow_payment_engine::GatewayObjectStatus;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldResource {
    pub id: String,
    pub amount: MinorUnits,
    pub currency: String,
    pub status: GatewayObjectStatus,
    #[serde(default)]
    pub amount_captured: Option<MinorUnits>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferResource {
    pub id: String,
    pub amount: MinorUnits,
    pub destination: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutResource {
    pub id: String,
    pub amount: MinorUnits,
    pub destination: String,
    pub status: GatewayObjectStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectResource {
    pub id: String,
    pub object: String,
    pub status: GatewayObjectStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}
