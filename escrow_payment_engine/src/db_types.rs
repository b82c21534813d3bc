//! Data types used in the ledger database. These are public; everything else about the storage
//! layer is hidden behind the [`crate::traits::EscrowLedger`] trait.
use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use epe_common::{MinorUnits, DEFAULT_CURRENCY_CODE};
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid conversion: {0}")]
pub struct ConversionError(pub String);

//--------------------------------------      OrderId        ---------------------------------------------------------
/// A lightweight wrapper around the marketplace's order identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl<S: Into<String>> From<S> for OrderId {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

//--------------------------------------      EntryId        ---------------------------------------------------------
/// Identifier of a time entry within an order's time-tracking record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct EntryId(pub String);

impl<S: Into<String>> From<S> for EntryId {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

impl Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl EntryId {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

//--------------------------------------   OrderStatusType     -------------------------------------------------------
/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// The order has been placed, no work has started.
    New,
    /// The provider has started work on the order.
    InProgress,
    /// The provider has delivered and is awaiting the customer's sign-off.
    Delivered,
    /// Both parties have signed off. The order is fully complete.
    Completed,
    /// The order was cancelled by the customer or an admin.
    Cancelled,
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::New => write!(f, "New"),
            OrderStatusType::InProgress => write!(f, "InProgress"),
            OrderStatusType::Delivered => write!(f, "Delivered"),
            OrderStatusType::Completed => write!(f, "Completed"),
            OrderStatusType::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "New" => Ok(OrderStatusType::New),
            "InProgress" => Ok(OrderStatusType::InProgress),
            "Delivered" => Ok(OrderStatusType::Delivered),
            "Completed" => Ok(OrderStatusType::Completed),
            "Cancelled" => Ok(OrderStatusType::Cancelled),
            _ => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to New");
            OrderStatusType::New
        })
    }
}

//--------------------------------------    PayoutStatus       -------------------------------------------------------
/// Where an order's provider earnings sit on the path to the provider's bank account. Only ever
/// advances; administrative corrections bypass the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PayoutStatus {
    /// No payout activity yet.
    None,
    /// The order's net amount may be included in the next payout batch.
    AvailableForPayout,
    /// A payout covering this order has been requested at the gateway.
    PayoutRequested,
    /// The net amount has been transferred to the provider directly.
    Transferred,
    /// A direct transfer was attempted and failed. Awaiting administrative retry.
    Pending,
}

impl Display for PayoutStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayoutStatus::None => write!(f, "None"),
            PayoutStatus::AvailableForPayout => write!(f, "AvailableForPayout"),
            PayoutStatus::PayoutRequested => write!(f, "PayoutRequested"),
            PayoutStatus::Transferred => write!(f, "Transferred"),
            PayoutStatus::Pending => write!(f, "Pending"),
        }
    }
}

impl FromStr for PayoutStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "None" => Ok(PayoutStatus::None),
            "AvailableForPayout" => Ok(PayoutStatus::AvailableForPayout),
            "PayoutRequested" => Ok(PayoutStatus::PayoutRequested),
            "Transferred" => Ok(PayoutStatus::Transferred),
            "Pending" => Ok(PayoutStatus::Pending),
            _ => Err(ConversionError(format!("Invalid payout status: {s}"))),
        }
    }
}

//--------------------------------------  TimeEntryStatus      -------------------------------------------------------
/// State machine for a logged unit of work. Only forward transitions are legal:
/// `Logged → CustomerApproved → EscrowAuthorized → EscrowReleased`, with `EscrowFailed` as a
/// parallel terminal state reachable from `EscrowAuthorized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum TimeEntryStatus {
    /// Logged by the provider, not yet approved by the customer.
    Logged,
    /// The customer has approved the entry for billing.
    CustomerApproved,
    /// A gateway hold covering this entry has been authorized but not captured.
    EscrowAuthorized,
    /// The covering hold was captured and the funds released.
    EscrowReleased,
    /// The covering hold failed or was voided out of band.
    EscrowFailed,
}

impl Display for TimeEntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeEntryStatus::Logged => write!(f, "Logged"),
            TimeEntryStatus::CustomerApproved => write!(f, "CustomerApproved"),
            TimeEntryStatus::EscrowAuthorized => write!(f, "EscrowAuthorized"),
            TimeEntryStatus::EscrowReleased => write!(f, "EscrowReleased"),
            TimeEntryStatus::EscrowFailed => write!(f, "EscrowFailed"),
        }
    }
}

impl FromStr for TimeEntryStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Logged" => Ok(TimeEntryStatus::Logged),
            "CustomerApproved" => Ok(TimeEntryStatus::CustomerApproved),
            "EscrowAuthorized" => Ok(TimeEntryStatus::EscrowAuthorized),
            "EscrowReleased" => Ok(TimeEntryStatus::EscrowReleased),
            "EscrowFailed" => Ok(TimeEntryStatus::EscrowFailed),
            _ => Err(ConversionError(format!("Invalid time entry status: {s}"))),
        }
    }
}

//--------------------------------------   EntryCategory       -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum EntryCategory {
    /// Work covered by the order's original price.
    Base,
    /// Supplemental billable hours. Only these are escrow-funded.
    Additional,
}

impl Display for EntryCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryCategory::Base => write!(f, "Base"),
            EntryCategory::Additional => write!(f, "Additional"),
        }
    }
}

impl FromStr for EntryCategory {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Base" => Ok(EntryCategory::Base),
            "Additional" => Ok(EntryCategory::Additional),
            _ => Err(ConversionError(format!("Invalid entry category: {s}"))),
        }
    }
}

//--------------------------------------  EscrowHoldStatus     -------------------------------------------------------
/// Status of a gateway hold. Monotonic: `Authorized → Released` or `Authorized → Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum EscrowHoldStatus {
    Authorized,
    Released,
    Failed,
}

impl Display for EscrowHoldStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EscrowHoldStatus::Authorized => write!(f, "Authorized"),
            EscrowHoldStatus::Released => write!(f, "Released"),
            EscrowHoldStatus::Failed => write!(f, "Failed"),
        }
    }
}

impl FromStr for EscrowHoldStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Authorized" => Ok(EscrowHoldStatus::Authorized),
            "Released" => Ok(EscrowHoldStatus::Released),
            "Failed" => Ok(EscrowHoldStatus::Failed),
            _ => Err(ConversionError(format!("Invalid escrow hold status: {s}"))),
        }
    }
}

//-------------------------------------- PayoutBatchStatus     -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PayoutBatchStatus {
    /// The payout has been requested at the gateway.
    Requested,
    /// The gateway reported the payout as settled.
    Completed,
    /// The gateway reported the payout as failed.
    Failed,
}

impl Display for PayoutBatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayoutBatchStatus::Requested => write!(f, "Requested"),
            PayoutBatchStatus::Completed => write!(f, "Completed"),
            PayoutBatchStatus::Failed => write!(f, "Failed"),
        }
    }
}

impl FromStr for PayoutBatchStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Requested" => Ok(PayoutBatchStatus::Requested),
            "Completed" => Ok(PayoutBatchStatus::Completed),
            "Failed" => Ok(PayoutBatchStatus::Failed),
            _ => Err(ConversionError(format!("Invalid payout batch status: {s}"))),
        }
    }
}

//--------------------------------------  CompletingParty      -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletingParty {
    Customer,
    Provider,
}

impl Display for CompletingParty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompletingParty::Customer => write!(f, "customer"),
            CompletingParty::Provider => write!(f, "provider"),
        }
    }
}

//--------------------------------------  CompletionState      -------------------------------------------------------
/// Dual-confirmation state for an order. `both_parties_complete` is true exactly when both flags
/// are true, and is the sole trigger condition for escrow release.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionState {
    pub customer_marked_complete: bool,
    pub provider_marked_complete: bool,
    pub both_parties_complete: bool,
    pub escrow_release_initiated: bool,
}

impl Display for CompletionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "customer: {}, provider: {}",
            self.customer_marked_complete, self.provider_marked_complete
        )
    }
}

//--------------------------------------       Order           -------------------------------------------------------
/// One unit of work between a customer and a provider, as stored in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    pub customer_id: String,
    pub provider_id: String,
    pub status: OrderStatusType,
    pub currency: String,
    /// Total paid by the buyer at order placement, in minor units.
    pub total_amount: MinorUnits,
    /// The explicit commission field. Preferred over `service_fee` when both are populated.
    pub provider_commission: Option<MinorUnits>,
    /// Legacy fee field, still populated on older orders.
    pub service_fee: Option<MinorUnits>,
    /// Provider earnings from released escrow holds, paid out with the order's net amount.
    pub supplemental_payout: MinorUnits,
    /// The provider's connected payout account at the gateway.
    pub payout_account: Option<String>,
    pub payout_status: PayoutStatus,
    /// Gateway payout id stamped on the order when it joins a payout batch.
    pub payout_id: Option<String>,
    /// Gateway transfer id stamped on the order by the direct-transfer completion path.
    pub transfer_id: Option<String>,
    pub customer_marked_complete: bool,
    pub provider_marked_complete: bool,
    pub both_parties_complete: bool,
    pub escrow_release_initiated: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// The platform's cut of this order. The explicit commission field wins; the legacy service
    /// fee field is the fallback for orders written before the commission field existed.
    pub fn platform_fee(&self) -> MinorUnits {
        self.provider_commission.or(self.service_fee).unwrap_or_default()
    }

    /// The amount owed to the provider: the buyer total less the platform fee, plus any
    /// supplemental-hours earnings released from escrow.
    pub fn net_amount(&self) -> MinorUnits {
        self.total_amount - self.platform_fee() + self.supplemental_payout
    }

    pub fn completion(&self) -> CompletionState {
        CompletionState {
            customer_marked_complete: self.customer_marked_complete,
            provider_marked_complete: self.provider_marked_complete,
            both_parties_complete: self.both_parties_complete,
            escrow_release_initiated: self.escrow_release_initiated,
        }
    }
}

//--------------------------------------      NewOrder         -------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub order_id: OrderId,
    pub customer_id: String,
    pub provider_id: String,
    pub total_amount: MinorUnits,
    pub currency: String,
    pub provider_commission: Option<MinorUnits>,
    pub service_fee: Option<MinorUnits>,
    pub payout_account: Option<String>,
}

impl NewOrder {
    pub fn new<I: Into<OrderId>>(order_id: I, customer_id: &str, provider_id: &str, total_amount: MinorUnits) -> Self {
        Self {
            order_id: order_id.into(),
            customer_id: customer_id.to_string(),
            provider_id: provider_id.to_string(),
            total_amount,
            currency: DEFAULT_CURRENCY_CODE.to_string(),
            provider_commission: None,
            service_fee: None,
            payout_account: None,
        }
    }

    pub fn with_commission(mut self, fee: MinorUnits) -> Self {
        self.provider_commission = Some(fee);
        self
    }

    pub fn with_service_fee(mut self, fee: MinorUnits) -> Self {
        self.service_fee = Some(fee);
        self
    }

    pub fn with_payout_account(mut self, account: &str) -> Self {
        self.payout_account = Some(account.to_string());
        self
    }

    /// Field-level validation, applied before the record is written.
    pub fn validate(&self) -> Result<(), ConversionError> {
        if self.order_id.as_str().is_empty() {
            return Err(ConversionError("order_id must not be empty".into()));
        }
        if self.customer_id.is_empty() || self.provider_id.is_empty() {
            return Err(ConversionError("customer_id and provider_id must not be empty".into()));
        }
        if self.total_amount.value() < 0 {
            return Err(ConversionError("total_amount must not be negative".into()));
        }
        let fee = self.provider_commission.or(self.service_fee).unwrap_or_default();
        if fee > self.total_amount {
            return Err(ConversionError(format!(
                "platform fee ({fee}) may not exceed the order total ({})",
                self.total_amount
            )));
        }
        Ok(())
    }
}

//--------------------------------------     TimeEntry         -------------------------------------------------------
/// A logged unit of work within an order's time-tracking record. Entries are never deleted; the
/// full history is retained for audit.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct TimeEntry {
    pub id: i64,
    pub entry_id: EntryId,
    pub order_id: OrderId,
    pub category: EntryCategory,
    pub status: TimeEntryStatus,
    pub billable_amount: MinorUnits,
    pub hours: f64,
    /// Gateway id of the hold covering this entry, set when the entry is escrow-authorized.
    pub escrow_hold_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------    NewTimeEntry       -------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTimeEntry {
    pub entry_id: EntryId,
    pub order_id: OrderId,
    pub category: EntryCategory,
    pub billable_amount: MinorUnits,
    pub hours: f64,
}

impl NewTimeEntry {
    pub fn new<I: Into<EntryId>, O: Into<OrderId>>(
        entry_id: I,
        order_id: O,
        category: EntryCategory,
        billable_amount: MinorUnits,
        hours: f64,
    ) -> Self {
        Self { entry_id: entry_id.into(), order_id: order_id.into(), category, billable_amount, hours }
    }

    pub fn validate(&self) -> Result<(), ConversionError> {
        if self.entry_id.as_str().is_empty() {
            return Err(ConversionError("entry_id must not be empty".into()));
        }
        if self.billable_amount.value() < 0 {
            return Err(ConversionError("billable_amount must not be negative".into()));
        }
        if self.hours < 0.0 {
            return Err(ConversionError("hours must not be negative".into()));
        }
        Ok(())
    }
}

//--------------------------------------     EscrowHold        -------------------------------------------------------
/// One authorized-but-not-captured hold at the gateway. The ledger row is the durable record; the
/// gateway is momentarily authoritative for whether the money is actually held.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscrowHold {
    pub id: i64,
    /// Gateway-issued hold identifier.
    pub hold_id: String,
    pub order_id: OrderId,
    /// The time entries this hold covers. Their billable amounts sum to `gross_amount`.
    pub entry_ids: Vec<EntryId>,
    pub gross_amount: MinorUnits,
    pub platform_fee: MinorUnits,
    pub provider_net: MinorUnits,
    pub status: EscrowHoldStatus,
    pub idempotency_key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------   NewEscrowHold       -------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEscrowHold {
    pub hold_id: String,
    pub order_id: OrderId,
    pub entry_ids: Vec<EntryId>,
    pub gross_amount: MinorUnits,
    pub platform_fee: MinorUnits,
    pub provider_net: MinorUnits,
    pub idempotency_key: String,
}

//--------------------------------------    PayoutBatch        -------------------------------------------------------
/// A record of one payout request covering N orders for one provider. Created once per request
/// and never mutated by the engine; status changes arrive via gateway callbacks handled
/// elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutBatch {
    pub id: i64,
    /// Gateway-issued payout identifier.
    pub payout_id: String,
    pub provider_id: String,
    pub order_ids: Vec<OrderId>,
    pub total_amount: MinorUnits,
    pub status: PayoutBatchStatus,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------  NewPayoutBatch       -------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPayoutBatch {
    pub payout_id: String,
    pub provider_id: String,
    pub order_ids: Vec<OrderId>,
    pub total_amount: MinorUnits,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn platform_fee_prefers_commission_field() {
        let mut order = order_fixture();
        order.provider_commission = Some(MinorUnits::from(9000));
        order.service_fee = Some(MinorUnits::from(7500));
        assert_eq!(order.platform_fee(), MinorUnits::from(9000));
        order.provider_commission = None;
        assert_eq!(order.platform_fee(), MinorUnits::from(7500));
        order.service_fee = None;
        assert_eq!(order.platform_fee(), MinorUnits::from(0));
    }

    #[test]
    fn net_amount_includes_supplemental_payout() {
        let mut order = order_fixture();
        order.total_amount = MinorUnits::from(200_000);
        order.provider_commission = Some(MinorUnits::from(9000));
        assert_eq!(order.net_amount(), MinorUnits::from(191_000));
        order.supplemental_payout = MinorUnits::from(7640);
        assert_eq!(order.net_amount(), MinorUnits::from(198_640));
    }

    #[test]
    fn new_order_rejects_fee_above_total() {
        let order = NewOrder::new("ord-1", "cust-1", "prov-1", MinorUnits::from(1000))
            .with_commission(MinorUnits::from(1001));
        assert!(order.validate().is_err());
        let order = NewOrder::new("ord-1", "cust-1", "prov-1", MinorUnits::from(1000))
            .with_commission(MinorUnits::from(1000));
        assert!(order.validate().is_ok());
    }

    fn order_fixture() -> Order {
        Order {
            id: 1,
            order_id: OrderId::from("ord-1"),
            customer_id: "cust-1".into(),
            provider_id: "prov-1".into(),
            status: OrderStatusType::New,
            currency: "usd".into(),
            total_amount: MinorUnits::from(10_000),
            provider_commission: None,
            service_fee: None,
            supplemental_payout: MinorUnits::from(0),
            payout_account: None,
            payout_status: PayoutStatus::None,
            payout_id: None,
            transfer_id: None,
            customer_marked_complete: false,
            provider_marked_complete: false,
            both_parties_complete: false,
            escrow_release_initiated: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}
