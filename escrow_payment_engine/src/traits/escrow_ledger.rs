use thiserror::Error;

use crate::db_types::{
    CompletingParty,
    CompletionState,
    EntryId,
    EscrowHold,
    NewEscrowHold,
    NewOrder,
    NewPayoutBatch,
    NewTimeEntry,
    Order,
    OrderId,
    OrderStatusType,
    PayoutBatch,
    PayoutStatus,
    TimeEntry,
};

/// The storage backend contract for the escrow payment engine.
///
/// The engine holds no in-memory locks across calls. Correctness under concurrent requests rests
/// on two properties every implementation must provide:
/// * Methods documented as atomic perform all their writes in a single transaction.
/// * Methods documented as conditional only write when the record is in the expected state, and
///   report [`EscrowLedgerError::StateConflict`] otherwise (compare-and-swap on the status
///   field).
#[allow(async_fn_in_trait)]
pub trait EscrowLedger: Clone {
    /// The URL of the backing database.
    fn url(&self) -> &str;

    /// Stores a new order. Idempotent: returns `false` in the second element if the order
    /// already existed.
    async fn insert_order(&self, order: NewOrder) -> Result<(Order, bool), EscrowLedgerError>;

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, EscrowLedgerError>;

    /// Appends a time entry to an order's time-tracking record. Idempotent on
    /// `(order_id, entry_id)`.
    async fn insert_time_entry(&self, entry: NewTimeEntry) -> Result<(TimeEntry, bool), EscrowLedgerError>;

    async fn fetch_time_entries(&self, order_id: &OrderId) -> Result<Vec<TimeEntry>, EscrowLedgerError>;

    /// Fetches the given entries of an order. Every requested id must exist;
    /// [`EscrowLedgerError::EntryNotFound`] names the first missing one otherwise.
    async fn fetch_entries_by_ids(&self, order_id: &OrderId, ids: &[EntryId]) -> Result<Vec<TimeEntry>, EscrowLedgerError>;

    /// Records the customer's approval of a logged entry. Conditional on the entry being
    /// `Logged`.
    async fn approve_time_entry(&self, order_id: &OrderId, entry_id: &EntryId) -> Result<TimeEntry, EscrowLedgerError>;

    /// Moves the order to the given lifecycle status. Used by the surrounding order-management
    /// flows (work started, delivery). Transitioning to `Completed` makes the order's earnings
    /// available for payout unless a payout status has already been assigned.
    async fn set_order_status(&self, order_id: &OrderId, status: OrderStatusType) -> Result<Order, EscrowLedgerError>;

    /// Records that `party` has marked the order complete and recomputes
    /// `both_parties_complete`, atomically with the flag write. Pure state merge; marking the
    /// same party complete twice is a no-op.
    async fn record_party_completion(
        &self,
        order_id: &OrderId,
        party: CompletingParty,
    ) -> Result<CompletionState, EscrowLedgerError>;

    /// Looks up a hold by the idempotency key it was created under.
    async fn hold_by_idempotency_key(&self, key: &str) -> Result<Option<EscrowHold>, EscrowLedgerError>;

    /// In a single atomic transaction, stores the hold record and advances every covered entry
    /// `CustomerApproved → EscrowAuthorized`, annotating each with the hold id. Conditional: if
    /// any entry is not `CustomerApproved` the whole transaction is rolled back and a
    /// [`EscrowLedgerError::StateConflict`] is returned, so a failed call mutates nothing.
    async fn create_hold(&self, hold: NewEscrowHold) -> Result<EscrowHold, EscrowLedgerError>;

    async fn holds_for_order(&self, order_id: &OrderId) -> Result<Vec<EscrowHold>, EscrowLedgerError>;

    /// Fetches the given holds of an order. Every requested gateway hold id must exist;
    /// [`EscrowLedgerError::HoldNotFound`] names the first missing one otherwise.
    async fn holds_by_ids(&self, order_id: &OrderId, hold_ids: &[String]) -> Result<Vec<EscrowHold>, EscrowLedgerError>;

    /// In a single atomic transaction: hold `Authorized → Released`, covered entries
    /// `EscrowAuthorized → EscrowReleased`, and the hold's provider net added to the order's
    /// supplemental payout. Conditional on the hold being `Authorized`.
    async fn mark_hold_released(&self, order_id: &OrderId, hold_id: &str) -> Result<EscrowHold, EscrowLedgerError>;

    /// In a single atomic transaction: hold `Authorized → Failed` and covered entries
    /// `EscrowAuthorized → EscrowFailed`. Conditional on the hold being `Authorized`.
    async fn mark_hold_failed(&self, order_id: &OrderId, hold_id: &str) -> Result<EscrowHold, EscrowLedgerError>;

    /// Marks the order's escrow release as initiated, sets its tracking status to `Completed`,
    /// and makes its earnings available for payout. Called once the release batch has been
    /// attempted, regardless of partial hold failures.
    async fn finalize_escrow_release(&self, order_id: &OrderId) -> Result<Order, EscrowLedgerError>;

    /// All orders of the provider whose status is `Completed` and whose payout status is
    /// `AvailableForPayout`, ordered by creation time. Pure read.
    async fn payout_eligible_orders(&self, provider_id: &str) -> Result<Vec<Order>, EscrowLedgerError>;

    /// In a single atomic transaction, advances every listed order
    /// `AvailableForPayout → PayoutRequested` and stamps the gateway payout id on it.
    /// Conditional: if any order has already been consumed by another payout the whole batch is
    /// rolled back and a [`EscrowLedgerError::StateConflict`] is returned.
    async fn mark_orders_payout_requested(&self, order_ids: &[OrderId], payout_id: &str) -> Result<(), EscrowLedgerError>;

    /// Writes the payout-log record for a requested payout.
    async fn insert_payout_batch(&self, batch: NewPayoutBatch) -> Result<PayoutBatch, EscrowLedgerError>;

    async fn payout_batches_for_provider(&self, provider_id: &str) -> Result<Vec<PayoutBatch>, EscrowLedgerError>;

    /// Marks the order `Completed` with the given payout status and optional transfer id.
    /// Conditional on the current status being `Delivered`; the conflict error names the actual
    /// status.
    async fn mark_order_completed(
        &self,
        order_id: &OrderId,
        payout_status: PayoutStatus,
        transfer_id: Option<&str>,
    ) -> Result<Order, EscrowLedgerError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), EscrowLedgerError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum EscrowLedgerError {
    #[error("Internal ledger database error: {0}")]
    DatabaseError(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("The requested time entry {0} does not exist")]
    EntryNotFound(EntryId),
    #[error("The requested escrow hold {0} does not exist")]
    HoldNotFound(String),
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
    #[error("State conflict. Expected {expected}, but the record is {actual}")]
    StateConflict { expected: String, actual: String },
}

impl EscrowLedgerError {
    pub fn conflict<E: ToString, A: ToString>(expected: E, actual: A) -> Self {
        Self::StateConflict { expected: expected.to_string(), actual: actual.to_string() }
    }
}

impl From<sqlx::Error> for EscrowLedgerError {
    fn from(e: sqlx::Error) -> Self {
        EscrowLedgerError::DatabaseError(e.to_string())
    }
}
