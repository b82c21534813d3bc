//! `SqliteDatabase` is a concrete implementation of the engine's ledger backend.
//!
//! Unsurprisingly, it uses SQLite. Transactions carry the atomic multi-record writes the
//! [`EscrowLedger`] contract requires, and conditional `UPDATE ... WHERE status = ?` statements
//! carry the compare-and-swap semantics.
use std::fmt::Debug;

use log::*;
use sqlx::SqlitePool;

use super::db::{holds, new_pool, orders, payouts, time_entries};
use crate::{
    db_types::{
        CompletingParty,
        CompletionState,
        EntryId,
        EscrowHold,
        EscrowHoldStatus,
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
        TimeEntryStatus,
    },
    traits::{EscrowLedger, EscrowLedgerError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database connection pool with the given maximum number of connections.
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, EscrowLedgerError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl EscrowLedger for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order(&self, order: NewOrder) -> Result<(Order, bool), EscrowLedgerError> {
        let mut conn = self.pool.acquire().await?;
        orders::idempotent_insert(order, &mut conn).await
    }

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, EscrowLedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_order_id(order_id, &mut conn).await?)
    }

    async fn insert_time_entry(&self, entry: NewTimeEntry) -> Result<(TimeEntry, bool), EscrowLedgerError> {
        let mut conn = self.pool.acquire().await?;
        let order_id = entry.order_id.clone();
        if orders::fetch_order_by_order_id(&order_id, &mut conn).await?.is_none() {
            return Err(EscrowLedgerError::OrderNotFound(order_id));
        }
        time_entries::idempotent_insert(entry, &mut conn).await
    }

    async fn fetch_time_entries(&self, order_id: &OrderId) -> Result<Vec<TimeEntry>, EscrowLedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(time_entries::fetch_entries(order_id, &mut conn).await?)
    }

    async fn fetch_entries_by_ids(&self, order_id: &OrderId, ids: &[EntryId]) -> Result<Vec<TimeEntry>, EscrowLedgerError> {
        let mut conn = self.pool.acquire().await?;
        time_entries::fetch_entries_by_ids(order_id, ids, &mut conn).await
    }

    async fn approve_time_entry(&self, order_id: &OrderId, entry_id: &EntryId) -> Result<TimeEntry, EscrowLedgerError> {
        let mut conn = self.pool.acquire().await?;
        time_entries::approve_entry(order_id, entry_id, &mut conn).await
    }

    async fn set_order_status(&self, order_id: &OrderId, status: OrderStatusType) -> Result<Order, EscrowLedgerError> {
        let mut conn = self.pool.acquire().await?;
        orders::set_status(order_id, status, &mut conn).await
    }

    async fn record_party_completion(
        &self,
        order_id: &OrderId,
        party: CompletingParty,
    ) -> Result<CompletionState, EscrowLedgerError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::record_party_completion(order_id, party, &mut conn).await?;
        debug!("🗃️ Completion state updated for order [{order_id}]: {}", order.completion());
        Ok(order.completion())
    }

    async fn hold_by_idempotency_key(&self, key: &str) -> Result<Option<EscrowHold>, EscrowLedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(holds::fetch_hold_by_idempotency_key(key, &mut conn).await?)
    }

    async fn create_hold(&self, hold: NewEscrowHold) -> Result<EscrowHold, EscrowLedgerError> {
        let mut tx = self.pool.begin().await?;
        let record = holds::insert_hold(hold.clone(), &mut tx).await?;
        for entry_id in &hold.entry_ids {
            time_entries::authorize_entry(&hold.order_id, entry_id, &record.hold_id, &mut tx).await?;
        }
        tx.commit().await?;
        debug!(
            "🗃️ Escrow hold [{}] saved for order [{}] covering {} entries",
            record.hold_id,
            record.order_id,
            record.entry_ids.len()
        );
        Ok(record)
    }

    async fn holds_for_order(&self, order_id: &OrderId) -> Result<Vec<EscrowHold>, EscrowLedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(holds::fetch_holds_for_order(order_id, &mut conn).await?)
    }

    async fn holds_by_ids(&self, order_id: &OrderId, hold_ids: &[String]) -> Result<Vec<EscrowHold>, EscrowLedgerError> {
        let mut conn = self.pool.acquire().await?;
        holds::fetch_holds_by_ids(order_id, hold_ids, &mut conn).await
    }

    async fn mark_hold_released(&self, order_id: &OrderId, hold_id: &str) -> Result<EscrowHold, EscrowLedgerError> {
        let mut tx = self.pool.begin().await?;
        let hold = holds::settle_hold(order_id, hold_id, EscrowHoldStatus::Released, &mut tx).await?;
        let settled =
            time_entries::settle_entries_for_hold(order_id, hold_id, TimeEntryStatus::EscrowReleased, &mut tx).await?;
        orders::add_supplemental_payout(order_id, hold.provider_net.value(), &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Hold [{hold_id}] released. {settled} entries settled on order [{order_id}]");
        Ok(hold)
    }

    async fn mark_hold_failed(&self, order_id: &OrderId, hold_id: &str) -> Result<EscrowHold, EscrowLedgerError> {
        let mut tx = self.pool.begin().await?;
        let hold = holds::settle_hold(order_id, hold_id, EscrowHoldStatus::Failed, &mut tx).await?;
        let settled =
            time_entries::settle_entries_for_hold(order_id, hold_id, TimeEntryStatus::EscrowFailed, &mut tx).await?;
        tx.commit().await?;
        warn!("🗃️ Hold [{hold_id}] marked failed. {settled} entries settled on order [{order_id}]");
        Ok(hold)
    }

    async fn finalize_escrow_release(&self, order_id: &OrderId) -> Result<Order, EscrowLedgerError> {
        let mut conn = self.pool.acquire().await?;
        orders::finalize_escrow_release(order_id, &mut conn).await
    }

    async fn payout_eligible_orders(&self, provider_id: &str) -> Result<Vec<Order>, EscrowLedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::payout_eligible_orders(provider_id, &mut conn).await?)
    }

    async fn mark_orders_payout_requested(&self, order_ids: &[OrderId], payout_id: &str) -> Result<(), EscrowLedgerError> {
        let mut tx = self.pool.begin().await?;
        for order_id in order_ids {
            orders::mark_payout_requested(order_id, payout_id, &mut tx).await?;
        }
        tx.commit().await?;
        debug!("🗃️ {} orders marked payout-requested under payout [{payout_id}]", order_ids.len());
        Ok(())
    }

    async fn insert_payout_batch(&self, batch: NewPayoutBatch) -> Result<PayoutBatch, EscrowLedgerError> {
        let mut conn = self.pool.acquire().await?;
        payouts::insert_batch(batch, &mut conn).await
    }

    async fn payout_batches_for_provider(&self, provider_id: &str) -> Result<Vec<PayoutBatch>, EscrowLedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payouts::batches_for_provider(provider_id, &mut conn).await?)
    }

    async fn mark_order_completed(
        &self,
        order_id: &OrderId,
        payout_status: PayoutStatus,
        transfer_id: Option<&str>,
    ) -> Result<Order, EscrowLedgerError> {
        let mut conn = self.pool.acquire().await?;
        orders::mark_completed(order_id, payout_status, transfer_id, &mut conn).await
    }

    async fn close(&mut self) -> Result<(), EscrowLedgerError> {
        self.pool.close().await;
        Ok(())
    }
}
