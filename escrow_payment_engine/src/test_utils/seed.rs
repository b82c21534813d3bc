//! Convenience builders for seeding ledger state in tests.
use epe_common::MinorUnits;

use crate::{
    db_types::{EntryCategory, NewOrder, NewTimeEntry, Order, OrderId, OrderStatusType, TimeEntry},
    traits::EscrowLedger,
    SqliteDatabase,
};

/// Inserts an order with a payout account and an explicit commission.
pub async fn seed_order(
    db: &SqliteDatabase,
    order_id: &str,
    provider_id: &str,
    total: i64,
    commission: Option<i64>,
) -> Order {
    let mut order = NewOrder::new(order_id, "cust-1", provider_id, MinorUnits::from(total))
        .with_payout_account("acct_test_1");
    if let Some(fee) = commission {
        order = order.with_commission(MinorUnits::from(fee));
    }
    let (order, inserted) = db.insert_order(order).await.expect("Error inserting order");
    assert!(inserted, "order {order_id} already existed");
    order
}

/// Moves an order to the given lifecycle status.
pub async fn with_status(db: &SqliteDatabase, order_id: &OrderId, status: OrderStatusType) -> Order {
    db.set_order_status(order_id, status).await.expect("Error setting order status")
}

/// Logs an `Additional` entry and records the customer's approval, leaving it ready for escrow
/// authorization.
pub async fn seed_approved_entry(
    db: &SqliteDatabase,
    order_id: &OrderId,
    entry_id: &str,
    amount: i64,
    hours: f64,
) -> TimeEntry {
    let entry = NewTimeEntry::new(entry_id, order_id.clone(), EntryCategory::Additional, MinorUnits::from(amount), hours);
    let (entry, inserted) = db.insert_time_entry(entry).await.expect("Error logging time entry");
    assert!(inserted, "entry {entry_id} already existed");
    db.approve_time_entry(order_id, &entry.entry_id).await.expect("Error approving time entry")
}
