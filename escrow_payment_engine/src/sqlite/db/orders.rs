use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{CompletingParty, NewOrder, Order, OrderId, OrderStatusType, PayoutStatus},
    traits::EscrowLedgerError,
};

/// Inserts the order into the database, returning `false` in the second element if the order
/// already exists.
pub async fn idempotent_insert(order: NewOrder, conn: &mut SqliteConnection) -> Result<(Order, bool), EscrowLedgerError> {
    order.validate().map_err(|e| EscrowLedgerError::InvalidRecord(e.to_string()))?;
    let inserted = match fetch_order_by_order_id(&order.order_id, conn).await? {
        Some(order) => (order, false),
        None => {
            let order = insert_order(order, conn).await?;
            debug!("🗃️ Order [{}] inserted with id {}", order.order_id, order.id);
            (order, true)
        },
    };
    Ok(inserted)
}

async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, EscrowLedgerError> {
    let order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_id,
                customer_id,
                provider_id,
                currency,
                total_amount,
                provider_commission,
                service_fee,
                payout_account
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *;
        "#,
    )
    .bind(order.order_id)
    .bind(order.customer_id)
    .bind(order.provider_id)
    .bind(order.currency)
    .bind(order.total_amount)
    .bind(order.provider_commission)
    .bind(order.service_fee)
    .bind(order.payout_account)
    .fetch_one(conn)
    .await?;
    Ok(order)
}

pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

/// Moves the order to the given lifecycle status. When the order becomes `Completed` and no
/// payout status has been assigned yet, its earnings become available for the payout batch
/// path.
pub async fn set_status(
    order_id: &OrderId,
    status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Order, EscrowLedgerError> {
    let res = sqlx::query(
        r#"
            UPDATE orders SET
                status = $1,
                payout_status = CASE
                    WHEN $1 = 'Completed' AND payout_status = 'None' THEN 'AvailableForPayout'
                    ELSE payout_status
                END,
                updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $2
        "#,
    )
    .bind(status)
    .bind(order_id.as_str())
    .execute(&mut *conn)
    .await?;
    if res.rows_affected() == 0 {
        return Err(EscrowLedgerError::OrderNotFound(order_id.clone()));
    }
    fetch_order_by_order_id(order_id, conn).await?.ok_or_else(|| EscrowLedgerError::OrderNotFound(order_id.clone()))
}

/// Records one party's completion sign-off and recomputes `both_parties_complete` in the same
/// statement, so the merge is atomic with the flag write.
pub async fn record_party_completion(
    order_id: &OrderId,
    party: CompletingParty,
    conn: &mut SqliteConnection,
) -> Result<Order, EscrowLedgerError> {
    let sql = match party {
        CompletingParty::Customer => {
            r#"
            UPDATE orders SET
                customer_marked_complete = 1,
                both_parties_complete = provider_marked_complete,
                updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $1
            "#
        },
        CompletingParty::Provider => {
            r#"
            UPDATE orders SET
                provider_marked_complete = 1,
                both_parties_complete = customer_marked_complete,
                updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $1
            "#
        },
    };
    let res = sqlx::query(sql).bind(order_id.as_str()).execute(&mut *conn).await?;
    if res.rows_affected() == 0 {
        return Err(EscrowLedgerError::OrderNotFound(order_id.clone()));
    }
    fetch_order_by_order_id(order_id, conn).await?.ok_or_else(|| EscrowLedgerError::OrderNotFound(order_id.clone()))
}

/// Flags the order's escrow release as initiated and completes its tracking status. Earnings
/// from the released holds become available for payout unless a payout status has already been
/// assigned.
pub async fn finalize_escrow_release(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Order, EscrowLedgerError> {
    let res = sqlx::query(
        r#"
            UPDATE orders SET
                escrow_release_initiated = 1,
                status = 'Completed',
                payout_status = CASE WHEN payout_status = 'None' THEN 'AvailableForPayout' ELSE payout_status END,
                updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $1
        "#,
    )
    .bind(order_id.as_str())
    .execute(&mut *conn)
    .await?;
    if res.rows_affected() == 0 {
        return Err(EscrowLedgerError::OrderNotFound(order_id.clone()));
    }
    fetch_order_by_order_id(order_id, conn).await?.ok_or_else(|| EscrowLedgerError::OrderNotFound(order_id.clone()))
}

/// Adds a released hold's provider net to the order's supplemental payout tally.
pub async fn add_supplemental_payout(
    order_id: &OrderId,
    amount: i64,
    conn: &mut SqliteConnection,
) -> Result<(), EscrowLedgerError> {
    let res = sqlx::query(
        "UPDATE orders SET supplemental_payout = supplemental_payout + $1, updated_at = CURRENT_TIMESTAMP WHERE \
         order_id = $2",
    )
    .bind(amount)
    .bind(order_id.as_str())
    .execute(conn)
    .await?;
    if res.rows_affected() == 0 {
        return Err(EscrowLedgerError::OrderNotFound(order_id.clone()));
    }
    Ok(())
}

/// All orders of the provider that are fully completed and whose earnings are available for
/// payout, oldest first.
pub async fn payout_eligible_orders(provider_id: &str, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    sqlx::query_as(
        r#"
            SELECT * FROM orders
            WHERE provider_id = $1 AND status = 'Completed' AND payout_status = 'AvailableForPayout'
            ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(provider_id)
    .fetch_all(conn)
    .await
}

/// Conditionally consumes the order for a payout batch. Returns a state conflict when the order
/// has already been consumed by another payout (or was never available), so that the caller can
/// roll back the whole batch.
pub async fn mark_payout_requested(
    order_id: &OrderId,
    payout_id: &str,
    conn: &mut SqliteConnection,
) -> Result<(), EscrowLedgerError> {
    let res = sqlx::query(
        r#"
            UPDATE orders SET
                payout_status = 'PayoutRequested',
                payout_id = $1,
                updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $2 AND payout_status = 'AvailableForPayout'
        "#,
    )
    .bind(payout_id)
    .bind(order_id.as_str())
    .execute(&mut *conn)
    .await?;
    if res.rows_affected() == 0 {
        let actual = match fetch_order_by_order_id(order_id, conn).await? {
            Some(order) => format!("order {order_id} with payout status {}", order.payout_status),
            None => return Err(EscrowLedgerError::OrderNotFound(order_id.clone())),
        };
        return Err(EscrowLedgerError::conflict(format!("order {order_id} available for payout"), actual));
    }
    Ok(())
}

/// Conditionally completes a delivered order via the direct-transfer path. The conflict error
/// names the actual status so callers can report it verbatim.
pub async fn mark_completed(
    order_id: &OrderId,
    payout_status: PayoutStatus,
    transfer_id: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Order, EscrowLedgerError> {
    let res = sqlx::query(
        r#"
            UPDATE orders SET
                status = 'Completed',
                payout_status = $1,
                transfer_id = $2,
                customer_marked_complete = 1,
                updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $3 AND status = 'Delivered'
        "#,
    )
    .bind(payout_status)
    .bind(transfer_id)
    .bind(order_id.as_str())
    .execute(&mut *conn)
    .await?;
    if res.rows_affected() == 0 {
        let actual = match fetch_order_by_order_id(order_id, &mut *conn).await? {
            Some(order) => format!("order {order_id} with status {}", order.status),
            None => return Err(EscrowLedgerError::OrderNotFound(order_id.clone())),
        };
        return Err(EscrowLedgerError::conflict(format!("order {order_id} with status Delivered"), actual));
    }
    fetch_order_by_order_id(order_id, conn).await?.ok_or_else(|| EscrowLedgerError::OrderNotFound(order_id.clone()))
}
