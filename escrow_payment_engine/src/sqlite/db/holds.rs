use sqlx::{sqlite::SqliteRow, FromRow, QueryBuilder, Row, SqliteConnection};

use crate::{
    db_types::{EntryId, EscrowHold, EscrowHoldStatus, NewEscrowHold, OrderId},
    traits::EscrowLedgerError,
};

// The covered entry-id set is stored as a JSON array in the `entry_ids` column.
impl FromRow<'_, SqliteRow> for EscrowHold {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let raw: String = row.try_get("entry_ids")?;
        let entry_ids: Vec<EntryId> = serde_json::from_str(&raw)
            .map_err(|e| sqlx::Error::ColumnDecode { index: "entry_ids".into(), source: Box::new(e) })?;
        Ok(Self {
            id: row.try_get("id")?,
            hold_id: row.try_get("hold_id")?,
            order_id: row.try_get("order_id")?,
            entry_ids,
            gross_amount: row.try_get("gross_amount")?,
            platform_fee: row.try_get("platform_fee")?,
            provider_net: row.try_get("provider_net")?,
            status: row.try_get::<String, _>("status")?.parse().map_err(|e| sqlx::Error::ColumnDecode {
                index: "status".into(),
                source: Box::new(e),
            })?,
            idempotency_key: row.try_get("idempotency_key")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

pub async fn insert_hold(hold: NewEscrowHold, conn: &mut SqliteConnection) -> Result<EscrowHold, EscrowLedgerError> {
    let entry_ids = serde_json::to_string(&hold.entry_ids)
        .map_err(|e| EscrowLedgerError::InvalidRecord(format!("entry_ids cannot be serialized: {e}")))?;
    let hold = sqlx::query_as(
        r#"
            INSERT INTO escrow_holds (
                hold_id,
                order_id,
                entry_ids,
                gross_amount,
                platform_fee,
                provider_net,
                idempotency_key
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(hold.hold_id)
    .bind(hold.order_id)
    .bind(entry_ids)
    .bind(hold.gross_amount)
    .bind(hold.platform_fee)
    .bind(hold.provider_net)
    .bind(hold.idempotency_key)
    .fetch_one(conn)
    .await?;
    Ok(hold)
}

pub async fn fetch_hold(
    order_id: &OrderId,
    hold_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<EscrowHold>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM escrow_holds WHERE order_id = $1 AND hold_id = $2")
        .bind(order_id.as_str())
        .bind(hold_id)
        .fetch_optional(conn)
        .await
}

pub async fn fetch_hold_by_idempotency_key(
    key: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<EscrowHold>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM escrow_holds WHERE idempotency_key = $1").bind(key).fetch_optional(conn).await
}

pub async fn fetch_holds_for_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Vec<EscrowHold>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM escrow_holds WHERE order_id = $1 ORDER BY created_at ASC, id ASC")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await
}

/// Fetches the given holds of the order. Every requested gateway hold id must exist; the first
/// missing one is named in the error.
pub async fn fetch_holds_by_ids(
    order_id: &OrderId,
    hold_ids: &[String],
    conn: &mut SqliteConnection,
) -> Result<Vec<EscrowHold>, EscrowLedgerError> {
    if hold_ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut builder = QueryBuilder::new("SELECT * FROM escrow_holds WHERE order_id = ");
    builder.push_bind(order_id.as_str());
    builder.push(" AND hold_id IN (");
    let mut sep = builder.separated(", ");
    for id in hold_ids {
        sep.push_bind(id.as_str());
    }
    builder.push(") ORDER BY created_at ASC, id ASC");
    let holds: Vec<EscrowHold> = builder.build_query_as().fetch_all(conn).await?;
    if holds.len() != hold_ids.len() {
        let missing = hold_ids
            .iter()
            .find(|id| !holds.iter().any(|h| &&h.hold_id == id))
            .cloned()
            .unwrap_or_else(|| hold_ids[0].clone());
        return Err(EscrowLedgerError::HoldNotFound(missing));
    }
    Ok(holds)
}

/// Advances the hold `Authorized → Released` or `Authorized → Failed`. The status is monotonic;
/// a hold in any other state produces a conflict naming its actual status.
pub async fn settle_hold(
    order_id: &OrderId,
    hold_id: &str,
    status: EscrowHoldStatus,
    conn: &mut SqliteConnection,
) -> Result<EscrowHold, EscrowLedgerError> {
    let res = sqlx::query(
        r#"
            UPDATE escrow_holds SET status = $1, updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $2 AND hold_id = $3 AND status = 'Authorized'
        "#,
    )
    .bind(status)
    .bind(order_id.as_str())
    .bind(hold_id)
    .execute(&mut *conn)
    .await?;
    if res.rows_affected() == 0 {
        let actual = match fetch_hold(order_id, hold_id, &mut *conn).await? {
            Some(hold) => format!("hold {hold_id} with status {}", hold.status),
            None => return Err(EscrowLedgerError::HoldNotFound(hold_id.to_string())),
        };
        return Err(EscrowLedgerError::conflict(format!("hold {hold_id} with status Authorized"), actual));
    }
    fetch_hold(order_id, hold_id, conn).await?.ok_or_else(|| EscrowLedgerError::HoldNotFound(hold_id.to_string()))
}
