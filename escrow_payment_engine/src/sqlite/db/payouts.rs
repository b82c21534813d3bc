use sqlx::{sqlite::SqliteRow, FromRow, Row, SqliteConnection};

use crate::{
    db_types::{NewPayoutBatch, OrderId, PayoutBatch},
    traits::EscrowLedgerError,
};

// The covered order-id set is stored as a JSON array in the `order_ids` column.
impl FromRow<'_, SqliteRow> for PayoutBatch {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let raw: String = row.try_get("order_ids")?;
        let order_ids: Vec<OrderId> = serde_json::from_str(&raw)
            .map_err(|e| sqlx::Error::ColumnDecode { index: "order_ids".into(), source: Box::new(e) })?;
        Ok(Self {
            id: row.try_get("id")?,
            payout_id: row.try_get("payout_id")?,
            provider_id: row.try_get("provider_id")?,
            order_ids,
            total_amount: row.try_get("total_amount")?,
            status: row.try_get::<String, _>("status")?.parse().map_err(|e| sqlx::Error::ColumnDecode {
                index: "status".into(),
                source: Box::new(e),
            })?,
            created_at: row.try_get("created_at")?,
        })
    }
}

pub async fn insert_batch(batch: NewPayoutBatch, conn: &mut SqliteConnection) -> Result<PayoutBatch, EscrowLedgerError> {
    let order_ids = serde_json::to_string(&batch.order_ids)
        .map_err(|e| EscrowLedgerError::InvalidRecord(format!("order_ids cannot be serialized: {e}")))?;
    let batch = sqlx::query_as(
        r#"
            INSERT INTO payout_batches (payout_id, provider_id, order_ids, total_amount)
            VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(batch.payout_id)
    .bind(batch.provider_id)
    .bind(order_ids)
    .bind(batch.total_amount)
    .fetch_one(conn)
    .await?;
    Ok(batch)
}

pub async fn batches_for_provider(provider_id: &str, conn: &mut SqliteConnection) -> Result<Vec<PayoutBatch>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payout_batches WHERE provider_id = $1 ORDER BY created_at ASC, id ASC")
        .bind(provider_id)
        .fetch_all(conn)
        .await
}
