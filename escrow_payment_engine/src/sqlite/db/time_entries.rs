use log::debug;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{EntryId, NewTimeEntry, OrderId, TimeEntry, TimeEntryStatus},
    traits::EscrowLedgerError,
};

/// Appends the entry to the order's time-tracking record, returning `false` in the second
/// element if it already exists.
pub async fn idempotent_insert(
    entry: NewTimeEntry,
    conn: &mut SqliteConnection,
) -> Result<(TimeEntry, bool), EscrowLedgerError> {
    entry.validate().map_err(|e| EscrowLedgerError::InvalidRecord(e.to_string()))?;
    let inserted = match fetch_entry(&entry.order_id, &entry.entry_id, &mut *conn).await? {
        Some(entry) => (entry, false),
        None => {
            let entry = insert_entry(entry, conn).await?;
            debug!("🗃️ Time entry [{}] logged on order [{}]", entry.entry_id, entry.order_id);
            (entry, true)
        },
    };
    Ok(inserted)
}

async fn insert_entry(entry: NewTimeEntry, conn: &mut SqliteConnection) -> Result<TimeEntry, EscrowLedgerError> {
    let entry = sqlx::query_as(
        r#"
            INSERT INTO time_entries (entry_id, order_id, category, billable_amount, hours)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(entry.entry_id)
    .bind(entry.order_id)
    .bind(entry.category)
    .bind(entry.billable_amount)
    .bind(entry.hours)
    .fetch_one(conn)
    .await?;
    Ok(entry)
}

pub async fn fetch_entry(
    order_id: &OrderId,
    entry_id: &EntryId,
    conn: &mut SqliteConnection,
) -> Result<Option<TimeEntry>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM time_entries WHERE order_id = $1 AND entry_id = $2")
        .bind(order_id.as_str())
        .bind(entry_id.as_str())
        .fetch_optional(conn)
        .await
}

pub async fn fetch_entries(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Vec<TimeEntry>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM time_entries WHERE order_id = $1 ORDER BY created_at ASC, id ASC")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await
}

/// Fetches the given entries of the order. Every requested id must exist; the first missing one
/// is named in the error.
pub async fn fetch_entries_by_ids(
    order_id: &OrderId,
    ids: &[EntryId],
    conn: &mut SqliteConnection,
) -> Result<Vec<TimeEntry>, EscrowLedgerError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut builder = QueryBuilder::new("SELECT * FROM time_entries WHERE order_id = ");
    builder.push_bind(order_id.as_str());
    builder.push(" AND entry_id IN (");
    let mut sep = builder.separated(", ");
    for id in ids {
        sep.push_bind(id.as_str());
    }
    builder.push(") ORDER BY created_at ASC, id ASC");
    let entries: Vec<TimeEntry> = builder.build_query_as().fetch_all(conn).await?;
    if entries.len() != ids.len() {
        let missing = ids
            .iter()
            .find(|id| !entries.iter().any(|e| &&e.entry_id == id))
            .cloned()
            .unwrap_or_else(|| ids[0].clone());
        return Err(EscrowLedgerError::EntryNotFound(missing));
    }
    Ok(entries)
}

/// Records the customer's approval of a logged entry. Conditional on the entry being `Logged`.
pub async fn approve_entry(
    order_id: &OrderId,
    entry_id: &EntryId,
    conn: &mut SqliteConnection,
) -> Result<TimeEntry, EscrowLedgerError> {
    let res = sqlx::query(
        r#"
            UPDATE time_entries SET status = 'CustomerApproved', updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $1 AND entry_id = $2 AND status = 'Logged'
        "#,
    )
    .bind(order_id.as_str())
    .bind(entry_id.as_str())
    .execute(&mut *conn)
    .await?;
    if res.rows_affected() == 0 {
        let actual = match fetch_entry(order_id, entry_id, &mut *conn).await? {
            Some(entry) => format!("entry {entry_id} with status {}", entry.status),
            None => return Err(EscrowLedgerError::EntryNotFound(entry_id.clone())),
        };
        return Err(EscrowLedgerError::conflict(format!("entry {entry_id} with status Logged"), actual));
    }
    fetch_entry(order_id, entry_id, conn).await?.ok_or_else(|| EscrowLedgerError::EntryNotFound(entry_id.clone()))
}

/// Advances one covered entry `CustomerApproved → EscrowAuthorized` and annotates it with the
/// hold id. Conditional; a conflict here rolls back the surrounding hold-creation transaction.
pub async fn authorize_entry(
    order_id: &OrderId,
    entry_id: &EntryId,
    hold_id: &str,
    conn: &mut SqliteConnection,
) -> Result<(), EscrowLedgerError> {
    let res = sqlx::query(
        r#"
            UPDATE time_entries SET
                status = 'EscrowAuthorized',
                escrow_hold_id = $1,
                updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $2 AND entry_id = $3 AND status = 'CustomerApproved'
        "#,
    )
    .bind(hold_id)
    .bind(order_id.as_str())
    .bind(entry_id.as_str())
    .execute(&mut *conn)
    .await?;
    if res.rows_affected() == 0 {
        let actual = match fetch_entry(order_id, entry_id, &mut *conn).await? {
            Some(entry) => format!("entry {entry_id} with status {}", entry.status),
            None => return Err(EscrowLedgerError::EntryNotFound(entry_id.clone())),
        };
        return Err(EscrowLedgerError::conflict(format!("entry {entry_id} with status CustomerApproved"), actual));
    }
    Ok(())
}

/// Moves every entry covered by the hold to the given terminal status (`EscrowReleased` or
/// `EscrowFailed`).
pub async fn settle_entries_for_hold(
    order_id: &OrderId,
    hold_id: &str,
    status: TimeEntryStatus,
    conn: &mut SqliteConnection,
) -> Result<u64, EscrowLedgerError> {
    let res = sqlx::query(
        r#"
            UPDATE time_entries SET status = $1, updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $2 AND escrow_hold_id = $3 AND status = 'EscrowAuthorized'
        "#,
    )
    .bind(status)
    .bind(order_id.as_str())
    .bind(hold_id)
    .execute(conn)
    .await?;
    Ok(res.rows_affected())
}
