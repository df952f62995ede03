use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;

use hearth_core::TransactionId;

/// A mirrored transaction pair across two entities of one household.
/// `owner_draw` is the only transfer type recorded today.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedTransfer {
    pub id: i64,
    pub from_transaction_id: TransactionId,
    pub to_transaction_id: TransactionId,
    pub transfer_type: String,
    pub created_at: String,
}

pub async fn insert_linked_transfer(
    conn: &mut SqliteConnection,
    from: TransactionId,
    to: TransactionId,
) -> Result<i64, sqlx::Error> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO linked_transfers (from_transaction_id, to_transaction_id, transfer_type)
         VALUES (?, ?, 'owner_draw') RETURNING id",
    )
    .bind(from.0)
    .bind(to.0)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

/// The link whose source side is the given transaction, if any.
pub async fn link_for_source(
    conn: &mut SqliteConnection,
    from: TransactionId,
) -> Result<Option<LinkedTransfer>, sqlx::Error> {
    let row = sqlx::query_as::<_, (i64, i64, i64, String, String)>(
        "SELECT id, from_transaction_id, to_transaction_id, transfer_type, created_at
         FROM linked_transfers WHERE from_transaction_id = ?",
    )
    .bind(from.0)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(|r| LinkedTransfer {
        id: r.0,
        from_transaction_id: TransactionId(r.1),
        to_transaction_id: TransactionId(r.2),
        transfer_type: r.3,
        created_at: r.4,
    }))
}
