use sqlx::SqliteConnection;

use hearth_core::{Account, AccountId, AccountType, EntityId};

use crate::db::DbPool;

type AccountRow = (i64, i64, String, String, i64, i64);

const SELECT_ACCOUNT: &str =
    "SELECT id, entity_id, name, account_type, balance_cents, is_archived FROM accounts";

pub async fn create_account(
    pool: &DbPool,
    entity_id: EntityId,
    name: &str,
    account_type: AccountType,
    initial_balance_cents: i64,
) -> Result<AccountId, sqlx::Error> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO accounts (entity_id, name, account_type, balance_cents)
         VALUES (?, ?, ?, ?) RETURNING id",
    )
    .bind(entity_id.0)
    .bind(name)
    .bind(account_type.as_str())
    .bind(initial_balance_cents)
    .fetch_one(pool)
    .await?;
    Ok(AccountId(id))
}

pub async fn list_accounts(
    pool: &DbPool,
    entity_id: EntityId,
) -> Result<Vec<Account>, sqlx::Error> {
    let rows = sqlx::query_as::<_, AccountRow>(&format!(
        "{SELECT_ACCOUNT} WHERE entity_id = ? AND is_archived = 0 ORDER BY account_type, name"
    ))
    .bind(entity_id.0)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(map_account).collect())
}

pub async fn get_account(
    conn: &mut SqliteConnection,
    entity_id: EntityId,
    account_id: AccountId,
) -> Result<Option<Account>, sqlx::Error> {
    let row = sqlx::query_as::<_, AccountRow>(&format!(
        "{SELECT_ACCOUNT} WHERE id = ? AND entity_id = ?"
    ))
    .bind(account_id.0)
    .bind(entity_id.0)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(map_account))
}

/// Apply a signed delta to the running balance in a single atomic update.
/// Callers run this inside the same transaction as the row mutation that
/// caused it, so there is no window between read and write.
pub async fn apply_balance_delta(
    conn: &mut SqliteConnection,
    account_id: AccountId,
    delta_cents: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE accounts SET balance_cents = balance_cents + ?, updated_at = datetime('now')
         WHERE id = ?",
    )
    .bind(delta_cents)
    .bind(account_id.0)
    .execute(conn)
    .await?;
    Ok(())
}

/// Reconciliation: overwrite the running balance with a stated figure.
pub async fn adjust_balance(
    pool: &DbPool,
    entity_id: EntityId,
    account_id: AccountId,
    balance_cents: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE accounts SET balance_cents = ?, updated_at = datetime('now')
         WHERE id = ? AND entity_id = ?",
    )
    .bind(balance_cents)
    .bind(account_id.0)
    .bind(entity_id.0)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn archive_account(
    pool: &DbPool,
    entity_id: EntityId,
    account_id: AccountId,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE accounts SET is_archived = 1, updated_at = datetime('now')
         WHERE id = ? AND entity_id = ?",
    )
    .bind(account_id.0)
    .bind(entity_id.0)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Delete an account that has no transactions. Returns `false` without
/// deleting when transactions reference it; those accounts must be
/// archived instead.
pub async fn delete_account(
    pool: &DbPool,
    entity_id: EntityId,
    account_id: AccountId,
) -> Result<bool, sqlx::Error> {
    let transaction_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE account_id = ?")
            .bind(account_id.0)
            .fetch_one(pool)
            .await?;

    if transaction_count > 0 {
        return Ok(false);
    }

    let result = sqlx::query("DELETE FROM accounts WHERE id = ? AND entity_id = ?")
        .bind(account_id.0)
        .bind(entity_id.0)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

fn map_account(row: AccountRow) -> Account {
    Account {
        id: AccountId(row.0),
        entity_id: EntityId(row.1),
        name: row.2,
        account_type: row.3.parse().unwrap_or(AccountType::Checking),
        balance_cents: row.4,
        is_archived: row.5 != 0,
    }
}
