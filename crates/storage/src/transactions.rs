use chrono::NaiveDate;
use sqlx::SqliteConnection;

use hearth_core::{
    AccountId, BudgetMonthId, CategoryId, EntityId, HouseholdId, Transaction, TransactionId,
    TransactionType, UserId,
};

use crate::db::DbPool;

type TransactionRow = (
    i64,
    i64,
    i64,
    Option<i64>,
    i64,
    NaiveDate,
    i64,
    String,
    String,
    Option<String>,
    Option<i64>,
    i64,
    Option<i64>,
);

const SELECT_TRANSACTION: &str = "SELECT id, household_id, entity_id, account_id, \
     budget_month_id, date, amount_cents, type, payee, memo, category_id, is_transfer, \
     created_by_user_id FROM transactions";

/// Field set for inserting one transaction row.
#[derive(Debug, Clone)]
pub struct NewTransactionRow {
    pub household_id: HouseholdId,
    pub entity_id: EntityId,
    pub account_id: Option<AccountId>,
    pub budget_month_id: BudgetMonthId,
    pub date: NaiveDate,
    pub amount_cents: i64,
    pub transaction_type: TransactionType,
    pub payee: String,
    pub memo: Option<String>,
    pub category_id: Option<CategoryId>,
    pub is_transfer: bool,
    pub created_by: Option<UserId>,
}

/// Fields a user-facing edit may change. The account a transaction was
/// recorded against stays fixed for its lifetime.
#[derive(Debug, Clone)]
pub struct TransactionUpdate {
    pub budget_month_id: BudgetMonthId,
    pub date: NaiveDate,
    pub amount_cents: i64,
    pub transaction_type: TransactionType,
    pub payee: String,
    pub memo: Option<String>,
    pub category_id: Option<CategoryId>,
}

/// Optional filters for the month listing.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub category_id: Option<CategoryId>,
    pub payee_contains: Option<String>,
    pub transaction_type: Option<TransactionType>,
}

pub async fn get_or_create_budget_month(
    conn: &mut SqliteConnection,
    household_id: HouseholdId,
    entity_id: EntityId,
    month: &str,
) -> Result<BudgetMonthId, sqlx::Error> {
    let existing: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM budget_months WHERE household_id = ? AND entity_id = ? AND month = ?",
    )
    .bind(household_id.0)
    .bind(entity_id.0)
    .bind(month)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(id) = existing {
        return Ok(BudgetMonthId(id));
    }

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO budget_months (household_id, entity_id, month) VALUES (?, ?, ?) RETURNING id",
    )
    .bind(household_id.0)
    .bind(entity_id.0)
    .bind(month)
    .fetch_one(conn)
    .await?;
    Ok(BudgetMonthId(id))
}

pub async fn insert_transaction(
    conn: &mut SqliteConnection,
    row: &NewTransactionRow,
) -> Result<TransactionId, sqlx::Error> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO transactions (household_id, entity_id, account_id, budget_month_id, date,
             amount_cents, type, payee, memo, category_id, is_transfer, created_by_user_id)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(row.household_id.0)
    .bind(row.entity_id.0)
    .bind(row.account_id.map(|a| a.0))
    .bind(row.budget_month_id.0)
    .bind(row.date)
    .bind(row.amount_cents)
    .bind(row.transaction_type.as_str())
    .bind(&row.payee)
    .bind(&row.memo)
    .bind(row.category_id.map(|c| c.0))
    .bind(row.is_transfer as i64)
    .bind(row.created_by.map(|u| u.0))
    .fetch_one(conn)
    .await?;
    Ok(TransactionId(id))
}

pub async fn get_transaction(
    conn: &mut SqliteConnection,
    household_id: HouseholdId,
    transaction_id: TransactionId,
) -> Result<Option<Transaction>, sqlx::Error> {
    let row = sqlx::query_as::<_, TransactionRow>(&format!(
        "{SELECT_TRANSACTION} WHERE id = ? AND household_id = ?"
    ))
    .bind(transaction_id.0)
    .bind(household_id.0)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(map_transaction))
}

pub async fn update_transaction(
    conn: &mut SqliteConnection,
    transaction_id: TransactionId,
    update: &TransactionUpdate,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE transactions SET budget_month_id = ?, date = ?, amount_cents = ?, type = ?,
             payee = ?, memo = ?, category_id = ?, updated_at = datetime('now')
         WHERE id = ?",
    )
    .bind(update.budget_month_id.0)
    .bind(update.date)
    .bind(update.amount_cents)
    .bind(update.transaction_type.as_str())
    .bind(&update.payee)
    .bind(&update.memo)
    .bind(update.category_id.map(|c| c.0))
    .bind(transaction_id.0)
    .execute(conn)
    .await?;
    Ok(())
}

/// Push date/amount/payee to the mirrored side of a linked transfer.
/// Nothing else on the mirror is touched: its category, entity and budget
/// month keep their original resolution.
pub async fn sync_linked_transaction(
    conn: &mut SqliteConnection,
    transaction_id: TransactionId,
    date: NaiveDate,
    amount_cents: i64,
    payee: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE transactions SET date = ?, amount_cents = ?, payee = ?, updated_at = datetime('now')
         WHERE id = ?",
    )
    .bind(date)
    .bind(amount_cents)
    .bind(payee)
    .bind(transaction_id.0)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn delete_transaction(
    conn: &mut SqliteConnection,
    transaction_id: TransactionId,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM transactions WHERE id = ?")
        .bind(transaction_id.0)
        .execute(conn)
        .await?;
    Ok(())
}

/// Scoped quick-categorize. Returns `false` when the transaction does not
/// belong to the household.
pub async fn set_transaction_category(
    pool: &DbPool,
    household_id: HouseholdId,
    transaction_id: TransactionId,
    category_id: Option<CategoryId>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE transactions SET category_id = ?, updated_at = datetime('now')
         WHERE id = ? AND household_id = ?",
    )
    .bind(category_id.map(|c| c.0))
    .bind(transaction_id.0)
    .bind(household_id.0)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Transactions for one calendar month, newest first, with optional
/// category/payee/type filters.
pub async fn list_for_month(
    pool: &DbPool,
    household_id: HouseholdId,
    month: &str,
    filter: &TransactionFilter,
) -> Result<Vec<Transaction>, sqlx::Error> {
    let Some((start, end)) = month_bounds(month) else {
        return Ok(Vec::new());
    };

    let rows = sqlx::query_as::<_, TransactionRow>(&format!(
        "{SELECT_TRANSACTION} WHERE household_id = ? AND date >= ? AND date <= ?
         ORDER BY date DESC, id DESC"
    ))
    .bind(household_id.0)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    let payee_needle = filter.payee_contains.as_ref().map(|p| p.to_lowercase());

    Ok(rows
        .into_iter()
        .map(map_transaction)
        .filter(|tx| {
            filter.category_id.map_or(true, |c| tx.category_id == Some(c))
                && filter
                    .transaction_type
                    .map_or(true, |t| tx.transaction_type == t)
                && payee_needle
                    .as_ref()
                    .map_or(true, |needle| tx.payee.to_lowercase().contains(needle))
        })
        .collect())
}

pub async fn list_uncategorized_for_month(
    pool: &DbPool,
    household_id: HouseholdId,
    month: &str,
) -> Result<Vec<Transaction>, sqlx::Error> {
    let Some((start, end)) = month_bounds(month) else {
        return Ok(Vec::new());
    };

    let rows = sqlx::query_as::<_, TransactionRow>(&format!(
        "{SELECT_TRANSACTION} WHERE household_id = ? AND category_id IS NULL
             AND date >= ? AND date <= ?
         ORDER BY date DESC, id DESC"
    ))
    .bind(household_id.0)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(map_transaction).collect())
}

/// `(date, amount_cents, payee)` for every household transaction dated on
/// or after `since`. The duplicate engine recomputes fingerprints from
/// these with the same formula used at parse time.
pub async fn recent_payee_rows(
    pool: &DbPool,
    household_id: HouseholdId,
    since: NaiveDate,
) -> Result<Vec<(NaiveDate, i64, String)>, sqlx::Error> {
    sqlx::query_as::<_, (NaiveDate, i64, String)>(
        "SELECT date, amount_cents, payee FROM transactions WHERE household_id = ? AND date >= ?",
    )
    .bind(household_id.0)
    .bind(since)
    .fetch_all(pool)
    .await
}

fn month_bounds(month: &str) -> Option<(NaiveDate, NaiveDate)> {
    let (year, mon) = month.split_once('-')?;
    let year: i32 = year.parse().ok()?;
    let mon: u32 = mon.parse().ok()?;
    let start = NaiveDate::from_ymd_opt(year, mon, 1)?;
    let next = if mon == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, mon + 1, 1)?
    };
    Some((start, next.pred_opt()?))
}

fn map_transaction(row: TransactionRow) -> Transaction {
    Transaction {
        id: TransactionId(row.0),
        household_id: HouseholdId(row.1),
        entity_id: EntityId(row.2),
        account_id: row.3.map(AccountId),
        budget_month_id: BudgetMonthId(row.4),
        date: row.5,
        amount_cents: row.6,
        transaction_type: row.7.parse().unwrap_or(TransactionType::Expense),
        payee: row.8,
        memo: row.9,
        category_id: row.10.map(CategoryId),
        is_transfer: row.11 != 0,
        created_by: row.12.map(UserId),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_db;
    use crate::households::{create_entity, create_household};
    use hearth_core::EntityKind;

    async fn setup() -> (tempfile::TempDir, DbPool, HouseholdId, EntityId) {
        let dir = tempfile::tempdir().unwrap();
        let pool = create_db(&dir.path().join("test.db")).await.unwrap();
        let household = create_household(&pool, "Test Household").await.unwrap();
        let entity = create_entity(&pool, household, "Personal", EntityKind::Personal, 0.0)
            .await
            .unwrap();
        (dir, pool, household, entity)
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn new_row(
        household: HouseholdId,
        entity: EntityId,
        month: BudgetMonthId,
        date: NaiveDate,
        cents: i64,
        tx_type: TransactionType,
        payee: &str,
    ) -> NewTransactionRow {
        NewTransactionRow {
            household_id: household,
            entity_id: entity,
            account_id: None,
            budget_month_id: month,
            date,
            amount_cents: cents,
            transaction_type: tx_type,
            payee: payee.to_string(),
            memo: None,
            category_id: None,
            is_transfer: false,
            created_by: None,
        }
    }

    #[tokio::test]
    async fn budget_month_is_created_once() {
        let (_dir, pool, household, entity) = setup().await;
        let mut conn = pool.acquire().await.unwrap();

        let first = get_or_create_budget_month(&mut conn, household, entity, "2024-01")
            .await
            .unwrap();
        let second = get_or_create_budget_month(&mut conn, household, entity, "2024-01")
            .await
            .unwrap();
        assert_eq!(first, second);

        let other = get_or_create_budget_month(&mut conn, household, entity, "2024-02")
            .await
            .unwrap();
        assert_ne!(first, other);
    }

    #[tokio::test]
    async fn insert_and_get_round_trip() {
        let (_dir, pool, household, entity) = setup().await;
        let mut conn = pool.acquire().await.unwrap();
        let month = get_or_create_budget_month(&mut conn, household, entity, "2024-01")
            .await
            .unwrap();

        let id = insert_transaction(
            &mut conn,
            &new_row(
                household,
                entity,
                month,
                d(2024, 1, 15),
                4250,
                TransactionType::Expense,
                "WALMART #123",
            ),
        )
        .await
        .unwrap();

        let tx = get_transaction(&mut conn, household, id).await.unwrap().unwrap();
        assert_eq!(tx.date, d(2024, 1, 15));
        assert_eq!(tx.amount_cents, 4250);
        assert_eq!(tx.transaction_type, TransactionType::Expense);
        assert_eq!(tx.payee, "WALMART #123");
        assert!(!tx.is_transfer);

        // Scoped fetch: a different household sees nothing.
        let other = get_transaction(&mut conn, HouseholdId(household.0 + 1), id)
            .await
            .unwrap();
        assert!(other.is_none());
    }

    #[tokio::test]
    async fn month_listing_respects_bounds_and_filters() {
        let (_dir, pool, household, entity) = setup().await;
        let mut conn = pool.acquire().await.unwrap();
        let jan = get_or_create_budget_month(&mut conn, household, entity, "2024-01")
            .await
            .unwrap();
        let feb = get_or_create_budget_month(&mut conn, household, entity, "2024-02")
            .await
            .unwrap();

        for (month, date, cents, tx_type, payee) in [
            (jan, d(2024, 1, 15), 4250, TransactionType::Expense, "WALMART"),
            (jan, d(2024, 1, 31), 120000, TransactionType::Income, "PAYCHECK"),
            (feb, d(2024, 2, 1), 999, TransactionType::Expense, "NETFLIX"),
        ] {
            insert_transaction(
                &mut conn,
                &new_row(household, entity, month, date, cents, tx_type, payee),
            )
            .await
            .unwrap();
        }
        drop(conn);

        let january = list_for_month(&pool, household, "2024-01", &TransactionFilter::default())
            .await
            .unwrap();
        assert_eq!(january.len(), 2);
        // Newest first.
        assert_eq!(january[0].payee, "PAYCHECK");

        let incomes = list_for_month(
            &pool,
            household,
            "2024-01",
            &TransactionFilter {
                transaction_type: Some(TransactionType::Income),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(incomes.len(), 1);

        let walmart = list_for_month(
            &pool,
            household,
            "2024-01",
            &TransactionFilter {
                payee_contains: Some("walmart".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(walmart.len(), 1);

        let garbage = list_for_month(&pool, household, "not-a-month", &TransactionFilter::default())
            .await
            .unwrap();
        assert!(garbage.is_empty());
    }

    #[tokio::test]
    async fn recent_rows_honour_the_window_start() {
        let (_dir, pool, household, entity) = setup().await;
        let mut conn = pool.acquire().await.unwrap();
        let month = get_or_create_budget_month(&mut conn, household, entity, "2024-01")
            .await
            .unwrap();

        for (date, payee) in [(d(2024, 1, 1), "OLD"), (d(2024, 1, 20), "RECENT")] {
            insert_transaction(
                &mut conn,
                &new_row(household, entity, month, date, 100, TransactionType::Expense, payee),
            )
            .await
            .unwrap();
        }
        drop(conn);

        let rows = recent_payee_rows(&pool, household, d(2024, 1, 10)).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].2, "RECENT");
    }
}
