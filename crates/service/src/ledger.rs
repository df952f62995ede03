use chrono::NaiveDate;
use sqlx::SqliteConnection;
use tracing::{debug, info};

use hearth_core::{
    month_key, AccountId, CategoryId, CategoryKind, EntityId, EntityKind, HouseholdId,
    TransactionId, TransactionType, UserId,
};
use hearth_storage::{self as storage, DbPool, NewTransactionRow, TransactionUpdate};

use crate::ServiceError;

/// Suffix appended to the payee of the mirrored side of an owner draw.
pub const DRAW_PAYEE_SUFFIX: &str = " (Draw)";

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub entity_id: EntityId,
    pub account_id: Option<AccountId>,
    pub date: NaiveDate,
    pub amount_cents: i64,
    pub transaction_type: TransactionType,
    pub payee: String,
    pub memo: Option<String>,
    pub category_id: Option<CategoryId>,
    pub created_by: Option<UserId>,
}

#[derive(Debug, Clone, Copy)]
pub struct RecordedTransaction {
    pub id: TransactionId,
    /// The personal-entity income transaction created when the recorded
    /// row was an owner draw out of a business entity.
    pub mirrored: Option<TransactionId>,
}

/// New values for an edit. The account stays fixed; moving a transaction
/// between accounts is delete-and-recreate.
#[derive(Debug, Clone)]
pub struct TransactionChanges {
    pub date: NaiveDate,
    pub amount_cents: i64,
    pub transaction_type: TransactionType,
    pub payee: String,
    pub memo: Option<String>,
    pub category_id: Option<CategoryId>,
}

/// Transaction create/update/delete with the side effects that keep the
/// books consistent: account running balances and owner-draw transfer
/// links. Every operation runs inside a single database transaction, and
/// balance changes are applied as one atomic increment so there is no
/// read-modify-write window.
pub struct LedgerService {
    pool: DbPool,
}

impl LedgerService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn record(
        &self,
        household_id: HouseholdId,
        input: NewTransaction,
    ) -> Result<RecordedTransaction, ServiceError> {
        let mut input = input;
        input.payee = input.payee.trim().to_string();
        input.memo = input
            .memo
            .take()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());

        if input.payee.is_empty() {
            return Err(ServiceError::InvalidInput("Payee is required.".to_string()));
        }
        if input.amount_cents <= 0 {
            return Err(ServiceError::InvalidInput(
                "Amount must be greater than 0.".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        // A category outside the household is dropped, not rejected.
        if let Some(category_id) = input.category_id {
            if storage::get_category(&mut tx, household_id, category_id)
                .await?
                .is_none()
            {
                input.category_id = None;
            }
        }

        let recorded = record_in_tx(&mut tx, household_id, &input).await?;
        tx.commit().await?;
        Ok(recorded)
    }

    pub async fn update(
        &self,
        household_id: HouseholdId,
        transaction_id: TransactionId,
        changes: TransactionChanges,
    ) -> Result<(), ServiceError> {
        let payee = changes.payee.trim().to_string();
        let memo = changes
            .memo
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());

        let mut tx = self.pool.begin().await?;

        let existing = storage::get_transaction(&mut tx, household_id, transaction_id)
            .await?
            .ok_or(ServiceError::NotFound("transaction"))?;

        let month = month_key(changes.date);
        let budget_month =
            storage::get_or_create_budget_month(&mut tx, household_id, existing.entity_id, &month)
                .await?;

        storage::update_transaction(
            &mut tx,
            transaction_id,
            &TransactionUpdate {
                budget_month_id: budget_month,
                date: changes.date,
                amount_cents: changes.amount_cents,
                transaction_type: changes.transaction_type,
                payee: payee.clone(),
                memo,
                category_id: changes.category_id,
            },
        )
        .await?;

        if let Some(account_id) = existing.account_id {
            let delta = changes.transaction_type.signed_effect(changes.amount_cents)
                - existing.transaction_type.signed_effect(existing.amount_cents);
            if delta != 0 {
                storage::apply_balance_delta(&mut tx, account_id, delta).await?;
            }
        }

        // Only date/amount/payee propagate to a linked mirror; its
        // category and entity keep their original resolution.
        if let Some(link) = storage::link_for_source(&mut tx, transaction_id).await? {
            storage::sync_linked_transaction(
                &mut tx,
                link.to_transaction_id,
                changes.date,
                changes.amount_cents,
                &format!("{payee}{DRAW_PAYEE_SUFFIX}"),
            )
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Delete a transaction, reversing its balance effect. When the row is
    /// the source of an owner-draw link the mirrored transaction goes with
    /// it; the link row cascades at the storage layer. Returns `false`
    /// when the transaction is not the household's.
    pub async fn delete(
        &self,
        household_id: HouseholdId,
        transaction_id: TransactionId,
    ) -> Result<bool, ServiceError> {
        let mut tx = self.pool.begin().await?;

        let Some(existing) = storage::get_transaction(&mut tx, household_id, transaction_id).await?
        else {
            return Ok(false);
        };

        if let Some(account_id) = existing.account_id {
            let reversal = -existing
                .transaction_type
                .signed_effect(existing.amount_cents);
            storage::apply_balance_delta(&mut tx, account_id, reversal).await?;
        }

        if let Some(link) = storage::link_for_source(&mut tx, transaction_id).await? {
            storage::delete_transaction(&mut tx, link.to_transaction_id).await?;
        }

        storage::delete_transaction(&mut tx, transaction_id).await?;
        tx.commit().await?;
        Ok(true)
    }

    /// Quick categorize: assign or clear the category, verifying ownership
    /// of the target first.
    pub async fn set_category(
        &self,
        household_id: HouseholdId,
        transaction_id: TransactionId,
        category_id: Option<CategoryId>,
    ) -> Result<bool, ServiceError> {
        if let Some(category_id) = category_id {
            let mut conn = self.pool.acquire().await?;
            if storage::get_category(&mut *conn, household_id, category_id)
                .await?
                .is_none()
            {
                return Err(ServiceError::NotFound("category"));
            }
        }

        Ok(storage::set_transaction_category(&self.pool, household_id, transaction_id, category_id)
            .await?)
    }
}

/// Insert a transaction plus its side effects inside an already-open
/// database transaction. Shared by the form entry point above and the CSV
/// import confirm step.
pub(crate) async fn record_in_tx(
    conn: &mut SqliteConnection,
    household_id: HouseholdId,
    input: &NewTransaction,
) -> Result<RecordedTransaction, ServiceError> {
    let month = month_key(input.date);
    let budget_month =
        storage::get_or_create_budget_month(&mut *conn, household_id, input.entity_id, &month)
            .await?;

    let id = storage::insert_transaction(
        &mut *conn,
        &NewTransactionRow {
            household_id,
            entity_id: input.entity_id,
            account_id: input.account_id,
            budget_month_id: budget_month,
            date: input.date,
            amount_cents: input.amount_cents,
            transaction_type: input.transaction_type,
            payee: input.payee.clone(),
            memo: input.memo.clone(),
            category_id: input.category_id,
            is_transfer: false,
            created_by: input.created_by,
        },
    )
    .await?;

    if let Some(account_id) = input.account_id {
        let delta = input.transaction_type.signed_effect(input.amount_cents);
        storage::apply_balance_delta(&mut *conn, account_id, delta).await?;
    }

    let mirrored = maybe_link_owner_draw(conn, household_id, id, input, &month).await?;

    Ok(RecordedTransaction { id, mirrored })
}

/// Mirror a business-entity owner draw into the household's personal
/// entity as income and link the pair. Any missing precondition means no
/// link: the expense still records on its own.
async fn maybe_link_owner_draw(
    conn: &mut SqliteConnection,
    household_id: HouseholdId,
    source_id: TransactionId,
    input: &NewTransaction,
    month: &str,
) -> Result<Option<TransactionId>, ServiceError> {
    if input.transaction_type != TransactionType::Expense {
        return Ok(None);
    }
    let Some(category_id) = input.category_id else {
        return Ok(None);
    };
    let Some(category) = storage::get_category(&mut *conn, household_id, category_id).await? else {
        return Ok(None);
    };
    if category.kind != CategoryKind::OwnerDraw {
        return Ok(None);
    }
    let Some(entity) = storage::get_entity(&mut *conn, household_id, input.entity_id).await? else {
        return Ok(None);
    };
    if entity.kind != EntityKind::Business {
        return Ok(None);
    }
    let Some(personal) = storage::personal_entity(&mut *conn, household_id).await? else {
        debug!(household = %household_id, "no personal entity; owner draw recorded without link");
        return Ok(None);
    };

    let personal_month =
        storage::get_or_create_budget_month(&mut *conn, household_id, personal.id, month).await?;
    let mirror_category = storage::personal_draw_category(&mut *conn, household_id).await?;

    let mirror_id = storage::insert_transaction(
        &mut *conn,
        &NewTransactionRow {
            household_id,
            entity_id: personal.id,
            account_id: None,
            budget_month_id: personal_month,
            date: input.date,
            amount_cents: input.amount_cents,
            transaction_type: TransactionType::Income,
            payee: format!("{}{DRAW_PAYEE_SUFFIX}", input.payee),
            memo: None,
            category_id: mirror_category,
            is_transfer: true,
            created_by: input.created_by,
        },
    )
    .await?;

    storage::insert_linked_transfer(&mut *conn, source_id, mirror_id).await?;
    info!(source = %source_id, mirror = %mirror_id, "linked owner draw to personal entity");

    Ok(Some(mirror_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_core::{AccountType, EntityKind};
    use hearth_storage::DbPool;

    struct Harness {
        _dir: tempfile::TempDir,
        pool: DbPool,
        household: HouseholdId,
        personal: EntityId,
        business: EntityId,
        ledger: LedgerService,
    }

    async fn setup() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let pool = storage::create_db(&dir.path().join("test.db")).await.unwrap();
        let household = storage::create_household(&pool, "Test Household").await.unwrap();
        let personal =
            storage::create_entity(&pool, household, "Personal", EntityKind::Personal, 0.0)
                .await
                .unwrap();
        let business =
            storage::create_entity(&pool, household, "Acme LLC", EntityKind::Business, 25.0)
                .await
                .unwrap();
        storage::seed_personal_categories(&pool, household).await.unwrap();
        storage::seed_business_categories(&pool, household, business).await.unwrap();

        Harness {
            _dir: dir,
            pool: pool.clone(),
            household,
            personal,
            business,
            ledger: LedgerService::new(pool),
        }
    }

    async fn category_named(h: &Harness, name: &str) -> CategoryId {
        let mut conn = h.pool.acquire().await.unwrap();
        storage::find_category_by_name(&mut *conn, h.household, name)
            .await
            .unwrap()
            .unwrap()
            .id
    }

    async fn balance_of(h: &Harness, entity: EntityId, account: AccountId) -> i64 {
        let mut conn = h.pool.acquire().await.unwrap();
        storage::get_account(&mut *conn, entity, account)
            .await
            .unwrap()
            .unwrap()
            .balance_cents
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn tx_input(
        entity: EntityId,
        account: Option<AccountId>,
        cents: i64,
        tx_type: TransactionType,
        payee: &str,
        category: Option<CategoryId>,
    ) -> NewTransaction {
        NewTransaction {
            entity_id: entity,
            account_id: account,
            date: d(2024, 1, 15),
            amount_cents: cents,
            transaction_type: tx_type,
            payee: payee.to_string(),
            memo: None,
            category_id: category,
            created_by: Some(UserId(1)),
        }
    }

    #[tokio::test]
    async fn record_applies_balance_effects() {
        let h = setup().await;
        let account = storage::create_account(
            &h.pool,
            h.personal,
            "Checking",
            AccountType::Checking,
            10_000,
        )
        .await
        .unwrap();

        h.ledger
            .record(
                h.household,
                tx_input(h.personal, Some(account), 5_000, TransactionType::Income, "PAYCHECK", None),
            )
            .await
            .unwrap();
        assert_eq!(balance_of(&h, h.personal, account).await, 15_000);

        h.ledger
            .record(
                h.household,
                tx_input(h.personal, Some(account), 2_000, TransactionType::Expense, "GROCER", None),
            )
            .await
            .unwrap();
        assert_eq!(balance_of(&h, h.personal, account).await, 13_000);
    }

    #[tokio::test]
    async fn balance_equals_starting_plus_signed_effects() {
        let h = setup().await;
        let start = 50_000;
        let account =
            storage::create_account(&h.pool, h.personal, "Checking", AccountType::Checking, start)
                .await
                .unwrap();

        let a = h
            .ledger
            .record(
                h.household,
                tx_input(h.personal, Some(account), 1_000, TransactionType::Income, "A", None),
            )
            .await
            .unwrap();
        let b = h
            .ledger
            .record(
                h.household,
                tx_input(h.personal, Some(account), 250, TransactionType::Expense, "B", None),
            )
            .await
            .unwrap();

        // A flips from +1000 income to -500 expense.
        h.ledger
            .update(
                h.household,
                a.id,
                TransactionChanges {
                    date: d(2024, 1, 16),
                    amount_cents: 500,
                    transaction_type: TransactionType::Expense,
                    payee: "A".to_string(),
                    memo: None,
                    category_id: None,
                },
            )
            .await
            .unwrap();

        // B's -250 is reversed on delete.
        assert!(h.ledger.delete(h.household, b.id).await.unwrap());

        let net = -500;
        assert_eq!(balance_of(&h, h.personal, account).await, start + net);
    }

    #[tokio::test]
    async fn record_rejects_bad_input() {
        let h = setup().await;

        let err = h
            .ledger
            .record(
                h.household,
                tx_input(h.personal, None, 100, TransactionType::Expense, "   ", None),
            )
            .await;
        assert!(matches!(err, Err(ServiceError::InvalidInput(_))));

        let err = h
            .ledger
            .record(
                h.household,
                tx_input(h.personal, None, 0, TransactionType::Expense, "ZERO", None),
            )
            .await;
        assert!(matches!(err, Err(ServiceError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn foreign_category_is_dropped_not_rejected() {
        let h = setup().await;
        let other = storage::create_household(&h.pool, "Other").await.unwrap();
        let foreign = storage::create_category(
            &h.pool,
            other,
            None,
            "Group",
            "Theirs",
            hearth_core::CategoryKind::Standard,
            0,
        )
        .await
        .unwrap();

        let recorded = h
            .ledger
            .record(
                h.household,
                tx_input(h.personal, None, 100, TransactionType::Expense, "X", Some(foreign)),
            )
            .await
            .unwrap();

        let mut conn = h.pool.acquire().await.unwrap();
        let stored = storage::get_transaction(&mut *conn, h.household, recorded.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.category_id, None);
    }

    #[tokio::test]
    async fn owner_draw_creates_mirror_and_link() {
        let h = setup().await;
        let draw = category_named(&h, "Owner Draw").await;
        let paycheck = category_named(&h, "Paycheck 1").await;

        let recorded = h
            .ledger
            .record(
                h.household,
                tx_input(
                    h.business,
                    None,
                    75_000,
                    TransactionType::Expense,
                    "Monthly draw",
                    Some(draw),
                ),
            )
            .await
            .unwrap();

        let mirror_id = recorded.mirrored.expect("owner draw should mirror");
        let mut conn = h.pool.acquire().await.unwrap();
        let mirror = storage::get_transaction(&mut *conn, h.household, mirror_id)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(mirror.entity_id, h.personal);
        assert_eq!(mirror.transaction_type, TransactionType::Income);
        assert_eq!(mirror.amount_cents, 75_000);
        assert_eq!(mirror.payee, "Monthly draw (Draw)");
        assert!(mirror.is_transfer);
        // Personal side lands in the paycheck-kind category.
        assert_eq!(mirror.category_id, Some(paycheck));

        let link = storage::link_for_source(&mut *conn, recorded.id)
            .await
            .unwrap()
            .expect("link row");
        assert_eq!(link.to_transaction_id, mirror_id);
        assert_eq!(link.transfer_type, "owner_draw");
    }

    #[tokio::test]
    async fn owner_draw_without_personal_entity_records_unlinked() {
        let h = setup().await;
        let solo = storage::create_household(&h.pool, "Business Only").await.unwrap();
        let llc = storage::create_entity(&h.pool, solo, "Solo LLC", EntityKind::Business, 20.0)
            .await
            .unwrap();
        storage::seed_business_categories(&h.pool, solo, llc).await.unwrap();

        let mut conn = h.pool.acquire().await.unwrap();
        let draw = storage::find_category_by_name(&mut *conn, solo, "Owner Draw")
            .await
            .unwrap()
            .unwrap()
            .id;
        drop(conn);

        let recorded = h
            .ledger
            .record(
                solo,
                tx_input(llc, None, 10_000, TransactionType::Expense, "Draw", Some(draw)),
            )
            .await
            .unwrap();
        assert!(recorded.mirrored.is_none());

        let mut conn = h.pool.acquire().await.unwrap();
        assert!(storage::get_transaction(&mut *conn, solo, recorded.id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn draw_category_in_personal_entity_does_not_link() {
        let h = setup().await;
        let draw = category_named(&h, "Owner Draw").await;

        let recorded = h
            .ledger
            .record(
                h.household,
                tx_input(h.personal, None, 5_000, TransactionType::Expense, "Oops", Some(draw)),
            )
            .await
            .unwrap();
        assert!(recorded.mirrored.is_none());
    }

    #[tokio::test]
    async fn update_syncs_only_mirror_date_amount_payee() {
        let h = setup().await;
        let draw = category_named(&h, "Owner Draw").await;
        let paycheck = category_named(&h, "Paycheck 1").await;

        let recorded = h
            .ledger
            .record(
                h.household,
                tx_input(h.business, None, 75_000, TransactionType::Expense, "Monthly draw", Some(draw)),
            )
            .await
            .unwrap();
        let mirror_id = recorded.mirrored.unwrap();

        h.ledger
            .update(
                h.household,
                recorded.id,
                TransactionChanges {
                    date: d(2024, 2, 1),
                    amount_cents: 80_000,
                    transaction_type: TransactionType::Expense,
                    payee: "February draw".to_string(),
                    memo: None,
                    category_id: Some(draw),
                },
            )
            .await
            .unwrap();

        let mut conn = h.pool.acquire().await.unwrap();
        let mirror = storage::get_transaction(&mut *conn, h.household, mirror_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(mirror.date, d(2024, 2, 1));
        assert_eq!(mirror.amount_cents, 80_000);
        assert_eq!(mirror.payee, "February draw (Draw)");
        // Untouched by the sync:
        assert_eq!(mirror.category_id, Some(paycheck));
        assert_eq!(mirror.entity_id, h.personal);
        assert!(mirror.is_transfer);
    }

    #[tokio::test]
    async fn delete_reverses_balance_and_removes_mirror() {
        let h = setup().await;
        let draw = category_named(&h, "Owner Draw").await;
        let account = storage::create_account(
            &h.pool,
            h.business,
            "Business Checking",
            AccountType::Checking,
            200_000,
        )
        .await
        .unwrap();

        let recorded = h
            .ledger
            .record(
                h.household,
                tx_input(
                    h.business,
                    Some(account),
                    75_000,
                    TransactionType::Expense,
                    "Monthly draw",
                    Some(draw),
                ),
            )
            .await
            .unwrap();
        let mirror_id = recorded.mirrored.unwrap();
        assert_eq!(balance_of(&h, h.business, account).await, 125_000);

        assert!(h.ledger.delete(h.household, recorded.id).await.unwrap());
        assert_eq!(balance_of(&h, h.business, account).await, 200_000);

        let mut conn = h.pool.acquire().await.unwrap();
        assert!(storage::get_transaction(&mut *conn, h.household, recorded.id)
            .await
            .unwrap()
            .is_none());
        assert!(storage::get_transaction(&mut *conn, h.household, mirror_id)
            .await
            .unwrap()
            .is_none());
        assert!(storage::link_for_source(&mut *conn, recorded.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn delete_of_foreign_transaction_is_refused() {
        let h = setup().await;
        let recorded = h
            .ledger
            .record(
                h.household,
                tx_input(h.personal, None, 100, TransactionType::Expense, "Mine", None),
            )
            .await
            .unwrap();

        let other = storage::create_household(&h.pool, "Other").await.unwrap();
        assert!(!h.ledger.delete(other, recorded.id).await.unwrap());
    }

    #[tokio::test]
    async fn set_category_checks_ownership() {
        let h = setup().await;
        let recorded = h
            .ledger
            .record(
                h.household,
                tx_input(h.personal, None, 100, TransactionType::Expense, "Latte", None),
            )
            .await
            .unwrap();

        let coffee = category_named(&h, "Coffee").await;
        assert!(h
            .ledger
            .set_category(h.household, recorded.id, Some(coffee))
            .await
            .unwrap());

        let other = storage::create_household(&h.pool, "Other").await.unwrap();
        let foreign = storage::create_category(
            &h.pool,
            other,
            None,
            "Group",
            "Theirs",
            hearth_core::CategoryKind::Standard,
            0,
        )
        .await
        .unwrap();
        let err = h
            .ledger
            .set_category(h.household, recorded.id, Some(foreign))
            .await;
        assert!(matches!(err, Err(ServiceError::NotFound("category"))));

        // Clearing is always allowed.
        assert!(h
            .ledger
            .set_category(h.household, recorded.id, None)
            .await
            .unwrap());
    }
}
