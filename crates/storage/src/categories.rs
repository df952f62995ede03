use sqlx::SqliteConnection;

use hearth_core::{
    Category, CategoryId, CategoryKind, EntityId, HouseholdId, DEFAULT_BUSINESS_CATEGORIES,
    DEFAULT_PERSONAL_CATEGORIES,
};

use crate::db::DbPool;

type CategoryRow = (i64, i64, Option<i64>, String, String, String, i64, i64);

const SELECT_CATEGORY: &str = "SELECT id, household_id, entity_id, group_name, name, kind, \
     is_archived, sort_order FROM categories";

pub async fn create_category(
    pool: &DbPool,
    household_id: HouseholdId,
    entity_id: Option<EntityId>,
    group_name: &str,
    name: &str,
    kind: CategoryKind,
    sort_order: i64,
) -> Result<CategoryId, sqlx::Error> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO categories (household_id, entity_id, group_name, name, kind, sort_order)
         VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(household_id.0)
    .bind(entity_id.map(|e| e.0))
    .bind(group_name)
    .bind(name)
    .bind(kind.as_str())
    .bind(sort_order)
    .fetch_one(pool)
    .await?;
    Ok(CategoryId(id))
}

/// Active categories for the household, in display order.
pub async fn list_categories(
    pool: &DbPool,
    household_id: HouseholdId,
) -> Result<Vec<Category>, sqlx::Error> {
    let rows = sqlx::query_as::<_, CategoryRow>(&format!(
        "{SELECT_CATEGORY} WHERE household_id = ? AND is_archived = 0 ORDER BY sort_order, id"
    ))
    .bind(household_id.0)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(map_category).collect())
}

/// Fetch a category only if it belongs to the household. Used as the
/// ownership check before assignments.
pub async fn get_category(
    conn: &mut SqliteConnection,
    household_id: HouseholdId,
    category_id: CategoryId,
) -> Result<Option<Category>, sqlx::Error> {
    let row = sqlx::query_as::<_, CategoryRow>(&format!(
        "{SELECT_CATEGORY} WHERE id = ? AND household_id = ?"
    ))
    .bind(category_id.0)
    .bind(household_id.0)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(map_category))
}

pub async fn find_category_by_name(
    conn: &mut SqliteConnection,
    household_id: HouseholdId,
    name: &str,
) -> Result<Option<Category>, sqlx::Error> {
    let row = sqlx::query_as::<_, CategoryRow>(&format!(
        "{SELECT_CATEGORY} WHERE household_id = ? AND name = ? AND is_archived = 0 \
         ORDER BY sort_order, id LIMIT 1"
    ))
    .bind(household_id.0)
    .bind(name)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(map_category))
}

/// Personal-side category a mirrored owner draw lands in: an owner-draw
/// kind if the household has one outside any business entity, otherwise a
/// paycheck kind, otherwise none.
pub async fn personal_draw_category(
    conn: &mut SqliteConnection,
    household_id: HouseholdId,
) -> Result<Option<CategoryId>, sqlx::Error> {
    for kind in [CategoryKind::OwnerDraw, CategoryKind::Paycheck] {
        let found: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM categories
             WHERE household_id = ? AND entity_id IS NULL AND kind = ? AND is_archived = 0
             ORDER BY sort_order, id LIMIT 1",
        )
        .bind(household_id.0)
        .bind(kind.as_str())
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(id) = found {
            return Ok(Some(CategoryId(id)));
        }
    }
    Ok(None)
}

/// Seed the personal starter categories for a new household. Runs in one
/// transaction; a failure leaves nothing behind.
pub async fn seed_personal_categories(
    pool: &DbPool,
    household_id: HouseholdId,
) -> Result<usize, sqlx::Error> {
    seed_tree(pool, household_id, None, DEFAULT_PERSONAL_CATEGORIES).await
}

/// Seed the business starter categories for a new LLC entity.
pub async fn seed_business_categories(
    pool: &DbPool,
    household_id: HouseholdId,
    entity_id: EntityId,
) -> Result<usize, sqlx::Error> {
    seed_tree(pool, household_id, Some(entity_id), DEFAULT_BUSINESS_CATEGORIES).await
}

async fn seed_tree(
    pool: &DbPool,
    household_id: HouseholdId,
    entity_id: Option<EntityId>,
    tree: &[(&str, &[(&str, CategoryKind)])],
) -> Result<usize, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let mut inserted = 0usize;
    let mut sort_order = 0i64;

    for (group_name, categories) in tree {
        for (name, kind) in *categories {
            sqlx::query(
                "INSERT INTO categories (household_id, entity_id, group_name, name, kind, sort_order)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(household_id.0)
            .bind(entity_id.map(|e| e.0))
            .bind(group_name)
            .bind(name)
            .bind(kind.as_str())
            .bind(sort_order)
            .execute(&mut *tx)
            .await?;
            inserted += 1;
            sort_order += 1;
        }
    }

    tx.commit().await?;
    Ok(inserted)
}

fn map_category(row: CategoryRow) -> Category {
    Category {
        id: CategoryId(row.0),
        household_id: HouseholdId(row.1),
        entity_id: row.2.map(EntityId),
        group_name: row.3,
        name: row.4,
        kind: row.5.parse().unwrap_or(CategoryKind::Standard),
        is_archived: row.6 != 0,
        sort_order: row.7,
    }
}
