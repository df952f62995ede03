use sqlx::SqliteConnection;

use hearth_core::{Entity, EntityId, EntityKind, HouseholdId};

use crate::db::DbPool;

pub async fn create_household(pool: &DbPool, name: &str) -> Result<HouseholdId, sqlx::Error> {
    let id: i64 = sqlx::query_scalar("INSERT INTO households (name) VALUES (?) RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await?;
    Ok(HouseholdId(id))
}

pub async fn create_entity(
    pool: &DbPool,
    household_id: HouseholdId,
    name: &str,
    kind: EntityKind,
    tax_rate_percent: f64,
) -> Result<EntityId, sqlx::Error> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO entities (household_id, name, kind, tax_rate_percent) VALUES (?, ?, ?, ?) RETURNING id",
    )
    .bind(household_id.0)
    .bind(name)
    .bind(kind.as_str())
    .bind(tax_rate_percent)
    .fetch_one(pool)
    .await?;
    Ok(EntityId(id))
}

pub async fn get_entity(
    conn: &mut SqliteConnection,
    household_id: HouseholdId,
    entity_id: EntityId,
) -> Result<Option<Entity>, sqlx::Error> {
    let row = sqlx::query_as::<_, (i64, i64, String, String, f64)>(
        "SELECT id, household_id, name, kind, tax_rate_percent FROM entities WHERE id = ? AND household_id = ?",
    )
    .bind(entity_id.0)
    .bind(household_id.0)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(map_entity))
}

/// The household's personal entity. Households are expected to have
/// exactly one; if several exist the oldest wins.
pub async fn personal_entity(
    conn: &mut SqliteConnection,
    household_id: HouseholdId,
) -> Result<Option<Entity>, sqlx::Error> {
    let row = sqlx::query_as::<_, (i64, i64, String, String, f64)>(
        "SELECT id, household_id, name, kind, tax_rate_percent FROM entities
         WHERE household_id = ? AND kind = 'personal' ORDER BY id LIMIT 1",
    )
    .bind(household_id.0)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(map_entity))
}

fn map_entity(row: (i64, i64, String, String, f64)) -> Entity {
    Entity {
        id: EntityId(row.0),
        household_id: HouseholdId(row.1),
        name: row.2,
        kind: row.3.parse().unwrap_or(EntityKind::Personal),
        tax_rate_percent: row.4,
    }
}
