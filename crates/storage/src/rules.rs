use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;

use hearth_core::{CategoryId, HouseholdId, MatchType, RuleId};

use crate::db::DbPool;

/// Persisted categorization rule, joined with its category's display name
/// for the rules screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorizationRule {
    pub id: RuleId,
    pub household_id: HouseholdId,
    pub search_term: String,
    pub match_type: MatchType,
    pub category_id: CategoryId,
    pub category_name: String,
    pub created_at: String,
}

pub async fn insert_rule(
    conn: &mut SqliteConnection,
    household_id: HouseholdId,
    search_term: &str,
    category_id: CategoryId,
    match_type: MatchType,
) -> Result<RuleId, sqlx::Error> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO transaction_rules (household_id, search_term, match_type, category_id)
         VALUES (?, ?, ?, ?) RETURNING id",
    )
    .bind(household_id.0)
    .bind(search_term)
    .bind(match_type.as_str())
    .bind(category_id.0)
    .fetch_one(conn)
    .await?;
    Ok(RuleId(id))
}

/// Rules for a household, newest first. Rows created in the same second
/// share a timestamp, so the id breaks the tie toward the later insert.
pub async fn list_rules(
    pool: &DbPool,
    household_id: HouseholdId,
) -> Result<Vec<CategorizationRule>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (i64, i64, String, String, i64, String, String)>(
        "SELECT r.id, r.household_id, r.search_term, r.match_type, r.category_id,
                c.name, r.created_at
         FROM transaction_rules r
         JOIN categories c ON c.id = r.category_id
         WHERE r.household_id = ?
         ORDER BY r.created_at DESC, r.id DESC",
    )
    .bind(household_id.0)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| CategorizationRule {
            id: RuleId(r.0),
            household_id: HouseholdId(r.1),
            search_term: r.2,
            match_type: r.3.parse().unwrap_or(MatchType::Contains),
            category_id: CategoryId(r.4),
            category_name: r.5,
            created_at: r.6,
        })
        .collect())
}

/// Scoped delete; `false` when the rule is not the household's.
pub async fn delete_rule(
    pool: &DbPool,
    household_id: HouseholdId,
    rule_id: RuleId,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM transaction_rules WHERE id = ? AND household_id = ?")
        .bind(rule_id.0)
        .bind(household_id.0)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
