use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info};

use hearth_core::{CategoryId, HouseholdId, MatchType, RuleId};
use hearth_import::rules::{match_category, PayeeRule};
use hearth_storage::{self as storage, CategorizationRule, DbPool};

use crate::ServiceError;

/// Built-in merchant-to-category starter rules. Terms whose category name
/// does not exist for a household are simply not seeded.
pub const DEFAULT_RULES: &[(&str, &str)] = &[
    // Food
    ("Walmart", "Groceries"),
    ("Kroger", "Groceries"),
    ("Aldi", "Groceries"),
    ("Whole Foods", "Groceries"),
    ("Publix", "Groceries"),
    ("Costco", "Groceries"),
    ("McDonald's", "Restaurants"),
    ("Chick-fil-A", "Restaurants"),
    ("Chipotle", "Restaurants"),
    ("Starbucks", "Coffee Shops"),
    ("Dunkin", "Coffee Shops"),
    // Transportation
    ("Shell", "Gas"),
    ("Exxon", "Gas"),
    ("BP", "Gas"),
    ("Chevron", "Gas"),
    ("Wawa", "Gas"),
    ("Uber", "Public Transit"),
    ("Lyft", "Public Transit"),
    // Utilities
    ("AT&T", "Phone"),
    ("Verizon", "Phone"),
    ("T-Mobile", "Phone"),
    ("Comcast", "Internet"),
    ("Xfinity", "Internet"),
    ("Spectrum", "Internet"),
    // Personal
    ("Netflix", "Subscriptions"),
    ("Spotify", "Subscriptions"),
    ("Hulu", "Subscriptions"),
    ("Disney+", "Subscriptions"),
    ("Amazon Prime", "Subscriptions"),
    ("Apple.com", "Subscriptions"),
    ("Target", "Clothing"),
    ("T.J. Maxx", "Clothing"),
    // Home
    ("Home Depot", "Home Improvement"),
    ("Lowe's", "Home Improvement"),
];

struct CachedRules {
    records: Vec<CategorizationRule>,
    matchers: Vec<PayeeRule>,
}

/// Household-scoped categorization rules with an in-process memo of the
/// ordered rule list. The cache is an optimization only: it is filled
/// lazily, dropped on any write through this instance, and the service
/// can be built with it disabled without changing behaviour. It is not
/// shared across processes; a rule created elsewhere is not visible to an
/// already-warmed instance.
pub struct RuleService {
    pool: DbPool,
    cache_enabled: bool,
    cache: Mutex<HashMap<HouseholdId, Arc<CachedRules>>>,
}

impl RuleService {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            cache_enabled: true,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Bypass the memo entirely; every call reads the store.
    pub fn without_cache(pool: DbPool) -> Self {
        Self {
            pool,
            cache_enabled: false,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Rules for a household, newest first.
    pub async fn get_rules(
        &self,
        household_id: HouseholdId,
    ) -> Result<Vec<CategorizationRule>, ServiceError> {
        Ok(self.cached(household_id).await?.records.clone())
    }

    /// Resolve a payee to a category by first-match-wins scan over the
    /// household's rules, newest rule first.
    pub async fn match_payee(
        &self,
        household_id: HouseholdId,
        payee: &str,
    ) -> Result<Option<CategoryId>, ServiceError> {
        let cached = self.cached(household_id).await?;
        Ok(match_category(&cached.matchers, payee))
    }

    /// Create a rule. The target category is not checked against the
    /// household here; the calling screen scopes the picker.
    pub async fn create_rule(
        &self,
        household_id: HouseholdId,
        search_term: &str,
        category_id: CategoryId,
        match_type: MatchType,
    ) -> Result<RuleId, ServiceError> {
        let mut conn = self.pool.acquire().await?;
        let id = storage::insert_rule(
            &mut *conn,
            household_id,
            search_term.trim(),
            category_id,
            match_type,
        )
        .await?;
        self.invalidate(household_id);
        Ok(id)
    }

    pub async fn delete_rule(
        &self,
        household_id: HouseholdId,
        rule_id: RuleId,
    ) -> Result<bool, ServiceError> {
        let deleted = storage::delete_rule(&self.pool, household_id, rule_id).await?;
        self.invalidate(household_id);
        Ok(deleted)
    }

    /// Seed the built-in starter rules, skipping any search term the
    /// household already has (case-insensitive) and any category name it
    /// does not. All inserts run in one transaction. Returns the number of
    /// rules actually inserted; repeated runs add nothing.
    pub async fn seed_default_rules(
        &self,
        household_id: HouseholdId,
    ) -> Result<usize, ServiceError> {
        let categories = storage::list_categories(&self.pool, household_id).await?;
        let mut category_by_name: HashMap<String, CategoryId> = HashMap::new();
        for category in &categories {
            category_by_name.insert(category.name.clone(), category.id);
        }

        let existing_terms: HashSet<String> = self
            .get_rules(household_id)
            .await?
            .iter()
            .map(|r| r.search_term.to_lowercase())
            .collect();

        let mut tx = self.pool.begin().await?;
        let mut inserted = 0usize;

        for (term, category_name) in DEFAULT_RULES {
            let Some(&category_id) = category_by_name.get(*category_name) else {
                continue;
            };
            if existing_terms.contains(&term.to_lowercase()) {
                continue;
            }
            storage::insert_rule(&mut *tx, household_id, term, category_id, MatchType::Contains)
                .await?;
            inserted += 1;
        }

        tx.commit().await?;
        self.invalidate(household_id);
        info!(household = %household_id, inserted, "seeded default categorization rules");
        Ok(inserted)
    }

    pub fn invalidate(&self, household_id: HouseholdId) {
        self.lock_cache().remove(&household_id);
    }

    async fn cached(&self, household_id: HouseholdId) -> Result<Arc<CachedRules>, ServiceError> {
        if self.cache_enabled {
            if let Some(hit) = self.lock_cache().get(&household_id) {
                return Ok(hit.clone());
            }
        }

        let records = storage::list_rules(&self.pool, household_id).await?;
        let matchers = records
            .iter()
            .map(|r| PayeeRule {
                search_term: r.search_term.clone(),
                match_type: r.match_type,
                category_id: r.category_id,
            })
            .collect();
        let entry = Arc::new(CachedRules { records, matchers });

        if self.cache_enabled {
            debug!(household = %household_id, rules = entry.records.len(), "warmed rule cache");
            self.lock_cache().insert(household_id, entry.clone());
        }
        Ok(entry)
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, HashMap<HouseholdId, Arc<CachedRules>>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
