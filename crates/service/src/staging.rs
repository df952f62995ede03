use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use hearth_core::{CategoryId, EntityId, HouseholdId, UserId};
use hearth_import::ParsedTransaction;

/// One parsed row awaiting confirmation, carrying the rule engine's
/// suggestion (if any) for the preview form to pre-select.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedTransaction {
    pub transaction: ParsedTransaction,
    pub suggested_category: Option<CategoryId>,
}

/// Everything the confirm step needs, staged between preview and confirm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedImport {
    pub household_id: HouseholdId,
    pub entity_id: EntityId,
    pub user_id: Option<UserId>,
    pub transactions: Vec<StagedTransaction>,
}

struct Entry {
    staged: StagedImport,
    expires_at: Instant,
}

/// Server-side holding area for parsed imports, keyed by an opaque token
/// handed to the client between the preview and confirm requests. Entries
/// expire after the TTL; expired entries are swept lazily on access.
pub struct StagingStore {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl StagingStore {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_default_ttl() -> Self {
        Self::new(Self::DEFAULT_TTL)
    }

    /// Stage an import and return its token.
    pub fn put(&self, staged: StagedImport) -> String {
        let token = Uuid::new_v4().to_string();
        let mut entries = self.lock();
        Self::sweep(&mut entries);
        entries.insert(
            token.clone(),
            Entry {
                staged,
                expires_at: Instant::now() + self.ttl,
            },
        );
        token
    }

    pub fn get(&self, token: &str) -> Option<StagedImport> {
        let mut entries = self.lock();
        Self::sweep(&mut entries);
        entries.get(token).map(|e| e.staged.clone())
    }

    pub fn remove(&self, token: &str) {
        self.lock().remove(token);
    }

    fn sweep(entries: &mut HashMap<String, Entry>) {
        let now = Instant::now();
        entries.retain(|_, entry| entry.expires_at > now);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use hearth_core::TransactionType;
    use hearth_import::fingerprint;

    fn staged() -> StagedImport {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        StagedImport {
            household_id: HouseholdId(1),
            entity_id: EntityId(1),
            user_id: Some(UserId(7)),
            transactions: vec![StagedTransaction {
                transaction: ParsedTransaction {
                    date,
                    amount_cents: 4250,
                    transaction_type: TransactionType::Expense,
                    payee: "WALMART #123".to_string(),
                    fingerprint: fingerprint(date, 4250, "WALMART #123"),
                    raw_row: vec![],
                },
                suggested_category: Some(CategoryId(3)),
            }],
        }
    }

    #[test]
    fn put_get_remove() {
        let store = StagingStore::with_default_ttl();
        let token = store.put(staged());

        let loaded = store.get(&token).unwrap();
        assert_eq!(loaded.transactions.len(), 1);
        assert_eq!(loaded.transactions[0].suggested_category, Some(CategoryId(3)));

        store.remove(&token);
        assert!(store.get(&token).is_none());
    }

    #[test]
    fn unknown_token_is_none() {
        let store = StagingStore::with_default_ttl();
        assert!(store.get("nope").is_none());
    }

    #[test]
    fn entries_expire_after_ttl() {
        let store = StagingStore::new(Duration::from_millis(1));
        let token = store.put(staged());
        std::thread::sleep(Duration::from_millis(10));
        assert!(store.get(&token).is_none());
    }

    #[test]
    fn tokens_are_unique() {
        let store = StagingStore::with_default_ttl();
        let a = store.put(staged());
        let b = store.put(staged());
        assert_ne!(a, b);
    }

    #[test]
    fn staged_import_serializes() {
        // The host may persist staging externally (e.g. in a session
        // store), so the payload must round-trip through JSON.
        let json = serde_json::to_string(&staged()).unwrap();
        let back: StagedImport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.transactions[0].transaction.amount_cents, 4250);
    }
}
