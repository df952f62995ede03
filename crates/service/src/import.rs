use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use tracing::info;

use hearth_core::{month_key, Category, CategoryId, EntityId, HouseholdId, UserId};
use hearth_import::{fingerprint, parse, FormatId, ParsedTransaction};
use hearth_storage::{self as storage, DbPool};

use crate::ledger::{self, NewTransaction};
use crate::rules::RuleService;
use crate::staging::{StagedImport, StagedTransaction, StagingStore};
use crate::ServiceError;

/// Only transactions from the last 90 days are scanned for duplicates;
/// older re-imports come back as new rows.
pub const DUPLICATE_WINDOW_DAYS: i64 = 90;

pub const ALLOWED_UPLOAD_EXTENSIONS: &[&str] = &["csv", "txt"];

/// Extension allow-list check for the upload glue to run before handing
/// bytes to [`ImportService::preview`].
pub fn is_allowed_upload(filename: &str) -> bool {
    std::path::Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ALLOWED_UPLOAD_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Who is importing, and into which sub-ledger.
#[derive(Debug, Clone, Copy)]
pub struct ImportContext {
    pub household_id: HouseholdId,
    pub entity_id: EntityId,
    pub user_id: Option<UserId>,
}

/// Everything the preview screen renders: staged new rows with category
/// suggestions, duplicates held aside, parse errors, and the category
/// list for manual overrides.
#[derive(Debug, Clone)]
pub struct ImportPreview {
    pub token: String,
    pub transactions: Vec<StagedTransaction>,
    pub duplicates: Vec<ParsedTransaction>,
    pub errors: Vec<String>,
    pub detected_format: FormatId,
    pub format_name: Option<String>,
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub imported: usize,
    /// Month of the first imported row, for the post-import redirect.
    pub month: Option<String>,
}

/// Two-step CSV import: parse-and-stage, then confirm. Composes the
/// parser, the duplicate fingerprint window and the rule engine.
pub struct ImportService {
    pool: DbPool,
    rules: Arc<RuleService>,
    staging: Arc<StagingStore>,
}

impl ImportService {
    pub fn new(pool: DbPool, rules: Arc<RuleService>, staging: Arc<StagingStore>) -> Self {
        Self {
            pool,
            rules,
            staging,
        }
    }

    /// Parse an upload, split new rows from recent duplicates, attach
    /// category suggestions and stage the result for confirmation.
    pub async fn preview(
        &self,
        ctx: &ImportContext,
        data: &[u8],
        format: FormatId,
    ) -> Result<ImportPreview, ServiceError> {
        self.preview_as_of(ctx, data, format, Utc::now().date_naive())
            .await
    }

    pub async fn preview_as_of(
        &self,
        ctx: &ImportContext,
        data: &[u8],
        format: FormatId,
        as_of: NaiveDate,
    ) -> Result<ImportPreview, ServiceError> {
        let outcome = parse(data, format);

        let since = as_of - Duration::days(DUPLICATE_WINDOW_DAYS);
        let existing: HashSet<String> =
            storage::recent_payee_rows(&self.pool, ctx.household_id, since)
                .await?
                .into_iter()
                .map(|(date, cents, payee)| fingerprint(date, cents, &payee))
                .collect();

        let mut transactions = Vec::new();
        let mut duplicates = Vec::new();

        for tx in outcome.transactions {
            if existing.contains(&tx.fingerprint) {
                duplicates.push(tx);
            } else {
                let suggested_category =
                    self.rules.match_payee(ctx.household_id, &tx.payee).await?;
                transactions.push(StagedTransaction {
                    transaction: tx,
                    suggested_category,
                });
            }
        }

        let token = self.staging.put(StagedImport {
            household_id: ctx.household_id,
            entity_id: ctx.entity_id,
            user_id: ctx.user_id,
            transactions: transactions.clone(),
        });

        let categories = storage::list_categories(&self.pool, ctx.household_id).await?;

        info!(
            household = %ctx.household_id,
            new = transactions.len(),
            duplicates = duplicates.len(),
            errors = outcome.errors.len(),
            format = %outcome.detected_format,
            "staged import preview"
        );

        Ok(ImportPreview {
            token,
            transactions,
            duplicates,
            errors: outcome.errors,
            detected_format: outcome.detected_format,
            format_name: outcome.format_name,
            categories,
        })
    }

    /// Persist the staged rows the user kept. An empty selection means
    /// everything staged. All inserts share one database transaction: any
    /// failure rolls the whole batch back and leaves the staged data in
    /// place for a retry. Success clears the staging entry.
    pub async fn confirm(
        &self,
        token: &str,
        selected: &[usize],
        category_overrides: &HashMap<usize, Option<CategoryId>>,
    ) -> Result<ImportOutcome, ServiceError> {
        let staged = self
            .staging
            .get(token)
            .ok_or(ServiceError::NothingStaged)?;
        if staged.transactions.is_empty() {
            return Err(ServiceError::NothingStaged);
        }

        let indices: Vec<usize> = if selected.is_empty() {
            (0..staged.transactions.len()).collect()
        } else {
            selected.to_vec()
        };

        let mut tx = self.pool.begin().await?;
        let mut imported = 0usize;
        let mut first_month = None;

        for idx in &indices {
            let Some(staged_tx) = staged.transactions.get(*idx) else {
                continue;
            };
            let parsed = &staged_tx.transaction;

            let category_id = category_overrides
                .get(idx)
                .copied()
                .unwrap_or(staged_tx.suggested_category);

            ledger::record_in_tx(
                &mut tx,
                staged.household_id,
                &NewTransaction {
                    entity_id: staged.entity_id,
                    account_id: None,
                    date: parsed.date,
                    amount_cents: parsed.amount_cents,
                    transaction_type: parsed.transaction_type,
                    payee: parsed.payee.clone(),
                    memo: Some("Imported from CSV".to_string()),
                    category_id,
                    created_by: staged.user_id,
                },
            )
            .await?;

            if first_month.is_none() {
                first_month = Some(month_key(parsed.date));
            }
            imported += 1;
        }

        tx.commit().await?;
        self.staging.remove(token);

        info!(household = %staged.household_id, imported, "confirmed import");

        Ok(ImportOutcome {
            imported,
            month: first_month,
        })
    }
}
