pub mod import;
pub mod ledger;
pub mod rules;
pub mod staging;

use thiserror::Error;

pub use import::{
    is_allowed_upload, ImportContext, ImportOutcome, ImportPreview, ImportService,
    ALLOWED_UPLOAD_EXTENSIONS, DUPLICATE_WINDOW_DAYS,
};
pub use ledger::{
    LedgerService, NewTransaction, RecordedTransaction, TransactionChanges, DRAW_PAYEE_SUFFIX,
};
pub use rules::{RuleService, DEFAULT_RULES};
pub use staging::{StagedImport, StagedTransaction, StagingStore};

/// Errors surfaced by the service layer. `NothingStaged`, `NotFound` and
/// `InvalidInput` are user-recoverable; callers turn them into a flash
/// message and redirect. `Db` is the generic persistence failure.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("no staged import found; upload a file first")]
    NothingStaged,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    InvalidInput(String),
}
