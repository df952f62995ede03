pub mod accounts;
pub mod categories;
pub mod db;
pub mod households;
pub mod rules;
pub mod transactions;
pub mod transfers;

pub use accounts::{
    adjust_balance, apply_balance_delta, archive_account, create_account, delete_account,
    get_account, list_accounts,
};
pub use categories::{
    create_category, find_category_by_name, get_category, list_categories, personal_draw_category,
    seed_business_categories, seed_personal_categories,
};
pub use db::{create_db, DbPool};
pub use households::{create_entity, create_household, get_entity, personal_entity};
pub use rules::{delete_rule, insert_rule, list_rules, CategorizationRule};
pub use transactions::{
    delete_transaction, get_or_create_budget_month, get_transaction, insert_transaction,
    list_for_month, list_uncategorized_for_month, recent_payee_rows, set_transaction_category,
    sync_linked_transaction, update_transaction, NewTransactionRow, TransactionFilter,
    TransactionUpdate,
};
pub use transfers::{insert_linked_transfer, link_for_source, LinkedTransfer};
