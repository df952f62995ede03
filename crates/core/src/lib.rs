pub mod account;
pub mod category;
pub mod dates;
pub mod entity;
pub mod money;
pub mod rule;
pub mod transaction;

pub use account::{Account, AccountId, AccountType};
pub use category::{
    Category, CategoryId, CategoryKind, DEFAULT_BUSINESS_CATEGORIES, DEFAULT_PERSONAL_CATEGORIES,
};
pub use dates::{month_key, parse_date, FALLBACK_DATE_FORMATS};
pub use entity::{Entity, EntityId, EntityKind, HouseholdId, UserId};
pub use money::{parse_accounting_money, parse_money, Money};
pub use rule::{MatchType, RuleId};
pub use transaction::{BudgetMonthId, Transaction, TransactionId, TransactionType};
