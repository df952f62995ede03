use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::account::AccountId;
use super::category::CategoryId;
use super::entity::{EntityId, HouseholdId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub i64);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BudgetMonthId(pub i64);

impl fmt::Display for BudgetMonthId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Direction of a transaction. Amounts are stored as non-negative
/// magnitudes; this carries the sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }

    /// Signed effect of `amount_cents` on an account balance: income adds,
    /// expense subtracts.
    pub fn signed_effect(self, amount_cents: i64) -> i64 {
        match self {
            TransactionType::Income => amount_cents,
            TransactionType::Expense => -amount_cents,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            other => Err(format!("Unknown transaction type: '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub household_id: HouseholdId,
    pub entity_id: EntityId,
    pub account_id: Option<AccountId>,
    pub budget_month_id: BudgetMonthId,
    pub date: NaiveDate,
    pub amount_cents: i64,
    pub transaction_type: TransactionType,
    pub payee: String,
    pub memo: Option<String>,
    pub category_id: Option<CategoryId>,
    pub is_transfer: bool,
    pub created_by: Option<UserId>,
}
