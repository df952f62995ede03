use serde::{Deserialize, Serialize};
use std::fmt;

use super::entity::{EntityId, HouseholdId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryId(pub i64);

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Behavioural tag set at category creation. Transfer detection keys off
/// this instead of the display name, which the user is free to rename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    Standard,
    OwnerDraw,
    Paycheck,
}

impl CategoryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CategoryKind::Standard => "standard",
            CategoryKind::OwnerDraw => "owner_draw",
            CategoryKind::Paycheck => "paycheck",
        }
    }
}

impl fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CategoryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(CategoryKind::Standard),
            "owner_draw" => Ok(CategoryKind::OwnerDraw),
            "paycheck" => Ok(CategoryKind::Paycheck),
            other => Err(format!("Unknown category kind: '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub household_id: HouseholdId,
    /// Categories for a business entity carry its id; household-wide
    /// personal categories leave it unset.
    pub entity_id: Option<EntityId>,
    pub name: String,
    pub group_name: String,
    pub kind: CategoryKind,
    pub is_archived: bool,
    pub sort_order: i64,
}

/// Starter category tree for a new household's personal budget,
/// `(group, [(name, kind)])`.
pub const DEFAULT_PERSONAL_CATEGORIES: &[(&str, &[(&str, CategoryKind)])] = &[
    (
        "Income",
        &[
            ("Paycheck 1", CategoryKind::Paycheck),
            ("Paycheck 2", CategoryKind::Paycheck),
            ("Side Income", CategoryKind::Standard),
        ],
    ),
    (
        "Housing",
        &[
            ("Mortgage/Rent", CategoryKind::Standard),
            ("Property Taxes", CategoryKind::Standard),
            ("Home Insurance", CategoryKind::Standard),
            ("Maintenance", CategoryKind::Standard),
            ("Utilities", CategoryKind::Standard),
        ],
    ),
    (
        "Transportation",
        &[
            ("Car Payment", CategoryKind::Standard),
            ("Car Insurance", CategoryKind::Standard),
            ("Gas", CategoryKind::Standard),
            ("Maintenance", CategoryKind::Standard),
            ("Parking", CategoryKind::Standard),
        ],
    ),
    (
        "Food",
        &[
            ("Groceries", CategoryKind::Standard),
            ("Restaurants", CategoryKind::Standard),
            ("Coffee", CategoryKind::Standard),
        ],
    ),
    (
        "Personal",
        &[
            ("Clothing", CategoryKind::Standard),
            ("Personal Care", CategoryKind::Standard),
            ("Entertainment", CategoryKind::Standard),
            ("Subscriptions", CategoryKind::Standard),
        ],
    ),
    (
        "Health",
        &[
            ("Health Insurance", CategoryKind::Standard),
            ("Doctor", CategoryKind::Standard),
            ("Dentist", CategoryKind::Standard),
            ("Prescriptions", CategoryKind::Standard),
            ("Gym", CategoryKind::Standard),
        ],
    ),
    (
        "Giving",
        &[
            ("Tithe/Charity", CategoryKind::Standard),
            ("Gifts", CategoryKind::Standard),
        ],
    ),
    (
        "Savings",
        &[
            ("Emergency Fund", CategoryKind::Standard),
            ("Retirement", CategoryKind::Standard),
            ("Investments", CategoryKind::Standard),
        ],
    ),
    (
        "Debt",
        &[
            ("Credit Card", CategoryKind::Standard),
            ("Student Loans", CategoryKind::Standard),
            ("Personal Loan", CategoryKind::Standard),
        ],
    ),
    (
        "Miscellaneous",
        &[
            ("Pet Care", CategoryKind::Standard),
            ("Childcare", CategoryKind::Standard),
            ("Education", CategoryKind::Standard),
            ("Other", CategoryKind::Standard),
        ],
    ),
];

/// Starter category tree for a business (LLC) entity.
pub const DEFAULT_BUSINESS_CATEGORIES: &[(&str, &[(&str, CategoryKind)])] = &[
    (
        "Revenue",
        &[
            ("Client Income", CategoryKind::Standard),
            ("Contract Work", CategoryKind::Standard),
            ("Product Sales", CategoryKind::Standard),
            ("Other Revenue", CategoryKind::Standard),
        ],
    ),
    (
        "Operating Expenses",
        &[
            ("Software & Subscriptions", CategoryKind::Standard),
            ("Equipment", CategoryKind::Standard),
            ("Office Supplies", CategoryKind::Standard),
            ("Professional Services", CategoryKind::Standard),
            ("Marketing & Advertising", CategoryKind::Standard),
        ],
    ),
    (
        "Owner & Payroll",
        &[
            ("Owner Draw", CategoryKind::OwnerDraw),
            ("Contractor Payments", CategoryKind::Standard),
            ("Payroll", CategoryKind::Standard),
            ("Payroll Taxes", CategoryKind::Standard),
        ],
    ),
    (
        "Taxes & Fees",
        &[
            ("Federal Tax Payments", CategoryKind::Standard),
            ("State Tax Payments", CategoryKind::Standard),
            ("Business Licenses", CategoryKind::Standard),
            ("Bank Fees", CategoryKind::Standard),
        ],
    ),
];
