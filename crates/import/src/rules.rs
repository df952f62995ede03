use serde::{Deserialize, Serialize};

use hearth_core::{CategoryId, MatchType};

/// A household rule reduced to what matching needs: the search term, how to
/// compare it, and the category it assigns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayeeRule {
    pub search_term: String,
    pub match_type: MatchType,
    pub category_id: CategoryId,
}

impl PayeeRule {
    fn matches(&self, payee_lower: &str) -> bool {
        let term = self.search_term.to_lowercase();
        match self.match_type {
            MatchType::Exact => payee_lower == term,
            MatchType::Contains => payee_lower.contains(&term),
        }
    }
}

/// Ordered first-match-wins scan. Callers supply rules newest-first; there
/// is no weighting beyond that order.
pub fn first_match<'a>(rules: &'a [PayeeRule], payee: &str) -> Option<&'a PayeeRule> {
    let payee_lower = payee.to_lowercase();
    rules.iter().find(|rule| rule.matches(&payee_lower))
}

/// Category for a payee, or `None` when no rule matches.
pub fn match_category(rules: &[PayeeRule], payee: &str) -> Option<CategoryId> {
    first_match(rules, payee).map(|rule| rule.category_id)
}
