use serde::{Deserialize, Serialize};
use std::fmt;

/// Static descriptor of a bank's CSV dialect: which header names carry the
/// three required columns, and the date pattern the bank writes.
#[derive(Debug, Clone, Copy)]
pub struct BankFormat {
    pub name: &'static str,
    pub date_column: &'static str,
    pub alt_date_columns: &'static [&'static str],
    pub amount_column: &'static str,
    pub alt_amount_columns: &'static [&'static str],
    pub description_column: &'static str,
    pub alt_description_columns: &'static [&'static str],
    pub date_format: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatId {
    Auto,
    CorningCu,
    VisionsCu,
    Generic,
}

impl FormatId {
    pub fn as_str(self) -> &'static str {
        match self {
            FormatId::Auto => "auto",
            FormatId::CorningCu => "corning_cu",
            FormatId::VisionsCu => "visions_cu",
            FormatId::Generic => "generic",
        }
    }
}

impl fmt::Display for FormatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FormatId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(FormatId::Auto),
            "corning_cu" => Ok(FormatId::CorningCu),
            "visions_cu" => Ok(FormatId::VisionsCu),
            "generic" => Ok(FormatId::Generic),
            other => Err(format!("Unknown CSV format: '{other}'")),
        }
    }
}

const CORNING_CU: BankFormat = BankFormat {
    name: "Corning Credit Union",
    date_column: "Date",
    alt_date_columns: &["Transaction Date", "Posted Date", "Posting Date"],
    amount_column: "Amount",
    alt_amount_columns: &["Transaction Amount"],
    description_column: "Description",
    alt_description_columns: &["Memo", "Transaction Description"],
    date_format: "%m/%d/%Y",
};

const VISIONS_CU: BankFormat = BankFormat {
    name: "Visions Credit Union",
    date_column: "Date",
    alt_date_columns: &["Trans Date", "Posted Date", "Transaction Date"],
    amount_column: "Amount",
    alt_amount_columns: &["Transaction Amount", "Debit", "Credit"],
    description_column: "Description",
    alt_description_columns: &["Memo", "Payee", "Transaction Description"],
    date_format: "%m/%d/%Y",
};

const GENERIC: BankFormat = BankFormat {
    name: "Generic CSV",
    date_column: "Date",
    alt_date_columns: &["Transaction Date", "Posted Date", "Trans Date", "Posting Date"],
    amount_column: "Amount",
    alt_amount_columns: &["Transaction Amount", "Debit", "Credit"],
    description_column: "Description",
    alt_description_columns: &["Memo", "Payee", "Name"],
    date_format: "%Y-%m-%d",
};

/// Descriptor for a concrete format id. `Auto` resolves to the generic
/// dialect; callers are expected to run detection first.
pub fn bank_format(id: FormatId) -> &'static BankFormat {
    match id {
        FormatId::CorningCu => &CORNING_CU,
        FormatId::VisionsCu => &VISIONS_CU,
        FormatId::Generic | FormatId::Auto => &GENERIC,
    }
}

/// Ordered `(id, display name)` pairs for the upload form dropdown.
pub fn formats() -> Vec<(FormatId, &'static str)> {
    vec![
        (FormatId::Auto, "Auto-detect"),
        (FormatId::CorningCu, CORNING_CU.name),
        (FormatId::VisionsCu, VISIONS_CU.name),
        (FormatId::Generic, GENERIC.name),
    ]
}

/// Pick a concrete format from a header row. Institution-specific columns
/// win; anything unrecognised falls back to the generic dialect.
pub fn detect_format(headers: &[String]) -> FormatId {
    let lower: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
    let has = |name: &str| lower.iter().any(|h| h == name);

    if has("check number") || has("share id") {
        return FormatId::CorningCu;
    }
    if has("account") && has("balance") {
        return FormatId::VisionsCu;
    }
    FormatId::Generic
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn detects_corning_by_check_number() {
        let h = headers(&["Date", "Check Number", "Amount", "Description"]);
        assert_eq!(detect_format(&h), FormatId::CorningCu);
    }

    #[test]
    fn detects_corning_by_share_id() {
        let h = headers(&["Share ID", "Date", "Amount", "Description"]);
        assert_eq!(detect_format(&h), FormatId::CorningCu);
    }

    #[test]
    fn detects_visions_by_account_and_balance() {
        let h = headers(&["Account", "Date", "Amount", "Description", "Balance"]);
        assert_eq!(detect_format(&h), FormatId::VisionsCu);
    }

    #[test]
    fn account_alone_is_not_visions() {
        let h = headers(&["Account", "Date", "Amount", "Description"]);
        assert_eq!(detect_format(&h), FormatId::Generic);
    }

    #[test]
    fn falls_back_to_generic() {
        let h = headers(&["Date", "Amount", "Description"]);
        assert_eq!(detect_format(&h), FormatId::Generic);
    }

    #[test]
    fn dropdown_starts_with_auto() {
        let f = formats();
        assert_eq!(f[0], (FormatId::Auto, "Auto-detect"));
        assert_eq!(f.len(), 4);
    }

    #[test]
    fn format_id_round_trips() {
        for (id, _) in formats() {
            assert_eq!(id.as_str().parse::<FormatId>().unwrap(), id);
        }
    }
}
