use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use hearth_core::{parse_accounting_money, parse_date, TransactionType};

use crate::fingerprint::fingerprint;
use crate::formats::{bank_format, detect_format, FormatId};

/// Payees longer than this are truncated with a trailing ellipsis.
pub const MAX_PAYEE_LEN: usize = 200;

/// One normalized row out of a bank CSV. Amounts are non-negative
/// magnitudes; direction lives in `transaction_type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedTransaction {
    pub date: NaiveDate,
    pub amount_cents: i64,
    pub transaction_type: TransactionType,
    pub payee: String,
    pub fingerprint: String,
    /// Original fields, kept for the preview screen's diagnostics.
    pub raw_row: Vec<String>,
}

/// Result of parsing one uploaded file. Structural failures (no data rows,
/// unlocatable columns) come back as an empty transaction list plus
/// `errors`; row-level failures accumulate in `errors` without aborting
/// the rest of the file.
#[derive(Debug, Clone, Serialize)]
pub struct ParseOutcome {
    pub transactions: Vec<ParsedTransaction>,
    pub errors: Vec<String>,
    pub detected_format: FormatId,
    pub format_name: Option<String>,
    pub headers: Vec<String>,
}

pub fn parse(data: &[u8], requested: FormatId) -> ParseOutcome {
    let content = String::from_utf8_lossy(data);
    let content = content.replace("\r\n", "\n").replace('\r', "\n");

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let rows: Vec<Vec<String>> = reader
        .records()
        .filter_map(Result::ok)
        .map(|record| record.iter().map(str::to_string).collect())
        .collect();

    if rows.len() < 2 {
        return ParseOutcome {
            transactions: Vec::new(),
            errors: vec!["File is empty or has no data rows".to_string()],
            detected_format: requested,
            format_name: None,
            headers: Vec::new(),
        };
    }

    let headers: Vec<String> = rows[0].iter().map(|h| h.trim().to_string()).collect();

    let resolved = if requested == FormatId::Auto {
        detect_format(&headers)
    } else {
        requested
    };
    let format = bank_format(resolved);

    let date_col = find_column(&headers, format.date_column, format.alt_date_columns);
    let amount_col = find_column(&headers, format.amount_column, format.alt_amount_columns);
    let desc_col = find_column(&headers, format.description_column, format.alt_description_columns);

    let mut errors = Vec::new();
    if date_col.is_none() {
        errors.push("Could not find date column".to_string());
    }
    if amount_col.is_none() {
        errors.push("Could not find amount column".to_string());
    }
    if desc_col.is_none() {
        errors.push("Could not find description column".to_string());
    }

    let (Some(date_col), Some(amount_col), Some(desc_col)) = (date_col, amount_col, desc_col)
    else {
        return ParseOutcome {
            transactions: Vec::new(),
            errors,
            detected_format: resolved,
            format_name: Some(format.name.to_string()),
            headers,
        };
    };

    let required_len = date_col.max(amount_col).max(desc_col) + 1;
    let mut transactions = Vec::new();

    for (idx, row) in rows[1..].iter().enumerate() {
        let row_num = idx + 2;

        if row.len() < required_len {
            continue;
        }

        let date_str = row[date_col].trim();
        let amount_str = row[amount_col].trim();
        let description = row[desc_col].trim();

        if date_str.is_empty() || amount_str.is_empty() {
            continue;
        }

        let Some(date) = parse_date(date_str, format.date_format) else {
            errors.push(format!("Row {row_num}: invalid date format '{date_str}'"));
            continue;
        };

        let signed_cents = parse_accounting_money(amount_str);
        let transaction_type = if signed_cents >= 0 {
            TransactionType::Income
        } else {
            TransactionType::Expense
        };
        let amount_cents = signed_cents.abs();

        let payee = clean_payee(description);
        let hash = fingerprint(date, amount_cents, &payee);

        transactions.push(ParsedTransaction {
            date,
            amount_cents,
            transaction_type,
            payee,
            fingerprint: hash,
            raw_row: row.clone(),
        });
    }

    ParseOutcome {
        transactions,
        errors,
        detected_format: resolved,
        format_name: Some(format.name.to_string()),
        headers,
    }
}

/// Case-insensitive header lookup: the primary name first, then each
/// alternate in listed order.
fn find_column(headers: &[String], primary: &str, alternates: &[&str]) -> Option<usize> {
    let lower: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();
    let position = |name: &str| {
        let needle = name.to_lowercase();
        lower.iter().position(|h| *h == needle)
    };

    position(primary).or_else(|| alternates.iter().find_map(|alt| position(alt)))
}

/// Collapse internal whitespace, trim, and cap the length for storage.
pub fn clean_payee(raw: &str) -> String {
    let cleaned = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.chars().count() > MAX_PAYEE_LEN {
        let mut truncated: String = cleaned.chars().take(MAX_PAYEE_LEN - 3).collect();
        truncated.push_str("...");
        truncated
    } else {
        cleaned
    }
}
