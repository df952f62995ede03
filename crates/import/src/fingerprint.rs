use chrono::NaiveDate;
use sha2::{Digest, Sha256};

/// Content hash used for duplicate detection: SHA-256 over
/// `date|amount_cents|payee`, with the payee lowercased and trimmed.
///
/// This is the single definition used both when parsing an upload and when
/// hashing stored rows for comparison; the two sides must never diverge or
/// duplicate detection silently stops working.
pub fn fingerprint(date: NaiveDate, amount_cents: i64, payee: &str) -> String {
    let data = format!("{date}|{amount_cents}|{}", payee.trim().to_lowercase());
    let digest = Sha256::digest(data.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
