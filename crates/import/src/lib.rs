pub mod csv;
pub mod fingerprint;
pub mod formats;
pub mod rules;

pub use csv::{clean_payee, parse, ParseOutcome, ParsedTransaction, MAX_PAYEE_LEN};
pub use fingerprint::fingerprint;
pub use formats::{bank_format, detect_format, formats, BankFormat, FormatId};
pub use rules::{first_match, match_category, PayeeRule};
