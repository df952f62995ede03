use chrono::{Datelike, NaiveDate};

/// Common bank-export date patterns tried after a format's preferred
/// pattern fails. Order matters: US month-first variants come before
/// day-first, matching the institutions the registry knows about.
pub const FALLBACK_DATE_FORMATS: &[&str] = &[
    "%m/%d/%Y",
    "%m/%d/%y",
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%b %d, %Y",
    "%Y/%m/%d",
    "%m-%d-%Y",
    "%d-%m-%Y",
];

/// Parse a date string, trying `preferred` first and then the fallback
/// list. Returns `None` when nothing matches; callers treat that as a
/// row-level problem, never a fatal one.
pub fn parse_date(raw: &str, preferred: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, preferred) {
        return Some(date);
    }

    FALLBACK_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Budget-month key for a date, `YYYY-MM`.
pub fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn preferred_format_first() {
        assert_eq!(parse_date("2024-01-15", "%Y-%m-%d"), Some(d(2024, 1, 15)));
    }

    #[test]
    fn falls_back_to_us_slash() {
        assert_eq!(parse_date("01/15/2024", "%Y-%m-%d"), Some(d(2024, 1, 15)));
    }

    #[test]
    fn accepts_unpadded_components() {
        assert_eq!(parse_date("1/5/2024", "%m/%d/%Y"), Some(d(2024, 1, 5)));
    }

    #[test]
    fn two_digit_year() {
        assert_eq!(parse_date("01/15/24", "%m/%d/%Y"), Some(d(2024, 1, 15)));
    }

    #[test]
    fn month_name_format() {
        assert_eq!(parse_date("Jan 15, 2024", "%m/%d/%Y"), Some(d(2024, 1, 15)));
    }

    #[test]
    fn unparseable_is_none() {
        assert_eq!(parse_date("not-a-date", "%Y-%m-%d"), None);
        assert_eq!(parse_date("", "%Y-%m-%d"), None);
        assert_eq!(parse_date("   ", "%Y-%m-%d"), None);
    }

    #[test]
    fn month_key_pads() {
        assert_eq!(month_key(d(2024, 1, 15)), "2024-01");
        assert_eq!(month_key(d(2024, 12, 1)), "2024-12");
    }
}
