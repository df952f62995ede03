use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(Decimal);

impl Money {
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::from(cents) / Decimal::from(100))
    }

    pub fn to_cents(self) -> i64 {
        (self.0 * Decimal::from(100)).to_i64().unwrap_or(0)
    }

    pub fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Money(self.0 - rhs.0)
    }
}

/// Parse a free-form monetary string ("$1,234.56") into integer cents.
/// Malformed or empty input yields 0 rather than an error; the surrounding
/// form flows treat amounts as best-effort input.
pub fn parse_money(raw: &str) -> i64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    to_cents_lossy(&cleaned)
}

/// Like [`parse_money`] but recognises accounting notation: `(12.34)` is
/// negative. Used by the CSV parser, where bank exports carry sign this way.
pub fn parse_accounting_money(raw: &str) -> i64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '(' | ')'))
        .collect();

    if cleaned.starts_with('(') && cleaned.ends_with(')') {
        let inner = cleaned.trim_matches(|c| c == '(' || c == ')');
        return -to_cents_lossy(inner);
    }
    to_cents_lossy(&cleaned)
}

fn to_cents_lossy(s: &str) -> i64 {
    // Half-cent values round away from zero, not to even.
    Decimal::from_str(s)
        .ok()
        .and_then(|d| {
            (d * Decimal::from(100))
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                .to_i64()
        })
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_money_plain() {
        assert_eq!(parse_money("123.45"), 12345);
    }

    #[test]
    fn parse_money_currency_symbols_and_commas() {
        assert_eq!(parse_money("$1,234.56"), 123456);
        assert_eq!(parse_money("1 234.56"), 123456);
    }

    #[test]
    fn parse_money_negative() {
        assert_eq!(parse_money("-50.00"), -5000);
    }

    #[test]
    fn parse_money_rounds_to_cents() {
        assert_eq!(parse_money("0.005"), 1);
        assert_eq!(parse_money("0.004"), 0);
    }

    #[test]
    fn parse_money_malformed_is_zero() {
        assert_eq!(parse_money(""), 0);
        assert_eq!(parse_money("abc"), 0);
        assert_eq!(parse_money("--"), 0);
    }

    #[test]
    fn parse_accounting_parens_negative() {
        assert_eq!(parse_accounting_money("(12.34)"), -1234);
        assert_eq!(parse_accounting_money("($1,200.00)"), -120000);
    }

    #[test]
    fn parse_accounting_plain_passthrough() {
        assert_eq!(parse_accounting_money("-42.50"), -4250);
        assert_eq!(parse_accounting_money("1200.00"), 120000);
    }

    #[test]
    fn money_roundtrip_and_display() {
        let m = Money::from_cents(4250);
        assert_eq!(m.to_cents(), 4250);
        assert_eq!(m.to_string(), "$42.50");
        assert!(Money::zero().is_zero());
    }

    #[test]
    fn money_add_sub() {
        let a = Money::from_cents(300);
        let b = Money::from_cents(200);
        assert_eq!((a + b).to_cents(), 500);
        assert_eq!((a - b).to_cents(), 100);
    }
}
