// 🧽 Primitive Sanitizer - Raw cells → canonical scalars
//
// Fail-soft policy: malformed amounts become 0 and malformed dates become
// the UNKNOWN date sentinel. Nothing in this module returns an error;
// flagging suspicious zeros/sentinels is left to the quality module.

use crate::raw::CellValue;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

static PARENTHESIZED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(([^)]*)\)").unwrap());

static DD_MMM_YYYY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})-([A-Za-z]{3})-(\d{4})$").unwrap());

static UNSAFE_NAME_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[\s\\/:"*?<>|]"#).unwrap());

static UNDERSCORE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"_+").unwrap());

/// Generic date layouts tried after the primary DD-MMM-YYYY pattern
const FALLBACK_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%Y/%m/%d",
    "%d %b %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %B %Y",
];

const FALLBACK_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

// ============================================================================
// TEXT
// ============================================================================

/// Stringify and trim a raw cell; absent cells become ""
pub fn to_text(value: &CellValue) -> String {
    match value {
        CellValue::Empty => String::new(),
        other => other.to_string().trim().to_string(),
    }
}

// ============================================================================
// AMOUNTS
// ============================================================================

/// Parse an amount the way remittance exports write them
///
/// - `(1,234.50)` is an accounting negative: the sign is forced negative
/// - currency symbols, letters and spaces are dropped
/// - commas are thousands separators only
/// - anything unparseable is 0
pub fn to_amount(text: &str) -> Decimal {
    let text = text.trim();
    if text.is_empty() {
        return Decimal::ZERO;
    }

    let (body, force_negative) = match PARENTHESIZED.captures(text) {
        Some(caps) => (caps.get(1).map_or("", |m| m.as_str()), true),
        None => (text, false),
    };

    let cleaned: String = body
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '-' || *c == '.')
        .collect();

    let value = match Decimal::from_str(&cleaned) {
        Ok(value) => value,
        Err(_) => return Decimal::ZERO,
    };

    if value.is_zero() {
        Decimal::ZERO
    } else if force_negative {
        -value.abs()
    } else {
        value
    }
}

/// Render an amount for display: two decimals, comma thousands grouping
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();

    let mut magnitude = rounded.abs();
    magnitude.rescale(2);
    let text = magnitude.to_string();
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    format!(
        "{}{}.{}",
        if negative { "-" } else { "" },
        group_thousands(int_part),
        frac_part
    )
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

// ============================================================================
// DATES
// ============================================================================

/// The "unknown date" sentinel (epoch zero)
pub fn unknown_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN)
}

pub fn is_unknown_date(date: NaiveDate) -> bool {
    date == unknown_date()
}

/// Parse a date, DD-MMM-YYYY first, then generic layouts, else the sentinel
pub fn to_date(text: &str) -> NaiveDate {
    let text = text.trim();
    if text.is_empty() {
        return unknown_date();
    }

    parse_dd_mmm_yyyy(text)
        .or_else(|| parse_generic(text))
        .unwrap_or_else(unknown_date)
}

/// Like `to_date`, but tries a region's own layout before the generic ones
///
/// `hint` is a chrono format string such as `%d.%m.%Y`.
pub fn to_date_with_hint(text: &str, hint: &str) -> NaiveDate {
    let text = text.trim();
    if text.is_empty() {
        return unknown_date();
    }

    parse_dd_mmm_yyyy(text)
        .or_else(|| NaiveDate::parse_from_str(text, hint).ok())
        .or_else(|| parse_generic(text))
        .unwrap_or_else(unknown_date)
}

fn parse_dd_mmm_yyyy(text: &str) -> Option<NaiveDate> {
    let caps = DD_MMM_YYYY.captures(text)?;
    let day: u32 = caps[1].parse().ok()?;
    let month = month_from_abbrev(&caps[2])?;
    let year: i32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn month_from_abbrev(abbrev: &str) -> Option<u32> {
    match abbrev.to_ascii_lowercase().as_str() {
        "jan" => Some(1),
        "feb" => Some(2),
        "mar" => Some(3),
        "apr" => Some(4),
        "may" => Some(5),
        "jun" => Some(6),
        "jul" => Some(7),
        "aug" => Some(8),
        "sep" => Some(9),
        "oct" => Some(10),
        "nov" => Some(11),
        "dec" => Some(12),
        _ => None,
    }
}

fn parse_generic(text: &str) -> Option<NaiveDate> {
    for format in FALLBACK_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }

    for format in FALLBACK_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.date());
        }
    }

    None
}

// ============================================================================
// NAMES
// ============================================================================

/// Make a value safe to use as a file or resource name
pub fn sanitize_name(text: &str) -> String {
    let replaced = UNSAFE_NAME_CHARS.replace_all(text, "_");
    UNDERSCORE_RUNS.replace_all(&replaced, "_").into_owned()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(text: &str) -> Decimal {
        Decimal::from_str(text).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_to_text() {
        assert_eq!(to_text(&CellValue::Empty), "");
        assert_eq!(to_text(&CellValue::from("  INV-001 ")), "INV-001");
        assert_eq!(to_text(&CellValue::Number(1234.0)), "1234");
        assert_eq!(to_text(&CellValue::Number(12.5)), "12.5");
    }

    #[test]
    fn test_to_amount_basic_cases() {
        assert_eq!(to_amount("(1,234.50)"), dec("-1234.50"));
        assert_eq!(to_amount(""), Decimal::ZERO);
        assert_eq!(to_amount("abc"), Decimal::ZERO);
        assert_eq!(to_amount("1,234.50"), dec("1234.50"));
    }

    #[test]
    fn test_to_amount_symbols_and_signs() {
        assert_eq!(to_amount("$ 2,500.00"), dec("2500"));
        assert_eq!(to_amount("-45.99"), dec("-45.99"));
        assert_eq!(to_amount("USD 10"), dec("10"));
        assert_eq!(to_amount("(-12.00)"), dec("-12"));
        assert_eq!(to_amount("($99.10)"), dec("-99.10"));
        assert_eq!(to_amount("12,34,567.00"), dec("1234567"));
    }

    #[test]
    fn test_to_amount_fail_soft() {
        assert_eq!(to_amount("1-2"), Decimal::ZERO);
        assert_eq!(to_amount("--"), Decimal::ZERO);
        assert_eq!(to_amount("1.2.3"), Decimal::ZERO);
        assert_eq!(to_amount("()"), Decimal::ZERO);
        assert!(!to_amount("(0.00)").is_sign_negative());
    }

    #[test]
    fn test_to_amount_idempotent() {
        for raw in ["(1,234.50)", "1,234.50", "$7", "-0.01", "abc"] {
            let once = to_amount(raw);
            assert_eq!(to_amount(&once.to_string()), once, "input {raw}");
        }
    }

    #[test]
    fn test_to_date_primary_pattern() {
        assert_eq!(to_date("15-JAN-2024"), date(2024, 1, 15));
        assert_eq!(to_date("1-feb-2023"), date(2023, 2, 1));
        assert_eq!(to_date("31-Dec-1999"), date(1999, 12, 31));
    }

    #[test]
    fn test_to_date_sentinel() {
        assert_eq!(to_date(""), unknown_date());
        assert_eq!(to_date("not a date"), unknown_date());
        assert!(is_unknown_date(to_date("   ")));
    }

    #[test]
    fn test_to_date_bad_abbrev_falls_back() {
        // Unknown month abbreviation and impossible day go through the
        // fallback path and end at the sentinel
        assert_eq!(to_date("15-XYZ-2024"), unknown_date());
        assert_eq!(to_date("31-FEB-2024"), unknown_date());
    }

    #[test]
    fn test_to_date_generic_fallbacks() {
        assert_eq!(to_date("2024-03-05"), date(2024, 3, 5));
        assert_eq!(to_date("03/05/2024"), date(2024, 3, 5));
        assert_eq!(to_date("Mar 5, 2024"), date(2024, 3, 5));
        assert_eq!(to_date("2024-03-05T10:30:00Z"), date(2024, 3, 5));
        assert_eq!(to_date("2024-03-05 10:30:00"), date(2024, 3, 5));
    }

    #[test]
    fn test_to_date_with_hint_prefers_region_layout() {
        // Without a hint 03/05/2024 reads as March 5th
        assert_eq!(to_date_with_hint("03/05/2024", "%d/%m/%Y"), date(2024, 5, 3));
        assert_eq!(to_date_with_hint("05.03.2024", "%d.%m.%Y"), date(2024, 3, 5));
        assert_eq!(to_date_with_hint("15-JAN-2024", "%d.%m.%Y"), date(2024, 1, 15));
        assert_eq!(to_date_with_hint("", "%d.%m.%Y"), unknown_date());
    }

    #[test]
    fn test_to_date_idempotent() {
        for raw in ["15-JAN-2024", "2023-07-04", "garbage", ""] {
            let once = to_date(raw);
            assert_eq!(to_date(&once.to_string()), once, "input {raw}");
        }
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(dec("1234.5")), "1,234.50");
        assert_eq!(format_amount(dec("-1234567.891")), "-1,234,567.89");
        assert_eq!(format_amount(dec("0.005")), "0.01");
        assert_eq!(format_amount(Decimal::ZERO), "0.00");
        assert_eq!(format_amount(dec("999")), "999.00");
        assert_eq!(format_amount(dec("-0.001")), "0.00");
    }

    #[test]
    fn test_sanitize_name() {
        let name = sanitize_name("a/b:c");
        assert_eq!(name, "a_b_c");

        let messy = sanitize_name("ACME  Corp: \"North\" <site>|1?*");
        for ch in ['\\', '/', ':', '"', '*', '?', '<', '>', '|', ' '] {
            assert!(!messy.contains(ch), "{messy} contains {ch}");
        }
        assert!(!messy.contains("__"));
    }
}
