// Utility helpers for parsing and number formatting.
//
// Spreadsheet exports are messy: numbers carry thousands separators, dates
// come in whatever format the CRM was configured with. This module absorbs
// that so the rest of the code can work with typed values.
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use num_format::{Locale, ToFormattedString};

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%m/%d/%y", "%m/%d/%Y", "%Y/%m/%d", "%m-%d-%Y", "%d-%b-%Y", "%b %d, %Y",
    "%B %d, %Y", "%b %d %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%y %H:%M",
    "%m/%d/%y %I:%M %p",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
];

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in spreadsheet exports.
///
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters.
/// - Strips thousands separators like `","` before parsing.
/// - Returns `None` for anything that cannot be safely parsed, including NaN
///   and infinities.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a calendar date out of a lead timestamp.
///
/// Tries RFC 3339, a list of date-time layouts, then plain date layouts. As a
/// last resort the leading token (before a space or `T`) is parsed as a date,
/// which covers timestamps with unusual time suffixes.
pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    if let Some(d) = parse_plain_date(s) {
        return Some(d);
    }
    let head = s.split(|c| c == ' ' || c == 'T').next().unwrap_or(s);
    if head.len() < s.len() {
        return parse_plain_date(head);
    }
    None
}

fn parse_plain_date(s: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Inclusive number of calendar months touched by `[first, last]`, floored at 1.
pub fn month_span(first: NaiveDate, last: NaiveDate) -> u32 {
    let months =
        (last.year() - first.year()) * 12 + (last.month() as i32 - first.month() as i32) + 1;
    months.max(1) as u32
}

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

/// `part / whole` as a percentage in integer units of `10^-places` percent,
/// rounded half up. Exact for any counts, so derived complements stay exact.
pub fn percent_units(part: u64, whole: u64, places: u32) -> i64 {
    if whole == 0 {
        return 0;
    }
    let scale = 100 * 10u64.pow(places);
    ((part * scale * 2 + whole) / (whole * 2)) as i64
}

/// Fixed decimals with thousands separators, e.g. `1,234,567.89`.
pub fn format_number(n: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, n.abs());
    let (whole, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let grouped = whole.parse::<u64>().unwrap_or(0).to_formatted_string(&Locale::en);
    // No sign on values that round to zero.
    let sign = if n < 0.0 && fixed.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
        "-"
    } else {
        ""
    };
    if frac.is_empty() {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{}.{}", sign, grouped, frac)
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

/// Dollar amount with thousands separators and no cents, e.g. `$889,295`.
pub fn format_money(n: f64) -> String {
    let rounded = n.round() as i64;
    if rounded < 0 {
        format!("-${}", format_int(-rounded))
    } else {
        format!("${}", format_int(rounded))
    }
}
