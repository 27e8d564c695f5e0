//! Text normalisation shared by every reader

use chrono::{Datelike, Duration, NaiveDate};

/// Trim and ASCII-uppercase one SKU key part.
pub fn normalize_part(value: &str) -> String {
    value.trim().to_ascii_uppercase()
}

/// Normalise a product code: full-width parentheses become half-width and
/// every parenthesised group is removed (`14003（2）` -> `14003`).
pub fn normalize_product_code(value: &str) -> String {
    let mut stripped = String::with_capacity(value.len());
    let mut depth = 0usize;
    for ch in value.chars() {
        match ch {
            '(' | '（' => depth += 1,
            ')' | '）' => depth = depth.saturating_sub(1),
            _ if depth == 0 => stripped.push(ch),
            _ => {}
        }
    }
    normalize_part(&stripped)
}

/// Render a number the way a human typed it: integral floats lose `.0`.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// `"403.0"` -> `"403"`; anything that is not an integral number passes through trimmed.
pub fn normalize_numeric_text(value: &str) -> String {
    let trimmed = value.trim();
    match trimmed.parse::<f64>() {
        Ok(n) if trimmed.contains('.') && n.is_finite() && n.fract() == 0.0 => format_number(n),
        _ => trimmed.to_string(),
    }
}

/// Strip leading zeros; an all-zero value collapses to `"0"`.
pub fn strip_leading_zeros(value: &str) -> String {
    let stripped = value.trim_start_matches('0');
    if stripped.is_empty() {
        "0".to_string()
    } else {
        stripped.to_string()
    }
}

/// Excel date serial (1900 system) to a calendar date.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.trunc() as i64))
}

pub fn format_date(date: NaiveDate) -> String {
    format!("{:04}/{:02}/{:02}", date.year(), date.month(), date.day())
}

/// Parse the date formats seen on allocation sheets.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    for fmt in ["%Y/%m/%d", "%Y-%m-%d", "%Y年%m月%d日", "%Y.%m.%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, fmt) {
            return Some(date);
        }
    }
    // "2024-05-01T00:00:00" and "2024/05/01 00:00:00"
    if let Some(prefix) = value.get(..10) {
        if prefix != value {
            if let Some(date) = parse_date(prefix) {
                return Some(date);
            }
        }
    }
    value.parse::<f64>().ok().and_then(excel_serial_to_date)
}

/// ISO week number of a date string, zero padded, or `"00"` when unparsable.
pub fn iso_week(value: &str) -> String {
    parse_date(value)
        .map(|d| format!("{:02}", d.iso_week().week()))
        .unwrap_or_else(|| "00".to_string())
}
