//! Scalar parsing for raw export cells.
//!
//! Export files disagree on date layouts, thousands separators and how they
//! spell "no value". Everything here turns one raw cell into a typed value or
//! reports that it could not, leaving the fallback policy to the normalizer.

use anyhow::{Result, anyhow};
use chrono::{NaiveDate, NaiveDateTime};

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y", "%d.%m.%Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '₺', '%'];

pub fn parse_naive_date(value: &str) -> Result<NaiveDate> {
    let trimmed = value.trim();
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Ok(parsed);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(parsed.date());
        }
    }
    Err(anyhow!("Failed to parse '{value}' as date"))
}

/// Parses a metric cell into a non-negative finite number.
pub fn parse_metric(value: &str) -> Result<f64> {
    let cleaned = value
        .trim()
        .chars()
        .filter(|c| !CURRENCY_SYMBOLS.contains(c) && !c.is_whitespace())
        .collect::<String>();
    if cleaned.is_empty() {
        return Err(anyhow!("Empty metric value"));
    }
    let parsed = match cleaned.parse::<f64>() {
        Ok(number) => number,
        Err(_) if is_grouped_number(&cleaned) => cleaned
            .replace(',', "")
            .parse::<f64>()
            .map_err(|err| anyhow!("Failed to parse '{value}' as number: {err}"))?,
        Err(err) => return Err(anyhow!("Failed to parse '{value}' as number: {err}")),
    };
    if !parsed.is_finite() || parsed < 0.0 {
        return Err(anyhow!("Metric value '{value}' must be a non-negative number"));
    }
    Ok(parsed)
}

/// Matches `1,234` and `12,345,678.90`: comma groups of exactly three digits.
fn is_grouped_number(value: &str) -> bool {
    let (integer, fraction) = match value.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (value, None),
    };
    if let Some(fraction) = fraction
        && (fraction.is_empty() || !fraction.chars().all(|c| c.is_ascii_digit()))
    {
        return false;
    }
    let mut groups = integer.split(',');
    let Some(head) = groups.next() else {
        return false;
    };
    let head_ok = (1..=3).contains(&head.len()) && head.chars().all(|c| c.is_ascii_digit());
    let mut tail_count = 0usize;
    for group in groups {
        if group.len() != 3 || !group.chars().all(|c| c.is_ascii_digit()) {
            return false;
        }
        tail_count += 1;
    }
    head_ok && tail_count > 0
}

pub fn parse_optional_number(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if is_placeholder(trimmed) {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|number| number.is_finite())
}

/// Spellings exporters and spreadsheet round-trips use for "no value".
pub fn is_placeholder(value: &str) -> bool {
    let lowered = value.trim().to_ascii_lowercase();
    matches!(
        lowered.as_str(),
        "" | "nan" | "none" | "null" | "na" | "n/a" | "<na>" | "nat"
    ) || lowered.chars().all(|c| c == '-')
}

/// Trims a text cell; blank and placeholder values become `None`.
pub fn clean_text(value: Option<&str>) -> Option<String> {
    let trimmed = value?.trim();
    if is_placeholder(trimmed) {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_export_date_layouts() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15).expect("valid date");
        for raw in [
            "2024-03-15",
            "15/03/2024",
            "2024/03/15",
            "15.03.2024",
            "2024-03-15 08:30:00",
            "2024-03-15T08:30:00",
        ] {
            assert_eq!(parse_naive_date(raw).expect(raw), expected, "{raw}");
        }
        assert!(parse_naive_date("not a date").is_err());
        assert!(parse_naive_date("").is_err());
    }

    #[test]
    fn metric_parsing_strips_symbols_and_grouping() {
        assert_eq!(parse_metric("12.5").expect("plain"), 12.5);
        assert_eq!(parse_metric(" $1,234.50 ").expect("grouped"), 1234.5);
        assert_eq!(parse_metric("₺ 40").expect("lira"), 40.0);
        assert_eq!(parse_metric("3.2%").expect("percent"), 3.2);
        assert!(parse_metric("12,5").is_err());
        assert!(parse_metric("abc").is_err());
        assert!(parse_metric("-4").is_err());
        assert!(parse_metric("").is_err());
    }

    #[test]
    fn placeholders_are_blank_text() {
        assert_eq!(clean_text(Some("  nan ")), None);
        assert_eq!(clean_text(Some("N/A")), None);
        assert_eq!(clean_text(Some("---")), None);
        assert_eq!(clean_text(None), None);
        assert_eq!(clean_text(Some(" Mobile ")), Some("Mobile".to_string()));
    }

    #[test]
    fn optional_numbers_skip_placeholders() {
        assert_eq!(parse_optional_number("0.75"), Some(0.75));
        assert_eq!(parse_optional_number("NaN"), None);
        assert_eq!(parse_optional_number("great"), None);
    }
}
