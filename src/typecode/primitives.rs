//! Lexical rules for the XSD primitive kinds
//!
//! One format/parse pair per primitive. Booleans serialize as `"1"` and
//! `"0"` but accept all four lexical forms on input; floats use the
//! XSD spellings `INF`, `-INF` and `NaN` for the non-finite values.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, SecondsFormat};
use rust_decimal::Decimal;

use crate::error::{DecodeError, Result};

/// `"1"` or `"0"`
pub fn format_boolean(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

/// Accepts `1`, `0`, `true`, `false`
pub fn parse_boolean(text: &str) -> Result<bool> {
    match text.trim() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        other => Err(DecodeError::new("not a valid boolean")
            .with_text(other)
            .into()),
    }
}

/// Decimal text
pub fn format_integer(value: i64) -> String {
    value.to_string()
}

/// Decimal text into an i64
pub fn parse_integer(text: &str) -> Result<i64> {
    text.trim()
        .parse()
        .map_err(|_| DecodeError::new("not a valid integer").with_text(text).into())
}

/// Canonical number text, `INF`/`-INF`/`NaN` for non-finite
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "INF".to_string()
    } else if value == f64::NEG_INFINITY {
        "-INF".to_string()
    } else {
        value.to_string()
    }
}

/// Inverse of [`format_float`]
pub fn parse_float(text: &str) -> Result<f64> {
    match text.trim() {
        "INF" => Ok(f64::INFINITY),
        "-INF" => Ok(f64::NEG_INFINITY),
        "NaN" => Ok(f64::NAN),
        other => other
            .parse()
            .map_err(|_| DecodeError::new("not a valid float").with_text(text).into()),
    }
}

/// Exact decimal text
pub fn format_decimal(value: &Decimal) -> String {
    value.to_string()
}

/// Exact decimal text into a [`Decimal`]
pub fn parse_decimal(text: &str) -> Result<Decimal> {
    text.trim()
        .parse()
        .map_err(|_| DecodeError::new("not a valid decimal").with_text(text).into())
}

/// RFC 3339 / `xsd:dateTime` text
pub fn format_datetime(value: &DateTime<FixedOffset>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// `xsd:dateTime` text with offset
pub fn parse_datetime(text: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(text.trim())
        .map_err(|_| DecodeError::new("not a valid dateTime").with_text(text).into())
}

/// `YYYY-MM-DD`
pub fn format_date(value: &NaiveDate) -> String {
    value.format("%Y-%m-%d").to_string()
}

/// `YYYY-MM-DD` into a date
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .map_err(|_| DecodeError::new("not a valid date").with_text(text).into())
}

/// `hh:mm:ss`
pub fn format_time(value: &NaiveTime) -> String {
    value.format("%H:%M:%S").to_string()
}

/// `hh:mm:ss` into a time
pub fn parse_time(text: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(text.trim(), "%H:%M:%S")
        .map_err(|_| DecodeError::new("not a valid time").with_text(text).into())
}

/// Standard base64 text
pub fn format_base64(value: &[u8]) -> String {
    BASE64.encode(value)
}

/// Base64 text into bytes, insignificant whitespace stripped
pub fn parse_base64(text: &str) -> Result<Vec<u8>> {
    // Whitespace is insignificant in base64Binary lexical space.
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    BASE64
        .decode(compact.as_bytes())
        .map_err(|_| DecodeError::new("not valid base64Binary").with_text(text).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boolean_lexical_forms() {
        assert_eq!(format_boolean(true), "1");
        assert_eq!(format_boolean(false), "0");
        for (text, expected) in [("1", true), ("true", true), ("0", false), ("false", false)] {
            assert_eq!(parse_boolean(text).unwrap(), expected);
        }
        assert!(parse_boolean("yes").is_err());
    }

    #[test]
    fn test_float_non_finite_spellings() {
        assert_eq!(format_float(f64::INFINITY), "INF");
        assert_eq!(format_float(f64::NEG_INFINITY), "-INF");
        assert_eq!(format_float(f64::NAN), "NaN");
        assert_eq!(parse_float("INF").unwrap(), f64::INFINITY);
        assert_eq!(parse_float("-INF").unwrap(), f64::NEG_INFINITY);
        assert!(parse_float("NaN").unwrap().is_nan());
        assert_eq!(parse_float(" 2.5 ").unwrap(), 2.5);
    }

    #[test]
    fn test_integer_round_trip() {
        for v in [0i64, 42, -7, i64::MAX, i64::MIN] {
            assert_eq!(parse_integer(&format_integer(v)).unwrap(), v);
        }
        assert!(parse_integer("twelve").is_err());
    }

    #[test]
    fn test_decimal_is_exact() {
        let d: Decimal = parse_decimal("19.99").unwrap();
        assert_eq!(format_decimal(&d), "19.99");
    }

    #[test]
    fn test_datetime_round_trip() {
        let dt = parse_datetime("2024-03-01T12:30:00+02:00").unwrap();
        assert_eq!(format_datetime(&dt), "2024-03-01T12:30:00+02:00");
        assert!(parse_datetime("yesterday").is_err());
    }

    #[test]
    fn test_base64_ignores_whitespace() {
        assert_eq!(parse_base64("aGVs\n  bG8=").unwrap(), b"hello");
        assert_eq!(format_base64(b"hello"), "aGVsbG8=");
    }
}
