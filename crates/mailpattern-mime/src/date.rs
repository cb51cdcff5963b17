//! Date header parsing.

use chrono::{DateTime, FixedOffset};

use crate::error::{Error, Result};

/// Parses a Date header value.
///
/// Accepts RFC 2822 dates, including the common trailing zone comment
/// (`... +0200 (CEST)`), and RFC 3339 timestamps.
///
/// # Errors
///
/// Returns [`Error::InvalidDate`] if the value matches neither format.
pub fn parse(value: &str) -> Result<DateTime<FixedOffset>> {
    let trimmed = strip_comment(value.trim());

    DateTime::parse_from_rfc2822(trimmed)
        .or_else(|_| DateTime::parse_from_rfc3339(trimmed))
        .map_err(|_| Error::InvalidDate(value.to_string()))
}

fn strip_comment(value: &str) -> &str {
    match value.rfind('(') {
        Some(index) if value.ends_with(')') => value[..index].trim_end(),
        _ => value,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_rfc2822() {
        let date = parse("Tue, 1 Jul 2003 10:52:37 +0200").unwrap();
        assert_eq!(date.year(), 2003);
        assert_eq!(date.month(), 7);
        assert_eq!(date.hour(), 10);
    }

    #[test]
    fn test_parse_with_zone_comment() {
        let date = parse("Tue, 1 Jul 2003 10:52:37 +0200 (CEST)").unwrap();
        assert_eq!(date.day(), 1);
    }

    #[test]
    fn test_parse_rfc3339() {
        let date = parse("2024-03-05T08:00:00Z").unwrap();
        assert_eq!(date.month(), 3);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(matches!(parse("yesterday"), Err(Error::InvalidDate(_))));
    }
}
