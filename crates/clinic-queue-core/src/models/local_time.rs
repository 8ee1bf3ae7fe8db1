//! Lenient parsing of clinic wall-clock timestamps.
//!
//! The backend sends local times without an offset (`2025-06-11T18:30:00`),
//! but older records may carry seconds fractions, a trailing `Z`, or only a
//! date. Offsets are ignored: the wall-clock part is taken as written.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer};

/// Parse a local timestamp or a bare date (midnight).
pub fn parse_local(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Serde adapter: unparsable or missing values become `None`.
pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_local))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variants() {
        let expected = NaiveDate::from_ymd_opt(2025, 6, 11)
            .unwrap()
            .and_hms_opt(18, 30, 0)
            .unwrap();

        assert_eq!(parse_local("2025-06-11T18:30:00"), Some(expected));
        assert_eq!(parse_local("2025-06-11T18:30:00.000"), Some(expected));
        assert_eq!(parse_local("2025-06-11T18:30"), Some(expected));
        assert_eq!(parse_local("2025-06-11T18:30:00Z"), Some(expected));
        assert_eq!(parse_local("2025-06-11T18:30:00+02:00"), Some(expected));
    }

    #[test]
    fn test_date_only_is_midnight() {
        let parsed = parse_local("2025-03-01").unwrap();
        assert_eq!(parsed.format("%H:%M:%S").to_string(), "00:00:00");
    }

    #[test]
    fn test_garbage() {
        assert_eq!(parse_local(""), None);
        assert_eq!(parse_local("domani"), None);
    }
}
