//! Listing timestamp parsing shared by all adapters.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Parse a listing time cell.
///
/// `2025-02-17 02.16` is absolute; `02.16` or `16:55:03` is a time of day on
/// `today`; `2025-02-17` alone is midnight of that date.
pub fn parse_post_time(raw: &str, today: NaiveDate) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if raw.contains('-') {
        let mut parts = raw.split_whitespace();
        let date = NaiveDate::parse_from_str(parts.next()?, "%Y-%m-%d").ok()?;
        match (parts.next(), parts.next()) {
            (None, _) => date.and_hms_opt(0, 0, 0),
            (Some(time), None) => Some(date.and_time(parse_clock(time)?)),
            _ => None,
        }
    } else {
        Some(today.and_time(parse_clock(raw)?))
    }
}

fn parse_clock(raw: &str) -> Option<NaiveTime> {
    let normalized = if raw.contains(':') {
        raw.to_string()
    } else {
        raw.replace('.', ":")
    };
    NaiveTime::parse_from_str(&normalized, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(&normalized, "%H:%M"))
        .ok()
}

/// Whether a time cell carries a calendar date (older entries on newest-first boards).
pub fn has_date_part(raw: &str) -> bool {
    raw.contains('-') || raw.contains('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn dotted_time_only_uses_today() {
        assert_eq!(parse_post_time("02.16", today()), Some(at(2026, 3, 1, 2, 16)));
        assert_eq!(parse_post_time(" 16:55 ", today()), Some(at(2026, 3, 1, 16, 55)));
    }

    #[test]
    fn absolute_with_dotted_time() {
        assert_eq!(
            parse_post_time("2025-02-17 02.16", today()),
            Some(at(2025, 2, 17, 2, 16))
        );
    }

    #[test]
    fn seconds_and_date_only() {
        assert_eq!(
            parse_post_time("12:34:56", today()),
            today().and_hms_opt(12, 34, 56)
        );
        assert_eq!(parse_post_time("2025-02-17", today()), Some(at(2025, 2, 17, 0, 0)));
    }

    #[test]
    fn garbage_is_none() {
        assert_eq!(parse_post_time("", today()), None);
        assert_eq!(parse_post_time("어제", today()), None);
        assert_eq!(parse_post_time("25/02/17", today()), None);
        assert_eq!(parse_post_time("2025-02-17 1 2", today()), None);
    }

    #[test]
    fn date_detection() {
        assert!(has_date_part("25/02/17"));
        assert!(has_date_part("2025-02-17"));
        assert!(!has_date_part("02.16"));
    }
}
