use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Parses a feed publication date into UTC.
///
/// Tries RFC 3339 (Atom), RFC 2822 (RSS), then the looser shapes publishers
/// actually emit: a weekday that does not match the date, single-digit days,
/// missing seconds, named zones such as `CET` or `AEST`, and bare dates.
/// Values without any zone are taken as UTC. Returns `None` when nothing
/// matches.
pub fn parse_feed_date(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }

    let normalized = strip_weekday(&s.split_whitespace().collect::<Vec<_>>().join(" "));

    const WITH_OFFSET: &[&str] = &[
        "%d %b %Y %H:%M:%S %z",
        "%d %b %Y %H:%M %z",
        "%Y-%m-%dT%H:%M:%S%z",
        "%Y-%m-%dT%H:%M:%S%:z",
        "%Y-%m-%d %H:%M:%S %z",
    ];
    for fmt in WITH_OFFSET {
        if let Ok(dt) = DateTime::parse_from_str(&normalized, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    if let Some(dt) = parse_with_named_zone(&normalized) {
        return Some(dt);
    }

    parse_naive(&normalized).map(|naive| Utc.from_utc_datetime(&naive))
}

/// `"Mon, 01 Jan 2024 ..."` -> `"01 Jan 2024 ..."`
fn strip_weekday(s: &str) -> String {
    match s.split_once(',') {
        Some((day, rest)) if day.chars().all(|c| c.is_ascii_alphabetic()) => {
            rest.trim_start().to_owned()
        }
        _ => s.to_owned(),
    }
}

fn parse_naive(s: &str) -> Option<NaiveDateTime> {
    const DATETIME: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%d %b %Y %H:%M:%S",
        "%d %b %Y %H:%M",
    ];
    for fmt in DATETIME {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive);
        }
    }

    const DATE_ONLY: &[&str] = &["%Y-%m-%d", "%d %b %Y", "%B %d %Y"];
    for fmt in DATE_ONLY {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

fn parse_with_named_zone(s: &str) -> Option<DateTime<Utc>> {
    let (local, zone) = s.rsplit_once(' ')?;
    let offset_secs = named_zone_offset(zone)?;
    let offset = FixedOffset::east_opt(offset_secs)?;
    let naive = parse_naive(local)?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Offsets for zone abbreviations chrono's RFC 2822 parser does not know.
fn named_zone_offset(zone: &str) -> Option<i32> {
    let hours: f32 = match zone.to_ascii_uppercase().as_str() {
        "UTC" | "GMT" | "UT" | "Z" | "WET" => 0.0,
        "BST" | "CET" | "WEST" | "MET" => 1.0,
        "CEST" | "EET" | "SAST" | "MEST" => 2.0,
        "EEST" | "MSK" => 3.0,
        "IST" => 5.5,
        "SGT" | "HKT" | "AWST" => 8.0,
        "JST" | "KST" => 9.0,
        "ACST" => 9.5,
        "AEST" => 10.0,
        "ACDT" => 10.5,
        "AEDT" => 11.0,
        "NZST" => 12.0,
        "NZDT" => 13.0,
        "AST" | "EDT" => -4.0,
        "ADT" => -3.0,
        "NST" => -3.5,
        "EST" | "CDT" => -5.0,
        "CST" | "MDT" => -6.0,
        "MST" | "PDT" => -7.0,
        "PST" | "AKDT" => -8.0,
        "AKST" => -9.0,
        "HST" => -10.0,
        _ => return None,
    };
    Some((hours * 3600.0) as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::SecondsFormat;

    fn iso(raw: &str) -> Option<String> {
        parse_feed_date(raw).map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    #[test]
    fn test_rfc2822() {
        assert_eq!(
            iso("Mon, 01 Jan 2024 00:00:00 GMT").as_deref(),
            Some("2024-01-01T00:00:00Z")
        );
        assert_eq!(
            iso("Mon, 01 Jan 2024 10:00:00 -0500").as_deref(),
            Some("2024-01-01T15:00:00Z")
        );
    }

    #[test]
    fn test_rfc3339() {
        assert_eq!(
            iso("2024-02-29T12:30:00+02:00").as_deref(),
            Some("2024-02-29T10:30:00Z")
        );
        assert_eq!(
            iso("2024-02-29T12:30:00.123Z").as_deref(),
            Some("2024-02-29T12:30:00Z")
        );
    }

    #[test]
    fn test_mismatched_weekday_still_parses() {
        // 2024-01-01 was a Monday
        assert_eq!(
            iso("Tue, 01 Jan 2024 10:00:00 +0000").as_deref(),
            Some("2024-01-01T10:00:00Z")
        );
    }

    #[test]
    fn test_named_zone_outside_rfc2822() {
        assert_eq!(
            iso("Wed, 10 Jan 2024 08:30:00 CET").as_deref(),
            Some("2024-01-10T07:30:00Z")
        );
        assert_eq!(
            iso("10 Jan 2024 20:00:00 AEST").as_deref(),
            Some("2024-01-10T10:00:00Z")
        );
    }

    #[test]
    fn test_loose_shapes() {
        assert_eq!(
            iso("1 Feb 2024 09:00 +0100").as_deref(),
            Some("2024-02-01T08:00:00Z")
        );
        assert_eq!(
            iso("Thu,  1   Feb 2024 09:00:00 +0000").as_deref(),
            Some("2024-02-01T09:00:00Z")
        );
        assert_eq!(
            iso("2024-03-05 14:00:00").as_deref(),
            Some("2024-03-05T14:00:00Z")
        );
        assert_eq!(iso("2024-03-05").as_deref(), Some("2024-03-05T00:00:00Z"));
    }

    #[test]
    fn test_unparseable() {
        assert_eq!(parse_feed_date(""), None);
        assert_eq!(parse_feed_date("last tuesday"), None);
        assert_eq!(parse_feed_date("Mon, 99 Foo 2024 10:00:00 GMT"), None);
    }
}
