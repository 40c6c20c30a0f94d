use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// RFC 822 bodies (weekday already removed) with a numeric offset.
const RFC822_FORMATS: &[&str] = &["%d %b %Y %H:%M:%S %z", "%d %b %Y %H:%M %z"];

/// Zone names that mean UTC but that chrono's RFC 2822 parser does not accept.
const UTC_ZONE_NAMES: &[&str] = &["UTC", "UT", "Z"];

/// ISO-style patterns carrying an explicit numeric offset.
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%z"];

/// Patterns without an offset; the result is taken as UTC.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%SZ", "%Y-%m-%d %H:%M:%S"];

/// Parse a feed date, falling back to the Unix epoch.
///
/// An unparseable date sorts as maximally stale, so any real time window
/// drops the article instead of the run failing on it.
pub fn normalize_date(raw: &str) -> DateTime<Utc> {
    parse_date(raw).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    if let Some(dt) = parse_rfc822(value) {
        return Some(dt);
    }

    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(value, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    parse_iso_fallback(value)
}

/// RFC 822 dates with a numeric or named zone. The weekday is ignored, so a
/// weekday that disagrees with the date does not reject the value.
fn parse_rfc822(value: &str) -> Option<DateTime<Utc>> {
    let body = match value.split_once(',') {
        Some((weekday, rest)) if !weekday.is_empty() && weekday.trim().chars().all(|c| c.is_ascii_alphabetic()) => {
            rest.trim()
        }
        _ => value,
    };
    let body = utc_zone_as_offset(body);

    for format in RFC822_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&body, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    // Named zones such as GMT, EST, PDT.
    DateTime::parse_from_rfc2822(&body)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn utc_zone_as_offset(body: &str) -> String {
    if let Some((rest, zone)) = body.rsplit_once(' ') {
        if UTC_ZONE_NAMES.iter().any(|name| zone.eq_ignore_ascii_case(name)) {
            return format!("{} +0000", rest);
        }
    }
    body.to_string()
}

fn parse_iso_fallback(value: &str) -> Option<DateTime<Utc>> {
    let normalized = match value.strip_suffix('Z').or_else(|| value.strip_suffix('z')) {
        Some(stripped) => format!("{}+00:00", stripped),
        None => value.to_string(),
    };

    if let Ok(dt) = DateTime::<FixedOffset>::parse_from_rfc3339(&normalized) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M%:z") {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&normalized, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(&normalized, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

pub fn is_epoch(dt: &DateTime<Utc>) -> bool {
    *dt == DateTime::<Utc>::UNIX_EPOCH
}
