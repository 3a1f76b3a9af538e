/// Parses an `itunes:duration` value into whole seconds.
///
/// Accepts plain seconds (`"3723"`, `"3723.6"`), `MM:SS` and `HH:MM:SS`.
/// Fractional seconds are truncated. Components are not range-checked
/// (`"90:00"` is 5400 seconds) since publishers routinely overflow minutes.
/// Anything else yields `None`.
pub fn parse_duration_seconds(raw: &str) -> Option<u64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if !s.contains(':') {
        return parse_seconds_component(s);
    }

    let parts: Vec<&str> = s.split(':').map(str::trim).collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [m, sec] => (0, parse_whole(m)?, parse_seconds_component(sec)?),
        [h, m, sec] => (parse_whole(h)?, parse_whole(m)?, parse_seconds_component(sec)?),
        _ => return None,
    };

    hours
        .checked_mul(3600)?
        .checked_add(minutes.checked_mul(60)?)?
        .checked_add(seconds)
}

fn parse_whole(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn parse_seconds_component(s: &str) -> Option<u64> {
    match s.split_once('.') {
        Some((whole, frac)) if frac.bytes().all(|b| b.is_ascii_digit()) => {
            if whole.is_empty() {
                Some(0)
            } else {
                parse_whole(whole)
            }
        }
        Some(_) => None,
        None => parse_whole(s),
    }
}
