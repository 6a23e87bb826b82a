use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Derives the stable lookup slug for a taxonomy display name: runs of
/// characters outside `[A-Za-z0-9-]` collapse to a single hyphen, the
/// result is lowercased and trimmed of leading/trailing hyphens.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut replaced = false;

    for c in text.chars() {
        if c.is_ascii_alphanumeric() || c == '-' {
            slug.push(c.to_ascii_lowercase());
            replaced = false;
        } else if !replaced {
            slug.push('-');
            replaced = true;
        }
    }

    slug.trim_matches('-').to_string()
}

/// Drops everything between `<` and `>` from the input.
pub fn strip_tags(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;

    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }

    text
}

/// Provider free-text normalization: tags stripped, whitespace trimmed.
pub fn clean_text(text: &str) -> String {
    strip_tags(text).trim().to_string()
}

pub fn squash_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn md5_hex(input: &str) -> String {
    format!("{:x}", md5::compute(input))
}

/// Lenient timestamp parsing for the date formats the providers emit.
/// Returns `None` for anything unparseable; callers decide whether that is
/// worth a log line.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    // NYT style: RFC3339 except the offset has no colon ("+0000").
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }

    None
}
