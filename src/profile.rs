//! Display helpers for the pet's identity: initials, handle, age.

use crate::model::PetRecord;
use crate::registry::names_equal;
use chrono::{DateTime, Utc};

pub(crate) const ANONYMOUS: &str = "Nameless tamagochi";

pub(crate) fn display_name(name: Option<&str>) -> &str {
    name.filter(|n| !n.trim().is_empty()).unwrap_or(ANONYMOUS)
}

pub(crate) fn initials(name: &str) -> String {
    let words: Vec<&str> = name.split_whitespace().collect();
    match words.as_slice() {
        [] => "TG".to_string(),
        [only] => only.chars().take(2).collect::<String>().to_uppercase(),
        [first, .., last] => first
            .chars()
            .take(1)
            .chain(last.chars().take(1))
            .collect::<String>()
            .to_uppercase(),
    }
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' | 'ő' | 'õ' => 'o',
        'ú' | 'ù' | 'û' | 'ü' | 'ű' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        other => other,
    }
}

/// Lowercase ASCII handle, e.g. `Render Róka` -> `render-roka`.
pub(crate) fn handle(name: &str) -> String {
    let mut out = String::new();
    let mut pending_dash = false;
    for c in name.trim().to_lowercase().chars().map(fold_accent) {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c);
        } else {
            pending_dash = true;
        }
    }
    if out.is_empty() {
        "pixel-tamagochi".to_string()
    } else {
        out
    }
}

/// Coarse "how long ago" text; months are 30 days, years 365.
pub(crate) fn elapsed_text(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - created_at).num_seconds().max(0);
    let minute = 60;
    let hour = 60 * minute;
    let day = 24 * hour;
    let month = 30 * day;
    let year = 365 * day;

    let (value, unit) = if secs < minute {
        return "A few seconds ago".to_string();
    } else if secs < hour {
        (secs / minute, "minute")
    } else if secs < day {
        (secs / hour, "hour")
    } else if secs < month {
        (secs / day, "day")
    } else if secs < year {
        (secs / month, "month")
    } else {
        (secs / year, "year")
    };

    if value == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{value} {unit}s ago")
    }
}

pub(crate) fn birth_date(created_at: DateTime<Utc>) -> String {
    created_at.format("%Y-%m-%d %H:%M UTC").to_string()
}

/// The record matching the session name, if any.
pub(crate) fn my_record<'a>(records: &'a [PetRecord], name: Option<&str>) -> Option<&'a PetRecord> {
    let name = name?;
    records.iter().find(|r| names_equal(&r.name, name))
}

pub(crate) fn others<'a>(
    records: &'a [PetRecord],
    name: Option<&'a str>,
) -> impl Iterator<Item = &'a PetRecord> + 'a {
    records
        .iter()
        .filter(move |r| name.map_or(true, |n| !names_equal(&r.name, n)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn initials_follow_word_count() {
        assert_eq!(initials(""), "TG");
        assert_eq!(initials("mochi"), "MO");
        assert_eq!(initials("Pixel Panni"), "PP");
        assert_eq!(initials("  render  the  róka "), "RR");
        assert_eq!(initials("ő"), "Ő");
    }

    #[test]
    fn handle_strips_accents_and_punctuation() {
        assert_eq!(handle("Render Róka"), "render-roka");
        assert_eq!(handle("  Árvíztűrő -- Tükörfúrógép! "), "arvizturo-tukorfurogep");
        assert_eq!(handle("!!!"), "pixel-tamagochi");
    }

    #[test]
    fn elapsed_text_buckets() {
        let now = Utc::now();
        assert_eq!(elapsed_text(now, now), "A few seconds ago");
        assert_eq!(elapsed_text(now + Duration::hours(1), now), "A few seconds ago");
        assert_eq!(elapsed_text(now - Duration::minutes(1), now), "1 minute ago");
        assert_eq!(elapsed_text(now - Duration::minutes(59), now), "59 minutes ago");
        assert_eq!(elapsed_text(now - Duration::hours(5), now), "5 hours ago");
        assert_eq!(elapsed_text(now - Duration::days(29), now), "29 days ago");
        assert_eq!(elapsed_text(now - Duration::days(65), now), "2 months ago");
        assert_eq!(elapsed_text(now - Duration::days(800), now), "2 years ago");
    }

    #[test]
    fn my_record_and_others_partition_by_name() {
        let records = crate::registry::seed_records();
        let mine = my_record(&records, Some(" pixel PANNI")).unwrap();
        assert_eq!(mine.name, "Pixel Panni");
        assert_eq!(others(&records, Some("pixel panni")).count(), 2);
        assert_eq!(others(&records, None).count(), 3);
        assert!(my_record(&records, None).is_none());
        assert_eq!(display_name(None), ANONYMOUS);
        assert_eq!(display_name(Some("  ")), ANONYMOUS);
    }
}
