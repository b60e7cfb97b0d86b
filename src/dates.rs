//! Date phrase normalization for partition expressions.

use chrono::{Duration, NaiveDate, Utc};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref ISO_DATE: Regex = Regex::new(r"\d{4}-\d{2}-\d{2}").unwrap();
}

/// Resolve "yesterday" relative to `today`, else the first `YYYY-MM-DD` in the phrase.
pub fn normalize_date_phrase(phrase: &str, today: NaiveDate) -> Option<String> {
    let phrase = phrase.trim().to_lowercase();
    if phrase.contains("yesterday") {
        return Some((today - Duration::days(1)).format("%Y-%m-%d").to_string());
    }
    ISO_DATE.find(&phrase).map(|m| m.as_str().to_string())
}

/// Same as [`normalize_date_phrase`] using the current UTC date.
pub fn normalize_date_phrase_utc(phrase: &str) -> Option<String> {
    normalize_date_phrase(phrase, Utc::now().date_naive())
}
