//! Recency model: turns a free-text end date into a linearly decayed freshness score.

use std::sync::LazyLock;

use regex::Regex;

use crate::ranking::error::RankingError;
use crate::ranking::params::UnparseableDatePolicy;

/// Case-insensitive end-date values meaning the position has not ended.
pub const ONGOING_TOKENS: [&str; 4] = ["current", "present", "now", "ongoing"];

static YEAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(19\d{2}|20\d{2})").expect("year pattern is valid"));

pub fn is_ongoing(text: &str) -> bool {
    let text = text.trim();
    ONGOING_TOKENS
        .iter()
        .any(|token| text.eq_ignore_ascii_case(token))
}

/// First 19xx/20xx run found anywhere in the text, e.g. "Aug. 2020" -> 2020.
pub fn extract_year(text: &str) -> Option<i32> {
    YEAR_PATTERN
        .find(text)
        .and_then(|m| m.as_str().parse::<i32>().ok())
}

/// Resolves the year a position ended.
///
/// `None` and ongoing tokens resolve to `now_year`. Text without a year is a
/// `DateParse` error unless the policy says to treat it as current.
pub fn end_year(
    end_date: Option<&str>,
    now_year: i32,
    policy: UnparseableDatePolicy,
) -> Result<i32, RankingError> {
    let text = match end_date {
        Some(text) => text,
        None => return Ok(now_year),
    };
    if is_ongoing(text) {
        return Ok(now_year);
    }
    match (extract_year(text), policy) {
        (Some(year), _) => Ok(year),
        (None, UnparseableDatePolicy::TreatAsCurrent) => Ok(now_year),
        (None, UnparseableDatePolicy::Error) => Err(RankingError::DateParse(text.to_string())),
    }
}

/// Whole years between the end year and now. Future end dates count as zero.
pub fn years_since(end_year: i32, now_year: i32) -> i32 {
    (now_year - end_year).max(0)
}

/// `max(0, 1 - years_since / max_years_old)`; exactly 0 once the age reaches the limit.
pub fn decay(years_since: i32, max_years_old: i32) -> f64 {
    if years_since >= max_years_old {
        return 0.0;
    }
    (1.0 - f64::from(years_since) / f64::from(max_years_old)).clamp(0.0, 1.0)
}

/// Freshness score in [0, 1] for an end date, under the strict date policy.
pub fn recency_score(end_date: &str, now_year: i32, max_years_old: i32) -> Result<f64, RankingError> {
    if max_years_old <= 0 {
        return Err(RankingError::configuration(format!(
            "max_years_old must be greater than 0, got {max_years_old}"
        )));
    }
    let year = end_year(Some(end_date), now_year, UnparseableDatePolicy::Error)?;
    Ok(decay(years_since(year, now_year), max_years_old))
}
