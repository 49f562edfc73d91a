use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::ranking::error::RankingError;

pub const DEFAULT_TOP_N: usize = 5;
pub const DEFAULT_RECENCY_WEIGHT: f64 = 0.3;
pub const DEFAULT_RELEVANCE_THRESHOLD: f64 = 0.3;
pub const DEFAULT_MAX_YEARS_OLD: i32 = 10;

/// A record whose best responsibility scores below this is "not meaningfully related".
pub const MIN_MAX_RELEVANCE: f64 = 0.3;

/// Surfaced responsibilities must score above `relevance_threshold - SELECTION_MARGIN`.
pub const SELECTION_MARGIN: f64 = 0.1;

/// What to do with an end date that is neither an ongoing token nor contains a year.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnparseableDatePolicy {
    #[default]
    Error,
    /// Legacy behaviour: treat the position as ongoing.
    TreatAsCurrent,
}

impl FromStr for UnparseableDatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(UnparseableDatePolicy::Error),
            "treat_as_current" => Ok(UnparseableDatePolicy::TreatAsCurrent),
            other => Err(format!(
                "unknown unparseable-date policy '{other}' (expected 'error' or 'treat_as_current')"
            )),
        }
    }
}

impl fmt::Display for UnparseableDatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnparseableDatePolicy::Error => f.write_str("error"),
            UnparseableDatePolicy::TreatAsCurrent => f.write_str("treat_as_current"),
        }
    }
}

/// Tunables for one ranking run. Missing fields deserialize to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingParams {
    pub top_n: usize,
    /// Share of the weighted score taken by recency; the rest is average relevance.
    pub recency_weight: f64,
    pub relevance_threshold: f64,
    pub max_years_old: i32,
    pub on_unparseable_date: UnparseableDatePolicy,
    /// Pins "now" for reproducible runs. `None` uses the current UTC year.
    pub reference_year: Option<i32>,
}

impl Default for RankingParams {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            recency_weight: DEFAULT_RECENCY_WEIGHT,
            relevance_threshold: DEFAULT_RELEVANCE_THRESHOLD,
            max_years_old: DEFAULT_MAX_YEARS_OLD,
            on_unparseable_date: UnparseableDatePolicy::default(),
            reference_year: None,
        }
    }
}

impl RankingParams {
    /// Rejects out-of-range tunables. Values are never clamped.
    pub fn validate(&self) -> Result<(), RankingError> {
        if self.top_n == 0 {
            return Err(RankingError::configuration("top_n must be a positive integer"));
        }
        if !(0.0..=1.0).contains(&self.recency_weight) {
            return Err(RankingError::configuration(format!(
                "recency_weight must lie in [0, 1], got {}",
                self.recency_weight
            )));
        }
        if !self.relevance_threshold.is_finite() {
            return Err(RankingError::configuration(
                "relevance_threshold must be a finite number",
            ));
        }
        if self.max_years_old <= 0 {
            return Err(RankingError::configuration(format!(
                "max_years_old must be greater than 0, got {}",
                self.max_years_old
            )));
        }
        Ok(())
    }

    pub fn now_year(&self) -> i32 {
        self.reference_year.unwrap_or_else(|| Utc::now().year())
    }

    /// Lowest similarity a responsibility may have and still be surfaced (exclusive).
    pub fn selection_floor(&self) -> f64 {
        self.relevance_threshold - SELECTION_MARGIN
    }
}
