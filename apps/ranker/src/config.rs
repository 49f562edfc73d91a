use std::fmt::Display;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};

use crate::ranking::params::{
    RankingParams, DEFAULT_MAX_YEARS_OLD, DEFAULT_RECENCY_WEIGHT, DEFAULT_RELEVANCE_THRESHOLD,
    DEFAULT_TOP_N,
};

const DEFAULT_EMBEDDING_MODEL: &str = "all-MiniLM-L6-v2";
const DEFAULT_EMBEDDING_TIMEOUT_SECS: u64 = 30;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or ranking defaults are out of range.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub embedding: EmbeddingConfig,
    /// Used when a rank request carries no `params`.
    pub ranking: RankingParams,
}

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Base URL of an OpenAI-compatible API; `/embeddings` is appended.
    pub api_base: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let ranking = RankingParams {
            top_n: parse_or(&lookup, "RANK_TOP_N", DEFAULT_TOP_N)?,
            recency_weight: parse_or(&lookup, "RANK_RECENCY_WEIGHT", DEFAULT_RECENCY_WEIGHT)?,
            relevance_threshold: parse_or(
                &lookup,
                "RANK_RELEVANCE_THRESHOLD",
                DEFAULT_RELEVANCE_THRESHOLD,
            )?,
            max_years_old: parse_or(&lookup, "RANK_MAX_YEARS_OLD", DEFAULT_MAX_YEARS_OLD)?,
            on_unparseable_date: parse_or(&lookup, "RANK_ON_UNPARSEABLE_DATE", Default::default())?,
            reference_year: None,
        };
        ranking
            .validate()
            .context("Invalid ranking defaults in environment")?;

        Ok(Config {
            port: parse_or(&lookup, "PORT", 8080)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            embedding: EmbeddingConfig {
                api_base: require(&lookup, "EMBEDDING_API_BASE")?,
                api_key: lookup("EMBEDDING_API_KEY").filter(|key| !key.is_empty()),
                model: lookup("EMBEDDING_MODEL")
                    .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
                timeout_secs: parse_or(
                    &lookup,
                    "EMBEDDING_TIMEOUT_SECS",
                    DEFAULT_EMBEDDING_TIMEOUT_SECS,
                )?,
            },
            ranking,
        })
    }
}

fn require(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    lookup(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("{key} has an invalid value '{raw}': {e}")),
        None => Ok(default),
    }
}
