use thiserror::Error;

use crate::embedding::EmbeddingError;

/// Errors raised by a ranking call. None of them are recovered inside the engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RankingError {
    /// An out-of-range tunable. Raised before any embedding work happens.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The end date is not an ongoing token and carries no 19xx/20xx year.
    #[error("Could not find a year in end date {0:?}")]
    DateParse(String),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
}

impl RankingError {
    pub fn configuration(message: impl Into<String>) -> Self {
        RankingError::Configuration(message.into())
    }
}
