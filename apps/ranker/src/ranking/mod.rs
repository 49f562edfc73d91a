// Relevance ranking: similarity scoring, recency decay, exclusion policy, top-N selection.
// The engine is synchronous and performs no I/O; vectors come from an injected `TextEmbedder`.

pub mod engine;
pub mod error;
pub mod handlers;
pub mod params;
pub mod recency;
pub mod similarity;

pub use engine::{
    format_score, rank, ExclusionReason, PreparedQuery, RankingDecision, RecordScores,
    ScoredResponsibility, Selection,
};
pub use error::RankingError;
pub use params::{RankingParams, UnparseableDatePolicy};
