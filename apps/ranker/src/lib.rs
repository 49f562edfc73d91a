//! Resume relevance ranking: decides which past positions belong on a resume tailored
//! to a job posting, and which of their responsibilities to surface, best first.

pub mod config;
pub mod embedding;
pub mod errors;
pub mod models;
pub mod ranking;
pub mod routes;
pub mod state;

pub use embedding::{BatchEmbedder, EmbeddingError, PrecomputedEmbeddings, TextEmbedder};
pub use models::{EmploymentRecord, JobPosting};
pub use ranking::{rank, PreparedQuery, RankingDecision, RankingError, RankingParams};
