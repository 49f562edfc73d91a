//! Axum route handlers for the Ranking API.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::embedding::PrecomputedEmbeddings;
use crate::errors::AppError;
use crate::models::{EmploymentRecord, JobPosting};
use crate::ranking::{PreparedQuery, RankingDecision, RankingParams};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RankRequest {
    pub job_posting: JobPosting,
    #[serde(default)]
    pub employment: Vec<EmploymentRecord>,
    /// Falls back to the service defaults from config.
    #[serde(default)]
    pub params: Option<RankingParams>,
}

#[derive(Debug, Serialize)]
pub struct RankedRecord {
    pub company: String,
    pub title: String,
    pub start_date: String,
    pub end_date: Option<String>,
    pub decision: RankingDecision,
}

#[derive(Debug, Serialize)]
pub struct RankResponse {
    pub results: Vec<RankedRecord>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/rank
///
/// Ranks every employment record against one job posting. All vectors are fetched
/// in a single batch call before ranking, so the posting is encoded exactly once.
/// The first record that fails aborts the request.
pub async fn handle_rank(
    State(state): State<AppState>,
    Json(request): Json<RankRequest>,
) -> Result<Json<RankResponse>, AppError> {
    let params = request
        .params
        .unwrap_or_else(|| state.config.ranking.clone());
    params.validate()?;

    if request.employment.is_empty() {
        return Ok(Json(RankResponse {
            results: Vec::new(),
        }));
    }

    let query_text = request.job_posting.query_text();
    if query_text.trim().is_empty() {
        return Err(AppError::Validation(
            "job_posting has no text to rank against".to_string(),
        ));
    }

    let mut texts = vec![query_text];
    texts.extend(
        request
            .employment
            .iter()
            .flat_map(|record| record.responsibilities.iter().cloned()),
    );
    let embeddings = PrecomputedEmbeddings::fetch(state.embedder.as_ref(), texts).await?;

    let query = PreparedQuery::encode(&embeddings, &request.job_posting)?;
    let results = query
        .rank_all(&embeddings, &request.employment, &params)
        .into_iter()
        .zip(request.employment)
        .map(|(decision, record)| {
            decision.map(|decision| RankedRecord {
                company: record.company,
                title: record.title,
                start_date: record.start_date,
                end_date: record.end_date,
                decision,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let included = results.iter().filter(|r| r.decision.is_included()).count();
    info!(
        records = results.len(),
        included,
        "Ranked employment history against \"{}\"",
        request.job_posting.title
    );

    Ok(Json(RankResponse { results }))
}
