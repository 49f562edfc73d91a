//! Relevance-Ranking Engine — decides whether an employment record earns a place on a
//! tailored resume and which of its responsibilities to surface, best first.
//!
//! Algorithm, per record:
//! 1. Encode the posting once (`PreparedQuery`), then every responsibility
//! 2. Cosine similarity of each responsibility against the posting
//! 3. avg/max relevance, recency from the end date, weighted score
//! 4. Exclusion policy: too old and irrelevant, then irrelevant on every measure
//! 5. Top-N by similarity, keeping entries above `relevance_threshold - 0.1`
//!
//! The engine holds no mutable state and never retries. Embedder failures abort the
//! record they happened in.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use serde::{Serialize, Serializer};
use tracing::{debug, info};

use crate::embedding::{Embedding, EmbeddingError, TextEmbedder};
use crate::models::{EmploymentRecord, JobPosting};
use crate::ranking::error::RankingError;
use crate::ranking::params::{RankingParams, MIN_MAX_RELEVANCE};
use crate::ranking::recency;
use crate::ranking::similarity::similarity_vector;

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// A responsibility statement and its similarity to the posting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredResponsibility {
    pub text: String,
    #[serde(serialize_with = "serialize_score")]
    pub similarity: f64,
}

/// Record-level metrics behind a ranking decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RecordScores {
    #[serde(serialize_with = "serialize_score")]
    pub avg_relevance: f64,
    #[serde(serialize_with = "serialize_score")]
    pub max_relevance: f64,
    #[serde(serialize_with = "serialize_score")]
    pub recency: f64,
    /// recency_weight * recency + (1 - recency_weight) * avg_relevance
    #[serde(serialize_with = "serialize_score")]
    pub weighted_score: f64,
    pub years_since_job: i32,
}

impl fmt::Display for RecordScores {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RS = {}, WS = {}, avg = {}, max = {}",
            format_score(self.recency),
            format_score(self.weighted_score),
            format_score(self.avg_relevance),
            format_score(self.max_relevance)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    NoResponsibilities,
    /// Older than `max_years_old` and no responsibility reaches 0.3.
    StaleAndIrrelevant,
    /// Average below the threshold and no responsibility reaches 0.3.
    Irrelevant,
}

impl ExclusionReason {
    pub fn describe(&self) -> &'static str {
        match self {
            ExclusionReason::NoResponsibilities => "Position has no recorded responsibilities",
            ExclusionReason::StaleAndIrrelevant => {
                "Position is too old and irrelevant job duties"
            }
            ExclusionReason::Irrelevant => "Position has no relevant job duties",
        }
    }
}

/// An included record: the surfaced responsibilities, best first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selection {
    /// May be empty: included, but nothing cleared the selection floor.
    pub responsibilities: Vec<String>,
    pub scores: RecordScores,
    /// The top-N slice before the selection floor was applied.
    pub considered: Vec<ScoredResponsibility>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RankingDecision {
    Excluded { reason: ExclusionReason },
    Included(Selection),
}

impl RankingDecision {
    pub fn is_included(&self) -> bool {
        matches!(self, RankingDecision::Included(_))
    }

    /// Surfaced responsibilities; empty for excluded records.
    pub fn responsibilities(&self) -> &[String] {
        match self {
            RankingDecision::Included(selection) => &selection.responsibilities,
            RankingDecision::Excluded { .. } => &[],
        }
    }

    pub fn scores(&self) -> Option<&RecordScores> {
        match self {
            RankingDecision::Included(selection) => Some(&selection.scores),
            RankingDecision::Excluded { .. } => None,
        }
    }

    pub fn exclusion_reason(&self) -> Option<ExclusionReason> {
        match self {
            RankingDecision::Excluded { reason } => Some(*reason),
            RankingDecision::Included(_) => None,
        }
    }
}

/// Scores rendered for logs and reports: fixed 3 decimal places.
pub fn format_score(score: f64) -> String {
    format!("{score:.3}")
}

fn serialize_score<S: Serializer>(score: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64((score * 1000.0).round() / 1000.0)
}

// ────────────────────────────────────────────────────────────────────────────
// Entry points
// ────────────────────────────────────────────────────────────────────────────

/// Ranks one employment record against a job posting.
///
/// Validation, the empty-record check and date parsing all happen before the
/// embedder is called. To rank several records against one posting use
/// `PreparedQuery` so the posting is encoded only once.
pub fn rank<E>(
    embedder: &E,
    posting: &JobPosting,
    record: &EmploymentRecord,
    params: &RankingParams,
) -> Result<RankingDecision, RankingError>
where
    E: TextEmbedder + ?Sized,
{
    params.validate()?;
    if record.responsibilities.is_empty() {
        return Ok(exclude_empty(record));
    }
    let (now_year, end_year) = resolve_years(record, params)?;
    let query = PreparedQuery::encode(embedder, posting)?;
    query.score_record(embedder, record, params, now_year, end_year)
}

/// A posting encoded once, reused for every record ranked against it.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedQuery {
    text: String,
    vector: Embedding,
}

impl PreparedQuery {
    pub fn encode<E>(embedder: &E, posting: &JobPosting) -> Result<Self, RankingError>
    where
        E: TextEmbedder + ?Sized,
    {
        let text = posting.query_text();
        let vector = embedder.embed(&text)?;
        Ok(Self { text, vector })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn vector(&self) -> &[f64] {
        &self.vector
    }

    pub fn rank<E>(
        &self,
        embedder: &E,
        record: &EmploymentRecord,
        params: &RankingParams,
    ) -> Result<RankingDecision, RankingError>
    where
        E: TextEmbedder + ?Sized,
    {
        params.validate()?;
        if record.responsibilities.is_empty() {
            return Ok(exclude_empty(record));
        }
        let (now_year, end_year) = resolve_years(record, params)?;
        self.score_record(embedder, record, params, now_year, end_year)
    }

    /// Ranks every record, one result per record in input order. A failure only
    /// aborts the record it belongs to. "Now" is pinned once for the whole run.
    pub fn rank_all<E>(
        &self,
        embedder: &E,
        records: &[EmploymentRecord],
        params: &RankingParams,
    ) -> Vec<Result<RankingDecision, RankingError>>
    where
        E: TextEmbedder + ?Sized,
    {
        let params = RankingParams {
            reference_year: Some(params.now_year()),
            ..params.clone()
        };
        records
            .iter()
            .map(|record| self.rank(embedder, record, &params))
            .collect()
    }

    fn score_record<E>(
        &self,
        embedder: &E,
        record: &EmploymentRecord,
        params: &RankingParams,
        now_year: i32,
        end_year: i32,
    ) -> Result<RankingDecision, RankingError>
    where
        E: TextEmbedder + ?Sized,
    {
        let responsibilities = &record.responsibilities;

        let candidates = responsibilities
            .iter()
            .map(|text| embedder.embed(text))
            .collect::<Result<Vec<_>, _>>()?;
        if let Some(vector) = candidates.iter().find(|v| v.len() != self.vector.len()) {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.vector.len(),
                actual: vector.len(),
            }
            .into());
        }

        let similarities = similarity_vector(&self.vector, &candidates);
        let scores = compute_scores(&similarities, now_year, end_year, params);
        let label = record.label();
        debug!(record = %label, "{scores}");

        if let Some(reason) = exclusion_reason(&scores, params) {
            info!(record = %label, reason = reason.describe(), "Excluding employment record");
            return Ok(RankingDecision::Excluded { reason });
        }

        let considered = top_n(responsibilities, &similarities, params.top_n);
        for scored in &considered {
            debug!("Score: {} for {}", format_score(scored.similarity), scored.text);
        }

        let floor = params.selection_floor();
        let selected = considered
            .iter()
            .filter(|scored| scored.similarity > floor)
            .map(|scored| scored.text.clone())
            .collect();

        Ok(RankingDecision::Included(Selection {
            responsibilities: selected,
            scores,
            considered,
        }))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Scoring helpers
// ────────────────────────────────────────────────────────────────────────────

fn exclude_empty(record: &EmploymentRecord) -> RankingDecision {
    let reason = ExclusionReason::NoResponsibilities;
    info!(record = %record.label(), reason = reason.describe(), "Excluding employment record");
    RankingDecision::Excluded { reason }
}

fn resolve_years(
    record: &EmploymentRecord,
    params: &RankingParams,
) -> Result<(i32, i32), RankingError> {
    let now_year = params.now_year();
    let end_year = recency::end_year(
        record.end_date.as_deref(),
        now_year,
        params.on_unparseable_date,
    )?;
    Ok((now_year, end_year))
}

/// `similarities` is never empty here.
fn compute_scores(
    similarities: &[f64],
    now_year: i32,
    end_year: i32,
    params: &RankingParams,
) -> RecordScores {
    let avg_relevance = similarities.iter().sum::<f64>() / similarities.len() as f64;
    let max_relevance = similarities
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    let years_since_job = recency::years_since(end_year, now_year);
    let recency = recency::decay(years_since_job, params.max_years_old);
    let weighted_score =
        params.recency_weight * recency + (1.0 - params.recency_weight) * avg_relevance;

    RecordScores {
        avg_relevance,
        max_relevance,
        recency,
        weighted_score,
        years_since_job,
    }
}

/// First matching rule wins. Staleness alone never excludes, nor does a low average alone.
fn exclusion_reason(scores: &RecordScores, params: &RankingParams) -> Option<ExclusionReason> {
    let nothing_stands_out = scores.max_relevance < MIN_MAX_RELEVANCE;
    if scores.years_since_job > params.max_years_old && nothing_stands_out {
        Some(ExclusionReason::StaleAndIrrelevant)
    } else if scores.avg_relevance < params.relevance_threshold && nothing_stands_out {
        Some(ExclusionReason::Irrelevant)
    } else {
        None
    }
}

/// Highest `n` distinct texts by similarity. Ties keep input order; repeats of a
/// text already taken are skipped.
fn top_n(texts: &[String], similarities: &[f64], n: usize) -> Vec<ScoredResponsibility> {
    let mut order: Vec<usize> = (0..similarities.len()).collect();
    order.sort_by(|&a, &b| {
        similarities[b]
            .partial_cmp(&similarities[a])
            .unwrap_or(Ordering::Equal)
    });
    let mut seen = HashSet::new();
    order
        .into_iter()
        .filter(|&i| seen.insert(texts[i].as_str()))
        .take(n)
        .map(|i| ScoredResponsibility {
            text: texts[i].clone(),
            similarity: similarities[i],
        })
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    use crate::ranking::params::UnparseableDatePolicy;

    const EPS: f64 = 1e-9;

    /// The posting encodes to [1, 0]; each responsibility sits at a fixed cosine from it.
    struct StubEmbedder {
        vectors: HashMap<String, Embedding>,
        calls: AtomicUsize,
    }

    impl StubEmbedder {
        fn new(scored: &[(&str, f64)]) -> Self {
            let vectors = scored
                .iter()
                .map(|(text, sim)| (text.to_string(), vec![*sim, (1.0 - sim * sim).sqrt()]))
                .collect();
            Self {
                vectors,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(AtomicOrdering::SeqCst)
        }
    }

    impl TextEmbedder for StubEmbedder {
        fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
            self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            Ok(self
                .vectors
                .get(text)
                .cloned()
                .unwrap_or_else(|| vec![1.0, 0.0]))
        }
    }

    struct FailingEmbedder;

    impl TextEmbedder for FailingEmbedder {
        fn embed(&self, _text: &str) -> Result<Embedding, EmbeddingError> {
            Err(EmbeddingError::Provider("model offline".to_string()))
        }
    }

    /// Posting in two dimensions, responsibilities in three.
    struct RaggedEmbedder;

    impl TextEmbedder for RaggedEmbedder {
        fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
            if text.contains('\n') {
                Ok(vec![1.0, 0.0])
            } else {
                Ok(vec![1.0, 0.0, 0.0])
            }
        }
    }

    fn posting() -> JobPosting {
        JobPosting {
            title: "Platform Engineer".to_string(),
            description: "Run the data platform".to_string(),
            requirements: "Rust, Postgres".to_string(),
            ..Default::default()
        }
    }

    fn record(end_date: Option<&str>, responsibilities: &[&str]) -> EmploymentRecord {
        EmploymentRecord {
            company: "Acme".to_string(),
            location: "Tacoma, WA".to_string(),
            title: "Engineer".to_string(),
            start_date: "Jan. 2001".to_string(),
            end_date: end_date.map(str::to_string),
            field: "software".to_string(),
            responsibilities: responsibilities.iter().map(|r| r.to_string()).collect(),
        }
    }

    fn params_2025() -> RankingParams {
        RankingParams {
            reference_year: Some(2025),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_responsibilities_excluded_without_embedding() {
        let embedder = StubEmbedder::new(&[]);
        let decision = rank(&embedder, &posting(), &record(Some("2010"), &[]), &params_2025())
            .unwrap();

        assert_eq!(
            decision.exclusion_reason(),
            Some(ExclusionReason::NoResponsibilities)
        );
        assert_eq!(embedder.calls(), 0);
    }

    #[test]
    fn test_current_highly_relevant_job_included() {
        let embedder = StubEmbedder::new(&[("Built Rust services", 0.9)]);
        let decision = rank(
            &embedder,
            &posting(),
            &record(Some("Current"), &["Built Rust services"]),
            &params_2025(),
        )
        .unwrap();

        let scores = decision.scores().expect("record should be included");
        assert_eq!(scores.recency, 1.0);
        assert!((scores.max_relevance - 0.9).abs() < EPS);
        assert!(
            (scores.weighted_score - 0.93).abs() < EPS,
            "WS was {}",
            scores.weighted_score
        );
        assert_eq!(decision.responsibilities(), ["Built Rust services"]);
    }

    #[test]
    fn test_old_irrelevant_job_excluded() {
        let embedder = StubEmbedder::new(&[("Stocked shelves", 0.1)]);
        let decision = rank(
            &embedder,
            &posting(),
            &record(Some("Jan. 2005"), &["Stocked shelves"]),
            &params_2025(),
        )
        .unwrap();

        assert_eq!(
            decision.exclusion_reason(),
            Some(ExclusionReason::StaleAndIrrelevant)
        );
    }

    #[test]
    fn test_old_but_relevant_job_included() {
        let embedder = StubEmbedder::new(&[("Tuned Postgres queries", 0.5)]);
        let decision = rank(
            &embedder,
            &posting(),
            &record(Some("Jan. 2005"), &["Tuned Postgres queries"]),
            &params_2025(),
        )
        .unwrap();

        let scores = decision.scores().expect("relevance should override staleness");
        assert_eq!(scores.years_since_job, 20);
        assert_eq!(scores.recency, 0.0);
        assert!((scores.weighted_score - 0.35).abs() < EPS);
        assert_eq!(decision.responsibilities(), ["Tuned Postgres queries"]);
    }

    #[test]
    fn test_empty_end_date_is_date_parse_error() {
        let embedder = StubEmbedder::new(&[("Built Rust services", 0.9)]);
        let result = rank(
            &embedder,
            &posting(),
            &record(Some(""), &["Built Rust services"]),
            &params_2025(),
        );

        assert_eq!(result, Err(RankingError::DateParse(String::new())));
        assert_eq!(embedder.calls(), 0, "date errors must fail before embedding");
    }

    #[test]
    fn test_empty_end_date_treated_as_current_under_legacy_policy() {
        let embedder = StubEmbedder::new(&[("Built Rust services", 0.9)]);
        let params = RankingParams {
            on_unparseable_date: UnparseableDatePolicy::TreatAsCurrent,
            ..params_2025()
        };
        let decision = rank(
            &embedder,
            &posting(),
            &record(Some(""), &["Built Rust services"]),
            &params,
        )
        .unwrap();

        assert_eq!(decision.scores().map(|s| s.recency), Some(1.0));
    }

    #[test]
    fn test_top_n_then_selection_floor() {
        let scored = [("a", 0.9), ("b", 0.2), ("c", 0.8), ("d", 0.05), ("e", 0.35)];
        let embedder = StubEmbedder::new(&scored);
        let params = RankingParams {
            top_n: 3,
            relevance_threshold: 0.3,
            ..params_2025()
        };
        let decision = rank(
            &embedder,
            &posting(),
            &record(Some("Present"), &["a", "b", "c", "d", "e"]),
            &params,
        )
        .unwrap();

        assert_eq!(decision.responsibilities(), ["a", "c", "e"]);
    }

    #[test]
    fn test_selection_floor_can_empty_the_selection() {
        // avg 0.35 < 0.5 but max 0.35 >= 0.3, so included; floor 0.4 removes it
        let embedder = StubEmbedder::new(&[("a", 0.35)]);
        let params = RankingParams {
            relevance_threshold: 0.5,
            ..params_2025()
        };
        let decision = rank(&embedder, &posting(), &record(None, &["a"]), &params).unwrap();

        assert!(decision.is_included());
        assert!(decision.responsibilities().is_empty());
        match decision {
            RankingDecision::Included(selection) => assert_eq!(selection.considered.len(), 1),
            RankingDecision::Excluded { .. } => unreachable!(),
        }
    }

    #[test]
    fn test_similarity_equal_to_floor_is_not_selected() {
        // [3, 4] against the posting's [1, 0] is exactly 0.6, and 0.7 - 0.1 == 0.6
        let mut embedder = StubEmbedder::new(&[("a", 0.9)]);
        embedder.vectors.insert("edge".to_string(), vec![3.0, 4.0]);
        let params = RankingParams {
            relevance_threshold: 0.7,
            ..params_2025()
        };
        assert_eq!(params.selection_floor(), 0.6);

        let decision = rank(&embedder, &posting(), &record(None, &["edge", "a"]), &params)
            .unwrap();

        assert_eq!(decision.responsibilities(), ["a"]);
        match decision {
            RankingDecision::Included(selection) => {
                assert_eq!(selection.considered[1].text, "edge");
                assert_eq!(selection.considered[1].similarity, 0.6);
            }
            RankingDecision::Excluded { .. } => unreachable!(),
        }
    }

    #[test]
    fn test_age_equal_to_limit_is_not_too_old() {
        let embedder = StubEmbedder::new(&[("a", 0.25), ("b", 0.25)]);
        let params = RankingParams {
            relevance_threshold: 0.2,
            ..params_2025()
        };

        let at_limit = rank(&embedder, &posting(), &record(Some("2015"), &["a", "b"]), &params)
            .unwrap();
        assert!(at_limit.is_included());
        assert_eq!(at_limit.scores().map(|s| s.years_since_job), Some(10));

        let past_limit = rank(&embedder, &posting(), &record(Some("2014"), &["a", "b"]), &params)
            .unwrap();
        assert_eq!(
            past_limit.exclusion_reason(),
            Some(ExclusionReason::StaleAndIrrelevant)
        );
    }

    #[test]
    fn test_recent_irrelevant_job_excluded() {
        let embedder = StubEmbedder::new(&[("a", 0.1), ("b", 0.2)]);
        let decision = rank(&embedder, &posting(), &record(None, &["a", "b"]), &params_2025())
            .unwrap();
        assert_eq!(decision.exclusion_reason(), Some(ExclusionReason::Irrelevant));
    }

    #[test]
    fn test_one_strong_responsibility_rescues_low_average() {
        let embedder = StubEmbedder::new(&[("a", 0.35), ("b", 0.0), ("c", 0.0)]);
        let decision = rank(&embedder, &posting(), &record(None, &["a", "b", "c"]), &params_2025())
            .unwrap();
        assert!(decision.is_included());
        assert_eq!(decision.responsibilities(), ["a"]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let embedder = StubEmbedder::new(&[("x", 0.5), ("y", 0.5), ("z", 0.5)]);
        let params = RankingParams {
            top_n: 2,
            ..params_2025()
        };
        let decision = rank(&embedder, &posting(), &record(None, &["x", "y", "z"]), &params)
            .unwrap();
        assert_eq!(decision.responsibilities(), ["x", "y"]);
    }

    #[test]
    fn test_output_is_bounded_distinct_subset() {
        let embedder = StubEmbedder::new(&[("a", 0.9), ("b", 0.7), ("c", 0.6), ("d", 0.5)]);
        let input = ["a", "a", "b", "c", "b", "d"];
        let params = RankingParams {
            top_n: 3,
            ..params_2025()
        };
        let decision = rank(&embedder, &posting(), &record(None, &input), &params).unwrap();
        let selected = decision.responsibilities();

        assert!(selected.len() <= params.top_n);
        assert!(selected.iter().all(|s| input.contains(&s.as_str())));
        let unique: HashSet<_> = selected.iter().collect();
        assert_eq!(unique.len(), selected.len());
        assert_eq!(selected, ["a", "b", "c"]);
        // every stored piece is scored, repeats included
        assert_eq!(embedder.calls(), 1 + input.len());
    }

    #[test]
    fn test_repeated_responsibilities_count_toward_average() {
        let embedder = StubEmbedder::new(&[("a", 0.25), ("b", 0.05)]);
        let params = RankingParams {
            relevance_threshold: 0.17,
            ..params_2025()
        };
        let decision = rank(&embedder, &posting(), &record(None, &["a", "a", "b"]), &params)
            .unwrap();

        // (0.25 + 0.25 + 0.05) / 3 clears 0.17; a de-duplicated mean of 0.15 would not
        let scores = decision.scores().expect("repeats should lift the average");
        assert!((scores.avg_relevance - 0.55 / 3.0).abs() < 1e-6);
        assert_eq!(decision.responsibilities(), ["a"]);
        match decision {
            RankingDecision::Included(selection) => {
                let texts: Vec<_> = selection.considered.iter().map(|s| s.text.as_str()).collect();
                assert_eq!(texts, ["a", "b"]);
            }
            RankingDecision::Excluded { .. } => unreachable!(),
        }
    }

    #[test]
    fn test_input_order_does_not_change_selection() {
        let scored = [("a", 0.9), ("b", 0.4), ("c", 0.8), ("d", 0.6)];
        let embedder = StubEmbedder::new(&scored);
        let params = RankingParams {
            top_n: 3,
            ..params_2025()
        };

        let forward = rank(&embedder, &posting(), &record(None, &["a", "b", "c", "d"]), &params)
            .unwrap();
        let shuffled = rank(&embedder, &posting(), &record(None, &["d", "b", "a", "c"]), &params)
            .unwrap();

        assert_eq!(forward.responsibilities(), shuffled.responsibilities());
        let (f, s) = (forward.scores().unwrap(), shuffled.scores().unwrap());
        assert!((f.avg_relevance - s.avg_relevance).abs() < EPS);
        assert!((f.max_relevance - s.max_relevance).abs() < EPS);
    }

    #[test]
    fn test_ranking_is_idempotent() {
        let embedder = StubEmbedder::new(&[("a", 0.9), ("b", 0.4)]);
        let r = record(Some("Aug. 2020"), &["a", "b"]);
        let first = rank(&embedder, &posting(), &r, &params_2025()).unwrap();
        let second = rank(&embedder, &posting(), &r, &params_2025()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_configuration_error_before_embedding() {
        let embedder = StubEmbedder::new(&[("a", 0.9)]);
        let params = RankingParams {
            top_n: 0,
            ..params_2025()
        };
        let result = rank(&embedder, &posting(), &record(None, &["a"]), &params);

        assert!(matches!(result, Err(RankingError::Configuration(_))));
        assert_eq!(embedder.calls(), 0);
    }

    #[test]
    fn test_embedder_failure_propagates() {
        let result = rank(&FailingEmbedder, &posting(), &record(None, &["a"]), &params_2025());
        assert_eq!(
            result,
            Err(RankingError::Embedding(EmbeddingError::Provider(
                "model offline".to_string()
            )))
        );
    }

    #[test]
    fn test_dimension_mismatch_is_embedding_error() {
        let result = rank(&RaggedEmbedder, &posting(), &record(None, &["a"]), &params_2025());
        assert_eq!(
            result,
            Err(RankingError::Embedding(EmbeddingError::DimensionMismatch {
                expected: 2,
                actual: 3
            }))
        );
    }

    #[test]
    fn test_prepared_query_encodes_posting_once() {
        let embedder = StubEmbedder::new(&[("a", 0.9), ("b", 0.8), ("c", 0.7)]);
        let query = PreparedQuery::encode(&embedder, &posting()).unwrap();
        let records = vec![record(None, &["a", "b"]), record(Some("2019"), &["c"])];

        let results = query.rank_all(&embedder, &records, &params_2025());

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.as_ref().is_ok_and(|d| d.is_included())));
        // 1 posting + 3 responsibilities
        assert_eq!(embedder.calls(), 4);
    }

    #[test]
    fn test_rank_all_isolates_failures() {
        let embedder = StubEmbedder::new(&[("a", 0.9), ("b", 0.8)]);
        let query = PreparedQuery::encode(&embedder, &posting()).unwrap();
        let records = vec![
            record(None, &["a"]),
            record(Some("someday"), &["b"]),
            record(None, &[]),
        ];

        let results = query.rank_all(&embedder, &records, &params_2025());

        assert!(results[0].as_ref().is_ok_and(|d| d.is_included()));
        assert_eq!(
            results[1],
            Err(RankingError::DateParse("someday".to_string()))
        );
        assert_eq!(
            results[2].as_ref().ok().and_then(|d| d.exclusion_reason()),
            Some(ExclusionReason::NoResponsibilities)
        );
    }

    #[test]
    fn test_concurrent_ranking_shares_embedder() {
        let embedder = StubEmbedder::new(&[("a", 0.9), ("b", 0.4), ("c", 0.6)]);
        let query = PreparedQuery::encode(&embedder, &posting()).unwrap();
        let r = record(Some("2022"), &["a", "b", "c"]);
        let expected = query.rank(&embedder, &r, &params_2025()).unwrap();

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| query.rank(&embedder, &r, &params_2025()).unwrap()))
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), expected);
            }
        });
    }

    #[test]
    fn test_decision_serializes_with_rounded_scores() {
        let embedder = StubEmbedder::new(&[("Built Rust services", 0.9)]);
        let decision = rank(
            &embedder,
            &posting(),
            &record(None, &["Built Rust services"]),
            &params_2025(),
        )
        .unwrap();

        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["status"], "included");
        assert_eq!(json["responsibilities"][0], "Built Rust services");
        assert_eq!(json["scores"]["weighted_score"], 0.93);
        assert_eq!(json["scores"]["recency"], 1.0);

        let excluded = RankingDecision::Excluded {
            reason: ExclusionReason::StaleAndIrrelevant,
        };
        let json = serde_json::to_value(&excluded).unwrap();
        assert_eq!(json["status"], "excluded");
        assert_eq!(json["reason"], "stale_and_irrelevant");
    }

    #[test]
    fn test_format_score_three_decimals() {
        assert_eq!(format_score(0.12345), "0.123");
        assert_eq!(format_score(1.0), "1.000");
    }
}
