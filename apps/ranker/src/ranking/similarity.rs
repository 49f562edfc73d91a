//! Cosine similarity between a query vector and candidate vectors. No knowledge of text.

/// `dot(a, b) / (|a| * |b|)`. Zero-norm vectors score 0 against anything.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() {
        tracing::warn!(
            a_len = a.len(),
            b_len = b.len(),
            "embedding dimension mismatch; returning zero similarity"
        );
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// One similarity per candidate, same length and order as `candidates`.
pub fn similarity_vector<V: AsRef<[f64]>>(query: &[f64], candidates: &[V]) -> Vec<f64> {
    candidates
        .iter()
        .map(|candidate| cosine_similarity(query, candidate.as_ref()))
        .collect()
}
