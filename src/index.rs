//! In-memory knowledge index and top-k retrieval.
//!
//! A [`KnowledgeIndex`] is a flat nearest-neighbor structure: one entry per
//! text unit, holding the unit's source text, position, and embedding
//! vector. Built once at ingestion time, immutable afterwards, and owned
//! exclusively by the [`crate::registry::IndexRegistry`].
//!
//! Retrieval is brute-force cosine similarity over all entries, sorted
//! descending with ties broken by position so that identical inputs always
//! produce identical rankings.

use crate::config::EmbeddingConfig;
use crate::embedding::{self, EmbeddingProvider};
use crate::error::{CoreError, CoreResult};
use crate::models::TextUnit;

/// One indexed text unit: source text, position, and embedding.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub position: usize,
    pub text: String,
    pub vector: Vec<f32>,
}

/// Similarity-searchable index over one organization's text units.
#[derive(Debug)]
pub struct KnowledgeIndex {
    dims: usize,
    entries: Vec<IndexEntry>,
}

impl KnowledgeIndex {
    /// Assemble an index from units and their pre-computed embeddings.
    ///
    /// All-or-nothing: any count mismatch, wrong dimensionality, or
    /// non-finite component fails the whole build with
    /// [`CoreError::EmbeddingFailure`], and no index exists.
    pub fn from_embedded(units: &[TextUnit], vectors: Vec<Vec<f32>>) -> CoreResult<Self> {
        if vectors.len() != units.len() {
            return Err(CoreError::EmbeddingFailure(format!(
                "embedded {} of {} text units",
                vectors.len(),
                units.len()
            )));
        }

        let dims = vectors.first().map(|v| v.len()).unwrap_or(0);
        if dims == 0 {
            return Err(CoreError::EmbeddingFailure(
                "cannot build an index from zero-dimension vectors".to_string(),
            ));
        }

        let mut entries = Vec::with_capacity(units.len());
        for (unit, vector) in units.iter().zip(vectors) {
            if vector.len() != dims {
                return Err(CoreError::EmbeddingFailure(format!(
                    "unit {} has {} dimensions, expected {}",
                    unit.position,
                    vector.len(),
                    dims
                )));
            }
            if vector.iter().any(|v| !v.is_finite()) {
                return Err(CoreError::EmbeddingFailure(format!(
                    "unit {} embedding contains non-finite components",
                    unit.position
                )));
            }
            entries.push(IndexEntry {
                position: unit.position,
                text: unit.text.clone(),
                vector,
            });
        }

        Ok(Self { dims, entries })
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rank all entries by cosine similarity to the query vector and return
    /// the `k` most similar, best first. Ties break by ascending position.
    pub fn top_k(&self, query_vec: &[f32], k: usize) -> Vec<(&IndexEntry, f32)> {
        let mut scored: Vec<(&IndexEntry, f32)> = self
            .entries
            .iter()
            .map(|entry| (entry, cosine_similarity(query_vec, &entry.vector)))
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.position.cmp(&b.0.position))
        });
        scored.truncate(k);
        scored
    }
}

/// Embed all text units and build the organization's index.
///
/// One batched provider call; on any failure nothing is built or
/// registered, and the ingestion request fails entirely.
pub async fn build_index(
    provider: &dyn EmbeddingProvider,
    config: &EmbeddingConfig,
    units: &[TextUnit],
) -> CoreResult<KnowledgeIndex> {
    let texts: Vec<String> = units.iter().map(|u| u.text.clone()).collect();
    let vectors = embedding::embed_texts(provider, config, &texts).await?;
    KnowledgeIndex::from_embedded(units, vectors)
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`; `0.0` for empty vectors or vectors of
/// different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(position: usize, text: &str) -> TextUnit {
        TextUnit {
            org_id: "org1".to_string(),
            position,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_opposite() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_empty_and_mismatched() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
    }

    #[test]
    fn build_rejects_count_mismatch() {
        let units = vec![unit(0, "a"), unit(1, "b")];
        let err = KnowledgeIndex::from_embedded(&units, vec![vec![1.0, 0.0]]).unwrap_err();
        assert!(matches!(err, CoreError::EmbeddingFailure(_)));
    }

    #[test]
    fn build_rejects_mixed_dims() {
        let units = vec![unit(0, "a"), unit(1, "b")];
        let err = KnowledgeIndex::from_embedded(&units, vec![vec![1.0, 0.0], vec![1.0]])
            .unwrap_err();
        assert!(matches!(err, CoreError::EmbeddingFailure(_)));
    }

    #[test]
    fn build_rejects_non_finite() {
        let units = vec![unit(0, "a")];
        let err =
            KnowledgeIndex::from_embedded(&units, vec![vec![f32::INFINITY, 0.0]]).unwrap_err();
        assert!(matches!(err, CoreError::EmbeddingFailure(_)));
    }

    #[test]
    fn top_k_ranks_by_similarity() {
        let units = vec![unit(0, "north"), unit(1, "east"), unit(2, "northeast")];
        let vectors = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.7, 0.7]];
        let index = KnowledgeIndex::from_embedded(&units, vectors).unwrap();

        let hits = index.top_k(&[1.0, 0.0], 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0.text, "north");
        assert_eq!(hits[1].0.text, "northeast");
        assert!(hits[0].1 > hits[1].1);
    }

    #[test]
    fn top_k_is_deterministic() {
        let units = vec![unit(0, "a"), unit(1, "b"), unit(2, "c"), unit(3, "d")];
        let vectors = vec![
            vec![1.0, 0.0],
            vec![0.9, 0.1],
            vec![0.0, 1.0],
            vec![0.5, 0.5],
        ];
        let index = KnowledgeIndex::from_embedded(&units, vectors).unwrap();

        let first: Vec<usize> = index.top_k(&[1.0, 0.2], 3).iter().map(|(e, _)| e.position).collect();
        for _ in 0..10 {
            let again: Vec<usize> =
                index.top_k(&[1.0, 0.2], 3).iter().map(|(e, _)| e.position).collect();
            assert_eq!(first, again);
        }
    }

    #[test]
    fn top_k_breaks_ties_by_position() {
        // Two entries with identical vectors: earlier position wins.
        let units = vec![unit(0, "first"), unit(1, "second")];
        let vectors = vec![vec![1.0, 0.0], vec![1.0, 0.0]];
        let index = KnowledgeIndex::from_embedded(&units, vectors).unwrap();

        let hits = index.top_k(&[1.0, 0.0], 2);
        assert_eq!(hits[0].0.position, 0);
        assert_eq!(hits[1].0.position, 1);
    }

    #[test]
    fn top_k_larger_than_index_returns_all() {
        let units = vec![unit(0, "only")];
        let index = KnowledgeIndex::from_embedded(&units, vec![vec![1.0, 0.0]]).unwrap();
        assert_eq!(index.top_k(&[0.0, 1.0], 10).len(), 1);
    }
}
