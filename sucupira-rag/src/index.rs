//! Vector index trait and similarity metrics.

use std::cmp::Ordering;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::{NewDocument, SearchResult};
use crate::embedding::ProviderIdentity;
use crate::error::Result;

/// The fixed scoring convention of an index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Cosine similarity in `[-1, 1]`; higher is closer.
    #[default]
    Cosine,
    /// Euclidean (L2) distance; lower is closer.
    Euclidean,
}

impl Metric {
    /// Score `candidate` against `query`.
    pub fn score(self, query: &[f32], candidate: &[f32]) -> f32 {
        match self {
            Metric::Cosine => cosine_similarity(query, candidate),
            Metric::Euclidean => query
                .iter()
                .zip(candidate)
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f32>()
                .sqrt(),
        }
    }

    pub fn higher_is_closer(self) -> bool {
        matches!(self, Metric::Cosine)
    }

    /// Order two scores best-first.
    pub fn best_first(self, a: f32, b: f32) -> Ordering {
        match self {
            Metric::Cosine => b.total_cmp(&a),
            Metric::Euclidean => a.total_cmp(&b),
        }
    }

    /// Human-readable label of the score, e.g. for tool output.
    pub fn label(self) -> &'static str {
        match self {
            Metric::Cosine => "cosine similarity (higher is closer)",
            Metric::Euclidean => "L2 distance (lower is closer)",
        }
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// A similarity-searchable collection of documents.
///
/// The first insertion fixes the dimensionality. Batches are applied
/// atomically: a concurrent query sees either none or all of a batch.
/// Implementations may be exact or approximate.
///
/// # Example
///
/// ```rust,ignore
/// use sucupira_rag::{FlatIndex, Metric, NewDocument, VectorIndex};
///
/// let index = FlatIndex::new(Metric::Cosine, provider.identity());
/// index.insert(vec![NewDocument::new(text, metadata, embedding)]).await?;
/// let results = index.query(&query_embedding, 5).await?;
/// ```
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Append a batch, returning the ids assigned to its documents.
    ///
    /// Fails with `DimensionMismatch` without inserting anything if any
    /// embedding disagrees with the index dimensionality.
    async fn insert(&self, batch: Vec<NewDocument>) -> Result<Vec<String>>;

    /// Return the `min(k, len)` best documents for `vector`, best first.
    /// Equal scores keep insertion order. `k == 0` is `InvalidArgument`.
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<SearchResult>>;

    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// The established dimensionality, `None` while empty.
    async fn dimensions(&self) -> Option<usize>;

    fn metric(&self) -> Metric;

    /// The embedding provider whose vectors this index holds.
    fn provider(&self) -> &ProviderIdentity;
}
