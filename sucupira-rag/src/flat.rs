//! Exact brute-force vector index.
//!
//! [`FlatIndex`] keeps documents in insertion order behind a
//! `tokio::sync::RwLock` and scores every document on each query. At catalog
//! sizes (tens of thousands of journals) a linear scan is fast enough; larger
//! corpora can swap in an approximate [`VectorIndex`] implementation.

use std::path::Path;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::document::{Document, NewDocument, SearchResult};
use crate::embedding::ProviderIdentity;
use crate::error::{RagError, Result};
use crate::index::{Metric, VectorIndex};
use crate::snapshot::{self, FORMAT_VERSION, IndexSnapshot};

#[derive(Debug, Default)]
struct FlatInner {
    dimensions: Option<usize>,
    documents: Vec<Document>,
}

/// An in-memory exact index.
///
/// # Example
///
/// ```rust,ignore
/// use sucupira_rag::{FlatIndex, Metric, VectorIndex};
///
/// let index = FlatIndex::new(Metric::Cosine, provider.identity());
/// index.insert(batch).await?;
/// index.persist("catalog.json").await?;
/// let restored = FlatIndex::load("catalog.json").await?;
/// ```
#[derive(Debug)]
pub struct FlatIndex {
    metric: Metric,
    provider: ProviderIdentity,
    inner: RwLock<FlatInner>,
}

impl FlatIndex {
    /// Create an empty index for vectors produced by `provider`.
    pub fn new(metric: Metric, provider: ProviderIdentity) -> Self {
        Self { metric, provider, inner: RwLock::new(FlatInner::default()) }
    }

    /// Copy the whole index into a serializable snapshot.
    pub async fn snapshot(&self) -> IndexSnapshot {
        let inner = self.inner.read().await;
        IndexSnapshot {
            format_version: FORMAT_VERSION,
            metric: self.metric,
            dimensions: inner.dimensions,
            provider: self.provider.clone(),
            documents: inner.documents.clone(),
        }
    }

    /// Rebuild an index from a snapshot. The snapshot is trusted as-is.
    pub fn from_snapshot(snapshot: IndexSnapshot) -> Self {
        Self {
            metric: snapshot.metric,
            provider: snapshot.provider,
            inner: RwLock::new(FlatInner {
                dimensions: snapshot.dimensions,
                documents: snapshot.documents,
            }),
        }
    }

    /// Write the index to `path` as a JSON snapshot.
    pub async fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        let snapshot = self.snapshot().await;
        snapshot::write(path.as_ref(), &snapshot).await
    }

    /// Load an index previously written by [`persist`](Self::persist).
    ///
    /// # Errors
    ///
    /// [`RagError::NotFound`] if `path` does not exist,
    /// [`RagError::CorruptIndex`] if it cannot be decoded.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let snapshot = snapshot::read(path.as_ref()).await?;
        Ok(Self::from_snapshot(snapshot))
    }

    /// All documents in insertion order.
    pub async fn documents(&self) -> Vec<Document> {
        self.inner.read().await.documents.clone()
    }
}

fn check_finite(vector: &[f32], what: &str) -> Result<()> {
    if vector.is_empty() {
        return Err(RagError::InvalidArgument(format!("{what} must not be empty")));
    }
    if vector.iter().any(|x| !x.is_finite()) {
        return Err(RagError::InvalidArgument(format!("{what} contains non-finite values")));
    }
    Ok(())
}

#[async_trait]
impl VectorIndex for FlatIndex {
    async fn insert(&self, batch: Vec<NewDocument>) -> Result<Vec<String>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let mut inner = self.inner.write().await;
        let expected = inner.dimensions.unwrap_or(self.provider.dimensions);
        for item in &batch {
            check_finite(&item.embedding, "embedding")?;
            if item.embedding.len() != expected {
                return Err(RagError::DimensionMismatch { expected, actual: item.embedding.len() });
            }
        }

        let mut ids = Vec::with_capacity(batch.len());
        inner.documents.reserve(batch.len());
        for item in batch {
            let id = Uuid::new_v4().to_string();
            ids.push(id.clone());
            inner.documents.push(Document::new(id, item));
        }
        inner.dimensions = Some(expected);
        debug!(inserted = ids.len(), total = inner.documents.len(), "batch inserted");
        Ok(ids)
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Err(RagError::InvalidArgument("k must be at least 1".to_string()));
        }
        check_finite(vector, "query vector")?;

        let inner = self.inner.read().await;
        if let Some(expected) = inner.dimensions {
            if vector.len() != expected {
                return Err(RagError::DimensionMismatch { expected, actual: vector.len() });
            }
        }

        let mut scored: Vec<(usize, f32)> = inner
            .documents
            .iter()
            .enumerate()
            .map(|(position, document)| (position, self.metric.score(vector, document.embedding())))
            .collect();

        // Stable sort: equal scores stay in insertion order.
        scored.sort_by(|a, b| self.metric.best_first(a.1, b.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(position, score)| SearchResult {
                document: inner.documents[position].clone(),
                score,
            })
            .collect())
    }

    async fn len(&self) -> usize {
        self.inner.read().await.documents.len()
    }

    async fn dimensions(&self) -> Option<usize> {
        self.inner.read().await.dimensions
    }

    fn metric(&self) -> Metric {
        self.metric
    }

    fn provider(&self) -> &ProviderIdentity {
        &self.provider
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Metadata;

    fn identity(dims: usize) -> ProviderIdentity {
        ProviderIdentity::new("test", "unit", dims)
    }

    fn doc(text: &str, embedding: Vec<f32>) -> NewDocument {
        NewDocument::new(text, Metadata::new().with("Title", text), embedding)
    }

    #[tokio::test]
    async fn mismatched_batch_inserts_nothing() {
        let index = FlatIndex::new(Metric::Cosine, identity(2));
        index.insert(vec![doc("a", vec![1.0, 0.0])]).await.unwrap();

        let err = index
            .insert(vec![doc("b", vec![0.0, 1.0]), doc("c", vec![1.0, 0.0, 0.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { expected: 2, actual: 3 }));
        assert_eq!(index.len().await, 1);
    }

    #[tokio::test]
    async fn first_insert_must_match_provider_dimensions() {
        let index = FlatIndex::new(Metric::Cosine, identity(3));
        let err = index.insert(vec![doc("a", vec![1.0, 0.0])]).await.unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { expected: 3, actual: 2 }));
        assert_eq!(index.dimensions().await, None);
    }

    #[tokio::test]
    async fn zero_k_is_invalid() {
        let index = FlatIndex::new(Metric::Cosine, identity(2));
        let err = index.query(&[1.0, 0.0], 0).await.unwrap_err();
        assert!(matches!(err, RagError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn empty_index_returns_no_results() {
        let index = FlatIndex::new(Metric::Cosine, identity(2));
        assert!(index.query(&[1.0, 0.0], 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn ties_keep_insertion_order() {
        let index = FlatIndex::new(Metric::Cosine, identity(2));
        index
            .insert(vec![
                doc("first", vec![1.0, 0.0]),
                doc("other", vec![0.0, 1.0]),
                doc("second", vec![2.0, 0.0]),
            ])
            .await
            .unwrap();

        let results = index.query(&[1.0, 0.0], 3).await.unwrap();
        let texts: Vec<&str> = results.iter().map(|r| r.document.text()).collect();
        assert_eq!(texts, ["first", "second", "other"]);
    }

    #[tokio::test]
    async fn euclidean_ranks_nearest_first() {
        let index = FlatIndex::new(Metric::Euclidean, identity(2));
        index
            .insert(vec![doc("far", vec![10.0, 10.0]), doc("near", vec![1.0, 1.0])])
            .await
            .unwrap();
        let results = index.query(&[0.0, 0.0], 1).await.unwrap();
        assert_eq!(results[0].document.text(), "near");
        assert!(!index.metric().higher_is_closer());
    }

    #[tokio::test]
    async fn rejects_non_finite_embeddings() {
        let index = FlatIndex::new(Metric::Cosine, identity(2));
        let err = index.insert(vec![doc("nan", vec![f32::NAN, 0.0])]).await.unwrap_err();
        assert!(matches!(err, RagError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn query_dimension_is_checked() {
        let index = FlatIndex::new(Metric::Cosine, identity(2));
        index.insert(vec![doc("a", vec![1.0, 0.0])]).await.unwrap();
        let err = index.query(&[1.0, 0.0, 0.0], 1).await.unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { .. }));
    }
}
