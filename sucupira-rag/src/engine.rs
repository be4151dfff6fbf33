//! Retrieval engine: build an index from catalog rows, then search it.
//!
//! [`build_index`] turns rows into documents (concatenate text fields →
//! embed in batches → insert one batch) and [`search`] runs a query against
//! an index with the provider it was built with. [`RetrievalEngine`] bundles
//! one provider with the current index so tools can share it.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sucupira_rag::{EngineConfig, HashingEmbeddingProvider, RetrievalEngine};
//!
//! let engine = RetrievalEngine::new(EngineConfig::default(), Arc::new(HashingEmbeddingProvider::default()));
//! let report = engine.rebuild(&rows).await?;
//! engine.persist("sucupira_index.json").await?;
//! let results = engine.search("cursos de medicina", 3).await?;
//! ```

use std::path::Path;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::document::{Metadata, MetadataValue, NewDocument, Record, SearchHit, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::flat::FlatIndex;
use crate::index::VectorIndex;

/// Outcome of an ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Documents inserted into the index.
    pub indexed: usize,
    /// Rows skipped because a text field was null or blank.
    pub dropped: usize,
    /// Zero-based positions of the dropped rows.
    pub dropped_rows: Vec<usize>,
}

struct PreparedRow {
    text: String,
    metadata: Metadata,
}

/// Validate every row and assemble its text and metadata.
fn prepare_rows(config: &EngineConfig, rows: &[Record]) -> Result<(Vec<PreparedRow>, Vec<usize>)> {
    let mut prepared = Vec::with_capacity(rows.len());
    let mut dropped = Vec::new();

    for (position, row) in rows.iter().enumerate() {
        let mut parts = Vec::with_capacity(config.text_fields.len());
        for field in &config.text_fields {
            let value = row
                .get(field)
                .ok_or_else(|| RagError::MissingField { row: position, field: field.clone() })?;
            parts.push(value.map(str::trim).filter(|v| !v.is_empty()));
        }
        // A null or blank text field leaves nothing meaningful to embed for the row.
        let Some(parts) = parts.into_iter().collect::<Option<Vec<&str>>>() else {
            dropped.push(position);
            continue;
        };
        let text = parts.join(&config.separator);

        let metadata = config
            .metadata_fields
            .iter()
            .map(|field| (field.clone(), MetadataValue::from(row.get(field).flatten())))
            .collect();
        prepared.push(PreparedRow { text, metadata });
    }

    Ok((prepared, dropped))
}

async fn embed_with_timeout(
    config: &EngineConfig,
    embedder: &dyn EmbeddingProvider,
    texts: &[&str],
) -> Result<Vec<Vec<f32>>> {
    let service = embedder.identity().name;
    let embeddings = tokio::time::timeout(config.embed_timeout, embedder.embed_batch(texts))
        .await
        .map_err(|_| {
            error!(provider = %service, timeout = ?config.embed_timeout, "embedding call timed out");
            RagError::external(&service, format!("timed out after {:?}", config.embed_timeout))
        })??;
    if embeddings.len() != texts.len() {
        return Err(RagError::external(
            service,
            format!("returned {} embeddings for {} texts", embeddings.len(), texts.len()),
        ));
    }
    Ok(embeddings)
}

/// Build a fresh index from `rows`.
///
/// Every row is validated before any embedding call is made.
///
/// # Errors
///
/// - [`RagError::ConfigError`] if `config` does not pass
///   [`EngineConfig::validate`].
/// - [`RagError::MissingField`] if a row lacks a configured text field.
/// - [`RagError::ExternalCallFailure`] if the provider fails, times out, or
///   returns the wrong number of vectors.
/// - [`RagError::DimensionMismatch`] if the provider returns vectors of
///   inconsistent length.
pub async fn build_index(
    config: &EngineConfig,
    rows: &[Record],
    embedder: &dyn EmbeddingProvider,
) -> Result<(FlatIndex, BuildReport)> {
    config.validate()?;
    let (prepared, dropped_rows) = prepare_rows(config, rows).inspect_err(|e| {
        error!(error = %e, "ingestion rejected");
    })?;
    for position in &dropped_rows {
        warn!(row = position, "dropping row with null or blank text field");
    }

    let mut batch = Vec::with_capacity(prepared.len());
    for chunk in prepared.chunks(config.embed_batch_size) {
        let texts: Vec<&str> = chunk.iter().map(|row| row.text.as_str()).collect();
        let embeddings = embed_with_timeout(config, embedder, &texts).await?;
        debug!(batch_size = texts.len(), "embedded ingestion batch");
        batch.extend(
            chunk
                .iter()
                .zip(embeddings)
                .map(|(row, embedding)| NewDocument::new(&row.text, row.metadata.clone(), embedding)),
        );
    }

    let index = FlatIndex::new(config.metric, embedder.identity());
    let indexed = index.insert(batch).await?.len();
    let report = BuildReport { indexed, dropped: dropped_rows.len(), dropped_rows };
    info!(
        indexed = report.indexed,
        dropped = report.dropped,
        provider = %index.provider(),
        "index built"
    );
    Ok((index, report))
}

/// Embed `query` and return the `k` closest documents in `index`.
///
/// The query is embedded as-is; an empty string is allowed. `k` larger than
/// the index returns every document.
///
/// # Errors
///
/// - [`RagError::ProviderMismatch`] if `embedder` is not the provider the
///   index was built with.
/// - [`RagError::InvalidArgument`] if `k == 0`.
/// - [`RagError::ExternalCallFailure`] if embedding fails or times out.
pub async fn search(
    config: &EngineConfig,
    index: &dyn VectorIndex,
    embedder: &dyn EmbeddingProvider,
    query: &str,
    k: usize,
) -> Result<Vec<SearchResult>> {
    let query_identity = embedder.identity();
    if &query_identity != index.provider() {
        error!(index = %index.provider(), query = %query_identity, "provider mismatch");
        return Err(RagError::ProviderMismatch {
            index: index.provider().clone(),
            query: query_identity,
        });
    }
    if k == 0 {
        return Err(RagError::InvalidArgument("k must be at least 1".to_string()));
    }

    let mut embeddings = embed_with_timeout(config, embedder, &[query]).await?;
    let query_embedding = embeddings.pop().unwrap_or_default();
    let results = index.query(&query_embedding, k).await?;
    info!(k, result_count = results.len(), "search completed");
    Ok(results)
}

/// A long-lived handle pairing one embedding provider with the current index.
///
/// The index is replaced wholesale by [`rebuild`](Self::rebuild): the new
/// index is built off to the side and swapped in, so searches never see a
/// partially built index. Searches already running keep the index they
/// started with.
pub struct RetrievalEngine {
    config: EngineConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    index: RwLock<Arc<FlatIndex>>,
}

impl RetrievalEngine {
    /// Create an engine with an empty index.
    pub fn new(config: EngineConfig, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        let index = FlatIndex::new(config.metric, embedder.identity());
        Self { config, embedder, index: RwLock::new(Arc::new(index)) }
    }

    /// Create an engine around an existing index.
    pub fn with_index(config: EngineConfig, embedder: Arc<dyn EmbeddingProvider>, index: FlatIndex) -> Self {
        Self { config, embedder, index: RwLock::new(Arc::new(index)) }
    }

    /// Load a persisted index and check it against `embedder`.
    ///
    /// # Errors
    ///
    /// `NotFound` / `CorruptIndex` from loading, or
    /// [`RagError::ProviderMismatch`] if the snapshot was built with another
    /// provider.
    pub async fn open(
        config: EngineConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        path: impl AsRef<Path>,
    ) -> Result<Self> {
        let index = FlatIndex::load(path.as_ref()).await?;
        let identity = embedder.identity();
        if &identity != index.provider() {
            return Err(RagError::ProviderMismatch { index: index.provider().clone(), query: identity });
        }
        info!(
            path = %path.as_ref().display(),
            documents = index.len().await,
            "retrieval engine opened"
        );
        Ok(Self::with_index(config, embedder, index))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// The index currently served.
    pub async fn index(&self) -> Arc<FlatIndex> {
        Arc::clone(&*self.index.read().await)
    }

    /// Build a new index from `rows` and swap it in.
    ///
    /// On failure the current index is left untouched.
    pub async fn rebuild(&self, rows: &[Record]) -> Result<BuildReport> {
        let (index, report) = build_index(&self.config, rows, self.embedder.as_ref()).await?;
        *self.index.write().await = Arc::new(index);
        Ok(report)
    }

    /// Search the current index.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        let index = self.index().await;
        search(&self.config, index.as_ref(), self.embedder.as_ref(), query, k).await
    }

    /// Search with the configured `default_top_k`.
    pub async fn search_default(&self, query: &str) -> Result<Vec<SearchResult>> {
        self.config.validate()?;
        self.search(query, self.config.default_top_k).await
    }

    /// Search and return `(metadata, snippet, score)` hits.
    pub async fn hits(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        let results = self.search(query, k).await?;
        Ok(results
            .into_iter()
            .map(|result| SearchHit {
                snippet: result.snippet(self.config.snippet_chars),
                metadata: result.document.metadata().clone(),
                score: result.score,
            })
            .collect())
    }

    /// Persist the current index.
    pub async fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        self.index().await.persist(path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::HashingEmbeddingProvider;

    fn row(title: &str, area: &str) -> Record {
        Record::new().with("Título", title).with("Área de Avaliação", area)
    }

    #[test]
    fn text_fields_are_joined_in_configured_order() {
        let config = EngineConfig::default();
        let (prepared, dropped) = prepare_rows(&config, &[row("Arts Quarterly", "Humanities")]).unwrap();
        assert!(dropped.is_empty());
        assert_eq!(prepared[0].text, "Arts Quarterly Humanities");
    }

    #[test]
    fn absent_metadata_becomes_missing() {
        let config = EngineConfig::default();
        let (prepared, _) = prepare_rows(&config, &[row("Arts Quarterly", "Humanities")]).unwrap();
        assert_eq!(prepared[0].metadata.get("ISSN"), Some(&MetadataValue::Missing));
        assert_eq!(prepared[0].metadata.len(), 4);
    }

    #[test]
    fn null_or_blank_text_field_drops_the_row() {
        let config = EngineConfig::default();
        let rows = [
            Record::new().with("Título", "Medical Review").with_null("Área de Avaliação"),
            row("Arts Quarterly", "Humanities"),
            row("Blank Area Review", "   "),
        ];
        let (prepared, dropped) = prepare_rows(&config, &rows).unwrap();
        assert_eq!(dropped, [0, 2]);
        assert_eq!(prepared.len(), 1);
        assert_eq!(prepared[0].text, "Arts Quarterly Humanities");
    }

    #[tokio::test]
    async fn zero_batch_size_is_a_config_error() {
        let mut json = serde_json::to_value(EngineConfig::default()).unwrap();
        json["embed_batch_size"] = 0.into();
        let config: EngineConfig = serde_json::from_value(json).unwrap();
        let embedder = HashingEmbeddingProvider::default();

        let err = build_index(&config, &[row("Medical Review", "Medicine")], &embedder).await.unwrap_err();
        assert!(matches!(err, RagError::ConfigError(_)), "{err}");
    }

    #[tokio::test]
    async fn zero_default_top_k_is_a_config_error() {
        let config = EngineConfig { default_top_k: 0, ..EngineConfig::default() };
        let engine = RetrievalEngine::new(config, Arc::new(HashingEmbeddingProvider::default()));
        assert!(matches!(engine.search_default("medicine").await, Err(RagError::ConfigError(_))));
    }

    #[tokio::test]
    async fn rebuild_swaps_the_served_index() {
        let engine = RetrievalEngine::new(
            EngineConfig::default(),
            Arc::new(HashingEmbeddingProvider::default()),
        );
        let before = engine.index().await;
        let report = engine.rebuild(&[row("Medical Review", "Medicine")]).await.unwrap();

        assert_eq!(report.indexed, 1);
        assert!(before.is_empty().await);
        assert_eq!(engine.index().await.len().await, 1);
    }

    #[tokio::test]
    async fn failed_rebuild_keeps_current_index() {
        let engine = RetrievalEngine::new(
            EngineConfig::default(),
            Arc::new(HashingEmbeddingProvider::default()),
        );
        engine.rebuild(&[row("Medical Review", "Medicine")]).await.unwrap();

        let bad = [Record::new().with("Título", "No area")];
        assert!(engine.rebuild(&bad).await.is_err());
        assert_eq!(engine.index().await.len().await, 1);
    }
}
