//! # sucupira-rag
//!
//! Retrieval over the CAPES Sucupira journal catalog.
//!
//! ## Overview
//!
//! - [`EmbeddingProvider`]: text → vector, with a [`ProviderIdentity`]
//!   recorded in every index.
//! - [`VectorIndex`] / [`FlatIndex`]: batch insertion and k-nearest-neighbor
//!   queries under a fixed [`Metric`], with JSON snapshots.
//! - [`build_index`] / [`search`] / [`RetrievalEngine`]: ingestion of
//!   catalog rows and query-time search.
//! - [`JournalSearchTool`]: the engine exposed as an agent tool.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sucupira_rag::{EngineConfig, HashingEmbeddingProvider, Record, RetrievalEngine};
//!
//! let engine = RetrievalEngine::new(
//!     EngineConfig::default(),
//!     Arc::new(HashingEmbeddingProvider::default()),
//! );
//! let rows = vec![
//!     Record::new()
//!         .with("Título", "Revista de Saúde Pública")
//!         .with("Área de Avaliação", "Medicina I")
//!         .with("ISSN", "0034-8910")
//!         .with("Estrato", "A2"),
//! ];
//! let report = engine.rebuild(&rows).await?;
//! let hits = engine.hits("medicina", 3).await?;
//! ```
//!
//! ## Features
//!
//! - `openai`: [`openai::OpenAiCompatibleEmbeddingProvider`] over HTTP.

pub mod config;
pub mod document;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod flat;
pub mod hashing;
pub mod index;
pub mod snapshot;
pub mod tool;

#[cfg(feature = "openai")]
pub mod openai;

pub use config::{EngineConfig, EngineConfigBuilder};
pub use document::{Document, MISSING, Metadata, MetadataValue, NewDocument, Record, SearchHit, SearchResult};
pub use embedding::{EmbeddingProvider, ProviderIdentity};
pub use engine::{BuildReport, RetrievalEngine, build_index, search};
pub use error::{RagError, Result};
pub use flat::FlatIndex;
pub use hashing::HashingEmbeddingProvider;
pub use index::{Metric, VectorIndex};
pub use snapshot::IndexSnapshot;
pub use tool::JournalSearchTool;

#[cfg(feature = "openai")]
pub use openai::OpenAiCompatibleEmbeddingProvider;
