//! Error types for the `sucupira-rag` crate.

use std::path::PathBuf;

use thiserror::Error;

use crate::embedding::ProviderIdentity;

/// Errors that can occur while building, persisting, or querying an index.
#[derive(Debug, Error)]
pub enum RagError {
    /// An embedding's length disagrees with the index dimensionality.
    #[error("Dimension mismatch: index holds {expected}-dimensional vectors, got {actual}")]
    DimensionMismatch {
        /// The dimensionality established by the first insertion.
        expected: usize,
        /// The offending vector's length.
        actual: usize,
    },

    /// A caller supplied an invalid argument (bad `k`, empty vector, ...).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A snapshot or other resource does not exist.
    #[error("Index snapshot not found at {}", path.display())]
    NotFound {
        /// The location that was looked up.
        path: PathBuf,
    },

    /// A snapshot exists but cannot be turned back into an index.
    #[error("Corrupt index snapshot at {}: {message}", path.display())]
    CorruptIndex {
        /// The snapshot location.
        path: PathBuf,
        /// What was wrong with it.
        message: String,
    },

    /// An ingestion row lacks a designated text field.
    #[error("Row {row} is missing text field '{field}'")]
    MissingField {
        /// Zero-based position of the row in the source.
        row: usize,
        /// The absent field name.
        field: String,
    },

    /// The query-time embedding provider is not the one the index was built with.
    #[error("Embedding provider mismatch: index was built with {index}, query uses {query}")]
    ProviderMismatch {
        /// Identity recorded in the index.
        index: ProviderIdentity,
        /// Identity of the provider used for the query.
        query: ProviderIdentity,
    },

    /// A call to an external service (embedding backend) failed or timed out.
    #[error("External call to {service} failed: {message}")]
    ExternalCallFailure {
        /// The service that was being called.
        service: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Filesystem failure while writing a snapshot.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RagError {
    pub(crate) fn external(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalCallFailure { service: service.into(), message: message.into() }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::CorruptIndex { path: path.into(), message: message.into() }
    }
}

/// A convenience result type for retrieval operations.
pub type Result<T> = std::result::Result<T, RagError>;
