//! Durable whole-index snapshots.
//!
//! A snapshot is a single JSON document holding every [`Document`] with its
//! embedding, the index metric, and the identity of the embedding provider.
//! Writes go to a temporary sibling file that is renamed over the target, so
//! a crash never leaves a half-written snapshot behind.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::document::Document;
use crate::embedding::ProviderIdentity;
use crate::error::{RagError, Result};
use crate::index::Metric;

/// The snapshot layout version this crate writes and accepts.
pub const FORMAT_VERSION: u32 = 1;

/// Serialized form of a [`FlatIndex`](crate::FlatIndex).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub format_version: u32,
    pub metric: Metric,
    pub dimensions: Option<usize>,
    pub provider: ProviderIdentity,
    pub documents: Vec<Document>,
}

impl IndexSnapshot {
    /// Check that the snapshot describes a well-formed index.
    fn validate(&self, path: &Path) -> Result<()> {
        if self.format_version != FORMAT_VERSION {
            return Err(RagError::corrupt(
                path,
                format!(
                    "unsupported format version {} (expected {FORMAT_VERSION})",
                    self.format_version
                ),
            ));
        }
        match self.dimensions {
            None if !self.documents.is_empty() => {
                return Err(RagError::corrupt(path, "documents present but no dimensionality recorded"));
            }
            Some(0) => return Err(RagError::corrupt(path, "dimensionality must be positive")),
            Some(dims) if dims != self.provider.dimensions => {
                return Err(RagError::corrupt(
                    path,
                    format!(
                        "index dimensionality {dims} disagrees with provider {}",
                        self.provider
                    ),
                ));
            }
            _ => {}
        }
        let mut ids = HashSet::with_capacity(self.documents.len());
        for document in &self.documents {
            if Some(document.embedding().len()) != self.dimensions {
                return Err(RagError::corrupt(
                    path,
                    format!(
                        "document '{}' has a {}-dimensional embedding",
                        document.id(),
                        document.embedding().len()
                    ),
                ));
            }
            if !ids.insert(document.id()) {
                return Err(RagError::corrupt(path, format!("duplicate document id '{}'", document.id())));
            }
            if !document.metadata().has_unique_keys() {
                return Err(RagError::corrupt(
                    path,
                    format!("document '{}' has duplicate metadata keys", document.id()),
                ));
            }
        }
        Ok(())
    }
}

/// Write `snapshot` to `path`, replacing any existing file atomically.
pub async fn write(path: &Path, snapshot: &IndexSnapshot) -> Result<()> {
    let bytes = serde_json::to_vec(snapshot)
        .map_err(|e| RagError::InvalidArgument(format!("snapshot is not serializable: {e}")))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = temp_path(path);
    tokio::fs::write(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    info!(
        path = %path.display(),
        documents = snapshot.documents.len(),
        bytes = bytes.len(),
        "index snapshot written"
    );
    Ok(())
}

/// Read and validate the snapshot at `path`.
///
/// # Errors
///
/// [`RagError::NotFound`] if nothing exists at `path`;
/// [`RagError::CorruptIndex`] if the file cannot be parsed or describes an
/// inconsistent index.
pub async fn read(path: &Path) -> Result<IndexSnapshot> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(RagError::NotFound { path: path.to_path_buf() });
        }
        Err(e) => return Err(e.into()),
    };
    let snapshot: IndexSnapshot =
        serde_json::from_slice(&bytes).map_err(|e| RagError::corrupt(path, e.to_string()))?;
    snapshot.validate(path)?;
    debug!(path = %path.display(), documents = snapshot.documents.len(), "index snapshot read");
    Ok(snapshot)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
