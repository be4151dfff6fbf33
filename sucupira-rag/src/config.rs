//! Configuration for the retrieval engine.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};
use crate::index::Metric;

/// Field names of the CAPES Qualis catalog export.
pub mod fields {
    pub const TITLE: &str = "Título";
    pub const EVALUATION_AREA: &str = "Área de Avaliação";
    pub const ISSN: &str = "ISSN";
    pub const STRATUM: &str = "Estrato";
}

/// Configuration parameters for building and searching an index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Fields concatenated, in this order, into the embedded text.
    pub text_fields: Vec<String>,
    /// Fields copied into each document's metadata, in this order.
    pub metadata_fields: Vec<String>,
    /// Separator placed between text fields.
    pub separator: String,
    /// Number of results returned when a caller does not choose `k`.
    pub default_top_k: usize,
    /// Maximum number of texts sent to the embedding provider per call.
    pub embed_batch_size: usize,
    /// Upper bound on a single embedding call.
    #[serde(with = "duration_secs")]
    pub embed_timeout: Duration,
    /// Scoring convention of built indexes.
    pub metric: Metric,
    /// Maximum snippet length in the query-time surface.
    pub snippet_chars: usize,
}

impl Default for EngineConfig {
    /// The Qualis catalog layout: title and evaluation area are embedded;
    /// title, area, ISSN, and stratum are kept as metadata.
    fn default() -> Self {
        Self {
            text_fields: vec![fields::TITLE.into(), fields::EVALUATION_AREA.into()],
            metadata_fields: vec![
                fields::TITLE.into(),
                fields::EVALUATION_AREA.into(),
                fields::ISSN.into(),
                fields::STRATUM.into(),
            ],
            separator: " ".into(),
            default_top_k: 5,
            embed_batch_size: 64,
            embed_timeout: Duration::from_secs(30),
            metric: Metric::Cosine,
            snippet_chars: 200,
        }
    }
}

impl EngineConfig {
    /// Create a new builder for constructing an [`EngineConfig`].
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Check the invariants the builder enforces.
    ///
    /// Ingestion and default-`k` searches call this as well, since a config
    /// can be deserialized or assembled field by field.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `text_fields` is empty or repeats a field
    /// - `metadata_fields` repeats a field
    /// - `default_top_k == 0` or `embed_batch_size == 0`
    /// - `embed_timeout` is zero
    pub fn validate(&self) -> Result<()> {
        if self.text_fields.is_empty() {
            return Err(RagError::ConfigError("at least one text field is required".to_string()));
        }
        if let Some(field) = first_duplicate(&self.text_fields) {
            return Err(RagError::ConfigError(format!("text field '{field}' listed twice")));
        }
        if let Some(field) = first_duplicate(&self.metadata_fields) {
            return Err(RagError::ConfigError(format!("metadata field '{field}' listed twice")));
        }
        if self.default_top_k == 0 {
            return Err(RagError::ConfigError("default_top_k must be greater than zero".to_string()));
        }
        if self.embed_batch_size == 0 {
            return Err(RagError::ConfigError(
                "embed_batch_size must be greater than zero".to_string(),
            ));
        }
        if self.embed_timeout.is_zero() {
            return Err(RagError::ConfigError("embed_timeout must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`EngineConfig`].
#[derive(Debug, Clone, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Set the fields concatenated into the embedded text.
    pub fn text_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.text_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Set the fields copied into document metadata.
    pub fn metadata_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.metadata_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.config.separator = separator.into();
        self
    }

    pub fn default_top_k(mut self, k: usize) -> Self {
        self.config.default_top_k = k;
        self
    }

    pub fn embed_batch_size(mut self, size: usize) -> Self {
        self.config.embed_batch_size = size;
        self
    }

    pub fn embed_timeout(mut self, timeout: Duration) -> Self {
        self.config.embed_timeout = timeout;
        self
    }

    pub fn metric(mut self, metric: Metric) -> Self {
        self.config.metric = metric;
        self
    }

    pub fn snippet_chars(mut self, chars: usize) -> Self {
        self.config.snippet_chars = chars;
        self
    }

    /// Build the [`EngineConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] for anything
    /// [`EngineConfig::validate`] rejects.
    pub fn build(self) -> Result<EngineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

fn first_duplicate(fields: &[String]) -> Option<&str> {
    fields
        .iter()
        .enumerate()
        .find(|(i, field)| fields[..*i].contains(*field))
        .map(|(_, field)| field.as_str())
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
