//! Journal search tool for agents.
//!
//! The [`JournalSearchTool`] wraps a [`RetrievalEngine`] as a
//! [`sucupira_core::Tool`] so that an agent's model can search the catalog
//! as a tool call.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sucupira_rag::{JournalSearchTool, RetrievalEngine};
//!
//! let engine = Arc::new(RetrievalEngine::open(config, embedder, "sucupira_index.json").await?);
//! let tool = JournalSearchTool::new(engine);
//!
//! // The model calls the tool with:
//! // { "query": "medicina", "k": 5 }
//! ```

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use sucupira_core::{CoreError, ParamKind, ParamSpec, Tool, ToolArgs};
use tracing::{error, info};

use crate::document::SearchResult;
use crate::engine::RetrievalEngine;
use crate::index::{Metric, VectorIndex};

/// Text returned when a search has no hits.
pub const NO_RESULTS: &str = "No journals found matching your query.";

/// A similarity search over the journal catalog.
///
/// Holds one opened engine for its whole life; every call reuses the same
/// index and embedding provider.
pub struct JournalSearchTool {
    engine: Arc<RetrievalEngine>,
    name: String,
    description: String,
}

impl JournalSearchTool {
    pub fn new(engine: Arc<RetrievalEngine>) -> Self {
        Self {
            engine,
            name: "journal_search".to_string(),
            description: "Searches the Sucupira catalog for academic journals similar to the \
                          query. Returns each journal's title, evaluation area, ISSN, Qualis \
                          stratum, and a relevance score."
                .to_string(),
        }
    }

    /// Register the tool under a different name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Render results as a numbered list of metadata fields, a text snippet of
/// at most `snippet_chars` characters, and scores.
pub fn format_results(results: &[SearchResult], metric: Metric, snippet_chars: usize) -> String {
    if results.is_empty() {
        return NO_RESULTS.to_string();
    }
    let mut out = format!("Journal search results (score: {}):\n", metric.label());
    for (i, result) in results.iter().enumerate() {
        let metadata = result.document.metadata();
        let heading = metadata.iter().next().map_or_else(
            || result.document.text().to_string(),
            |(_, value)| value.to_string(),
        );
        let _ = writeln!(out, "\n{}. {heading}", i + 1);
        for (key, value) in metadata.iter().skip(1) {
            let _ = writeln!(out, "   {key}: {value}");
        }
        let _ = writeln!(out, "   Content: {}", result.snippet(snippet_chars));
        let _ = writeln!(out, "   Score: {:.4}", result.score);
    }
    out
}

#[async_trait]
impl Tool for JournalSearchTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required(
                "query",
                ParamKind::String,
                "Journal name, research area, or topic to search for",
            ),
            ParamSpec::optional(
                "k",
                ParamKind::Integer,
                "Maximum number of journals to return. Uses the engine default if omitted.",
            ),
        ]
    }

    async fn execute(&self, args: ToolArgs) -> sucupira_core::Result<String> {
        let query = args.require_str("query")?;
        let k = match args.i64("k") {
            None => self.engine.config().default_top_k,
            Some(k) if k >= 1 => k as usize,
            Some(k) => {
                return Err(CoreError::InvalidArgument(format!("'k' must be at least 1, got {k}")));
            }
        };

        info!(query, k, tool = %self.name, "journal search tool called");

        let results = self.engine.search(query, k).await.map_err(|e| {
            error!(error = %e, "journal search failed");
            CoreError::Tool(format!("journal search failed: {e}"))
        })?;

        let metric = self.engine.index().await.metric();
        Ok(format_results(&results, metric, self.engine.config().snippet_chars))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, Metadata, NewDocument};

    fn result(title: &str, text: &str, score: f32) -> SearchResult {
        let metadata = Metadata::new().with("Título", title).with("ISSN", "2222-2222");
        let document = Document::new("doc-1".to_string(), NewDocument::new(text, metadata, vec![1.0]));
        SearchResult { document, score }
    }

    #[test]
    fn results_include_a_bounded_snippet() {
        let out = format_results(&[result("Medical Review", "Medical Review Medicine", 0.9)], Metric::Cosine, 7);
        assert!(out.contains("1. Medical Review\n   ISSN: 2222-2222\n   Content: Medical...\n   Score: 0.9000"), "{out}");
    }

    #[test]
    fn no_results_has_fixed_text() {
        assert_eq!(format_results(&[], Metric::Euclidean, 200), NO_RESULTS);
    }
}
