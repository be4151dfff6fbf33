//! Data types for ingestion rows, indexed documents, and search results.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Rendering of an absent metadata value.
pub const MISSING: &str = "N/A";

/// A scalar metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Text(String),
    /// Always finite once stored in [`Metadata`].
    Number(f64),
    /// The source had no value; rendered as [`MISSING`].
    Missing,
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Text(text) => f.write_str(text),
            MetadataValue::Number(n) if n.is_finite() && n.fract() == 0.0 => write!(f, "{n:.0}"),
            MetadataValue::Number(n) => write!(f, "{n}"),
            MetadataValue::Missing => f.write_str(MISSING),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::Text(value)
    }
}

impl MetadataValue {
    /// NaN and infinities have no JSON form; they are kept as `Missing`.
    fn normalized(self) -> Self {
        match self {
            MetadataValue::Number(n) if !n.is_finite() => MetadataValue::Missing,
            other => other,
        }
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Number(value).normalized()
    }
}

impl From<Option<&str>> for MetadataValue {
    fn from(value: Option<&str>) -> Self {
        value.map_or(MetadataValue::Missing, MetadataValue::from)
    }
}

/// Ordered field name → value mapping with unique keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(Vec<(String, MetadataValue)>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value. An existing key keeps its position and gets the new value.
    ///
    /// A non-finite number is stored as [`MetadataValue::Missing`].
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<MetadataValue>) {
        let key = key.into();
        let value = value.into().normalized();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// The value for `key` rendered for display, [`MISSING`] when absent.
    pub fn display(&self, key: &str) -> String {
        self.get(key).map_or_else(|| MISSING.to_string(), ToString::to_string)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetadataValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Keys must be unique; used when validating snapshots.
    pub(crate) fn has_unique_keys(&self) -> bool {
        self.0.iter().enumerate().all(|(i, (k, _))| self.0[..i].iter().all(|(other, _)| other != k))
    }
}

impl<K: Into<String>, V: Into<MetadataValue>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut metadata = Metadata::new();
        for (k, v) in iter {
            metadata.insert(k, v);
        }
        metadata
    }
}

/// One row of the tabular source.
///
/// A field that is absent from the row is different from a field that is
/// present with a null value (`None`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    fields: HashMap<String, Option<String>>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(field.into(), Some(value.into()));
        self
    }

    pub fn with_null(mut self, field: impl Into<String>) -> Self {
        self.fields.insert(field.into(), None);
        self
    }

    /// `None` if the field is absent, `Some(None)` if it is null.
    pub fn get(&self, field: &str) -> Option<Option<&str>> {
        self.fields.get(field).map(|v| v.as_deref())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self { fields: iter.into_iter().map(|(k, v)| (k.into(), Some(v.into()))).collect() }
    }
}

/// The unit of retrievable content held by an index.
///
/// Documents are created by the index on insertion; the embedding is a
/// derived attribute and cannot be changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    id: String,
    text: String,
    metadata: Metadata,
    embedding: Vec<f32>,
}

impl Document {
    pub(crate) fn new(id: String, item: NewDocument) -> Self {
        Self { id, text: item.text, metadata: item.metadata, embedding: item.embedding }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn embedding(&self) -> &[f32] {
        &self.embedding
    }
}

/// A `(text, metadata, embedding)` triple awaiting insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDocument {
    pub text: String,
    pub metadata: Metadata,
    pub embedding: Vec<f32>,
}

impl NewDocument {
    pub fn new(text: impl Into<String>, metadata: Metadata, embedding: Vec<f32>) -> Self {
        Self { text: text.into(), metadata, embedding }
    }
}

/// A retrieved [`Document`] paired with its score.
///
/// Whether a higher or lower score is closer depends on the index
/// [`Metric`](crate::Metric).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub document: Document,
    pub score: f32,
}

impl SearchResult {
    /// The document text cut to at most `max_chars` characters.
    pub fn snippet(&self, max_chars: usize) -> String {
        snippet(self.document.text(), max_chars)
    }
}

/// The query-time view of a result: metadata, text snippet, score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub metadata: Metadata,
    pub snippet: String,
    pub score: f32,
}

fn snippet(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_keeps_insertion_order_and_replaces_in_place() {
        let mut metadata = Metadata::new()
            .with("Title", "Arts Quarterly")
            .with("ISSN", "3333-3333")
            .with("Stratum", MetadataValue::Missing);
        metadata.insert("Title", "Arts Quarterly Review");

        let keys: Vec<&str> = metadata.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["Title", "ISSN", "Stratum"]);
        assert_eq!(metadata.display("Title"), "Arts Quarterly Review");
        assert_eq!(metadata.display("Stratum"), MISSING);
        assert_eq!(metadata.display("Publisher"), MISSING);
    }

    #[test]
    fn whole_numbers_render_without_fraction() {
        assert_eq!(MetadataValue::Number(2019.0).to_string(), "2019");
        assert_eq!(MetadataValue::Number(0.5).to_string(), "0.5");
    }

    #[test]
    fn non_finite_numbers_are_stored_as_missing() {
        let metadata = Metadata::new()
            .with("Year", 2019.0)
            .with("Impact", f64::NAN)
            .with("Citations", MetadataValue::Number(f64::INFINITY));
        assert_eq!(metadata.get("Impact"), Some(&MetadataValue::Missing));
        assert_eq!(metadata.get("Citations"), Some(&MetadataValue::Missing));

        let json = serde_json::to_string(&metadata).unwrap();
        let back: Metadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back, metadata);
    }

    #[test]
    fn record_distinguishes_absent_from_null() {
        let record = Record::new().with("Title", "Medical Review").with_null("ISSN");
        assert_eq!(record.get("Title"), Some(Some("Medical Review")));
        assert_eq!(record.get("ISSN"), Some(None));
        assert_eq!(record.get("Area"), None);
    }

    #[test]
    fn snippet_cuts_on_char_boundaries() {
        assert_eq!(snippet("Área de Avaliação", 4), "Área...");
        assert_eq!(snippet("short", 10), "short");
    }

    #[test]
    fn metadata_round_trips_through_json() {
        let metadata = Metadata::new().with("Title", "X").with("Year", 2020.0).with("ISSN", None::<&str>);
        let json = serde_json::to_string(&metadata).unwrap();
        let back: Metadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back, metadata);
    }
}
