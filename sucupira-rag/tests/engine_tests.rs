//! Ingestion, search, snapshot, and tool behavior of the retrieval engine.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use sucupira_core::{ERROR_MARKER, ToolRegistry};
use sucupira_rag::{
    EmbeddingProvider, EngineConfig, FlatIndex, HashingEmbeddingProvider, JournalSearchTool,
    MetadataValue, ProviderIdentity, RagError, Record, RetrievalEngine, VectorIndex, build_index,
    search,
};

fn journal(title: &str, area: &str, issn: &str) -> Record {
    Record::new()
        .with("Título", title)
        .with("Área de Avaliação", area)
        .with("ISSN", issn)
        .with("Estrato", "A1")
}

fn catalog() -> Vec<Record> {
    vec![
        journal("Journal of Computing", "Computer Science", "1111-1111"),
        journal("Medical Review", "Medicine", "2222-2222"),
        journal("Arts Quarterly", "Humanities", "3333-3333"),
    ]
}

fn provider() -> Arc<HashingEmbeddingProvider> {
    Arc::new(HashingEmbeddingProvider::new(256))
}

async fn engine() -> Arc<RetrievalEngine> {
    let engine = RetrievalEngine::new(EngineConfig::default(), provider());
    engine.rebuild(&catalog()).await.unwrap();
    Arc::new(engine)
}

#[tokio::test]
async fn computing_query_ranks_computing_journal_first() {
    let engine = engine().await;
    let results = engine.search("computing research", 1).await.unwrap();

    assert_eq!(results.len(), 1);
    let metadata = results[0].document.metadata();
    assert_eq!(metadata.display("Título"), "Journal of Computing");
    assert_eq!(metadata.display("ISSN"), "1111-1111");
}

#[tokio::test]
async fn k_larger_than_index_returns_everything() {
    let engine = engine().await;
    assert_eq!(engine.search("anything", 50).await.unwrap().len(), 3);
}

#[tokio::test]
async fn empty_query_is_embedded_as_is() {
    let engine = engine().await;
    let results = engine.search("", 3).await.unwrap();
    // The hashing provider maps "" to the zero vector, so every score ties at 0.
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.score == 0.0));
    assert_eq!(results[0].document.metadata().display("Título"), "Journal of Computing");
}

#[tokio::test]
async fn hits_expose_metadata_snippet_and_score() {
    let engine = engine().await;
    let hits = engine.hits("medicine", 1).await.unwrap();
    assert_eq!(hits[0].metadata.display("Título"), "Medical Review");
    assert_eq!(hits[0].snippet, "Medical Review Medicine");
    assert!(hits[0].score > 0.0);
}

#[tokio::test]
async fn missing_text_field_fails_the_build() {
    let mut rows = catalog();
    rows.push(Record::new().with("Título", "Orphan Journal").with("ISSN", "4444-4444"));

    let err = build_index(&EngineConfig::default(), &rows, provider().as_ref()).await.unwrap_err();
    match err {
        RagError::MissingField { row, field } => {
            assert_eq!(row, 3);
            assert_eq!(field, "Área de Avaliação");
        }
        other => panic!("expected MissingField, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_text_row_is_dropped_and_reported() {
    let mut rows = catalog();
    rows.insert(
        1,
        Record::new().with("Título", "  ").with_null("Área de Avaliação").with("ISSN", "9999-9999"),
    );

    let (index, report) = build_index(&EngineConfig::default(), &rows, provider().as_ref()).await.unwrap();
    assert_eq!(report.indexed, 3);
    assert_eq!(report.dropped, 1);
    assert_eq!(report.dropped_rows, [1]);
    assert_eq!(index.len().await, 3);
}

#[tokio::test]
async fn row_with_null_area_is_dropped_not_half_embedded() {
    let mut rows = catalog();
    rows.push(Record::new().with("Título", "Medical Review").with_null("Área de Avaliação").with("ISSN", "5555-5555"));

    let (index, report) = build_index(&EngineConfig::default(), &rows, provider().as_ref()).await.unwrap();
    assert_eq!(report.indexed, 3);
    assert_eq!(report.dropped_rows, [3]);
    let issns: Vec<String> = index.documents().await.iter().map(|d| d.metadata().display("ISSN")).collect();
    assert!(!issns.contains(&"5555-5555".to_string()));
}

#[tokio::test]
async fn absent_metadata_is_stored_as_missing() {
    let rows = [Record::new().with("Título", "Arts Quarterly").with("Área de Avaliação", "Humanities")];
    let (index, _) = build_index(&EngineConfig::default(), &rows, provider().as_ref()).await.unwrap();
    let documents = index.documents().await;
    assert_eq!(documents[0].metadata().get("ISSN"), Some(&MetadataValue::Missing));
    assert_eq!(documents[0].metadata().display("Estrato"), "N/A");
}

#[tokio::test]
async fn querying_with_another_provider_fails() {
    let (index, _) = build_index(&EngineConfig::default(), &catalog(), provider().as_ref()).await.unwrap();
    let other = HashingEmbeddingProvider::new(128);

    let err = search(&EngineConfig::default(), &index, &other, "computing", 1).await.unwrap_err();
    assert!(matches!(err, RagError::ProviderMismatch { .. }), "{err:?}");
}

#[tokio::test]
async fn opening_a_snapshot_with_another_provider_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.json");
    engine().await.persist(&path).await.unwrap();

    let result = RetrievalEngine::open(
        EngineConfig::default(),
        Arc::new(HashingEmbeddingProvider::new(64)),
        &path,
    )
    .await;
    assert!(matches!(result, Err(RagError::ProviderMismatch { .. })));

    let reopened = RetrievalEngine::open(EngineConfig::default(), provider(), &path).await.unwrap();
    let results = reopened.search("computing research", 1).await.unwrap();
    assert_eq!(results[0].document.metadata().display("ISSN"), "1111-1111");
}

#[tokio::test]
async fn loading_a_missing_snapshot_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let err = FlatIndex::load(dir.path().join("absent.json")).await.unwrap_err();
    assert!(matches!(err, RagError::NotFound { .. }));
}

#[tokio::test]
async fn loading_garbage_is_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.json");
    std::fs::write(&path, b"{\"format_version\": 1, \"documents\": [").unwrap();

    let err = FlatIndex::load(&path).await.unwrap_err();
    assert!(matches!(err, RagError::CorruptIndex { .. }), "{err:?}");
}

#[tokio::test]
async fn loading_inconsistent_dimensions_is_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.json");
    engine().await.persist(&path).await.unwrap();

    let mut snapshot: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    snapshot["documents"][0]["embedding"] = json!([1.0, 0.0]);
    std::fs::write(&path, serde_json::to_vec(&snapshot).unwrap()).unwrap();

    let err = FlatIndex::load(&path).await.unwrap_err();
    assert!(matches!(err, RagError::CorruptIndex { .. }), "{err:?}");
}

#[tokio::test]
async fn loading_unknown_format_version_is_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.json");
    engine().await.persist(&path).await.unwrap();

    let mut snapshot: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    snapshot["format_version"] = json!(99);
    std::fs::write(&path, serde_json::to_vec(&snapshot).unwrap()).unwrap();

    let err = FlatIndex::load(&path).await.unwrap_err();
    assert!(matches!(err, RagError::CorruptIndex { .. }), "{err:?}");
}

/// A provider that never answers.
struct StalledProvider;

#[async_trait]
impl EmbeddingProvider for StalledProvider {
    async fn embed(&self, _text: &str) -> sucupira_rag::Result<Vec<f32>> {
        std::future::pending().await
    }

    fn dimensions(&self) -> usize {
        4
    }

    fn identity(&self) -> ProviderIdentity {
        ProviderIdentity::new("stalled", "none", 4)
    }
}

#[tokio::test(start_paused = true)]
async fn embedding_timeout_is_an_external_call_failure() {
    let config = EngineConfig::builder().embed_timeout(Duration::from_secs(2)).build().unwrap();
    let err = build_index(&config, &catalog(), &StalledProvider).await.unwrap_err();
    assert!(matches!(err, RagError::ExternalCallFailure { .. }), "{err:?}");
}

#[tokio::test]
async fn search_tool_formats_hits() {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(JournalSearchTool::new(engine().await))).unwrap();

    let out = registry.invoke("journal_search", json!({"query": "computing research", "k": 1})).await;
    assert!(out.starts_with("Journal search results"), "{out}");
    assert!(out.contains("1. Journal of Computing"));
    assert!(out.contains("ISSN: 1111-1111"));
    assert!(out.contains("Content: Journal of Computing Computer Science"));
    assert!(!out.contains("Medical Review"));
}

#[tokio::test]
async fn search_tool_never_raises_on_malformed_arguments() {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(JournalSearchTool::new(engine().await))).unwrap();

    for args in [json!({}), json!({"query": 3}), json!({"query": "x", "k": "many"}), json!({"query": "x", "k": 0}), json!("x")] {
        let out = registry.invoke("journal_search", args.clone()).await;
        assert!(out.starts_with(ERROR_MARKER), "{args} -> {out}");
    }
}

#[tokio::test]
async fn search_tool_reports_empty_index() {
    let engine = Arc::new(RetrievalEngine::new(EngineConfig::default(), provider()));
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(JournalSearchTool::new(engine))).unwrap();

    let out = registry.invoke("journal_search", json!({"query": "medicina"})).await;
    assert_eq!(out, sucupira_rag::tool::NO_RESULTS);
}
