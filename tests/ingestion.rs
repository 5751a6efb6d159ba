//! Directory ingestion tests: scan → extract → index → query, with
//! partial-failure reporting and pollable task status.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use rag_indexer::backend::{MemoryBackend, VectorBackend};
use rag_indexer::batch::index_directory;
use rag_indexer::chunk::ChunkParams;
use rag_indexer::embedding::HashEmbedder;
use rag_indexer::extract::Extractor;
use rag_indexer::query::QueryEngine;
use rag_indexer::store::DocumentStore;
use rag_indexer::tasks::{TaskRegistry, TaskState};
use tempfile::TempDir;

/// Minimal valid PDF containing the text "vector search phrase".
/// Builds the body then an xref table with correct byte offsets so
/// pdf-extract can parse it.
fn minimal_pdf_with_phrase() -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let o1 = out.len();
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    let o2 = out.len();
    out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
    let o3 = out.len();
    out.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >> endobj\n");
    let o4 = out.len();
    out.extend_from_slice(b"4 0 obj << /Length 47 >> stream\nBT /F1 12 Tf 100 700 Td (vector search phrase) Tj ET\nendstream endobj\n");
    let o5 = out.len();
    out.extend_from_slice(
        b"5 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
    );
    let xref_start = out.len();
    out.extend_from_slice(b"xref\n0 6\n");
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    out.extend_from_slice(format!("{:010} 00000 n \n", o1).as_bytes());
    out.extend_from_slice(format!("{:010} 00000 n \n", o2).as_bytes());
    out.extend_from_slice(format!("{:010} 00000 n \n", o3).as_bytes());
    out.extend_from_slice(format!("{:010} 00000 n \n", o4).as_bytes());
    out.extend_from_slice(format!("{:010} 00000 n \n", o5).as_bytes());
    out.extend_from_slice(b"trailer << /Size 6 /Root 1 0 R >>\nstartxref\n");
    out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
    out.extend_from_slice(b"%%EOF\n");
    out
}

fn setup() -> (DocumentStore, QueryEngine, TaskRegistry) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    let backend: Arc<dyn VectorBackend> =
        Arc::new(MemoryBackend::new(Box::new(HashEmbedder::default())));
    (
        DocumentStore::new(Arc::clone(&backend), ChunkParams::default()),
        QueryEngine::new(backend),
        TaskRegistry::new(Duration::from_secs(60)),
    )
}

#[tokio::test]
async fn directory_ingest_indexes_and_reports() {
    let (store, engine, registry) = setup();
    let extractor = Extractor::with_defaults();

    let tmp = TempDir::new().unwrap();
    let files = tmp.path();
    fs::write(
        files.join("alpha.md"),
        "# Alpha\n\nThe alpha document covers Rust programming and cargo.",
    )
    .unwrap();
    fs::write(
        files.join("beta.txt"),
        "Beta notes about deployment, Kubernetes, and Docker.",
    )
    .unwrap();
    fs::write(files.join("paper.pdf"), minimal_pdf_with_phrase()).unwrap();
    fs::write(files.join("corrupt.pdf"), b"%PDF-not-really").unwrap();

    let report = index_directory(
        &store,
        &extractor,
        files,
        &["**/*".to_string()],
        &[],
        &registry,
        "ingest-1",
    )
    .await
    .unwrap();

    // Three succeed, the corrupt one is reported, nothing aborts.
    assert_eq!(report.indexed, vec!["alpha", "beta", "paper"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].doc_id, "corrupt");
    assert!(report.is_partial());

    let status = registry.status("ingest-1").unwrap();
    assert_eq!(status.state, TaskState::Completed);

    // Extracted PDF text is searchable.
    let resp = engine.query("vector search phrase", 3).await.unwrap();
    assert!(!resp.is_empty());
    assert_eq!(
        resp.metadatas[0].get("doc_id").and_then(|v| v.as_str()),
        Some("paper")
    );

    // Provenance metadata flowed through extraction into the chunks.
    assert!(resp.metadatas[0]
        .get("source")
        .and_then(|v| v.as_str())
        .is_some_and(|s| s.ends_with("paper.pdf")));
}

#[tokio::test]
async fn exclude_globs_are_honored() {
    let (store, _engine, registry) = setup();
    let extractor = Extractor::with_defaults();

    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("keep.txt"), "Kept file.").unwrap();
    fs::write(tmp.path().join("drop.txt"), "Dropped file.").unwrap();

    let report = index_directory(
        &store,
        &extractor,
        tmp.path(),
        &["**/*.txt".to_string()],
        &["drop.txt".to_string()],
        &registry,
        "ingest-2",
    )
    .await
    .unwrap();

    assert_eq!(report.indexed, vec!["keep"]);
    let docs = store.list_documents().await.unwrap();
    assert!(docs.contains("keep") && !docs.contains("drop"));
}

#[tokio::test]
async fn finished_task_is_evicted_after_acknowledgment() {
    let (store, _engine, registry) = setup();
    let extractor = Extractor::with_defaults();

    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("one.txt"), "Single file.").unwrap();

    index_directory(
        &store,
        &extractor,
        tmp.path(),
        &["**/*".to_string()],
        &[],
        &registry,
        "ingest-3",
    )
    .await
    .unwrap();

    let taken = registry.acknowledge("ingest-3").unwrap();
    assert_eq!(taken.state, TaskState::Completed);
    assert!(registry.status("ingest-3").is_none());
}
