//! Multi-document ingestion.
//!
//! One item's failure never aborts the rest of a batch: each failure is
//! recorded in the [`BatchReport`] alongside the successes, and the
//! batch as a whole reports partial success. Progress is published to a
//! [`TaskRegistry`] entry after every item, and the worker checks the
//! task's cancellation flag between items — nothing is interrupted
//! mid-item.
//!
//! [`scan_directory`] walks a root with include/exclude globs and pairs
//! each file with a `doc_id` derived from its file stem;
//! [`index_directory`] composes scan → extract → [`index_batch`].

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::warn;
use walkdir::WalkDir;

use crate::error::{IndexerError, Result};
use crate::extract::{Extractor, MIME_DOCX, MIME_MARKDOWN, MIME_PDF, MIME_TEXT};
use crate::models::Metadata;
use crate::store::DocumentStore;
use crate::tasks::{TaskHandle, TaskRegistry, TaskState};

/// One document to be indexed by a batch.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub doc_id: String,
    pub content: String,
    pub metadata: Metadata,
}

/// A single item's failure inside a batch.
#[derive(Debug, Clone)]
pub struct BatchFailure {
    pub doc_id: String,
    pub error: String,
}

/// Outcome of a batch: successes and failures side by side.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Document ids indexed successfully, in processing order.
    pub indexed: Vec<String>,
    /// Per-item failures; the batch kept going past each one.
    pub failed: Vec<BatchFailure>,
    /// True when the batch stopped early on a cancellation request.
    pub cancelled: bool,
}

impl BatchReport {
    /// Some items succeeded and some failed.
    pub fn is_partial(&self) -> bool {
        !self.indexed.is_empty() && !self.failed.is_empty()
    }

    /// Items attempted so far.
    pub fn processed(&self) -> usize {
        self.indexed.len() + self.failed.len()
    }
}

/// A file selected by [`scan_directory`], ready for extraction.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    /// File stem; becomes the document id.
    pub doc_id: String,
    pub content_type: &'static str,
}

fn content_type_for(path: &Path) -> Option<&'static str> {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .as_deref()
    {
        Some("pdf") => Some(MIME_PDF),
        Some("docx") => Some(MIME_DOCX),
        Some("md") => Some(MIME_MARKDOWN),
        Some("txt") => Some(MIME_TEXT),
        _ => None,
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).map_err(|e| IndexerError::InvalidConfig(e.to_string()))?);
    }
    builder
        .build()
        .map_err(|e| IndexerError::InvalidConfig(e.to_string()))
}

/// Collect extractable files under `root` matching the glob filters.
///
/// Files with an unrecognized extension are skipped. Results are sorted
/// by relative path for deterministic batch ordering.
pub fn scan_directory(
    root: &Path,
    include_globs: &[String],
    exclude_globs: &[String],
) -> Result<Vec<SourceFile>> {
    if !root.exists() {
        return Err(IndexerError::NotFound(root.display().to_string()));
    }

    let include_set = build_globset(include_globs)?;
    let exclude_set = build_globset(exclude_globs)?;

    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|e| IndexerError::Backend(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy();

        if exclude_set.is_match(rel_str.as_ref()) || !include_set.is_match(rel_str.as_ref()) {
            continue;
        }
        let Some(content_type) = content_type_for(path) else {
            continue;
        };
        let doc_id = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| rel_str.to_string());

        files.push(SourceFile {
            path: path.to_path_buf(),
            doc_id,
            content_type,
        });
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

/// Index a prepared batch of documents.
///
/// The caller registers the task (obtaining its cancellation `handle`)
/// and hands both in; the worker publishes progress after each item and
/// honors the handle between items. Every per-item error is collected
/// into the report rather than aborting the batch.
pub async fn index_batch(
    store: &DocumentStore,
    items: Vec<BatchItem>,
    registry: &TaskRegistry,
    task_id: &str,
    handle: &TaskHandle,
) -> BatchReport {
    let mut report = BatchReport::default();

    for item in items {
        if handle.is_cancelled() {
            report.cancelled = true;
            registry.finish(task_id, TaskState::Cancelled);
            return report;
        }

        match store
            .index_document(&item.doc_id, &item.content, item.metadata)
            .await
        {
            Ok(_) => report.indexed.push(item.doc_id),
            Err(e) => {
                warn!(doc_id = %item.doc_id, error = %e, "batch item failed");
                report.failed.push(BatchFailure {
                    doc_id: item.doc_id,
                    error: e.to_string(),
                });
            }
        }
        registry.update_progress(task_id, report.processed());
    }

    registry.finish(task_id, TaskState::Completed);
    report
}

/// Scan `root`, extract every matching file, and index the results as
/// one batch.
///
/// Extraction failures are collected into the report exactly like
/// indexing failures — a corrupt file never sinks the directory.
pub async fn index_directory(
    store: &DocumentStore,
    extractor: &Extractor,
    root: &Path,
    include_globs: &[String],
    exclude_globs: &[String],
    registry: &TaskRegistry,
    task_id: &str,
) -> Result<BatchReport> {
    let files = scan_directory(root, include_globs, exclude_globs)?;

    let mut items = Vec::new();
    let mut extract_failures = Vec::new();

    for file in files {
        let bytes = match std::fs::read(&file.path) {
            Ok(b) => b,
            Err(e) => {
                warn!(path = %file.path.display(), error = %e, "failed to read source file");
                extract_failures.push(BatchFailure {
                    doc_id: file.doc_id,
                    error: e.to_string(),
                });
                continue;
            }
        };
        match extractor.extract(&bytes, file.content_type) {
            Ok(extracted) => {
                let mut metadata = extracted.metadata;
                metadata.insert(
                    "source".to_string(),
                    file.path.display().to_string().into(),
                );
                items.push(BatchItem {
                    doc_id: file.doc_id,
                    content: extracted.text,
                    metadata,
                });
            }
            Err(e) => {
                warn!(path = %file.path.display(), error = %e, "extraction failed");
                extract_failures.push(BatchFailure {
                    doc_id: file.doc_id,
                    error: e.to_string(),
                });
            }
        }
    }

    let handle = registry.register(task_id, items.len());
    let mut report = index_batch(store, items, registry, task_id, &handle).await;
    report.failed.extend(extract_failures);
    Ok(report)
}
