//! Document lifecycle over the vector backend.
//!
//! A document has no record of its own: indexing splits its content into
//! chunks and stores those; deleting removes every chunk carrying its
//! `doc_id`; listing groups stored metadata back into document ids.
//!
//! Operations on the same `doc_id` are serialized through a per-key
//! async mutex, so two concurrent updates cannot interleave their
//! delete and insert phases. Operations on different `doc_id`s proceed
//! in parallel.
//!
//! # Update consistency
//!
//! `update_document` stages the replacement chunk set under temporary
//! identifiers before touching the old one: stage-insert, delete old,
//! insert final, drop staging. Staged records carry no `doc_id`
//! metadata field, so listings, filters, and query responses never see
//! them. A failure after the old set is gone still leaves the document
//! absent — that window is surfaced as
//! [`UpdateInconsistency`](crate::error::IndexerError::UpdateInconsistency)
//! and is observable by re-listing documents.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use tracing::{info, warn};
use uuid::Uuid;

use crate::backend::{MetadataFilter, VectorBackend};
use crate::chunk::{build_chunks, ChunkParams};
use crate::error::{IndexerError, Result};
use crate::models::{ChunkRecord, CollectionStats, Metadata};

/// Metadata field marking an in-flight staged record.
const FIELD_STAGING: &str = "staging_id";

/// Owns the document lifecycle: index, update, delete, list, stats.
pub struct DocumentStore {
    backend: Arc<dyn VectorBackend>,
    params: ChunkParams,
    doc_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl DocumentStore {
    pub fn new(backend: Arc<dyn VectorBackend>, params: ChunkParams) -> Self {
        Self {
            backend,
            params,
            doc_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn backend(&self) -> Arc<dyn VectorBackend> {
        Arc::clone(&self.backend)
    }

    fn lock_for(&self, doc_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.doc_locks.lock().expect("doc lock map poisoned");
        Arc::clone(
            locks
                .entry(doc_id.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
        )
    }

    /// Index a new document: chunk `content` and insert all chunks in
    /// one batched call.
    ///
    /// Fails with [`IndexerError::DuplicateId`] if the document already
    /// has chunks in the backend — re-indexing requires
    /// [`update_document`](Self::update_document) (or an explicit
    /// delete first). Returns the number of chunks written.
    pub async fn index_document(
        &self,
        doc_id: &str,
        content: &str,
        metadata: Metadata,
    ) -> Result<usize> {
        let lock = self.lock_for(doc_id);
        let _guard = lock.lock().await;
        self.index_inner(doc_id, content, &metadata).await
    }

    async fn index_inner(&self, doc_id: &str, content: &str, metadata: &Metadata) -> Result<usize> {
        let chunks = build_chunks(doc_id, content, metadata, &self.params);
        let written = chunks.len();
        self.backend.add(chunks).await.map_err(|e| match e {
            // The backend reports the colliding chunk id; the caller
            // deals in document ids.
            IndexerError::DuplicateId(_) => IndexerError::DuplicateId(doc_id.to_string()),
            other => other,
        })?;
        info!(doc_id, chunks = written, "indexed document");
        Ok(written)
    }

    /// Remove every chunk belonging to `doc_id` in one batched call.
    ///
    /// Deleting a document with no chunks is a no-op, not an error.
    /// Returns the number of chunks removed.
    pub async fn delete_document(&self, doc_id: &str) -> Result<usize> {
        let lock = self.lock_for(doc_id);
        let _guard = lock.lock().await;
        self.delete_inner(doc_id).await
    }

    async fn delete_inner(&self, doc_id: &str) -> Result<usize> {
        let ids = self.chunk_ids(doc_id).await?;
        if ids.is_empty() {
            return Ok(0);
        }
        self.backend.delete(&ids).await?;
        info!(doc_id, chunks = ids.len(), "deleted document");
        Ok(ids.len())
    }

    /// Replace a document's chunk set with chunks of the new content.
    ///
    /// Staged copies of the new chunks are inserted first; only after
    /// they are in place is the old set deleted and the final set
    /// written. Returns the number of chunks in the new set.
    pub async fn update_document(
        &self,
        doc_id: &str,
        content: &str,
        metadata: Metadata,
    ) -> Result<usize> {
        let lock = self.lock_for(doc_id);
        let _guard = lock.lock().await;

        // Chunk first: a bad input fails before storage is touched.
        let final_chunks = build_chunks(doc_id, content, &metadata, &self.params);

        let staging_id = Uuid::new_v4().to_string();
        let staged: Vec<ChunkRecord> = final_chunks
            .iter()
            .enumerate()
            .map(|(i, c)| staged_copy(c, &staging_id, i))
            .collect();
        let staged_ids: Vec<String> = staged.iter().map(|c| c.id.clone()).collect();

        // Stage the replacement. On failure the old set is untouched.
        self.backend.add(staged).await?;

        // Swap: remove the old set, then finalize.
        let old_ids = self.chunk_ids(doc_id).await?;
        if let Err(e) = self.backend.delete(&old_ids).await {
            self.cleanup_staged(&staged_ids).await;
            return Err(IndexerError::UpdateInconsistency {
                doc_id: doc_id.to_string(),
                reason: format!("failed to remove previous chunks: {}", e),
            });
        }

        let written = final_chunks.len();
        if let Err(e) = self.backend.add(final_chunks).await {
            self.cleanup_staged(&staged_ids).await;
            return Err(IndexerError::UpdateInconsistency {
                doc_id: doc_id.to_string(),
                reason: format!("failed to insert replacement chunks: {}", e),
            });
        }

        self.cleanup_staged(&staged_ids).await;
        info!(doc_id, chunks = written, "updated document");
        Ok(written)
    }

    async fn cleanup_staged(&self, staged_ids: &[String]) {
        if let Err(e) = self.backend.delete(staged_ids).await {
            // Staged rows are invisible to listings and queries; leaking
            // them costs storage, not correctness.
            warn!(error = %e, "failed to drop staged chunks");
        }
    }

    async fn chunk_ids(&self, doc_id: &str) -> Result<Vec<String>> {
        let records = self
            .backend
            .get(Some(&MetadataFilter::doc_id(doc_id)))
            .await?;
        Ok(records.into_iter().map(|r| r.id).collect())
    }

    /// Distinct `doc_id` values across all stored chunks.
    pub async fn list_documents(&self) -> Result<BTreeSet<String>> {
        let records = self.backend.get(None).await?;
        Ok(records
            .iter()
            .filter_map(|r| r.doc_id().map(str::to_string))
            .collect())
    }

    /// Collection-wide counters: backend record count plus the distinct
    /// document set.
    pub async fn stats(&self) -> Result<CollectionStats> {
        let total_chunks = self.backend.count().await?;
        let documents = self.list_documents().await?;
        Ok(CollectionStats {
            total_chunks,
            total_documents: documents.len(),
            documents,
        })
    }
}

/// A staged twin of a final chunk record: temporary id, no `doc_id`
/// field, so it is invisible to document-scoped reads until finalized.
fn staged_copy(chunk: &ChunkRecord, staging_id: &str, index: usize) -> ChunkRecord {
    let mut metadata = Metadata::new();
    metadata.insert(FIELD_STAGING.to_string(), staging_id.into());
    ChunkRecord {
        id: format!("staged_{}_{}", staging_id, index),
        text: chunk.text.clone(),
        hash: chunk.hash.clone(),
        metadata,
    }
}
