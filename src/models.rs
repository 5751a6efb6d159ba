//! Core data models shared across the chunking and retrieval pipeline.
//!
//! A document is never stored as a single record: its identity is the set
//! of chunks whose metadata carries its `doc_id`. [`ChunkRecord`] is the
//! unit the vector backend stores and searches.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Chunk metadata: string keys to JSON scalar values.
///
/// Caller-supplied metadata is merged with the reserved fields `doc_id`,
/// `chunk_id`, and `chunk_index`; reserved fields always win over
/// caller-supplied values of the same name.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Reserved metadata field naming the owning document.
pub const FIELD_DOC_ID: &str = "doc_id";
/// Reserved metadata field carrying the deterministic chunk id.
pub const FIELD_CHUNK_ID: &str = "chunk_id";
/// Reserved metadata field carrying the zero-based chunk ordinal.
pub const FIELD_CHUNK_INDEX: &str = "chunk_index";

/// A stored chunk: the unit of vector search.
///
/// Never created directly by callers — derived from a document by
/// [`build_chunks`](crate::chunk::build_chunks).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Deterministic id, `"{doc_id}_chunk_{index}"` for finalized
    /// records. Unique across the collection as long as `doc_id`s are
    /// unique and no `doc_id` embeds another's chunk-id pattern.
    pub id: String,
    /// Trimmed substring of the source document.
    pub text: String,
    /// SHA-256 hex of `text`, for staleness detection.
    pub hash: String,
    /// Merged caller + reserved metadata.
    pub metadata: Metadata,
}

impl ChunkRecord {
    /// Owning document id, if this is a finalized (non-staged) record.
    pub fn doc_id(&self) -> Option<&str> {
        self.metadata.get(FIELD_DOC_ID).and_then(|v| v.as_str())
    }

    /// Zero-based ordinal within the owning document.
    pub fn chunk_index(&self) -> Option<u64> {
        self.metadata.get(FIELD_CHUNK_INDEX).and_then(|v| v.as_u64())
    }
}

/// A chunk paired with its backend-reported distance to a query.
///
/// Lower distance means more similar.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub record: ChunkRecord,
    pub distance: f32,
}

/// Ranked response for one free-text query: three parallel sequences in
/// ascending-distance order, plus the echoed query text.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub query: String,
    pub results: Vec<String>,
    pub metadatas: Vec<Metadata>,
    pub distances: Vec<f32>,
}

impl QueryResponse {
    /// Number of returned results (0 up to the requested count).
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Collection-wide counters returned by
/// [`DocumentStore::stats`](crate::store::DocumentStore::stats).
#[derive(Debug, Clone, Serialize)]
pub struct CollectionStats {
    pub total_chunks: usize,
    pub total_documents: usize,
    pub documents: BTreeSet<String>,
}
