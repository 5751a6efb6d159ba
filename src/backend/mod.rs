//! Vector backend abstraction.
//!
//! The [`VectorBackend`] trait is the required capability surface of the
//! external component that embeds chunk text and performs similarity
//! search. The document lifecycle and the query engine speak only this
//! trait, so backends are pluggable.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`add`](VectorBackend::add) | Insert new records; fails on existing ids |
//! | [`get`](VectorBackend::get) | Fetch records by metadata equality filter |
//! | [`delete`](VectorBackend::delete) | Remove records by id (missing id is a no-op) |
//! | [`query`](VectorBackend::query) | Nearest records to a text, ascending distance |
//! | [`count`](VectorBackend::count) | Total record count |

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ChunkRecord, Metadata, ScoredChunk};

pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

/// Equality filter over one metadata field.
#[derive(Debug, Clone)]
pub struct MetadataFilter {
    field: String,
    value: serde_json::Value,
}

impl MetadataFilter {
    pub fn equals(field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Filter for all chunks belonging to one document.
    pub fn doc_id(id: &str) -> Self {
        Self::equals(crate::models::FIELD_DOC_ID, id)
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn value(&self) -> &serde_json::Value {
        &self.value
    }

    /// Whether a record's metadata satisfies this filter.
    pub fn matches(&self, metadata: &Metadata) -> bool {
        metadata.get(&self.field) == Some(&self.value)
    }
}

/// Abstract vector store: embeds text and performs similarity search.
///
/// # Contract
///
/// - `add` must fail — not silently overwrite — if any id already
///   exists, and must leave the store unchanged on failure
///   (all-or-nothing within one call).
/// - `delete` of a non-existent id is a no-op.
/// - `query` returns 0 up to `min(k, corpus size)` results in ascending
///   distance order; an empty collection is not an error.
#[async_trait]
pub trait VectorBackend: Send + Sync {
    /// Insert new records. Fails with
    /// [`DuplicateId`](crate::error::IndexerError::DuplicateId) if any
    /// record id already exists; nothing is written in that case.
    async fn add(&self, records: Vec<ChunkRecord>) -> Result<()>;

    /// All records whose metadata matches the filter; all records when
    /// `filter` is `None`.
    async fn get(&self, filter: Option<&MetadataFilter>) -> Result<Vec<ChunkRecord>>;

    /// Remove records by id. Missing ids are skipped silently.
    async fn delete(&self, ids: &[String]) -> Result<()>;

    /// Up to `k` nearest records to `text`, ascending by distance.
    async fn query(&self, text: &str, k: usize) -> Result<Vec<ScoredChunk>>;

    /// Total record count in the collection.
    async fn count(&self) -> Result<usize>;
}
