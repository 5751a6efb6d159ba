//! In-memory [`VectorBackend`] for tests and small embedded corpora.
//!
//! Records live in a `Vec` behind `std::sync::RwLock`. Search is
//! brute-force cosine over all stored vectors; the backend embeds chunk
//! and query text through an injected [`Embedder`]. Distances are cosine
//! distance `1 − cos`, bounded in `[0, 2]`.

use std::collections::HashSet;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::embedding::{cosine_similarity, Embedder};
use crate::error::{IndexerError, Result};
use crate::models::{ChunkRecord, ScoredChunk};

use super::{MetadataFilter, VectorBackend};

struct StoredChunk {
    record: ChunkRecord,
    vector: Vec<f32>,
}

/// Brute-force in-memory vector store.
pub struct MemoryBackend {
    records: RwLock<Vec<StoredChunk>>,
    embedder: Box<dyn Embedder>,
}

impl MemoryBackend {
    pub fn new(embedder: Box<dyn Embedder>) -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            embedder,
        }
    }
}

#[async_trait]
impl VectorBackend for MemoryBackend {
    async fn add(&self, records: Vec<ChunkRecord>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        // Embed before taking the lock; the lock is never held across
        // an await point.
        let texts: Vec<String> = records.iter().map(|r| r.text.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;

        let mut stored = self.records.write().unwrap();

        let mut batch_ids = HashSet::new();
        for record in &records {
            if !batch_ids.insert(record.id.as_str()) {
                return Err(IndexerError::DuplicateId(record.id.clone()));
            }
            if stored.iter().any(|s| s.record.id == record.id) {
                return Err(IndexerError::DuplicateId(record.id.clone()));
            }
        }

        for (record, vector) in records.into_iter().zip(vectors) {
            stored.push(StoredChunk { record, vector });
        }
        Ok(())
    }

    async fn get(&self, filter: Option<&MetadataFilter>) -> Result<Vec<ChunkRecord>> {
        let stored = self.records.read().unwrap();
        Ok(stored
            .iter()
            .filter(|s| filter.is_none_or(|f| f.matches(&s.record.metadata)))
            .map(|s| s.record.clone())
            .collect())
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let targets: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let mut stored = self.records.write().unwrap();
        stored.retain(|s| !targets.contains(s.record.id.as_str()));
        Ok(())
    }

    async fn query(&self, text: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        let query_vec = self
            .embedder
            .embed(std::slice::from_ref(&text.to_string()))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| IndexerError::Backend("empty embedding response".to_string()))?;

        let stored = self.records.read().unwrap();

        let mut hits: Vec<ScoredChunk> = stored
            .iter()
            .map(|s| ScoredChunk {
                record: s.record.clone(),
                distance: 1.0 - cosine_similarity(&query_vec, &s.vector),
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        Ok(hits)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.records.read().unwrap().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;
    use crate::models::Metadata;

    fn backend() -> MemoryBackend {
        MemoryBackend::new(Box::new(HashEmbedder::default()))
    }

    fn record(id: &str, doc_id: &str, text: &str) -> ChunkRecord {
        let mut metadata = Metadata::new();
        metadata.insert("doc_id".to_string(), doc_id.into());
        ChunkRecord {
            id: id.to_string(),
            text: text.to_string(),
            hash: crate::chunk::hash_text(text),
            metadata,
        }
    }

    #[tokio::test]
    async fn test_add_get_count() {
        let b = backend();
        b.add(vec![
            record("a_chunk_0", "a", "alpha text"),
            record("a_chunk_1", "a", "more alpha"),
            record("b_chunk_0", "b", "beta text"),
        ])
        .await
        .unwrap();

        assert_eq!(b.count().await.unwrap(), 3);
        let a_chunks = b.get(Some(&MetadataFilter::doc_id("a"))).await.unwrap();
        assert_eq!(a_chunks.len(), 2);
        let all = b.get(None).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_add_duplicate_id_is_all_or_nothing() {
        let b = backend();
        b.add(vec![record("x_chunk_0", "x", "first")])
            .await
            .unwrap();

        let err = b
            .add(vec![
                record("y_chunk_0", "y", "fresh"),
                record("x_chunk_0", "x", "colliding"),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, IndexerError::DuplicateId(_)));

        // The failed batch must not have written anything.
        assert_eq!(b.count().await.unwrap(), 1);
        assert!(b
            .get(Some(&MetadataFilter::doc_id("y")))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_id_is_noop() {
        let b = backend();
        b.add(vec![record("a_chunk_0", "a", "text")]).await.unwrap();
        b.delete(&["nope".to_string()]).await.unwrap();
        assert_eq!(b.count().await.unwrap(), 1);
        b.delete(&["a_chunk_0".to_string()]).await.unwrap();
        assert_eq!(b.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_query_orders_by_distance() {
        let b = backend();
        b.add(vec![
            record("a_chunk_0", "a", "rust borrow checker ownership"),
            record("b_chunk_0", "b", "gardening tomatoes in spring"),
        ])
        .await
        .unwrap();

        let hits = b.query("rust ownership", 10).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].record.doc_id(), Some("a"));
        assert!(hits[0].distance <= hits[1].distance);
        for h in &hits {
            assert!((0.0..=2.0).contains(&h.distance));
        }
    }

    #[tokio::test]
    async fn test_query_empty_collection_returns_empty() {
        let b = backend();
        let hits = b.query("anything", 5).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_query_k_larger_than_corpus() {
        let b = backend();
        b.add(vec![record("a_chunk_0", "a", "only one")])
            .await
            .unwrap();
        let hits = b.query("one", 50).await.unwrap();
        assert_eq!(hits.len(), 1);
    }
}
