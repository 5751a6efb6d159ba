//! Free-text query over the chunk collection.
//!
//! [`QueryEngine`] is a thin, stateless translation layer: it hands the
//! query text to the backend's similarity search and reshapes the hits
//! into three parallel sequences (texts, metadata, distances) in
//! ascending-distance order.

use std::sync::Arc;

use crate::backend::VectorBackend;
use crate::error::Result;
use crate::models::QueryResponse;

/// Translates free-text queries into ranked chunk results.
pub struct QueryEngine {
    backend: Arc<dyn VectorBackend>,
}

impl QueryEngine {
    pub fn new(backend: Arc<dyn VectorBackend>) -> Self {
        Self { backend }
    }

    /// Up to `n_results` nearest chunks to `query_text`.
    ///
    /// An empty collection, or `n_results` exceeding the corpus size, is
    /// not an error: the response simply carries fewer entries (possibly
    /// zero). Staged records from an in-flight update are dropped from
    /// the response.
    pub async fn query(&self, query_text: &str, n_results: usize) -> Result<QueryResponse> {
        let hits = self.backend.query(query_text, n_results).await?;

        let mut results = Vec::with_capacity(hits.len());
        let mut metadatas = Vec::with_capacity(hits.len());
        let mut distances = Vec::with_capacity(hits.len());

        for hit in hits {
            if hit.record.doc_id().is_none() {
                continue;
            }
            results.push(hit.record.text);
            metadatas.push(hit.record.metadata);
            distances.push(hit.distance);
        }

        Ok(QueryResponse {
            query: query_text.to_string(),
            results,
            metadatas,
            distances,
        })
    }
}

/// Display-only relevance transform: `1 − distance`.
///
/// Only meaningful when the backend's distance metric is bounded — the
/// bundled backends report cosine distance in `[0, 2]`, so relevance
/// falls in `[-1, 1]` with higher meaning more similar. For an
/// unbounded metric this number carries no meaning; keep the raw
/// distance instead.
pub fn relevance(distance: f32) -> f32 {
    1.0 - distance
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::chunk::ChunkParams;
    use crate::embedding::HashEmbedder;
    use crate::models::Metadata;
    use crate::store::DocumentStore;

    fn engine_and_store() -> (QueryEngine, DocumentStore) {
        let backend: Arc<dyn crate::backend::VectorBackend> =
            Arc::new(MemoryBackend::new(Box::new(HashEmbedder::default())));
        (
            QueryEngine::new(Arc::clone(&backend)),
            DocumentStore::new(backend, ChunkParams::default()),
        )
    }

    #[tokio::test]
    async fn test_empty_collection_returns_empty_response() {
        let (engine, _store) = engine_and_store();
        let resp = engine.query("anything at all", 5).await.unwrap();
        assert!(resp.is_empty());
        assert_eq!(resp.query, "anything at all");
        assert!(resp.metadatas.is_empty());
        assert!(resp.distances.is_empty());
    }

    #[tokio::test]
    async fn test_parallel_sequences_ascending_distance() {
        let (engine, store) = engine_and_store();
        store
            .index_document("rust", "The borrow checker enforces ownership.", Metadata::new())
            .await
            .unwrap();
        store
            .index_document("cooking", "Simmer the sauce over low heat.", Metadata::new())
            .await
            .unwrap();

        let resp = engine.query("ownership and the borrow checker", 10).await.unwrap();
        assert_eq!(resp.len(), 2);
        assert_eq!(resp.results.len(), resp.metadatas.len());
        assert_eq!(resp.results.len(), resp.distances.len());
        assert!(resp.distances[0] <= resp.distances[1]);
        assert_eq!(
            resp.metadatas[0].get("doc_id").and_then(|v| v.as_str()),
            Some("rust")
        );
    }

    #[tokio::test]
    async fn test_n_results_truncates() {
        let (engine, store) = engine_and_store();
        for i in 0..4 {
            store
                .index_document(
                    &format!("doc{}", i),
                    &format!("Common words plus number {}.", i),
                    Metadata::new(),
                )
                .await
                .unwrap();
        }
        let resp = engine.query("common words", 2).await.unwrap();
        assert_eq!(resp.len(), 2);
    }

    #[test]
    fn test_relevance_transform() {
        assert_eq!(relevance(0.0), 1.0);
        assert_eq!(relevance(1.0), 0.0);
        assert_eq!(relevance(2.0), -1.0);
    }
}
