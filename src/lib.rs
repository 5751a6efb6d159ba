//! # RAG Indexer
//!
//! A document chunking and vector-retrieval library: long text goes in,
//! overlapping boundary-aware chunks come out, stored behind a pluggable
//! vector backend with a document-level lifecycle and free-text query on
//! top.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌──────────┐   ┌───────────────┐
//! │ Extractor │──▶│ Document │──▶│ VectorBackend │
//! │ PDF/DOCX  │   │  Store   │   │ memory/sqlite │
//! └───────────┘   └──────────┘   └───────┬───────┘
//!                      ▲                 │
//!                 ┌────┴─────┐     ┌─────▼─────┐
//!                 │  Batch   │     │   Query   │
//!                 │ +Registry│     │  Engine   │
//!                 └──────────┘     └───────────┘
//! ```
//!
//! A document is the aggregate of its chunks: indexing splits content
//! and stores chunk records keyed by the deterministic id
//! `"{doc_id}_chunk_{index}"`; deleting removes every record carrying
//! the document's id; listing groups stored metadata back into document
//! ids. There is no session state anywhere — every operation is a
//! request/response against the backend.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use rag_indexer::backend::MemoryBackend;
//! use rag_indexer::chunk::ChunkParams;
//! use rag_indexer::embedding::HashEmbedder;
//! use rag_indexer::models::Metadata;
//! use rag_indexer::query::QueryEngine;
//! use rag_indexer::store::DocumentStore;
//!
//! # async fn run() -> rag_indexer::error::Result<()> {
//! let backend = Arc::new(MemoryBackend::new(Box::new(HashEmbedder::default())));
//! let store = DocumentStore::new(backend.clone(), ChunkParams::default());
//! let engine = QueryEngine::new(backend);
//!
//! store.index_document("paper", "Long text...", Metadata::new()).await?;
//! let hits = engine.query("text", 5).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`chunk`] | Boundary-aware overlapping text splitting |
//! | [`models`] | Core data types |
//! | [`backend`] | Vector backend trait + memory/SQLite implementations |
//! | [`embedding`] | Embedder trait and implementations |
//! | [`store`] | Document lifecycle (index/update/delete/list/stats) |
//! | [`query`] | Free-text query over the chunk collection |
//! | [`extract`] | Ranked text-extraction strategies |
//! | [`batch`] | Multi-document ingestion with partial-failure reports |
//! | [`tasks`] | Pollable batch task registry |
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Error taxonomy |

pub mod backend;
pub mod batch;
pub mod chunk;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod models;
pub mod query;
pub mod store;
pub mod tasks;

pub use backend::{MemoryBackend, MetadataFilter, SqliteBackend, VectorBackend};
pub use chunk::ChunkParams;
pub use error::{IndexerError, Result};
pub use models::{ChunkRecord, CollectionStats, Metadata, QueryResponse};
pub use query::QueryEngine;
pub use store::DocumentStore;
