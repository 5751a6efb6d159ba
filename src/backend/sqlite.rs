//! SQLite-backed [`VectorBackend`].
//!
//! Chunks live in a `chunks` table, embeddings in `chunk_vectors` as
//! little-endian f32 BLOBs. Similarity search embeds the query and
//! scores cosine distance in Rust over the fetched vectors — adequate
//! for the corpus sizes this crate targets, with no extension module
//! required.
//!
//! [`SqliteBackend::open`] failures surface as
//! [`BackendUnavailable`](crate::error::IndexerError::BackendUnavailable):
//! fatal at startup, corrected by operator action, never retried
//! automatically.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob, Embedder};
use crate::error::{IndexerError, Result};
use crate::models::{ChunkRecord, Metadata, ScoredChunk, FIELD_DOC_ID};

use super::{MetadataFilter, VectorBackend};

fn db_err(e: sqlx::Error) -> IndexerError {
    IndexerError::Backend(e.to_string())
}

/// Persistent vector store over a single SQLite file.
pub struct SqliteBackend {
    pool: SqlitePool,
    embedder: Box<dyn Embedder>,
}

impl std::fmt::Debug for SqliteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteBackend").finish_non_exhaustive()
    }
}

impl SqliteBackend {
    /// Open (or create) the database at `path` and run migrations.
    pub async fn open(path: &Path, embedder: Box<dyn Embedder>) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| IndexerError::BackendUnavailable(e.to_string()))?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(|e| IndexerError::BackendUnavailable(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| IndexerError::BackendUnavailable(e.to_string()))?;

        run_migrations(&pool)
            .await
            .map_err(|e| IndexerError::BackendUnavailable(e.to_string()))?;

        Ok(Self { pool, embedder })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

async fn run_migrations(pool: &SqlitePool) -> std::result::Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunks (
            id TEXT PRIMARY KEY,
            doc_id TEXT,
            chunk_index INTEGER,
            text TEXT NOT NULL,
            hash TEXT NOT NULL,
            metadata_json TEXT NOT NULL DEFAULT '{}'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunk_vectors (
            chunk_id TEXT PRIMARY KEY,
            embedding BLOB NOT NULL,
            FOREIGN KEY (chunk_id) REFERENCES chunks(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_doc_id ON chunks(doc_id)")
        .execute(pool)
        .await?;

    Ok(())
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> ChunkRecord {
    let metadata_json: String = row.get("metadata_json");
    let metadata: Metadata = serde_json::from_str(&metadata_json).unwrap_or_default();
    ChunkRecord {
        id: row.get("id"),
        text: row.get("text"),
        hash: row.get("hash"),
        metadata,
    }
}

#[async_trait]
impl VectorBackend for SqliteBackend {
    async fn add(&self, records: Vec<ChunkRecord>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = records.iter().map(|r| r.text.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;

        let mut batch_ids = std::collections::HashSet::new();
        for record in &records {
            if !batch_ids.insert(record.id.as_str()) {
                return Err(IndexerError::DuplicateId(record.id.clone()));
            }
        }

        // One transaction: either every record lands or none do.
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        for record in &records {
            let existing: Option<String> = sqlx::query_scalar("SELECT id FROM chunks WHERE id = ?")
                .bind(&record.id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_err)?;
            if existing.is_some() {
                return Err(IndexerError::DuplicateId(record.id.clone()));
            }
        }

        for (record, vector) in records.iter().zip(&vectors) {
            let metadata_json = serde_json::to_string(&record.metadata)
                .map_err(|e| IndexerError::Backend(e.to_string()))?;
            let doc_id = record.doc_id().map(str::to_string);
            let chunk_index = record.chunk_index().map(|i| i as i64);

            sqlx::query(
                r#"
                INSERT INTO chunks (id, doc_id, chunk_index, text, hash, metadata_json)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&record.id)
            .bind(&doc_id)
            .bind(chunk_index)
            .bind(&record.text)
            .bind(&record.hash)
            .bind(&metadata_json)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

            sqlx::query("INSERT INTO chunk_vectors (chunk_id, embedding) VALUES (?, ?)")
                .bind(&record.id)
                .bind(vec_to_blob(vector))
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn get(&self, filter: Option<&MetadataFilter>) -> Result<Vec<ChunkRecord>> {
        // doc_id has its own column; other fields fall back to matching
        // the parsed metadata in Rust.
        if let Some(f) = filter {
            if f.field() == FIELD_DOC_ID {
                if let Some(doc_id) = f.value().as_str() {
                    let rows = sqlx::query(
                        "SELECT id, text, hash, metadata_json FROM chunks WHERE doc_id = ?",
                    )
                    .bind(doc_id)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(db_err)?;
                    return Ok(rows.iter().map(row_to_record).collect());
                }
            }
        }

        let rows = sqlx::query("SELECT id, text, hash, metadata_json FROM chunks")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(rows
            .iter()
            .map(row_to_record)
            .filter(|r| filter.is_none_or(|f| f.matches(&r.metadata)))
            .collect())
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        for id in ids {
            sqlx::query("DELETE FROM chunk_vectors WHERE chunk_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
            sqlx::query("DELETE FROM chunks WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
        }
        tx.commit().await.map_err(db_err)?;
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

        let rows = sqlx::query(
            r#"
            SELECT c.id, c.text, c.hash, c.metadata_json, v.embedding
            FROM chunks c
            JOIN chunk_vectors v ON v.chunk_id = c.id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut hits: Vec<ScoredChunk> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let vector = blob_to_vec(&blob);
                ScoredChunk {
                    record: row_to_record(row),
                    distance: 1.0 - cosine_similarity(&query_vec, &vector),
                }
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
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(count as usize)
    }
}
