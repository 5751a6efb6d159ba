//! Error types for the indexing and retrieval pipeline.
//!
//! [`IndexerError`] is the crate-wide error type. Failures inside a batch
//! are *not* represented here: a batch collects per-item errors into a
//! [`BatchReport`](crate::batch::BatchReport) and reports partial success
//! instead of aborting.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, IndexerError>;

/// Top-level error taxonomy.
#[derive(Debug, Error)]
pub enum IndexerError {
    /// A referenced document or source file does not exist. Surfaced to
    /// the caller directly; never retried.
    #[error("document not found: {0}")]
    NotFound(String),

    /// The vector backend could not be reached or initialized. Fatal at
    /// startup; requires operator action, no automatic retry.
    #[error("vector backend unavailable: {0}")]
    BackendUnavailable(String),

    /// An insert targeted an id that already has records. A conflict,
    /// never a silent merge — callers re-indexing a document must use
    /// `update_document`.
    #[error("duplicate id: {0}")]
    DuplicateId(String),

    /// An update failed after the old chunk set was removed but before
    /// the replacement was in place. The document is absent until
    /// re-indexed; callers can confirm by re-listing documents.
    #[error("update left document '{doc_id}' absent: {reason}")]
    UpdateInconsistency { doc_id: String, reason: String },

    /// Invalid construction parameters or configuration values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Text extraction failed.
    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// Any other storage or embedding failure reported by the backend.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Extraction error. No strategy panics; the batch pipeline records the
/// error and moves on to the next item.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported content-type: {0}")]
    UnsupportedContentType(String),

    /// A strategy supports the content type but reported itself
    /// unavailable at startup, and no lower-ranked strategy covers it.
    #[error("no extraction strategy available for {0}")]
    NoStrategy(String),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("OOXML extraction failed: {0}")]
    Ooxml(String),

    #[error("text decoding failed: {0}")]
    Encoding(String),
}
