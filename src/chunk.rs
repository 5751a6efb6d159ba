//! Sentence-boundary text chunker.
//!
//! Splits document text into overlapping chunks of at most `chunk_size`
//! characters. When a window would cut mid-sentence, the split is pulled
//! back to the last `.` or newline in the window, provided that boundary
//! sits past the window's midpoint.
//!
//! [`split_text`] is a pure function of its inputs: no state, no I/O,
//! safe to test with literal strings. [`build_chunks`] layers the
//! deterministic id scheme and metadata merge on top.

use sha2::{Digest, Sha256};

use crate::error::{IndexerError, Result};
use crate::models::{ChunkRecord, Metadata, FIELD_CHUNK_ID, FIELD_CHUNK_INDEX, FIELD_DOC_ID};

/// Validated chunking parameters.
///
/// Construction enforces `chunk_size > 0` and `overlap < chunk_size`; an
/// overlap reaching the window size would stall or reverse the cursor.
/// Both values are counted in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkParams {
    chunk_size: usize,
    overlap: usize,
}

impl ChunkParams {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(IndexerError::InvalidConfig(
                "chunk_size must be > 0".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(IndexerError::InvalidConfig(format!(
                "overlap ({}) must be strictly less than chunk_size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }
}

impl Default for ChunkParams {
    /// 1000-character windows with a 200-character overlap.
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
        }
    }
}

/// Split text into overlapping, boundary-aware chunks.
///
/// Each step takes the window `text[start .. start + chunk_size]`
/// (character counts). If the window does not reach the end of the text
/// and its last `.` or newline sits past `chunk_size / 2`, the window is
/// truncated to end right after that character. The chunk is trimmed and
/// emitted only if non-empty; the cursor then advances to
/// `window_end - overlap`.
///
/// # Guarantees
///
/// - Every emitted chunk is at most `chunk_size` characters and
///   non-empty after trimming.
/// - Consecutive chunks share at most `overlap` characters.
/// - The final chunk may be shorter than `chunk_size`.
/// - Deterministic: equal inputs produce equal output.
///
/// Slicing is done over a char-offset table, so multi-byte characters
/// are never split.
pub fn split_text(text: &str, params: &ChunkParams) -> Vec<String> {
    // Byte offset of every char boundary, plus an end sentinel.
    let offsets: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let total = offsets.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < total {
        let window_end = start + params.chunk_size;
        let mut effective_end = window_end;

        if window_end < total {
            let window = &text[offsets[start]..offsets[window_end]];
            if let Some(break_byte) = window.rfind(['.', '\n']) {
                let break_offset = window[..break_byte].chars().count();
                if break_offset > params.chunk_size / 2 {
                    // End the window right after the boundary character.
                    effective_end = start + break_offset + 1;
                }
            }
        }

        let slice_end = effective_end.min(total);
        let chunk = text[offsets[start]..offsets[slice_end]].trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }

        // Cursor must advance even when boundary truncation shrinks the
        // window below the overlap.
        let next = effective_end.saturating_sub(params.overlap);
        start = next.max(start + 1);
    }

    chunks
}

/// Deterministic chunk id: `"{doc_id}_chunk_{index}"`.
pub fn chunk_id(doc_id: &str, index: usize) -> String {
    format!("{}_chunk_{}", doc_id, index)
}

/// SHA-256 hex digest of a chunk's text.
pub fn hash_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Chunk a document and assemble the stored records.
///
/// Each record's metadata is the caller metadata merged with the
/// reserved fields `doc_id`, `chunk_id`, and `chunk_index`; the reserved
/// fields overwrite caller-supplied values of the same name.
pub fn build_chunks(
    doc_id: &str,
    content: &str,
    metadata: &Metadata,
    params: &ChunkParams,
) -> Vec<ChunkRecord> {
    split_text(content, params)
        .into_iter()
        .enumerate()
        .map(|(index, text)| {
            let id = chunk_id(doc_id, index);
            let mut merged = metadata.clone();
            merged.insert(FIELD_DOC_ID.to_string(), doc_id.into());
            merged.insert(FIELD_CHUNK_ID.to_string(), id.clone().into());
            merged.insert(FIELD_CHUNK_INDEX.to_string(), index.into());
            ChunkRecord {
                id,
                hash: hash_text(&text),
                text,
                metadata: merged,
            }
        })
        .collect()
}
