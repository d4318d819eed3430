use crate::failure::FailureKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of the active document. Rebuilt wholesale on every upload;
/// an upload replaces the previous document, it never merges into it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFingerprint {
    /// SHA-256 of the uploaded bytes.
    pub document_id: String,
    pub source_name: String,
    pub page_count: usize,
    pub ingested_at: DateTime<Utc>,
}

/// A bounded text window drawn from a single page; the atomic retrieval unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Insertion order across the whole document: page order, then window
    /// order, starting at 0.
    pub chunk_index: u64,
    /// 1-based source page, carried through to citations.
    pub page: u32,
    pub text: String,
}

/// A chunk paired with its embedding, as stored by a vector index.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// One ranked retrieval match. `score` is plain cosine similarity in [-1, 1].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalHit {
    pub chunk: Chunk,
    pub score: f32,
}

/// Generated answer text plus the source pages of the chunks that were
/// actually placed in the prompt, in rank order.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub citation_pages: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedChunk {
    pub chunk_index: u64,
    pub kind: FailureKind,
}

/// Outcome of one ingestion. `indexed_count < chunk_count` means partial
/// completion: the successfully embedded chunks were kept and indexed,
/// the rest are listed in `failed_chunks`.
#[derive(Debug, Clone, Serialize)]
pub struct IngestionReport {
    pub document_id: String,
    pub page_count: usize,
    pub chunk_count: usize,
    pub indexed_count: usize,
    pub failed_chunks: Vec<FailedChunk>,
}

impl IngestionReport {
    pub fn is_complete(&self) -> bool {
        self.failed_chunks.is_empty()
    }
}
