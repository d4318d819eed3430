use crate::chunking::{chunk_pages, ChunkingConfig};
use crate::embeddings::TextEmbedder;
use crate::error::IngestError;
use crate::extractor::TextExtractor;
use crate::failure::{FailureKind, ProviderFailure};
use crate::index::{InMemoryIndex, VectorIndex};
use crate::models::{Chunk, DocumentFingerprint, FailedChunk, IndexEntry, IngestionReport};
use crate::store::DocumentStore;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, warn};

pub const DEFAULT_EMBED_CONCURRENCY: usize = 4;

/// One upload end to end: extract pages, chunk, embed under a bounded
/// fan-out, build a fresh index off to the side, swap it into the store.
///
/// Embedding failures are recorded per chunk. A partially embedded document
/// still replaces the active one (prior successes are kept and indexed) and
/// the report lists the failing chunk indices. Only a document with no
/// successfully embedded chunk at all fails the ingest outright, leaving the
/// previous document active.
pub struct IngestionPipeline {
    extractor: Arc<dyn TextExtractor>,
    embedder: Arc<dyn TextEmbedder>,
    store: Arc<DocumentStore>,
    chunking: ChunkingConfig,
    concurrency: usize,
}

impl IngestionPipeline {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        embedder: Arc<dyn TextEmbedder>,
        store: Arc<DocumentStore>,
        chunking: ChunkingConfig,
    ) -> Self {
        Self {
            extractor,
            embedder,
            store,
            chunking,
            concurrency: DEFAULT_EMBED_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub async fn ingest_bytes(
        &self,
        bytes: &[u8],
        source_name: &str,
    ) -> Result<IngestionReport, IngestError> {
        let pages = self.extractor.extract(bytes)?;
        let fingerprint = DocumentFingerprint {
            document_id: digest_bytes(bytes),
            source_name: source_name.to_string(),
            page_count: pages.len(),
            ingested_at: Utc::now(),
        };

        let chunks = chunk_pages(&pages, self.chunking);
        if chunks.is_empty() {
            return Err(IngestError::Unparseable(format!(
                "document has no chunkable text: {source_name}"
            )));
        }
        let chunk_count = chunks.len();

        let (entries, failed_chunks, first_failure) = self.embed_chunks(chunks).await;
        let indexed_count = entries.len();

        if entries.is_empty() {
            let failure = first_failure.unwrap_or_else(|| {
                ProviderFailure::new(
                    "embedding-gateway",
                    FailureKind::Fatal,
                    "no chunk produced an embedding",
                )
            });
            warn!(document = %fingerprint.document_id, error = %failure, "ingestion embedded nothing");
            return Err(IngestError::Provider(failure));
        }

        let index = InMemoryIndex::new();
        index.upsert(entries).await?;
        self.store.replace(fingerprint.clone(), Arc::new(index)).await;

        if !failed_chunks.is_empty() {
            warn!(
                document = %fingerprint.document_id,
                failed = failed_chunks.len(),
                "some chunks were not embedded"
            );
        }
        info!(
            document = %fingerprint.document_id,
            pages = fingerprint.page_count,
            chunks = chunk_count,
            indexed = indexed_count,
            "document ingested"
        );

        Ok(IngestionReport {
            document_id: fingerprint.document_id,
            page_count: fingerprint.page_count,
            chunk_count,
            indexed_count,
            failed_chunks,
        })
    }

    /// Embeds every chunk, at most `concurrency` remote calls in flight.
    /// Each result lands in its own entry keyed by chunk index, so
    /// completion order never matters. The first quota rejection stops new
    /// calls from being issued; the chunks that never ran are reported as
    /// quota failures.
    async fn embed_chunks(
        &self,
        chunks: Vec<Chunk>,
    ) -> (Vec<IndexEntry>, Vec<FailedChunk>, Option<ProviderFailure>) {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let quota_hit = Arc::new(AtomicBool::new(false));

        let mut handles = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let semaphore = Arc::clone(&semaphore);
            let quota_hit = Arc::clone(&quota_hit);
            let embedder = Arc::clone(&self.embedder);
            let chunk_index = chunk.chunk_index;

            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.map_err(|error| {
                    ProviderFailure::new("embedding-gateway", FailureKind::Transient, error.to_string())
                })?;

                if quota_hit.load(Ordering::SeqCst) {
                    return Err(ProviderFailure::new(
                        "embedding-gateway",
                        FailureKind::QuotaExceeded,
                        "skipped after quota was exhausted",
                    ));
                }

                match embedder.embed(&chunk.text).await {
                    Ok(vector) => Ok(IndexEntry { chunk, vector }),
                    Err(failure) => {
                        if failure.kind == FailureKind::QuotaExceeded {
                            quota_hit.store(true, Ordering::SeqCst);
                        }
                        Err(failure)
                    }
                }
            });
            handles.push((chunk_index, handle));
        }

        let mut entries = Vec::new();
        let mut failed_chunks = Vec::new();
        let mut first_failure = None;

        for (chunk_index, handle) in handles {
            match handle.await {
                Ok(Ok(entry)) => entries.push(entry),
                Ok(Err(failure)) => {
                    warn!(chunk = chunk_index, error = %failure, "chunk embedding failed");
                    if first_failure.is_none() {
                        first_failure = Some(failure.clone());
                    }
                    failed_chunks.push(FailedChunk {
                        chunk_index,
                        kind: failure.kind,
                    });
                }
                Err(join_error) => {
                    warn!(chunk = chunk_index, error = %join_error, "embedding task aborted");
                    if first_failure.is_none() {
                        first_failure = Some(ProviderFailure::new(
                            "embedding-gateway",
                            FailureKind::Fatal,
                            join_error.to_string(),
                        ));
                    }
                    failed_chunks.push(FailedChunk {
                        chunk_index,
                        kind: FailureKind::Fatal,
                    });
                }
            }
        }

        (entries, failed_chunks, first_failure)
    }
}

fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
