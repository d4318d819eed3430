use crate::error::IndexError;
use crate::models::{IndexEntry, RetrievalHit};
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Top-k nearest-neighbor search over chunk vectors by cosine similarity.
///
/// The contract is backend-agnostic on purpose: an external ANN service can
/// substitute for [`InMemoryIndex`] without touching any caller.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Adds entries. The first upsert establishes the index dimension;
    /// entries with any other dimension are rejected, never truncated.
    async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<(), IndexError>;

    /// Returns up to `top_k` entries by descending similarity, ties broken
    /// by lower chunk index. `top_k` larger than the entry count is clamped.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<RetrievalHit>, IndexError>;

    /// Drops all entries and the established dimension.
    async fn clear(&self) -> Result<(), IndexError>;

    async fn count(&self) -> usize;
}

/// Cosine similarity `(a·b) / (‖a‖‖b‖)`, in [-1, 1].
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, IndexError> {
    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(IndexError::DegenerateVector);
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    Ok(dot / (norm_a * norm_b))
}

fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|value| value * value).sum::<f32>().sqrt()
}

#[derive(Default)]
struct IndexState {
    dimension: Option<usize>,
    entries: Vec<IndexEntry>,
}

/// Linear-scan [`VectorIndex`]; O(n·d) per query, which is fine at
/// single-document scale.
#[derive(Default)]
pub struct InMemoryIndex {
    state: RwLock<IndexState>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<(), IndexError> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut state = self.state.write().await;
        let expected = state.dimension.unwrap_or(entries[0].vector.len());

        for entry in &entries {
            if entry.vector.len() != expected {
                return Err(IndexError::DimensionMismatch {
                    expected,
                    got: entry.vector.len(),
                });
            }
            if l2_norm(&entry.vector) == 0.0 {
                return Err(IndexError::DegenerateVector);
            }
        }

        state.dimension = Some(expected);
        state.entries.extend(entries);
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<RetrievalHit>, IndexError> {
        let state = self.state.read().await;
        if state.entries.is_empty() {
            return Err(IndexError::EmptyIndex);
        }

        if let Some(expected) = state.dimension {
            if vector.len() != expected {
                return Err(IndexError::DimensionMismatch {
                    expected,
                    got: vector.len(),
                });
            }
        }

        let mut hits = Vec::with_capacity(state.entries.len());
        for entry in &state.entries {
            let score = cosine_similarity(vector, &entry.vector)?;
            hits.push(RetrievalHit {
                chunk: entry.chunk.clone(),
                score,
            });
        }

        hits.sort_by(|left, right| {
            right
                .score
                .total_cmp(&left.score)
                .then_with(|| left.chunk.chunk_index.cmp(&right.chunk.chunk_index))
        });
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn clear(&self) -> Result<(), IndexError> {
        let mut state = self.state.write().await;
        state.entries.clear();
        state.dimension = None;
        Ok(())
    }

    async fn count(&self) -> usize {
        self.state.read().await.entries.len()
    }
}
