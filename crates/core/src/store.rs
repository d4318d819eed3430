use crate::index::VectorIndex;
use crate::models::DocumentFingerprint;
use std::sync::Arc;
use tokio::sync::RwLock;

/// The active document and its fully built index, immutable once installed.
pub struct ActiveDocument {
    pub fingerprint: DocumentFingerprint,
    pub index: Arc<dyn VectorIndex>,
}

/// Owns the single active document. Ingestion builds a new index entirely
/// off to the side and swaps one `Arc` here; readers clone the `Arc` and run
/// their whole query against that snapshot, so a query never observes a mix
/// of old and new chunks.
#[derive(Default)]
pub struct DocumentStore {
    active: RwLock<Option<Arc<ActiveDocument>>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn replace(&self, fingerprint: DocumentFingerprint, index: Arc<dyn VectorIndex>) {
        let mut active = self.active.write().await;
        *active = Some(Arc::new(ActiveDocument { fingerprint, index }));
    }

    pub async fn snapshot(&self) -> Option<Arc<ActiveDocument>> {
        self.active.read().await.clone()
    }

    pub async fn current(&self) -> Option<DocumentFingerprint> {
        self.active
            .read()
            .await
            .as_ref()
            .map(|active| active.fingerprint.clone())
    }

    pub async fn is_empty(&self) -> bool {
        self.active.read().await.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::DocumentStore;
    use crate::index::{InMemoryIndex, VectorIndex};
    use crate::models::{Chunk, DocumentFingerprint, IndexEntry};
    use std::sync::Arc;

    fn fingerprint(id: &str, pages: usize) -> DocumentFingerprint {
        DocumentFingerprint {
            document_id: id.to_string(),
            source_name: format!("{id}.pdf"),
            page_count: pages,
            ingested_at: chrono::Utc::now(),
        }
    }

    async fn single_entry_index(chunk_index: u64, page: u32, text: &str) -> Arc<InMemoryIndex> {
        let index = InMemoryIndex::new();
        index
            .upsert(vec![IndexEntry {
                chunk: Chunk {
                    chunk_index,
                    page,
                    text: text.to_string(),
                },
                vector: vec![1.0, 0.0],
            }])
            .await
            .expect("upsert succeeds");
        Arc::new(index)
    }

    #[tokio::test]
    async fn store_starts_empty() {
        let store = DocumentStore::new();
        assert!(store.is_empty().await);
        assert!(store.current().await.is_none());
        assert!(store.snapshot().await.is_none());
    }

    #[tokio::test]
    async fn replace_installs_the_document() {
        let store = DocumentStore::new();
        let index = single_entry_index(0, 1, "hello").await;
        store.replace(fingerprint("doc-a", 3), index).await;

        assert!(!store.is_empty().await);
        let current = store.current().await.expect("document present");
        assert_eq!(current.document_id, "doc-a");
        assert_eq!(current.page_count, 3);
    }

    #[tokio::test]
    async fn old_snapshot_stays_consistent_across_a_swap() {
        let store = DocumentStore::new();
        store
            .replace(fingerprint("doc-a", 1), single_entry_index(0, 1, "old text").await)
            .await;

        let held = store.snapshot().await.expect("snapshot present");

        store
            .replace(fingerprint("doc-b", 1), single_entry_index(0, 4, "new text").await)
            .await;

        // The held snapshot still answers from the old document only.
        let old_hits = held.index.query(&[1.0, 0.0], 5).await.expect("query succeeds");
        assert_eq!(old_hits.len(), 1);
        assert_eq!(old_hits[0].chunk.text, "old text");
        assert_eq!(held.fingerprint.document_id, "doc-a");

        // A fresh snapshot sees only the replacement.
        let fresh = store.snapshot().await.expect("snapshot present");
        let new_hits = fresh.index.query(&[1.0, 0.0], 5).await.expect("query succeeds");
        assert_eq!(new_hits.len(), 1);
        assert_eq!(new_hits[0].chunk.page, 4);
        assert_eq!(new_hits[0].chunk.text, "new text");
    }
}
