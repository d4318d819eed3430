use crate::embeddings::TextEmbedder;
use crate::error::QueryError;
use crate::generation::TextGenerator;
use crate::models::{Answer, RetrievalHit};
use crate::store::DocumentStore;
use std::sync::Arc;
use tracing::{debug, info};

pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_MAX_ANSWER_TOKENS: u32 = 512;

#[derive(Debug, Clone, Copy)]
pub struct AnswerConfig {
    /// Number of chunks retrieved into the prompt context.
    pub top_k: usize,
    pub max_output_tokens: u32,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            max_output_tokens: DEFAULT_MAX_ANSWER_TOKENS,
        }
    }
}

/// Answers a question from the active document: embed the question, retrieve
/// the top-k chunks, ground a prompt on them, generate.
///
/// Citations are the source pages of the retrieved chunks in rank order:
/// a property of what was retrieved, never a parse of the model's output.
pub struct RagAnswerer {
    store: Arc<DocumentStore>,
    embedder: Arc<dyn TextEmbedder>,
    generator: Arc<dyn TextGenerator>,
    config: AnswerConfig,
}

impl RagAnswerer {
    pub fn new(
        store: Arc<DocumentStore>,
        embedder: Arc<dyn TextEmbedder>,
        generator: Arc<dyn TextGenerator>,
        config: AnswerConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            generator,
            config,
        }
    }

    pub async fn answer(&self, question: &str) -> Result<Answer, QueryError> {
        if question.trim().is_empty() {
            return Err(QueryError::EmptyQuestion);
        }

        let Some(active) = self.store.snapshot().await else {
            return Err(QueryError::NoDocument);
        };

        let question_vector = self.embedder.embed(question).await?;
        let hits = active.index.query(&question_vector, self.config.top_k).await?;
        debug!(
            document = %active.fingerprint.document_id,
            hits = hits.len(),
            "retrieved context chunks"
        );

        let prompt = build_prompt(&hits, question);
        let text = self
            .generator
            .generate(&prompt, self.config.max_output_tokens)
            .await?;

        let citation_pages = citation_pages(&hits);
        info!(citations = ?citation_pages, "answer generated");

        Ok(Answer {
            text,
            citation_pages,
        })
    }
}

fn build_prompt(hits: &[RetrievalHit], question: &str) -> String {
    let context = hits
        .iter()
        .map(|hit| format!("[Page {}] {}", hit.chunk.page, hit.chunk.text))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are reading a document. Answer the question using only the context below. \
         Cite page numbers as [Page X].\n\nContext:\n{context}\n\nQuestion: {question}\n"
    )
}

/// Distinct source pages of the retrieved chunks, in rank order.
fn citation_pages(hits: &[RetrievalHit]) -> Vec<u32> {
    let mut pages = Vec::new();
    for hit in hits {
        if !pages.contains(&hit.chunk.page) {
            pages.push(hit.chunk.page);
        }
    }
    pages
}
