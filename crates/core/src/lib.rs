pub mod answerer;
pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod failure;
pub mod generation;
pub mod index;
pub mod ingest;
pub mod models;
pub mod store;

pub use answerer::{AnswerConfig, RagAnswerer, DEFAULT_MAX_ANSWER_TOKENS, DEFAULT_TOP_K};
pub use chunking::{chunk_pages, ChunkingConfig, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
pub use embeddings::{
    OpenAiEmbedder, TextEmbedder, DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_EMBEDDING_MODEL,
};
pub use error::{IndexError, IngestError, QueryError};
pub use extractor::{
    AutoExtractor, PageText, PdfTextExtractor, PlainTextExtractor, TextExtractor,
};
pub use failure::{FailureKind, ProviderFailure};
pub use generation::{OpenAiGenerator, TextGenerator, DEFAULT_GENERATION_MODEL};
pub use index::{cosine_similarity, InMemoryIndex, VectorIndex};
pub use ingest::{IngestionPipeline, DEFAULT_EMBED_CONCURRENCY};
pub use models::{
    Answer, Chunk, DocumentFingerprint, FailedChunk, IndexEntry, IngestionReport, RetrievalHit,
};
pub use store::{ActiveDocument, DocumentStore};
