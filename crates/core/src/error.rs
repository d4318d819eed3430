use crate::failure::ProviderFailure;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("document could not be parsed: {0}")]
    Unparseable(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error(transparent)]
    Provider(#[from] ProviderFailure),

    #[error(transparent)]
    Index(#[from] IndexError),
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("no document has been ingested yet")]
    NoDocument,

    #[error("question is empty")]
    EmptyQuestion,

    #[error(transparent)]
    Provider(#[from] ProviderFailure),

    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Invariant violations inside a vector index. These indicate a programming
/// or configuration defect, not a provider-side condition, and are therefore
/// never routed through the failure classifier.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("vector index holds no entries")]
    EmptyIndex,

    #[error("vector dimension {got} does not match index dimension {expected}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("zero-magnitude vector cannot be scored")]
    DegenerateVector,

    #[error("index backend error: {0}")]
    Backend(String),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
