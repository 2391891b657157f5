//! Error types for the document QA service.

use thiserror::Error;

use crate::utils::retry::Retryable;

/// Errors related to chunking parameters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkError {
    #[error("chunk overlap ({overlap}) must be smaller than chunk size ({max_size})")]
    InvalidOverlap { max_size: usize, overlap: usize },
}

/// Errors related to embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("failed to connect to embedding server: {0}")]
    ConnectionError(String),

    #[error("embedding server error: {0}")]
    ServerError(String),

    #[error("embedding request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding timeout")]
    Timeout,
}

impl Retryable for EmbeddingError {
    fn is_retryable(&self) -> bool {
        match self {
            EmbeddingError::ConnectionError(_) | EmbeddingError::Timeout => true,
            EmbeddingError::ServerError(msg) => is_transient_status(msg),
            EmbeddingError::RequestError(e) => e.is_timeout() || e.is_connect(),
            EmbeddingError::InvalidResponse(_) => false,
        }
    }
}

/// Errors related to language model completions.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("failed to connect to LLM server: {0}")]
    ConnectionError(String),

    #[error("LLM server error: {0}")]
    ServerError(String),

    #[error("LLM request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid LLM response: {0}")]
    InvalidResponse(String),

    #[error("LLM timeout")]
    Timeout,
}

impl Retryable for LlmError {
    fn is_retryable(&self) -> bool {
        match self {
            LlmError::ConnectionError(_) | LlmError::Timeout => true,
            LlmError::ServerError(msg) => is_transient_status(msg),
            LlmError::RequestError(e) => e.is_timeout() || e.is_connect(),
            LlmError::InvalidResponse(_) => false,
        }
    }
}

// 429 and 5xx gateway statuses are worth another attempt
fn is_transient_status(msg: &str) -> bool {
    let lower = msg.to_lowercase();
    msg.contains("503")
        || msg.contains("502")
        || msg.contains("504")
        || msg.contains("429")
        || lower.contains("unavailable")
        || lower.contains("too many requests")
}

/// Errors related to the persisted vector index.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("vector dimension mismatch: index holds {expected}-dim vectors, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("entry {0} has an empty vector")]
    EmptyVector(String),

    #[error("{0} has a non-finite vector component")]
    NonFinite(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("corrupt index entry: {0}")]
    Corrupt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while extracting text from a file.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("file read error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("file exceeds maximum size: {size} > {max}")]
    TooLarge { size: u64, max: u64 },
}

impl LoaderError {
    pub fn parse(path: impl Into<String>, message: impl ToString) -> Self {
        LoaderError::Parse {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Errors surfaced by the retrieval and answering pipeline.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("embedding error: {0}")]
    Embedding(EmbeddingError),

    #[error("LLM error: {0}")]
    Llm(LlmError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("chunking error: {0}")]
    Chunk(#[from] ChunkError),

    #[error("{operation} timed out")]
    Timeout { operation: &'static str },

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("directory walk error: {0}")]
    Walk(String),

    #[error("index task failed: {0}")]
    Task(String),
}

impl RagError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, RagError::Timeout { .. })
    }
}

// Provider-side timeouts are folded into the dedicated variant so callers can
// apply a different retry policy than for hard provider failures.
impl From<EmbeddingError> for RagError {
    fn from(err: EmbeddingError) -> Self {
        match err {
            EmbeddingError::Timeout => RagError::Timeout {
                operation: "embedding",
            },
            EmbeddingError::RequestError(e) if e.is_timeout() => RagError::Timeout {
                operation: "embedding",
            },
            other => RagError::Embedding(other),
        }
    }
}

impl From<LlmError> for RagError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Timeout => RagError::Timeout {
                operation: "completion",
            },
            LlmError::RequestError(e) if e.is_timeout() => RagError::Timeout {
                operation: "completion",
            },
            other => RagError::Llm(other),
        }
    }
}

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    PathError(String),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Application-level errors that wrap domain errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Rag(#[from] RagError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}
