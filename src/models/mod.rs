mod config;
mod document;
mod report;
mod search;

pub use config::{
    Config, DEFAULT_BIND, DEFAULT_EMBEDDING_MODEL, DEFAULT_EMBEDDING_URL, DEFAULT_INDEX_FILE,
    DEFAULT_LLM_MODEL, DEFAULT_LLM_URL, EmbeddingConfig, IndexConfig, IndexingConfig, LlmConfig,
    OutputConfig, RetrievalConfig, ServerConfig,
};
pub use document::{Chunk, EmbeddedChunk, IndexEntry, LoadedDocument};
pub use report::{IngestFailure, IngestReport};
pub use search::{Answer, OutputFormat, Query, RetrievalResult, ScoredEntry};
