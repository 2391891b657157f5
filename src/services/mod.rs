mod answerer;
mod chunker;
mod embedding;
mod llm;
mod loader;
mod pipeline;
mod retriever;
pub mod vector_index;

#[cfg(test)]
pub(crate) mod testing;

use std::future::Future;
use std::time::Duration;

use crate::error::RagError;

pub use answerer::{Answerer, NO_ANSWER, PROMPT_VERSION, build_prompt};
pub use chunker::{TextChunker, split};
pub use embedding::{Embedder, HttpEmbedder};
pub use llm::{ChatClient, LanguageModel};
pub use loader::{DocumentLoader, FileKind, FileLoader};
pub use pipeline::RagPipeline;
pub use retriever::Retriever;
pub use vector_index::{SourceSummary, SqliteVectorIndex, VectorIndex};

/// Await `future`, giving up after `limit` with [`RagError::Timeout`].
pub(crate) async fn with_deadline<T, E, F>(
    limit: Option<Duration>,
    operation: &'static str,
    future: F,
) -> Result<T, RagError>
where
    F: Future<Output = Result<T, E>>,
    RagError: From<E>,
{
    match limit {
        Some(limit) => match tokio::time::timeout(limit, future).await {
            Ok(result) => result.map_err(RagError::from),
            Err(_) => Err(RagError::Timeout { operation }),
        },
        None => future.await.map_err(RagError::from),
    }
}
