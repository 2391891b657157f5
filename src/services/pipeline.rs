//! Wiring of the retriever and answerer from configuration.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use super::{
    Answerer, ChatClient, FileLoader, HttpEmbedder, Retriever, SqliteVectorIndex, TextChunker,
    VectorIndex,
};
use crate::error::{AppError, RagError};
use crate::models::{Answer, Config, Query, RetrievalResult};

/// Retriever plus answerer, sharing one index.
pub struct RagPipeline {
    retriever: Retriever,
    answerer: Answerer,
    top_k: usize,
}

impl RagPipeline {
    pub fn new(retriever: Retriever, answerer: Answerer, top_k: usize) -> Self {
        Self {
            retriever,
            answerer,
            top_k,
        }
    }

    /// Build the HTTP-backed pipeline over the configured on-disk index.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let index_path = config.index_path()?;
        let index = SqliteVectorIndex::open(&index_path)?;
        info!(path = %index_path.display(), entries = index.len(), "opened index");

        let embedder = HttpEmbedder::new(&config.embedding)?;
        let llm = ChatClient::new(&config.llm)?;
        let loader = FileLoader::new(config.indexing.max_file_size);
        let chunker = TextChunker::from_config(&config.indexing).map_err(RagError::from)?;
        let timeout = config.retrieval.timeout_secs.map(Duration::from_secs);

        let retriever = Retriever::new(
            Arc::new(embedder),
            Arc::new(index),
            Arc::new(loader),
            chunker,
        )
        .with_timeout(timeout)
        .with_exclude(config.indexing.exclude_patterns.clone());
        let answerer = Answerer::new(Arc::new(llm)).with_timeout(timeout);

        Ok(Self::new(
            retriever,
            answerer,
            config.retrieval.top_k as usize,
        ))
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.retriever = self.retriever.with_force(force);
        self
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn answerer(&self) -> &Answerer {
        &self.answerer
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Retrieve the top `k` chunks (default `top_k`) for `question`.
    pub async fn search(
        &self,
        question: &str,
        k: Option<usize>,
    ) -> Result<RetrievalResult, RagError> {
        let query = Query::new(question, k.unwrap_or(self.top_k));
        self.retriever.retrieve(&query).await
    }

    /// Retrieve, then answer from what was retrieved.
    pub async fn ask(&self, question: &str, k: Option<usize>) -> Result<Answer, RagError> {
        let retrieval = self.search(question, k).await?;
        self.answerer.answer(question, &retrieval).await
    }
}
