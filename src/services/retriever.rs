//! Ingestion and retrieval orchestration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::{DocumentLoader, Embedder, TextChunker, VectorIndex, with_deadline};
use crate::error::{EmbeddingError, IndexError, RagError};
use crate::models::{
    Chunk, EmbeddedChunk, IndexEntry, IngestReport, LoadedDocument, Query, RetrievalResult,
};
use crate::utils::file::{calculate_checksum, collect_files, get_relative_path};

/// Drives loader → chunker → embedder → index for ingestion, and
/// embedder → index for retrieval.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    loader: Arc<dyn DocumentLoader>,
    chunker: TextChunker,
    timeout: Option<Duration>,
    force: bool,
    exclude: Vec<String>,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        loader: Arc<dyn DocumentLoader>,
        chunker: TextChunker,
    ) -> Self {
        Self {
            embedder,
            index,
            loader,
            chunker,
            timeout: None,
            force: false,
            exclude: Vec::new(),
        }
    }

    /// Abort embedder calls that take longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Re-embed sources even when their checksum is unchanged.
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_exclude(mut self, patterns: Vec<String>) -> Self {
        self.exclude = patterns;
        self
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// Ingest one file under `source_id`, replacing whatever the source held.
    ///
    /// Loader failures land in the report; embedding and index failures are
    /// returned as errors.
    pub async fn ingest(&self, path: &Path, source_id: &str) -> Result<IngestReport, RagError> {
        let start = Instant::now();

        let documents = match self.load(path).await {
            Ok(documents) => documents,
            Err(reason) => {
                warn!(source = %source_id, %reason, "skipping file");
                return Ok(IngestReport::failed(source_id, reason));
            }
        };

        let checksum = source_checksum(&documents);
        if !self.force
            && self.index.source_checksum(source_id).as_deref() == Some(checksum.as_str())
        {
            debug!(source = %source_id, "unchanged, skipping");
            return Ok(IngestReport {
                sources_unchanged: 1,
                ..Default::default()
            });
        }

        let (chunks, metadata) = self.chunk_documents(source_id, &documents);
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();

        let vectors = if texts.is_empty() {
            Vec::new()
        } else {
            with_deadline(self.timeout, "embedding", self.embedder.embed(texts)).await?
        };

        if vectors.len() != chunks.len() {
            return Err(RagError::Embedding(EmbeddingError::InvalidResponse(format!(
                "expected {} vectors, got {}",
                chunks.len(),
                vectors.len()
            ))));
        }

        let created_at = chrono::Utc::now().to_rfc3339();
        let entries: Vec<IndexEntry> = chunks
            .into_iter()
            .zip(vectors)
            .zip(metadata)
            .map(|((chunk, vector), mut metadata)| {
                metadata.insert("checksum".to_string(), checksum.clone());
                metadata.insert("created_at".to_string(), created_at.clone());
                IndexEntry::from_embedded(EmbeddedChunk { chunk, vector }, metadata)
            })
            .collect();

        let added = entries.len() as u64;
        let owned_id = source_id.to_string();
        let removed = self
            .with_index(move |index| index.replace_source(&owned_id, entries))
            .await?;

        info!(
            source = %source_id,
            chunks = added,
            replaced = removed,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "ingested"
        );

        Ok(IngestReport {
            chunks_added: added,
            sources_ingested: 1,
            duration_ms: start.elapsed().as_millis() as u64,
            ..Default::default()
        })
    }

    /// Ingest every file under `dir`; each file's source id is its path
    /// relative to `dir`. A single file path is ingested under its file name.
    pub async fn ingest_dir(&self, dir: &Path) -> Result<IngestReport, RagError> {
        let start = Instant::now();

        let files = collect_files(dir, &self.exclude).map_err(|e| RagError::Walk(e.to_string()))?;
        info!(path = %dir.display(), files = files.len(), "ingesting");

        let base = if dir.is_file() {
            dir.parent().unwrap_or(dir)
        } else {
            dir
        };

        let mut report = IngestReport::default();
        for file in &files {
            let source_id =
                get_relative_path(base, file).unwrap_or_else(|| file.display().to_string());
            report.merge(self.ingest(file, &source_id).await?);
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        Ok(report)
    }

    /// Embed the question and return its nearest chunks.
    pub async fn retrieve(&self, query: &Query) -> Result<RetrievalResult, RagError> {
        if query.question.trim().is_empty() {
            return Err(RagError::InvalidQuery("question is empty".to_string()));
        }
        if query.k == 0 {
            return Err(RagError::InvalidQuery("k must be positive".to_string()));
        }

        let start = Instant::now();
        let vector = with_deadline(
            self.timeout,
            "embedding",
            self.embedder.embed_one(&query.question),
        )
        .await?;

        let k = query.k;
        let result = self.with_index(move |index| index.query(&vector, k)).await?;
        debug!(
            k = query.k,
            hits = result.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "retrieved"
        );
        Ok(result)
    }

    pub async fn delete_source(&self, source_id: &str) -> Result<usize, RagError> {
        let owned_id = source_id.to_string();
        let removed = self
            .with_index(move |index| index.delete_by_source(&owned_id))
            .await?;
        info!(source = %source_id, removed, "deleted source");
        Ok(removed)
    }

    pub async fn clear(&self) -> Result<usize, RagError> {
        self.with_index(|index| index.clear()).await
    }

    /// Run an index call on the blocking pool; SQLite commits fsync.
    async fn with_index<T, F>(&self, operation: F) -> Result<T, RagError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn VectorIndex) -> Result<T, IndexError> + Send + 'static,
    {
        let index = Arc::clone(&self.index);
        tokio::task::spawn_blocking(move || operation(&*index))
            .await
            .map_err(|e| RagError::Task(e.to_string()))?
            .map_err(RagError::from)
    }

    async fn load(&self, path: &Path) -> Result<Vec<LoadedDocument>, String> {
        let loader = Arc::clone(&self.loader);
        let path: PathBuf = path.to_path_buf();
        match tokio::task::spawn_blocking(move || loader.load(&path)).await {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(e) => Err(format!("loader task failed: {e}")),
        }
    }

    /// Chunk all documents of a source with ordinals running across them.
    fn chunk_documents(
        &self,
        source_id: &str,
        documents: &[LoadedDocument],
    ) -> (Vec<Chunk>, Vec<BTreeMap<String, String>>) {
        let mut chunks = Vec::new();
        let mut metadata = Vec::new();
        let mut next_ordinal = 0u32;

        for document in documents {
            let doc_chunks = self.chunker.chunk(source_id, &document.text, next_ordinal);
            next_ordinal += doc_chunks.len() as u32;
            metadata.extend(std::iter::repeat_n(document.metadata.clone(), doc_chunks.len()));
            chunks.extend(doc_chunks);
        }

        (chunks, metadata)
    }
}

/// SHA-256 over every loaded document's text, in load order.
fn source_checksum(documents: &[LoadedDocument]) -> String {
    let joined: Vec<&str> = documents.iter().map(|d| d.text.as_str()).collect();
    calculate_checksum(&joined.join("\u{1e}"))
}
