use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Text extracted from one logical unit of a file (a PDF, a text file, a CSV row).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadedDocument {
    pub text: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl LoadedDocument {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.metadata.insert(key.into(), value.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source_id: String,
    pub ordinal: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedChunk {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

impl EmbeddedChunk {
    pub fn vector_dim(&self) -> usize {
        self.vector.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    pub source_id: String,
    pub ordinal: u32,
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub vector: Vec<f32>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl IndexEntry {
    /// Stable id so re-ingesting a source overwrites instead of duplicating.
    pub fn generate_id(source_id: &str, ordinal: u32) -> String {
        use uuid::Uuid;
        let name = format!("{}:{}", source_id, ordinal);
        Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
    }

    pub fn from_embedded(embedded: EmbeddedChunk, metadata: BTreeMap<String, String>) -> Self {
        let EmbeddedChunk { chunk, vector } = embedded;
        Self {
            id: Self::generate_id(&chunk.source_id, chunk.ordinal),
            source_id: chunk.source_id,
            ordinal: chunk.ordinal,
            text: chunk.text,
            vector,
            metadata,
        }
    }

    pub fn vector_dim(&self) -> usize {
        self.vector.len()
    }
}
