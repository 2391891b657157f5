//! Vector index abstraction.
//!
//! The retriever talks to the index through the [`VectorIndex`] trait so the
//! exact linear-scan backend can later be swapped for an approximate one
//! without touching callers.

mod sqlite;

pub use sqlite::SqliteVectorIndex;

use serde::{Deserialize, Serialize};

use crate::error::IndexError;
use crate::models::{IndexEntry, RetrievalResult};

/// Per-source entry count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSummary {
    pub source_id: String,
    pub chunks: u64,
}

/// Storage and nearest-neighbour lookup for embedded chunks.
///
/// Mutating calls are durable when they return. Implementations serialize
/// writers and let readers proceed concurrently.
pub trait VectorIndex: Send + Sync {
    /// Insert entries, overwriting any entry that shares an id.
    fn upsert(&self, entries: Vec<IndexEntry>) -> Result<(), IndexError>;

    /// Atomically drop every entry of `source_id` and insert `entries`.
    /// Returns the number of entries removed.
    fn replace_source(&self, source_id: &str, entries: Vec<IndexEntry>)
    -> Result<usize, IndexError>;

    /// Top-`k` entries by cosine similarity, best first, ties by insertion order.
    fn query(&self, vector: &[f32], k: usize) -> Result<RetrievalResult, IndexError>;

    /// Remove all entries of a source; returns how many were removed.
    fn delete_by_source(&self, source_id: &str) -> Result<usize, IndexError>;

    /// Remove everything, including the established dimension.
    fn clear(&self) -> Result<usize, IndexError>;

    /// Checksum recorded for a source at its last ingestion.
    fn source_checksum(&self, source_id: &str) -> Option<String>;

    fn sources(&self) -> Vec<SourceSummary>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Vector length shared by all stored entries, if any are stored.
    fn dimension(&self) -> Option<usize>;
}

/// Euclidean norm, accumulated in f64.
pub fn norm(v: &[f32]) -> f64 {
    v.iter().map(|x| f64::from(*x) * f64::from(*x)).sum::<f64>().sqrt()
}

/// Cosine similarity given precomputed norms. Zero vectors score 0.
pub fn cosine_with_norms(a: &[f32], a_norm: f64, b: &[f32], b_norm: f64) -> f32 {
    if a_norm == 0.0 || b_norm == 0.0 {
        return 0.0;
    }
    let dot: f64 = a
        .iter()
        .zip(b)
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum();
    let score = (dot / (a_norm * b_norm)).clamp(-1.0, 1.0) as f32;
    // -0.0 would sort below 0.0 under total_cmp
    if score == 0.0 { 0.0 } else { score }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    cosine_with_norms(a, norm(a), b, norm(b))
}
