use serde::{Deserialize, Serialize};

/// A file that could not be ingested, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestFailure {
    pub source_id: String,
    pub reason: String,
}

/// Outcome of an ingestion run over one file or a directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub chunks_added: u64,
    pub sources_ingested: u64,
    pub sources_unchanged: u64,
    pub errors: Vec<IngestFailure>,
    #[serde(default)]
    pub duration_ms: u64,
}

impl IngestReport {
    pub fn failed(source_id: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            errors: vec![IngestFailure {
                source_id: source_id.into(),
                reason: reason.to_string(),
            }],
            ..Default::default()
        }
    }

    pub fn merge(&mut self, other: IngestReport) {
        self.chunks_added += other.chunks_added;
        self.sources_ingested += other.sources_ingested;
        self.sources_unchanged += other.sources_unchanged;
        self.errors.extend(other.errors);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
