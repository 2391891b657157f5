//! Document loading, dispatched on file extension.

use std::path::Path;

use crate::error::LoaderError;
use crate::models::LoadedDocument;
use crate::utils::file::extension;
use crate::utils::text::{has_content, normalize_whitespace};

/// Extracts raw text from a file.
pub trait DocumentLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<Vec<LoadedDocument>, LoaderError>;
}

/// Supported document kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Text,
    Csv,
}

impl FileKind {
    pub fn from_path(path: &Path) -> Result<Self, LoaderError> {
        match extension(path).as_deref() {
            Some("pdf") => Ok(FileKind::Pdf),
            Some("txt" | "text" | "md" | "markdown") => Ok(FileKind::Text),
            Some("csv") => Ok(FileKind::Csv),
            Some(other) => Err(LoaderError::UnsupportedFormat(format!(".{other}"))),
            None => Err(LoaderError::UnsupportedFormat(format!(
                "{} has no extension",
                path.display()
            ))),
        }
    }
}

/// Loader for PDF, plain text/markdown and CSV files on the local disk.
#[derive(Debug, Clone)]
pub struct FileLoader {
    max_file_size: u64,
}

impl FileLoader {
    pub fn new(max_file_size: u64) -> Self {
        Self { max_file_size }
    }

    fn load_pdf(path: &Path) -> Result<Vec<LoadedDocument>, LoaderError> {
        // pdf-extract can panic on malformed input; treat that as a parse failure
        let text = std::panic::catch_unwind(|| pdf_extract::extract_text(path))
            .map_err(|_| LoaderError::parse(path.display().to_string(), "PDF parser panicked"))?
            .map_err(|e| LoaderError::parse(path.display().to_string(), e))?;

        Ok(vec![LoadedDocument::new(normalize_whitespace(&text))])
    }

    fn load_text(path: &Path) -> Result<Vec<LoadedDocument>, LoaderError> {
        let text = std::fs::read_to_string(path)?;
        Ok(vec![LoadedDocument::new(text)])
    }

    /// One document per row, rendered as `header: value` lines.
    fn load_csv(path: &Path) -> Result<Vec<LoadedDocument>, LoaderError> {
        let parse_err = |e: csv::Error| LoaderError::parse(path.display().to_string(), e);

        let mut reader = csv::Reader::from_path(path).map_err(parse_err)?;
        let headers = reader.headers().map_err(parse_err)?.clone();

        let mut documents = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record.map_err(parse_err)?;
            let text = headers
                .iter()
                .zip(record.iter())
                .map(|(header, value)| format!("{}: {}", header.trim(), value.trim()))
                .collect::<Vec<_>>()
                .join("\n");

            if record.iter().any(has_content) {
                documents.push(LoadedDocument::new(text).with_metadata("row", row));
            }
        }

        Ok(documents)
    }
}

impl DocumentLoader for FileLoader {
    fn load(&self, path: &Path) -> Result<Vec<LoadedDocument>, LoaderError> {
        let kind = FileKind::from_path(path)?;

        let size = std::fs::metadata(path)?.len();
        if size > self.max_file_size {
            return Err(LoaderError::TooLarge {
                size,
                max: self.max_file_size,
            });
        }

        let documents = match kind {
            FileKind::Pdf => Self::load_pdf(path)?,
            FileKind::Text => Self::load_text(path)?,
            FileKind::Csv => Self::load_csv(path)?,
        };

        let source = path.display().to_string();
        Ok(documents
            .into_iter()
            .map(|doc| doc.with_metadata("source", &source))
            .collect())
    }
}
