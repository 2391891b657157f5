use std::fmt::Write as FmtWrite;

use serde::Serialize;

use crate::models::{Answer, IngestReport, OutputFormat, RetrievalResult};
use crate::services::SourceSummary;

const PREVIEW_CHARS: usize = 200;

pub trait Formatter {
    fn format_retrieval(&self, question: &str, results: &RetrievalResult) -> String;
    fn format_answer(&self, question: &str, answer: &Answer) -> String;
    fn format_ingest_report(&self, report: &IngestReport) -> String;
    fn format_status(&self, status: &StatusInfo) -> String;
    fn format_sources(&self, sources: &[SourceSummary]) -> String;
    fn format_message(&self, message: &str) -> String;
    fn format_error(&self, error: &str) -> String;
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusInfo {
    pub index_path: String,
    pub entries: u64,
    pub sources: u64,
    pub dimension: Option<usize>,
    pub embedding_url: String,
    pub embedding_model: String,
    pub llm_url: String,
    pub llm_model: String,
}

fn preview(content: &str) -> String {
    let head: String = content.chars().take(PREVIEW_CHARS).collect();
    if content.chars().count() > PREVIEW_CHARS {
        format!("{}...", head)
    } else {
        head
    }
}

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_retrieval(&self, question: &str, results: &RetrievalResult) -> String {
        if results.is_empty() {
            return format!("No results found for: {}\n", question);
        }

        let mut output = String::new();
        writeln!(output, "Search results for: \"{}\"", question).unwrap();
        writeln!(output, "Found {} results\n", results.len()).unwrap();

        for (i, scored) in results.iter().enumerate() {
            writeln!(output, "{}. [Score: {:.3}]", i + 1, scored.score).unwrap();
            writeln!(
                output,
                "   Source: {} #{}",
                scored.entry.source_id, scored.entry.ordinal
            )
            .unwrap();
            writeln!(output, "   ---").unwrap();
            for line in preview(&scored.entry.text).lines() {
                writeln!(output, "   {}", line).unwrap();
            }
            writeln!(output).unwrap();
        }

        output
    }

    fn format_answer(&self, _question: &str, answer: &Answer) -> String {
        let mut output = String::new();
        writeln!(output, "{}", answer.text).unwrap();
        if !answer.used_sources.is_empty() {
            let sources: Vec<&str> = answer.used_sources.iter().map(String::as_str).collect();
            writeln!(output, "\nSources: {}", sources.join(", ")).unwrap();
        }
        output
    }

    fn format_ingest_report(&self, report: &IngestReport) -> String {
        let mut output = String::new();
        writeln!(output, "Ingestion Complete").unwrap();
        writeln!(output, "------------------").unwrap();
        writeln!(output, "Sources ingested:  {}", report.sources_ingested).unwrap();
        writeln!(output, "Sources unchanged: {}", report.sources_unchanged).unwrap();
        writeln!(output, "Chunks added:      {}", report.chunks_added).unwrap();
        writeln!(output, "Errors:            {}", report.errors.len()).unwrap();
        writeln!(output, "Duration:          {}ms", report.duration_ms).unwrap();
        for failure in &report.errors {
            writeln!(output, "  ✗ {}: {}", failure.source_id, failure.reason).unwrap();
        }
        output
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let mut output = String::new();
        writeln!(output, "Status").unwrap();
        writeln!(output, "------").unwrap();
        writeln!(output, "Index:      {}", status.index_path).unwrap();
        writeln!(output, "  Entries:  {}", status.entries).unwrap();
        writeln!(output, "  Sources:  {}", status.sources).unwrap();
        match status.dimension {
            Some(dim) => writeln!(output, "  Dim:      {}", dim).unwrap(),
            None => writeln!(output, "  Dim:      (empty)").unwrap(),
        }
        writeln!(output).unwrap();
        writeln!(
            output,
            "Embedding:  {} @ {}",
            status.embedding_model, status.embedding_url
        )
        .unwrap();
        writeln!(output, "LLM:        {} @ {}", status.llm_model, status.llm_url).unwrap();
        output
    }

    fn format_sources(&self, sources: &[SourceSummary]) -> String {
        if sources.is_empty() {
            return "No sources indexed.\n".to_string();
        }

        let mut output = String::new();
        writeln!(output, "Sources").unwrap();
        writeln!(output, "-------").unwrap();
        for source in sources {
            writeln!(output, "  {} ({} chunks)", source.source_id, source.chunks).unwrap();
        }
        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("Error: {}\n", error)
    }
}

pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render<T: Serialize + ?Sized>(&self, value: &T) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        rendered.unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string())
    }
}

impl Formatter for JsonFormatter {
    fn format_retrieval(&self, question: &str, results: &RetrievalResult) -> String {
        let hits: Vec<serde_json::Value> = results
            .iter()
            .map(|scored| {
                serde_json::json!({
                    "score": scored.score,
                    "source_id": scored.entry.source_id,
                    "ordinal": scored.entry.ordinal,
                    "text": scored.entry.text,
                    "metadata": scored.entry.metadata,
                })
            })
            .collect();

        self.render(&serde_json::json!({ "question": question, "results": hits }))
    }

    fn format_answer(&self, question: &str, answer: &Answer) -> String {
        self.render(&serde_json::json!({
            "question": question,
            "answer": answer.text,
            "sources": answer.used_sources,
        }))
    }

    fn format_ingest_report(&self, report: &IngestReport) -> String {
        self.render(report)
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        self.render(status)
    }

    fn format_sources(&self, sources: &[SourceSummary]) -> String {
        self.render(&serde_json::json!({ "sources": sources }))
    }

    fn format_message(&self, message: &str) -> String {
        serde_json::json!({"message": message}).to_string()
    }

    fn format_error(&self, error: &str) -> String {
        serde_json::json!({"error": error}).to_string()
    }
}

pub struct MarkdownFormatter;

impl Formatter for MarkdownFormatter {
    fn format_retrieval(&self, question: &str, results: &RetrievalResult) -> String {
        if results.is_empty() {
            return format!("## No results found\n\nQuery: `{}`\n", question);
        }

        let mut output = String::new();
        writeln!(output, "## Search Results\n").unwrap();
        writeln!(output, "**Query:** `{}`\n", question).unwrap();

        for (i, scored) in results.iter().enumerate() {
            writeln!(output, "### {}. Score: {:.3}\n", i + 1, scored.score).unwrap();
            writeln!(
                output,
                "**Source:** `{}` (chunk {})\n",
                scored.entry.source_id, scored.entry.ordinal
            )
            .unwrap();
            writeln!(output, "```").unwrap();
            writeln!(output, "{}", scored.entry.text).unwrap();
            writeln!(output, "```\n").unwrap();
        }

        output
    }

    fn format_answer(&self, question: &str, answer: &Answer) -> String {
        let mut output = String::new();
        writeln!(output, "## {}\n", question).unwrap();
        writeln!(output, "{}\n", answer.text).unwrap();
        if !answer.used_sources.is_empty() {
            writeln!(output, "**Sources:**\n").unwrap();
            for source in &answer.used_sources {
                writeln!(output, "- `{}`", source).unwrap();
            }
        }
        output
    }

    fn format_ingest_report(&self, report: &IngestReport) -> String {
        let mut output = String::new();
        writeln!(output, "## Ingestion Complete\n").unwrap();
        writeln!(output, "| Metric | Value |").unwrap();
        writeln!(output, "|--------|-------|").unwrap();
        writeln!(output, "| Sources ingested | {} |", report.sources_ingested).unwrap();
        writeln!(output, "| Sources unchanged | {} |", report.sources_unchanged).unwrap();
        writeln!(output, "| Chunks added | {} |", report.chunks_added).unwrap();
        writeln!(output, "| Errors | {} |", report.errors.len()).unwrap();
        writeln!(output, "| Duration | {}ms |", report.duration_ms).unwrap();
        if report.has_errors() {
            writeln!(output, "\n### Errors\n").unwrap();
            for failure in &report.errors {
                writeln!(output, "- `{}`: {}", failure.source_id, failure.reason).unwrap();
            }
        }
        output
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let mut output = String::new();
        writeln!(output, "## Status\n").unwrap();
        writeln!(output, "### Index\n").unwrap();
        writeln!(output, "- **Path:** `{}`", status.index_path).unwrap();
        writeln!(output, "- **Entries:** {}", status.entries).unwrap();
        writeln!(output, "- **Sources:** {}", status.sources).unwrap();
        if let Some(dim) = status.dimension {
            writeln!(output, "- **Dimension:** {}", dim).unwrap();
        }
        writeln!(output, "\n### Backends\n").unwrap();
        writeln!(
            output,
            "- **Embedding:** {} (`{}`)",
            status.embedding_model, status.embedding_url
        )
        .unwrap();
        writeln!(output, "- **LLM:** {} (`{}`)", status.llm_model, status.llm_url).unwrap();
        output
    }

    fn format_sources(&self, sources: &[SourceSummary]) -> String {
        if sources.is_empty() {
            return "## Sources\n\n*No sources indexed.*\n".to_string();
        }

        let mut output = String::new();
        writeln!(output, "## Sources\n").unwrap();
        writeln!(output, "| Source | Chunks |").unwrap();
        writeln!(output, "|--------|--------|").unwrap();
        for source in sources {
            writeln!(output, "| `{}` | {} |", source.source_id, source.chunks).unwrap();
        }
        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("> {}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("> ⚠️ **Error:** {}\n", error)
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
        OutputFormat::Markdown => Box::new(MarkdownFormatter),
    }
}
