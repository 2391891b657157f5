//! CLI module for docqa.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

use crate::models::OutputFormat;

/// Ask questions about your documents.
#[derive(Debug, Parser)]
#[command(name = "docqa")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(
        long,
        short = 'f',
        global = true,
        help = "Output format: text, json, or markdown"
    )]
    pub format: Option<OutputFormat>,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Ingest a file or directory (PDF, text, markdown, CSV)
    Ingest(commands::IngestArgs),

    /// Answer a question from the indexed documents
    Ask(commands::AskArgs),

    /// Show the chunks most similar to a query
    Search(commands::SearchArgs),

    /// Remove one source from the index
    Delete(commands::DeleteArgs),

    /// Remove everything from the index
    Clear(commands::ClearArgs),

    /// Show index and backend status
    Status(commands::StatusArgs),

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::ConfigCommand),

    /// Run the HTTP API
    Serve(commands::ServeArgs),
}
