//! Index maintenance: ingest, delete, clear.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};
use crate::services::RagPipeline;
use crate::utils::file::collect_files;

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// File or directory to ingest
    #[arg(required = true)]
    pub path: PathBuf,

    /// Glob patterns to exclude (can be specified multiple times)
    #[arg(long, short = 'e')]
    pub exclude: Vec<String>,

    /// Re-embed sources even if their content is unchanged
    #[arg(long)]
    pub force: bool,

    /// Show what would be ingested without touching the index
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// Source id to remove (path relative to the ingested directory)
    #[arg(required = true)]
    pub source_id: String,
}

#[derive(Debug, Args)]
pub struct ClearArgs {
    /// Skip confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

pub async fn handle_ingest(args: IngestArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let mut config = Config::load()?;
    let formatter = get_formatter(format);

    if !args.path.exists() {
        anyhow::bail!("path does not exist: {}", args.path.display());
    }
    config.indexing.exclude_patterns.extend(args.exclude);

    if args.dry_run {
        let files = collect_files(&args.path, &config.indexing.exclude_patterns)
            .context("failed to walk directory")?;
        println!(
            "{}",
            formatter.format_message(&format!("Dry run: would ingest {} files", files.len()))
        );
        for file in &files {
            println!("  {}", file.display());
        }
        return Ok(());
    }

    let pipeline = RagPipeline::from_config(&config)?.with_force(args.force);

    if verbose {
        eprintln!("Ingesting: {}", args.path.display());
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("ingesting {}", args.path.display()));
    spinner.enable_steady_tick(Duration::from_millis(120));

    let result = pipeline.retriever().ingest_dir(&args.path).await;
    spinner.finish_and_clear();

    let report = result.context("ingestion failed")?;
    print!("{}", formatter.format_ingest_report(&report));

    Ok(())
}

pub async fn handle_delete(args: DeleteArgs, format: OutputFormat, _verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);
    let pipeline = RagPipeline::from_config(&config)?;

    let removed = pipeline
        .retriever()
        .delete_source(&args.source_id)
        .await
        .context("failed to delete source")?;

    let message = if removed == 0 {
        format!("No entries found for source '{}'", args.source_id)
    } else {
        format!("Deleted {} entries of '{}'", removed, args.source_id)
    };
    println!("{}", formatter.format_message(&message));

    Ok(())
}

pub async fn handle_clear(args: ClearArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);

    if verbose {
        eprintln!("Clearing index at {}", config.index_path()?.display());
    }

    if !args.yes && !confirm("This will delete ALL indexed documents. Continue? [y/N]")? {
        println!("{}", formatter.format_message("Cancelled."));
        return Ok(());
    }

    let pipeline = RagPipeline::from_config(&config)?;
    let removed = pipeline
        .retriever()
        .clear()
        .await
        .context("failed to clear index")?;

    println!(
        "{}",
        formatter.format_message(&format!("Cleared {} entries from the index.", removed))
    );

    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    println!("{}", prompt);
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}
