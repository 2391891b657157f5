use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};
use crate::services::RagPipeline;

#[derive(Debug, Args)]
pub struct SearchArgs {
    #[arg(required = true, help = "Search query text")]
    pub query: String,

    #[arg(long, short = 'k', help = "Number of chunks to return")]
    pub k: Option<usize>,
}

#[derive(Debug, Args)]
pub struct AskArgs {
    #[arg(required = true, help = "Question to answer from the indexed documents")]
    pub question: String,

    #[arg(long, short = 'k', help = "Number of chunks to use as context")]
    pub k: Option<usize>,
}

fn check_k(k: Option<usize>) -> Result<()> {
    if k == Some(0) {
        anyhow::bail!("k must be at least 1");
    }
    Ok(())
}

pub async fn handle_search(args: SearchArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let query = args.query.trim();
    if query.is_empty() {
        anyhow::bail!("search query cannot be empty");
    }
    check_k(args.k)?;

    let config = Config::load()?;
    let formatter = get_formatter(format);
    let pipeline = RagPipeline::from_config(&config)?;

    let start = Instant::now();
    let results = pipeline
        .search(query, args.k)
        .await
        .context("search failed")?;

    if verbose {
        eprintln!("Query: \"{query}\"");
        eprintln!("  k: {}", args.k.unwrap_or(pipeline.top_k()));
        eprintln!("  Took: {}ms", start.elapsed().as_millis());
        eprintln!();
    }

    print!("{}", formatter.format_retrieval(query, &results));

    Ok(())
}

pub async fn handle_ask(args: AskArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let question = args.question.trim();
    if question.is_empty() {
        anyhow::bail!("question cannot be empty");
    }
    check_k(args.k)?;

    let config = Config::load()?;
    let formatter = get_formatter(format);
    let pipeline = RagPipeline::from_config(&config)?;

    let start = Instant::now();
    let answer = pipeline
        .ask(question, args.k)
        .await
        .context("failed to answer question")?;

    if verbose {
        eprintln!("Model: {}", config.llm.model);
        eprintln!("Took: {}ms", start.elapsed().as_millis());
        eprintln!();
    }

    print!("{}", formatter.format_answer(question, &answer));

    Ok(())
}
