use anyhow::{Context, Result};
use clap::Args;

use crate::cli::output::{StatusInfo, get_formatter};
use crate::models::{Config, OutputFormat};
use crate::services::{SqliteVectorIndex, VectorIndex};

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Also list every indexed source
    #[arg(long, short = 's')]
    pub sources: bool,
}

pub async fn handle_status(args: StatusArgs, format: OutputFormat, _verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);

    let index_path = config.index_path()?;
    let index = SqliteVectorIndex::open(&index_path)
        .with_context(|| format!("failed to open index at {}", index_path.display()))?;
    let sources = index.sources();

    let status = StatusInfo {
        index_path: index_path.display().to_string(),
        entries: index.len() as u64,
        sources: sources.len() as u64,
        dimension: index.dimension(),
        embedding_url: config.embedding.url.clone(),
        embedding_model: config.embedding.model.clone(),
        llm_url: config.llm.url.clone(),
        llm_model: config.llm.model.clone(),
    };

    print!("{}", formatter.format_status(&status));
    if args.sources {
        print!("{}", formatter.format_sources(&sources));
    }

    if config.embedding.api_key.is_none() || config.llm.api_key.is_none() {
        eprintln!();
        eprintln!(
            "Hint: no API key configured. Set OPENAI_API_KEY or run: docqa config set llm.api_key <key>"
        );
    }

    Ok(())
}
