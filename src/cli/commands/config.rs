use anyhow::{Context, Result};
use clap::Subcommand;

use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    #[command(about = "Initialize configuration file")]
    Init {
        #[arg(long, help = "Force overwrite existing config")]
        force: bool,
    },
    #[command(about = "Show current configuration (file plus environment)")]
    Show,
    #[command(about = "Show configuration file paths")]
    Path,
    #[command(about = "Set a value, e.g. `config set llm.model gpt-4o-mini`")]
    Set {
        #[arg(required = true, help = "Dotted key: section.field")]
        key: String,
        #[arg(required = true, help = "New value")]
        value: String,
    },
}

pub async fn handle_config(cmd: ConfigCommand, format: OutputFormat, _verbose: bool) -> Result<()> {
    let formatter = get_formatter(format);

    match cmd {
        ConfigCommand::Init { force } => handle_init(force, formatter.as_ref()),
        ConfigCommand::Show => handle_show(format),
        ConfigCommand::Path => handle_path(),
        ConfigCommand::Set { key, value } => handle_set(&key, &value, formatter.as_ref()),
    }
}

fn handle_init(force: bool, formatter: &dyn crate::cli::output::Formatter) -> Result<()> {
    let config_path =
        Config::config_path().ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?;

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config already exists at: {}\nUse --force to overwrite.",
            config_path.display()
        );
    }

    let path = Config::default().save().context("failed to create config")?;
    println!(
        "{}",
        formatter.format_message(&format!("Created config at: {}", path.display()))
    );

    Ok(())
}

fn handle_show(format: OutputFormat) -> Result<()> {
    let mut config = Config::load()?;
    mask_secrets(&mut config);

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    if let Some(path) = Config::config_path()
        && path.exists()
    {
        println!("# Config file: {}", path.display());
    }
    println!("# Index: {}", config.index_path()?.display());
    println!();
    print!("{}", toml::to_string_pretty(&config)?);

    Ok(())
}

fn mask_secrets(config: &mut Config) {
    for key in [&mut config.embedding.api_key, &mut config.llm.api_key]
        .into_iter()
        .flatten()
    {
        *key = "********".to_string();
    }
}

fn handle_path() -> Result<()> {
    println!("Configuration paths:");
    println!();

    if let Some(path) = Config::config_path() {
        let state = if path.exists() { "active" } else { "would be" };
        println!("Config file ({state}): {}", path.display());
    }

    if let Some(dir) = Config::data_dir() {
        println!("Data directory: {}", dir.display());
    }

    if let Ok(cwd) = std::env::current_dir() {
        let env_path = cwd.join(".env");
        let state = if env_path.exists() { "active" } else { "would be" };
        println!(".env file ({state}): {}", env_path.display());
    }

    Ok(())
}

fn handle_set(key: &str, value: &str, formatter: &dyn crate::cli::output::Formatter) -> Result<()> {
    let mut config = match Config::config_path() {
        Some(path) if path.exists() => Config::load_from(&path)?,
        _ => Config::default(),
    };

    config
        .set_value(key, value)
        .with_context(|| format!("failed to set {key}"))?;
    let path = config.save().context("failed to write config")?;

    println!(
        "{}",
        formatter.format_message(&format!("Set {key} in {}", path.display()))
    );

    Ok(())
}
