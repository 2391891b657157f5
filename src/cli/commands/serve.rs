use std::future::Future;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Args;

use crate::models::Config;
use crate::server::RagServer;
use crate::services::RagPipeline;

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Address to listen on (overrides server.bind)
    #[arg(long, short = 'b')]
    pub bind: Option<String>,
}

pub async fn handle_serve(
    args: ServeArgs,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let config = Config::load()?;

    let bind = args.bind.unwrap_or_else(|| config.server.bind.clone());
    let addr: SocketAddr = bind
        .parse()
        .with_context(|| format!("invalid bind address: {bind}"))?;

    let pipeline = RagPipeline::from_config(&config)?;
    let server = RagServer::new(addr, pipeline);

    eprintln!("Serving on http://{}", server.address());
    server.run(shutdown).await.context("server error")?;

    Ok(())
}
