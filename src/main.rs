use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use photo_contest::config;
use photo_contest::db;
use photo_contest::server::{self, AppState};
use photo_contest::sync::SyncJob;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Override `app.bind_addr`
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let pool = db::init_pool(&cfg.app.database_url()).await?;
    db::run_migrations(&pool).await?;

    let bind_addr = args.bind.unwrap_or_else(|| cfg.app.bind_addr.clone());
    let job = SyncJob::new(cfg, pool.clone())?;
    info!(?job, "starting photo contest server");

    server::serve(&bind_addr, AppState::new(pool, job)).await
}
