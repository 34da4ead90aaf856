use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use photo_contest::config;
use photo_contest::db;
use photo_contest::sync::{SyncJob, SyncOutcome};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Run one contest photo sync and print the progress report"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Override `sync.max_processed_per_run` (0 = no cap)
    #[arg(long)]
    limit: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let mut cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;
    if let Some(limit) = args.limit {
        cfg.sync.max_processed_per_run = limit;
    }

    let pool = db::init_pool(&cfg.app.database_url()).await?;
    db::run_migrations(&pool).await?;

    let job = SyncJob::new(cfg, pool)?;
    let report = job.run().await;
    print!("{}", report);

    match report.outcome {
        SyncOutcome::Failed(err) => bail!(err),
        SyncOutcome::LimitReached { processed } => {
            info!(processed, "budget reached; run again to continue");
            Ok(())
        }
        _ => Ok(()),
    }
}
