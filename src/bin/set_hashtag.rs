use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

use photo_contest::config;
use photo_contest::db;
use photo_contest::fetch;
use photo_contest::tags;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Resolve a contest hashtag to its photo tag id and store both"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Hashtag with or without the leading '#'
    hashtag: String,
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

    let http = fetch::http_client(&cfg.remote)?;
    let resolved = match tags::resolve_hashtag(&http, &cfg.remote.rest_base, &args.hashtag).await {
        Ok(resolved) => resolved,
        Err(err) => {
            // previous settings stay in place
            error!(%err, "hashtag not saved");
            return Err(err.into());
        }
    };

    db::save_contest_settings(&pool, &resolved.hashtag, resolved.tag_id).await?;
    info!(hashtag = %resolved.hashtag, tag_id = resolved.tag_id, "contest hashtag saved");
    println!("Hashtag #{} saved (tag ID {}).", resolved.hashtag, resolved.tag_id);
    Ok(())
}
