use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use photo_contest::config;
use photo_contest::db;
use photo_contest::report;

#[derive(Debug, Parser)]
#[command(author, version, about = "Print contest standings and per-author totals")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Number of leaderboard rows
    #[arg(long, default_value_t = report::DEFAULT_LEADERBOARD_LIMIT)]
    limit: i64,

    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,
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

    let pool = db::init_pool(&cfg.app.database_url()).await?;
    db::run_migrations(&pool).await?;

    let leaders = report::leaderboard(&pool, Some(args.limit)).await?;
    let authors = report::author_report(&pool).await?;

    if args.json {
        let out = serde_json::json!({ "leaderboard": leaders, "authors": authors });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("Top {} photos", args.limit);
    print!("{}", report::render_leaderboard(&leaders));
    println!();
    println!("Authors");
    print!("{}", report::render_author_report(&authors));
    Ok(())
}
