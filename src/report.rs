//! Contest standings and per-author summaries.
use anyhow::Result;
use std::fmt::Write as _;

use crate::db::{self, AuthorReportRow, LeaderboardRow, Pool};

pub const DEFAULT_LEADERBOARD_LIMIT: i64 = 10;

pub async fn leaderboard(pool: &Pool, limit: Option<i64>) -> Result<Vec<LeaderboardRow>> {
    let limit = limit.filter(|l| *l > 0).unwrap_or(DEFAULT_LEADERBOARD_LIMIT);
    db::leaderboard(pool, limit).await
}

pub async fn author_report(pool: &Pool) -> Result<Vec<AuthorReportRow>> {
    db::author_report(pool).await
}

pub fn render_leaderboard(rows: &[LeaderboardRow]) -> String {
    if rows.is_empty() {
        return "No votes yet.\n".to_string();
    }
    let mut out = String::new();
    for row in rows {
        let _ = writeln!(
            out,
            "{:>3}. {} by {}: {:.2} ({} votes)",
            row.position,
            row.title,
            row.author.as_deref().filter(|a| !a.is_empty()).unwrap_or("(unknown)"),
            row.average,
            row.vote_count
        );
    }
    out
}

pub fn render_author_report(rows: &[AuthorReportRow]) -> String {
    if rows.is_empty() {
        return "No photos imported.\n".to_string();
    }
    let mut out = String::new();
    for row in rows {
        let mean = row
            .mean_average
            .map(|m| format!("{:.2}", m))
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "{}: {} photos, {} votes, mean {}",
            row.author, row.photo_count, row.vote_count, mean
        );
    }
    out
}
