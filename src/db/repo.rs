use super::model::{
    AuthorReportRow, ContestSettings, LeaderboardRow, NewMediaAsset, PhotoCard, PhotoContent,
    PhotoMeta, StoredPhoto,
};
use anyhow::{anyhow, Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::instrument;

pub type Pool = SqlitePool;

const SETTING_HASHTAG: &str = "contest_hashtag";
const SETTING_TAG_ID: &str = "contest_tag_id";

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let options = SqliteConnectOptions::from_str(&normalized)
        .with_context(|| format!("invalid database url {}", normalized))?
        .create_if_missing(true)
        // WAL plus full fsync; the sync job is the only heavy writer.
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Full);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    Ok(pool)
}

/// For a file-backed SQLite URL, expand a leading `~/` and make sure the parent
/// directory exists. Other URLs (including in-memory ones) pass through.
fn prepare_sqlite_url(url: &str) -> String {
    let Some(rest) = url.strip_prefix("sqlite:") else {
        return url.to_string();
    };
    if rest.starts_with(":memory") {
        return url.to_string();
    }

    let rest = rest.strip_prefix("//").unwrap_or(rest);
    let (path, query) = match rest.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (rest, None),
    };
    if path.is_empty() {
        return url.to_string();
    }

    let path = match (path.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(tail), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), tail),
        _ => path.to_string(),
    };

    if let Some(parent) = std::path::Path::new(&path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    match query {
        Some(q) => format!("sqlite://{}?{}", path, q),
        None => format!("sqlite://{}", path),
    }
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[instrument(skip_all, fields(slug = %slug))]
pub async fn find_photo_by_slug(pool: &Pool, slug: &str) -> Result<Option<StoredPhoto>> {
    let row = sqlx::query(
        "SELECT id, slug, photo_feed_date, primary_image_id FROM photos WHERE slug = ?",
    )
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| StoredPhoto {
        id: row.get("id"),
        slug: row.get("slug"),
        feed_modified_at: row.try_get::<Option<i64>, _>("photo_feed_date").ok().flatten(),
        has_primary_image: row
            .try_get::<Option<i64>, _>("primary_image_id")
            .ok()
            .flatten()
            .is_some(),
    }))
}

#[instrument(skip_all, fields(slug = %content.slug))]
pub async fn insert_photo(pool: &Pool, content: &PhotoContent) -> Result<i64> {
    let mut tx = pool.begin().await?;
    let rec = sqlx::query(
        "INSERT INTO photos (slug, title, body, status, created_at) VALUES (?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(&content.slug)
    .bind(&content.title)
    .bind(&content.body)
    .bind(&content.status)
    .bind(content.created_at)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(rec.get::<i64, _>("id"))
}

#[instrument(skip_all, fields(id = id))]
pub async fn update_photo(pool: &Pool, id: i64, content: &PhotoContent) -> Result<()> {
    let res = sqlx::query(
        "UPDATE photos SET slug = ?, title = ?, body = ?, status = ?, created_at = ?, \
         updated_at = CURRENT_TIMESTAMP WHERE id = ?",
    )
    .bind(&content.slug)
    .bind(&content.title)
    .bind(&content.body)
    .bind(&content.status)
    .bind(content.created_at)
    .bind(id)
    .execute(pool)
    .await?;
    if res.rows_affected() == 0 {
        return Err(anyhow!("photo {} not found", id));
    }
    Ok(())
}

#[instrument(skip_all, fields(id = id))]
pub async fn write_photo_meta(pool: &Pool, id: i64, meta: &PhotoMeta) -> Result<()> {
    sqlx::query(
        "UPDATE photos SET photo_id = ?, photo_url = ?, photo_image_url = ?, photo_author = ?, \
         photo_date = ?, photo_feed_date = ? WHERE id = ?",
    )
    .bind(&meta.photo_id)
    .bind(&meta.photo_url)
    .bind(&meta.photo_image_url)
    .bind(&meta.photo_author)
    .bind(meta.photo_date)
    .bind(meta.photo_feed_date)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_photo_meta(pool: &Pool, id: i64) -> Result<Option<PhotoMeta>> {
    let row = sqlx::query(
        "SELECT photo_id, photo_url, photo_image_url, photo_author, photo_date, photo_feed_date \
         FROM photos WHERE id = ? AND photo_feed_date IS NOT NULL",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| PhotoMeta {
        photo_id: opt_text(&row, "photo_id"),
        photo_url: opt_text(&row, "photo_url"),
        photo_image_url: opt_text(&row, "photo_image_url"),
        photo_author: opt_text(&row, "photo_author"),
        photo_date: row.try_get::<Option<i64>, _>("photo_date").ok().flatten().unwrap_or(0),
        photo_feed_date: row.get("photo_feed_date"),
    }))
}

fn opt_text(row: &SqliteRow, col: &str) -> String {
    row.try_get::<Option<String>, _>(col)
        .ok()
        .flatten()
        .unwrap_or_default()
}

pub async fn has_primary_image(pool: &Pool, id: i64) -> Result<bool> {
    let image: Option<Option<i64>> =
        sqlx::query_scalar("SELECT primary_image_id FROM photos WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;
    match image {
        Some(image) => Ok(image.is_some()),
        None => Err(anyhow!("photo {} not found", id)),
    }
}

/// Register a downloaded asset and make it the photo's primary image.
#[instrument(skip_all, fields(id = id))]
pub async fn attach_primary_image(pool: &Pool, id: i64, asset: &NewMediaAsset) -> Result<i64> {
    let mut tx = pool.begin().await?;
    let asset_id: i64 = sqlx::query(
        "INSERT INTO media_assets (photo_id, source_url, file_path, content_type, byte_len) \
         VALUES (?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(id)
    .bind(&asset.source_url)
    .bind(&asset.file_path)
    .bind(&asset.content_type)
    .bind(asset.byte_len)
    .fetch_one(&mut *tx)
    .await?
    .get("id");
    sqlx::query("UPDATE photos SET primary_image_id = ? WHERE id = ?")
        .bind(asset_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(asset_id)
}

pub async fn primary_image_path(pool: &Pool, id: i64) -> Result<Option<String>> {
    let path: Option<String> = sqlx::query_scalar(
        "SELECT m.file_path FROM photos p JOIN media_assets m ON m.id = p.primary_image_id WHERE p.id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(path)
}

pub async fn count_photos(pool: &Pool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM photos")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn photo_exists(pool: &Pool, id: i64) -> Result<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM photos WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

#[instrument(skip_all)]
pub async fn load_contest_settings(pool: &Pool) -> Result<ContestSettings> {
    let hashtag = get_setting(pool, SETTING_HASHTAG).await?;
    let tag_id = match get_setting(pool, SETTING_TAG_ID).await? {
        Some(raw) => Some(
            raw.parse::<i64>()
                .with_context(|| format!("stored tag id {:?} is not a number", raw))?,
        ),
        None => None,
    };
    Ok(ContestSettings { hashtag, tag_id })
}

/// Persist a resolved hashtag and its tag id together.
#[instrument(skip_all)]
pub async fn save_contest_settings(pool: &Pool, hashtag: &str, tag_id: i64) -> Result<()> {
    let mut tx = pool.begin().await?;
    for (key, value) in [(SETTING_HASHTAG, hashtag.to_string()), (SETTING_TAG_ID, tag_id.to_string())] {
        sqlx::query(
            "INSERT INTO settings (key, value) VALUES (?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

async fn get_setting(pool: &Pool, key: &str) -> Result<Option<String>> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    Ok(value.filter(|v| !v.trim().is_empty()))
}

const UNVOTED_FILTER: &str = "p.status = 'publish' AND NOT EXISTS \
     (SELECT 1 FROM votes v WHERE v.photo_id = p.id AND v.user_id = ?)";

#[instrument(skip_all, fields(user_id = user_id))]
pub async fn random_unvoted_photo(pool: &Pool, user_id: i64) -> Result<Option<PhotoCard>> {
    let sql = format!(
        "SELECT p.id, p.slug, p.title, p.photo_author, p.photo_url, m.file_path \
         FROM photos p LEFT JOIN media_assets m ON m.id = p.primary_image_id \
         WHERE {} ORDER BY RANDOM() LIMIT 1",
        UNVOTED_FILTER
    );
    let row = sqlx::query(&sql)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|row| PhotoCard {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        author: row.try_get::<Option<String>, _>("photo_author").ok().flatten(),
        url: row.try_get::<Option<String>, _>("photo_url").ok().flatten(),
        image_path: row.try_get::<Option<String>, _>("file_path").ok().flatten(),
    }))
}

pub async fn count_unvoted_photos(pool: &Pool, user_id: i64) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM photos p WHERE {}", UNVOTED_FILTER);
    let count: i64 = sqlx::query_scalar(&sql)
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Insert a vote and recompute the photo's average in one transaction.
/// Returns the new average, or `None` when this user already voted for the photo.
#[instrument(skip_all, fields(user_id = user_id, photo_id = photo_id))]
pub async fn record_vote(
    pool: &Pool,
    user_id: i64,
    photo_id: i64,
    points: i64,
) -> Result<Option<f64>> {
    let mut tx = pool.begin().await?;
    let inserted = sqlx::query(
        "INSERT INTO votes (photo_id, user_id, points) VALUES (?, ?, ?) \
         ON CONFLICT(photo_id, user_id) DO NOTHING",
    )
    .bind(photo_id)
    .bind(user_id)
    .bind(points)
    .execute(&mut *tx)
    .await?;
    if inserted.rows_affected() == 0 {
        tx.rollback().await?;
        return Ok(None);
    }
    let average: f64 = sqlx::query_scalar(
        "UPDATE photos SET vote_average = (SELECT AVG(points) FROM votes WHERE photo_id = ?) \
         WHERE id = ? RETURNING vote_average",
    )
    .bind(photo_id)
    .bind(photo_id)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(Some(average))
}

#[instrument(skip_all)]
pub async fn leaderboard(pool: &Pool, limit: i64) -> Result<Vec<LeaderboardRow>> {
    let rows = sqlx::query(
        "SELECT p.id, p.slug, p.title, p.photo_url, p.photo_author, p.vote_average, \
                (SELECT COUNT(*) FROM votes v WHERE v.photo_id = p.id) AS vote_count, \
                m.file_path \
         FROM photos p LEFT JOIN media_assets m ON m.id = p.primary_image_id \
         WHERE p.vote_average IS NOT NULL \
         ORDER BY p.vote_average DESC, p.id ASC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .enumerate()
        .map(|(index, row)| LeaderboardRow {
            position: index + 1,
            id: row.get("id"),
            slug: row.get("slug"),
            title: row.get("title"),
            url: row.try_get::<Option<String>, _>("photo_url").ok().flatten(),
            author: row.try_get::<Option<String>, _>("photo_author").ok().flatten(),
            average: row.get("vote_average"),
            vote_count: row.get("vote_count"),
            image_path: row.try_get::<Option<String>, _>("file_path").ok().flatten(),
        })
        .collect())
}

#[instrument(skip_all)]
pub async fn author_report(pool: &Pool) -> Result<Vec<AuthorReportRow>> {
    let rows = sqlx::query(
        "SELECT COALESCE(NULLIF(TRIM(p.photo_author), ''), '(unknown)') AS author, \
                COUNT(*) AS photo_count, \
                COALESCE(SUM(vc.n), 0) AS vote_count, \
                AVG(p.vote_average) AS mean_average \
         FROM photos p \
         LEFT JOIN (SELECT photo_id, COUNT(*) AS n FROM votes GROUP BY photo_id) vc \
                ON vc.photo_id = p.id \
         GROUP BY author \
         ORDER BY mean_average IS NULL, mean_average DESC, author ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| AuthorReportRow {
            author: row.get("author"),
            photo_count: row.get("photo_count"),
            vote_count: row.get("vote_count"),
            mean_average: row.try_get::<Option<f64>, _>("mean_average").ok().flatten(),
        })
        .collect())
}
