//! Photo sync job: fetch the contest listing, upsert each photo, report progress.
//!
//! A run walks `Idle -> Resolving -> Fetching -> Processing` and ends in one of
//! [`SyncOutcome`]. Records are applied at most once per distinct
//! `feed_modified_at`, so re-running after a budget stop resumes where the
//! previous run left off.

use anyhow::Result;
use reqwest::Client;
use std::fmt;
use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::db::{self, PhotoContent, PhotoMeta, PhotoStore, Pool, SqlitePhotoStore};
use crate::error::SyncError;
use crate::fetch::{self, PhotoSource};
use crate::media::{MediaLibrary, MediaSideloader};
use crate::model::{ImageStep, RemotePhotoRecord, UpsertResult, UpsertStatus};

/// Query value that triggers a run over HTTP.
pub const TRIGGER_ACTION: &str = "update-contest-photos";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Resolving,
    Fetching,
    Processing,
    Completed,
    LimitReached,
    Failed,
}

impl SyncPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncPhase::Idle => "idle",
            SyncPhase::Resolving => "resolving",
            SyncPhase::Fetching => "fetching",
            SyncPhase::Processing => "processing",
            SyncPhase::Completed => "completed",
            SyncPhase::LimitReached => "limit_reached",
            SyncPhase::Failed => "failed",
        }
    }
}

#[derive(Debug)]
pub enum SyncOutcome {
    Completed { processed: usize },
    LimitReached { processed: usize },
    NoPhotos,
    Failed(SyncError),
}

impl SyncOutcome {
    pub fn phase(&self) -> SyncPhase {
        match self {
            SyncOutcome::Completed { .. } | SyncOutcome::NoPhotos => SyncPhase::Completed,
            SyncOutcome::LimitReached { .. } => SyncPhase::LimitReached,
            SyncOutcome::Failed(_) => SyncPhase::Failed,
        }
    }
}

/// Per-record result kept alongside the human-readable lines.
#[derive(Debug)]
pub struct SyncEntry {
    pub slug: String,
    pub result: Result<UpsertResult, String>,
}

/// Line-by-line progress of one run plus its final outcome.
#[derive(Debug)]
pub struct SyncReport {
    pub lines: Vec<String>,
    pub entries: Vec<SyncEntry>,
    pub outcome: SyncOutcome,
}

impl SyncReport {
    fn new() -> Self {
        Self {
            lines: Vec::new(),
            entries: Vec::new(),
            outcome: SyncOutcome::NoPhotos,
        }
    }

    fn line(&mut self, line: impl Into<String>) {
        let line = line.into();
        info!("{}", line);
        self.lines.push(line);
    }

    fn fail(mut self, err: SyncError) -> Self {
        self.line(format!("Error: {}", err));
        warn!(phase = SyncPhase::Failed.as_str(), error = %err, "sync failed");
        self.outcome = SyncOutcome::Failed(err);
        self
    }

    pub fn processed(&self) -> usize {
        match self.outcome {
            SyncOutcome::Completed { processed } | SyncOutcome::LimitReached { processed } => {
                processed
            }
            _ => 0,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, SyncOutcome::Failed(_))
    }

    pub fn statuses(&self) -> Vec<Option<UpsertStatus>> {
        self.entries
            .iter()
            .map(|e| e.result.as_ref().ok().map(|r| r.status))
            .collect()
    }

    /// Lines joined for an HTML response body, escaped.
    pub fn to_html(&self) -> String {
        self.lines
            .iter()
            .map(|l| escape_html(l))
            .collect::<Vec<_>>()
            .join("<br>\n")
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Attach a primary image unless the entity already has one. Never fails the
/// caller: problems are logged and reported through the returned step.
pub async fn ensure_primary_image(
    store: &dyn PhotoStore,
    media: &dyn MediaSideloader,
    entity_id: i64,
    has_image: bool,
    record: &RemotePhotoRecord,
) -> ImageStep {
    if has_image {
        return ImageStep::AlreadyPresent;
    }
    if record.image_url.trim().is_empty() {
        info!(slug = %record.slug, entity_id, "no image URL; skipping image download");
        return ImageStep::SkippedEmptyUrl;
    }

    let asset = match media.sideload(&record.image_url, &record.slug).await {
        Ok(asset) => asset,
        Err(err) => {
            warn!(?err, slug = %record.slug, url = %record.image_url, "image download failed");
            return ImageStep::Failed(format!("{:#}", err));
        }
    };
    match store.attach_primary_image(entity_id, &asset).await {
        Ok(asset_id) => ImageStep::Attached(asset_id),
        Err(err) => {
            warn!(?err, slug = %record.slug, "failed to attach image");
            ImageStep::Failed(format!("{:#}", err))
        }
    }
}

/// Create or update one photo keyed by slug. Unchanged `feed_modified_at`
/// means no writes at all.
#[instrument(skip_all, fields(slug = %record.slug))]
pub async fn upsert_photo(
    store: &dyn PhotoStore,
    media: &dyn MediaSideloader,
    record: &RemotePhotoRecord,
) -> Result<UpsertResult, SyncError> {
    let existing = store
        .find_by_slug(&record.slug)
        .await
        .map_err(SyncError::persist)?;

    if let Some(stored) = &existing {
        if stored.feed_modified_at == Some(record.feed_modified_at) {
            return Ok(UpsertResult {
                status: UpsertStatus::Skipped,
                entity_id: stored.id,
            });
        }
    }

    let content = PhotoContent::from_record(record);
    let (status, entity_id, has_image) = match existing {
        Some(stored) => {
            store
                .update_photo(stored.id, &content)
                .await
                .map_err(SyncError::persist)?;
            (UpsertStatus::Updated, stored.id, stored.has_primary_image)
        }
        None => {
            let id = store
                .create_photo(&content)
                .await
                .map_err(SyncError::persist)?;
            (UpsertStatus::Created, id, false)
        }
    };

    let image = ensure_primary_image(store, media, entity_id, has_image, record).await;
    store
        .write_meta(entity_id, &PhotoMeta::from_record(record))
        .await
        .map_err(SyncError::persist)?;

    info!(entity_id, status = status.as_str(), image = ?image, "photo applied");
    Ok(UpsertResult { status, entity_id })
}

/// Fetch and process with an already selected source. `limit == 0` means no cap.
pub async fn run_with_source(
    source: &dyn PhotoSource,
    store: &dyn PhotoStore,
    media: &dyn MediaSideloader,
    limit: usize,
) -> SyncReport {
    let mut report = SyncReport::new();

    info!(phase = SyncPhase::Fetching.as_str(), source = source.name(), "sync phase");
    let fetched = match source.fetch_all().await {
        Ok(fetched) => fetched,
        Err(err) => return report.fail(err.into()),
    };

    if fetched.photos.is_empty() {
        report.line("No photos found with this hashtag.");
        report.outcome = SyncOutcome::NoPhotos;
        return report;
    }

    info!(
        phase = SyncPhase::Processing.as_str(),
        found = fetched.photos.len(),
        total = fetched.total_count,
        "sync phase"
    );
    if limit == 0 {
        report.line(format!(
            "Found {} photos total. Processing all new/updated photos...",
            fetched.photos.len()
        ));
    } else {
        report.line(format!(
            "Found {} photos total. Processing up to {} new/updated photos...",
            fetched.photos.len(),
            limit
        ));
    }

    let mut processed = 0usize;
    for record in &fetched.photos {
        match upsert_photo(store, media, record).await {
            Ok(result) => {
                report.line(format!(
                    "Photo {}. {} (entity ID {})",
                    record.slug,
                    result.status.label(),
                    result.entity_id
                ));
                report.entries.push(SyncEntry {
                    slug: record.slug.clone(),
                    result: Ok(result),
                });
                if result.status.counts_as_processed() {
                    processed += 1;
                    if limit > 0 && processed >= limit {
                        report.line(format!(
                            "LIMIT REACHED: Processed {} new/updated photos. \
                             Run the update again to continue with remaining photos.",
                            limit
                        ));
                        report.outcome = SyncOutcome::LimitReached { processed };
                        return report;
                    }
                }
            }
            Err(err) => {
                warn!(slug = %record.slug, error = %err, "photo failed; continuing");
                report.line(format!("Photo {}. Error: {}", record.slug, err));
                report.entries.push(SyncEntry {
                    slug: record.slug.clone(),
                    result: Err(err.to_string()),
                });
            }
        }
    }

    report.line(format!(
        "COMPLETED: All photos have been processed. Total new/updated: {}",
        processed
    ));
    report.outcome = SyncOutcome::Completed { processed };
    report
}

/// Everything one sync invocation needs, wired once at start-up.
pub struct SyncJob {
    cfg: Config,
    pool: Pool,
    http: Client,
    store: SqlitePhotoStore,
    media: MediaLibrary,
}

impl fmt::Debug for SyncJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncJob")
            .field("source", &self.cfg.sync.source)
            .field("limit", &self.cfg.sync.max_processed_per_run)
            .finish_non_exhaustive()
    }
}

impl SyncJob {
    pub fn new(cfg: Config, pool: Pool) -> Result<Self> {
        let http = fetch::http_client(&cfg.remote)?;
        let media = MediaLibrary::new(http.clone(), cfg.app.media_dir());
        Ok(Self {
            store: SqlitePhotoStore::new(pool.clone()),
            cfg,
            pool,
            http,
            media,
        })
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    #[instrument(skip_all)]
    pub async fn run(&self) -> SyncReport {
        info!(phase = SyncPhase::Resolving.as_str(), "sync phase");
        let settings = match db::load_contest_settings(&self.pool).await {
            Ok(settings) => settings,
            Err(err) => {
                return SyncReport::new().fail(SyncError::Config(format!(
                    "Could not read contest settings: {:#}",
                    err
                )))
            }
        };
        let source = match fetch::select_source(&self.cfg, &settings, self.http.clone()) {
            Ok(source) => source,
            Err(err) => return SyncReport::new().fail(err),
        };

        let report = run_with_source(
            source.as_ref(),
            &self.store,
            &self.media,
            self.cfg.sync.max_processed_per_run,
        )
        .await;
        info!(
            phase = report.outcome.phase().as_str(),
            processed = report.processed(),
            "sync finished"
        );
        report
    }
}
