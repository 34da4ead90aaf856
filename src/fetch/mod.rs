//! Remote listing of contest photos.
//!
//! Two sources produce the same normalized [`RemotePhotoRecord`](crate::model::RemotePhotoRecord) stream:
//! [`RestSource`] pages through the WordPress REST API by tag id, and
//! [`RssSource`] reads the hashtag feed in one request. [`select_source`]
//! picks one from configuration so the sync job never branches on it.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, StatusCode};
use thiserror::Error;

use crate::config::{Config, Remote, SourceKind};
use crate::db::ContestSettings;
use crate::error::SyncError;
use crate::model::FetchedPhotos;

pub mod feed;
pub mod model;
pub mod rest;

pub use self::feed::RssSource;
pub use self::rest::RestSource;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Error connecting to WordPress Photo Directory: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP Error {status} from WordPress Photo Directory ({url}).")]
    Status { status: StatusCode, url: String },
    #[error("Invalid response from WordPress Photo Directory: {0}")]
    Decode(String),
    #[error("Invalid feed from WordPress Photo Directory: {0}")]
    Feed(#[from] rss::Error),
    #[error("Invalid remote URL: {0}")]
    Url(String),
}

#[async_trait]
pub trait PhotoSource: Send + Sync {
    /// Short label for logs and progress lines.
    fn name(&self) -> &str;

    /// Fetch every photo for the bound tag, in remote order.
    async fn fetch_all(&self) -> Result<FetchedPhotos, RemoteError>;
}

/// Shared HTTP client for remote calls; both sources get the same timeout.
pub fn http_client(remote: &Remote) -> Result<Client> {
    Client::builder()
        .user_agent(remote.user_agent.clone())
        .timeout(remote.timeout())
        .build()
        .context("failed to build HTTP client")
}

/// Choose the fetch strategy. REST needs the resolved tag id, RSS the raw hashtag.
pub fn select_source(
    cfg: &Config,
    settings: &ContestSettings,
    http: Client,
) -> Result<Box<dyn PhotoSource>, SyncError> {
    match cfg.sync.source {
        SourceKind::Rest => {
            let tag_id = settings.tag_id.ok_or_else(|| {
                SyncError::Config(
                    "Tag ID not defined. Please configure the hashtag in settings.".to_string(),
                )
            })?;
            Ok(Box::new(RestSource::new(http, &cfg.remote.rest_base, tag_id)))
        }
        SourceKind::Rss => {
            let hashtag = settings.hashtag.clone().ok_or_else(|| {
                SyncError::Config(
                    "Hashtag not defined. Please configure the hashtag in settings.".to_string(),
                )
            })?;
            Ok(Box::new(RssSource::new(http, &cfg.remote.feed_base, hashtag)))
        }
    }
}

static SCRIPT_STYLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)\s*>").expect("valid regex")
});
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));

/// Remove markup: script/style blocks with their contents, then every tag.
pub fn strip_tags(html: &str) -> String {
    let without_blocks = SCRIPT_STYLE.replace_all(html, "");
    TAG.replace_all(&without_blocks, "").trim().to_string()
}

/// Parse a remote date into a Unix timestamp. Naive values are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.timestamp());
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.and_utc().timestamp())
}
