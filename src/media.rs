//! Local asset store for downloaded contest images.
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

use crate::db::NewMediaAsset;

/// Downloads a remote image into local storage.
#[async_trait]
pub trait MediaSideloader: Send + Sync {
    async fn sideload(&self, url: &str, slug: &str) -> Result<NewMediaAsset>;
}

#[derive(Debug, Clone)]
pub struct MediaLibrary {
    http: Client,
    dir: PathBuf,
}

impl MediaLibrary {
    pub fn new(http: Client, dir: impl Into<PathBuf>) -> Self {
        Self {
            http,
            dir: dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl MediaSideloader for MediaLibrary {
    async fn sideload(&self, url: &str, slug: &str) -> Result<NewMediaAsset> {
        let parsed = Url::parse(url).with_context(|| format!("invalid image URL {}", url))?;
        let res = self
            .http
            .get(parsed.clone())
            .send()
            .await
            .with_context(|| format!("failed to download {}", url))?;
        if !res.status().is_success() {
            return Err(anyhow!("image download failed with {} for {}", res.status(), url));
        }

        let content_type = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_ascii_lowercase());
        let ext = image_extension(&parsed, content_type.as_deref())
            .ok_or_else(|| anyhow!("{} is not an image", url))?;

        let bytes = res
            .bytes()
            .await
            .with_context(|| format!("failed to read image body from {}", url))?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("failed to create media dir: {}", self.dir.display()))?;
        let short_id = Uuid::new_v4().simple().to_string();
        let file_path = self
            .dir
            .join(format!("{}-{}.{}", sanitize(slug), &short_id[..8], ext));
        tokio::fs::write(&file_path, &bytes)
            .await
            .with_context(|| format!("failed to write {}", file_path.display()))?;
        debug!(path = %file_path.display(), bytes = bytes.len(), "stored image");

        Ok(NewMediaAsset {
            source_url: url.to_string(),
            file_path: file_path.to_string_lossy().to_string(),
            content_type,
            byte_len: bytes.len() as i64,
        })
    }
}

/// Extension taken from the URL path when it is a known image type,
/// otherwise derived from the response content type.
fn image_extension(url: &Url, content_type: Option<&str>) -> Option<&'static str> {
    let from_path = Path::new(url.path())
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_ascii_lowercase());
    match from_path.as_deref() {
        Some("jpg") | Some("jpeg") => return Some("jpg"),
        Some("png") => return Some("png"),
        Some("gif") => return Some("gif"),
        Some("webp") => return Some("webp"),
        Some("avif") => return Some("avif"),
        _ => {}
    }
    match content_type {
        Some("image/jpeg") => Some("jpg"),
        Some("image/png") => Some("png"),
        Some("image/gif") => Some("gif"),
        Some("image/webp") => Some("webp"),
        Some("image/avif") => Some("avif"),
        _ => None,
    }
}

fn sanitize(slug: &str) -> String {
    let cleaned: String = slug
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "photo".to_string()
    } else {
        cleaned
    }
}
