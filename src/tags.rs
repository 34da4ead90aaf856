//! Hashtag to `photo-tags` term id resolution.
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, instrument};

use crate::fetch::model::WpTag;

#[derive(Debug, Error)]
pub enum TagError {
    #[error("Please enter a hashtag.")]
    Empty,
    #[error("Could not reach WordPress Photo Directory: {0}")]
    Remote(String),
    #[error("The hashtag #{0} does not exist in WordPress Photo Directory.")]
    UnknownHashtag(String),
    #[error("No photos found with hashtag #{0}.")]
    NoPhotos(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTag {
    pub hashtag: String,
    pub tag_id: i64,
}

/// Trim, drop a leading `#`, lowercase.
pub fn normalize_hashtag(raw: &str) -> String {
    raw.trim().trim_start_matches('#').trim().to_lowercase()
}

/// Look up the tag id for `raw` and make sure at least one photo carries it.
#[instrument(skip(http))]
pub async fn resolve_hashtag(http: &Client, rest_base: &str, raw: &str) -> Result<ResolvedTag, TagError> {
    let hashtag = normalize_hashtag(raw);
    if hashtag.is_empty() {
        return Err(TagError::Empty);
    }

    let mut url = endpoint(rest_base, "photo-tags")?;
    url.query_pairs_mut().append_pair("search", &hashtag);
    let tags: Vec<WpTag> = get_json(http, url).await?;
    let tag = tags
        .into_iter()
        .find(|tag| tag.name.to_lowercase() == hashtag)
        .ok_or_else(|| TagError::UnknownHashtag(hashtag.clone()))?;

    let mut url = endpoint(rest_base, "photos")?;
    url.query_pairs_mut()
        .append_pair("photo-tags", &tag.id.to_string())
        .append_pair("per_page", "1");
    let photos: Vec<Value> = get_json(http, url).await?;
    if photos.is_empty() {
        return Err(TagError::NoPhotos(hashtag));
    }

    info!(%hashtag, tag_id = tag.id, "hashtag resolved");
    Ok(ResolvedTag {
        hashtag,
        tag_id: tag.id,
    })
}

fn endpoint(rest_base: &str, path: &str) -> Result<Url, TagError> {
    let raw = format!("{}/{}", rest_base.trim_end_matches('/'), path);
    Url::parse(&raw).map_err(|e| TagError::Remote(format!("invalid URL {}: {}", raw, e)))
}

async fn get_json<T: serde::de::DeserializeOwned>(http: &Client, url: Url) -> Result<T, TagError> {
    let res = http
        .get(url.clone())
        .header(ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| TagError::Remote(e.to_string()))?;
    let status = res.status();
    if status != StatusCode::OK {
        return Err(TagError::Remote(format!("HTTP {} from {}", status, url)));
    }
    res.json::<T>()
        .await
        .map_err(|e| TagError::Remote(format!("invalid response from {}: {}", url, e)))
}
