use async_trait::async_trait;
use reqwest::header::{HeaderMap, ACCEPT};
use reqwest::{Client, Url};
use std::fmt;
use tracing::{debug, info};

use super::model::{WpEmbedded, WpPhoto, PREFERRED_IMAGE_SIZE};
use super::{parse_timestamp, strip_tags, PhotoSource, RemoteError};
use crate::model::{FetchedPhotos, RemotePhotoRecord};

/// Maximum page size the WordPress REST API allows.
pub const PER_PAGE: u32 = 100;

const TOTAL_HEADER: &str = "X-WP-Total";
const TOTAL_PAGES_HEADER: &str = "X-WP-TotalPages";

#[derive(Clone)]
pub struct RestSource {
    http: Client,
    base_url: String,
    tag_id: i64,
}

impl fmt::Debug for RestSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestSource")
            .field("base_url", &self.base_url)
            .field("tag_id", &self.tag_id)
            .finish_non_exhaustive()
    }
}

struct RestPage {
    photos: Vec<WpPhoto>,
    total: Option<u64>,
    total_pages: u32,
}

impl RestSource {
    pub fn new(http: Client, base_url: &str, tag_id: i64) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            tag_id,
        }
    }

    pub fn page_url(&self, page: u32) -> Result<Url, RemoteError> {
        let mut url = Url::parse(&format!("{}/photos", self.base_url))
            .map_err(|e| RemoteError::Url(format!("{}: {}", self.base_url, e)))?;
        url.query_pairs_mut()
            .append_pair("photo-tags", &self.tag_id.to_string())
            .append_pair("page", &page.to_string())
            .append_pair("per_page", &PER_PAGE.to_string())
            .append_pair("_embed", "1");
        Ok(url)
    }

    async fn fetch_page(&self, page: u32) -> Result<RestPage, RemoteError> {
        let url = self.page_url(page)?;
        debug!(%url, page, "requesting photo page");
        let res = self
            .http
            .get(url.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(RemoteError::Status {
                status: res.status(),
                url: url.to_string(),
            });
        }

        let total = header_number(res.headers(), TOTAL_HEADER);
        let total_pages = page_count(res.headers());
        let body = res.text().await?;
        let photos: Vec<WpPhoto> = serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            RemoteError::Decode(format!("{} (body starts with {:?})", e, preview))
        })?;

        Ok(RestPage {
            photos,
            total,
            total_pages,
        })
    }
}

#[async_trait]
impl PhotoSource for RestSource {
    fn name(&self) -> &str {
        "rest"
    }

    async fn fetch_all(&self) -> Result<FetchedPhotos, RemoteError> {
        let mut fetched = FetchedPhotos::default();
        let mut total = None;
        let mut page = 1u32;

        loop {
            let current = self.fetch_page(page).await?;
            info!(
                page,
                found = current.photos.len(),
                total_pages = current.total_pages,
                "fetched photo page"
            );
            if page == 1 {
                total = current.total;
            }
            fetched
                .photos
                .extend(current.photos.iter().map(normalize_api_photo));

            if page >= current.total_pages {
                break;
            }
            page += 1;
        }

        fetched.total_count = total.unwrap_or(fetched.photos.len() as u64);
        Ok(fetched)
    }
}

/// Page count from `X-WP-TotalPages`. A missing header means there is nothing
/// past the current page; values beyond `u32` saturate.
fn page_count(headers: &HeaderMap) -> u32 {
    header_number(headers, TOTAL_PAGES_HEADER)
        .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
        .unwrap_or(1)
}

fn header_number(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Map one REST photo into the canonical record.
pub fn normalize_api_photo(photo: &WpPhoto) -> RemotePhotoRecord {
    let embedded = photo.embedded.as_ref();
    let published = photo.date_gmt.as_deref().or(photo.date.as_deref());
    let modified = photo.modified_gmt.as_deref().or(photo.modified.as_deref());

    RemotePhotoRecord {
        external_id: photo.id.to_string(),
        slug: photo.slug.clone(),
        source_url: photo.link.clone(),
        image_url: embedded.map(select_image_url).unwrap_or_default(),
        author: embedded
            .and_then(|e| e.author.first())
            .and_then(|a| a.get("name"))
            .and_then(|n| n.as_str())
            .unwrap_or_default()
            .to_string(),
        published_at: published.and_then(parse_timestamp).unwrap_or(0),
        feed_modified_at: modified.and_then(parse_timestamp).unwrap_or(0),
        description: photo
            .content
            .as_ref()
            .map(|c| strip_tags(&c.rendered))
            .unwrap_or_default(),
    }
}

/// Preferred rendition, then the original, then empty.
pub fn select_image_url(embedded: &WpEmbedded) -> String {
    let Some(media) = embedded.featured_media.first() else {
        return String::new();
    };
    let sized = format!("/media_details/sizes/{}/source_url", PREFERRED_IMAGE_SIZE);
    media
        .pointer(&sized)
        .and_then(|v| v.as_str())
        .or_else(|| media.get("source_url").and_then(|v| v.as_str()))
        .unwrap_or_default()
        .to_string()
}
