use async_trait::async_trait;
use reqwest::{Client, Url};
use rss::{Channel, Item};
use std::fmt;
use tracing::{info, warn};

use super::{parse_timestamp, strip_tags, PhotoSource, RemoteError};
use crate::model::{FetchedPhotos, RemotePhotoRecord};

#[derive(Clone)]
pub struct RssSource {
    http: Client,
    feed_base: String,
    hashtag: String,
}

impl fmt::Debug for RssSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RssSource")
            .field("feed_base", &self.feed_base)
            .field("hashtag", &self.hashtag)
            .finish_non_exhaustive()
    }
}

impl RssSource {
    pub fn new(http: Client, feed_base: &str, hashtag: String) -> Self {
        Self {
            http,
            feed_base: feed_base.to_string(),
            hashtag,
        }
    }

    /// `{feed_base}/t/{hashtag}/feed/`
    pub fn feed_url(&self) -> Result<Url, RemoteError> {
        let mut url = Url::parse(&self.feed_base)
            .map_err(|e| RemoteError::Url(format!("{}: {}", self.feed_base, e)))?;
        url.path_segments_mut()
            .map_err(|_| RemoteError::Url(format!("{} cannot be a base", self.feed_base)))?
            .pop_if_empty()
            .extend(["t", self.hashtag.as_str(), "feed", ""]);
        Ok(url)
    }
}

#[async_trait]
impl PhotoSource for RssSource {
    fn name(&self) -> &str {
        "rss"
    }

    async fn fetch_all(&self) -> Result<FetchedPhotos, RemoteError> {
        let url = self.feed_url()?;
        let res = self.http.get(url.clone()).send().await?;
        if !res.status().is_success() {
            return Err(RemoteError::Status {
                status: res.status(),
                url: url.to_string(),
            });
        }
        let body = res.bytes().await?;
        let photos = parse_feed(&body)?;
        info!(found = photos.len(), %url, "fetched photo feed");

        Ok(FetchedPhotos {
            total_count: photos.len() as u64,
            photos,
        })
    }
}

/// Parse a whole feed document. Items without a usable link are dropped.
pub fn parse_feed(body: &[u8]) -> Result<Vec<RemotePhotoRecord>, RemoteError> {
    let channel = Channel::read_from(body)?;
    Ok(channel
        .items()
        .iter()
        .filter_map(|item| {
            let record = normalize_feed_item(item);
            if record.is_none() {
                warn!(title = ?item.title(), "feed item without link; skipping");
            }
            record
        })
        .collect())
}

pub fn normalize_feed_item(item: &Item) -> Option<RemotePhotoRecord> {
    let link = item.link()?.trim();
    let slug = slug_from_link(link)?;

    let published_at = item.pub_date().and_then(parse_timestamp).unwrap_or(0);
    let feed_modified_at = extension_value(item, &["modified", "updated"])
        .and_then(parse_timestamp)
        .unwrap_or(published_at);

    let author = item
        .dublin_core_ext()
        .and_then(|dc| dc.creators().first().map(String::as_str))
        .or_else(|| extension_value(item, &["creator"]))
        .or_else(|| item.author())
        .unwrap_or_default()
        .trim()
        .to_string();

    Some(RemotePhotoRecord {
        external_id: external_id(item).unwrap_or_else(|| slug.clone()),
        slug,
        source_url: link.to_string(),
        image_url: item
            .enclosure()
            .map(|e| e.url().trim().to_string())
            .unwrap_or_default(),
        author,
        published_at,
        feed_modified_at,
        description: item.description().map(strip_tags).unwrap_or_default(),
    })
}

/// `post-id` extension, else the `p` query parameter of the guid, else the guid.
fn external_id(item: &Item) -> Option<String> {
    if let Some(id) = extension_value(item, &["post-id"]) {
        return Some(id.to_string());
    }
    let guid = item.guid()?.value().trim();
    let from_query = Url::parse(guid).ok().and_then(|url| {
        url.query_pairs()
            .find(|(k, _)| k == "p")
            .map(|(_, v)| v.into_owned())
    });
    Some(from_query.unwrap_or_else(|| guid.to_string())).filter(|id| !id.is_empty())
}

/// First non-empty value of an extension element with one of `names`, under any prefix.
fn extension_value<'a>(item: &'a Item, names: &[&str]) -> Option<&'a str> {
    item.extensions()
        .values()
        .flat_map(|by_name| names.iter().filter_map(move |name| by_name.get(*name)))
        .flatten()
        .filter_map(|ext| ext.value())
        .map(str::trim)
        .find(|value| !value.is_empty())
}

/// Last non-empty path segment of the entry link.
pub fn slug_from_link(link: &str) -> Option<String> {
    let url = Url::parse(link).ok()?;
    url.path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()
        .map(str::to_string)
}
