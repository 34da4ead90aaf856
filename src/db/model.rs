//! Database entity and view models used by repositories.
//!
//! Keep these structs focused on the data returned by queries. Business logic
//! should live in higher layers.

use serde::Serialize;

use crate::model::RemotePhotoRecord;

/// Status written for every imported photo.
pub const PUBLISHED: &str = "publish";

/// Photo slice the upsert engine needs to decide between skip/create/update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPhoto {
    pub id: i64,
    pub slug: String,
    pub feed_modified_at: Option<i64>,
    pub has_primary_image: bool,
}

/// Core content columns of a photo entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoContent {
    pub slug: String,
    pub title: String,
    pub body: String,
    pub status: String,
    pub created_at: i64,
}

impl PhotoContent {
    pub fn from_record(record: &RemotePhotoRecord) -> Self {
        Self {
            slug: record.slug.clone(),
            title: record.slug.clone(),
            body: record.description.clone(),
            status: PUBLISHED.to_string(),
            created_at: record.published_at,
        }
    }
}

/// Remote metadata mirrored onto the entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhotoMeta {
    pub photo_id: String,
    pub photo_url: String,
    pub photo_image_url: String,
    pub photo_author: String,
    pub photo_date: i64,
    pub photo_feed_date: i64,
}

impl PhotoMeta {
    pub fn from_record(record: &RemotePhotoRecord) -> Self {
        Self {
            photo_id: record.external_id.clone(),
            photo_url: record.source_url.clone(),
            photo_image_url: record.image_url.clone(),
            photo_author: record.author.clone(),
            photo_date: record.published_at,
            photo_feed_date: record.feed_modified_at,
        }
    }
}

/// A downloaded file about to be registered as a media asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMediaAsset {
    pub source_url: String,
    pub file_path: String,
    pub content_type: Option<String>,
    pub byte_len: i64,
}

/// Photo as shown to a voter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhotoCard {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub author: Option<String>,
    pub url: Option<String>,
    pub image_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardRow {
    pub position: usize,
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub url: Option<String>,
    pub author: Option<String>,
    pub average: f64,
    pub vote_count: i64,
    pub image_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorReportRow {
    pub author: String,
    pub photo_count: i64,
    pub vote_count: i64,
    /// Mean of per-photo averages over photos that received votes.
    pub mean_average: Option<f64>,
}

/// Hashtag configuration persisted by the tag resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContestSettings {
    pub hashtag: Option<String>,
    pub tag_id: Option<i64>,
}
