use serde::{Deserialize, Serialize};

/// One photo as reported by the remote directory, normalized across sources.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemotePhotoRecord {
    pub external_id: String,
    pub slug: String,
    pub source_url: String,
    /// May be empty when the remote item carries no usable media.
    pub image_url: String,
    pub author: String,
    pub published_at: i64,
    pub feed_modified_at: i64,
    pub description: String,
}

/// Everything one `fetch_all` call returned.
#[derive(Debug, Clone, Default)]
pub struct FetchedPhotos {
    pub photos: Vec<RemotePhotoRecord>,
    pub total_count: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UpsertStatus {
    Skipped,
    Created,
    Updated,
}

impl UpsertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpsertStatus::Skipped => "skipped",
            UpsertStatus::Created => "created",
            UpsertStatus::Updated => "updated",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            UpsertStatus::Skipped => "Skipped",
            UpsertStatus::Created => "Created",
            UpsertStatus::Updated => "Updated",
        }
    }

    /// Whether this outcome counts against the per-run budget.
    pub fn counts_as_processed(&self) -> bool {
        matches!(self, UpsertStatus::Created | UpsertStatus::Updated)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertResult {
    pub status: UpsertStatus,
    pub entity_id: i64,
}

/// Outcome of the explicit primary-image step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageStep {
    AlreadyPresent,
    SkippedEmptyUrl,
    Attached(i64),
    Failed(String),
}
