//! Error taxonomy for the sync job.
use thiserror::Error;

use crate::fetch::RemoteError;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Hashtag or tag id missing; raised before any remote call.
    #[error("{0}")]
    Config(String),
    /// Listing could not be fetched or decoded; aborts the run.
    #[error("{0}")]
    Remote(#[from] RemoteError),
    /// Entity create/update failed; isolated to one record.
    #[error("{0}")]
    Persist(String),
}

impl SyncError {
    pub fn persist(err: anyhow::Error) -> Self {
        SyncError::Persist(format!("{:#}", err))
    }

    pub fn is_fatal(&self) -> bool {
        !matches!(self, SyncError::Persist(_))
    }
}
