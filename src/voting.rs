//! Contest voting: one vote per user per photo, points on a fixed scale.
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument};

use crate::db::{self, PhotoCard, Pool};

#[derive(Debug, Error)]
pub enum VoteError {
    #[error("Invalid vote value {0}; expected 1 to 5.")]
    InvalidVote(i64),
    #[error("Photo {0} not found.")]
    PhotoNotFound(i64),
    #[error("You have already voted for this photo.")]
    AlreadyVoted,
    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

/// Star rating to points: 1→0, 2→3, 3→5, 4→7, 5→10.
pub fn points_for_vote(value: i64) -> Option<i64> {
    match value {
        1 => Some(0),
        2 => Some(3),
        3 => Some(5),
        4 => Some(7),
        5 => Some(10),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VotePrompt {
    pub photo: Option<PhotoCard>,
    pub remaining: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoteReceipt {
    pub average: f64,
    pub next_photo: Option<PhotoCard>,
    pub remaining: i64,
}

/// Random photo the user has not rated yet, with how many are left.
pub async fn next_photo(pool: &Pool, user_id: i64) -> Result<VotePrompt, VoteError> {
    let photo = db::random_unvoted_photo(pool, user_id).await?;
    let remaining = db::count_unvoted_photos(pool, user_id).await?;
    Ok(VotePrompt { photo, remaining })
}

#[instrument(skip(pool))]
pub async fn submit_vote(
    pool: &Pool,
    user_id: i64,
    photo_id: i64,
    value: i64,
) -> Result<VoteReceipt, VoteError> {
    let points = points_for_vote(value).ok_or(VoteError::InvalidVote(value))?;
    if !db::photo_exists(pool, photo_id).await? {
        return Err(VoteError::PhotoNotFound(photo_id));
    }

    let average = db::record_vote(pool, user_id, photo_id, points)
        .await?
        .ok_or(VoteError::AlreadyVoted)?;
    info!(points, average, "vote recorded");

    let VotePrompt { photo, remaining } = next_photo(pool, user_id).await?;
    Ok(VoteReceipt {
        average,
        next_photo: photo,
        remaining,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_scale() {
        let mapped: Vec<_> = (1..=5).map(|v| points_for_vote(v).unwrap()).collect();
        assert_eq!(mapped, vec![0, 3, 5, 7, 10]);
        assert_eq!(points_for_vote(0), None);
        assert_eq!(points_for_vote(6), None);
        assert_eq!(points_for_vote(-1), None);
    }
}
