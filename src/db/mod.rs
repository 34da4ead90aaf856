//! Database module: entity models, SQL repositories and the storage seam.
//!
//! This module is split into three submodules:
//! - `model`: typed domain entities and view models returned by repositories.
//! - `repo`: SQL-only functions that map rows into entities.
//! - `store`: the `PhotoStore` trait the sync job writes through, plus its
//!   SQLite implementation.
//!
//! External modules should import from `photo_contest::db`; the repository
//! API and commonly used models are re-exported here.

pub mod model;
pub mod repo;
pub mod store;

pub use repo::*;

pub use model::{
    AuthorReportRow, ContestSettings, LeaderboardRow, NewMediaAsset, PhotoCard, PhotoContent,
    PhotoMeta, StoredPhoto, PUBLISHED,
};
pub use store::{PhotoStore, SqlitePhotoStore};
