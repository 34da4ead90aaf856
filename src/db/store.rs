use anyhow::Result;
use async_trait::async_trait;

use super::model::{NewMediaAsset, PhotoContent, PhotoMeta, StoredPhoto};
use super::repo::{self, Pool};

/// Storage operations the sync job needs. The SQLite implementation is the
/// only production one; tests wrap it to inject failures.
#[async_trait]
pub trait PhotoStore: Send + Sync {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<StoredPhoto>>;

    async fn create_photo(&self, content: &PhotoContent) -> Result<i64>;

    async fn update_photo(&self, id: i64, content: &PhotoContent) -> Result<()>;

    async fn write_meta(&self, id: i64, meta: &PhotoMeta) -> Result<()>;

    async fn attach_primary_image(&self, id: i64, asset: &NewMediaAsset) -> Result<i64>;
}

#[derive(Debug, Clone)]
pub struct SqlitePhotoStore {
    pool: Pool,
}

impl SqlitePhotoStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

#[async_trait]
impl PhotoStore for SqlitePhotoStore {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<StoredPhoto>> {
        repo::find_photo_by_slug(&self.pool, slug).await
    }

    async fn create_photo(&self, content: &PhotoContent) -> Result<i64> {
        repo::insert_photo(&self.pool, content).await
    }

    async fn update_photo(&self, id: i64, content: &PhotoContent) -> Result<()> {
        repo::update_photo(&self.pool, id, content).await
    }

    async fn write_meta(&self, id: i64, meta: &PhotoMeta) -> Result<()> {
        repo::write_photo_meta(&self.pool, id, meta).await
    }

    async fn attach_primary_image(&self, id: i64, asset: &NewMediaAsset) -> Result<i64> {
        repo::attach_primary_image(&self.pool, id, asset).await
    }
}
