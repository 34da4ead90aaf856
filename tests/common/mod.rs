#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use photo_contest::config::{self, Config};
use photo_contest::db::{NewMediaAsset, Pool};
use photo_contest::fetch::{PhotoSource, RemoteError};
use photo_contest::media::MediaSideloader;
use photo_contest::model::{FetchedPhotos, RemotePhotoRecord};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

pub const TAG_ID: i64 = 7;

pub async fn setup_pool() -> Pool {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

pub fn ts(secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .unwrap()
        .format("%Y-%m-%dT%H:%M:%S")
        .to_string()
}

pub fn record(slug: &str, modified: i64, image_url: &str) -> RemotePhotoRecord {
    RemotePhotoRecord {
        external_id: format!("id-{}", slug),
        slug: slug.to_string(),
        source_url: format!("https://wordpress.org/photos/photo/{}/", slug),
        image_url: image_url.to_string(),
        author: "Marta".to_string(),
        published_at: 1_700_000_000,
        feed_modified_at: modified,
        description: format!("{} description", slug),
    }
}

/// REST payload for one photo. `image` is a path on the mock server.
pub fn photo_json(base: &str, id: i64, slug: &str, modified: i64, image: Option<&str>) -> Value {
    let media: Vec<Value> = image
        .map(|path| vec![json!({ "source_url": format!("{base}{path}") })])
        .unwrap_or_default();
    json!({
        "id": id,
        "slug": slug,
        "link": format!("https://wordpress.org/photos/photo/{slug}/"),
        "date_gmt": ts(1_700_000_000),
        "modified_gmt": ts(modified),
        "content": { "rendered": format!("<p>{slug} at dusk</p>") },
        "_embedded": {
            "author": [{ "id": 3, "name": "Marta" }],
            "wp:featuredmedia": media,
        }
    })
}

/// Mutable state behind the mock photo directory.
#[derive(Default)]
pub struct Directory {
    pub photos: Vec<Value>,
    pub tags: Vec<Value>,
    pub page_size: usize,
    pub fail_page: Option<u32>,
    /// Answer photo pages with a 200 HTML body instead of JSON.
    pub html_pages: bool,
    pub omit_page_headers: bool,
    pub feed: String,
    pub requests: Vec<String>,
}

pub type SharedDirectory = Arc<Mutex<Directory>>;

pub struct MockDirectory {
    pub base: String,
    pub state: SharedDirectory,
    pub handle: tokio::task::JoinHandle<()>,
}

impl MockDirectory {
    pub async fn start() -> Self {
        let state: SharedDirectory = Arc::new(Mutex::new(Directory {
            tags: vec![json!({ "id": TAG_ID, "name": "sunset" })],
            ..Default::default()
        }));
        let app = Router::new()
            .route("/wp-json/wp/v2/photos", get(photos))
            .route("/wp-json/wp/v2/photo-tags", get(photo_tags))
            .route("/photos/t/:tag/feed/", get(feed))
            .route("/img/:name", get(image))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base: format!("http://{addr}"),
            state,
            handle,
        }
    }

    pub fn rest_base(&self) -> String {
        format!("{}/wp-json/wp/v2", self.base)
    }

    pub fn feed_base(&self) -> String {
        format!("{}/photos", self.base)
    }

    pub async fn set_photos(&self, photos: Vec<Value>) {
        self.state.lock().await.photos = photos;
    }

    pub async fn requests_matching(&self, prefix: &str) -> usize {
        self.state
            .lock()
            .await
            .requests
            .iter()
            .filter(|r| r.starts_with(prefix))
            .count()
    }
}

async fn photos(State(dir): State<SharedDirectory>, Query(q): Query<HashMap<String, String>>) -> Response {
    let mut dir = dir.lock().await;
    let page: u32 = q.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    dir.requests.push(format!("photos page={page}"));

    if q.get("photo-tags") != Some(&TAG_ID.to_string()) {
        return Json(Vec::<Value>::new()).into_response();
    }
    if dir.fail_page == Some(page) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    if dir.html_pages {
        return (
            [("content-type", "text/html")],
            "<html><body>Briefly unavailable for scheduled maintenance.</body></html>",
        )
            .into_response();
    }

    let size = if dir.page_size > 0 {
        dir.page_size
    } else {
        q.get("per_page").and_then(|p| p.parse().ok()).unwrap_or(10)
    };
    let total = dir.photos.len();
    let total_pages = ((total + size - 1) / size).max(1);
    let items: Vec<Value> = dir
        .photos
        .iter()
        .skip((page as usize - 1) * size)
        .take(size)
        .cloned()
        .collect();

    let mut res = Json(items).into_response();
    if dir.omit_page_headers {
        return res;
    }
    res.headers_mut()
        .insert("X-WP-Total", HeaderValue::from(total as u64));
    res.headers_mut()
        .insert("X-WP-TotalPages", HeaderValue::from(total_pages as u64));
    res
}

async fn photo_tags(State(dir): State<SharedDirectory>, Query(q): Query<HashMap<String, String>>) -> Response {
    let mut dir = dir.lock().await;
    let search = q.get("search").cloned().unwrap_or_default().to_lowercase();
    dir.requests.push(format!("photo-tags search={search}"));
    let found: Vec<Value> = dir
        .tags
        .iter()
        .filter(|t| {
            t["name"]
                .as_str()
                .map(|n| n.to_lowercase().contains(&search))
                .unwrap_or(false)
        })
        .cloned()
        .collect();
    Json(found).into_response()
}

async fn feed(State(dir): State<SharedDirectory>, Path(tag): Path<String>) -> Response {
    let mut dir = dir.lock().await;
    dir.requests.push(format!("feed tag={tag}"));
    if dir.feed.is_empty() {
        return StatusCode::NOT_FOUND.into_response();
    }
    (
        [("content-type", "application/rss+xml")],
        dir.feed.clone(),
    )
        .into_response()
}

async fn image(State(dir): State<SharedDirectory>, Path(name): Path<String>) -> Response {
    dir.lock().await.requests.push(format!("img {name}"));
    if name.starts_with("missing") {
        return StatusCode::NOT_FOUND.into_response();
    }
    (
        [("content-type", "image/jpeg")],
        vec![0xFFu8, 0xD8, 0xFF, 0xE0],
    )
        .into_response()
}

/// Example config pointed at the mock directory, storing data in `data_dir`.
pub fn test_config(mock: &MockDirectory, data_dir: &std::path::Path) -> Config {
    let mut cfg: Config = serde_yaml::from_str(config::example()).unwrap();
    cfg.app.data_dir = data_dir.display().to_string();
    cfg.remote.rest_base = mock.rest_base();
    cfg.remote.feed_base = mock.feed_base();
    cfg.remote.timeout_secs = 5;
    cfg
}

/// Source double serving a fixed listing.
#[derive(Clone, Default)]
pub struct StaticSource {
    pub photos: Vec<RemotePhotoRecord>,
}

#[async_trait]
impl PhotoSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch_all(&self) -> Result<FetchedPhotos, RemoteError> {
        Ok(FetchedPhotos {
            total_count: self.photos.len() as u64,
            photos: self.photos.clone(),
        })
    }
}

/// Sideloader double: records every URL, fails for URLs containing "missing".
#[derive(Clone, Default)]
pub struct RecordingMedia {
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl RecordingMedia {
    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl MediaSideloader for RecordingMedia {
    async fn sideload(&self, url: &str, slug: &str) -> Result<NewMediaAsset> {
        self.calls.lock().await.push(url.to_string());
        if url.contains("missing") {
            return Err(anyhow!("image download failed with 404 Not Found for {}", url));
        }
        Ok(NewMediaAsset {
            source_url: url.to_string(),
            file_path: format!("/media/{}.jpg", slug),
            content_type: Some("image/jpeg".into()),
            byte_len: 4,
        })
    }
}
