//! HTTP surface: sync trigger, voting, and results.
use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::db::Pool;
use crate::report;
use crate::sync::{SyncJob, TRIGGER_ACTION};
use crate::voting::{self, VoteError};

pub const USER_HEADER: &str = "x-user-id";

#[derive(Clone)]
pub struct AppState {
    pub pool: Pool,
    pub job: Arc<SyncJob>,
    /// Held for the duration of one sync run.
    pub sync_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(pool: Pool, job: SyncJob) -> Self {
        Self {
            pool,
            job: Arc::new(job),
            sync_lock: Arc::new(Mutex::new(())),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(trigger))
        .route("/health", get(health))
        .route("/vote/next", get(vote_next))
        .route("/vote", post(vote_submit))
        .route("/results", get(results))
        .route("/reports/authors", get(authors))
        .with_state(state)
}

pub async fn serve(bind_addr: &str, state: AppState) -> Result<()> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!(addr = %bind_addr, "listening");
    axum::serve(listener, router(state))
        .await
        .context("server error")?;
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct TriggerQuery {
    action: Option<String>,
}

async fn trigger(State(state): State<AppState>, Query(q): Query<TriggerQuery>) -> Response {
    if q.action.as_deref() != Some(TRIGGER_ACTION) {
        return StatusCode::NOT_FOUND.into_response();
    }
    let Ok(_guard) = state.sync_lock.try_lock() else {
        warn!("sync trigger rejected; a run is already in progress");
        return (
            StatusCode::CONFLICT,
            Html("A photo update is already running. Try again later.".to_string()),
        )
            .into_response();
    };

    let report = state.job.run().await;
    let status = if report.is_failure() {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    };
    (status, Html(report.to_html())).into_response()
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

fn user_id(headers: &HeaderMap) -> Option<i64> {
    headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|id| *id > 0)
}

async fn vote_next(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(user) = user_id(&headers) else {
        return error_response(StatusCode::UNAUTHORIZED, "You must be logged in to vote.");
    };
    match voting::next_photo(&state.pool, user).await {
        Ok(prompt) => Json(prompt).into_response(),
        Err(err) => vote_error(err),
    }
}

#[derive(Debug, Deserialize)]
pub struct VoteBody {
    photo_id: i64,
    vote_value: i64,
}

async fn vote_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<VoteBody>,
) -> Response {
    let Some(user) = user_id(&headers) else {
        return error_response(StatusCode::UNAUTHORIZED, "You must be logged in to vote.");
    };
    match voting::submit_vote(&state.pool, user, body.photo_id, body.vote_value).await {
        Ok(receipt) => Json(receipt).into_response(),
        Err(err) => vote_error(err),
    }
}

fn vote_error(err: VoteError) -> Response {
    let status = match &err {
        VoteError::InvalidVote(_) => StatusCode::BAD_REQUEST,
        VoteError::PhotoNotFound(_) => StatusCode::NOT_FOUND,
        VoteError::AlreadyVoted => StatusCode::CONFLICT,
        VoteError::Storage(inner) => {
            error!(?inner, "vote storage failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error_response(status, err.to_string())
}

#[derive(Debug, Deserialize)]
pub struct ResultsQuery {
    limit: Option<i64>,
}

async fn results(State(state): State<AppState>, Query(q): Query<ResultsQuery>) -> Response {
    match report::leaderboard(&state.pool, q.limit).await {
        Ok(rows) => Json(rows).into_response(),
        Err(err) => {
            error!(?err, "leaderboard query failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to load results")
        }
    }
}

async fn authors(State(state): State<AppState>) -> Response {
    match report::author_report(&state.pool).await {
        Ok(rows) => Json(rows).into_response(),
        Err(err) => {
            error!(?err, "author report failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to load author report")
        }
    }
}
