//! HTTP surface for experience search.
//!
//! Routes:
//! - `GET  /healthz`
//! - `POST /api/search` with `{query, top_k?}`
//! - `GET  /api/stats`
//! - `POST /api/reload` to pick up freshly written shards

use std::{net::SocketAddr, sync::Arc};

use {
    anyhow::Context,
    axum::{
        Json, Router,
        extract::{State, rejection::JsonRejection},
        http::StatusCode,
        response::{IntoResponse, Response},
        routing::{get, post},
    },
    lifematch_experiences::{Error, ExperienceManager, SearchRequest, SearchResponse},
    serde::Serialize,
    tracing::{error, info, warn},
};

#[derive(Clone)]
pub struct AppState {
    manager: Arc<ExperienceManager>,
}

pub fn router(manager: Arc<ExperienceManager>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/search", post(search))
        .route("/api/stats", get(stats))
        .route("/api/reload", post(reload))
        .with_state(AppState { manager })
}

/// Load the corpus, bind, and serve until Ctrl-C.
pub async fn serve(manager: Arc<ExperienceManager>, bind: &str) -> anyhow::Result<()> {
    let addr: SocketAddr = bind
        .parse()
        .with_context(|| format!("invalid bind address {bind}"))?;

    let corpus = manager.reload().await;
    info!(
        people = corpus.people(),
        experiences = corpus.len(),
        "corpus ready"
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "lifematch gateway listening");

    axum::serve(listener, router(manager))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps core errors onto 400 (caller input) or 500 (everything else).
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        if err.is_client_error() {
            return Self::bad_request(err.to_string());
        }
        error!(error = %err, "request failed");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody {
            error: self.message,
        }))
            .into_response()
    }
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn search(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        ApiError::bad_request(format!("invalid request body: {}", rejection.body_text()))
    })?;
    Ok(Json(state.manager.search(&request).await?))
}

#[derive(Debug, Serialize)]
struct StatsBody {
    total_people: usize,
    total_experiences: usize,
    corrupt_shards: usize,
    database_path: String,
}

async fn stats(State(state): State<AppState>) -> Json<StatsBody> {
    let stats = state.manager.stats().await;
    Json(StatsBody {
        total_people: stats.total_people,
        total_experiences: stats.total_experiences,
        corrupt_shards: stats.corrupt_shards,
        database_path: state.manager.store().dir().display().to_string(),
    })
}

#[derive(Debug, Serialize)]
struct ReloadBody {
    people: usize,
    experiences: usize,
    skipped_shards: usize,
}

async fn reload(State(state): State<AppState>) -> Json<ReloadBody> {
    let corpus = state.manager.reload().await;
    Json(ReloadBody {
        people: corpus.people(),
        experiences: corpus.len(),
        skipped_shards: corpus.skipped_shards(),
    })
}
