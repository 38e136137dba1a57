//! Public JSON routes over the [`QueryService`].

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::app::PodcacheError;
use crate::domain::{Episode, SyncRecord};
use crate::query::{EpisodePage, EpisodeParams, QueryService, SourceList, StatusReport};

/// JSON error body with a status code derived from the failure kind.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<PodcacheError> for ApiError {
    fn from(err: PodcacheError) -> Self {
        let status = match &err {
            PodcacheError::NotFound(_) => StatusCode::NOT_FOUND,
            e if e.is_unavailable() => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("API request failed: {}", err);
        }

        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
        }));
        (self.status, body).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

#[derive(Debug, Default, Deserialize)]
pub struct SourceParams {
    pub category: Option<String>,
}

/// Routes relative to the mount point.
pub fn routes(query: QueryService) -> Router {
    Router::new()
        .route("/api/episodes", get(list_episodes))
        .route("/api/episodes/{id}", get(get_episode))
        .route("/api/sources", get(list_sources))
        .route("/api/status", get(status))
        .with_state(query)
}

/// Mount the routes under `mount`, e.g. `/podcasts`. An empty or `/` mount
/// serves them from the root.
pub fn router(query: QueryService, mount: &str) -> Router {
    let mount = mount.trim().trim_end_matches('/');
    if mount.is_empty() {
        return routes(query);
    }

    let mount = if mount.starts_with('/') {
        mount.to_string()
    } else {
        format!("/{}", mount)
    };
    Router::new().nest(&mount, routes(query))
}

pub async fn list_episodes(
    State(query): State<QueryService>,
    params: std::result::Result<Query<EpisodeParams>, QueryRejection>,
) -> ApiResult<EpisodePage> {
    let Query(params) = params?;
    Ok(Json(query.list_episodes(&params)?))
}

pub async fn get_episode(
    State(query): State<QueryService>,
    Path(id): Path<String>,
) -> ApiResult<Episode> {
    Ok(Json(query.get_episode(&id)?))
}

pub async fn list_sources(
    State(query): State<QueryService>,
    params: std::result::Result<Query<SourceParams>, QueryRejection>,
) -> ApiResult<SourceList> {
    let Query(params) = params?;
    Ok(Json(query.list_sources(params.category.as_deref())?))
}

pub async fn status(State(query): State<QueryService>) -> Response {
    let report = query.get_status();
    let code = if report.available {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status_body(&report))).into_response()
}

fn status_body(report: &StatusReport) -> serde_json::Value {
    fn section(count: usize, last: &Option<SyncRecord>) -> serde_json::Value {
        json!({ "count": count, "lastSync": last })
    }

    json!({
        "status": if report.available { "ok" } else { "unavailable" },
        "episodes": section(report.episode_count, &report.last_episodes_sync),
        "sources": section(report.source_count, &report.last_sources_sync),
    })
}
