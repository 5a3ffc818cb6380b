//! Route handlers. Every body is a bare JSON string.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::{error, info};

use super::AppState;

pub const SUCCESS_MESSAGE: &str = "Success";
/// Kept verbatim for existing callers, although the endpoint indexes JSONL
pub const FAILURE_MESSAGE: &str = "Failed to index markdown";
pub const WELCOME_MESSAGE: &str = "Welcome to memfree vector service!";
pub const NOT_FOUND_MESSAGE: &str = "Page not found";

/// Body of `POST /api/index/jsonl`
#[derive(Debug, Clone, Deserialize)]
pub struct IndexRequest {
    pub url: String,
    #[serde(rename = "userId")]
    pub user_id: String,
}

/// POST /api/index/jsonl - ingest the JSONL file for `url` into the table
/// of `userId`.
pub async fn index_jsonl(State(state): State<AppState>, body: Bytes) -> Response {
    let request: IndexRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            error!("Invalid index request body: {}", e);
            return failure();
        }
    };

    match state
        .ingestor
        .ingest_jsonl(&request.url, &request.user_id)
        .await
    {
        Ok(outcome) => {
            info!(
                "Indexed {} rows from {} into {}",
                outcome.rows_appended,
                request.url,
                outcome.table.name()
            );
            (StatusCode::OK, Json(SUCCESS_MESSAGE)).into_response()
        }
        Err(e) => {
            error!(
                "Failed to index {} for {}: {}",
                request.url, request.user_id, e
            );
            failure()
        }
    }
}

pub async fn welcome() -> Json<&'static str> {
    Json(WELCOME_MESSAGE)
}

pub async fn not_found() -> (StatusCode, Json<&'static str>) {
    (StatusCode::NOT_FOUND, Json(NOT_FOUND_MESSAGE))
}

fn failure() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(FAILURE_MESSAGE)).into_response()
}
