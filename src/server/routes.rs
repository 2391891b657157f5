//! HTTP handlers.

use std::path::PathBuf;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};

use super::state::AppState;
use crate::error::RagError;
use crate::models::IngestReport;
use crate::services::SourceSummary;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub question: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    pub sources: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub path: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub removed: usize,
}

/// Error body returned by every failing handler.
#[derive(Debug)]
pub enum ApiError {
    Rag(RagError),
    NotFound(String),
}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        ApiError::Rag(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Rag(err) => {
                let status = match &err {
                    RagError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
                    RagError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status.is_server_error() {
                    error!(error = %err, "request failed");
                }
                (status, err.to_string())
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// GET /health
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "okay" }))
}

/// POST /api/chat
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    info!(question = %request.question, "chat request");

    let answer = state.pipeline().ask(&request.question, None).await?;
    Ok(Json(ChatResponse {
        answer: answer.text,
        sources: answer.used_sources.into_iter().collect(),
    }))
}

/// POST /api/ingest
pub async fn ingest(
    State(state): State<AppState>,
    Json(request): Json<IngestRequest>,
) -> Result<Json<IngestReport>, ApiError> {
    if !request.path.exists() {
        return Err(ApiError::NotFound(format!(
            "path not found: {}",
            request.path.display()
        )));
    }

    let report = state.pipeline().retriever().ingest_dir(&request.path).await?;
    Ok(Json(report))
}

/// GET /api/sources
pub async fn list_sources(State(state): State<AppState>) -> Json<Vec<SourceSummary>> {
    Json(state.pipeline().retriever().index().sources())
}

/// DELETE /api/sources/:source_id
pub async fn delete_source(
    State(state): State<AppState>,
    Path(source_id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let removed = state
        .pipeline()
        .retriever()
        .delete_source(&source_id)
        .await?;
    Ok(Json(DeleteResponse { removed }))
}
