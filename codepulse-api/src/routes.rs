//! The four endpoints of the HTTP API (component C10), per §6.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::trace::TraceLayer;

use codepulse_core::model::{CodeAnalysisRequest, CodeAnalysisResponse};
use codepulse_engine::WorkflowEngine;

use crate::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<WorkflowEngine>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/code-analysis", post(start_analysis))
        .route("/api/v1/code-analysis/:thread_id", get(get_state))
        .route(
            "/api/v1/code-analysis/:thread_id/consolidated-report",
            get(get_consolidated_report),
        )
        .route(
            "/api/v1/code-analysis/:thread_id/product-requirements-report",
            get(get_product_requirements_report),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `POST /api/v1/code-analysis` — schedules the workflow on a background
/// task and returns immediately (§6: "A POST returns immediately after
/// scheduling the workflow on a background worker").
async fn start_analysis(
    State(state): State<AppState>,
    Json(request): Json<CodeAnalysisRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if request.repo_url.trim().is_empty() {
        return Err(ApiError::InvalidRequest("repo_url must not be empty".to_string()));
    }

    let thread_id = uuid::Uuid::new_v4().to_string();
    let engine = state.engine.clone();
    let repo_url = request.repo_url.clone();
    let spawned_thread_id = thread_id.clone();

    tokio::spawn(async move {
        if let Err(e) = engine.run(&spawned_thread_id, &repo_url).await {
            tracing::error!(thread_id = %spawned_thread_id, error = %e, "analysis workflow failed");
        }
    });

    Ok((StatusCode::ACCEPTED, Json(CodeAnalysisResponse { thread_id })))
}

/// `GET /api/v1/code-analysis/{thread_id}` — the latest committed state,
/// even if the pipeline later failed (§7: "a GET on a thread always
/// returns the latest successfully-committed state").
async fn get_state(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let checkpoint = state
        .engine
        .checkpoints()
        .latest(&thread_id)?
        .ok_or_else(|| ApiError::ThreadNotFound(thread_id.clone()))?;
    Ok(Json(checkpoint.state))
}

async fn get_consolidated_report(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let checkpoint = state
        .engine
        .checkpoints()
        .latest(&thread_id)?
        .ok_or_else(|| ApiError::ThreadNotFound(thread_id.clone()))?;
    Ok(checkpoint.state.consolidated_report)
}

async fn get_product_requirements_report(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let checkpoint = state
        .engine
        .checkpoints()
        .latest(&thread_id)?
        .ok_or_else(|| ApiError::ThreadNotFound(thread_id.clone()))?;
    Ok(checkpoint.state.product_requirements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use codepulse_engine::{CheckpointStore, WorkflowEngine};
    use codepulse_llm::{LlmClient, LlmConfig};
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::open(dir.path().to_str().unwrap(), "codepulse").unwrap();
        let llm = LlmClient::new(LlmConfig {
            model: "test".to_string(),
            region: None,
            api_key: None,
            endpoint: Some("http://127.0.0.1:0".to_string()),
        });
        let engine = WorkflowEngine::new(llm, store, codepulse_engine::DEFAULT_TIMEOUT);
        AppState { engine: Arc::new(engine) }
    }

    #[tokio::test]
    async fn unknown_thread_returns_404() {
        let app = router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/code-analysis/missing")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn empty_repo_url_is_rejected() {
        let app = router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/code-analysis")
                    .header("content-type", "application/json")
                    .body(Body::from("{\"repo_url\": \"\"}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
