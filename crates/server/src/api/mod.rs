use crate::config::AppState;
use anyhow::Result;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use selfservice_core::resource::ResourceError;
use selfservice_core::StageError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

mod handlers;

/// Start the API server
pub async fn serve(addr: &str, state: AppState) -> Result<()> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // API routes
        .route("/api/health", get(health_check))
        .route("/api/workflows", get(handlers::list_workflows))
        .route("/api/workflows/{name}", get(handlers::get_workflow))
        // Everything else is a resource request
        .fallback(handlers::dispatch)
        // Middleware
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "selfservice",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// API error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub reason: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Error type for API handlers
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    response: ErrorResponse,
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        ResourceError::not_found(message).into()
    }
}

fn source_chain(error: &dyn std::error::Error) -> Option<String> {
    let mut details = Vec::new();
    let mut source = error.source();
    while let Some(cause) = source {
        details.push(cause.to_string());
        source = cause.source();
    }

    if details.is_empty() {
        None
    } else {
        Some(details.join(": "))
    }
}

impl From<ResourceError> for ApiError {
    fn from(err: ResourceError) -> Self {
        if err.is_server_error() {
            tracing::warn!("Resource request failed: {}", err);
        } else {
            tracing::warn!("Resource request rejected ({}): {}", err.code(), err);
        }

        Self {
            status: StatusCode::from_u16(err.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            response: ErrorResponse {
                code: err.code(),
                reason: err.reason().to_string(),
                message: err.to_string(),
                detail: source_chain(&err),
            },
        }
    }
}

impl From<StageError> for ApiError {
    fn from(err: StageError) -> Self {
        tracing::warn!("Workflow request failed: {}", err);

        let status = StatusCode::INTERNAL_SERVER_ERROR;
        Self {
            status,
            response: ErrorResponse {
                code: status.as_u16(),
                reason: "Internal Server Error".to_string(),
                message: err.to_string(),
                detail: source_chain(&err),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.response)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
