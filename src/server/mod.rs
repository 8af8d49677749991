//! HTTP surface: request schemas, routing, CORS, and error mapping.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::processor::{ProcessError, RowProcessor};

#[derive(Clone)]
pub struct AppState {
    pub processor: Arc<RowProcessor>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateColumnRequest {
    pub rows: Vec<Value>,
    pub column_name: String,
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct GenerateColumnResponse {
    pub values: Vec<String>,
}

#[derive(Serialize)]
struct Detail {
    detail: String,
}

enum ApiError {
    /// Upstream exhausted its retries; the client should try again.
    BadGateway,
    /// The request cannot be processed as sent.
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadGateway => (
                StatusCode::BAD_GATEWAY,
                Json(Detail { detail: "LLM error, please retry".to_string() }),
            )
                .into_response(),
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, Json(Detail { detail })).into_response()
            }
        }
    }
}

pub fn build_router(state: AppState, cfg: &Config) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/generate-column", post(generate_column))
        .layer(cors_layer(cfg))
        .with_state(state)
}

fn cors_layer(cfg: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = cfg
        .allowed_origins()
        .into_iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %origin, "skipping unparseable CORS origin");
                None
            }
        })
        .collect();

    // Credentials rule out wildcards; mirroring grants the same surface.
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true, "service": "colgen" }))
}

async fn generate_column(
    State(state): State<AppState>,
    payload: Result<Json<GenerateColumnRequest>, JsonRejection>,
) -> Result<Json<GenerateColumnResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    info!(column = %req.column_name, rows = req.rows.len(), "generate-column request");

    match state.processor.process(&req.rows, &req.prompt).await {
        Ok(values) => Ok(Json(GenerateColumnResponse { values })),
        Err(ProcessError::Exhausted { attempts, last_error }) => {
            // The cause stays in the log; clients only get a retry hint.
            error!(attempts, error = %last_error, "upstream exhausted");
            Err(ApiError::BadGateway)
        }
        Err(err) => Err(ApiError::BadRequest(err.to_string())),
    }
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
