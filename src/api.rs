//! HTTP endpoints for batch triage.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::error::TriageError;
use crate::triage::TriageCoordinator;

const INVALID_REQUEST: &str = "Invalid request format";
const PROCESSING_FAILED: &str = "Failed to process emails";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<TriageCoordinator>,
}

/// Build the Axum router with the triage routes.
pub fn triage_routes(coordinator: Arc<TriageCoordinator>) -> Router {
    let state = AppState { coordinator };

    Router::new()
        .route("/health", get(health))
        .route("/api/process-emails", post(process_emails))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "inbox-triage",
        "strategy": state.coordinator.strategy().label(),
    }))
}

// ── Batch triage ────────────────────────────────────────────────────────

/// POST /api/process-emails
///
/// Body: `{ "emails": [Message, ...] }`. Returns `{ "processedEmails": [...] }`.
async fn process_emails(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    // A body that is not JSON is a malformed request, so it gets the same 400
    // as a bad `emails` shape rather than the 500 used for processing failures.
    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "Request body is not valid JSON");
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": INVALID_REQUEST })));
        }
    };

    match state.coordinator.process_payload(payload).await {
        Ok(results) => (StatusCode::OK, Json(json!({ "processedEmails": results }))),
        Err(e) => error_response(&e),
    }
}

fn error_response(err: &TriageError) -> (StatusCode, Json<serde_json::Value>) {
    match err {
        TriageError::InvalidInput(reason) => {
            warn!(reason = %reason, "Rejected triage batch");
            (StatusCode::BAD_REQUEST, Json(json!({ "error": INVALID_REQUEST })))
        }
        TriageError::Internal(reason) => {
            error!(reason = %reason, "Error processing emails");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": PROCESSING_FAILED })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_is_bad_request() {
        let (status, Json(body)) =
            error_response(&TriageError::InvalidInput("emails must be an array".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid request format");
    }

    #[test]
    fn internal_error_is_server_error() {
        let (status, Json(body)) = error_response(&TriageError::Internal("task panicked".into()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to process emails");
    }
}
