/// HTTP Server Module
///
/// HTTP trigger for the bot plus read-only status endpoints.

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use std::sync::Arc;

use crate::bot::{StreakBot, TriggerEvent};

#[derive(Clone)]
pub struct AppState {
    pub bot: Arc<StreakBot>,
}

/// Create and configure the HTTP server router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/invoke", post(invoke_endpoint))
        .route("/status", get(status_endpoint))
        .route("/authors/:id", get(author_endpoint))
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "hashtag_streak_bot",
        "timestamp": Utc::now().to_rfc3339()
    }))
}

/// Run the bot once; the body may carry a JSON trigger event
async fn invoke_endpoint(
    State(state): State<AppState>,
    body: Bytes,
) -> (StatusCode, Json<serde_json::Value>) {
    let event = if body.is_empty() {
        TriggerEvent::from_source("http")
    } else {
        match serde_json::from_slice::<TriggerEvent>(&body) {
            Ok(mut event) => {
                event.source.get_or_insert_with(|| "http".to_string());
                event
            }
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({ "status": "error", "error": e.to_string() })),
                )
            }
        }
    };

    log::info!("Streak run triggered via HTTP endpoint");

    match state.bot.handle(event).await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "status": "success" }))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "status": "error", "error": format!("{:#}", e) })),
        ),
    }
}

/// Last run outcome
async fn status_endpoint(State(state): State<AppState>) -> Json<serde_json::Value> {
    let status = state.bot.status().await;
    Json(serde_json::json!(status))
}

/// Look up one author's record
async fn author_endpoint(
    State(state): State<AppState>,
    Path(author_id): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    match state.bot.author(&author_id).await {
        Ok(Some(record)) => Ok(Json(serde_json::json!(record))),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            log::error!("Author lookup failed: {:#}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Start the HTTP server
pub async fn start_server(state: AppState, port: u16) -> Result<()> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .context("Failed to bind HTTP server")?;

    log::info!("HTTP server listening on port {}", port);

    axum::serve(listener, app)
        .await
        .context("HTTP server error")?;

    Ok(())
}
