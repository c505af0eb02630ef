//! HTTP API for the coach service.
//!
//! Endpoints:
//! - Health and metrics monitoring
//! - Chat turns and personality management
//! - Session creation (login/signup)

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::service::CoachService;

pub mod chat;
use chat::{chat_handler, login_handler, personality_handler, signup_handler};

/// Application state
pub struct AppState {
    pub service: Arc<CoachService>,
    pub start_time: Instant,
}

/// Build the API router
pub fn router(service: Arc<CoachService>) -> Router {
    let state = Arc::new(AppState {
        service,
        start_time: Instant::now(),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/chat", post(chat_handler))
        .route("/personality", post(personality_handler))
        .route("/login", post(login_handler))
        .route("/signup", post(signup_handler));

    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .nest("/api", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// === Health & Metrics ===

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let completion_available = state.service.completion_available().await;

    let status = if completion_available {
        "healthy"
    } else {
        "degraded: completion service unavailable"
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        completion_available,
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    uptime_seconds: u64,
    completion_available: bool,
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let metrics = format!(
        "# HELP coach_active_sessions Number of active user sessions\n\
         # TYPE coach_active_sessions gauge\n\
         coach_active_sessions {}\n\
         \n\
         # HELP coach_uptime_seconds Seconds since the service started\n\
         # TYPE coach_uptime_seconds counter\n\
         coach_uptime_seconds {}\n",
        state.service.session_count(),
        state.start_time.elapsed().as_secs(),
    );

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics,
    )
}
