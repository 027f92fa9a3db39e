//! Room allocation dashboard server library.

pub mod handlers;
pub mod middleware;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::ServeFile;
use tower_http::trace::TraceLayer;

use room_allocator_allocator::Allocator;
use room_allocator_config::AppConfig;
use room_allocator_domain::{AllocationConfig, HealthResponse, ReadyResponse};
use room_allocator_predictor::Predictor;
use room_allocator_storage::check_connection;
use room_allocator_workflow::Workflow;
use sqlx::SqlitePool;

use middleware::auth::AdminAuth;

/// Application state shared across handlers.
pub struct AppState {
    pub pool: SqlitePool,
    pub predictor: Arc<Predictor>,
    pub allocator: Allocator,
    pub allocation_defaults: AllocationConfig,
    pub workflow: Arc<Workflow>,
    pub auth: AdminAuth,
    pub config: AppConfig,
    pub start_time: Instant,
}

pub fn build_router(state: Arc<AppState>, dashboard_index: &str) -> Router {
    let dashboard = ServeFile::new(dashboard_index);
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/ready", get(ready))
        .route_service("/", dashboard.clone())
        .route_service("/dashboard", dashboard)
        .route("/predict_availability", post(handlers::prediction::predict_availability))
        .route("/optimize_allocation", post(handlers::allocation::optimize_allocation))
        .route("/simulate", post(handlers::simulation::simulate))
        .route("/login", post(handlers::login::login))
        .route("/predict", post(handlers::workflow::predict))
        .route("/allocate", post(handlers::workflow::allocate))
        .route("/approve", post(handlers::workflow::approve))
        .route("/metrics", get(handlers::workflow::metrics))
        .route("/demo_context", get(handlers::workflow::demo_context))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let uptime = state.start_time.elapsed().as_secs();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: state.config.app_version.clone(),
        build_sha: option_env!("BUILD_SHA").unwrap_or("dev").to_string(),
        uptime_seconds: uptime,
    })
}

async fn ready(State(state): State<Arc<AppState>>) -> Json<ReadyResponse> {
    let db_status = match check_connection(&state.pool).await {
        Ok(()) => "connected",
        Err(_) => "disconnected",
    };
    Json(ReadyResponse {
        status: if db_status == "connected" { "ok" } else { "degraded" }.to_string(),
        database: db_status.to_string(),
    })
}
