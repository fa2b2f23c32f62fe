//! 运维路由：存活、就绪、指标

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use medrec_adapter_postgres::check_connection;
use medrec_telemetry::HealthStatus;
use serde::Serialize;
use tracing::warn;

use crate::state::AppState;

pub fn ops_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn readiness_check(State(state): State<AppState>) -> Response {
    let mut status = HealthStatus::new();

    if let Some(pool) = &state.db {
        match check_connection(pool).await {
            Ok(()) => status.add_check("database", true, None),
            Err(e) => {
                warn!(error = %e, "Readiness check failed");
                status.add_check("database", false, Some(e.to_string()));
            }
        }
    }

    let code = if status.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status)).into_response()
}

async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
