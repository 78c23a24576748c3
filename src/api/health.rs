/// Health check endpoint
use crate::{context::AppContext, db};
use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use serde::Serialize;

/// Health status response
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// "healthy" or "unhealthy"
    pub status: &'static str,
    pub version: String,
    pub database: &'static str,
}

/// Build health check routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/api/health", get(health_check))
}

async fn health_check(State(ctx): State<AppContext>) -> (StatusCode, Json<HealthStatus>) {
    let (status, code, database) = match db::test_connection(&ctx.db).await {
        Ok(()) => ("healthy", StatusCode::OK, "ok"),
        Err(e) => {
            tracing::error!("Health check database probe failed: {}", e);
            ("unhealthy", StatusCode::SERVICE_UNAVAILABLE, "unreachable")
        }
    };

    (
        code,
        Json(HealthStatus {
            status,
            version: ctx.config.service.version.clone(),
            database,
        }),
    )
}
