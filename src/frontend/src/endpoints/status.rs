use crate::FrontendState;
use axum::{Json, Router, extract::State, routing::get};
use prom_api::{ApiResponse, BuildInfo};

pub fn router<S: FrontendState>() -> Router<S> {
    Router::new().route("/status/buildinfo", get(build_info::<S>))
}

/// GET /api/v1/status/buildinfo
#[tracing::instrument(skip_all)]
pub async fn build_info<S: FrontendState>(State(state): State<S>) -> Json<ApiResponse<BuildInfo>> {
    Json(ApiResponse::success(state.build_info().clone()))
}

/// GET /-/healthy
pub async fn healthy() -> &'static str {
    "Prometheus frontend is Healthy.\n"
}

/// GET /-/ready
pub async fn ready() -> &'static str {
    "Prometheus frontend is Ready.\n"
}
