use crate::FrontendState;
use crate::federation::{FederationError, Merged};
use axum::{
    Json, Router,
    extract::{RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use prom_api::{ApiResponse, error_type};
use serde_json::{Map, Value};

pub fn router<S: FrontendState>() -> Router<S> {
    Router::new()
        .route("/rules", get(rule_groups::<S>))
        .route("/rules/", get(not_found))
        .route("/alerts", get(alerts::<S>))
}

/// GET /api/v1/rules
///
/// See https://prometheus.io/docs/prometheus/latest/querying/api/#rules
#[tracing::instrument(skip_all, fields(query = ?query))]
pub async fn rule_groups<S: FrontendState>(
    State(state): State<S>,
    RawQuery(query): RawQuery,
) -> Response {
    let result = state.rule_proxy().rule_groups(query.as_deref()).await;
    federated(result, "groups")
}

/// GET /api/v1/alerts
///
/// See https://prometheus.io/docs/prometheus/latest/querying/api/#alerts
#[tracing::instrument(skip_all, fields(query = ?query))]
pub async fn alerts<S: FrontendState>(
    State(state): State<S>,
    RawQuery(query): RawQuery,
) -> Response {
    let result = state.rule_proxy().alerts(query.as_deref()).await;
    federated(result, "alerts")
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Wrap merged items as `data.<key>` of a success envelope
fn federated(result: Result<Merged<Value>, FederationError>, key: &str) -> Response {
    match result {
        Ok(Merged { items, warnings }) => {
            let data = Map::from_iter([(key.to_string(), Value::Array(items))]);
            Json(ApiResponse::success(data).with_warnings(warnings)).into_response()
        }
        Err(e) => {
            log::error!("Federated request failed: {e}");
            (
                StatusCode::BAD_GATEWAY,
                Json(ApiResponse::<Value>::error(error_type::UNAVAILABLE, e.to_string())),
            )
                .into_response()
        }
    }
}
