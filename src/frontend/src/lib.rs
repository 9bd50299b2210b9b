use axum::{Router, routing::get};
use common::config::Configuration;
use federation::{BackendEndpoint, RuleProxy};
use prom_api::BuildInfo;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

pub mod endpoints;
pub mod federation;

pub trait FrontendState: std::fmt::Debug + Clone + Send + Sync + 'static {
    fn rule_proxy(&self) -> &RuleProxy;
    fn build_info(&self) -> &BuildInfo;
}

/// Shared state of the query frontend handlers
#[derive(Debug, Clone)]
pub struct AppState {
    rule_proxy: RuleProxy,
    build_info: Arc<BuildInfo>,
}

impl AppState {
    pub fn new(rule_proxy: RuleProxy) -> Self {
        Self {
            rule_proxy,
            build_info: Arc::new(build_info()),
        }
    }

    /// Build the state from configuration, parsing the backend list once
    pub fn from_config(config: &Configuration) -> anyhow::Result<Self> {
        let endpoints = config
            .frontend
            .rule_endpoint_urls()?
            .into_iter()
            .map(BackendEndpoint::new)
            .collect();
        let rule_proxy = RuleProxy::new(endpoints, config.frontend.backend_timeout)?;

        Ok(Self::new(rule_proxy))
    }
}

impl FrontendState for AppState {
    fn rule_proxy(&self) -> &RuleProxy {
        &self.rule_proxy
    }

    fn build_info(&self) -> &BuildInfo {
        &self.build_info
    }
}

/// Create a new router instance with all routes configured
pub fn create_router<S: FrontendState>(state: S) -> Router {
    Router::new()
        .route("/-/healthy", get(endpoints::status::healthy))
        .route("/-/ready", get(endpoints::status::ready))
        .nest(
            "/api/v1",
            endpoints::rules::router::<S>().merge(endpoints::status::router::<S>()),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the frontend on `listener` until `shutdown` resolves
pub async fn serve<S: FrontendState>(
    listener: TcpListener,
    state: S,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), anyhow::Error> {
    let addr = listener.local_addr()?;
    log::info!("Starting query frontend on {addr}");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    log::info!("Query frontend on {addr} stopped");
    Ok(())
}

fn build_info() -> BuildInfo {
    BuildInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        branch: "HEAD".to_string(),
        build_user: "promrelay".to_string(),
        ..Default::default()
    }
}
