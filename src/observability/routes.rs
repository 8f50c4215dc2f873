use std::sync::Arc;

use crate::cache::store::CacheStore;
use crate::config::settings::MetricsConfig;
use crate::server::server::AppState;
use crate::transport::requester::HttpRequester;
use axum::routing::get;
use axum::{extract::State, response::IntoResponse, Router};
use http::{header::CONTENT_TYPE, StatusCode};
use prometheus::{Encoder, Registry, TextEncoder};
use tracing::error;

#[derive(Clone)]
pub struct MetricsState {
    pub registry: Arc<Registry>,
}

impl MetricsState {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry: Arc::new(registry)
        }
    }
}

impl MetricsState {
    pub async fn router<H, S>(&self, metrics_config: &MetricsConfig) -> Router<AppState<H, S>>
    where
        H: HttpRequester + 'static,
        S: CacheStore + 'static,
    {
        let mut router = Router::new();
        if metrics_config.is_enabled {
            router = router.route(metrics_config.path.as_str(), get(get_metrics::<H, S>));
        }
        router
    }
}

async fn get_metrics<H, S>(State(state): State<AppState<H, S>>) -> impl IntoResponse
where
    H: HttpRequester + 'static,
    S: CacheStore + 'static,
{
    let encoder = TextEncoder::new();
    let metric_families = state.metrics_state.registry.gather();
    let mut buffer = Vec::new();

    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        error!("failed to encode metrics: {}", err);
        return (StatusCode::INTERNAL_SERVER_ERROR, [(CONTENT_TYPE, "text/plain")], String::new());
    }

    let response = String::from_utf8_lossy(&buffer).into_owned();
    (
        StatusCode::OK,
        [(CONTENT_TYPE, "text/plain; version=0.0.4")],
        response,
    )
}
