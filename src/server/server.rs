use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tracing::info;

use crate::auth::guest_provider::GuestTokenProvider;
use crate::cache::store::CacheStore;
use crate::config::settings::SettingsConfig;
use crate::observability::metrics::{get_metrics, Metrics};
use crate::observability::routes::MetricsState;
use crate::server::routes;
use crate::transport::requester::HttpRequester;

pub struct AppState<H, S> {
    pub metrics_state: MetricsState,
    pub provider: Arc<GuestTokenProvider<H, S>>,
}

// manual impl: derive would require `H: Clone, S: Clone`
impl<H, S> Clone for AppState<H, S> {
    fn clone(&self) -> Self {
        Self {
            metrics_state: self.metrics_state.clone(),
            provider: self.provider.clone(),
        }
    }
}

impl<H, S> AppState<H, S> {
    pub fn new(metrics: &Metrics, provider: Arc<GuestTokenProvider<H, S>>) -> Self {
        Self {
            metrics_state: MetricsState::new(metrics.registry.clone()),
            provider,
        }
    }
}

pub async fn router<H, S>(settings_config: &SettingsConfig, state: AppState<H, S>) -> Router
where
    H: HttpRequester + 'static,
    S: CacheStore + 'static,
{
    Router::new()
        .merge(state.metrics_state.router(&settings_config.metrics).await)
        .merge(routes::router(&settings_config.server))
        .with_state(state)
}

/// Serve the auth and metrics routes until `shutdown` resolves.
pub async fn start<H, S>(
    settings_config: &SettingsConfig,
    provider: Arc<GuestTokenProvider<H, S>>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()>
where
    H: HttpRequester + 'static,
    S: CacheStore + 'static,
{
    let metrics = get_metrics().await;
    let state = AppState::new(metrics, provider);
    let app = router(settings_config, state).await;

    let bind_addr = &settings_config.server.host;
    let port = &settings_config.server.port;
    let listener = tokio::net::TcpListener::bind(format!("{}:{}", bind_addr, port))
        .await
        .with_context(|| format!("failed to bind {}:{}", bind_addr, port))?;
    info!("listening on {}:{}", bind_addr, port);
    metrics.up.set(1);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("http server failed")?;
    metrics.up.set(0);

    Ok(())
}
