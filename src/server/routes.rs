use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use http::StatusCode;
use serde_json::json;
use tracing::{error, info};

use crate::cache::store::CacheStore;
use crate::config::settings::ServerConfig;
use crate::error::USER_FACING_ERROR;
use crate::server::server::AppState;
use crate::transport::requester::HttpRequester;

pub const AUTH_HEALTH_PATH: &str = "/health/auth";

pub fn router<H, S>(server_config: &ServerConfig) -> Router<AppState<H, S>>
where
    H: HttpRequester + 'static,
    S: CacheStore + 'static,
{
    let mut router = Router::new().route(AUTH_HEALTH_PATH, get(auth_health::<H, S>));
    if let Some(path) = &server_config.auth_headers_path {
        let path = if path.starts_with('/') { path.clone() } else { format!("/{}", path) };
        info!("served path: {}", &path);
        router = router.route(&path, get(auth_headers::<H, S>));
    }
    router
}

async fn auth_health<H, S>(State(state): State<AppState<H, S>>) -> Response
where
    H: HttpRequester + 'static,
    S: CacheStore + 'static,
{
    let authenticated = state.provider.check_authentication().await;
    let status = if authenticated { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status, Json(json!({ "authenticated": authenticated }))).into_response()
}

async fn auth_headers<H, S>(State(state): State<AppState<H, S>>) -> Response
where
    H: HttpRequester + 'static,
    S: CacheStore + 'static,
{
    match state.provider.get_auth_headers().await {
        Ok(headers) => (StatusCode::OK, Json(headers)).into_response(),
        Err(err) => {
            error!("serving auth headers failed: {}", err);
            (StatusCode::BAD_GATEWAY, Json(json!({ "error": USER_FACING_ERROR }))).into_response()
        }
    }
}
