use std::sync::Arc;

use http::header::ACCEPT;
use http::HeaderValue;
use tracing::{error, info};

use crate::auth::guest_provider::GuestTokenProvider;
use crate::cache::store::CacheStore;
use crate::error::ShopError;
use crate::observability::metrics::get_metrics;
use crate::transport::requester::{HttpRequest, HttpRequester, HttpResponse};

/// Authorized access to the OCAPI Shop API.
///
/// Shares the requester and the guest token provider built by the
/// composition root.
pub struct ShopClient<H, S> {
    base_url: String,
    http: Arc<H>,
    auth: Arc<GuestTokenProvider<H, S>>,
}

impl<H, S> ShopClient<H, S>
where
    H: HttpRequester,
    S: CacheStore,
{
    pub fn new(http: Arc<H>, auth: Arc<GuestTokenProvider<H, S>>) -> Self {
        let base_url = auth.config().shop_api_base_url();
        Self { base_url, http, auth }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends `request` to `{base_url}{path}` with the guest `Authorization`
    /// header. Caller headers may override `Accept` but never the auth header.
    pub async fn request(&self, path: &str, request: HttpRequest) -> Result<HttpResponse, ShopError> {
        let metrics = get_metrics().await;
        if !path.starts_with('/') {
            return Err(ShopError::InvalidPath(path.to_owned()));
        }
        let url = format!("{}{}", self.base_url, path);
        info!("shop API request {} {}", request.method, url);

        let auth_headers = self
            .auth
            .get_auth_headers()
            .await
            .inspect_err(|err| {
                error!("shop API authentication failed: {}", err);
                metrics.shop_requests.with_label_values(&["auth_error"]).inc();
            })?
            .to_header_map()?;

        let mut headers = request.headers;
        if !headers.contains_key(ACCEPT) {
            headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        }
        headers.extend(auth_headers);
        let request = HttpRequest { headers, ..request };

        let response = self.http.request(&url, request).await.inspect_err(|err| {
            error!("shop API request failed for {}: {}", url, err);
            metrics.shop_requests.with_label_values(&["transport_error"]).inc();
        })?;
        info!("shop API response status for {}: {}", url, response.status);
        metrics.shop_requests.with_label_values(&["completed"]).inc();
        Ok(response)
    }

    pub async fn get(&self, path: &str) -> Result<HttpResponse, ShopError> {
        self.request(path, HttpRequest::get()).await
    }
}
