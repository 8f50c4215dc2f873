use std::time::Duration;

use reqwest::Client;
use tracing::{debug, error};

use crate::error::TransportError;
use crate::transport::requester::{HttpRequest, HttpRequester, HttpResponse};

#[derive(Debug, Clone)]
pub struct ReqwestRequester {
    client: Client,
}

impl ReqwestRequester {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::new(client))
    }
}

impl Default for ReqwestRequester {
    fn default() -> Self {
        Self::new(Client::new())
    }
}

impl HttpRequester for ReqwestRequester {
    async fn request(&self, url: &str, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        debug!("{} {}", request.method, url);
        let mut builder = self
            .client
            .request(request.method, url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.inspect_err(|err| {
            error!("HTTP request failed for {}: {}", url, err);
        })?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();
        debug!("response status for {}: {}", url, status);

        Ok(HttpResponse { status, headers, body })
    }
}
