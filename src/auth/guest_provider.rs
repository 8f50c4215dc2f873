//! Guest token provider for the OCAPI Shop API.
//!
//! Each call runs the same decision tree against the current cache content
//! and clock reading:
//! - a cached token still outside the refresh margin is returned as is
//! - otherwise one caller performs the upstream `customers/auth` call and
//!   every caller arriving meanwhile waits for that call's outcome, token or
//!   error
//! - any failed fetch removes the cached entry before the error is returned

use std::sync::{Arc, Mutex, PoisonError};

use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use http::HeaderValue;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::auth::headers::AuthHeaders;
use crate::cache::store::CacheStore;
use crate::cache::token::{CachedToken, GUEST_TOKEN_CACHE_KEY};
use crate::config::auth::{AuthConfig, TOKEN_LIFETIME_MARGIN_MS};
use crate::error::{AuthenticationError, ConfigError};
use crate::helpers::time::{get_instant, Clock};
use crate::observability::metrics::get_metrics;
use crate::transport::requester::{HttpRequest, HttpRequester, HttpResponse};

const GUEST_AUTH_BODY: &str = r#"{"type":"guest"}"#;
const BEARER_PREFIX: &str = "Bearer ";

enum CacheLookup {
    Fresh(String),
    Stale,
    Missing,
}

type FetchOutcome = Result<String, AuthenticationError>;

/// Receiver side of the fetch currently running, `None` until it completes.
type Flight = watch::Receiver<Option<FetchOutcome>>;

enum FlightRole {
    Leader(watch::Sender<Option<FetchOutcome>>),
    Follower(Flight),
}

/// Clears the in-flight slot when the leading fetch ends or is dropped.
struct FlightSlot<'a>(&'a Mutex<Option<Flight>>);

impl Drop for FlightSlot<'_> {
    fn drop(&mut self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

pub struct GuestTokenProvider<H, S> {
    config: AuthConfig,
    endpoint: String,
    http: Arc<H>,
    cache: Arc<S>,
    clock: Arc<dyn Clock>,
    /// fetch other callers can join, if one is running
    in_flight: Mutex<Option<Flight>>,
}

impl<H, S> GuestTokenProvider<H, S>
where
    H: HttpRequester,
    S: CacheStore,
{
    pub fn new(
        config: AuthConfig,
        http: Arc<H>,
        cache: Arc<S>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        let endpoint = config.auth_endpoint()?.to_string();
        warn!(
            "guest auth provider initialized with assumed token lifetime of {} seconds, please verify this setting",
            config.assumed_token_lifetime_seconds()
        );
        Ok(Self {
            config,
            endpoint,
            http,
            cache,
            clock,
            in_flight: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns a currently valid bearer token, fetching a new one when needed.
    pub async fn get_token(&self) -> Result<String, AuthenticationError> {
        let metrics = get_metrics().await;

        match self.lookup().await {
            CacheLookup::Fresh(token) => {
                debug!("using cached guest token");
                metrics.token_requests.with_label_values(&["cache_hit"]).inc();
                return Ok(token);
            }
            CacheLookup::Stale => info!("cached guest token expired or nearing expiry"),
            CacheLookup::Missing => info!("no valid guest token in cache"),
        }

        loop {
            match self.join_or_lead() {
                FlightRole::Follower(mut flight) => {
                    let outcome = flight
                        .wait_for(Option::is_some)
                        .await
                        .ok()
                        .and_then(|outcome| (*outcome).clone());
                    // a dropped leader publishes nothing, so start over
                    let Some(outcome) = outcome else {
                        debug!("guest token fetch was abandoned, retrying");
                        continue;
                    };
                    let label = if outcome.is_ok() { "shared" } else { "failed" };
                    metrics.token_requests.with_label_values(&[label]).inc();
                    return outcome;
                }
                FlightRole::Leader(publish) => {
                    let _slot = FlightSlot(&self.in_flight);
                    let outcome = self.lead_fetch().await;
                    publish.send_replace(Some(outcome.clone()));
                    return outcome;
                }
            }
        }
    }

    /// `{ "Authorization": "Bearer <token>" }` for the current token.
    pub async fn get_auth_headers(&self) -> Result<AuthHeaders, AuthenticationError> {
        let token = self.get_token().await?;
        Ok(AuthHeaders::bearer(&token))
    }

    /// `true` when a valid token can be obtained right now.
    pub async fn check_authentication(&self) -> bool {
        match self.get_token().await {
            Ok(_) => true,
            Err(err) => {
                error!("guest auth check failed: {}", err);
                false
            }
        }
    }

    fn join_or_lead(&self) -> FlightRole {
        let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(flight) = slot.as_ref() {
            return FlightRole::Follower(flight.clone());
        }
        let (publish, flight) = watch::channel(None);
        *slot = Some(flight);
        FlightRole::Leader(publish)
    }

    async fn lead_fetch(&self) -> FetchOutcome {
        let metrics = get_metrics().await;

        // a fetch that finished before we took the lead may have refreshed the token
        if let CacheLookup::Fresh(token) = self.lookup().await {
            debug!("using guest token fetched by a concurrent caller");
            metrics.token_requests.with_label_values(&["cache_hit"]).inc();
            return Ok(token);
        }

        self.fetch_new_token()
            .await
            .inspect(|_| metrics.token_requests.with_label_values(&["fetched"]).inc())
            .inspect_err(|_| metrics.token_requests.with_label_values(&["failed"]).inc())
    }

    async fn lookup(&self) -> CacheLookup {
        let now = self.clock.now_ms();
        match self.cache.get::<CachedToken>(GUEST_TOKEN_CACHE_KEY).await {
            Ok(Some(cached)) if cached.is_fresh(now, TOKEN_LIFETIME_MARGIN_MS) => {
                CacheLookup::Fresh(cached.value)
            }
            Ok(Some(_)) => CacheLookup::Stale,
            Ok(None) => CacheLookup::Missing,
            Err(err) => {
                // a broken cache read is a miss, not a failure
                error!("failed to retrieve guest token from cache: {}", err);
                get_metrics().await.cache_failures.with_label_values(&["get"]).inc();
                CacheLookup::Missing
            }
        }
    }

    async fn fetch_new_token(&self) -> Result<String, AuthenticationError> {
        info!("fetching new guest token from {}", self.endpoint);
        let metrics = get_metrics().await;
        let start = get_instant();
        metrics.token_fetch_requests.inc();

        let result = self.request_token().await;

        let outcome = if result.is_ok() { "success" } else { "error" };
        metrics
            .token_fetch_duration
            .with_label_values(&[outcome])
            .observe(start.elapsed().as_secs_f64());
        result.inspect_err(|err| {
            error!("guest token fetch failed: {}", err);
            metrics.token_fetch_failures.with_label_values(&[err.reason()]).inc();
        })
    }

    async fn request_token(&self) -> Result<String, AuthenticationError> {
        let request = HttpRequest::post()
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .body(GUEST_AUTH_BODY);

        let timeout = self.config.request_timeout();
        let response =
            match tokio::time::timeout(timeout, self.http.request(&self.endpoint, request)).await {
                Ok(Ok(response)) => response,
                Ok(Err(err)) => {
                    self.invalidate().await;
                    return Err(AuthenticationError::Transport(Arc::new(err)));
                }
                Err(_) => {
                    self.invalidate().await;
                    return Err(AuthenticationError::Timeout(timeout));
                }
            };

        if !response.ok() {
            self.invalidate().await;
            return Err(AuthenticationError::Status {
                status: response.status.as_u16(),
                reason: response.status.canonical_reason().unwrap_or_default().to_owned(),
                body: error_body(&response),
            });
        }

        let Some(token) = bearer_token(response.header(AUTHORIZATION.as_str())) else {
            self.invalidate().await;
            let response_body = response.json::<Value>().ok();
            debug!("guest auth response without bearer token, body: {:?}", response_body);
            return Err(AuthenticationError::MissingBearer { response_body });
        };
        let token = token.to_owned();

        let expiry = self.clock.now_ms().saturating_add(self.config.assumed_token_lifetime_ms());
        let cached = CachedToken::new(token.clone(), expiry);
        let ttl = self.config.assumed_token_lifetime_seconds();
        match self.cache.set(GUEST_TOKEN_CACHE_KEY, &cached, Some(ttl)).await {
            Ok(()) => {
                get_metrics().await.token_expiry_unix_ms.set(expiry);
                info!("fetched and cached new guest token, assumed expiry {}", expiry);
            }
            Err(err) => {
                // the caller still gets the fresh token
                error!("failed to cache guest token: {}", err);
                get_metrics().await.cache_failures.with_label_values(&["set"]).inc();
            }
        }

        Ok(token)
    }

    async fn invalidate(&self) {
        if let Err(err) = self.cache.delete(GUEST_TOKEN_CACHE_KEY).await {
            error!("failed to invalidate cached guest token: {}", err);
            get_metrics().await.cache_failures.with_label_values(&["delete"]).inc();
        }
    }
}

/// Token after a case-insensitive `Bearer ` prefix; `None` when absent, malformed or empty.
fn bearer_token(header: Option<&str>) -> Option<&str> {
    let header = header?;
    let prefix = header.get(..BEARER_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(BEARER_PREFIX) {
        return None;
    }
    let token = &header[BEARER_PREFIX.len()..];
    (!token.is_empty()).then_some(token)
}

/// Best-effort diagnostic body of a failed response.
fn error_body(response: &HttpResponse) -> String {
    if response.body.is_empty() {
        return "No error body available.".to_owned();
    }
    let is_json = response
        .header(CONTENT_TYPE.as_str())
        .is_some_and(|content_type| content_type.contains("application/json"));
    if !is_json {
        return response.text();
    }
    match response.json::<Value>() {
        Ok(body) => body.to_string(),
        Err(_) => format!("Failed to parse error body (Status: {}).", response.status.as_u16()),
    }
}
