// tests/common/mod.rs
pub use axum::Router;
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderValue, StatusCode};
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};

use crate::auth::guest_provider::GuestTokenProvider;
use crate::cache::memory::MemoryCache;
use crate::cache::scheduler::NoopScheduler;
use crate::cache::store::CacheStore;
use crate::config::auth::{AuthConfig, AuthSettings};
use crate::error::{CacheError, TransportError};
use crate::helpers::time::ManualClock;
use crate::transport::requester::{HttpRequest, HttpRequester, HttpResponse};

pub const START_MS: i64 = 1_700_000_000_000;

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

pub fn build_reqwest_client() -> Client {
    Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .expect("reqwest client")
}

pub fn auth_settings() -> AuthSettings {
    AuthSettings {
        domain: Some("x.com".into()),
        site_id: Some("s1".into()),
        api_version: Some("v1".into()),
        client_id: Some("c1".into()),
        assumed_token_lifetime_seconds: Some(1800),
        request_timeout_ms: None,
    }
}

pub fn auth_config() -> AuthConfig {
    AuthConfig::try_from(auth_settings()).expect("valid auth config")
}

pub fn bearer_response(token: &str) -> HttpResponse {
    HttpResponse::new(StatusCode::OK).with_header(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    )
}

pub fn json_response(status: StatusCode, body: serde_json::Value) -> HttpResponse {
    HttpResponse::new(status)
        .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
        .with_body(body.to_string())
}

#[derive(Debug, Clone)]
pub enum MockReply {
    Respond(HttpResponse),
    Fail(String),
}

/// Scripted requester: replays queued replies, then repeats the fallback.
pub struct MockRequester {
    queued: Mutex<VecDeque<MockReply>>,
    fallback: MockReply,
    delay: Duration,
    calls: AtomicUsize,
    recorded: Mutex<Vec<(String, HttpRequest)>>,
}

impl MockRequester {
    pub fn always(reply: MockReply) -> Self {
        Self::sequence(Vec::new(), reply)
    }

    pub fn sequence(replies: Vec<MockReply>, fallback: MockReply) -> Self {
        Self {
            queued: Mutex::new(replies.into()),
            fallback,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            recorded: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn recorded(&self) -> Vec<(String, HttpRequest)> {
        self.recorded.lock().unwrap().clone()
    }

    fn next_reply(&self, url: &str, request: HttpRequest) -> MockReply {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.recorded.lock().unwrap().push((url.to_owned(), request));
        self.queued
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

impl HttpRequester for MockRequester {
    async fn request(&self, url: &str, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let reply = self.next_reply(url, request);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match reply {
            MockReply::Respond(response) => Ok(response),
            MockReply::Fail(message) => Err(TransportError::Connection(message)),
        }
    }
}

/// Store whose every operation fails.
pub struct FailingCache;

impl CacheStore for FailingCache {
    async fn get<T>(&self, _key: &str) -> Result<Option<T>, CacheError>
    where
        T: DeserializeOwned + Send,
    {
        Err(CacheError::Unavailable("get refused".into()))
    }

    async fn set<T>(&self, _key: &str, _value: &T, _ttl_seconds: Option<u64>) -> Result<(), CacheError>
    where
        T: Serialize + Sync,
    {
        Err(CacheError::Unavailable("set refused".into()))
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("delete refused".into()))
    }
}

pub struct Fixture {
    pub clock: Arc<ManualClock>,
    pub cache: Arc<MemoryCache>,
    pub http: Arc<MockRequester>,
    pub provider: Arc<GuestTokenProvider<MockRequester, MemoryCache>>,
}

/// Provider over a lazily expiring memory cache and a manual clock.
pub fn fixture(http: MockRequester) -> Fixture {
    fixture_with_config(http, auth_config())
}

pub fn fixture_with_config(http: MockRequester, config: AuthConfig) -> Fixture {
    let clock = Arc::new(ManualClock::new(START_MS));
    let cache = Arc::new(MemoryCache::new(clock.clone(), Arc::new(NoopScheduler)));
    let http = Arc::new(http);
    let provider = Arc::new(
        GuestTokenProvider::new(config, http.clone(), cache.clone(), clock.clone())
            .expect("provider"),
    );
    Fixture { clock, cache, http, provider }
}
