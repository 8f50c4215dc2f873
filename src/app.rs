//! Composition root: every collaborator is built once here and shared by
//! reference with whatever serves requests.

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::auth::guest_provider::GuestTokenProvider;
use crate::cache::memory::MemoryCache;
use crate::config::ServiceConfig;
use crate::helpers::time::{Clock, SystemClock};
use crate::server;
use crate::shop::client::ShopClient;
use crate::transport::reqwest_requester::ReqwestRequester;

pub type GuestAuth = GuestTokenProvider<ReqwestRequester, MemoryCache>;
pub type Shop = ShopClient<ReqwestRequester, MemoryCache>;

pub struct App {
    pub config: ServiceConfig,
    pub clock: Arc<dyn Clock>,
    pub cache: Arc<MemoryCache>,
    pub http: Arc<ReqwestRequester>,
    pub auth: Arc<GuestAuth>,
    pub shop: Arc<Shop>,
}

impl App {
    pub fn build(config: ServiceConfig) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let cache = Arc::new(MemoryCache::with_tokio_scheduler(clock.clone()));
        let http = Arc::new(ReqwestRequester::with_timeout(config.auth.request_timeout())?);
        let auth = Arc::new(GuestTokenProvider::new(
            config.auth.clone(),
            http.clone(),
            cache.clone(),
            clock.clone(),
        )?);
        let shop = Arc::new(ShopClient::new(http.clone(), auth.clone()));
        info!("guest auth endpoint: {}", auth.endpoint());

        Ok(Self { config, clock, cache, http, auth, shop })
    }

    /// Serve until `shutdown` resolves.
    pub async fn run(self, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
        server::server::start(&self.config.settings, self.auth.clone(), shutdown).await
    }
}
