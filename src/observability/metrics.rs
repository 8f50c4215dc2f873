use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use tracing::info;
use std::sync::Arc;
use tokio::sync::OnceCell;

static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the process-wide `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE.get_or_init(|| async {
        info!("Initializing Metrics ...");
        Metrics::new()}
    ).await
}


#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Provider metrics
    pub token_requests: IntCounterVec,
    pub token_fetch_requests: IntCounter,
    pub token_fetch_failures: IntCounterVec,
    pub token_fetch_duration: HistogramVec,
    pub token_expiry_unix_ms: IntGauge,

    // Cache metrics
    pub cache_failures: IntCounterVec,

    // Shop API metrics
    pub shop_requests: IntCounterVec,

    // Config/runtime
    pub config_validation_errors: IntCounter,
    pub up: IntGauge,
}

impl Metrics {
    fn new() -> Arc<Self> {
        // every name and label set below is static; registration can only fail on duplicates
        let registry = Registry::new_custom(Some("ocapiguestauth".into()), None).unwrap();

        let metrics: Arc<Metrics> = Arc::new(Self {
            // Provider
            token_requests: IntCounterVec::new(Opts::new("token_requests_total", "Token requests by outcome"), &["outcome"]).unwrap(),
            token_fetch_requests: IntCounter::new("token_fetch_requests_total", "Upstream guest auth calls").unwrap(),
            token_fetch_failures: IntCounterVec::new(Opts::new("token_fetch_failures_total", "Upstream guest auth failures by reason"), &["reason"]).unwrap(),
            token_fetch_duration: HistogramVec::new(HistogramOpts::new("token_fetch_duration_seconds", "Guest auth call duration seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]), &["outcome"]).unwrap(),
            token_expiry_unix_ms: IntGauge::new("token_expiry_unix_milliseconds", "Assumed expiry of the current guest token").unwrap(),

            // Cache
            cache_failures: IntCounterVec::new(Opts::new("cache_operation_failures_total", "Cache store failures by operation"), &["operation"]).unwrap(),

            // Shop API
            shop_requests: IntCounterVec::new(Opts::new("shop_requests_total", "Authorized Shop API calls by outcome"), &["outcome"]).unwrap(),

            // Config/runtime
            config_validation_errors: IntCounter::new("config_validation_errors_total", "Validation errors during startup").unwrap(),
            up: IntGauge::new("up", "1 if service is healthy").unwrap(),

            registry,
        });

        let reg = &metrics.registry;
        reg.register(Box::new(metrics.token_requests.clone())).unwrap();
        reg.register(Box::new(metrics.token_fetch_requests.clone())).unwrap();
        reg.register(Box::new(metrics.token_fetch_failures.clone())).unwrap();
        reg.register(Box::new(metrics.token_fetch_duration.clone())).unwrap();
        reg.register(Box::new(metrics.token_expiry_unix_ms.clone())).unwrap();
        reg.register(Box::new(metrics.cache_failures.clone())).unwrap();
        reg.register(Box::new(metrics.shop_requests.clone())).unwrap();
        reg.register(Box::new(metrics.config_validation_errors.clone())).unwrap();
        reg.register(Box::new(metrics.up.clone())).unwrap();

        metrics
    }
}
