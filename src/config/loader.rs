use std::path::Path;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, error};

use crate::config::auth::{AuthConfig, AuthSettings};
use crate::config::settings::{LoggingConfig, SettingsConfig};
use crate::config::ServiceConfig;
use crate::error::ConfigError;
use crate::observability::metrics::get_metrics;

#[derive(Debug, Deserialize)]
struct RawServiceConfig {
    #[serde(default)]
    settings: SettingsConfig,
    #[serde(default)]
    auth: AuthSettings,
}

/// Load and validate config from a YAML file, expanding `${VAR}` and `${VAR:default}`.
pub async fn file_to_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let content = tokio::fs::read_to_string(path).await?;
    let expanded = expand_env_vars(&content)?;
    parse_config(expanded).await
}

pub async fn parse_config(content: String) -> Result<ServiceConfig, ConfigError> {
    let metrics = get_metrics().await;
    let raw: RawServiceConfig = serde_yaml::from_str(&content).inspect_err(|e| {
        error!("parse config error: {}", e);
        metrics.config_validation_errors.inc();
    })?;

    debug!("validating config ...");
    into_service_config(raw.settings, raw.auth).inspect_err(|e| {
        error!("config is not valid: {}", e);
        metrics.config_validation_errors.inc();
    })
}

/// Config assembled from environment variables only, with default settings.
pub fn env_to_config() -> Result<ServiceConfig, ConfigError> {
    into_service_config(SettingsConfig::default(), AuthSettings::from_env()?)
}

fn into_service_config(
    mut settings: SettingsConfig,
    auth: AuthSettings,
) -> Result<ServiceConfig, ConfigError> {
    if settings.logging.is_none() {
        settings.logging = Some(LoggingConfig::default());
    }
    let auth = AuthConfig::try_from(auth)?;
    Ok(ServiceConfig { settings, auth })
}

pub fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = Regex::new(r"\$\{(\w+)(?::([^\}]+))?\}")
        .map_err(|e| ConfigError::Invalid(format!("env pattern: {}", e)))?;
    let expanded = re.replace_all(input, |caps: &regex::Captures| {
        let var = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        std::env::var(var).unwrap_or_else(|_| default.to_string())
    });
    Ok(expanded.to_string())
}
