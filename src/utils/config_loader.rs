use std::path::Path;
use anyhow::{anyhow, Result};
use tracing::warn;

use crate::config::loader::{env_to_config, file_to_config};
use crate::config::ServiceConfig;

/// Loads the YAML config at `config_path`; falls back to plain environment
/// variables when the file does not exist.
pub async fn run(config_path: &str) -> Result<ServiceConfig> {
    let path = Path::new(config_path);
    if !path.exists() {
        warn!("config file '{}' not found, reading OCAPI_* environment variables", config_path);
        return env_to_config().map_err(|e| anyhow!("Invalid environment config: {}", e));
    }
    file_to_config(path).await.map_err(|e| anyhow!("Invalid config format: {}", e))
}
