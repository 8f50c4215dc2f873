use std::env;
use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;
use tracing::warn;

use crate::error::ConfigError;

/// The upstream API does not return a TTL, so the lifetime is assumed.
pub const DEFAULT_ASSUMED_LIFETIME_SECONDS: u64 = 1800;
/// Tokens are treated as stale this long before their assumed expiry.
pub const TOKEN_LIFETIME_MARGIN_MS: i64 = 5 * 60 * 1000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_API_VERSION: &str = "v22_3";

/// Raw auth settings as they come from YAML or the environment.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AuthSettings {
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub site_id: Option<String>,
    #[serde(default, alias = "ocapi_version")]
    pub api_version: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub assumed_token_lifetime_seconds: Option<u64>,
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
}

impl AuthSettings {
    /// Reads `OCAPI_DOMAIN`, `OCAPI_SITE_ID`, `OCAPI_VERSION`, `OCAPI_CLIENT_ID`
    /// and the optional `OCAPI_TOKEN_LIFETIME_SECONDS`, `OCAPI_REQUEST_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            domain: env::var("OCAPI_DOMAIN").ok(),
            site_id: env::var("OCAPI_SITE_ID").ok(),
            api_version: Some(
                env::var("OCAPI_VERSION").unwrap_or_else(|_| DEFAULT_API_VERSION.to_owned()),
            ),
            client_id: env::var("OCAPI_CLIENT_ID").ok(),
            assumed_token_lifetime_seconds: parse_env_u64("OCAPI_TOKEN_LIFETIME_SECONDS")?,
            request_timeout_ms: parse_env_u64("OCAPI_REQUEST_TIMEOUT_MS")?,
        })
    }
}

fn parse_env_u64(name: &str) -> Result<Option<u64>, ConfigError> {
    match env::var(name) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|err| ConfigError::Invalid(format!("{} must be an integer: {}", name, err))),
        Err(_) => Ok(None),
    }
}

/// Validated, immutable credential context for one guest token provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    domain: String,
    site_id: String,
    api_version: String,
    client_id: String,
    assumed_token_lifetime_seconds: u64,
    request_timeout_ms: u64,
}

impl AuthConfig {
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Domain without a leading `http://` or `https://`.
    pub fn host(&self) -> &str {
        self.domain
            .strip_prefix("https://")
            .or_else(|| self.domain.strip_prefix("http://"))
            .unwrap_or(&self.domain)
    }

    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn assumed_token_lifetime_seconds(&self) -> u64 {
        self.assumed_token_lifetime_seconds
    }

    pub fn assumed_token_lifetime_ms(&self) -> i64 {
        lifetime_ms(self.assumed_token_lifetime_seconds).unwrap_or(i64::MAX)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// `https://{host}/s/{site_id}/dw/shop/{api_version}`
    pub fn shop_api_base_url(&self) -> String {
        format!("https://{}/s/{}/dw/shop/{}", self.host(), self.site_id, self.api_version)
    }

    /// `{shop_api_base_url}/customers/auth?client_id={client_id}`
    pub fn auth_endpoint(&self) -> Result<Url, ConfigError> {
        let base = format!("{}/customers/auth", self.shop_api_base_url());
        Url::parse_with_params(&base, &[("client_id", self.client_id.as_str())])
            .map_err(|e| ConfigError::Invalid(format!("guest auth endpoint '{}': {}", base, e)))
    }
}

impl TryFrom<AuthSettings> for AuthConfig {
    type Error = ConfigError;

    fn try_from(settings: AuthSettings) -> Result<Self, Self::Error> {
        let mut missing = Vec::new();
        let domain = required(settings.domain, "domain", &mut missing);
        let site_id = required(settings.site_id, "site_id", &mut missing);
        let api_version = required(settings.api_version, "api_version", &mut missing);
        let client_id = required(settings.client_id, "client_id", &mut missing);
        if !missing.is_empty() {
            return Err(ConfigError::Incomplete { missing });
        }

        let assumed_token_lifetime_seconds = settings
            .assumed_token_lifetime_seconds
            .unwrap_or(DEFAULT_ASSUMED_LIFETIME_SECONDS);
        if assumed_token_lifetime_seconds == 0 {
            return Err(ConfigError::Invalid(
                "assumed_token_lifetime_seconds must be greater than 0".to_owned(),
            ));
        }
        let Some(assumed_token_lifetime_ms) = lifetime_ms(assumed_token_lifetime_seconds) else {
            return Err(ConfigError::Invalid(format!(
                "assumed_token_lifetime_seconds of {} does not fit a millisecond timestamp",
                assumed_token_lifetime_seconds
            )));
        };
        if assumed_token_lifetime_ms <= TOKEN_LIFETIME_MARGIN_MS {
            warn!(
                "assumed token lifetime of {} seconds is within the refresh margin, every call will fetch a new token",
                assumed_token_lifetime_seconds
            );
        }

        let request_timeout_ms = settings.request_timeout_ms.unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS);
        if request_timeout_ms == 0 {
            return Err(ConfigError::Invalid("request_timeout_ms must be greater than 0".to_owned()));
        }

        let config = Self {
            domain,
            site_id,
            api_version,
            client_id,
            assumed_token_lifetime_seconds,
            request_timeout_ms,
        };
        config.auth_endpoint()?;
        Ok(config)
    }
}

fn lifetime_ms(seconds: u64) -> Option<i64> {
    i64::try_from(seconds).ok()?.checked_mul(1000)
}

fn required(value: Option<String>, name: &'static str, missing: &mut Vec<&'static str>) -> String {
    match value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty()) {
        Some(v) => v,
        None => {
            missing.push(name);
            String::new()
        }
    }
}
