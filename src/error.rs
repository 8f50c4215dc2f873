//! Error types shared across the crate.
//!
//! Library code returns these typed errors; the binary and the composition
//! root wrap them into `anyhow::Error`.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Raised while turning raw settings into a validated `AuthConfig`,
/// always before any network activity.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("guest auth configuration incomplete, missing: {}", missing.join(", "))]
    Incomplete { missing: Vec<&'static str> },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("invalid config format: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("unable to read config: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of the HTTP requester itself (DNS, connect, TLS, body read).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Client(#[from] reqwest::Error),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("connection failed: {0}")]
    Connection(String),
}

/// The single error kind surfaced by the guest token provider.
///
/// Every variant is produced only after the cached token was invalidated.
/// Cloneable so every caller waiting on one fetch gets the same outcome.
#[derive(Debug, Clone, Error)]
pub enum AuthenticationError {
    #[error("network or HTTP client error during guest auth request: {0}")]
    Transport(#[source] Arc<TransportError>),

    #[error("guest auth request timed out after {0:?}")]
    Timeout(Duration),

    #[error("guest auth API request failed: {status} {reason}")]
    Status {
        status: u16,
        reason: String,
        body: String,
    },

    #[error("bearer token not found or invalid in guest auth response header")]
    MissingBearer {
        response_body: Option<serde_json::Value>,
    },
}

impl AuthenticationError {
    /// Upstream status code, when the failure came from a non-success response.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            AuthenticationError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Short label used for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthenticationError::Transport(_) => "transport",
            AuthenticationError::Timeout(_) => "timeout",
            AuthenticationError::Status { .. } => "status",
            AuthenticationError::MissingBearer { .. } => "missing_bearer",
        }
    }
}

/// Store-level failure. Never propagated past the token provider.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to encode cache value for '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to decode cache value for '{key}': {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
}

/// Errors of authorized Shop API calls.
#[derive(Debug, Error)]
pub enum ShopError {
    #[error("authentication failed: {0}")]
    Authentication(#[from] AuthenticationError),

    #[error("HTTP request failed: {0}")]
    Transport(#[from] TransportError),

    #[error("invalid shop API path '{0}'")]
    InvalidPath(String),
}

pub const USER_FACING_ERROR: &str = "Something went wrong while talking to the store. Please try again.";

impl ShopError {
    /// Message safe to show an end user; details belong in the logs.
    pub fn user_message(&self) -> &'static str {
        USER_FACING_ERROR
    }
}
