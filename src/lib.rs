//! # OCAPI Guest Auth Library
//!
//! Obtains guest bearer tokens for the OCAPI Shop API, caches them,
//! refreshes them before their assumed expiry and exposes them as
//! authorization headers.
//!
//! Modules:
//! - `config`: service configuration and validated auth settings
//! - `cache`: key-value cache store with TTL eviction
//! - `transport`: HTTP requester abstraction and its reqwest implementation
//! - `auth`: guest token provider and auth header builder
//! - `shop`: authorized Shop API client
//! - `server`: health, auth header and metrics routes

pub mod app;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod helpers;
pub mod observability;
pub mod server;
pub mod shop;
pub mod transport;
pub mod utils;
#[cfg(test)]
mod tests;


pub use crate::auth::guest_provider::GuestTokenProvider;
pub use crate::auth::headers::AuthHeaders;
pub use crate::config::auth::{AuthConfig, AuthSettings};
pub use crate::error::{AuthenticationError, CacheError, ConfigError, TransportError};
