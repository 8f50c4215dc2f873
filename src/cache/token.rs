use serde::{Deserialize, Serialize};

/// Key the guest token lives under. One credential context per provider.
pub const GUEST_TOKEN_CACHE_KEY: &str = "ocapi:guest-auth-token";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedToken {
    pub value: String,
    pub expiry: i64, // UNIX TIMESTAMP, milliseconds
}

impl CachedToken {
    pub fn new(value: String, expiry: i64) -> Self {
        Self { value, expiry }
    }

    /// Usable only while `now` is still before `expiry - margin_ms`.
    pub fn is_fresh(&self, now_ms: i64, margin_ms: i64) -> bool {
        now_ms < self.expiry - margin_ms
    }
}
