use std::collections::BTreeMap;

use http::header::AUTHORIZATION;
use http::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;

use crate::error::TransportError;

/// Header map to attach to authorized upstream calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AuthHeaders(BTreeMap<String, String>);

impl AuthHeaders {
    /// `{ "Authorization": "Bearer <token>" }`
    pub fn bearer(token: &str) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Authorization".to_owned(), format!("Bearer {}", token));
        Self(headers)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_header_map(&self) -> Result<HeaderMap, TransportError> {
        let mut map = HeaderMap::with_capacity(self.0.len());
        for (name, value) in &self.0 {
            let name = if name.eq_ignore_ascii_case(AUTHORIZATION.as_str()) {
                AUTHORIZATION
            } else {
                HeaderName::from_bytes(name.as_bytes())
                    .map_err(|e| TransportError::InvalidRequest(format!("header name '{}': {}", name, e)))?
            };
            let value = HeaderValue::from_str(value)
                .map_err(|e| TransportError::InvalidRequest(format!("header '{}': {}", name, e)))?;
            map.insert(name, value);
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::AuthHeaders;
    use http::header::AUTHORIZATION;

    #[test]
    fn bearer_header_is_the_only_entry() {
        let headers = AuthHeaders::bearer("abc123");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("Authorization"), Some("Bearer abc123"));
        assert_eq!(
            serde_json::to_value(&headers).unwrap(),
            serde_json::json!({"Authorization": "Bearer abc123"})
        );
    }

    #[test]
    fn converts_to_header_map() {
        let map = AuthHeaders::bearer("abc123").to_header_map().unwrap();
        assert_eq!(map.get(AUTHORIZATION).unwrap(), "Bearer abc123");
    }

    #[test]
    fn rejects_tokens_that_are_not_valid_header_values() {
        assert!(AuthHeaders::bearer("bad\ntoken").to_header_map().is_err());
    }
}
