//! Tool-server connections, their auth settings and provider credentials

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Default per-request timeout for tool servers
pub const DEFAULT_CONNECTION_TIMEOUT_MS: u64 = 30_000;

/// Default number of retries for failed tool-server requests
pub const DEFAULT_RETRY_COUNT: u32 = 3;

/// Authentication scheme for a tool server
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AuthScheme {
    /// No authentication
    #[default]
    None,
    /// `Authorization: Bearer <token>`
    Bearer {
        /// Bearer token
        token: String,
    },
    /// API key sent in a custom header
    #[serde(rename_all = "camelCase")]
    ApiKey {
        /// Header name (e.g. `X-API-Key`)
        header_name: String,
        /// Key value
        key: String,
    },
    /// HTTP basic authentication
    Basic {
        /// User name
        username: String,
        /// Password
        password: String,
    },
}

impl AuthScheme {
    /// Short scheme name for display and share payloads
    pub fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bearer { .. } => "bearer",
            Self::ApiKey { .. } => "apiKey",
            Self::Basic { .. } => "basic",
        }
    }
}

/// Authentication configuration: a scheme plus extra static headers
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Credential scheme
    #[serde(default)]
    pub scheme: AuthScheme,
    /// Extra headers sent with every request
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
}

impl AuthConfig {
    /// Headers to attach to every tool-server request
    ///
    /// # Examples
    ///
    /// ```
    /// use mcpconnect::model::{AuthConfig, AuthScheme};
    ///
    /// let auth = AuthConfig {
    ///     scheme: AuthScheme::Bearer { token: "abc".to_string() },
    ///     headers: Default::default(),
    /// };
    /// let headers = auth.request_headers();
    /// assert_eq!(headers.get("Authorization"), Some(&"Bearer abc".to_string()));
    /// ```
    pub fn request_headers(&self) -> HashMap<String, String> {
        let mut headers = self.headers.clone();
        match &self.scheme {
            AuthScheme::None => {}
            AuthScheme::Bearer { token } => {
                headers.insert("Authorization".to_string(), format!("Bearer {}", token));
            }
            AuthScheme::ApiKey { header_name, key } => {
                headers.insert(header_name.clone(), key.clone());
            }
            AuthScheme::Basic { username, password } => {
                let encoded = STANDARD.encode(format!("{}:{}", username, password));
                headers.insert("Authorization".to_string(), format!("Basic {}", encoded));
            }
        }
        headers
    }
}

/// A configured tool-server endpoint
///
/// Owns (by id) its tool catalog, conversations, execution log and
/// disabled-tool set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    /// Unique identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Tool-server endpoint URL
    pub url: String,
    /// Authentication
    #[serde(default)]
    pub auth: AuthConfig,
    /// Per-request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Retries on transport failures
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    /// Whether the last contact with the server succeeded
    #[serde(default)]
    pub is_connected: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_CONNECTION_TIMEOUT_MS
}

fn default_retry_count() -> u32 {
    DEFAULT_RETRY_COUNT
}

impl Connection {
    /// Creates an unauthenticated connection with default timeout and retries
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            url: url.into(),
            auth: AuthConfig::default(),
            timeout_ms: DEFAULT_CONNECTION_TIMEOUT_MS,
            retry_count: DEFAULT_RETRY_COUNT,
            is_connected: false,
            created_at: Utc::now(),
        }
    }

    /// Sets the authentication configuration
    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = auth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_basic_auth_header_is_base64() {
        let auth = AuthConfig {
            scheme: AuthScheme::Basic {
                username: "user".to_string(),
                password: "pass".to_string(),
            },
            headers: HashMap::new(),
        };
        let headers = auth.request_headers();
        assert_eq!(
            headers.get("Authorization"),
            Some(&"Basic dXNlcjpwYXNz".to_string())
        );
    }

    #[test]
    fn test_api_key_uses_custom_header_and_keeps_extra_headers() {
        let mut extra = HashMap::new();
        extra.insert("X-Tenant".to_string(), "acme".to_string());
        let auth = AuthConfig {
            scheme: AuthScheme::ApiKey {
                header_name: "X-API-Key".to_string(),
                key: "secret".to_string(),
            },
            headers: extra,
        };
        let headers = auth.request_headers();
        assert_eq!(headers.get("X-API-Key"), Some(&"secret".to_string()));
        assert_eq!(headers.get("X-Tenant"), Some(&"acme".to_string()));
    }

    #[test]
    fn test_auth_scheme_wire_format() {
        let scheme = AuthScheme::ApiKey {
            header_name: "X-Key".to_string(),
            key: "k".to_string(),
        };
        let value = serde_json::to_value(&scheme).unwrap();
        assert_eq!(value, json!({"type": "apiKey", "headerName": "X-Key", "key": "k"}));
    }

    #[test]
    fn test_connection_defaults_on_deserialize() {
        let conn: Connection = serde_json::from_value(json!({
            "id": "c1",
            "name": "Local",
            "url": "http://localhost:3000/mcp",
            "created_at": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(conn.timeout_ms, DEFAULT_CONNECTION_TIMEOUT_MS);
        assert_eq!(conn.retry_count, DEFAULT_RETRY_COUNT);
        assert_eq!(conn.auth.scheme, AuthScheme::None);
        assert!(!conn.is_connected);
    }
}
