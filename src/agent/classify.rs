//! User-facing error classification
//!
//! Maps any error that ends a turn to a category and the text shown in
//! place of the assistant's reply.

use crate::error::McpConnectError;

/// Broad class of a turn failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Missing or invalid local configuration
    Configuration,
    /// Provider answered 401
    InvalidApiKey,
    /// Provider answered 429
    RateLimited,
    /// Provider answered 5xx
    ProviderUnavailable,
    /// Any other provider status
    Provider,
    /// The provider could not be reached
    Network,
    /// Malformed or oversized share payload
    ShareFormat,
    /// The caller cancelled the turn
    Cancelled,
    /// Everything else
    Other,
}

/// Classify an error
pub fn classify(err: &anyhow::Error) -> ErrorCategory {
    match err.downcast_ref::<McpConnectError>() {
        Some(McpConnectError::Config(_)) => ErrorCategory::Configuration,
        Some(McpConnectError::Provider { status, .. }) => match *status {
            401 => ErrorCategory::InvalidApiKey,
            429 => ErrorCategory::RateLimited,
            500..=599 => ErrorCategory::ProviderUnavailable,
            _ => ErrorCategory::Provider,
        },
        Some(McpConnectError::ProviderTransport(_)) | Some(McpConnectError::Http(_)) => {
            ErrorCategory::Network
        }
        Some(McpConnectError::ShareFormat(_)) => ErrorCategory::ShareFormat,
        Some(McpConnectError::Cancelled) => ErrorCategory::Cancelled,
        _ => ErrorCategory::Other,
    }
}

/// Text shown to the user for a failed turn
///
/// # Examples
///
/// ```
/// use mcpconnect::agent::user_facing_message;
/// use mcpconnect::error::McpConnectError;
///
/// let err: anyhow::Error = McpConnectError::Provider { status: 429, body: String::new() }.into();
/// assert!(user_facing_message(&err).contains("Rate limited"));
/// ```
pub fn user_facing_message(err: &anyhow::Error) -> String {
    match (classify(err), err.downcast_ref::<McpConnectError>()) {
        (ErrorCategory::Configuration, Some(McpConnectError::Config(msg))) => msg.clone(),
        (ErrorCategory::InvalidApiKey, _) => {
            "Invalid API key. Please check your API key and try again.".to_string()
        }
        (ErrorCategory::RateLimited, _) => {
            "Rate limited by the provider. Please wait a moment and retry.".to_string()
        }
        (ErrorCategory::ProviderUnavailable, _) => {
            "The provider is having issues right now. Please try again later.".to_string()
        }
        (ErrorCategory::Provider, Some(McpConnectError::Provider { status, body })) => {
            format!("Provider error ({}): {}", status, provider_error_message(body))
        }
        (ErrorCategory::ShareFormat, Some(McpConnectError::ShareFormat(msg))) => msg.clone(),
        (ErrorCategory::Cancelled, _) => "Cancelled.".to_string(),
        _ => err.to_string(),
    }
}

/// Extract `error.message` from a provider error body, else the raw body
fn provider_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(status: u16, body: &str) -> anyhow::Error {
        McpConnectError::Provider {
            status,
            body: body.to_string(),
        }
        .into()
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(classify(&provider(401, "")), ErrorCategory::InvalidApiKey);
        assert_eq!(classify(&provider(429, "")), ErrorCategory::RateLimited);
        assert_eq!(classify(&provider(503, "")), ErrorCategory::ProviderUnavailable);
        assert_eq!(classify(&provider(400, "")), ErrorCategory::Provider);
    }

    #[test]
    fn test_other_status_passes_provider_message_through() {
        let body = r#"{"type":"error","error":{"type":"invalid_request_error","message":"max_tokens too large"}}"#;
        assert_eq!(
            user_facing_message(&provider(400, body)),
            "Provider error (400): max_tokens too large"
        );
        assert_eq!(
            user_facing_message(&provider(418, "teapot")),
            "Provider error (418): teapot"
        );
    }

    #[test]
    fn test_configuration_message_is_actionable() {
        let err: anyhow::Error =
            McpConnectError::Config("Please configure your API key".to_string()).into();
        assert_eq!(classify(&err), ErrorCategory::Configuration);
        assert_eq!(user_facing_message(&err), "Please configure your API key");
    }

    #[test]
    fn test_unknown_errors_use_display() {
        let err = anyhow::anyhow!("something odd");
        assert_eq!(classify(&err), ErrorCategory::Other);
        assert_eq!(user_facing_message(&err), "something odd");
    }
}
