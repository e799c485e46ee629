//! Anthropic Messages API provider
//!
//! `POST {api_base}/v1/messages` with the `x-api-key` and
//! `anthropic-version` headers. Responses are read in full; token events
//! downstream carry whole text blocks.

use crate::config::ProviderConfig;
use crate::error::{McpConnectError, Result};
use crate::providers::{Provider, ProviderRequest, ProviderResponse};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Provider backed by the Anthropic Messages API
#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    client: Client,
    endpoint: String,
    api_version: String,
}

impl AnthropicProvider {
    /// Create a new provider from configuration
    ///
    /// # Examples
    ///
    /// ```
    /// use mcpconnect::config::ProviderConfig;
    /// use mcpconnect::providers::AnthropicProvider;
    ///
    /// let provider = AnthropicProvider::new(&ProviderConfig::default());
    /// assert!(provider.is_ok());
    /// ```
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("mcpconnect/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                McpConnectError::ProviderTransport(format!("Failed to create HTTP client: {}", e))
            })?;

        let endpoint = format!("{}/v1/messages", config.api_base.trim_end_matches('/'));

        tracing::info!(
            "Initialized Anthropic provider: endpoint={}, model={}",
            endpoint,
            config.model
        );

        Ok(Self {
            client,
            endpoint,
            api_version: config.api_version.clone(),
        })
    }

    /// Full URL requests are sent to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    async fn complete(
        &self,
        api_key: &str,
        request: &ProviderRequest,
    ) -> Result<ProviderResponse> {
        tracing::debug!(
            "Sending Anthropic request: model={}, {} messages, {} tools",
            request.model,
            request.messages.len(),
            request.tools.len()
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", api_key)
            .header("anthropic-version", &self.api_version)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Anthropic request failed: {}", e);
                McpConnectError::ProviderTransport(format!("Anthropic request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Anthropic returned error {}: {}", status, body);
            return Err(McpConnectError::Provider {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let parsed: ProviderResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse Anthropic response: {}", e);
            McpConnectError::ProviderTransport(format!("Failed to parse Anthropic response: {}", e))
        })?;

        if let Some(usage) = parsed.usage {
            tracing::debug!(
                "Anthropic response: {} blocks, stop_reason={:?}, input_tokens={}, output_tokens={}",
                parsed.content.len(),
                parsed.stop_reason,
                usage.input_tokens,
                usage.output_tokens
            );
        }

        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let config = ProviderConfig {
            api_base: "http://localhost:9999/".to_string(),
            ..Default::default()
        };
        let provider = AnthropicProvider::new(&config).unwrap();
        assert_eq!(provider.endpoint(), "http://localhost:9999/v1/messages");
    }
}
