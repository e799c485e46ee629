//! Provider module for MCPConnect
//!
//! This module contains the language-model provider abstraction and the
//! Anthropic Messages API implementation.

pub mod anthropic;
pub mod base;

pub use anthropic::AnthropicProvider;
pub use base::{
    ContentBlock, MessageContent, Provider, ProviderMessage, ProviderRequest, ProviderResponse,
    TokenUsage, ToolDeclaration,
};

use crate::config::ProviderConfig;
use crate::error::Result;
use std::sync::Arc;

/// Create the configured provider
///
/// # Errors
///
/// Returns error if the HTTP client cannot be built
pub fn create_provider(config: &ProviderConfig) -> Result<Arc<dyn Provider>> {
    Ok(Arc::new(AnthropicProvider::new(config)?))
}
