//! Model Context Protocol client
//!
//! Tool servers are reached over Streamable HTTP. The [`executor`] module
//! defines the seams the rest of the crate depends on; [`client`] is the
//! HTTP implementation.

pub mod client;
pub mod executor;
pub mod types;

pub use client::HttpMcpClient;
pub use executor::{ToolDiscovery, ToolExecutor, ToolRouter};
