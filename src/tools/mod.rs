//! Tool catalog support
//!
//! System tools, per-connection enablement and the change notifier used to
//! keep every open view of a connection consistent.

pub mod enablement;
pub mod system;

pub use enablement::{Subscription, ToolEnablement, ToolStateChange, ToolStateNotifier};
pub use system::{execute_system_tool, is_system_tool, system_tools};
