//! Per-connection tool enablement and change notification

use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::error::Result;
use crate::model::{ExecutionStatus, Tool, ToolExecution};

/// Snapshot of a connection's catalog and disabled-tool set
///
/// Values are immutable snapshots: changing the disabled set produces a new
/// snapshot on the next read and never rewrites past execution records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolEnablement {
    tools: Vec<Tool>,
    disabled: HashSet<String>,
}

impl ToolEnablement {
    /// Build from a catalog (remote and system tools) and disabled ids
    pub fn new(tools: Vec<Tool>, disabled: HashSet<String>) -> Self {
        Self { tools, disabled }
    }

    /// Every tool in the catalog
    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    /// Disabled tool ids
    pub fn disabled(&self) -> &HashSet<String> {
        &self.disabled
    }

    /// Whether a tool id is currently offered to the provider
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::HashSet;
    /// use mcpconnect::model::Tool;
    /// use mcpconnect::tools::ToolEnablement;
    ///
    /// let disabled: HashSet<String> = ["search".to_string()].into_iter().collect();
    /// let e = ToolEnablement::new(vec![Tool::new("search", "")], disabled);
    /// assert!(!e.is_enabled("search"));
    /// ```
    pub fn is_enabled(&self, tool_id: &str) -> bool {
        !self.disabled.contains(tool_id)
    }

    /// Catalog minus the disabled set, in catalog order
    pub fn enabled_tools(&self) -> Vec<Tool> {
        self.tools
            .iter()
            .filter(|t| self.is_enabled(&t.id))
            .cloned()
            .collect()
    }

    /// Whether the catalog tool called `name` is disabled
    pub fn is_name_disabled(&self, name: &str) -> bool {
        self.tools
            .iter()
            .any(|t| t.name == name && self.disabled.contains(&t.id))
    }

    /// Display status for a past execution
    ///
    /// Successful executions of a tool that has since been disabled are
    /// annotated; the record itself is untouched.
    pub fn status_label(&self, execution: &ToolExecution) -> String {
        if execution.status == ExecutionStatus::Success && self.is_name_disabled(&execution.tool) {
            format!("{} (now disabled)", execution.status)
        } else {
            execution.status.to_string()
        }
    }
}

/// Payload delivered to listeners after a disabled set changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolStateChange {
    /// Connection whose set changed
    pub connection_id: String,
    /// New disabled ids, sorted
    pub disabled: Vec<String>,
}

type Listener = Arc<dyn Fn(&ToolStateChange) -> Result<()> + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Publish/subscribe hub for tool enablement changes
///
/// Owned by the connection manager; clones share listeners. Listeners run
/// synchronously inside [`publish`](Self::publish). A listener that fails or
/// panics is logged and skipped and the remaining listeners still run.
#[derive(Clone, Default)]
pub struct ToolStateNotifier {
    registry: Arc<Mutex<Registry>>,
}

impl std::fmt::Debug for ToolStateNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolStateNotifier")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl ToolStateNotifier {
    /// Create a notifier with no listeners
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener
    ///
    /// The listener stays registered until [`Subscription::unsubscribe`] is
    /// called; dropping the handle does not remove it.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ToolStateChange) -> Result<()> + Send + Sync + 'static,
    {
        let mut registry = lock(&self.registry);
        registry.next_id += 1;
        let id = registry.next_id;
        registry.listeners.push((id, Arc::new(listener)));
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Notify every listener; returns how many completed successfully
    pub fn publish(&self, change: &ToolStateChange) -> usize {
        // Snapshot so listeners may subscribe or unsubscribe while running.
        let listeners: Vec<(u64, Listener)> = lock(&self.registry).listeners.clone();

        let mut delivered = 0;
        for (id, listener) in listeners {
            match catch_unwind(AssertUnwindSafe(|| listener(change))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => {
                    tracing::warn!("Tool state listener {} failed: {}", id, e);
                }
                Err(_) => {
                    tracing::warn!("Tool state listener {} panicked", id);
                }
            }
        }
        delivered
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        lock(&self.registry).listeners.len()
    }
}

/// Handle returned by [`ToolStateNotifier::subscribe`]
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Remove the listener; a no-op if the notifier is gone
    pub fn unsubscribe(self) {
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).listeners.retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ToolOutput;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn catalog() -> Vec<Tool> {
        vec![Tool::new("search", "Search"), Tool::new("list_files", "List")]
    }

    fn change() -> ToolStateChange {
        ToolStateChange {
            connection_id: "c1".to_string(),
            disabled: vec!["search".to_string()],
        }
    }

    #[test]
    fn test_enabled_tools_excludes_disabled() {
        let disabled: HashSet<String> = ["search".to_string()].into_iter().collect();
        let e = ToolEnablement::new(catalog(), disabled);
        let names: Vec<String> = e.enabled_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["list_files"]);
        assert!(e.is_enabled("list_files"));
        assert!(!e.is_enabled("search"));
    }

    #[test]
    fn test_status_label_annotates_now_disabled() {
        let mut exec = ToolExecution::pending("search", serde_json::json!({}));
        exec.succeed(ToolOutput::text("ok"), Duration::from_millis(5));

        let enabled = ToolEnablement::new(catalog(), HashSet::new());
        assert_eq!(enabled.status_label(&exec), "success");

        let disabled: HashSet<String> = ["search".to_string()].into_iter().collect();
        let after = ToolEnablement::new(catalog(), disabled);
        assert_eq!(after.status_label(&exec), "success (now disabled)");
        assert_eq!(exec.status, ExecutionStatus::Success);
    }

    #[test]
    fn test_failed_execution_is_not_annotated() {
        let mut exec = ToolExecution::pending("search", serde_json::json!({}));
        exec.fail("boom", Duration::from_millis(1));
        let disabled: HashSet<String> = ["search".to_string()].into_iter().collect();
        let e = ToolEnablement::new(catalog(), disabled);
        assert_eq!(e.status_label(&exec), "error");
    }

    #[test]
    fn test_failing_listener_does_not_block_others() {
        let notifier = ToolStateNotifier::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let _failing = notifier.subscribe(|_| Err(anyhow::anyhow!("listener failed")));
        let _panicking = notifier.subscribe(|_| panic!("listener panicked"));
        let counter = hits.clone();
        let _ok = notifier.subscribe(move |c| {
            assert_eq!(c.connection_id, "c1");
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        assert_eq!(notifier.publish(&change()), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_removes_listener() {
        let notifier = ToolStateNotifier::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let sub = notifier.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        assert_eq!(notifier.listener_count(), 1);

        sub.unsubscribe();
        assert_eq!(notifier.listener_count(), 0);
        notifier.publish(&change());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_listener_may_subscribe_during_publish() {
        let notifier = ToolStateNotifier::new();
        let inner = notifier.clone();
        let _sub = notifier.subscribe(move |_| {
            let _nested = inner.subscribe(|_| Ok(()));
            Ok(())
        });
        notifier.publish(&change());
        assert_eq!(notifier.listener_count(), 2);
    }
}
