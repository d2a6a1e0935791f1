//! No-session watchdog: unlocks a connector that entered an armed status
//! (`Preparing`/`Occupied`) and never saw a transaction start.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::warn;

pub const WATCHDOG_TIMEOUT: Duration = Duration::from_secs(90);

/// Per-connector table of armed watchdog tasks. Dropping (aborting) a
/// handle is how a watchdog is cancelled — at most one per connector.
#[derive(Default)]
pub struct WatchdogTable {
    handles: DashMap<i64, JoinHandle<()>>,
}

impl WatchdogTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a watchdog for `connector_id`, replacing (and cancelling) any
    /// existing one. `on_fire` runs after the timeout elapses.
    pub fn arm<F, Fut>(self: &Arc<Self>, connector_id: i64, on_fire: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        self.cancel(connector_id);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(WATCHDOG_TIMEOUT).await;
            on_fire().await;
        });
        self.handles.insert(connector_id, handle);
    }

    /// Cancel the watchdog for `connector_id`, if any.
    pub fn cancel(&self, connector_id: i64) {
        if let Some((_, handle)) = self.handles.remove(&connector_id) {
            handle.abort();
        }
    }

    /// Cancel every armed watchdog — used on connection teardown.
    pub fn cancel_all(&self) {
        for entry in self.handles.iter() {
            warn!(connector_id = *entry.key(), "cancelling watchdog on teardown");
            entry.value().abort();
        }
        self.handles.clear();
    }
}
