//! Global `cpid -> orchestrator` registry.
//!
//! A duplicate cpid reconnect evicts the prior orchestrator outright —
//! spec Open Question 1 is decided in favor of eviction (see DESIGN.md).
//! There is no reconnect debounce: nothing in the spec's connection
//! lifecycle calls for one.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use crate::application::orchestrator::Orchestrator;

/// A live charge point connection as seen by the registry: an outbound
/// channel to its write task, a one-shot eviction signal the read loop
/// selects on alongside socket reads, and the orchestrator driving it —
/// the HTTP control plane and operator console query the orchestrator
/// directly for pending/active/history/status lookups.
pub struct ConnectionHandle {
    pub sender: mpsc::UnboundedSender<String>,
    pub orchestrator: Arc<Orchestrator>,
    evict_tx: Option<oneshot::Sender<()>>,
}

impl ConnectionHandle {
    pub fn new(
        sender: mpsc::UnboundedSender<String>,
        orchestrator: Arc<Orchestrator>,
        evict_tx: oneshot::Sender<()>,
    ) -> Self {
        Self {
            sender,
            orchestrator,
            evict_tx: Some(evict_tx),
        }
    }
}

/// Outcome of a registration attempt.
pub enum RegisterResult {
    /// No previous session existed for this cpid.
    New,
    /// A previous session existed and has been signaled to close.
    Evicted,
}

/// Thread-safe registry of connected charge points.
pub struct SessionRegistry {
    sessions: DashMap<String, ConnectionHandle>,
}

pub type SharedSessionRegistry = Arc<SessionRegistry>;

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    pub fn shared() -> SharedSessionRegistry {
        Arc::new(Self::new())
    }

    /// Register a new connection, evicting any prior one for the same cpid.
    pub fn register(
        &self,
        cpid: &str,
        sender: mpsc::UnboundedSender<String>,
        orchestrator: Arc<Orchestrator>,
        evict_tx: oneshot::Sender<()>,
    ) -> RegisterResult {
        let handle = ConnectionHandle::new(sender, orchestrator, evict_tx);
        let previous = self.sessions.insert(cpid.to_string(), handle);

        match previous {
            Some(mut old) => {
                warn!(cpid, "evicting stale session for reconnecting charge point");
                if let Some(evict_tx) = old.evict_tx.take() {
                    let _ = evict_tx.send(());
                }
                RegisterResult::Evicted
            }
            None => {
                info!(cpid, "registered charge point session");
                RegisterResult::New
            }
        }
    }

    /// Remove the entry for `cpid`, but only if it is still the one identified
    /// by `sender` — a stale orchestrator that already lost a race with a
    /// reconnect must not clobber the new registration on its own teardown.
    pub fn unregister_if_current(&self, cpid: &str, sender: &mpsc::UnboundedSender<String>) {
        if let Some(entry) = self.sessions.get(cpid) {
            if !entry.sender.same_channel(sender) {
                return;
            }
        } else {
            return;
        }
        self.sessions.remove(cpid);
        info!(cpid, "unregistered charge point session");
    }

    pub fn send_to(&self, cpid: &str, message: String) -> Result<(), crate::domain::error::DomainError> {
        match self.sessions.get(cpid) {
            Some(conn) => conn
                .sender
                .send(message)
                .map_err(|_| crate::domain::error::DomainError::Disconnected),
            None => Err(crate::domain::error::DomainError::NotConnected),
        }
    }

    pub fn is_connected(&self, cpid: &str) -> bool {
        self.sessions.contains_key(cpid)
    }

    pub fn connected_ids(&self) -> Vec<String> {
        self.sessions.iter().map(|e| e.key().clone()).collect()
    }

    /// The orchestrator driving `cpid`'s connection, if it is currently live.
    pub fn get(&self, cpid: &str) -> Option<Arc<Orchestrator>> {
        self.sessions.get(cpid).map(|e| e.orchestrator.clone())
    }

    /// Every currently connected orchestrator, keyed by cpid — used by the
    /// cross-station aggregate views (`pending`, `active`, `history`,
    /// `status`, `overview`).
    pub fn all(&self) -> Vec<(String, Arc<Orchestrator>)> {
        self.sessions
            .iter()
            .map(|e| (e.key().clone(), e.value().orchestrator.clone()))
            .collect()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::orchestrator::state::Services;
    use crate::application::orchestrator::command_sender::CommandSender;
    use crate::domain::station::StationRegistry;
    use crate::domain::vid::IdentityTable;
    use crate::domain::wallet::Wallet;

    fn test_orchestrator(
        cpid: &str,
        registry: &SharedSessionRegistry,
        sender: mpsc::UnboundedSender<String>,
    ) -> Arc<Orchestrator> {
        let services = Services::new(
            IdentityTable::shared(),
            Wallet::shared(),
            StationRegistry::shared(),
            registry.clone(),
            CommandSender::shared(registry.clone()),
            None,
        );
        Orchestrator::new(cpid.to_string(), services, sender)
    }

    #[test]
    fn register_reports_new_then_evicted() {
        let registry = SessionRegistry::shared();
        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (evict_tx1, _evict_rx1) = oneshot::channel();
        let orch1 = test_orchestrator("CP_A", &registry, tx1.clone());
        assert!(matches!(
            registry.register("CP_A", tx1, orch1, evict_tx1),
            RegisterResult::New
        ));

        let (tx2, _rx2) = mpsc::unbounded_channel();
        let (evict_tx2, evict_rx2) = oneshot::channel();
        let orch2 = test_orchestrator("CP_A", &registry, tx2.clone());
        assert!(matches!(
            registry.register("CP_A", tx2, orch2, evict_tx2),
            RegisterResult::Evicted
        ));
        let _ = evict_rx2;
        assert!(registry.is_connected("CP_A"));
    }

    #[test]
    fn stale_unregister_does_not_clobber_new_registration() {
        let registry = SessionRegistry::shared();
        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (evict_tx1, _evict_rx1) = oneshot::channel();
        let orch1 = test_orchestrator("CP_A", &registry, tx1.clone());
        registry.register("CP_A", tx1.clone(), orch1, evict_tx1);

        let (tx2, _rx2) = mpsc::unbounded_channel();
        let (evict_tx2, _evict_rx2) = oneshot::channel();
        let orch2 = test_orchestrator("CP_A", &registry, tx2.clone());
        registry.register("CP_A", tx2, orch2, evict_tx2);

        registry.unregister_if_current("CP_A", &tx1);
        assert!(registry.is_connected("CP_A"));
    }

    #[test]
    fn get_and_all_reflect_connected_orchestrators() {
        let registry = SessionRegistry::shared();
        let (tx, _rx) = mpsc::unbounded_channel();
        let (evict_tx, _evict_rx) = oneshot::channel();
        let orch = test_orchestrator("CP_A", &registry, tx.clone());
        registry.register("CP_A", tx, orch, evict_tx);

        assert!(registry.get("CP_A").is_some());
        assert!(registry.get("CP_B").is_none());
        assert_eq!(registry.all().len(), 1);
    }
}
