//! Transport for outbound OCPP CALLs: builds `[2, id, action, payload]`
//! frames and correlates the matching CALLRESULT/CALLERROR via a response
//! slot table keyed by `(cpid, message_id)`.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::session::registry::SharedSessionRegistry;
use crate::domain::error::DomainError;
use crate::support::ocpp_frame::OcppFrame;

struct PendingCall {
    action: String,
    reply: oneshot::Sender<Result<Value, DomainError>>,
}

/// Shared response-slot table for outstanding outbound CALLs.
///
/// CALLs wait indefinitely for a response by default — the spec reserves
/// the only timeout for GetConfiguration, applied by the caller around
/// `send`. Disconnect cancels every outstanding waiter for that cpid via
/// `cancel_for_cpid`.
pub struct CommandSender {
    session_registry: SharedSessionRegistry,
    pending: DashMap<(String, String), PendingCall>,
}

pub type SharedCommandSender = Arc<CommandSender>;

impl CommandSender {
    pub fn new(session_registry: SharedSessionRegistry) -> Self {
        Self {
            session_registry,
            pending: DashMap::new(),
        }
    }

    pub fn shared(session_registry: SharedSessionRegistry) -> SharedCommandSender {
        Arc::new(Self::new(session_registry))
    }

    /// Send `action` with `payload` to `cpid` and wait for the correlated
    /// response. The message id is a fresh UUID, per the transport spec.
    pub async fn send(
        &self,
        cpid: &str,
        action: &str,
        payload: Value,
    ) -> Result<Value, DomainError> {
        let message_id = Uuid::new_v4().to_string();
        let frame = OcppFrame::Call {
            unique_id: message_id.clone(),
            action: action.to_string(),
            payload,
        };

        let (tx, rx) = oneshot::channel();
        let key = (cpid.to_string(), message_id.clone());
        self.pending.insert(
            key.clone(),
            PendingCall {
                action: action.to_string(),
                reply: tx,
            },
        );

        info!(cpid, action, message_id = message_id.as_str(), "sending command");

        if let Err(e) = self.session_registry.send_to(cpid, frame.serialize()) {
            self.pending.remove(&key);
            return Err(e);
        }

        match rx.await {
            Ok(result) => result,
            Err(_) => {
                self.pending.remove(&key);
                Err(DomainError::Disconnected)
            }
        }
    }

    /// Resolve the waiter for `(cpid, message_id)` with a successful payload.
    pub fn resolve(&self, cpid: &str, message_id: &str, payload: Value) {
        let key = (cpid.to_string(), message_id.to_string());
        if let Some((_, pending)) = self.pending.remove(&key) {
            info!(cpid, action = pending.action.as_str(), message_id, "received response");
            let _ = pending.reply.send(Ok(payload));
        } else {
            warn!(cpid, message_id, "response for unknown or already-resolved request");
        }
    }

    /// Resolve the waiter for `(cpid, message_id)` with a CALLERROR.
    pub fn reject(&self, cpid: &str, message_id: &str, error_code: &str, error_description: &str) {
        let key = (cpid.to_string(), message_id.to_string());
        if let Some((_, pending)) = self.pending.remove(&key) {
            warn!(
                cpid,
                action = pending.action.as_str(),
                message_id,
                error_code,
                error_description,
                "received CALLERROR"
            );
            let _ = pending.reply.send(Err(DomainError::Rejected(format!(
                "{error_code}: {error_description}"
            ))));
        }
    }

    /// Fail every outstanding waiter for `cpid` with `Disconnected` — called
    /// on connection teardown.
    pub fn cancel_for_cpid(&self, cpid: &str) {
        let keys: Vec<_> = self
            .pending
            .iter()
            .filter(|e| e.key().0 == cpid)
            .map(|e| e.key().clone())
            .collect();
        for key in keys {
            if let Some((_, pending)) = self.pending.remove(&key) {
                let _ = pending.reply.send(Err(DomainError::Disconnected));
            }
        }
    }
}
