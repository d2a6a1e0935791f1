//! Control-plane operations: the thin layer both the HTTP adapter (§6) and
//! the operator console (§6) dispatch into. Neither surface mutates
//! orchestrator state directly — they call through here, so the two
//! outer interfaces stay interchangeable front ends onto one set of
//! orchestrator methods, per §2's component breakdown.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::application::orchestrator::commands::{self, ResetKind};
use crate::application::orchestrator::state::Services;
use crate::domain::error::DomainError;
use crate::domain::station::{PendingSession, Station};
use crate::domain::transaction::{ActiveTransaction, CompletedSessionRecord};

/// `UserIdentifier` — the first non-null field, in declaration order, is
/// used as `(source_type, source_value)` for identity resolution.
#[derive(Debug, Clone, Deserialize)]
pub struct UserIdentifier {
    pub vid: Option<String>,
    pub mac: Option<String>,
    pub user_id: Option<String>,
    pub phone: Option<String>,
    pub app_id: Option<String>,
    pub transaction_id: Option<String>,
    pub qr_id: Option<String>,
}

impl UserIdentifier {
    /// `(source_type, source_value)` for the first populated field.
    fn first_source(&self) -> Result<(&'static str, &str), DomainError> {
        if let Some(v) = self.vid.as_deref() {
            return Ok(("vid", v));
        }
        if let Some(v) = self.mac.as_deref() {
            return Ok(("mac", v));
        }
        if let Some(v) = self.user_id.as_deref() {
            return Ok(("user_id", v));
        }
        if let Some(v) = self.phone.as_deref() {
            return Ok(("phone", v));
        }
        if let Some(v) = self.app_id.as_deref() {
            return Ok(("app_id", v));
        }
        if let Some(v) = self.transaction_id.as_deref() {
            return Ok(("transaction_id", v));
        }
        if let Some(v) = self.qr_id.as_deref() {
            return Ok(("qr_id", v));
        }
        Err(DomainError::InvalidInput(
            "UserIdentifier carries no identifying field".to_string(),
        ))
    }
}

/// An entry in the cross-station pending-session view.
#[derive(Debug, Clone, Serialize)]
pub struct PendingEntry {
    pub cpid: String,
    pub connector_id: i64,
    pub session: PendingSession,
}

/// An entry in the cross-station active-transaction view.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveEntry {
    pub cpid: String,
    #[serde(flatten)]
    pub transaction: ActiveTransaction,
}

/// An entry in the cross-station completed-session view.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub cpid: String,
    #[serde(flatten)]
    pub record: CompletedSessionRecord,
}

/// An entry in the cross-station connector-status view.
#[derive(Debug, Clone, Serialize)]
pub struct StatusEntry {
    pub cpid: String,
    pub connector_id: i64,
    pub status: crate::domain::station::ConnectorStatus,
}

/// One connector's worth of state, as printed by the console's `map` command.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectorMapEntry {
    pub connector_id: i64,
    pub status: Option<crate::domain::station::ConnectorStatus>,
    pub pending: Option<PendingSession>,
    pub active: Option<ActiveTransaction>,
}

/// Merged view returned by `/overview`: status + pending + active.
#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub status: Vec<StatusEntry>,
    pub pending: Vec<PendingEntry>,
    pub active: Vec<ActiveEntry>,
}

/// Everything a control-plane caller needs: one `Services` handle, shared
/// with every orchestrator, the WebSocket acceptor and the console.
#[derive(Clone)]
pub struct ControlPlane {
    services: Services,
}

impl ControlPlane {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    // ── Station registry passthrough ────────────────────────

    pub fn create_station(&self, name: String, location: Option<String>) -> Station {
        self.services.stations.create(name, location)
    }

    pub fn list_stations(&self) -> Vec<Station> {
        self.services.stations.list()
    }

    pub fn get_station(&self, id: i64) -> Option<Station> {
        self.services.stations.get(id)
    }

    pub fn delete_station(&self, id: i64) -> bool {
        self.services.stations.delete(id)
    }

    // ── Outbound commands ───────────────────────────────────

    /// Seed the pending-start context with any given vid/mac and dispatch
    /// RemoteStartTransaction. Arms `pending_remote[connector]` only if the
    /// station accepts, per §4.5.
    pub async fn start(
        &self,
        cpid: &str,
        connector_id: i64,
        id_tag: String,
        vid: Option<String>,
        mac: Option<String>,
    ) -> Result<String, DomainError> {
        let orchestrator = self
            .services
            .sessions
            .get(cpid)
            .ok_or(DomainError::NotConnected)?;

        self.services.stations.set_pending(
            cpid,
            connector_id,
            PendingSession {
                id_tag: Some(id_tag.clone()),
                vid_pinned: vid.is_some(),
                vid,
                mac,
                created_at: Some(Utc::now()),
            },
        );

        let status =
            commands::remote_start(&self.services.command_sender, cpid, connector_id as u32, &id_tag)
                .await?;

        if status == "Accepted" {
            orchestrator.pending_remote.insert(connector_id, id_tag);
            Ok(status)
        } else {
            Err(DomainError::Rejected(status))
        }
    }

    /// Resolve a transaction id from either an explicit `transaction_id` or
    /// a `connector_id` naming the connector currently running it, then
    /// dispatch RemoteStopTransaction.
    pub async fn stop(
        &self,
        cpid: &str,
        transaction_id: Option<i64>,
        connector_id: Option<i64>,
    ) -> Result<String, DomainError> {
        let tx_id = match (transaction_id, connector_id) {
            (Some(tx_id), _) => tx_id,
            (None, Some(connector_id)) => {
                let orchestrator = self
                    .services
                    .sessions
                    .get(cpid)
                    .ok_or(DomainError::NotConnected)?;
                orchestrator
                    .active
                    .get(&connector_id)
                    .map(|e| e.transaction_id)
                    .ok_or(DomainError::NotFound)?
            }
            (None, None) => {
                return Err(DomainError::InvalidInput(
                    "either transactionId or connectorId is required".to_string(),
                ))
            }
        };

        commands::remote_stop(&self.services.command_sender, cpid, tx_id as i32).await
    }

    /// Cancel the watchdog, clear pending state and unlock the connector.
    /// Refuses with `InvalidInput` if a transaction is currently active.
    pub async fn release(&self, cpid: &str, connector_id: i64) -> Result<String, DomainError> {
        let orchestrator = self
            .services
            .sessions
            .get(cpid)
            .ok_or(DomainError::NotConnected)?;

        if orchestrator.has_active_transaction(connector_id) {
            return Err(DomainError::InvalidInput(
                "connector has an active transaction".to_string(),
            ));
        }

        orchestrator.watchdogs.cancel(connector_id);
        orchestrator.pending_remote.remove(&connector_id);
        self.services.stations.clear_pending(cpid, connector_id);

        commands::unlock_connector(&self.services.command_sender, cpid, connector_id as u32).await
    }

    pub async fn reset(&self, cpid: &str, kind: ResetKind) -> Result<String, DomainError> {
        commands::reset(&self.services.command_sender, cpid, kind).await
    }

    /// Dispatch ChangeAvailability; accepts either `Accepted` or `Scheduled`.
    pub async fn change_availability(
        &self,
        cpid: &str,
        connector_id: i64,
        available: bool,
    ) -> Result<String, DomainError> {
        let status = commands::change_availability(
            &self.services.command_sender,
            cpid,
            connector_id as u32,
            available,
        )
        .await?;

        if status == "Accepted" || status == "Scheduled" {
            Ok(status)
        } else {
            Err(DomainError::Rejected(status))
        }
    }

    // ── Cross-station aggregate views ───────────────────────

    pub fn pending(&self) -> Vec<PendingEntry> {
        self.services
            .stations
            .all_pending()
            .into_iter()
            .map(|((cpid, connector_id), session)| PendingEntry {
                cpid,
                connector_id,
                session,
            })
            .collect()
    }

    pub fn active(&self) -> Vec<ActiveEntry> {
        self.services
            .sessions
            .all()
            .into_iter()
            .flat_map(|(cpid, orchestrator)| {
                orchestrator
                    .active
                    .iter()
                    .map(|e| ActiveEntry {
                        cpid: cpid.clone(),
                        transaction: e.value().clone(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.services
            .sessions
            .all()
            .into_iter()
            .flat_map(|(cpid, orchestrator)| {
                orchestrator
                    .history
                    .lock()
                    .unwrap()
                    .iter()
                    .map(|record| HistoryEntry {
                        cpid: cpid.clone(),
                        record: record.clone(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    pub fn status(&self) -> Vec<StatusEntry> {
        self.services
            .sessions
            .all()
            .into_iter()
            .flat_map(|(cpid, orchestrator)| {
                orchestrator
                    .connector_status
                    .iter()
                    .map(|e| StatusEntry {
                        cpid: cpid.clone(),
                        connector_id: *e.key(),
                        status: *e.value(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    pub fn overview(&self) -> Overview {
        Overview {
            status: self.status(),
            pending: self.pending(),
            active: self.active(),
        }
    }

    // ── Identity & wallet ────────────────────────────────────

    pub fn identify(&self, identifier: &UserIdentifier) -> Result<String, DomainError> {
        let (source_type, source_value) = identifier.first_source()?;
        Ok(self.services.identity.resolve(source_type, source_value))
    }

    pub fn wallet_balance(&self, vid: &str) -> Decimal {
        self.services.wallet.balance(vid)
    }

    pub fn wallet_topup(&self, vid: &str, amount: Decimal) -> Decimal {
        self.services.wallet.top_up(vid, amount)
    }

    pub fn wallet_charge(&self, vid: &str, amount: Decimal) -> Result<Decimal, DomainError> {
        Ok(self.services.wallet.deduct(vid, amount)?)
    }

    pub fn is_connected(&self, cpid: &str) -> bool {
        self.services.sessions.is_connected(cpid)
    }

    pub fn connected_ids(&self) -> Vec<String> {
        self.services.sessions.connected_ids()
    }

    /// Everything the console's `map <cpid>` command prints: per-connector
    /// status, any pending remote-start context and any active transaction.
    pub fn station_map(&self, cpid: &str) -> Option<Vec<ConnectorMapEntry>> {
        let orchestrator = self.services.sessions.get(cpid)?;
        let mut connector_ids: std::collections::BTreeSet<i64> = orchestrator
            .connector_status
            .iter()
            .map(|e| *e.key())
            .collect();
        connector_ids.extend(orchestrator.active.iter().map(|e| *e.key()));

        Some(
            connector_ids
                .into_iter()
                .map(|connector_id| ConnectorMapEntry {
                    connector_id,
                    status: orchestrator
                        .connector_status
                        .get(&connector_id)
                        .map(|e| *e),
                    pending: self.services.stations.get_pending(cpid, connector_id),
                    active: orchestrator.active.get(&connector_id).map(|e| e.clone()),
                })
                .collect(),
        )
    }

    /// The console's `stop <cpid> <n>` command: `n` is tried first as a
    /// connector id, then as a transaction id; if neither matches a live
    /// transaction, it falls through to UnlockConnector on that connector.
    pub async fn console_stop(&self, cpid: &str, n: i64) -> Result<String, DomainError> {
        let orchestrator = self
            .services
            .sessions
            .get(cpid)
            .ok_or(DomainError::NotConnected)?;

        if let Some(entry) = orchestrator.active.get(&n) {
            let tx_id = entry.transaction_id;
            drop(entry);
            return commands::remote_stop(&self.services.command_sender, cpid, tx_id as i32).await;
        }

        if orchestrator
            .active
            .iter()
            .any(|e| e.value().transaction_id == n)
        {
            return commands::remote_stop(&self.services.command_sender, cpid, n as i32).await;
        }

        commands::unlock_connector(&self.services.command_sender, cpid, n as u32).await
    }

    pub async fn change_configuration(
        &self,
        cpid: &str,
        key: &str,
        value: &str,
    ) -> Result<String, DomainError> {
        commands::change_configuration(&self.services.command_sender, cpid, key, value).await
    }

    pub fn services(&self) -> &Services {
        &self.services
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identify_picks_first_non_null_field_in_declaration_order() {
        let identifier = UserIdentifier {
            vid: None,
            mac: Some("AA:BB:CC:DD:EE:FF".to_string()),
            user_id: Some("ignored".to_string()),
            phone: None,
            app_id: None,
            transaction_id: None,
            qr_id: None,
        };
        let (source_type, source_value) = identifier.first_source().unwrap();
        assert_eq!(source_type, "mac");
        assert_eq!(source_value, "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn identify_fails_when_every_field_is_null() {
        let identifier = UserIdentifier {
            vid: None,
            mac: None,
            user_id: None,
            phone: None,
            app_id: None,
            transaction_id: None,
            qr_id: None,
        };
        assert!(identifier.first_source().is_err());
    }
}
