//! Station registry: stations, connectors, connector status and the
//! pending-session table keyed by `(station_id, connector_id)`.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Latest reported status word for a connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ConnectorStatus {
    Available,
    Preparing,
    Charging,
    Finishing,
    Occupied,
    Unavailable,
    Faulted,
}

impl ConnectorStatus {
    /// Whether a connector in this status, with no active transaction, should
    /// have the no-session watchdog armed.
    pub fn is_armed_state(self) -> bool {
        matches!(self, ConnectorStatus::Preparing | ConnectorStatus::Occupied)
    }
}

impl From<rust_ocpp::v1_6::types::ChargePointStatus> for ConnectorStatus {
    /// OCPP 1.6's wire status set (`Available`, `Preparing`, `Charging`,
    /// `SuspendedEVSE`, `SuspendedEV`, `Finishing`, `Reserved`,
    /// `Unavailable`, `Faulted`) is folded onto this data model's smaller
    /// set: `SuspendedEVSE`/`SuspendedEV`/`Reserved` all become `Occupied`,
    /// since the station is holding the connector without an open
    /// transaction in all three cases.
    fn from(status: rust_ocpp::v1_6::types::ChargePointStatus) -> Self {
        use rust_ocpp::v1_6::types::ChargePointStatus as Wire;
        match status {
            Wire::Available => ConnectorStatus::Available,
            Wire::Preparing => ConnectorStatus::Preparing,
            Wire::Charging => ConnectorStatus::Charging,
            Wire::Finishing => ConnectorStatus::Finishing,
            Wire::SuspendedEVSE | Wire::SuspendedEV | Wire::Reserved => ConnectorStatus::Occupied,
            Wire::Unavailable => ConnectorStatus::Unavailable,
            Wire::Faulted => ConnectorStatus::Faulted,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connector {
    pub id: i64,
    pub connector_type: String,
    pub status: ConnectorStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
    pub id: i64,
    pub name: String,
    pub location: Option<String>,
    pub connectors: Vec<Connector>,
}

/// Entry in the pending-session table: a start has been armed (via the
/// control plane) or a connector entered `Preparing`, but no transaction
/// exists yet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PendingSession {
    pub id_tag: Option<String>,
    pub vid: Option<String>,
    pub mac: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    /// Whether `vid` is an operator-asserted identity (set by a remote-start
    /// request) rather than a hint or a freshly minted temporary VID.
    /// Authorize reconciles hints into the id_tag's resolved VID, but a
    /// pinned VID wins instead — the id_tag's VID is merged into it.
    #[serde(default)]
    pub vid_pinned: bool,
}

impl PendingSession {
    pub fn is_empty(&self) -> bool {
        self.id_tag.is_none() && self.vid.is_none() && self.mac.is_none()
    }
}

/// Key into the pending-session table and the connector-status table.
pub type PendingKey = (String, i64);

/// Stations/connectors plus the cross-station pending table.
///
/// Station and connector ids are auto-incrementing integers in a flat
/// arena — there are no pointers between stations, connectors and
/// sessions, only ids, per the flat-arena modeling note.
pub struct StationRegistry {
    stations: DashMap<i64, Station>,
    next_id: AtomicI64,
    pending: DashMap<PendingKey, PendingSession>,
}

pub type SharedStationRegistry = Arc<StationRegistry>;

impl StationRegistry {
    pub fn new() -> Self {
        Self {
            stations: DashMap::new(),
            next_id: AtomicI64::new(1),
            pending: DashMap::new(),
        }
    }

    pub fn shared() -> SharedStationRegistry {
        Arc::new(Self::new())
    }

    pub fn create(&self, name: String, location: Option<String>) -> Station {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let station = Station {
            id,
            name,
            location,
            connectors: Vec::new(),
        };
        self.stations.insert(id, station.clone());
        station
    }

    pub fn get(&self, id: i64) -> Option<Station> {
        self.stations.get(&id).map(|s| s.clone())
    }

    pub fn list(&self) -> Vec<Station> {
        self.stations.iter().map(|e| e.value().clone()).collect()
    }

    pub fn delete(&self, id: i64) -> bool {
        self.stations.remove(&id).is_some()
    }

    /// Insert or update a pending-session entry for `(station_id, connector_id)`.
    pub fn set_pending(&self, station_id: &str, connector_id: i64, session: PendingSession) {
        self.pending
            .insert((station_id.to_string(), connector_id), session);
    }

    pub fn get_pending(&self, station_id: &str, connector_id: i64) -> Option<PendingSession> {
        self.pending
            .get(&(station_id.to_string(), connector_id))
            .map(|e| e.clone())
    }

    pub fn clear_pending(&self, station_id: &str, connector_id: i64) {
        self.pending.remove(&(station_id.to_string(), connector_id));
    }

    /// All pending entries belonging to `station_id`, across every connector.
    pub fn pending_for_station(&self, station_id: &str) -> Vec<(i64, PendingSession)> {
        self.pending
            .iter()
            .filter(|e| e.key().0 == station_id)
            .map(|e| (e.key().1, e.value().clone()))
            .collect()
    }

    pub fn all_pending(&self) -> Vec<(PendingKey, PendingSession)> {
        self.pending
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }
}

impl Default for StationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_assigns_increasing_ids() {
        let registry = StationRegistry::new();
        let a = registry.create("A".into(), None);
        let b = registry.create("B".into(), None);
        assert!(b.id > a.id);
    }

    #[test]
    fn pending_roundtrip() {
        let registry = StationRegistry::new();
        registry.set_pending(
            "CP_A",
            1,
            PendingSession {
                id_tag: Some("TAG1".into()),
                ..Default::default()
            },
        );
        let got = registry.get_pending("CP_A", 1).unwrap();
        assert_eq!(got.id_tag.as_deref(), Some("TAG1"));

        registry.clear_pending("CP_A", 1);
        assert!(registry.get_pending("CP_A", 1).is_none());
    }

    #[test]
    fn armed_states() {
        assert!(ConnectorStatus::Preparing.is_armed_state());
        assert!(ConnectorStatus::Occupied.is_armed_state());
        assert!(!ConnectorStatus::Charging.is_armed_state());
    }
}
