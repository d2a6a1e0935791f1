//! Per-connector orchestrator state and the shared collaborating services
//! it is constructed with.
//!
//! There is no global mutable singleton: the registry, identity table,
//! wallet and transaction-id allocator are constructed once by the
//! process entrypoint and passed by reference into the acceptor, which
//! passes them into every orchestrator it creates. Tests build a fresh
//! `Services` per case.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::application::session::registry::SharedSessionRegistry;
use crate::domain::station::{ConnectorStatus, SharedStationRegistry};
use crate::domain::transaction::{ActiveTransaction, CompletedSessionRecord};
use crate::domain::vid::SharedIdentityTable;
use crate::domain::wallet::SharedWallet;

use super::command_sender::SharedCommandSender;
use super::watchdog::WatchdogTable;

/// Collaborating services shared across every orchestrator instance.
#[derive(Clone)]
pub struct Services {
    pub identity: SharedIdentityTable,
    pub wallet: SharedWallet,
    pub stations: SharedStationRegistry,
    pub sessions: SharedSessionRegistry,
    pub command_sender: SharedCommandSender,
    pub tx_ids: Arc<AtomicI64>,
    /// QR code URL pushed to a station's connector 1 during post-boot
    /// reconfiguration, when configured.
    pub qr_code_url: Option<String>,
}

impl Services {
    pub fn new(
        identity: SharedIdentityTable,
        wallet: SharedWallet,
        stations: SharedStationRegistry,
        sessions: SharedSessionRegistry,
        command_sender: SharedCommandSender,
        qr_code_url: Option<String>,
    ) -> Self {
        Self {
            identity,
            wallet,
            stations,
            sessions,
            command_sender,
            tx_ids: Arc::new(AtomicI64::new(0)),
            qr_code_url,
        }
    }

    /// Allocate the next process-wide transaction id, starting at 1.
    pub fn next_transaction_id(&self) -> i64 {
        self.tx_ids.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Live state for one connected charge point; lifetime is the WebSocket's
/// lifetime. All per-connector maps are cleared on disconnect.
pub struct Orchestrator {
    pub cpid: String,
    pub services: Services,
    pub outbound_tx: mpsc::UnboundedSender<String>,

    pub connector_status: DashMap<i64, ConnectorStatus>,
    pub active: DashMap<i64, ActiveTransaction>,
    pub pending_remote: DashMap<i64, String>,
    pub watchdogs: Arc<WatchdogTable>,

    /// Last VID/MAC seen via DataTransfer, used as StartTransaction's
    /// third and fourth priority VID source.
    pub last_seen_vid: Mutex<Option<String>>,
    pub last_seen_mac: Mutex<Option<String>>,

    /// Timestamp of the last Heartbeat received from this charge point.
    pub last_heartbeat: Mutex<Option<chrono::DateTime<chrono::Utc>>>,

    pub history: Mutex<Vec<CompletedSessionRecord>>,
}

impl Orchestrator {
    pub fn new(cpid: String, services: Services, outbound_tx: mpsc::UnboundedSender<String>) -> Arc<Self> {
        Arc::new(Self {
            cpid,
            services,
            outbound_tx,
            connector_status: DashMap::new(),
            active: DashMap::new(),
            pending_remote: DashMap::new(),
            watchdogs: Arc::new(WatchdogTable::new()),
            last_seen_vid: Mutex::new(None),
            last_seen_mac: Mutex::new(None),
            last_heartbeat: Mutex::new(None),
            history: Mutex::new(Vec::new()),
        })
    }

    pub fn send_frame(&self, frame: &crate::support::ocpp_frame::OcppFrame) {
        let _ = self.outbound_tx.send(frame.serialize());
    }

    pub fn has_active_transaction(&self, connector_id: i64) -> bool {
        self.active.contains_key(&connector_id)
    }

    pub fn set_last_seen(&self, vid: Option<String>, mac: Option<String>) {
        if vid.is_some() {
            *self.last_seen_vid.lock().unwrap() = vid;
        }
        if mac.is_some() {
            *self.last_seen_mac.lock().unwrap() = mac;
        }
    }

    pub fn last_seen_vid(&self) -> Option<String> {
        self.last_seen_vid.lock().unwrap().clone()
    }

    pub fn last_seen_mac(&self) -> Option<String> {
        self.last_seen_mac.lock().unwrap().clone()
    }

    /// Cancel everything this orchestrator owns: armed watchdogs and any
    /// outbound CALLs awaiting a response, called on disconnect.
    pub fn teardown(&self) {
        self.watchdogs.cancel_all();
        self.services.command_sender.cancel_for_cpid(&self.cpid);
    }
}
