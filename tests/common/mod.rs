//! Shared scaffolding for the end-to-end orchestrator scenarios: a fresh
//! set of services plus one registered charge-point connection, with
//! helpers to feed inbound OCPP CALLs and to answer outbound ones as a
//! simulated station would.

use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use ocpp_csms::application::control::ControlPlane;
use ocpp_csms::application::orchestrator::command_sender::{CommandSender, SharedCommandSender};
use ocpp_csms::application::orchestrator::state::{Orchestrator, Services};
use ocpp_csms::application::orchestrator::handle_inbound_text;
use ocpp_csms::application::session::registry::SessionRegistry;
use ocpp_csms::domain::station::StationRegistry;
use ocpp_csms::domain::vid::IdentityTable;
use ocpp_csms::domain::wallet::Wallet;
use ocpp_csms::support::ocpp_frame::OcppFrame;

pub struct Harness {
    pub cpid: String,
    pub orchestrator: std::sync::Arc<Orchestrator>,
    pub control: ControlPlane,
    pub command_sender: SharedCommandSender,
    pub outbound_rx: mpsc::UnboundedReceiver<String>,
}

impl Harness {
    pub fn new(cpid: &str) -> Self {
        let sessions = SessionRegistry::shared();
        let command_sender = CommandSender::shared(sessions.clone());
        let services = Services::new(
            IdentityTable::shared(),
            Wallet::shared(),
            StationRegistry::shared(),
            sessions.clone(),
            command_sender.clone(),
            None,
        );
        let control = ControlPlane::new(services.clone());

        let (tx, rx) = mpsc::unbounded_channel();
        let orchestrator = Orchestrator::new(cpid.to_string(), services, tx.clone());
        let (evict_tx, _evict_rx) = oneshot::channel();
        sessions.register(cpid, tx, orchestrator.clone(), evict_tx);

        Self {
            cpid: cpid.to_string(),
            orchestrator,
            control,
            command_sender,
            outbound_rx: rx,
        }
    }

    /// Feed an inbound CALL through the orchestrator and return the
    /// CALLRESULT payload sent back for it. Panics if the handler produced
    /// a CALLERROR instead — use [`Harness::inbound_call_expect_error`] when
    /// a rejection is the point of the test.
    pub async fn inbound_call(&mut self, action: &str, payload: Value) -> Value {
        match self.send_inbound_and_await_reply(action, payload).await {
            OcppFrame::CallResult { payload, .. } => payload,
            other => panic!("expected CallResult, got {other:?}"),
        }
    }

    async fn send_inbound_and_await_reply(&mut self, action: &str, payload: Value) -> OcppFrame {
        let unique_id = uuid::Uuid::new_v4().to_string();
        let text = OcppFrame::Call {
            unique_id,
            action: action.to_string(),
            payload,
        }
        .serialize();
        handle_inbound_text(&self.orchestrator, &text).await;
        self.next_outbound().await
    }

    /// Wait for the next frame the orchestrator sends outbound — either a
    /// reply to an inbound CALL or a fresh CALL the control plane issued.
    pub async fn next_outbound(&mut self) -> OcppFrame {
        let text = tokio::time::timeout(Duration::from_secs(1), self.outbound_rx.recv())
            .await
            .expect("timed out waiting for an outbound frame")
            .expect("outbound channel closed unexpectedly");
        OcppFrame::parse(&text).expect("orchestrator emitted an unparsable frame")
    }

    /// Answer the next outbound CALL as if the station replied with
    /// `payload`. Returns the action name, so callers can assert on it.
    pub async fn respond_next_call(&mut self, payload: Value) -> String {
        match self.next_outbound().await {
            OcppFrame::Call {
                unique_id, action, ..
            } => {
                self.command_sender.resolve(&self.cpid, &unique_id, payload);
                action
            }
            other => panic!("expected an outbound Call, got {other:?}"),
        }
    }
}

pub fn boot_notification_payload() -> Value {
    serde_json::json!({
        "chargePointVendor": "Acme",
        "chargePointModel": "FastCharge 100",
    })
}

pub fn status_notification_payload(connector_id: i64, status: &str) -> Value {
    serde_json::json!({
        "connectorId": connector_id,
        "errorCode": "NoError",
        "status": status,
    })
}

pub fn authorize_payload(id_tag: &str) -> Value {
    serde_json::json!({ "idTag": id_tag })
}

pub fn start_transaction_payload(connector_id: i64, id_tag: &str, meter_start: i64, timestamp: &str) -> Value {
    serde_json::json!({
        "connectorId": connector_id,
        "idTag": id_tag,
        "meterStart": meter_start,
        "timestamp": timestamp,
    })
}

pub fn stop_transaction_payload(transaction_id: i64, meter_stop: i64, timestamp: &str) -> Value {
    serde_json::json!({
        "transactionId": transaction_id,
        "meterStop": meter_stop,
        "timestamp": timestamp,
    })
}

pub fn meter_values_payload(connector_id: i64, timestamp: &str, current_import: &str) -> Value {
    serde_json::json!({
        "connectorId": connector_id,
        "meterValue": [{
            "timestamp": timestamp,
            "sampledValue": [{
                "value": current_import,
                "measurand": "Current.Import",
            }],
        }],
    })
}

pub fn data_transfer_mac_payload(mac: &str) -> Value {
    serde_json::json!({
        "vendorId": "MacID",
        "data": mac,
    })
}
