//! End-to-end orchestrator scenarios, driven entirely through inbound OCPP
//! CALLs and the outbound CALLs they trigger — no network, no HTTP layer.

mod common;

use serde_json::json;

use common::{
    authorize_payload, boot_notification_payload, data_transfer_mac_payload,
    meter_values_payload, start_transaction_payload, status_notification_payload,
    stop_transaction_payload, Harness,
};
use ocpp_csms::domain::station::ConnectorStatus;
use ocpp_csms::support::ocpp_frame::OcppFrame;

/// BootNotification always triggers a fire-and-forget GetConfiguration CALL;
/// answer it with an empty key list so it doesn't leak into the next assert.
async fn drain_boot_reconfigure(harness: &mut Harness) {
    let action = harness
        .respond_next_call(json!({ "configurationKey": [], "unknownKey": [] }))
        .await;
    assert_eq!(action, "GetConfiguration");
}

#[tokio::test]
async fn s1_happy_path_reports_vid_energy_and_duration() {
    let mut harness = Harness::new("CP1");

    let boot = harness.inbound_call("BootNotification", boot_notification_payload()).await;
    assert_eq!(boot["status"], "Accepted");
    drain_boot_reconfigure(&mut harness).await;

    let status = harness
        .inbound_call("StatusNotification", status_notification_payload(1, "Preparing"))
        .await;
    assert_eq!(status, json!({}));

    let (start_result, respond_result) = tokio::join!(
        harness.control.start(&harness.cpid, 1, "TAG1".to_string(), Some("VEH1".to_string()), None),
        harness.respond_next_call(json!({ "status": "Accepted" })),
    );
    assert_eq!(respond_result, "RemoteStartTransaction");
    assert_eq!(start_result.unwrap(), "Accepted");

    let auth = harness.inbound_call("Authorize", authorize_payload("TAG1")).await;
    assert_eq!(auth["idTagInfo"]["status"], "Accepted");

    let start_tx = harness
        .inbound_call(
            "StartTransaction",
            start_transaction_payload(1, "TAG1", 1000, "2026-07-26T10:00:00Z"),
        )
        .await;
    assert_eq!(start_tx["transactionId"], 1);
    assert_eq!(start_tx["idTagInfo"]["status"], "Accepted");

    harness
        .inbound_call("MeterValues", meter_values_payload(1, "2026-07-26T10:05:00Z", "16"))
        .await;

    let stop = harness
        .inbound_call(
            "StopTransaction",
            stop_transaction_payload(1, 1500, "2026-07-26T10:10:00Z"),
        )
        .await;
    assert_eq!(stop["idTagInfo"]["status"], "Accepted");

    let history = harness.control.history();
    assert_eq!(history.len(), 1);
    let record = &history[0].record;
    assert_eq!(record.energy, 500);
    assert_eq!(record.duration_seconds, 600);
    assert_eq!(record.vid.as_deref(), Some("VEH1"));
}

#[tokio::test]
async fn s2_wrong_tag_is_rejected_and_unlocks() {
    let mut harness = Harness::new("CP2");

    harness.inbound_call("BootNotification", boot_notification_payload()).await;
    drain_boot_reconfigure(&mut harness).await;
    harness
        .inbound_call("StatusNotification", status_notification_payload(1, "Preparing"))
        .await;

    let (start_result, respond_result) = tokio::join!(
        harness.control.start(&harness.cpid, 1, "TAG1".to_string(), None, None),
        harness.respond_next_call(json!({ "status": "Accepted" })),
    );
    assert_eq!(respond_result, "RemoteStartTransaction");
    assert_eq!(start_result.unwrap(), "Accepted");

    let (start_tx, unlock_action) = tokio::join!(
        harness.inbound_call(
            "StartTransaction",
            start_transaction_payload(1, "TAG2", 1000, "2026-07-26T10:00:00Z"),
        ),
        harness.respond_next_call(json!({ "status": "Accepted" })),
    );
    assert_eq!(start_tx["transactionId"], 0);
    assert_eq!(start_tx["idTagInfo"]["status"], "Invalid");
    assert_eq!(unlock_action, "UnlockConnector");

    assert!(harness.control.pending().iter().all(|p| p.connector_id != 1));
}

#[tokio::test(start_paused = true)]
async fn s3_watchdog_unlocks_after_90_seconds_of_no_session() {
    let mut harness = Harness::new("CP3");

    harness.inbound_call("BootNotification", boot_notification_payload()).await;
    drain_boot_reconfigure(&mut harness).await;
    harness
        .inbound_call("StatusNotification", status_notification_payload(2, "Preparing"))
        .await;

    tokio::time::advance(std::time::Duration::from_secs(91)).await;

    let action = harness.respond_next_call(json!({ "status": "Accepted" })).await;
    assert_eq!(action, "UnlockConnector");
    assert!(harness.control.pending().iter().all(|p| p.connector_id != 2));
}

/// Guards against the watchdog firing on a stale cancellation: even if the
/// connector status map shows the connector has left the armed state by
/// expiry (simulating a race where cancellation hasn't taken effect yet),
/// the watchdog must not dispatch UnlockConnector.
#[tokio::test(start_paused = true)]
async fn s3b_watchdog_does_not_unlock_if_connector_left_armed_state() {
    let mut harness = Harness::new("CP3B");

    harness.inbound_call("BootNotification", boot_notification_payload()).await;
    drain_boot_reconfigure(&mut harness).await;
    harness
        .inbound_call("StatusNotification", status_notification_payload(1, "Preparing"))
        .await;

    // Simulate the connector transitioning out of the armed state without
    // going through the normal cancellation path, as could happen if
    // `abort()` has been requested but not yet taken effect.
    harness
        .orchestrator
        .connector_status
        .insert(1, ConnectorStatus::Charging);

    tokio::time::advance(std::time::Duration::from_secs(91)).await;

    let result = tokio::time::timeout(std::time::Duration::from_secs(1), harness.outbound_rx.recv()).await;
    assert!(
        result.is_err(),
        "watchdog must re-check connector state at expiry and not unlock"
    );
}

#[tokio::test]
async fn s4_zero_credit_triggers_remote_stop() {
    let mut harness = Harness::new("CP4");
    harness.control.wallet_topup("VID:0000000001", rust_decimal::Decimal::ZERO);

    harness.inbound_call("BootNotification", boot_notification_payload()).await;
    drain_boot_reconfigure(&mut harness).await;
    harness
        .inbound_call("StatusNotification", status_notification_payload(1, "Preparing"))
        .await;

    let (start_result, respond_result) = tokio::join!(
        harness.control.start(&harness.cpid, 1, "TAG1".to_string(), None, None),
        harness.respond_next_call(json!({ "status": "Accepted" })),
    );
    assert_eq!(respond_result, "RemoteStartTransaction");
    assert_eq!(start_result.unwrap(), "Accepted");

    let (start_tx, stop_action) = tokio::join!(
        harness.inbound_call(
            "StartTransaction",
            start_transaction_payload(1, "TAG1", 1000, "2026-07-26T10:00:00Z"),
        ),
        harness.respond_next_call(json!({ "status": "Accepted" })),
    );
    assert_eq!(start_tx["transactionId"], 1);
    assert_eq!(stop_action, "RemoteStopTransaction");
}

#[tokio::test]
async fn s5_data_transfer_mac_is_promoted_to_authorized_vid() {
    let mut harness = Harness::new("CP5");

    harness.inbound_call("BootNotification", boot_notification_payload()).await;
    drain_boot_reconfigure(&mut harness).await;

    let dt = harness
        .inbound_call("DataTransfer", data_transfer_mac_payload("AA:BB:CC:DD:EE:FF"))
        .await;
    assert_eq!(dt["status"], "Accepted");

    harness
        .inbound_call("StatusNotification", status_notification_payload(1, "Preparing"))
        .await;

    harness.inbound_call("Authorize", authorize_payload("TAG1")).await;

    let start_tx = harness
        .inbound_call(
            "StartTransaction",
            start_transaction_payload(1, "TAG1", 1000, "2026-07-26T10:00:00Z"),
        )
        .await;
    assert_eq!(start_tx["transactionId"], 1);

    let id_tag_vid = harness.control.services().identity.resolve("id_tag", "TAG1");
    let mac_vid = harness
        .control
        .services()
        .identity
        .resolve("mac", "AA:BB:CC:DD:EE:FF");
    assert_eq!(mac_vid, id_tag_vid);
}

#[tokio::test]
async fn s6_stop_by_connector_targets_only_that_transaction() {
    let mut harness = Harness::new("CP6");

    harness.inbound_call("BootNotification", boot_notification_payload()).await;
    drain_boot_reconfigure(&mut harness).await;

    for connector_id in [1_i64, 2_i64] {
        harness
            .inbound_call(
                "StatusNotification",
                status_notification_payload(connector_id, "Preparing"),
            )
            .await;
        harness
            .inbound_call(
                "StartTransaction",
                start_transaction_payload(
                    connector_id,
                    &format!("TAG{connector_id}"),
                    1000,
                    "2026-07-26T10:00:00Z",
                ),
            )
            .await;
    }

    let (stop_result, stop_action) = tokio::join!(
        harness.control.stop(&harness.cpid, None, Some(2)),
        harness.respond_next_call(json!({ "status": "Accepted" })),
    );
    assert_eq!(stop_action, "RemoteStopTransaction");
    assert_eq!(stop_result.unwrap(), "Accepted");

    let orchestrator = harness.orchestrator.clone();
    assert!(orchestrator.active.contains_key(&1));
}

#[tokio::test]
async fn status_notification_folds_suspended_and_reserved_into_occupied() {
    let mut harness = Harness::new("CP7");
    harness.inbound_call("BootNotification", boot_notification_payload()).await;
    drain_boot_reconfigure(&mut harness).await;

    harness
        .inbound_call("StatusNotification", status_notification_payload(1, "SuspendedEV"))
        .await;

    let status = harness.control.status();
    let entry = status.iter().find(|s| s.connector_id == 1).unwrap();
    assert_eq!(entry.status, ConnectorStatus::Occupied);
}

#[tokio::test]
async fn unparsable_outbound_reply_is_never_produced_for_call_result() {
    // Sanity check on the harness itself: a plain CallResult parses back
    // losslessly through the shared framing module.
    let frame = OcppFrame::CallResult {
        unique_id: "abc".to_string(),
        payload: json!({ "ok": true }),
    };
    let text = frame.serialize();
    let parsed = OcppFrame::parse(&text).unwrap();
    match parsed {
        OcppFrame::CallResult { payload, .. } => assert_eq!(payload["ok"], true),
        other => panic!("unexpected frame: {other:?}"),
    }
}
