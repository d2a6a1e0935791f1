//! BootNotification — always accepted; post-boot reconfiguration runs
//! afterward without blocking the read loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_ocpp::v1_6::messages::boot_notification::BootNotificationResponse;
use rust_ocpp::v1_6::types::RegistrationStatus;
use serde_json::Value;
use tracing::{info, warn};

use crate::application::orchestrator::commands;
use crate::application::orchestrator::state::Orchestrator;

use super::HandlerError;

const HEARTBEAT_INTERVAL_SECS: i64 = 300;
const GET_CONFIGURATION_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn handle(orchestrator: &Arc<Orchestrator>, _payload: Value) -> Result<Value, HandlerError> {
    let response = BootNotificationResponse {
        status: RegistrationStatus::Accepted,
        current_time: Utc::now(),
        interval: HEARTBEAT_INTERVAL_SECS,
    };

    let orchestrator = orchestrator.clone();
    tokio::spawn(async move {
        post_boot_reconfigure(orchestrator).await;
    });

    serde_json::to_value(&response)
        .map_err(|e| ("InternalError".to_string(), e.to_string()))
}

async fn post_boot_reconfigure(orchestrator: Arc<Orchestrator>) {
    let cpid = orchestrator.cpid.clone();

    let result = tokio::time::timeout(
        GET_CONFIGURATION_TIMEOUT,
        commands::get_configuration(&orchestrator.services.command_sender, &cpid, None),
    )
    .await;

    let configuration = match result {
        Ok(Ok(config)) => config,
        Ok(Err(e)) => {
            warn!(cpid, error = %e, "GetConfiguration failed during post-boot reconfiguration");
            return;
        }
        Err(_) => {
            warn!(cpid, "GetConfiguration timed out during post-boot reconfiguration");
            return;
        }
    };

    let has_key = |wanted: &str| {
        configuration
            .configuration_key
            .iter()
            .any(|(key, _)| key.eq_ignore_ascii_case(wanted))
    };

    if has_key("AuthorizeRemoteTxRequests") {
        let _ = commands::change_configuration(
            &orchestrator.services.command_sender,
            &cpid,
            "AuthorizeRemoteTxRequests",
            "true",
        )
        .await;
    }

    if has_key("QRcodeConnectorID1") {
        if let Some(url) = &orchestrator.services.qr_code_url {
            let _ = commands::change_configuration(
                &orchestrator.services.command_sender,
                &cpid,
                "QRcodeConnectorID1",
                url,
            )
            .await;
        }
        return;
    }

    if let Some(url) = &orchestrator.services.qr_code_url {
        info!(cpid, "falling back to DataTransfer QR code delivery");
        let body = serde_json::json!({ "message_type": "QRCode", "uri": url });
        let _ = commands::data_transfer(
            &orchestrator.services.command_sender,
            &cpid,
            "com.yourcompany.payment",
            Some("DisplayQRCode"),
            body,
        )
        .await;
    }
}
