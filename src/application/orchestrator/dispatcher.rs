//! Dispatch table: inbound `action` name -> handler. Unrecognized actions
//! become a `NotImplemented` CALLERROR.

use std::sync::Arc;

use serde_json::Value;

use super::handlers;
use super::state::Orchestrator;

/// `(error_code, error_description)` for a CALLERROR reply.
pub type DispatchError = (String, String);

pub async fn dispatch(
    orchestrator: &Arc<Orchestrator>,
    action: &str,
    payload: Value,
) -> Result<Value, DispatchError> {
    match action {
        "BootNotification" => handlers::boot_notification::handle(orchestrator, payload).await,
        "Authorize" => handlers::authorize::handle(orchestrator, payload).await,
        "StatusNotification" => handlers::status_notification::handle(orchestrator, payload).await,
        "Heartbeat" => handlers::heartbeat::handle(orchestrator, payload).await,
        "MeterValues" => handlers::meter_values::handle(orchestrator, payload).await,
        "DataTransfer" => handlers::data_transfer::handle(orchestrator, payload).await,
        "StartTransaction" => handlers::start_transaction::handle(orchestrator, payload).await,
        "StopTransaction" => handlers::stop_transaction::handle(orchestrator, payload).await,
        other => Err((
            "NotImplemented".to_string(),
            format!("Action {other} is not implemented"),
        )),
    }
}
