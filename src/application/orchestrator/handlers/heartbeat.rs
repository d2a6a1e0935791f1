//! Heartbeat — records the time and replies with the current UTC time.

use std::sync::Arc;

use chrono::Utc;
use rust_ocpp::v1_6::messages::heart_beat::HeartbeatResponse;
use serde_json::Value;

use crate::application::orchestrator::state::Orchestrator;

use super::HandlerError;

pub async fn handle(orchestrator: &Arc<Orchestrator>, _payload: Value) -> Result<Value, HandlerError> {
    let now = Utc::now();
    *orchestrator.last_heartbeat.lock().unwrap() = Some(now);

    let response = HeartbeatResponse { current_time: now };
    serde_json::to_value(&response).map_err(|e| ("InternalError".to_string(), e.to_string()))
}
