//! MeterValues — records recognized measurands against the active
//! transaction on the reporting connector. Numeric parse failures for an
//! individual field are skipped silently; the message is still acked.

use std::sync::Arc;

use rust_ocpp::v1_6::messages::meter_values::{MeterValuesRequest, MeterValuesResponse};
use rust_ocpp::v1_6::types::Measurand;
use serde_json::Value;

use crate::application::orchestrator::state::Orchestrator;
use crate::domain::transaction::MeterSample;

use super::HandlerError;

pub async fn handle(orchestrator: &Arc<Orchestrator>, payload: Value) -> Result<Value, HandlerError> {
    let request: MeterValuesRequest = serde_json::from_value(payload)
        .map_err(|e| ("FormationViolation".to_string(), e.to_string()))?;

    let connector_id = request.connector_id as i64;

    if let Some(mut active) = orchestrator.active.get_mut(&connector_id) {
        for meter_value in &request.meter_value {
            let mut sample = MeterSample {
                timestamp: meter_value.timestamp,
                current: None,
                voltage: None,
                soc: None,
                temperature: None,
            };

            for sampled in &meter_value.sampled_value {
                let Ok(parsed) = sampled.value.parse::<f64>() else {
                    continue;
                };
                match sampled.measurand {
                    Some(Measurand::CurrentImport) => sample.current = Some(parsed),
                    Some(Measurand::Voltage) => sample.voltage = Some(parsed),
                    Some(Measurand::StateOfCharge) => sample.soc = Some(parsed),
                    Some(Measurand::Temperature) => sample.temperature = Some(parsed),
                    // Energy.Active.Import.Register is recognized on the
                    // wire but not persisted per-sample here.
                    _ => {}
                }
            }

            active.record_sample(sample);
        }
    }

    let response = MeterValuesResponse {};
    serde_json::to_value(&response).map_err(|e| ("InternalError".to_string(), e.to_string()))
}
