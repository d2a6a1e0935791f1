//! Per-connector transaction state: active transactions, meter samples and
//! completed-session history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single MeterValues sample, recognized measurands only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeterSample {
    pub timestamp: DateTime<Utc>,
    pub current: Option<f64>,
    pub voltage: Option<f64>,
    pub soc: Option<f64>,
    pub temperature: Option<f64>,
}

/// Live transaction on a connector, from StartTransaction until StopTransaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveTransaction {
    pub transaction_id: i64,
    pub connector_id: i64,
    pub id_tag: String,
    pub meter_start: i64,
    pub start_time: DateTime<Utc>,
    pub vid: Option<String>,
    pub mac: Option<String>,
    pub meter_samples: Vec<MeterSample>,
    pub last_sample: Option<MeterSample>,
}

impl ActiveTransaction {
    pub fn new(
        transaction_id: i64,
        connector_id: i64,
        id_tag: String,
        meter_start: i64,
        start_time: DateTime<Utc>,
        vid: Option<String>,
        mac: Option<String>,
    ) -> Self {
        Self {
            transaction_id,
            connector_id,
            id_tag,
            meter_start,
            start_time,
            vid,
            mac,
            meter_samples: Vec::new(),
            last_sample: None,
        }
    }

    pub fn record_sample(&mut self, sample: MeterSample) {
        self.last_sample = Some(sample.clone());
        self.meter_samples.push(sample);
    }
}

/// Appended to an orchestrator's history on StopTransaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedSessionRecord {
    pub connector_id: i64,
    pub transaction_id: i64,
    pub id_tag: String,
    pub vid: Option<String>,
    pub mac: Option<String>,
    pub meter_start: i64,
    pub meter_stop: i64,
    pub energy: i64,
    pub start_time: DateTime<Utc>,
    pub stop_time: DateTime<Utc>,
    pub duration_seconds: i64,
    pub meter_samples: Vec<MeterSample>,
}

impl CompletedSessionRecord {
    pub fn from_active(
        active: ActiveTransaction,
        meter_stop: i64,
        stop_time: DateTime<Utc>,
    ) -> Self {
        let energy = meter_stop - active.meter_start;
        let duration_seconds = (stop_time - active.start_time).num_seconds();
        Self {
            connector_id: active.connector_id,
            transaction_id: active.transaction_id,
            id_tag: active.id_tag,
            vid: active.vid,
            mac: active.mac,
            meter_start: active.meter_start,
            meter_stop,
            energy,
            start_time: active.start_time,
            stop_time,
            duration_seconds,
            meter_samples: active.meter_samples,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn energy_and_duration_are_computed() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let stop = Utc.with_ymd_and_hms(2024, 1, 1, 0, 10, 0).unwrap();
        let active = ActiveTransaction::new(1, 1, "TAG1".into(), 1000, start, Some("VEH1".into()), None);
        let record = CompletedSessionRecord::from_active(active, 1500, stop);
        assert_eq!(record.energy, 500);
        assert_eq!(record.duration_seconds, 600);
        assert_eq!(record.vid.as_deref(), Some("VEH1"));
    }
}
