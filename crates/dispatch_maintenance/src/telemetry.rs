use fxhash::FxHashMap;
use jiff::civil::Date;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, PartialEq)]
pub struct VehicleTelemetry {
    /// Kilometers driven since the last service
    pub km_since_service: f64,
    pub last_service_date: Date,
    /// Number of active OBD alerts
    #[serde(default)]
    pub obd_alerts: u32,
}

pub trait TelemetrySource {
    fn telemetry(&self, vehicle_id: &str) -> Option<&VehicleTelemetry>;
}

impl TelemetrySource for FxHashMap<String, VehicleTelemetry> {
    fn telemetry(&self, vehicle_id: &str) -> Option<&VehicleTelemetry> {
        self.get(vehicle_id)
    }
}
