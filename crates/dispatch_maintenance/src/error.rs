use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum MaintenanceError {
    #[error("no maintenance data for vehicle {0}")]
    UnknownVehicle(String),

    #[error("invalid telemetry for vehicle {vehicle_id}: {reason}")]
    InvalidTelemetry { vehicle_id: String, reason: String },
}
