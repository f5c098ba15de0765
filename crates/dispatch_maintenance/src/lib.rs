pub mod error;
pub mod risk_provider;
pub mod risk_score;
pub mod static_risk_provider;
pub mod telemetry;
pub mod telemetry_risk_model;
