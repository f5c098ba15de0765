use jiff::civil::Date;

use crate::{error::MaintenanceError, risk_score::RiskScore};

/// Estimates the probability that a vehicle needs unplanned maintenance.
///
/// Independent from routing, the optimizer never consumes these scores.
pub trait MaintenanceRiskProvider {
    fn risk_score(&self, vehicle_id: &str, as_of: Date) -> Result<RiskScore, MaintenanceError>;
}
