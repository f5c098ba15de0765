use fxhash::FxHashMap;
use jiff::civil::Date;

use crate::{
    error::MaintenanceError, risk_provider::MaintenanceRiskProvider, risk_score::RiskScore,
};

/// Fixed table of risk probabilities, independent of the date.
pub struct StaticRiskProvider {
    probabilities: FxHashMap<String, f64>,
    horizon_days: u32,
}

impl StaticRiskProvider {
    pub fn new(probabilities: FxHashMap<String, f64>, horizon_days: u32) -> Self {
        Self {
            probabilities,
            horizon_days,
        }
    }
}

impl MaintenanceRiskProvider for StaticRiskProvider {
    fn risk_score(&self, vehicle_id: &str, _as_of: Date) -> Result<RiskScore, MaintenanceError> {
        let probability = self
            .probabilities
            .get(vehicle_id)
            .ok_or_else(|| MaintenanceError::UnknownVehicle(vehicle_id.to_owned()))?;

        if !probability.is_finite() {
            return Err(MaintenanceError::InvalidTelemetry {
                vehicle_id: vehicle_id.to_owned(),
                reason: format!("probability {probability} is not finite"),
            });
        }

        Ok(RiskScore::new(*probability, self.horizon_days))
    }
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;

    use super::*;

    #[test]
    fn test_static_risk_provider() {
        let mut probabilities = FxHashMap::default();
        probabilities.insert(String::from("van-1"), 0.25);
        probabilities.insert(String::from("van-2"), 1.5);
        let provider = StaticRiskProvider::new(probabilities, 14);

        let score = provider.risk_score("van-1", date(2025, 6, 1)).unwrap();
        assert_eq!(score.probability, 0.25);
        assert_eq!(score.horizon_days, 14);

        assert_eq!(
            provider
                .risk_score("van-2", date(2025, 6, 1))
                .unwrap()
                .probability,
            1.0
        );
        assert!(provider.risk_score("van-3", date(2025, 6, 1)).is_err());
    }
}
