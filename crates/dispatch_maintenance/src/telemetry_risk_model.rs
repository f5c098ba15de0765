use jiff::civil::Date;
use tracing::debug;

use crate::{
    error::MaintenanceError,
    risk_provider::MaintenanceRiskProvider,
    risk_score::RiskScore,
    telemetry::{TelemetrySource, VehicleTelemetry},
};

pub struct TelemetryRiskModelParams {
    /// Kilometers after which the mileage component saturates
    pub km_cycle: f64,
    /// Days after which the service age component saturates
    pub service_interval_days: f64,
    /// Alert count after which the alert component saturates
    pub max_alerts: f64,
    pub km_weight: f64,
    pub days_weight: f64,
    pub alerts_weight: f64,
    pub horizon_days: u32,
}

impl Default for TelemetryRiskModelParams {
    fn default() -> Self {
        Self {
            km_cycle: 40_000.0,
            service_interval_days: 180.0,
            max_alerts: 5.0,
            km_weight: 0.6,
            days_weight: 0.3,
            alerts_weight: 0.1,
            horizon_days: 30,
        }
    }
}

/// Heuristic failure risk from mileage, time since last service and OBD alerts.
pub struct TelemetryRiskModel<S: TelemetrySource> {
    source: S,
    params: TelemetryRiskModelParams,
}

impl<S: TelemetrySource> TelemetryRiskModel<S> {
    pub fn new(source: S, params: TelemetryRiskModelParams) -> Self {
        Self { source, params }
    }

    fn probability(&self, telemetry: &VehicleTelemetry, days_since_service: f64) -> f64 {
        let params = &self.params;

        let km_score = (telemetry.km_since_service / params.km_cycle).min(1.0);
        let days_score = (days_since_service / params.service_interval_days).min(1.0);
        let alerts_score = (f64::from(telemetry.obd_alerts) / params.max_alerts).min(1.0);

        params.km_weight * km_score
            + params.days_weight * days_score
            + params.alerts_weight * alerts_score
    }
}

impl<S: TelemetrySource> MaintenanceRiskProvider for TelemetryRiskModel<S> {
    fn risk_score(&self, vehicle_id: &str, as_of: Date) -> Result<RiskScore, MaintenanceError> {
        let telemetry = self
            .source
            .telemetry(vehicle_id)
            .ok_or_else(|| MaintenanceError::UnknownVehicle(vehicle_id.to_owned()))?;

        if !(telemetry.km_since_service.is_finite() && telemetry.km_since_service >= 0.0) {
            return Err(MaintenanceError::InvalidTelemetry {
                vehicle_id: vehicle_id.to_owned(),
                reason: format!("mileage {} is not valid", telemetry.km_since_service),
            });
        }

        let days_since_service = (as_of - telemetry.last_service_date).get_days();
        if days_since_service < 0 {
            return Err(MaintenanceError::InvalidTelemetry {
                vehicle_id: vehicle_id.to_owned(),
                reason: format!(
                    "last service {} is after {}",
                    telemetry.last_service_date, as_of
                ),
            });
        }

        let probability = self.probability(telemetry, f64::from(days_since_service));
        debug!(
            "Maintenance risk for {}: {:.3} ({} km, {} days, {} alerts)",
            vehicle_id,
            probability,
            telemetry.km_since_service,
            days_since_service,
            telemetry.obd_alerts
        );

        Ok(RiskScore::new(probability, self.params.horizon_days))
    }
}

#[cfg(test)]
mod tests {
    use fxhash::FxHashMap;
    use jiff::civil::date;

    use super::*;
    use crate::risk_score::RiskLevel;

    fn model() -> TelemetryRiskModel<FxHashMap<String, VehicleTelemetry>> {
        let mut telemetry = FxHashMap::default();
        telemetry.insert(
            String::from("van-1"),
            VehicleTelemetry {
                km_since_service: 20_000.0,
                last_service_date: date(2025, 1, 1),
                obd_alerts: 1,
            },
        );
        telemetry.insert(
            String::from("van-2"),
            VehicleTelemetry {
                km_since_service: 80_000.0,
                last_service_date: date(2024, 1, 1),
                obd_alerts: 12,
            },
        );
        TelemetryRiskModel::new(telemetry, TelemetryRiskModelParams::default())
    }

    #[test]
    fn test_risk_score() {
        // 90 days after the last service
        let score = model().risk_score("van-1", date(2025, 4, 1)).unwrap();

        // 0.6 * 0.5 + 0.3 * 0.5 + 0.1 * 0.2
        assert_eq!(score.probability, 0.47);
        assert_eq!(score.horizon_days, 30);
        assert_eq!(score.level(), RiskLevel::Medium);
    }

    #[test]
    fn test_saturated_risk_score() {
        let score = model().risk_score("van-2", date(2025, 4, 1)).unwrap();

        assert_eq!(score.probability, 1.0);
        assert_eq!(score.level(), RiskLevel::High);
    }

    #[test]
    fn test_unknown_vehicle() {
        assert_eq!(
            model().risk_score("truck-9", date(2025, 4, 1)),
            Err(MaintenanceError::UnknownVehicle(String::from("truck-9")))
        );
    }

    #[test]
    fn test_service_date_in_the_future() {
        assert!(matches!(
            model().risk_score("van-1", date(2024, 12, 1)),
            Err(MaintenanceError::InvalidTelemetry { .. })
        ));
    }
}
