use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, Copy, PartialEq)]
pub struct RiskScore {
    /// Probability of a failure within the horizon, in `[0, 1]`
    pub probability: f64,
    pub horizon_days: u32,
}

impl RiskScore {
    pub fn new(probability: f64, horizon_days: u32) -> Self {
        Self {
            probability: round_probability(probability.clamp(0.0, 1.0)),
            horizon_days,
        }
    }

    pub fn level(&self) -> RiskLevel {
        if self.probability < 0.33 {
            RiskLevel::Low
        } else if self.probability < 0.66 {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }
}

fn round_probability(probability: f64) -> f64 {
    (probability * 1000.0).round() / 1000.0
}
