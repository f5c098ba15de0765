use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Weights of the arc cost `time * seconds + distance * meters + toll * toll`.
#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct CostWeights {
    /// Cost per second of travel
    pub time: f64,
    /// Cost per meter of travel
    pub distance: f64,
    /// Cost per unit of toll
    pub toll: f64,
}

impl Default for CostWeights {
    fn default() -> Self {
        Self {
            time: 1.0,
            distance: 0.0,
            toll: 1.0,
        }
    }
}

#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    MinTime,
    MinDistance,
    MinCost,
}

impl CostWeights {
    pub fn for_objective(objective: Objective) -> Self {
        match objective {
            Objective::MinTime => CostWeights {
                time: 1.0,
                distance: 0.0,
                toll: 0.0,
            },
            Objective::MinDistance => CostWeights {
                time: 0.0,
                distance: 1.0,
                toll: 0.0,
            },
            Objective::MinCost => CostWeights::default(),
        }
    }

    pub fn is_valid(&self) -> bool {
        [self.time, self.distance, self.toll]
            .iter()
            .all(|weight| weight.is_finite() && *weight >= 0.0)
    }

    pub fn cost(&self, seconds: f64, meters: f64, toll: f64) -> f64 {
        self.time * seconds + self.distance * meters + self.toll * toll
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cost() {
        let weights = CostWeights {
            time: 2.0,
            distance: 0.5,
            toll: 10.0,
        };

        assert_eq!(weights.cost(60.0, 1000.0, 1.5), 120.0 + 500.0 + 15.0);
        assert_eq!(CostWeights::default().cost(60.0, 1000.0, 1.5), 61.5);
    }

    #[test]
    fn test_partial_deserialize() {
        let weights: CostWeights = serde_json::from_str(r#"{ "distance": 0.1 }"#).unwrap();

        assert_eq!(weights.time, 1.0);
        assert_eq!(weights.distance, 0.1);
        assert_eq!(weights.toll, 1.0);
    }

    #[test]
    fn test_objective_presets() {
        let min_distance = CostWeights::for_objective(Objective::MinDistance);
        assert_eq!(min_distance.cost(60.0, 10.0, 3.0), 10.0);

        let min_time = CostWeights::for_objective(Objective::MinTime);
        assert_eq!(min_time.cost(60.0, 10.0, 3.0), 60.0);

        let negative = CostWeights {
            time: -1.0,
            distance: 0.0,
            toll: 0.0,
        };
        assert!(!negative.is_valid());
    }
}
