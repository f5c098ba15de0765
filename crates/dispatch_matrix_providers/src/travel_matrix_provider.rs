use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{as_the_crow_flies::DEFAULT_SPEED_KMH, travel_matrices::TravelMatrices};

fn default_speed_kmh() -> f64 {
    DEFAULT_SPEED_KMH
}

#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum TravelMatrixProvider {
    /// https://developers.google.com/maps/documentation/distance-matrix
    GoogleDistanceMatrix {
        /// The Distance Matrix API does not return fares, tolls are estimated per km when set
        #[serde(default)]
        toll_per_km: Option<f64>,
    },
    AsTheCrowFlies {
        #[serde(default = "default_speed_kmh")]
        speed_kmh: f64,
        #[serde(default)]
        toll_per_km: Option<f64>,
    },
    Custom {
        matrices: TravelMatrices,
    },
}

impl TravelMatrixProvider {
    pub fn name(&self) -> &'static str {
        match self {
            TravelMatrixProvider::GoogleDistanceMatrix { .. } => "google",
            TravelMatrixProvider::AsTheCrowFlies { .. } => "as_the_crow_flies",
            TravelMatrixProvider::Custom { .. } => "custom",
        }
    }
}

impl Default for TravelMatrixProvider {
    fn default() -> Self {
        TravelMatrixProvider::AsTheCrowFlies {
            speed_kmh: DEFAULT_SPEED_KMH,
            toll_per_km: None,
        }
    }
}

fn hash_optional_f64<H: std::hash::Hasher>(value: Option<f64>, state: &mut H) {
    match value {
        Some(value) => {
            state.write_u8(1);
            state.write_u64(value.to_bits());
        }
        None => state.write_u8(0),
    }
}

impl std::hash::Hash for TravelMatrixProvider {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            TravelMatrixProvider::GoogleDistanceMatrix { toll_per_km } => {
                state.write_u8(0);
                hash_optional_f64(*toll_per_km, state);
            }
            TravelMatrixProvider::AsTheCrowFlies {
                speed_kmh,
                toll_per_km,
            } => {
                state.write_u8(1);
                state.write_u64(speed_kmh.to_bits());
                hash_optional_f64(*toll_per_km, state);
            }
            TravelMatrixProvider::Custom { matrices } => {
                state.write_u8(2);
                matrices.hash(state);
            }
        }
    }
}
