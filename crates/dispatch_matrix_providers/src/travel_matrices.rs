use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::MatrixProviderError;

/// TravelMatrices holds the travel distance, time, and toll matrices.
/// Stored as flat vectors, `index = from * num_locations + to`.
#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, PartialEq)]
pub struct TravelMatrices {
    /// Distances in meters
    pub distances: Vec<f64>,

    /// Travel times in seconds
    pub times: Vec<f64>,

    // Most providers don't know about tolls
    #[serde(default)]
    pub tolls: Option<Vec<f64>>,
}

impl TravelMatrices {
    pub fn from_rows(
        distances: Vec<Vec<f64>>,
        times: Vec<Vec<f64>>,
        tolls: Option<Vec<Vec<f64>>>,
    ) -> Self {
        TravelMatrices {
            distances: distances.into_iter().flatten().collect(),
            times: times.into_iter().flatten().collect(),
            tolls: tolls.map(|tolls| tolls.into_iter().flatten().collect()),
        }
    }

    /// Estimates tolls from distances when the provider has no fare data.
    pub fn set_tolls_per_km(&mut self, toll_per_km: f64) {
        self.tolls = Some(
            self.distances
                .iter()
                .map(|meters| meters / 1000.0 * toll_per_km)
                .collect(),
        );
    }

    pub fn num_locations(&self) -> usize {
        self.distances.len().isqrt()
    }

    /// Checks the matrices are complete for `num_locations` points.
    ///
    /// A cell is missing when it is absent, not finite or negative. Missing cells
    /// are reported instead of being replaced by zeros.
    pub fn validate(
        &self,
        provider: &'static str,
        num_locations: usize,
    ) -> Result<(), MatrixProviderError> {
        let total = num_locations * num_locations;
        let tolls = self.tolls.as_deref();

        if let Some(tolls) = tolls
            && tolls.len() != total
        {
            return Err(MatrixProviderError::InvalidRequest(format!(
                "toll matrix has {} cells, expected {}",
                tolls.len(),
                total
            )));
        }

        let is_valid = |values: &[f64], index: usize| {
            values
                .get(index)
                .is_some_and(|value| value.is_finite() && *value >= 0.0)
        };

        let mut missing = vec![];
        for from in 0..num_locations {
            for to in 0..num_locations {
                let index = from * num_locations + to;
                let valid = is_valid(&self.distances, index)
                    && is_valid(&self.times, index)
                    && tolls.is_none_or(|tolls| is_valid(tolls, index));

                if !valid {
                    missing.push((from, to));
                }
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(MatrixProviderError::PartialCoverage {
                provider,
                missing,
                total,
            })
        }
    }
}

impl std::hash::Hash for TravelMatrices {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        for d in &self.distances {
            state.write_u64(d.to_bits());
        }
        for t in &self.times {
            state.write_u64(t.to_bits());
        }
        if let Some(tolls) = &self.tolls {
            for c in tolls {
                state.write_u64(c.to_bits());
            }
        } else {
            state.write_u8(0);
        }
    }
}
