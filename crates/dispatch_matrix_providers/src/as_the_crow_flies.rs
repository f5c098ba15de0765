use geo::{Distance, Haversine};

use crate::{
    error::MatrixProviderError, matrix_options::MatrixOptions, matrix_provider::MatrixProvider,
    travel_matrices::TravelMatrices,
};

/// Urban average speed used when no road network is available
pub const DEFAULT_SPEED_KMH: f64 = 35.0;

pub fn as_the_crow_flies_matrices(
    points: &[geo_types::Point],
    speed_kmh: f64,
    toll_per_km: Option<f64>,
) -> TravelMatrices {
    let num_points = points.len();
    let meters_per_second = speed_kmh / 3.6;

    let mut distances: Vec<f64> = vec![0.0; num_points * num_points];
    let mut times: Vec<f64> = vec![0.0; num_points * num_points];

    for (i, from) in points.iter().enumerate() {
        for (j, to) in points.iter().enumerate() {
            if i == j {
                continue;
            }
            let distance = Haversine.distance(*from, *to);
            distances[i * num_points + j] = distance;
            times[i * num_points + j] = distance / meters_per_second;
        }
    }

    let mut matrices = TravelMatrices {
        distances,
        times,
        tolls: None,
    };

    if let Some(rate) = toll_per_km {
        matrices.set_tolls_per_km(rate);
    }

    matrices
}

pub struct AsTheCrowFliesProvider {
    pub speed_kmh: f64,
    pub toll_per_km: Option<f64>,
}

impl Default for AsTheCrowFliesProvider {
    fn default() -> Self {
        Self {
            speed_kmh: DEFAULT_SPEED_KMH,
            toll_per_km: None,
        }
    }
}

impl MatrixProvider for AsTheCrowFliesProvider {
    fn name(&self) -> &'static str {
        "as_the_crow_flies"
    }

    async fn fetch_matrix(
        &self,
        points: &[geo_types::Point],
        _options: &MatrixOptions,
    ) -> Result<TravelMatrices, MatrixProviderError> {
        if !(self.speed_kmh.is_finite() && self.speed_kmh > 0.0) {
            return Err(MatrixProviderError::InvalidRequest(format!(
                "speed must be positive, got {} km/h",
                self.speed_kmh
            )));
        }

        Ok(as_the_crow_flies_matrices(
            points,
            self.speed_kmh,
            self.toll_per_km,
        ))
    }
}
