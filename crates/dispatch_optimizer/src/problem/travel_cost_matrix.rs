use dispatch_matrix_providers::travel_matrices::TravelMatrices;
use jiff::SignedDuration;

use super::{cost_weights::CostWeights, location::LocationIdx};

pub type Distance = f64;
pub type Time = f64;
pub type Cost = f64;

/// Travel matrices of a problem with the weighted arc costs precomputed.
///
/// Flat storage, the value for a pair of locations is at `from * num_locations + to`.
/// Travelling from a location to itself is always free.
pub struct TravelCostMatrix {
    distances: Vec<Distance>,
    times: Vec<Time>,
    tolls: Vec<f64>,
    costs: Vec<Cost>,
    num_locations: usize,
    is_symmetric: bool,
}

fn is_flat_matrix_symmetric(matrix: &[f64], num_locations: usize) -> bool {
    (0..num_locations).all(|i| {
        (i + 1..num_locations)
            .all(|j| matrix[i * num_locations + j] == matrix[j * num_locations + i])
    })
}

impl TravelCostMatrix {
    /// Expects matrices that passed `TravelMatrices::validate`.
    pub fn new(matrices: TravelMatrices, weights: &CostWeights) -> Self {
        let num_locations = matrices.num_locations();
        let tolls = matrices
            .tolls
            .unwrap_or_else(|| vec![0.0; matrices.distances.len()]);

        let costs = matrices
            .times
            .iter()
            .zip(&matrices.distances)
            .zip(&tolls)
            .map(|((&seconds, &meters), &toll)| weights.cost(seconds, meters, toll))
            .collect::<Vec<_>>();

        let is_symmetric = is_flat_matrix_symmetric(&costs, num_locations)
            && is_flat_matrix_symmetric(&matrices.distances, num_locations);

        TravelCostMatrix {
            distances: matrices.distances,
            times: matrices.times,
            tolls,
            costs,
            num_locations,
            is_symmetric,
        }
    }

    #[inline(always)]
    fn index(&self, from: LocationIdx, to: LocationIdx) -> usize {
        from.get() * self.num_locations + to.get()
    }

    #[inline(always)]
    pub fn travel_distance(&self, from: LocationIdx, to: LocationIdx) -> Distance {
        if from == to {
            return 0.0;
        }

        self.distances[self.index(from, to)]
    }

    #[inline(always)]
    pub fn travel_time(&self, from: LocationIdx, to: LocationIdx) -> SignedDuration {
        if from == to {
            return SignedDuration::ZERO;
        }

        SignedDuration::try_from_secs_f64(self.times[self.index(from, to)])
            .unwrap_or(SignedDuration::MAX)
    }

    #[inline(always)]
    pub fn travel_toll(&self, from: LocationIdx, to: LocationIdx) -> f64 {
        if from == to {
            return 0.0;
        }

        self.tolls[self.index(from, to)]
    }

    #[inline(always)]
    pub fn travel_cost(&self, from: LocationIdx, to: LocationIdx) -> Cost {
        if from == to {
            return 0.0;
        }

        self.costs[self.index(from, to)]
    }

    pub fn num_locations(&self) -> usize {
        self.num_locations
    }

    pub fn is_symmetric(&self) -> bool {
        self.is_symmetric
    }
}
