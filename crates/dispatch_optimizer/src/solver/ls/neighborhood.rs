use crate::problem::{stop::StopIdx, vehicle_routing_problem::VehicleRoutingProblem};

/// The `k` nearest stops of every stop, used to prune inter-route moves.
pub struct Neighborhood {
    neighbors: Vec<Vec<StopIdx>>,
}

impl Neighborhood {
    pub fn new(problem: &VehicleRoutingProblem, k: usize) -> Self {
        let neighbors = (0..problem.stops().len())
            .map(StopIdx::new)
            .map(|stop_id| problem.nearest_stops(stop_id).take(k).collect())
            .collect();

        Neighborhood { neighbors }
    }

    pub fn neighbors(&self, stop_id: StopIdx) -> &[StopIdx] {
        &self.neighbors[stop_id.get()]
    }
}
