use std::sync::Arc;

use dispatch_matrix_providers::travel_matrices::TravelMatrices;
use fxhash::FxHashSet;
use rand::RngCore;

use crate::{
    problem::{
        location::Location,
        stop::{Stop, StopBuilder},
        vehicle::{Vehicle, VehicleBuilder, VehicleIdx},
        vehicle_routing_problem::{VehicleRoutingProblem, VehicleRoutingProblemBuilder},
    },
    solver::{
        insertion::Insertion,
        search::SearchOutcome,
        solution::{
            extract::extract_solution, route::WorkingSolutionRoute, route_id::RouteIdx,
            working_solution::WorkingSolution,
        },
    },
};

/// Locations `0.01°` apart, the location of row `r` and column `c` is at index `r * cols + c`.
pub fn create_location_grid(rows: usize, cols: usize) -> Vec<Location> {
    let mut locations = Vec::new();

    for row in 0..rows {
        for col in 0..cols {
            let index = locations.len();
            locations.push(Location::from_lon_lat(
                index.to_string(),
                col as f64 * 0.01,
                row as f64 * 0.01,
            ));
        }
    }

    locations
}

pub fn create_locations(points: Vec<(f64, f64)>) -> Vec<Location> {
    points
        .iter()
        .enumerate()
        .map(|(index, &(lon, lat))| Location::from_lon_lat(index.to_string(), lon, lat))
        .collect()
}

/// Planar distances where `0.01°` is 1000 meters, driven at 10 m/s.
pub fn create_travel_matrices(locations: &[Location]) -> TravelMatrices {
    let mut distances = Vec::with_capacity(locations.len() * locations.len());
    for from in locations {
        for to in locations {
            let distance = (to.lon() - from.lon()).hypot(to.lat() - from.lat()) * 100_000.0;
            distances.push(distance.round());
        }
    }

    TravelMatrices {
        times: distances.iter().map(|distance| distance / 10.0).collect(),
        distances,
        tolls: None,
    }
}

pub fn create_basic_stops(location_ids: Vec<usize>) -> Vec<Stop> {
    location_ids
        .iter()
        .enumerate()
        .map(|(index, &location_id)| {
            let mut builder = StopBuilder::new(index.to_string(), location_id);
            builder.set_demand(1.0);
            builder.build()
        })
        .collect()
}

pub fn create_basic_vehicles(location_ids: Vec<usize>) -> Vec<Vehicle> {
    location_ids
        .iter()
        .enumerate()
        .map(|(index, &location_id)| {
            let mut builder = VehicleBuilder::new(index.to_string(), location_id);
            builder.set_capacity(100.0);
            builder.build()
        })
        .collect()
}

pub fn create_test_problem(
    locations: Vec<Location>,
    stops: Vec<Stop>,
    vehicles: Vec<Vehicle>,
) -> VehicleRoutingProblem {
    let matrices = create_travel_matrices(&locations);
    create_test_problem_with_matrices(locations, stops, vehicles, matrices)
}

pub fn create_test_problem_with_matrices(
    locations: Vec<Location>,
    stops: Vec<Stop>,
    vehicles: Vec<Vehicle>,
    matrices: TravelMatrices,
) -> VehicleRoutingProblem {
    let mut builder = VehicleRoutingProblemBuilder::default();
    builder
        .set_locations(locations)
        .set_stops(stops)
        .set_vehicles(vehicles)
        .set_travel_matrices(matrices);

    builder.build().unwrap()
}

#[derive(Clone)]
pub struct TestRoute {
    pub vehicle_id: usize,
    pub stop_ids: Vec<usize>,
}

pub fn create_test_route(problem: &VehicleRoutingProblem, route: TestRoute) -> WorkingSolutionRoute {
    let mut working_route = WorkingSolutionRoute::empty(VehicleIdx::new(route.vehicle_id));
    for (position, &stop_id) in route.stop_ids.iter().enumerate() {
        working_route.insert(problem, position, stop_id.into());
    }

    working_route
}

/// Stops are inserted in order without any feasibility check, the route of a
/// vehicle is the route with the same index.
pub fn create_test_working_solution(
    problem: Arc<VehicleRoutingProblem>,
    routes: Vec<TestRoute>,
) -> WorkingSolution {
    let mut solution = WorkingSolution::new(problem);

    for route in routes {
        for (position, &stop_id) in route.stop_ids.iter().enumerate() {
            solution.insert(&Insertion {
                route_id: RouteIdx::new(route.vehicle_id),
                stop_id: stop_id.into(),
                position,
            });
        }
    }

    solution
}

/// Capacity, time windows and the coverage of the stops.
pub fn assert_feasible_solution(solution: &WorkingSolution) {
    let problem = solution.problem();
    let mut seen = FxHashSet::default();

    for route in solution.routes() {
        let vehicle = route.vehicle(problem);
        assert!(route.total_load() <= vehicle.capacity());

        for (position, &stop_id) in route.stop_ids().iter().enumerate() {
            assert!(seen.insert(stop_id), "{stop_id} is visited twice");
            assert!(!solution.is_unassigned(stop_id));
            assert!(
                route.arrival_time(position) <= problem.stop(stop_id).time_window().latest()
            );
        }
    }

    assert_eq!(
        seen.len() + solution.unassigned_stops().len(),
        problem.stops().len()
    );

    let outcome = SearchOutcome {
        iterations: 0,
        early_terminated: false,
        duration: jiff::SignedDuration::ZERO,
    };
    assert!(extract_solution(solution, &outcome).is_ok());
}

pub struct MockRng {
    data: Vec<u64>,
    index: usize,
}

impl MockRng {
    pub fn new(data: Vec<u64>) -> Self {
        MockRng { data, index: 0 }
    }
}

impl RngCore for MockRng {
    fn next_u32(&mut self) -> u32 {
        self.next_u64() as u32
    }

    fn next_u64(&mut self) -> u64 {
        let value = self.data[self.index];
        self.index = (self.index + 1) % self.data.len();
        value
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        dst.fill(0);
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::*;

    #[test]
    fn test_mock_rng() {
        let mut rng = MockRng::new(vec![0]);
        assert_eq!(rng.random_range(0..10), 0);
        assert_eq!(rng.random_range(3..10), 3);
    }

    #[test]
    fn test_grid_matrices() {
        let locations = create_location_grid(2, 2);
        let matrices = create_travel_matrices(&locations);

        assert_eq!(matrices.distances[1], 1000.0);
        assert_eq!(matrices.distances[3], 1414.0);
        assert_eq!(matrices.times[3], 141.4);
        assert_eq!(matrices.distances[0], 0.0);
    }
}
