use std::sync::Arc;

use fxhash::FxHashSet;

use crate::{
    problem::{
        stop::StopIdx,
        travel_cost_matrix::{Cost, Distance},
        vehicle_routing_problem::VehicleRoutingProblem,
    },
    solver::{
        insertion::Insertion,
        score::Score,
        solution::{route::WorkingSolutionRoute, route_id::RouteIdx},
    },
    utils::enumerate_idx::EnumerateIdx,
};

#[derive(Clone)]
pub struct WorkingSolution {
    problem: Arc<VehicleRoutingProblem>,
    routes: Vec<WorkingSolutionRoute>,
    unassigned_stops: FxHashSet<StopIdx>,
}

impl WorkingSolution {
    /// One empty route per vehicle, every stop unassigned.
    pub fn new(problem: Arc<VehicleRoutingProblem>) -> Self {
        let routes = problem
            .vehicles()
            .iter()
            .enumerate_idx()
            .map(|(vehicle_id, _)| WorkingSolutionRoute::empty(vehicle_id))
            .collect();
        let unassigned_stops = (0..problem.stops().len()).map(StopIdx::new).collect();

        WorkingSolution {
            problem,
            routes,
            unassigned_stops,
        }
    }

    pub fn problem(&self) -> &VehicleRoutingProblem {
        self.problem.as_ref()
    }

    pub fn routes(&self) -> &[WorkingSolutionRoute] {
        &self.routes
    }

    pub fn route(&self, route_id: RouteIdx) -> &WorkingSolutionRoute {
        &self.routes[route_id]
    }

    pub fn route_mut(&mut self, route_id: RouteIdx) -> &mut WorkingSolutionRoute {
        &mut self.routes[route_id]
    }

    pub fn non_empty_routes_iter(&self) -> impl Iterator<Item = &WorkingSolutionRoute> {
        self.routes.iter().filter(|route| !route.is_empty())
    }

    pub fn random_non_empty_route<R>(&self, rng: &mut R) -> Option<RouteIdx>
    where
        R: rand::Rng,
    {
        let non_empty_routes = self
            .routes
            .iter()
            .enumerate_idx()
            .filter(|(_, route)| !route.is_empty())
            .map(|(route_id, _)| route_id)
            .collect::<Vec<RouteIdx>>();

        if non_empty_routes.is_empty() {
            None
        } else {
            Some(non_empty_routes[rng.random_range(0..non_empty_routes.len())])
        }
    }

    pub fn unassigned_stops(&self) -> &FxHashSet<StopIdx> {
        &self.unassigned_stops
    }

    /// Unassigned stops in index order.
    pub fn sorted_unassigned_stops(&self) -> Vec<StopIdx> {
        let mut unassigned_stops = self.unassigned_stops.iter().copied().collect::<Vec<_>>();
        unassigned_stops.sort_unstable();
        unassigned_stops
    }

    pub fn is_unassigned(&self, stop_id: StopIdx) -> bool {
        self.unassigned_stops.contains(&stop_id)
    }

    pub fn has_unassigned(&self) -> bool {
        !self.unassigned_stops.is_empty()
    }

    pub fn route_of_stop(&self, stop_id: StopIdx) -> Option<RouteIdx> {
        self.routes
            .iter()
            .enumerate_idx()
            .find(|(_, route)| route.contains_stop(stop_id))
            .map(|(route_id, _)| route_id)
    }

    pub fn insert(&mut self, insertion: &Insertion) {
        let route = &mut self.routes[insertion.route_id];
        route.insert(&self.problem, insertion.position, insertion.stop_id);
        self.unassigned_stops.remove(&insertion.stop_id);
    }

    pub fn remove_stop(&mut self, stop_id: StopIdx) -> bool {
        let removed = self
            .routes
            .iter_mut()
            .any(|route| route.remove_stop(&self.problem, stop_id));

        if removed {
            self.unassigned_stops.insert(stop_id);
        }

        removed
    }

    /// Replaces the `[start, end)` positions of a route with already assigned stops.
    pub fn replace_route_stops(
        &mut self,
        route_id: RouteIdx,
        stop_ids: &[StopIdx],
        start: usize,
        end: usize,
    ) {
        self.routes[route_id].replace_stops(&self.problem, stop_ids, start, end);
    }

    pub fn total_cost(&self) -> Cost {
        self.routes.iter().map(|route| route.cost()).sum()
    }

    pub fn distance(&self) -> Distance {
        self.routes.iter().map(|route| route.distance()).sum()
    }

    pub fn score(&self) -> Score {
        Score::new(
            self.unassigned_stops.len(),
            self.total_cost(),
            self.distance(),
        )
    }

    /// Same stops in the same order on every route
    pub fn is_identical(&self, other: &WorkingSolution) -> bool {
        self.routes.len() == other.routes.len()
            && self
                .routes
                .iter()
                .zip(&other.routes)
                .all(|(route, other_route)| route.stop_ids() == other_route.stop_ids())
    }
}
