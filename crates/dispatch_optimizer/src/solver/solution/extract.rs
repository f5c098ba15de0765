use jiff::{SignedDuration, Timestamp};
use schemars::JsonSchema;
use serde::Serialize;
use thiserror::Error;

use crate::{
    problem::{
        validation::ValidationWarning, vehicle_routing_problem::VehicleRoutingProblem,
    },
    solver::{score::Score, search::SearchOutcome},
};

use super::{
    route::WorkingSolutionRoute,
    utils::{
        compute_arrival_time, compute_first_arrival_time, compute_vehicle_end,
        compute_vehicle_start, compute_waiting_duration, saturating_add,
    },
    working_solution::WorkingSolution,
};

/// Loads within this tolerance of the capacity are accepted
const LOAD_EPSILON: f64 = 1e-6;

/// A route that can't be driven as planned. Only produced by a solver bug.
#[derive(Debug, Error, PartialEq)]
pub enum InfeasibleRouteError {
    #[error("vehicle {vehicle_id} reaches stop {stop_id} at {arrival}, after its latest arrival {latest}")]
    TimeWindowViolated {
        vehicle_id: String,
        stop_id: String,
        arrival: Timestamp,
        latest: Timestamp,
    },

    #[error("vehicle {vehicle_id} carries {load}, more than its capacity {capacity}")]
    CapacityExceeded {
        vehicle_id: String,
        load: f64,
        capacity: f64,
    },

    #[error("vehicle {vehicle_id} ends its route at {end}, after the end of its shift {latest_end}")]
    ShiftExceeded {
        vehicle_id: String,
        end: Timestamp,
        latest_end: Timestamp,
    },
}

#[derive(Serialize, JsonSchema, Debug, Clone, PartialEq)]
pub struct SolutionStop {
    pub stop_id: String,
    pub location_id: String,
    pub arrival_time: Timestamp,
    pub waiting_duration: SignedDuration,
    pub service_start_time: Timestamp,
    pub departure_time: Timestamp,
    /// Demand delivered since the start of the route, this stop included
    pub load: f64,
}

#[derive(Serialize, JsonSchema, Debug, Clone, PartialEq)]
pub struct SolutionRoute {
    pub vehicle_id: String,
    /// Departure from the start depot, absent for an unused vehicle
    pub start_time: Option<Timestamp>,
    pub end_time: Option<Timestamp>,
    pub duration: SignedDuration,
    pub waiting_duration: SignedDuration,
    pub distance: f64,
    pub toll: f64,
    pub cost: f64,
    pub load: f64,
    pub stops: Vec<SolutionStop>,
}

#[derive(Serialize, JsonSchema, Debug, Clone, PartialEq)]
pub struct Solution {
    pub routes: Vec<SolutionRoute>,
    pub unassigned_stops: Vec<String>,
    pub total_cost: f64,
    pub total_distance: f64,
    pub total_duration: SignedDuration,
    pub total_toll: f64,
    pub score: Score,
    pub iterations: usize,
    pub early_terminated: bool,
    pub warnings: Vec<ValidationWarning>,
}

impl Solution {
    pub fn assigned_stops_count(&self) -> usize {
        self.routes.iter().map(|route| route.stops.len()).sum()
    }
}

/// Replays every route from its start depot and builds the output plan.
pub fn extract_solution(
    solution: &WorkingSolution,
    outcome: &SearchOutcome,
) -> Result<Solution, InfeasibleRouteError> {
    let problem = solution.problem();

    let routes = solution
        .routes()
        .iter()
        .map(|route| extract_route(problem, route))
        .collect::<Result<Vec<_>, _>>()?;

    let unassigned_stops = solution
        .sorted_unassigned_stops()
        .into_iter()
        .map(|stop_id| problem.stop(stop_id).external_id().to_owned())
        .collect::<Vec<_>>();

    let total_cost = routes.iter().map(|route| route.cost).sum::<f64>();
    let total_distance = routes.iter().map(|route| route.distance).sum::<f64>();

    Ok(Solution {
        total_duration: routes
            .iter()
            .fold(SignedDuration::ZERO, |total, route| total + route.duration),
        total_toll: routes.iter().map(|route| route.toll).sum(),
        score: Score::new(unassigned_stops.len(), total_cost, total_distance),
        total_cost,
        total_distance,
        unassigned_stops,
        routes,
        iterations: outcome.iterations,
        early_terminated: outcome.early_terminated,
        warnings: problem.warnings().to_vec(),
    })
}

fn extract_route(
    problem: &VehicleRoutingProblem,
    route: &WorkingSolutionRoute,
) -> Result<SolutionRoute, InfeasibleRouteError> {
    let vehicle = route.vehicle(problem);
    let mut extracted = SolutionRoute {
        vehicle_id: vehicle.external_id().to_owned(),
        start_time: None,
        end_time: None,
        duration: SignedDuration::ZERO,
        waiting_duration: SignedDuration::ZERO,
        distance: 0.0,
        toll: 0.0,
        cost: 0.0,
        load: 0.0,
        stops: Vec::with_capacity(route.len()),
    };

    let Some(&first_stop_id) = route.stop_ids().first() else {
        return Ok(extracted);
    };

    let first_arrival_time =
        compute_first_arrival_time(problem, vehicle, problem.stop(first_stop_id));
    let start_time = compute_vehicle_start(
        problem,
        vehicle,
        problem.stop(first_stop_id),
        first_arrival_time,
    );

    let mut previous_location_id = vehicle.start_location_id();
    let mut previous_departure_time = start_time;

    for &stop_id in route.stop_ids() {
        let stop = problem.stop(stop_id);
        let location_id = stop.location_id();

        let arrival_time = if extracted.stops.is_empty() {
            first_arrival_time
        } else {
            compute_arrival_time(problem, previous_location_id, previous_departure_time, stop)
        };

        if !stop.time_window().is_satisfied(arrival_time) {
            return Err(InfeasibleRouteError::TimeWindowViolated {
                vehicle_id: extracted.vehicle_id,
                stop_id: stop.external_id().to_owned(),
                arrival: arrival_time,
                latest: stop.time_window().latest(),
            });
        }

        extracted.load += stop.demand();
        if extracted.load > vehicle.capacity() + LOAD_EPSILON {
            return Err(InfeasibleRouteError::CapacityExceeded {
                vehicle_id: extracted.vehicle_id,
                load: extracted.load,
                capacity: vehicle.capacity(),
            });
        }

        let waiting_duration = compute_waiting_duration(stop, arrival_time);
        let service_start_time = saturating_add(arrival_time, waiting_duration);
        let departure_time = saturating_add(service_start_time, stop.duration());

        extracted.distance += problem.travel_distance(previous_location_id, location_id);
        extracted.toll += problem.travel_toll(previous_location_id, location_id);
        extracted.cost += problem.travel_cost(previous_location_id, location_id);
        extracted.waiting_duration += waiting_duration;

        extracted.stops.push(SolutionStop {
            stop_id: stop.external_id().to_owned(),
            location_id: problem.location(location_id).external_id().to_owned(),
            arrival_time,
            waiting_duration,
            service_start_time,
            departure_time,
            load: extracted.load,
        });

        previous_location_id = location_id;
        previous_departure_time = departure_time;
    }

    if let Some(end_location_id) = vehicle.end_location_id() {
        extracted.distance += problem.travel_distance(previous_location_id, end_location_id);
        extracted.toll += problem.travel_toll(previous_location_id, end_location_id);
        extracted.cost += problem.travel_cost(previous_location_id, end_location_id);
    }

    let end_time = compute_vehicle_end(
        problem,
        vehicle,
        previous_location_id,
        previous_departure_time,
    );
    if let Some(latest_end) = vehicle.latest_end_time()
        && end_time > latest_end
    {
        return Err(InfeasibleRouteError::ShiftExceeded {
            vehicle_id: extracted.vehicle_id,
            end: end_time,
            latest_end,
        });
    }

    extracted.start_time = Some(start_time);
    extracted.end_time = Some(end_time);
    extracted.duration = end_time.duration_since(start_time);

    Ok(extracted)
}
