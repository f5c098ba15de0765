use std::cmp::Ordering;

use jiff::SignedDuration;
use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::{
    problem::{
        stop::StopIdx,
        travel_cost_matrix::{Cost, Distance},
    },
    solver::{
        insertion::{Insertion, for_each_route_insertion},
        solution::{route_id::RouteIdx, working_solution::WorkingSolution},
    },
};

#[derive(Debug, Clone, Copy)]
pub struct InsertionCandidate {
    pub insertion: Insertion,
    pub cost_delta: Cost,
    pub distance_delta: Distance,
    /// Delay the arrival at the inserted stop could absorb
    pub slack: SignedDuration,
}

impl InsertionCandidate {
    /// Cheapest cost first, then the largest slack, then the shortest detour.
    /// Remaining ties are broken on indices so the order is total.
    pub fn compare(&self, other: &InsertionCandidate) -> Ordering {
        self.cost_delta
            .total_cmp(&other.cost_delta)
            .then_with(|| other.slack.cmp(&self.slack))
            .then_with(|| self.distance_delta.total_cmp(&other.distance_delta))
            .then_with(|| self.insertion.stop_id.cmp(&other.insertion.stop_id))
            .then_with(|| self.insertion.route_id.cmp(&other.insertion.route_id))
            .then_with(|| self.insertion.position.cmp(&other.insertion.position))
    }
}

/// Cheapest feasible position of `stop_id` in the route, if any.
pub fn best_route_insertion(
    solution: &WorkingSolution,
    route_id: RouteIdx,
    stop_id: StopIdx,
) -> Option<InsertionCandidate> {
    let problem = solution.problem();
    let route = solution.route(route_id);

    let mut best: Option<InsertionCandidate> = None;
    for_each_route_insertion(solution, route_id, stop_id, |insertion| {
        let position = insertion.position;
        if !route.is_valid_change(problem, std::iter::once(stop_id), position, position) {
            return;
        }

        let (cost_delta, distance_delta) = route.insertion_delta(problem, stop_id, position);
        let candidate = InsertionCandidate {
            insertion,
            cost_delta,
            distance_delta,
            slack: route.insertion_slack(problem, stop_id, position),
        };

        if best
            .as_ref()
            .is_none_or(|best| candidate.compare(best) == Ordering::Less)
        {
            best = Some(candidate);
        }
    });

    best
}

/// Global cheapest insertion: inserts the cheapest feasible (stop, route, position)
/// until no unassigned stop fits anywhere.
///
/// The best insertion of every unassigned stop in every route is kept between rounds,
/// only the route that received a stop is evaluated again.
#[derive(Default)]
pub struct BestInsertion;

impl BestInsertion {
    #[instrument(skip_all, level = "debug")]
    pub fn insert_stops(&self, solution: &mut WorkingSolution) {
        let mut unassigned_stops = solution.sorted_unassigned_stops();
        let num_routes = solution.routes().len();

        let mut candidates: Vec<Vec<Option<InsertionCandidate>>> = {
            let solution = &*solution;
            unassigned_stops
                .par_iter()
                .map(|&stop_id| {
                    (0..num_routes)
                        .map(|route_index| {
                            best_route_insertion(solution, RouteIdx::new(route_index), stop_id)
                        })
                        .collect()
                })
                .collect()
        };

        loop {
            let best = candidates
                .iter()
                .enumerate()
                .flat_map(|(index, routes)| routes.iter().flatten().map(move |c| (index, *c)))
                .min_by(|(_, a), (_, b)| a.compare(b));

            let Some((index, candidate)) = best else {
                break;
            };

            solution.insert(&candidate.insertion);
            unassigned_stops.remove(index);
            candidates.remove(index);

            let route_id = candidate.insertion.route_id;
            let solution = &*solution;
            candidates
                .par_iter_mut()
                .zip(unassigned_stops.par_iter())
                .for_each(|(routes, &stop_id)| {
                    routes[route_id.get()] = best_route_insertion(solution, route_id, stop_id);
                });
        }

        if !unassigned_stops.is_empty() {
            debug!("{} stops could not be inserted", unassigned_stops.len());
        }
    }

    pub fn recreate_solution(&self, solution: &mut WorkingSolution) {
        self.insert_stops(solution);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use jiff::{SignedDuration, Timestamp};

    use super::*;
    use crate::{
        problem::{
            stop::StopBuilder, time_window::TimeWindowBuilder, vehicle::VehicleBuilder,
        },
        test_utils::{self, TestRoute},
    };

    #[test]
    fn test_inserts_cheapest_first() {
        //
        //  (0) depot --- (1) --- (2) --- (3)
        //
        let problem = Arc::new(test_utils::create_test_problem(
            test_utils::create_location_grid(1, 4),
            test_utils::create_basic_stops(vec![3, 1, 2]),
            test_utils::create_basic_vehicles(vec![0]),
        ));
        let mut solution = WorkingSolution::new(problem);

        BestInsertion.insert_stops(&mut solution);

        assert!(!solution.has_unassigned());
        let route = solution.route(RouteIdx::new(0));
        assert_eq!(route.cost(), 600.0);
        assert_eq!(route.distance(), 6000.0);
    }

    #[test]
    fn test_capacity_leaves_stops_unassigned() {
        let mut vehicle = VehicleBuilder::new("v", 0);
        vehicle.set_capacity(3.0);

        let mut stop = StopBuilder::new("big", 1);
        stop.set_demand(5.0);

        let problem = Arc::new(test_utils::create_test_problem(
            test_utils::create_location_grid(1, 2),
            vec![stop.build()],
            vec![vehicle.build()],
        ));
        let mut solution = WorkingSolution::new(problem);

        BestInsertion.insert_stops(&mut solution);

        assert_eq!(solution.sorted_unassigned_stops(), vec![StopIdx::new(0)]);
        assert!(solution.route(RouteIdx::new(0)).is_empty());
    }

    #[test]
    fn test_prefers_largest_slack_on_ties() {
        //
        //  (0) (1) (2)
        //   depots at 0 and 2, one stop at 1 reachable at the same cost from both
        //
        let locations = test_utils::create_location_grid(1, 3);
        let mut first = VehicleBuilder::new("first", 0);
        first.set_capacity(10.0).set_return(false);
        let mut second = VehicleBuilder::new("second", 2);
        second.set_capacity(10.0).set_return(false).set_shift(
            crate::problem::vehicle::VehicleShift {
                earliest_start: None,
                latest_end: Some(Timestamp::UNIX_EPOCH + SignedDuration::from_secs(150)),
            },
        );

        let problem = Arc::new(test_utils::create_test_problem(
            locations,
            test_utils::create_basic_stops(vec![1]),
            vec![second.build(), first.build()],
        ));
        let mut solution = WorkingSolution::new(problem);

        BestInsertion.insert_stops(&mut solution);

        // The unconstrained vehicle leaves more slack
        assert!(solution.route(RouteIdx::new(0)).is_empty());
        assert_eq!(
            solution.route(RouteIdx::new(1)).stop_ids(),
            &[StopIdx::new(0)]
        );
    }

    #[test]
    fn test_slack_breaks_cost_ties_before_distance() {
        let candidate = |position: usize, distance_delta: f64, slack_secs: i64| {
            InsertionCandidate {
                insertion: Insertion {
                    route_id: RouteIdx::new(0),
                    stop_id: StopIdx::new(0),
                    position,
                },
                cost_delta: 100.0,
                distance_delta,
                slack: SignedDuration::from_secs(slack_secs),
            }
        };

        let short_and_tight = candidate(0, 500.0, 10);
        let long_and_loose = candidate(1, 2000.0, 3600);

        assert_eq!(long_and_loose.compare(&short_and_tight), Ordering::Less);
        assert_eq!(short_and_tight.compare(&long_and_loose), Ordering::Greater);

        // Distance only decides when the slack is the same
        let long_and_tight = candidate(2, 2000.0, 10);
        assert_eq!(short_and_tight.compare(&long_and_tight), Ordering::Less);

        let mut cheaper = candidate(3, 5000.0, 0);
        cheaper.cost_delta = 99.0;
        assert_eq!(cheaper.compare(&long_and_loose), Ordering::Less);
    }

    #[test]
    fn test_time_windows_are_respected() {
        let epoch = Timestamp::UNIX_EPOCH;
        let mut stops = test_utils::create_basic_stops(vec![1, 3]);
        let mut tight = StopBuilder::new("tight", 2);
        tight.set_demand(1.0).set_time_window(
            TimeWindowBuilder::default()
                .with_end(epoch + SignedDuration::from_secs(150))
                .build(),
        );
        stops.push(tight.build());

        let problem = Arc::new(test_utils::create_test_problem(
            test_utils::create_location_grid(1, 4),
            stops,
            test_utils::create_basic_vehicles(vec![0]),
        ));
        let mut solution = test_utils::create_test_working_solution(
            Arc::clone(&problem),
            vec![TestRoute {
                vehicle_id: 0,
                stop_ids: vec![0, 1],
            }],
        );

        // The stop at 2 can't be reached before 200s
        BestInsertion.insert_stops(&mut solution);
        assert_eq!(solution.sorted_unassigned_stops(), vec![StopIdx::new(2)]);
    }
}
