use crate::{
    problem::{location::LocationIdx, vehicle_routing_problem::VehicleRoutingProblem},
    solver::{
        ls::{
            r#move::{LocalSearchDelta, LocalSearchOperator, arcs_delta},
            neighborhood::Neighborhood,
        },
        solution::{
            route::WorkingSolutionRoute, route_id::RouteIdx, working_solution::WorkingSolution,
        },
    },
};

/// **Inter-Route 2-Opt* (Two-Opt Star)**
///
/// Exchanges the tails of two routes. The first route is cut before `first_from`,
/// the second one before `second_from`.
///
/// ```text
/// BEFORE (Routes Cross):
///    R1: [Head A] --x--> [Tail A]
///                    \ /
///                     X
///                    / \
///    R2: [Head B] --x--> [Tail B]
///
/// AFTER:
///    R1: [Head A] -----> [Tail B]
///
///    R2: [Head B] -----> [Tail A]
/// ```
///
/// The tails keep their direction, each one now ends at the depot of its new vehicle.
#[derive(Debug, Clone)]
pub struct InterTwoOptStarOperator {
    params: InterTwoOptStarOperatorParams,
}

#[derive(Debug, Clone)]
pub struct InterTwoOptStarOperatorParams {
    pub first_route_id: RouteIdx,
    pub second_route_id: RouteIdx,
    pub first_from: usize,
    pub second_from: usize,
}

/// Arcs joining the head of a route (up to `head_len` stops) with a tail and the end depot.
fn junction_delta(
    problem: &VehicleRoutingProblem,
    route: &WorkingSolutionRoute,
    head_len: usize,
    tail: Option<(LocationIdx, LocationIdx)>,
) -> LocalSearchDelta {
    let head_last = route.previous_location_id(problem, head_len);
    let end = route.vehicle(problem).end_location_id();

    match tail {
        Some((first, last)) => arcs_delta(problem, &[(head_last, Some(first)), (last, end)]),
        // An empty route costs nothing
        None if head_len == 0 => LocalSearchDelta::ZERO,
        None => arcs_delta(problem, &[(head_last, end)]),
    }
}

fn tail_bounds(
    problem: &VehicleRoutingProblem,
    route: &WorkingSolutionRoute,
    from: usize,
) -> Option<(LocationIdx, LocationIdx)> {
    (from < route.len()).then(|| {
        (
            route.location_id(problem, from),
            route.location_id(problem, route.len() - 1),
        )
    })
}

impl InterTwoOptStarOperator {
    pub fn new(params: InterTwoOptStarOperatorParams) -> Self {
        debug_assert!(params.first_route_id != params.second_route_id);
        Self { params }
    }
}

impl LocalSearchOperator for InterTwoOptStarOperator {
    fn generate_moves<C>(
        solution: &WorkingSolution,
        neighborhood: &Neighborhood,
        (r1, r2): (RouteIdx, RouteIdx),
        mut consumer: C,
    ) where
        C: FnMut(Self),
    {
        if r1 >= r2 {
            return;
        }

        let first_route = solution.route(r1);
        let second_route = solution.route(r2);
        let (first_len, second_len) = (first_route.len(), second_route.len());

        let mut create = |first_from, second_from| {
            // Swapping whole routes or exchanging two empty tails changes nothing
            if (first_from == 0 && second_from == 0)
                || (first_from == first_len && second_from == second_len)
            {
                return;
            }

            consumer(InterTwoOptStarOperator::new(
                InterTwoOptStarOperatorParams {
                    first_route_id: r1,
                    second_route_id: r2,
                    first_from,
                    second_from,
                },
            ));
        };

        // Hand over a tail to an idle vehicle
        if second_route.is_empty() {
            (1..first_len).for_each(|first_from| create(first_from, 0));
        }
        if first_route.is_empty() {
            (1..second_len).for_each(|second_from| create(0, second_from));
        }

        // Connect a stop to one of its nearest stops in the other route
        for first_from in 1..=first_len {
            for &neighbor in neighborhood.neighbors(first_route.stop_id(first_from - 1)) {
                if let Some(second_from) = second_route.stop_position(neighbor) {
                    create(first_from, second_from);
                }
            }
        }
        for second_from in 1..=second_len {
            for &neighbor in neighborhood.neighbors(second_route.stop_id(second_from - 1)) {
                if let Some(first_from) = first_route.stop_position(neighbor) {
                    create(first_from, second_from);
                }
            }
        }
    }

    fn delta(&self, solution: &WorkingSolution) -> LocalSearchDelta {
        let problem = solution.problem();
        let first_route = solution.route(self.params.first_route_id);
        let second_route = solution.route(self.params.second_route_id);
        let (first_from, second_from) = (self.params.first_from, self.params.second_from);

        let first_tail = tail_bounds(problem, first_route, first_from);
        let second_tail = tail_bounds(problem, second_route, second_from);

        let current = junction_delta(problem, first_route, first_from, first_tail)
            + junction_delta(problem, second_route, second_from, second_tail);
        let new = junction_delta(problem, first_route, first_from, second_tail)
            + junction_delta(problem, second_route, second_from, first_tail);

        new - current
    }

    fn is_valid(&self, solution: &WorkingSolution) -> bool {
        let problem = solution.problem();
        let first_route = solution.route(self.params.first_route_id);
        let second_route = solution.route(self.params.second_route_id);

        first_route.is_valid_change(
            problem,
            second_route.stop_ids_iter(self.params.second_from, second_route.len()),
            self.params.first_from,
            first_route.len(),
        ) && second_route.is_valid_change(
            problem,
            first_route.stop_ids_iter(self.params.first_from, first_route.len()),
            self.params.second_from,
            second_route.len(),
        )
    }

    fn apply(&self, solution: &mut WorkingSolution) {
        let first_route = solution.route(self.params.first_route_id);
        let second_route = solution.route(self.params.second_route_id);
        let (first_len, second_len) = (first_route.len(), second_route.len());

        let first_tail = first_route
            .stop_ids_iter(self.params.first_from, first_len)
            .collect::<Vec<_>>();
        let second_tail = second_route
            .stop_ids_iter(self.params.second_from, second_len)
            .collect::<Vec<_>>();

        solution.replace_route_stops(
            self.params.first_route_id,
            &second_tail,
            self.params.first_from,
            first_len,
        );
        solution.replace_route_stops(
            self.params.second_route_id,
            &first_tail,
            self.params.second_from,
            second_len,
        );
    }

    fn updated_routes(&self) -> Vec<RouteIdx> {
        vec![self.params.first_route_id, self.params.second_route_id]
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{
        problem::stop::StopIdx,
        solver::{
            ls::{
                inter_two_opt_star::{InterTwoOptStarOperator, InterTwoOptStarOperatorParams},
                r#move::LocalSearchOperator,
                neighborhood::Neighborhood,
            },
            solution::{route_id::RouteIdx, working_solution::WorkingSolution},
        },
        test_utils::{self, TestRoute},
    };

    //
    //  (3) - (4) - (5)
    //   |
    //  (0) - (1) - (2)
    //
    // The first vehicle starts at (0), the second one at (3)
    fn grid_solution(routes: Vec<TestRoute>) -> WorkingSolution {
        let problem = Arc::new(test_utils::create_test_problem(
            test_utils::create_location_grid(2, 3),
            test_utils::create_basic_stops(vec![1, 2, 4, 5]),
            test_utils::create_basic_vehicles(vec![0, 3]),
        ));

        test_utils::create_test_working_solution(problem, routes)
    }

    fn apply_checked(operator: &InterTwoOptStarOperator, solution: &mut WorkingSolution) {
        let cost = solution.total_cost();
        let distance = solution.distance();
        let delta = operator.delta(solution);

        assert!(operator.is_valid(solution));
        operator.apply(solution);

        assert!((solution.total_cost() - (cost + delta.cost)).abs() < 1e-6);
        assert!((solution.distance() - (distance + delta.distance)).abs() < 1e-6);
    }

    #[test]
    fn test_two_opt_star_uncross() {
        let mut solution = grid_solution(vec![
            TestRoute {
                vehicle_id: 0,
                stop_ids: vec![0, 3],
            },
            TestRoute {
                vehicle_id: 1,
                stop_ids: vec![2, 1],
            },
        ]);
        let cost = solution.total_cost();

        let operator = InterTwoOptStarOperator::new(InterTwoOptStarOperatorParams {
            first_route_id: RouteIdx::new(0),
            second_route_id: RouteIdx::new(1),
            first_from: 1,
            second_from: 1,
        });
        apply_checked(&operator, &mut solution);

        assert!(solution.total_cost() < cost);
        assert_eq!(
            solution.route(RouteIdx::new(0)).stop_ids(),
            &[StopIdx::new(0), StopIdx::new(1)]
        );
        assert_eq!(
            solution.route(RouteIdx::new(1)).stop_ids(),
            &[StopIdx::new(2), StopIdx::new(3)]
        );
    }

    #[test]
    fn test_two_opt_star_into_empty_route() {
        let mut solution = grid_solution(vec![TestRoute {
            vehicle_id: 0,
            stop_ids: vec![0, 1, 3, 2],
        }]);

        let operator = InterTwoOptStarOperator::new(InterTwoOptStarOperatorParams {
            first_route_id: RouteIdx::new(0),
            second_route_id: RouteIdx::new(1),
            first_from: 2,
            second_from: 0,
        });
        apply_checked(&operator, &mut solution);

        assert_eq!(
            solution.route(RouteIdx::new(1)).stop_ids(),
            &[StopIdx::new(3), StopIdx::new(2)]
        );
    }

    #[test]
    fn test_two_opt_star_empties_route() {
        let mut solution = grid_solution(vec![
            TestRoute {
                vehicle_id: 0,
                stop_ids: vec![0, 1],
            },
            TestRoute {
                vehicle_id: 1,
                stop_ids: vec![2, 3],
            },
        ]);

        let operator = InterTwoOptStarOperator::new(InterTwoOptStarOperatorParams {
            first_route_id: RouteIdx::new(0),
            second_route_id: RouteIdx::new(1),
            first_from: 2,
            second_from: 0,
        });
        apply_checked(&operator, &mut solution);

        assert_eq!(solution.route(RouteIdx::new(0)).len(), 4);
        assert!(solution.route(RouteIdx::new(1)).is_empty());
    }

    #[test]
    fn test_generate_moves_skips_no_ops() {
        let solution = grid_solution(vec![
            TestRoute {
                vehicle_id: 0,
                stop_ids: vec![0, 1],
            },
            TestRoute {
                vehicle_id: 1,
                stop_ids: vec![2, 3],
            },
        ]);
        let neighborhood = Neighborhood::new(solution.problem(), 3);

        let mut moves = 0;
        InterTwoOptStarOperator::generate_moves(
            &solution,
            &neighborhood,
            (RouteIdx::new(1), RouteIdx::new(0)),
            |_| moves += 1,
        );
        assert_eq!(moves, 0);

        InterTwoOptStarOperator::generate_moves(
            &solution,
            &neighborhood,
            (RouteIdx::new(0), RouteIdx::new(1)),
            |op| {
                moves += 1;
                assert!(op.is_valid(&solution));
            },
        );
        assert!(moves > 0);
    }
}
