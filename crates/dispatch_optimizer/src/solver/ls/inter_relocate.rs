use crate::solver::{
    ls::{
        r#move::{LocalSearchDelta, LocalSearchOperator, arcs_delta},
        neighborhood::Neighborhood,
    },
    solution::{route_id::RouteIdx, working_solution::WorkingSolution},
};

/// **Inter-Route Relocate**
///
/// Moves the stop at `from` in the first route before the stop at `to` in the second route.
///
/// ```text
/// BEFORE:
///    R1: ... (A) -> [from] -> (C) ...
///    R2: ... (X) -> (Y) ...
///
/// AFTER:
///    R1: ... (A) -> (C) ...
///    R2: ... (X) -> [from] -> (Y) ...
/// ```
///
/// A route that becomes empty, or was empty, costs nothing: its depot arcs are not counted.
#[derive(Debug, Clone)]
pub struct InterRelocateOperator {
    params: InterRelocateOperatorParams,
}

#[derive(Debug, Clone)]
pub struct InterRelocateOperatorParams {
    pub from_route_id: RouteIdx,
    pub to_route_id: RouteIdx,
    pub from: usize,
    pub to: usize,
}

impl InterRelocateOperator {
    pub fn new(params: InterRelocateOperatorParams) -> Self {
        debug_assert!(params.from_route_id != params.to_route_id);
        Self { params }
    }
}

impl LocalSearchOperator for InterRelocateOperator {
    fn generate_moves<C>(
        solution: &WorkingSolution,
        neighborhood: &Neighborhood,
        (r1, r2): (RouteIdx, RouteIdx),
        mut consumer: C,
    ) where
        C: FnMut(Self),
    {
        if r1 == r2 {
            return;
        }

        let from_route = solution.route(r1);
        let to_route = solution.route(r2);

        for from in 0..from_route.len() {
            let mut create = |to| {
                consumer(InterRelocateOperator::new(InterRelocateOperatorParams {
                    from_route_id: r1,
                    to_route_id: r2,
                    from,
                    to,
                }))
            };

            if to_route.is_empty() {
                create(0);
                continue;
            }

            // Next to one of the nearest stops
            for &neighbor in neighborhood.neighbors(from_route.stop_id(from)) {
                if let Some(position) = to_route.stop_position(neighbor) {
                    create(position);
                    create(position + 1);
                }
            }
        }
    }

    fn delta(&self, solution: &WorkingSolution) -> LocalSearchDelta {
        let problem = solution.problem();
        let from_route = solution.route(self.params.from_route_id);
        let to_route = solution.route(self.params.to_route_id);

        let a = from_route.previous_location_id(problem, self.params.from);
        let from = from_route.location_id(problem, self.params.from);
        let c = from_route.next_location_id(problem, self.params.from);

        let x = to_route.previous_location_id(problem, self.params.to);
        let y = to_route.location_or_end_id(problem, self.params.to);

        let removed_from = if from_route.len() == 1 {
            LocalSearchDelta::ZERO
        } else {
            arcs_delta(problem, &[(a, c)])
        };
        let removed = arcs_delta(problem, &[(a, Some(from)), (from, c)]);

        let added = arcs_delta(problem, &[(x, Some(from)), (from, y)]);
        let replaced = if to_route.is_empty() {
            LocalSearchDelta::ZERO
        } else {
            arcs_delta(problem, &[(x, y)])
        };

        removed_from - removed + added - replaced
    }

    fn is_valid(&self, solution: &WorkingSolution) -> bool {
        let problem = solution.problem();
        let from_route = solution.route(self.params.from_route_id);
        let to_route = solution.route(self.params.to_route_id);
        let stop_id = from_route.stop_id(self.params.from);

        to_route.is_valid_change(
            problem,
            std::iter::once(stop_id),
            self.params.to,
            self.params.to,
        ) && from_route.is_valid_tw_change(
            problem,
            std::iter::empty(),
            self.params.from,
            self.params.from + 1,
        )
    }

    fn apply(&self, solution: &mut WorkingSolution) {
        let stop_id = solution
            .route(self.params.from_route_id)
            .stop_id(self.params.from);

        solution.replace_route_stops(
            self.params.from_route_id,
            &[],
            self.params.from,
            self.params.from + 1,
        );
        solution.replace_route_stops(
            self.params.to_route_id,
            &[stop_id],
            self.params.to,
            self.params.to,
        );
    }

    fn updated_routes(&self) -> Vec<RouteIdx> {
        vec![self.params.from_route_id, self.params.to_route_id]
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{
        problem::stop::StopIdx,
        solver::{
            ls::{
                inter_relocate::{InterRelocateOperator, InterRelocateOperatorParams},
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
    // Both vehicles start at (0)
    fn grid_solution(routes: Vec<TestRoute>) -> WorkingSolution {
        let problem = Arc::new(test_utils::create_test_problem(
            test_utils::create_location_grid(2, 3),
            test_utils::create_basic_stops(vec![1, 2, 4, 5]),
            test_utils::create_basic_vehicles(vec![0, 0]),
        ));

        test_utils::create_test_working_solution(problem, routes)
    }

    fn assert_consistent_delta(operator: &InterRelocateOperator, solution: &mut WorkingSolution) {
        let cost = solution.total_cost();
        let distance = solution.distance();
        let delta = operator.delta(solution);

        operator.apply(solution);

        assert!((solution.total_cost() - (cost + delta.cost)).abs() < 1e-6);
        assert!((solution.distance() - (distance + delta.distance)).abs() < 1e-6);
    }

    #[test]
    fn test_inter_relocate() {
        let mut solution = grid_solution(vec![
            TestRoute {
                vehicle_id: 0,
                stop_ids: vec![0, 2],
            },
            TestRoute {
                vehicle_id: 1,
                stop_ids: vec![1, 3],
            },
        ]);

        let operator = InterRelocateOperator::new(InterRelocateOperatorParams {
            from_route_id: RouteIdx::new(1),
            to_route_id: RouteIdx::new(0),
            from: 0,
            to: 1,
        });
        assert!(operator.is_valid(&solution));

        assert_consistent_delta(&operator, &mut solution);
        assert_eq!(
            solution.route(RouteIdx::new(0)).stop_ids(),
            &[StopIdx::new(0), StopIdx::new(1), StopIdx::new(2)]
        );
        assert_eq!(solution.route(RouteIdx::new(1)).stop_ids(), &[StopIdx::new(3)]);
    }

    #[test]
    fn test_inter_relocate_empties_route() {
        let mut solution = grid_solution(vec![
            TestRoute {
                vehicle_id: 0,
                stop_ids: vec![0, 1, 3],
            },
            TestRoute {
                vehicle_id: 1,
                stop_ids: vec![2],
            },
        ]);

        let operator = InterRelocateOperator::new(InterRelocateOperatorParams {
            from_route_id: RouteIdx::new(1),
            to_route_id: RouteIdx::new(0),
            from: 0,
            to: 3,
        });

        assert_consistent_delta(&operator, &mut solution);
        assert!(solution.route(RouteIdx::new(1)).is_empty());
        assert_eq!(solution.route(RouteIdx::new(1)).cost(), 0.0);
    }

    #[test]
    fn test_inter_relocate_into_empty_route() {
        let mut solution = grid_solution(vec![TestRoute {
            vehicle_id: 0,
            stop_ids: vec![0, 1, 2, 3],
        }]);

        let operator = InterRelocateOperator::new(InterRelocateOperatorParams {
            from_route_id: RouteIdx::new(0),
            to_route_id: RouteIdx::new(1),
            from: 2,
            to: 0,
        });

        assert_consistent_delta(&operator, &mut solution);
        assert_eq!(solution.route(RouteIdx::new(1)).stop_ids(), &[StopIdx::new(2)]);
    }

    #[test]
    fn test_generate_moves_into_empty_route() {
        let solution = grid_solution(vec![TestRoute {
            vehicle_id: 0,
            stop_ids: vec![0, 1],
        }]);
        let neighborhood = Neighborhood::new(solution.problem(), 2);

        let mut moves = vec![];
        InterRelocateOperator::generate_moves(
            &solution,
            &neighborhood,
            (RouteIdx::new(0), RouteIdx::new(1)),
            |op| moves.push(op),
        );

        assert_eq!(moves.len(), 2);
    }
}
