use crate::solver::{
    ls::{
        r#move::{LocalSearchDelta, LocalSearchOperator, arcs_delta},
        neighborhood::Neighborhood,
    },
    solution::{route_id::RouteIdx, working_solution::WorkingSolution},
};

/// **Inter-Route Swap**
///
/// Exchanges the stop at `first` in the first route with the stop at `second` in the second route.
///
/// ```text
/// BEFORE:
///    R1: ... (P1) -> [first] -> (N1) ...
///    R2: ... (P2) -> [second] -> (N2) ...
///
/// AFTER:
///    R1: ... (P1) -> [second] -> (N1) ...
///    R2: ... (P2) -> [first] -> (N2) ...
/// ```
#[derive(Debug, Clone)]
pub struct InterSwapOperator {
    params: InterSwapOperatorParams,
}

#[derive(Debug, Clone)]
pub struct InterSwapOperatorParams {
    pub first_route_id: RouteIdx,
    pub second_route_id: RouteIdx,
    pub first: usize,
    pub second: usize,
}

impl InterSwapOperator {
    pub fn new(params: InterSwapOperatorParams) -> Self {
        debug_assert!(params.first_route_id != params.second_route_id);
        Self { params }
    }
}

impl LocalSearchOperator for InterSwapOperator {
    fn generate_moves<C>(
        solution: &WorkingSolution,
        neighborhood: &Neighborhood,
        (r1, r2): (RouteIdx, RouteIdx),
        mut consumer: C,
    ) where
        C: FnMut(Self),
    {
        // The move is symmetric, each pair of routes is visited once
        if r1 >= r2 {
            return;
        }

        let first_route = solution.route(r1);
        let second_route = solution.route(r2);

        for first in 0..first_route.len() {
            for &neighbor in neighborhood.neighbors(first_route.stop_id(first)) {
                if let Some(second) = second_route.stop_position(neighbor) {
                    consumer(InterSwapOperator::new(InterSwapOperatorParams {
                        first_route_id: r1,
                        second_route_id: r2,
                        first,
                        second,
                    }));
                }
            }
        }
    }

    fn delta(&self, solution: &WorkingSolution) -> LocalSearchDelta {
        let problem = solution.problem();
        let first_route = solution.route(self.params.first_route_id);
        let second_route = solution.route(self.params.second_route_id);

        let p1 = first_route.previous_location_id(problem, self.params.first);
        let i = first_route.location_id(problem, self.params.first);
        let n1 = first_route.next_location_id(problem, self.params.first);

        let p2 = second_route.previous_location_id(problem, self.params.second);
        let j = second_route.location_id(problem, self.params.second);
        let n2 = second_route.next_location_id(problem, self.params.second);

        arcs_delta(problem, &[(p1, Some(j)), (j, n1), (p2, Some(i)), (i, n2)])
            - arcs_delta(problem, &[(p1, Some(i)), (i, n1), (p2, Some(j)), (j, n2)])
    }

    fn is_valid(&self, solution: &WorkingSolution) -> bool {
        let problem = solution.problem();
        let first_route = solution.route(self.params.first_route_id);
        let second_route = solution.route(self.params.second_route_id);

        let first_stop_id = first_route.stop_id(self.params.first);
        let second_stop_id = second_route.stop_id(self.params.second);

        first_route.is_valid_change(
            problem,
            std::iter::once(second_stop_id),
            self.params.first,
            self.params.first + 1,
        ) && second_route.is_valid_change(
            problem,
            std::iter::once(first_stop_id),
            self.params.second,
            self.params.second + 1,
        )
    }

    fn apply(&self, solution: &mut WorkingSolution) {
        let first_stop_id = solution
            .route(self.params.first_route_id)
            .stop_id(self.params.first);
        let second_stop_id = solution
            .route(self.params.second_route_id)
            .stop_id(self.params.second);

        solution.replace_route_stops(
            self.params.first_route_id,
            &[second_stop_id],
            self.params.first,
            self.params.first + 1,
        );
        solution.replace_route_stops(
            self.params.second_route_id,
            &[first_stop_id],
            self.params.second,
            self.params.second + 1,
        );
    }

    fn updated_routes(&self) -> Vec<RouteIdx> {
        vec![self.params.first_route_id, self.params.second_route_id]
    }
}
