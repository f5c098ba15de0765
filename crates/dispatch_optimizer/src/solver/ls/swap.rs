use crate::{
    problem::stop::StopIdx,
    solver::{
        ls::{
            r#move::{LocalSearchDelta, LocalSearchOperator, arcs_delta},
            neighborhood::Neighborhood,
        },
        solution::{route_id::RouteIdx, working_solution::WorkingSolution},
    },
};

/// **Intra-Route Swap**
///
/// Exchanges the stops at `first` and `second` (`first < second`).
///
/// ```text
/// BEFORE:
///    Route: ... (P1) -> [first] -> (N1) ... (P2) -> [second] -> (N2) ...
///
/// AFTER:
///    Route: ... (P1) -> [second] -> (N1) ... (P2) -> [first] -> (N2) ...
///
/// Edges Removed: (P1->first), (first->N1), (P2->second), (second->N2)
/// Edges Added:   (P1->second), (second->N1), (P2->first), (first->N2)
/// ```
///
/// When the stops are adjacent, `N1` is `second` and `P2` is `first`.
#[derive(Debug, Clone)]
pub struct SwapOperator {
    params: SwapOperatorParams,
}

#[derive(Debug, Clone)]
pub struct SwapOperatorParams {
    pub route_id: RouteIdx,
    pub first: usize,
    pub second: usize,
}

impl SwapOperator {
    pub fn new(params: SwapOperatorParams) -> Self {
        debug_assert!(params.first < params.second);
        Self { params }
    }

    fn swapped_segment(&self, solution: &WorkingSolution) -> Vec<StopIdx> {
        let route = solution.route(self.params.route_id);
        let mut segment = route
            .stop_ids_iter(self.params.first, self.params.second + 1)
            .collect::<Vec<_>>();
        let last = segment.len() - 1;
        segment.swap(0, last);
        segment
    }
}

impl LocalSearchOperator for SwapOperator {
    fn generate_moves<C>(
        solution: &WorkingSolution,
        _neighborhood: &Neighborhood,
        (r1, r2): (RouteIdx, RouteIdx),
        mut consumer: C,
    ) where
        C: FnMut(Self),
    {
        if r1 != r2 {
            return;
        }

        let route = solution.route(r1);
        for first in 0..route.len() {
            for second in (first + 1)..route.len() {
                consumer(SwapOperator::new(SwapOperatorParams {
                    route_id: r1,
                    first,
                    second,
                }));
            }
        }
    }

    fn delta(&self, solution: &WorkingSolution) -> LocalSearchDelta {
        let problem = solution.problem();
        let route = solution.route(self.params.route_id);
        let (first, second) = (self.params.first, self.params.second);

        let p1 = route.previous_location_id(problem, first);
        let i = route.location_id(problem, first);
        let j = route.location_id(problem, second);
        let n2 = route.next_location_id(problem, second);

        if first + 1 == second {
            return arcs_delta(problem, &[(p1, Some(j)), (j, Some(i)), (i, n2)])
                - arcs_delta(problem, &[(p1, Some(i)), (i, Some(j)), (j, n2)]);
        }

        let n1 = route.location_id(problem, first + 1);
        let p2 = route.previous_location_id(problem, second);

        arcs_delta(
            problem,
            &[(p1, Some(j)), (j, Some(n1)), (p2, Some(i)), (i, n2)],
        ) - arcs_delta(
            problem,
            &[(p1, Some(i)), (i, Some(n1)), (p2, Some(j)), (j, n2)],
        )
    }

    fn is_valid(&self, solution: &WorkingSolution) -> bool {
        let route = solution.route(self.params.route_id);
        route.is_valid_tw_change(
            solution.problem(),
            self.swapped_segment(solution).into_iter(),
            self.params.first,
            self.params.second + 1,
        )
    }

    fn apply(&self, solution: &mut WorkingSolution) {
        let segment = self.swapped_segment(solution);
        solution.replace_route_stops(
            self.params.route_id,
            &segment,
            self.params.first,
            self.params.second + 1,
        );
    }

    fn updated_routes(&self) -> Vec<RouteIdx> {
        vec![self.params.route_id]
    }
}
