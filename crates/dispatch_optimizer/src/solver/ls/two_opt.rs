use crate::solver::{
    ls::{
        r#move::{LocalSearchDelta, LocalSearchOperator, arcs_delta},
        neighborhood::Neighborhood,
    },
    solution::{route_id::RouteIdx, working_solution::WorkingSolution},
};

/// **Intra-Route 2-Opt**
///
/// Reverses the stops between `from` and `to` (inclusive).
///
/// ```text
/// BEFORE:
///    ... (prev) --x--> [from] -> ... -> [to] --x--> (next) ...
///
/// AFTER:
///    ... (prev) -----> [to] -> ... -> [from] -----> (next) ...
///
/// Edges Removed: (prev->from), (to->next)
/// Edges Added:   (prev->to),   (from->next)
/// ```
///
/// With an asymmetric matrix the arcs inside the segment change cost too, the
/// route keeps backward cost sums so this stays constant time.
#[derive(Debug, Clone)]
pub struct TwoOptOperator {
    params: TwoOptParams,
}

#[derive(Debug, Clone)]
pub struct TwoOptParams {
    pub route_id: RouteIdx,
    pub from: usize,
    pub to: usize,
}

impl TwoOptOperator {
    pub fn new(params: TwoOptParams) -> Self {
        debug_assert!(params.from < params.to);
        TwoOptOperator { params }
    }
}

impl LocalSearchOperator for TwoOptOperator {
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

        // Reversing two adjacent stops is a swap
        for from in 0..route.len() {
            for to in (from + 2)..route.len() {
                consumer(TwoOptOperator::new(TwoOptParams {
                    route_id: r1,
                    from,
                    to,
                }));
            }
        }
    }

    fn delta(&self, solution: &WorkingSolution) -> LocalSearchDelta {
        let problem = solution.problem();
        let route = solution.route(self.params.route_id);
        let (from, to) = (self.params.from, self.params.to);

        let prev = route.previous_location_id(problem, from);
        let from_location = route.location_id(problem, from);
        let to_location = route.location_id(problem, to);
        let next = route.next_location_id(problem, to);

        let mut delta = arcs_delta(
            problem,
            &[(prev, Some(to_location)), (from_location, next)],
        ) - arcs_delta(
            problem,
            &[(prev, Some(from_location)), (to_location, next)],
        );

        if !problem.is_symmetric() {
            delta.cost += route.bwd_segment_cost(from, to) - route.fwd_segment_cost(from, to);
            delta.distance += (from..to)
                .map(|position| {
                    let a = route.location_id(problem, position);
                    let b = route.location_id(problem, position + 1);
                    problem.travel_distance(b, a) - problem.travel_distance(a, b)
                })
                .sum::<f64>();
        }

        delta
    }

    fn is_valid(&self, solution: &WorkingSolution) -> bool {
        let route = solution.route(self.params.route_id);
        route.is_valid_tw_change(
            solution.problem(),
            route.stop_ids_iter(self.params.from, self.params.to + 1).rev(),
            self.params.from,
            self.params.to + 1,
        )
    }

    fn apply(&self, solution: &mut WorkingSolution) {
        let reversed = solution
            .route(self.params.route_id)
            .stop_ids_iter(self.params.from, self.params.to + 1)
            .rev()
            .collect::<Vec<_>>();

        solution.replace_route_stops(
            self.params.route_id,
            &reversed,
            self.params.from,
            self.params.to + 1,
        );
    }

    fn updated_routes(&self) -> Vec<RouteIdx> {
        vec![self.params.route_id]
    }
}
