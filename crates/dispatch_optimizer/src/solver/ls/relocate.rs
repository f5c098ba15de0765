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

/// **Intra-Route Relocate**
///
/// Moves the stop at `from` so it is visited right before the stop currently at `to`.
///
/// ```text
/// BEFORE:
///    Route: ... (A) -> [from] -> (C) ... (X) -> (Y) ...
///
/// AFTER:
///    Route: ... (A) -> (C) ... (X) -> [from] -> (Y) ...
///
/// Edges Removed: (A->from), (from->C), (X->Y)
/// Edges Added:   (A->C),    (X->from), (from->Y)
/// ```
#[derive(Debug, Clone)]
pub struct RelocateOperator {
    params: RelocateOperatorParams,
}

#[derive(Debug, Clone)]
pub struct RelocateOperatorParams {
    pub route_id: RouteIdx,
    pub from: usize,
    pub to: usize,
}

impl RelocateOperator {
    pub fn new(params: RelocateOperatorParams) -> Self {
        debug_assert!(params.from != params.to && params.from + 1 != params.to);
        Self { params }
    }

    /// The new order of the stops in the `[start, end)` positions.
    fn moved_segment(&self, solution: &WorkingSolution) -> (Vec<StopIdx>, usize, usize) {
        let route = solution.route(self.params.route_id);
        let stop_id = route.stop_id(self.params.from);

        if self.params.from < self.params.to {
            // B - C - D - E becomes C - D - B - E when moving B before E
            let segment = route
                .stop_ids_iter(self.params.from + 1, self.params.to)
                .chain(std::iter::once(stop_id))
                .collect();
            (segment, self.params.from, self.params.to)
        } else {
            // B - C - D - E becomes D - B - C - E when moving D before B
            let segment = std::iter::once(stop_id)
                .chain(route.stop_ids_iter(self.params.to, self.params.from))
                .collect();
            (segment, self.params.to, self.params.from + 1)
        }
    }
}

impl LocalSearchOperator for RelocateOperator {
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
        for from in 0..route.len() {
            for to in 0..=route.len() {
                if from == to || from + 1 == to {
                    continue;
                }

                consumer(RelocateOperator::new(RelocateOperatorParams {
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

        let a = route.previous_location_id(problem, self.params.from);
        let from = route.location_id(problem, self.params.from);
        let c = route.next_location_id(problem, self.params.from);

        let x = route.previous_location_id(problem, self.params.to);
        let y = route.location_or_end_id(problem, self.params.to);

        arcs_delta(problem, &[(a, c), (x, Some(from)), (from, y)])
            - arcs_delta(problem, &[(a, Some(from)), (from, c), (x, y)])
    }

    fn is_valid(&self, solution: &WorkingSolution) -> bool {
        let route = solution.route(self.params.route_id);
        let (segment, start, end) = self.moved_segment(solution);

        // Same stops, the load cannot change
        route.is_valid_tw_change(solution.problem(), segment.into_iter(), start, end)
    }

    fn apply(&self, solution: &mut WorkingSolution) {
        let (segment, start, end) = self.moved_segment(solution);
        solution.replace_route_stops(self.params.route_id, &segment, start, end);
    }

    fn updated_routes(&self) -> Vec<RouteIdx> {
        vec![self.params.route_id]
    }
}
