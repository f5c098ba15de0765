use crate::{
    problem::stop::StopIdx,
    solver::solution::{route_id::RouteIdx, working_solution::WorkingSolution},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Insertion {
    pub route_id: RouteIdx,
    pub stop_id: StopIdx,
    /// The stop is inserted before the stop currently at this position
    pub position: usize,
}

pub fn for_each_route_insertion(
    solution: &WorkingSolution,
    route_id: RouteIdx,
    stop_id: StopIdx,
    mut f: impl FnMut(Insertion),
) {
    let route = solution.route(route_id);
    for position in 0..=route.len() {
        f(Insertion {
            route_id,
            stop_id,
            position,
        });
    }
}
