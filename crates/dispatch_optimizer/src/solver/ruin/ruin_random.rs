use crate::solver::solution::working_solution::WorkingSolution;

use super::{ruin_context::RuinContext, ruin_solution::RuinSolution};

/// Removes stops at random positions of random non-empty routes.
pub struct RuinRandom;

impl RuinSolution for RuinRandom {
    fn ruin_solution<R>(
        &self,
        solution: &mut WorkingSolution,
        RuinContext {
            rng,
            num_stops_to_remove,
            ..
        }: RuinContext<R>,
    ) where
        R: rand::Rng,
    {
        for _ in 0..num_stops_to_remove {
            let Some(route_id) = solution.random_non_empty_route(rng) else {
                break;
            };

            let route = solution.route(route_id);
            let stop_id = route.stop_id(route.random_position(rng));
            solution.remove_stop(stop_id);
        }
    }
}
