use std::sync::Arc;

use tracing::{debug, instrument};

use crate::{
    problem::vehicle_routing_problem::VehicleRoutingProblem,
    solver::{recreate::best_insertion::BestInsertion, solution::working_solution::WorkingSolution},
    timer_debug,
};

/// Initial solution built by global cheapest insertion from empty routes.
#[instrument(skip_all, level = "debug")]
pub fn construct_solution(problem: &Arc<VehicleRoutingProblem>) -> WorkingSolution {
    let mut solution = WorkingSolution::new(Arc::clone(problem));

    timer_debug!(
        "Construction",
        BestInsertion.insert_stops(&mut solution)
    );

    debug!(
        "Constructed solution: {} routes, {} unassigned stops, score {:?}",
        solution.non_empty_routes_iter().count(),
        solution.unassigned_stops().len(),
        solution.score()
    );

    solution
}
