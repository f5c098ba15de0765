use rand::Rng;

use crate::solver::solution::working_solution::WorkingSolution;

use super::ruin_context::RuinContext;

/// Removes stops from a solution, the removed stops become unassigned.
pub trait RuinSolution {
    fn ruin_solution<R>(&self, solution: &mut WorkingSolution, context: RuinContext<R>)
    where
        R: Rng;
}
