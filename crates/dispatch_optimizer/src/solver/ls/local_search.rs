use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::{debug, instrument};

use crate::{
    problem::vehicle_routing_problem::VehicleRoutingProblem,
    solver::{
        ls::{
            inter_relocate::InterRelocateOperator,
            inter_swap::InterSwapOperator,
            inter_two_opt_star::InterTwoOptStarOperator,
            r#move::{LocalSearchDelta, LocalSearchMove, LocalSearchOperator},
            neighborhood::Neighborhood,
            relocate::RelocateOperator,
            swap::SwapOperator,
            two_opt::TwoOptOperator,
        },
        solution::{route_id::RouteIdx, working_solution::WorkingSolution},
    },
};

type RoutePair = (RouteIdx, RouteIdx);

/// Best-improvement descent over the intra and inter-route operators.
///
/// The best move of every route pair is cached, after a move only the pairs
/// involving a modified route are evaluated again.
pub struct LocalSearch {
    neighborhood: Neighborhood,
    pairs: Vec<RoutePair>,
    best_moves: Vec<Vec<Option<(LocalSearchDelta, LocalSearchMove)>>>,
}

/// Keeps the move if it improves more than `best` and is feasible.
fn consider<O: LocalSearchOperator>(
    solution: &WorkingSolution,
    op: O,
    wrap: fn(O) -> LocalSearchMove,
    best: &mut Option<(LocalSearchDelta, LocalSearchMove)>,
) {
    let delta = op.delta(solution);
    if !delta.is_improvement() {
        return;
    }

    if best
        .as_ref()
        .is_some_and(|(best_delta, _)| !delta.compare(best_delta).is_lt())
    {
        return;
    }

    if op.is_valid(solution) {
        *best = Some((delta, wrap(op)));
    }
}

fn best_pair_move(
    solution: &WorkingSolution,
    neighborhood: &Neighborhood,
    pair: RoutePair,
) -> Option<(LocalSearchDelta, LocalSearchMove)> {
    let mut best = None;

    RelocateOperator::generate_moves(solution, neighborhood, pair, |op| {
        consider(solution, op, LocalSearchMove::Relocate, &mut best)
    });
    SwapOperator::generate_moves(solution, neighborhood, pair, |op| {
        consider(solution, op, LocalSearchMove::Swap, &mut best)
    });
    TwoOptOperator::generate_moves(solution, neighborhood, pair, |op| {
        consider(solution, op, LocalSearchMove::TwoOpt, &mut best)
    });
    InterRelocateOperator::generate_moves(solution, neighborhood, pair, |op| {
        consider(solution, op, LocalSearchMove::InterRelocate, &mut best)
    });
    InterSwapOperator::generate_moves(solution, neighborhood, pair, |op| {
        consider(solution, op, LocalSearchMove::InterSwap, &mut best)
    });
    InterTwoOptStarOperator::generate_moves(solution, neighborhood, pair, |op| {
        consider(solution, op, LocalSearchMove::InterTwoOptStar, &mut best)
    });

    best
}

impl LocalSearch {
    pub fn new(problem: &VehicleRoutingProblem, neighbors: usize) -> Self {
        let count = problem.vehicles().len();

        LocalSearch {
            neighborhood: Neighborhood::new(problem, neighbors),
            pairs: Vec::with_capacity(count * count),
            best_moves: (0..count).map(|_| vec![None; count]).collect(),
        }
    }

    /// Applies the best improving move until none is left, `max_moves` were applied
    /// or `should_stop` returns true. Returns the number of applied moves.
    ///
    /// `should_stop` is checked before every move evaluation.
    #[instrument(skip_all, level = "debug")]
    pub fn intensify(
        &mut self,
        solution: &mut WorkingSolution,
        max_moves: usize,
        should_stop: impl Fn() -> bool,
    ) -> usize {
        let num_routes = solution.routes().len();
        self.pairs.clear();
        for i in 0..num_routes {
            for j in 0..num_routes {
                self.pairs.push((RouteIdx::new(i), RouteIdx::new(j)));
            }
        }

        let mut applied = 0;
        while applied < max_moves && !should_stop() && self.run_iteration(solution) {
            applied += 1;
        }

        debug!("Local search applied {} moves", applied);
        applied
    }

    fn run_iteration(&mut self, solution: &mut WorkingSolution) -> bool {
        let results = {
            let solution = &*solution;
            let neighborhood = &self.neighborhood;
            self.pairs
                .par_iter()
                .map(|&pair| (pair, best_pair_move(solution, neighborhood, pair)))
                .collect::<Vec<_>>()
        };

        for ((r1, r2), best) in results {
            self.best_moves[r1.get()][r2.get()] = best;
        }

        let best = self
            .best_moves
            .iter()
            .flatten()
            .flatten()
            .min_by(|(a, _), (b, _)| a.compare(b))
            .map(|(_, best_move)| best_move.clone());

        let Some(best_move) = best else {
            return false;
        };

        debug!(
            "Apply {} (cost {:.2})",
            best_move.operator_name(),
            best_move.delta(solution).cost
        );
        best_move.apply(solution);

        let updated_routes = best_move.updated_routes();
        self.pairs.clear();
        for i in 0..solution.routes().len() {
            let route_id = RouteIdx::new(i);
            for &updated_route in &updated_routes {
                self.pairs.push((route_id, updated_route));
                self.pairs.push((updated_route, route_id));
            }
        }
        self.pairs.sort_unstable();
        self.pairs.dedup();

        true
    }
}
