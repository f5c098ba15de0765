use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use jiff::{SignedDuration, Timestamp};
use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};
use rand::{Rng, SeedableRng, rngs::SmallRng};
use tracing::{debug, info, instrument, warn};

use crate::{
    problem::vehicle_routing_problem::VehicleRoutingProblem,
    solver::{
        accepted_solution::AcceptedSolution,
        construction::construct_solution::construct_solution,
        ls::local_search::LocalSearch,
        recreate::best_insertion::BestInsertion,
        ruin::{ruin_context::RuinContext, ruin_solution::RuinSolution},
        solution::working_solution::WorkingSolution,
        solver_params::{SolverParams, Termination},
    },
};

const LOCAL_SEARCH_MAX_MOVES: usize = 1000;

/// Summary of a finished search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOutcome {
    pub iterations: usize,
    /// The time budget expired or the search was cancelled
    pub early_terminated: bool,
    pub duration: SignedDuration,
}

struct SearchState {
    start: Timestamp,
    iteration: usize,
    iterations_without_improvement: usize,
}

/// Iterated local search: ruin a few stops of the best solution, insert them back
/// at their cheapest position and descend with the local search operators.
///
/// A new solution is kept only when it is strictly better than the best one.
pub struct Search {
    problem: Arc<VehicleRoutingProblem>,
    params: SolverParams,
    best_solution: Arc<RwLock<Option<AcceptedSolution>>>,
    is_stopped: Arc<AtomicBool>,
}

impl Search {
    pub fn new(mut params: SolverParams, problem: Arc<VehicleRoutingProblem>) -> Self {
        if params.terminations.is_empty() {
            warn!("No termination condition given, using the default ones");
            params.terminations = SolverParams::default().terminations;
        }

        Search {
            problem,
            params,
            best_solution: Arc::new(RwLock::new(None)),
            is_stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn problem(&self) -> &VehicleRoutingProblem {
        &self.problem
    }

    pub fn params(&self) -> &SolverParams {
        &self.params
    }

    pub fn best_solution(&self) -> Option<MappedRwLockReadGuard<'_, AcceptedSolution>> {
        RwLockReadGuard::try_map(self.best_solution.read(), |solution| solution.as_ref()).ok()
    }

    /// Requests the search to stop, the best solution so far is kept.
    pub fn stop(&self) {
        self.is_stopped.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.is_stopped.load(Ordering::Relaxed)
    }

    fn create_thread_pool(&self) -> Result<rayon::ThreadPool, rayon::ThreadPoolBuildError> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.params.threads.number_of_threads())
            .build()
    }

    pub fn run(&self) -> SearchOutcome {
        let start = Timestamp::now();

        match self.create_thread_pool() {
            Ok(thread_pool) => thread_pool.install(|| self.run_search(start)),
            Err(error) => {
                warn!("Could not create the search thread pool ({error}), using the global pool");
                self.run_search(start)
            }
        }
    }

    #[instrument(skip_all, level = "debug")]
    fn run_search(&self, start: Timestamp) -> SearchOutcome {
        let mut rng = SmallRng::seed_from_u64(self.params.seed);
        let mut state = SearchState {
            start,
            iteration: 0,
            iterations_without_improvement: 0,
        };

        if self.best_solution.read().is_none() {
            let solution = construct_solution(&self.problem);
            *self.best_solution.write() = Some(AcceptedSolution::new(solution));
        }

        if self
            .params
            .time_budget()
            .is_some_and(|budget| budget <= SignedDuration::ZERO)
        {
            debug!("No time budget, keeping the constructed solution");
            return self.outcome(&state, true);
        }

        let mut local_search = LocalSearch::new(&self.problem, self.params.neighbors);

        let early_terminated = loop {
            if self.is_stopped() {
                info!("Search cancelled at iteration {}", state.iteration);
                break true;
            }

            if let Some(termination) = self.reached_termination(&state) {
                debug!(
                    "Termination condition met: {:?} at iteration {}",
                    termination, state.iteration
                );
                break matches!(termination, Termination::Duration(_));
            }

            state.iteration += 1;
            self.run_iteration(&mut state, &mut local_search, &mut rng);
        };

        self.outcome(&state, early_terminated)
    }

    fn run_iteration(
        &self,
        state: &mut SearchState,
        local_search: &mut LocalSearch,
        rng: &mut SmallRng,
    ) {
        let (mut solution, best_score) = {
            let guard = self.best_solution.read();
            match guard.as_ref() {
                Some(best) => (best.solution.clone(), best.score),
                None => return,
            }
        }; // Lock is released here

        self.ruin(&mut solution, rng);
        BestInsertion.recreate_solution(&mut solution);

        let start = state.start;
        let applied = local_search.intensify(&mut solution, LOCAL_SEARCH_MAX_MOVES, || {
            self.is_interrupted(start)
        });
        if applied == LOCAL_SEARCH_MAX_MOVES {
            debug!(
                "Iteration {}: local search reached {} moves",
                state.iteration, LOCAL_SEARCH_MAX_MOVES
            );
        }

        let score = solution.score();
        if score.is_better_than(&best_score) {
            debug!(
                "Iteration {}: new best solution {:?}",
                state.iteration, score
            );
            *self.best_solution.write() = Some(AcceptedSolution { solution, score });
            state.iterations_without_improvement = 0;
        } else {
            state.iterations_without_improvement += 1;
        }
    }

    fn ruin(&self, solution: &mut WorkingSolution, rng: &mut SmallRng) {
        let strategies = self.params.ruin_strategies();
        if strategies.is_empty() {
            return;
        }

        let assigned = self.problem.stops().len() - solution.unassigned_stops().len();
        let minimum = self.params.ruin.ruin_minimum_size.min(assigned);
        let maximum = self.params.ruin.ruin_maximum_size.clamp(minimum, assigned);
        let num_stops_to_remove = rng.random_range(minimum..=maximum);

        let strategy = strategies[rng.random_range(0..strategies.len())];
        strategy.ruin_solution(
            solution,
            RuinContext {
                problem: &self.problem,
                rng,
                num_stops_to_remove,
            },
        );
    }

    /// Cancelled, or past the time budget. Checked inside an iteration.
    fn is_interrupted(&self, start: Timestamp) -> bool {
        self.is_stopped()
            || self
                .params
                .time_budget()
                .is_some_and(|budget| Timestamp::now().duration_since(start) >= budget)
    }

    fn reached_termination(&self, state: &SearchState) -> Option<&Termination> {
        self.params
            .terminations
            .iter()
            .find(|termination| match **termination {
                Termination::Iterations(max_iterations) => state.iteration >= max_iterations,
                Termination::IterationsWithoutImprovement(max_iterations) => {
                    state.iterations_without_improvement >= max_iterations
                }
                Termination::Duration(max_duration) => {
                    Timestamp::now().duration_since(state.start) >= max_duration
                }
            })
    }

    fn outcome(&self, state: &SearchState, early_terminated: bool) -> SearchOutcome {
        let outcome = SearchOutcome {
            iterations: state.iteration,
            early_terminated,
            duration: Timestamp::now().duration_since(state.start),
        };

        if let Some(best) = self.best_solution() {
            info!(
                "Search finished after {} iterations in {:?}: {:?}",
                outcome.iterations, outcome.duration, best.score
            );
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use jiff::SignedDuration;

    use super::*;
    use crate::{
        problem::{
            stop::{Stop, StopBuilder},
            time_window::TimeWindowBuilder,
            vehicle::VehicleBuilder,
        },
        solver::solver_params::Threads,
        test_utils,
    };

    fn create_problem() -> Arc<VehicleRoutingProblem> {
        let epoch = Timestamp::UNIX_EPOCH;
        let stops = (1..25usize)
            .map(|location_id| {
                let mut builder = StopBuilder::new(location_id.to_string(), location_id);
                builder
                    .set_demand((location_id % 3 + 1) as f64)
                    .set_duration(SignedDuration::from_secs(30));
                if location_id % 4 == 0 {
                    builder.set_time_window(
                        TimeWindowBuilder::default()
                            .with_end(epoch + SignedDuration::from_secs(1200))
                            .build(),
                    );
                }
                builder.build()
            })
            .collect::<Vec<Stop>>();

        let vehicles = (0..3)
            .map(|index| {
                let mut builder = VehicleBuilder::new(format!("v{index}"), 12);
                builder.set_capacity(18.0);
                builder.build()
            })
            .collect();

        Arc::new(test_utils::create_test_problem(
            test_utils::create_location_grid(5, 5),
            stops,
            vehicles,
        ))
    }

    fn params(terminations: Vec<Termination>) -> SolverParams {
        SolverParams {
            terminations,
            seed: 42,
            threads: Threads::Multi(2),
            ..SolverParams::default()
        }
    }

    #[test]
    fn test_zero_time_budget_keeps_construction() {
        let problem = create_problem();
        let search = Search::new(
            params(vec![Termination::Duration(SignedDuration::ZERO)]),
            Arc::clone(&problem),
        );

        let outcome = search.run();

        assert!(outcome.early_terminated);
        assert_eq!(outcome.iterations, 0);

        let constructed = construct_solution(&problem);
        let best = search.best_solution().unwrap();
        assert!(best.solution.is_identical(&constructed));
        assert_eq!(best.score, constructed.score());
    }

    #[test]
    fn test_more_iterations_never_worsen() {
        let problem = create_problem();

        let short = Search::new(
            params(vec![Termination::Iterations(5)]),
            Arc::clone(&problem),
        );
        let long = Search::new(
            params(vec![Termination::Iterations(40)]),
            Arc::clone(&problem),
        );

        let short_outcome = short.run();
        let long_outcome = long.run();

        assert_eq!(short_outcome.iterations, 5);
        assert_eq!(long_outcome.iterations, 40);
        assert!(!short_outcome.early_terminated);

        let short_score = short.best_solution().unwrap().score;
        let long_score = long.best_solution().unwrap().score;
        assert!(long_score <= short_score);

        // Same seed, same result
        let again = Search::new(
            params(vec![Termination::Iterations(5)]),
            Arc::clone(&problem),
        );
        again.run();
        assert_eq!(again.best_solution().unwrap().score, short_score);
    }

    #[test]
    fn test_best_solution_is_feasible() {
        let problem = create_problem();
        let search = Search::new(
            params(vec![Termination::Iterations(30)]),
            Arc::clone(&problem),
        );
        search.run();

        let best = search.best_solution().unwrap();
        test_utils::assert_feasible_solution(&best.solution);
        assert!(best.score <= construct_solution(&problem).score());
    }

    #[test]
    fn test_stop_before_run() {
        let search = Search::new(params(vec![Termination::Iterations(100)]), create_problem());
        search.stop();

        let outcome = search.run();

        assert!(outcome.early_terminated);
        assert_eq!(outcome.iterations, 0);
        assert!(search.best_solution().is_some());
    }

    #[test]
    fn test_stop_from_another_thread() {
        let search = Arc::new(Search::new(
            params(vec![Termination::Iterations(usize::MAX)]),
            create_problem(),
        ));

        let handle = std::thread::spawn({
            let search = Arc::clone(&search);
            move || search.run()
        });
        std::thread::sleep(std::time::Duration::from_millis(50));
        search.stop();

        let outcome = handle.join().unwrap();

        assert!(outcome.early_terminated);
        assert!(outcome.iterations < usize::MAX);
        test_utils::assert_feasible_solution(&search.best_solution().unwrap().solution);
    }

    #[test]
    fn test_time_budget_interrupts_iteration() {
        let search = Search::new(
            params(vec![Termination::Duration(SignedDuration::from_millis(20))]),
            create_problem(),
        );

        assert!(!search.is_interrupted(Timestamp::now()));
        assert!(search.is_interrupted(Timestamp::now() - SignedDuration::from_millis(30)));

        search.stop();
        assert!(search.is_interrupted(Timestamp::now()));
    }

    #[test]
    fn test_iterations_without_improvement() {
        let search = Search::new(
            params(vec![
                Termination::IterationsWithoutImprovement(3),
                Termination::Iterations(1000),
            ]),
            create_problem(),
        );

        let outcome = search.run();

        assert!(!outcome.early_terminated);
        assert!(outcome.iterations >= 3);
        assert!(outcome.iterations < 1000);
    }

    #[test]
    fn test_empty_terminations_use_defaults() {
        let search = Search::new(params(vec![]), create_problem());

        assert_eq!(
            search.params().terminations,
            SolverParams::default().terminations
        );
    }
}
