use std::sync::Arc;

use jiff::Timestamp;
use parking_lot::{MappedRwLockReadGuard, RwLock};
use schemars::JsonSchema;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::problem::vehicle_routing_problem::VehicleRoutingProblem;

use super::{
    accepted_solution::AcceptedSolution,
    search::{Search, SearchOutcome},
    solution::extract::{InfeasibleRouteError, Solution, extract_solution},
    solver_params::SolverParams,
};

#[derive(Debug, Error, PartialEq)]
pub enum SolverError {
    #[error("no solution has been constructed yet")]
    NoSolution,

    #[error(transparent)]
    InfeasibleRoute(#[from] InfeasibleRouteError),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SolverStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// One solve of one problem.
pub struct Solver {
    search: Search,
    status: RwLock<SolverStatus>,
    outcome: RwLock<Option<SearchOutcome>>,
    created_at: Timestamp,
}

impl Solver {
    pub fn new(problem: VehicleRoutingProblem, params: SolverParams) -> Self {
        Self::from_shared(Arc::new(problem), params)
    }

    pub fn from_shared(problem: Arc<VehicleRoutingProblem>, params: SolverParams) -> Self {
        Solver {
            search: Search::new(params, problem),
            status: RwLock::new(SolverStatus::Pending),
            outcome: RwLock::new(None),
            created_at: Timestamp::now(),
        }
    }

    /// Runs the search to completion and extracts the best solution.
    pub fn solve(&self) -> Result<Solution, SolverError> {
        *self.status.write() = SolverStatus::Running;
        let outcome = self.search.run();
        *self.outcome.write() = Some(outcome);

        let result = self.extract(&outcome);
        *self.status.write() = match result {
            Ok(_) => SolverStatus::Completed,
            Err(_) => SolverStatus::Failed,
        };

        result
    }

    pub fn stop(&self) {
        self.search.stop();
    }

    pub fn status(&self) -> SolverStatus {
        *self.status.read()
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn problem(&self) -> &VehicleRoutingProblem {
        self.search.problem()
    }

    pub fn current_best_solution(&self) -> Option<MappedRwLockReadGuard<'_, AcceptedSolution>> {
        self.search.best_solution()
    }

    /// Output plan of the best solution found so far.
    ///
    /// While the search is running the plan is flagged as early terminated.
    pub fn current_solution(&self) -> Result<Solution, SolverError> {
        let outcome = (*self.outcome.read()).unwrap_or(SearchOutcome {
            iterations: 0,
            early_terminated: true,
            duration: Timestamp::now().duration_since(self.created_at),
        });

        self.extract(&outcome)
    }

    fn extract(&self, outcome: &SearchOutcome) -> Result<Solution, SolverError> {
        let best = self.search.best_solution().ok_or(SolverError::NoSolution)?;

        extract_solution(&best.solution, outcome)
            .inspect_err(|err| error!("Best solution is not feasible: {err}"))
            .map_err(SolverError::from)
    }
}
