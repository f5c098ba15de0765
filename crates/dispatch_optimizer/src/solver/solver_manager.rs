use std::sync::Arc;

use fxhash::FxHashMap;
use tokio::{sync::RwLock, task::JoinHandle};
use tracing::{debug, info};
use uuid::Uuid;

use crate::problem::vehicle_routing_problem::VehicleRoutingProblem;

use super::{
    solution::extract::Solution,
    solver::{Solver, SolverError, SolverStatus},
    solver_params::SolverParams,
};

/// Runs many solves concurrently, each on the blocking thread pool of tokio.
#[derive(Default)]
pub struct SolverManager {
    solvers: RwLock<FxHashMap<Uuid, Arc<Solver>>>,
}

impl SolverManager {
    pub async fn solve(
        &self,
        problem: VehicleRoutingProblem,
        params: SolverParams,
    ) -> (Uuid, JoinHandle<Result<Solution, SolverError>>) {
        let job_id = Uuid::new_v4();
        let solver = Arc::new(Solver::new(problem, params));
        self.solvers
            .write()
            .await
            .insert(job_id, Arc::clone(&solver));

        debug!("Starting job {job_id}");
        let handle = tokio::task::spawn_blocking(move || solver.solve());

        (job_id, handle)
    }

    pub async fn get_status(&self, job_id: &Uuid) -> Option<SolverStatus> {
        self.solvers
            .read()
            .await
            .get(job_id)
            .map(|solver| solver.status())
    }

    /// Cancels the job and returns its best solution so far.
    pub async fn stop(&self, job_id: &Uuid) -> Option<Result<Solution, SolverError>> {
        let solvers = self.solvers.read().await;
        let solver = solvers.get(job_id)?;

        info!("Stopping job {job_id}");
        solver.stop();
        Some(solver.current_solution())
    }

    pub async fn get_solution(&self, job_id: &Uuid) -> Option<Result<Solution, SolverError>> {
        self.solvers
            .read()
            .await
            .get(job_id)
            .map(|solver| solver.current_solution())
    }

    /// Forgets the job, cancelling it when it is still running.
    pub async fn remove(&self, job_id: &Uuid) -> bool {
        match self.solvers.write().await.remove(job_id) {
            Some(solver) => {
                solver.stop();
                true
            }
            None => false,
        }
    }

    pub async fn job_ids(&self) -> Vec<Uuid> {
        self.solvers.read().await.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use jiff::SignedDuration;

    use super::*;
    use crate::{
        solver::solver_params::{Termination, Threads},
        test_utils,
    };

    fn create_problem() -> VehicleRoutingProblem {
        test_utils::create_test_problem(
            test_utils::create_location_grid(3, 3),
            test_utils::create_basic_stops(vec![1, 2, 3, 4, 5, 6, 7, 8]),
            test_utils::create_basic_vehicles(vec![0, 0]),
        )
    }

    #[tokio::test]
    async fn test_solve_job() {
        let manager = SolverManager::default();
        let params = SolverParams {
            terminations: vec![Termination::Iterations(10)],
            threads: Threads::Single,
            ..SolverParams::default()
        };

        let (job_id, handle) = manager.solve(create_problem(), params).await;
        let solution = handle.await.unwrap().unwrap();

        assert_eq!(manager.get_status(&job_id).await, Some(SolverStatus::Completed));
        assert!(solution.unassigned_stops.is_empty());
        assert_eq!(solution.iterations, 10);

        let polled = manager.get_solution(&job_id).await.unwrap().unwrap();
        assert_eq!(polled.score, solution.score);
        assert_eq!(manager.job_ids().await, vec![job_id]);

        assert!(manager.remove(&job_id).await);
        assert_eq!(manager.get_status(&job_id).await, None);
        assert!(!manager.remove(&job_id).await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_stop_job() {
        let manager = SolverManager::default();
        let params = SolverParams {
            terminations: vec![Termination::Duration(SignedDuration::from_secs(60))],
            threads: Threads::Single,
            ..SolverParams::default()
        };

        let (job_id, handle) = manager.solve(create_problem(), params).await;
        while manager
            .get_solution(&job_id)
            .await
            .is_some_and(|solution| solution.is_err())
        {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let partial = manager.stop(&job_id).await.unwrap().unwrap();
        assert!(partial.early_terminated);

        let solution = handle.await.unwrap().unwrap();
        assert!(solution.early_terminated);
        assert!(solution.unassigned_stops.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_job() {
        let manager = SolverManager::default();

        assert_eq!(manager.get_status(&Uuid::new_v4()).await, None);
        assert!(manager.stop(&Uuid::new_v4()).await.is_none());
    }
}
