use crate::solver::solution::working_solution::WorkingSolution;

use super::{ruin_context::RuinContext, ruin_solution::RuinSolution};

/// Removes a random stop and the assigned stops closest to it.
pub struct RuinRadial;

impl RuinSolution for RuinRadial {
    fn ruin_solution<R>(
        &self,
        solution: &mut WorkingSolution,
        RuinContext {
            rng,
            num_stops_to_remove,
            problem,
        }: RuinContext<R>,
    ) where
        R: rand::Rng,
    {
        if num_stops_to_remove == 0 || problem.stops().is_empty() {
            return;
        }

        let center = problem.stop_location_id(problem.random_stop(rng));

        let mut remaining_stops_to_remove = num_stops_to_remove;
        for stop_id in problem.nearest_stops_of_location(center) {
            if solution.remove_stop(stop_id) {
                remaining_stops_to_remove -= 1;
            }

            if remaining_stops_to_remove == 0 {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{
        problem::stop::StopIdx,
        solver::{
            ruin::{
                ruin_context::RuinContext, ruin_radial::RuinRadial, ruin_solution::RuinSolution,
            },
            solution::route_id::RouteIdx,
        },
        test_utils::{self, TestRoute},
    };

    #[test]
    fn test_radial_ruin() {
        //
        //  (12) (13) (14) (15)
        //
        //  (8)* (9)  (10)* (11)
        //
        //  (4)  (5)  (6)* (7)
        //
        //  (0)  (1)* (2)  (3)
        //
        let problem = Arc::new(test_utils::create_test_problem(
            test_utils::create_location_grid(4, 4),
            test_utils::create_basic_stops(vec![1, 6, 8, 10]),
            test_utils::create_basic_vehicles(vec![0]),
        ));
        let mut solution = test_utils::create_test_working_solution(
            Arc::clone(&problem),
            vec![TestRoute {
                vehicle_id: 0,
                stop_ids: vec![0, 1, 2, 3],
            }],
        );

        // The first stop is the center
        let mut rng = test_utils::MockRng::new(vec![0]);
        RuinRadial.ruin_solution(
            &mut solution,
            RuinContext {
                problem: &problem,
                rng: &mut rng,
                num_stops_to_remove: 2,
            },
        );

        assert_eq!(
            solution.route(RouteIdx::new(0)).stop_ids(),
            &[StopIdx::new(2), StopIdx::new(3)]
        );
    }

    #[test]
    fn test_radial_ruin_skips_unassigned_stops() {
        let problem = Arc::new(test_utils::create_test_problem(
            test_utils::create_location_grid(4, 4),
            test_utils::create_basic_stops(vec![1, 6, 8, 10]),
            test_utils::create_basic_vehicles(vec![0]),
        ));
        // Stop 1 is already unassigned
        let mut solution = test_utils::create_test_working_solution(
            Arc::clone(&problem),
            vec![TestRoute {
                vehicle_id: 0,
                stop_ids: vec![0, 2, 3],
            }],
        );

        let mut rng = test_utils::MockRng::new(vec![0]);
        RuinRadial.ruin_solution(
            &mut solution,
            RuinContext {
                problem: &problem,
                rng: &mut rng,
                num_stops_to_remove: 2,
            },
        );

        assert_eq!(solution.route(RouteIdx::new(0)).len(), 1);
        assert_eq!(solution.unassigned_stops().len(), 3);
    }
}
