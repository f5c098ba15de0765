use std::{
    cmp::Ordering,
    ops::{Add, Sub},
};

use crate::{
    problem::{
        location::LocationIdx,
        travel_cost_matrix::{Cost, Distance},
        vehicle_routing_problem::VehicleRoutingProblem,
    },
    solver::{
        ls::{
            inter_relocate::InterRelocateOperator, inter_swap::InterSwapOperator,
            inter_two_opt_star::InterTwoOptStarOperator, neighborhood::Neighborhood,
            relocate::RelocateOperator, swap::SwapOperator, two_opt::TwoOptOperator,
        },
        solution::{route_id::RouteIdx, working_solution::WorkingSolution},
    },
};

const EPSILON: f64 = 1e-6;

/// Change of the route costs and distances caused by a move.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LocalSearchDelta {
    pub cost: Cost,
    pub distance: Distance,
}

impl LocalSearchDelta {
    pub const ZERO: LocalSearchDelta = LocalSearchDelta {
        cost: 0.0,
        distance: 0.0,
    };

    /// A lower cost, or the same cost with a shorter distance.
    pub fn is_improvement(&self) -> bool {
        self.cost < -EPSILON || (self.cost.abs() <= EPSILON && self.distance < -EPSILON)
    }

    pub fn compare(&self, other: &LocalSearchDelta) -> Ordering {
        self.cost
            .total_cmp(&other.cost)
            .then_with(|| self.distance.total_cmp(&other.distance))
    }
}

impl Add for LocalSearchDelta {
    type Output = LocalSearchDelta;

    fn add(self, rhs: LocalSearchDelta) -> LocalSearchDelta {
        LocalSearchDelta {
            cost: self.cost + rhs.cost,
            distance: self.distance + rhs.distance,
        }
    }
}

impl Sub for LocalSearchDelta {
    type Output = LocalSearchDelta;

    fn sub(self, rhs: LocalSearchDelta) -> LocalSearchDelta {
        LocalSearchDelta {
            cost: self.cost - rhs.cost,
            distance: self.distance - rhs.distance,
        }
    }
}

/// An arc of a route, the end is `None` past the last stop of a vehicle that does not return.
pub type RouteArc = (LocationIdx, Option<LocationIdx>);

pub fn arcs_delta(problem: &VehicleRoutingProblem, arcs: &[RouteArc]) -> LocalSearchDelta {
    arcs.iter()
        .fold(LocalSearchDelta::ZERO, |delta, &(from, to)| LocalSearchDelta {
            cost: delta.cost + problem.travel_cost_or_zero(Some(from), to),
            distance: delta.distance + problem.travel_distance_or_zero(Some(from), to),
        })
}

pub trait LocalSearchOperator: Sized {
    /// Calls `consumer` with every move of the operator between the routes of the pair.
    fn generate_moves<C>(
        solution: &WorkingSolution,
        neighborhood: &Neighborhood,
        pair: (RouteIdx, RouteIdx),
        consumer: C,
    ) where
        C: FnMut(Self);

    fn delta(&self, solution: &WorkingSolution) -> LocalSearchDelta;
    fn is_valid(&self, solution: &WorkingSolution) -> bool;
    fn apply(&self, solution: &mut WorkingSolution);
    fn updated_routes(&self) -> Vec<RouteIdx>;
}

#[derive(Debug, Clone)]
pub enum LocalSearchMove {
    /// Moves a stop to another position of its route.
    Relocate(RelocateOperator),
    /// Exchanges two stops of the same route.
    Swap(SwapOperator),
    /// Reverses a segment of a route.
    TwoOpt(TwoOptOperator),
    /// Moves a stop to another route.
    InterRelocate(InterRelocateOperator),
    /// Exchanges two stops of different routes.
    InterSwap(InterSwapOperator),
    /// Exchanges the tails of two routes.
    InterTwoOptStar(InterTwoOptStarOperator),
}

impl LocalSearchMove {
    pub fn operator_name(&self) -> &'static str {
        match self {
            LocalSearchMove::Relocate(_) => "Relocate",
            LocalSearchMove::Swap(_) => "Swap",
            LocalSearchMove::TwoOpt(_) => "Two-Opt",
            LocalSearchMove::InterRelocate(_) => "Inter-Relocate",
            LocalSearchMove::InterSwap(_) => "Inter-Swap",
            LocalSearchMove::InterTwoOptStar(_) => "Inter-2-Opt*",
        }
    }

    pub fn delta(&self, solution: &WorkingSolution) -> LocalSearchDelta {
        match self {
            LocalSearchMove::Relocate(op) => op.delta(solution),
            LocalSearchMove::Swap(op) => op.delta(solution),
            LocalSearchMove::TwoOpt(op) => op.delta(solution),
            LocalSearchMove::InterRelocate(op) => op.delta(solution),
            LocalSearchMove::InterSwap(op) => op.delta(solution),
            LocalSearchMove::InterTwoOptStar(op) => op.delta(solution),
        }
    }

    pub fn is_valid(&self, solution: &WorkingSolution) -> bool {
        match self {
            LocalSearchMove::Relocate(op) => op.is_valid(solution),
            LocalSearchMove::Swap(op) => op.is_valid(solution),
            LocalSearchMove::TwoOpt(op) => op.is_valid(solution),
            LocalSearchMove::InterRelocate(op) => op.is_valid(solution),
            LocalSearchMove::InterSwap(op) => op.is_valid(solution),
            LocalSearchMove::InterTwoOptStar(op) => op.is_valid(solution),
        }
    }

    pub fn apply(&self, solution: &mut WorkingSolution) {
        match self {
            LocalSearchMove::Relocate(op) => op.apply(solution),
            LocalSearchMove::Swap(op) => op.apply(solution),
            LocalSearchMove::TwoOpt(op) => op.apply(solution),
            LocalSearchMove::InterRelocate(op) => op.apply(solution),
            LocalSearchMove::InterSwap(op) => op.apply(solution),
            LocalSearchMove::InterTwoOptStar(op) => op.apply(solution),
        }
    }

    pub fn updated_routes(&self) -> Vec<RouteIdx> {
        match self {
            LocalSearchMove::Relocate(op) => op.updated_routes(),
            LocalSearchMove::Swap(op) => op.updated_routes(),
            LocalSearchMove::TwoOpt(op) => op.updated_routes(),
            LocalSearchMove::InterRelocate(op) => op.updated_routes(),
            LocalSearchMove::InterSwap(op) => op.updated_routes(),
            LocalSearchMove::InterTwoOptStar(op) => op.updated_routes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_improvement() {
        assert!(
            LocalSearchDelta {
                cost: -1.0,
                distance: 50.0
            }
            .is_improvement()
        );
        assert!(
            LocalSearchDelta {
                cost: 0.0,
                distance: -10.0
            }
            .is_improvement()
        );
        assert!(
            !LocalSearchDelta {
                cost: 1e-9,
                distance: 10.0
            }
            .is_improvement()
        );
        assert!(!LocalSearchDelta::ZERO.is_improvement());
    }
}
