use jiff::SignedDuration;

use super::ruin::{ruin_params::RuinParams, ruin_strategy::RuinStrategy};

#[derive(Clone, Debug)]
pub struct SolverParams {
    pub terminations: Vec<Termination>,

    /// Seed of the random generator driving the ruin phase
    pub seed: u64,

    /// Number of nearest stops considered by inter-route moves
    pub neighbors: usize,

    pub ruin: RuinParams,

    pub threads: Threads,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Termination {
    Duration(SignedDuration),
    Iterations(usize),
    IterationsWithoutImprovement(usize),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Threads {
    Single,
    Auto,
    Multi(usize),
}

impl Threads {
    pub fn number_of_threads(&self) -> usize {
        match self {
            Threads::Single => 1,
            Threads::Multi(num) => (*num).max(1),
            Threads::Auto => std::thread::available_parallelism().map_or(1, |n| n.get()),
        }
    }
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            terminations: vec![
                Termination::IterationsWithoutImprovement(2000),
                Termination::Iterations(20000),
                Termination::Duration(SignedDuration::from_secs(30)),
            ],
            seed: 0,
            neighbors: 10,
            ruin: RuinParams::default(),
            threads: Threads::Auto,
        }
    }
}

impl SolverParams {
    pub fn ruin_strategies(&self) -> &[RuinStrategy] {
        &self.ruin.ruin_strategies
    }

    /// The tightest wall-clock limit, if any.
    pub fn time_budget(&self) -> Option<SignedDuration> {
        self.terminations
            .iter()
            .filter_map(|termination| match termination {
                Termination::Duration(duration) => Some(*duration),
                _ => None,
            })
            .min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_budget() {
        let params = SolverParams {
            terminations: vec![
                Termination::Duration(SignedDuration::from_secs(10)),
                Termination::Iterations(5),
                Termination::Duration(SignedDuration::from_secs(3)),
            ],
            ..SolverParams::default()
        };
        assert_eq!(params.time_budget(), Some(SignedDuration::from_secs(3)));

        let params = SolverParams {
            terminations: vec![Termination::Iterations(5)],
            ..SolverParams::default()
        };
        assert_eq!(params.time_budget(), None);
        assert_eq!(Threads::Multi(0).number_of_threads(), 1);
    }
}
