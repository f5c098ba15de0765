use super::ruin_strategy::RuinStrategy;

#[derive(Clone, Debug)]
pub struct RuinParams {
    pub ruin_strategies: Vec<RuinStrategy>,
    pub ruin_minimum_size: usize,
    pub ruin_maximum_size: usize,
}

impl Default for RuinParams {
    fn default() -> Self {
        Self {
            ruin_strategies: vec![RuinStrategy::Random, RuinStrategy::Radial],
            ruin_minimum_size: 2,
            ruin_maximum_size: 12,
        }
    }
}
