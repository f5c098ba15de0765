use std::{
    cmp::Ordering,
    iter,
    ops::{Add, AddAssign},
};

use schemars::JsonSchema;
use serde::Serialize;

/// Objective of a solution, compared lexicographically: fewer unassigned stops first,
/// then the weighted travel cost, then the travelled distance.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, JsonSchema)]
pub struct Score {
    pub unassigned_stops: usize,
    pub cost: f64,
    pub distance: f64,
}

impl Score {
    pub const MAX: Score = Score {
        unassigned_stops: usize::MAX,
        cost: f64::MAX,
        distance: f64::MAX,
    };

    pub const ZERO: Score = Score {
        unassigned_stops: 0,
        cost: 0.0,
        distance: 0.0,
    };

    pub fn new(unassigned_stops: usize, cost: f64, distance: f64) -> Self {
        Score {
            unassigned_stops,
            cost,
            distance,
        }
    }

    pub fn is_better_than(&self, other: &Score) -> bool {
        self < other
    }
}

impl Eq for Score {}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.unassigned_stops
            .cmp(&other.unassigned_stops)
            .then_with(|| self.cost.total_cmp(&other.cost))
            .then_with(|| self.distance.total_cmp(&other.distance))
    }
}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl iter::Sum for Score {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, score| acc + score)
    }
}

impl Add<Score> for Score {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Score {
            unassigned_stops: self.unassigned_stops + other.unassigned_stops,
            cost: self.cost + other.cost,
            distance: self.distance + other.distance,
        }
    }
}

impl AddAssign<Score> for Score {
    fn add_assign(&mut self, other: Score) {
        self.unassigned_stops += other.unassigned_stops;
        self.cost += other.cost;
        self.distance += other.distance;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_sum() {
        let scores = vec![
            Score::new(1, 10.0, 100.0),
            Score::new(0, 5.0, 50.0),
            Score::new(2, 1.0, 10.0),
        ];
        let total: Score = scores.into_iter().sum();

        assert_eq!(total, Score::new(3, 16.0, 160.0));
    }

    #[test]
    fn test_score_cmp() {
        // Unassigned stops dominate costs
        assert!(Score::new(0, 1000.0, 1000.0) < Score::new(1, 1.0, 1.0));

        // Costs dominate distances
        assert!(Score::new(0, 10.0, 1000.0) < Score::new(0, 11.0, 1.0));

        // Distance breaks ties
        assert!(Score::new(0, 10.0, 5.0) < Score::new(0, 10.0, 6.0));
        assert!(Score::new(0, 10.0, 5.0).is_better_than(&Score::new(0, 10.0, 6.0)));
        assert!(!Score::new(0, 10.0, 5.0).is_better_than(&Score::new(0, 10.0, 5.0)));

        let scores = [
            Score::new(0, 3.0, 1.0),
            Score::new(0, 2.0, 9.0),
            Score::new(1, 0.0, 0.0),
        ];
        assert_eq!(scores.iter().min(), Some(&Score::new(0, 2.0, 9.0)));
        assert_eq!(Score::MAX.cmp(&Score::ZERO), Ordering::Greater);
    }
}
