use schemars::JsonSchema;
use serde::Serialize;
use thiserror::Error;

/// Input errors found while building a problem. Fatal, nothing is solved.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("{referenced_by} references unknown location {location_id}")]
    UnknownLocation {
        referenced_by: String,
        location_id: String,
    },

    #[error("time window of {0} starts after it ends")]
    InvertedTimeWindow(String),

    #[error("{id} has a negative or invalid quantity {quantity}")]
    NegativeQuantity { id: String, quantity: f64 },

    #[error("travel matrices cover {actual} of {expected} location pairs")]
    IncompleteMatrix { expected: usize, actual: usize },

    #[error("{id} lasts {seconds} seconds, more than the {max_seconds} seconds allowed")]
    DurationOutOfRange {
        id: String,
        seconds: f64,
        max_seconds: f64,
    },

    #[error("duplicate {kind} id {id}")]
    DuplicateId { kind: &'static str, id: String },

    #[error("location {0} has invalid coordinates")]
    InvalidCoordinates(String),

    #[error("location {0} has neither coordinates nor an address")]
    MissingCoordinates(String),

    #[error("address {address} of location {location_id} could not be geocoded: {reason}")]
    UnresolvedAddress {
        location_id: String,
        address: String,
        reason: String,
    },

    #[error("address {address} of location {location_id} is too vague, matched {matched}")]
    AmbiguousAddress {
        location_id: String,
        address: String,
        matched: String,
    },

    #[error("invalid cost weights")]
    InvalidCostWeights,

    #[error("the fleet is empty")]
    EmptyFleet,
}

/// Suspicious but solvable input, reported alongside the solution.
#[derive(Serialize, JsonSchema, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValidationWarning {
    DemandExceedsCapacity {
        total_demand: f64,
        total_capacity: f64,
    },
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationWarning::DemandExceedsCapacity {
                total_demand,
                total_capacity,
            } => write!(
                f,
                "total demand {total_demand} exceeds total fleet capacity {total_capacity}"
            ),
        }
    }
}
