use jiff::Timestamp;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Options forwarded to the matrix provider for a single fetch.
#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, Default, PartialEq, Eq, Hash)]
#[serde(deny_unknown_fields)]
pub struct MatrixOptions {
    /// Ask the provider for traffic-aware durations when it supports them.
    #[serde(default)]
    pub traffic_aware: bool,

    /// Departure time used for time-dependent queries, `now` when absent.
    pub departure_time: Option<Timestamp>,
}

impl MatrixOptions {
    pub fn traffic_aware(departure_time: Option<Timestamp>) -> Self {
        MatrixOptions {
            traffic_aware: true,
            departure_time,
        }
    }

    /// Traffic-aware matrices depend on when they were fetched and are never cached.
    pub fn is_cacheable(&self) -> bool {
        !self.traffic_aware
    }
}
