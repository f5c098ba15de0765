use jiff::{SignedDuration, Timestamp};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Window in which the service of a stop must start. A missing bound is unbounded.
#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TimeWindow {
    start: Option<Timestamp>,
    end: Option<Timestamp>,
}

impl TimeWindow {
    pub fn new(start: Option<Timestamp>, end: Option<Timestamp>) -> Self {
        TimeWindow { start, end }
    }

    pub fn start(&self) -> Option<Timestamp> {
        self.start
    }

    pub fn end(&self) -> Option<Timestamp> {
        self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// `false` when both bounds are set and `start > end`.
    pub fn is_valid(&self) -> bool {
        match (self.start, self.end) {
            (Some(start), Some(end)) => start <= end,
            _ => true,
        }
    }

    /// `Timestamp::MAX` stands for an overflowed schedule and never satisfies a window.
    pub fn is_satisfied(&self, arrival: Timestamp) -> bool {
        arrival < Timestamp::MAX && self.end.is_none_or(|end| arrival <= end)
    }

    pub fn waiting_duration(&self, arrival: Timestamp) -> SignedDuration {
        match self.start {
            Some(start) if arrival < start => start.duration_since(arrival),
            _ => SignedDuration::ZERO,
        }
    }

    /// Latest admissible arrival, `Timestamp::MAX` when the window has no end.
    pub fn latest(&self) -> Timestamp {
        self.end.unwrap_or(Timestamp::MAX)
    }
}

#[derive(Default)]
pub struct TimeWindowBuilder {
    start: Option<Timestamp>,
    end: Option<Timestamp>,
}

impl TimeWindowBuilder {
    pub fn with_start(mut self, start: Timestamp) -> Self {
        self.start = Some(start);
        self
    }

    pub fn with_end(mut self, end: Timestamp) -> Self {
        self.end = Some(end);
        self
    }

    pub fn build(self) -> TimeWindow {
        TimeWindow {
            start: self.start,
            end: self.end,
        }
    }
}
