use jiff::SignedDuration;
use serde::Serialize;

use crate::define_index_newtype;

use super::{location::LocationIdx, time_window::TimeWindow};

define_index_newtype!(StopIdx, Stop);

/// A delivery request: `demand` units dropped at `location_id`.
#[derive(Serialize, Debug, Clone)]
pub struct Stop {
    external_id: String,
    location_id: LocationIdx,
    demand: f64,
    duration: SignedDuration,
    time_window: TimeWindow,
}

impl Stop {
    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    pub fn location_id(&self) -> LocationIdx {
        self.location_id
    }

    pub fn demand(&self) -> f64 {
        self.demand
    }

    pub fn duration(&self) -> SignedDuration {
        self.duration
    }

    pub fn time_window(&self) -> &TimeWindow {
        &self.time_window
    }
}

pub struct StopBuilder {
    external_id: String,
    location_id: LocationIdx,
    demand: Option<f64>,
    duration: Option<SignedDuration>,
    time_window: Option<TimeWindow>,
}

impl StopBuilder {
    pub fn new(external_id: impl Into<String>, location_id: impl Into<LocationIdx>) -> Self {
        StopBuilder {
            external_id: external_id.into(),
            location_id: location_id.into(),
            demand: None,
            duration: None,
            time_window: None,
        }
    }

    pub fn set_demand(&mut self, demand: f64) -> &mut StopBuilder {
        self.demand = Some(demand);
        self
    }

    pub fn set_duration(&mut self, duration: SignedDuration) -> &mut StopBuilder {
        self.duration = Some(duration);
        self
    }

    pub fn set_time_window(&mut self, time_window: TimeWindow) -> &mut StopBuilder {
        self.time_window = Some(time_window);
        self
    }

    pub fn build(self) -> Stop {
        Stop {
            external_id: self.external_id,
            location_id: self.location_id,
            demand: self.demand.unwrap_or(0.0),
            duration: self.duration.unwrap_or(SignedDuration::ZERO),
            time_window: self.time_window.unwrap_or_default(),
        }
    }
}
