use jiff::{SignedDuration, Timestamp};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::define_index_newtype;

use super::location::LocationIdx;

define_index_newtype!(VehicleIdx, Vehicle);

#[derive(Serialize, Debug, Clone)]
pub struct Vehicle {
    external_id: String,
    capacity: f64,
    start_location_id: LocationIdx,
    /// `None` when the vehicle ends its route at the last stop
    end_location_id: Option<LocationIdx>,
    shift: Option<VehicleShift>,
}

impl Vehicle {
    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn start_location_id(&self) -> LocationIdx {
        self.start_location_id
    }

    pub fn end_location_id(&self) -> Option<LocationIdx> {
        self.end_location_id
    }

    pub fn should_return_to_depot(&self) -> bool {
        self.end_location_id.is_some()
    }

    pub fn shift(&self) -> Option<&VehicleShift> {
        self.shift.as_ref()
    }

    /// Departure from the start depot when nothing forces a later start.
    pub fn earliest_start_time(&self) -> Timestamp {
        self.shift
            .as_ref()
            .and_then(|shift| shift.earliest_start)
            .unwrap_or(Timestamp::UNIX_EPOCH)
    }

    pub fn latest_end_time(&self) -> Option<Timestamp> {
        self.shift.as_ref().and_then(|shift| shift.latest_end)
    }
}

/// Working hours of a vehicle.
#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct VehicleShift {
    pub earliest_start: Option<Timestamp>,
    pub latest_end: Option<Timestamp>,
}

impl VehicleShift {
    pub fn is_valid(&self) -> bool {
        match (self.earliest_start, self.latest_end) {
            (Some(start), Some(end)) => start <= end,
            _ => true,
        }
    }

    pub fn maximum_duration(&self) -> Option<SignedDuration> {
        match (self.earliest_start, self.latest_end) {
            (Some(start), Some(end)) => Some(end.duration_since(start)),
            _ => None,
        }
    }
}

pub struct VehicleBuilder {
    external_id: String,
    start_location_id: LocationIdx,
    capacity: Option<f64>,
    end_location_id: Option<LocationIdx>,
    should_return_to_depot: Option<bool>,
    shift: Option<VehicleShift>,
}

impl VehicleBuilder {
    pub fn new(external_id: impl Into<String>, start_location_id: impl Into<LocationIdx>) -> Self {
        VehicleBuilder {
            external_id: external_id.into(),
            start_location_id: start_location_id.into(),
            capacity: None,
            end_location_id: None,
            should_return_to_depot: None,
            shift: None,
        }
    }

    pub fn set_capacity(&mut self, capacity: f64) -> &mut VehicleBuilder {
        self.capacity = Some(capacity);
        self
    }

    pub fn set_end_location_id(
        &mut self,
        end_location_id: impl Into<LocationIdx>,
    ) -> &mut VehicleBuilder {
        self.end_location_id = Some(end_location_id.into());
        self
    }

    pub fn set_return(&mut self, should_return_to_depot: bool) -> &mut VehicleBuilder {
        self.should_return_to_depot = Some(should_return_to_depot);
        self
    }

    pub fn set_shift(&mut self, shift: VehicleShift) -> &mut VehicleBuilder {
        self.shift = Some(shift);
        self
    }

    pub fn build(self) -> Vehicle {
        // The end depot defaults to the start depot unless the vehicle does not return
        let end_location_id = if self.should_return_to_depot.unwrap_or(true) {
            Some(self.end_location_id.unwrap_or(self.start_location_id))
        } else {
            None
        };

        Vehicle {
            external_id: self.external_id,
            capacity: self.capacity.unwrap_or(0.0),
            start_location_id: self.start_location_id,
            end_location_id,
            shift: self.shift,
        }
    }
}
