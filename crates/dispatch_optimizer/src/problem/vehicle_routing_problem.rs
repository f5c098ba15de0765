use dispatch_matrix_providers::{error::MatrixProviderError, travel_matrices::TravelMatrices};
use fxhash::FxHashSet;
use jiff::SignedDuration;
use tracing::warn;

use super::{
    cost_weights::CostWeights,
    location::{Location, LocationIdx},
    service_location_index::ServiceLocationIndex,
    stop::{Stop, StopIdx},
    travel_cost_matrix::{Cost, Distance, TravelCostMatrix},
    validation::{ValidationError, ValidationWarning},
    vehicle::{Vehicle, VehicleIdx},
};

/// Longest travel time or service duration a problem accepts, one year.
pub const MAX_DURATION_SECS: f64 = 366.0 * 24.0 * 3600.0;

pub struct VehicleRoutingProblem {
    id: Option<String>,
    locations: Vec<Location>,
    stops: Vec<Stop>,
    vehicles: Vec<Vehicle>,
    travel_costs: TravelCostMatrix,
    cost_weights: CostWeights,
    service_location_index: ServiceLocationIndex,
    warnings: Vec<ValidationWarning>,
}

impl VehicleRoutingProblem {
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    pub fn stop(&self, stop_id: StopIdx) -> &Stop {
        &self.stops[stop_id]
    }

    pub fn stop_location_id(&self, stop_id: StopIdx) -> LocationIdx {
        self.stops[stop_id].location_id()
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn vehicle(&self, vehicle_id: VehicleIdx) -> &Vehicle {
        &self.vehicles[vehicle_id]
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn location(&self, location_id: LocationIdx) -> &Location {
        &self.locations[location_id]
    }

    pub fn cost_weights(&self) -> &CostWeights {
        &self.cost_weights
    }

    pub fn warnings(&self) -> &[ValidationWarning] {
        &self.warnings
    }

    pub fn random_stop<R>(&self, rng: &mut R) -> StopIdx
    where
        R: rand::Rng,
    {
        rng.random_range(0..self.stops.len()).into()
    }

    #[inline(always)]
    pub fn travel_distance(&self, from: LocationIdx, to: LocationIdx) -> Distance {
        self.travel_costs.travel_distance(from, to)
    }

    #[inline(always)]
    pub fn travel_time(&self, from: LocationIdx, to: LocationIdx) -> SignedDuration {
        self.travel_costs.travel_time(from, to)
    }

    #[inline(always)]
    pub fn travel_toll(&self, from: LocationIdx, to: LocationIdx) -> f64 {
        self.travel_costs.travel_toll(from, to)
    }

    #[inline(always)]
    pub fn travel_cost(&self, from: LocationIdx, to: LocationIdx) -> Cost {
        self.travel_costs.travel_cost(from, to)
    }

    pub fn travel_cost_or_zero(&self, from: Option<LocationIdx>, to: Option<LocationIdx>) -> Cost {
        if let (Some(from), Some(to)) = (from, to) {
            self.travel_cost(from, to)
        } else {
            0.0
        }
    }

    pub fn travel_distance_or_zero(
        &self,
        from: Option<LocationIdx>,
        to: Option<LocationIdx>,
    ) -> Distance {
        if let (Some(from), Some(to)) = (from, to) {
            self.travel_distance(from, to)
        } else {
            0.0
        }
    }

    pub fn is_symmetric(&self) -> bool {
        self.travel_costs.is_symmetric()
    }

    /// Stops ordered by increasing distance to the location, stops at the location included.
    pub fn nearest_stops_of_location(
        &self,
        location_id: LocationIdx,
    ) -> impl Iterator<Item = StopIdx> {
        let location = &self.locations[location_id];
        self.service_location_index.nearest_neighbor_iter(location)
    }

    /// Stops ordered by increasing distance to `stop_id`, `stop_id` excluded.
    pub fn nearest_stops(&self, stop_id: StopIdx) -> impl Iterator<Item = StopIdx> {
        self.nearest_stops_of_location(self.stop_location_id(stop_id))
            .filter(move |&other| other != stop_id)
    }

    pub fn total_demand(&self) -> f64 {
        self.stops.iter().map(|stop| stop.demand()).sum()
    }

    pub fn total_capacity(&self) -> f64 {
        self.vehicles.iter().map(|vehicle| vehicle.capacity()).sum()
    }
}

#[derive(Default)]
pub struct VehicleRoutingProblemBuilder {
    id: Option<String>,
    locations: Option<Vec<Location>>,
    stops: Option<Vec<Stop>>,
    vehicles: Option<Vec<Vehicle>>,
    travel_matrices: Option<TravelMatrices>,
    cost_weights: Option<CostWeights>,
}

impl VehicleRoutingProblemBuilder {
    pub fn set_id(&mut self, id: impl Into<String>) -> &mut VehicleRoutingProblemBuilder {
        self.id = Some(id.into());
        self
    }

    pub fn set_locations(&mut self, locations: Vec<Location>) -> &mut VehicleRoutingProblemBuilder {
        self.locations = Some(locations);
        self
    }

    pub fn set_stops(&mut self, stops: Vec<Stop>) -> &mut VehicleRoutingProblemBuilder {
        self.stops = Some(stops);
        self
    }

    pub fn set_vehicles(&mut self, vehicles: Vec<Vehicle>) -> &mut VehicleRoutingProblemBuilder {
        self.vehicles = Some(vehicles);
        self
    }

    pub fn set_travel_matrices(
        &mut self,
        travel_matrices: TravelMatrices,
    ) -> &mut VehicleRoutingProblemBuilder {
        self.travel_matrices = Some(travel_matrices);
        self
    }

    pub fn set_cost_weights(
        &mut self,
        cost_weights: CostWeights,
    ) -> &mut VehicleRoutingProblemBuilder {
        self.cost_weights = Some(cost_weights);
        self
    }

    pub fn build(self) -> Result<VehicleRoutingProblem, ValidationError> {
        let locations = self.locations.unwrap_or_default();
        let stops = self.stops.unwrap_or_default();
        let vehicles = self.vehicles.unwrap_or_default();
        let cost_weights = self.cost_weights.unwrap_or_default();

        if vehicles.is_empty() {
            return Err(ValidationError::EmptyFleet);
        }

        if !cost_weights.is_valid() {
            return Err(ValidationError::InvalidCostWeights);
        }

        validate_locations(&locations)?;
        validate_stops(&stops, locations.len())?;
        validate_vehicles(&vehicles, locations.len())?;

        let travel_matrices = self.travel_matrices.unwrap_or(TravelMatrices {
            distances: vec![],
            times: vec![],
            tolls: None,
        });
        validate_matrices(&travel_matrices, locations.len())?;

        let mut warnings = vec![];
        let total_demand = stops.iter().map(|stop| stop.demand()).sum::<f64>();
        let total_capacity = vehicles
            .iter()
            .map(|vehicle| vehicle.capacity())
            .sum::<f64>();
        if total_demand > total_capacity {
            let warning = ValidationWarning::DemandExceedsCapacity {
                total_demand,
                total_capacity,
            };
            warn!("{}, some stops will be left unassigned", warning);
            warnings.push(warning);
        }

        let service_location_index = ServiceLocationIndex::new(&locations, &stops);
        let travel_costs = TravelCostMatrix::new(travel_matrices, &cost_weights);

        Ok(VehicleRoutingProblem {
            id: self.id,
            locations,
            stops,
            vehicles,
            travel_costs,
            cost_weights,
            service_location_index,
            warnings,
        })
    }
}

fn ensure_unique<'a>(
    kind: &'static str,
    ids: impl Iterator<Item = &'a str>,
) -> Result<(), ValidationError> {
    let mut seen = FxHashSet::default();
    for id in ids {
        if !seen.insert(id) {
            return Err(ValidationError::DuplicateId {
                kind,
                id: id.to_owned(),
            });
        }
    }

    Ok(())
}

fn ensure_known_location(
    referenced_by: &str,
    location_id: LocationIdx,
    num_locations: usize,
) -> Result<(), ValidationError> {
    if location_id.get() < num_locations {
        Ok(())
    } else {
        Err(ValidationError::UnknownLocation {
            referenced_by: referenced_by.to_owned(),
            location_id: location_id.to_string(),
        })
    }
}

fn ensure_quantity(id: &str, quantity: f64) -> Result<(), ValidationError> {
    if quantity.is_finite() && quantity >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::NegativeQuantity {
            id: id.to_owned(),
            quantity,
        })
    }
}

fn validate_locations(locations: &[Location]) -> Result<(), ValidationError> {
    ensure_unique("location", locations.iter().map(|location| location.external_id()))?;

    if let Some(location) = locations
        .iter()
        .find(|location| !location.has_valid_coordinates())
    {
        return Err(ValidationError::InvalidCoordinates(
            location.external_id().to_owned(),
        ));
    }

    Ok(())
}

fn validate_stops(stops: &[Stop], num_locations: usize) -> Result<(), ValidationError> {
    ensure_unique("stop", stops.iter().map(|stop| stop.external_id()))?;

    for stop in stops {
        ensure_known_location(stop.external_id(), stop.location_id(), num_locations)?;
        ensure_quantity(stop.external_id(), stop.demand())?;

        if stop.duration().is_negative() {
            return Err(ValidationError::NegativeQuantity {
                id: stop.external_id().to_owned(),
                quantity: stop.duration().as_secs_f64(),
            });
        }

        if stop.duration().as_secs_f64() > MAX_DURATION_SECS {
            return Err(ValidationError::DurationOutOfRange {
                id: stop.external_id().to_owned(),
                seconds: stop.duration().as_secs_f64(),
                max_seconds: MAX_DURATION_SECS,
            });
        }

        if !stop.time_window().is_valid() {
            return Err(ValidationError::InvertedTimeWindow(
                stop.external_id().to_owned(),
            ));
        }
    }

    Ok(())
}

fn validate_vehicles(vehicles: &[Vehicle], num_locations: usize) -> Result<(), ValidationError> {
    ensure_unique("vehicle", vehicles.iter().map(|vehicle| vehicle.external_id()))?;

    for vehicle in vehicles {
        ensure_known_location(
            vehicle.external_id(),
            vehicle.start_location_id(),
            num_locations,
        )?;
        if let Some(end_location_id) = vehicle.end_location_id() {
            ensure_known_location(vehicle.external_id(), end_location_id, num_locations)?;
        }

        ensure_quantity(vehicle.external_id(), vehicle.capacity())?;

        if vehicle.shift().is_some_and(|shift| !shift.is_valid()) {
            return Err(ValidationError::InvertedTimeWindow(
                vehicle.external_id().to_owned(),
            ));
        }
    }

    Ok(())
}

fn validate_matrices(
    matrices: &TravelMatrices,
    num_locations: usize,
) -> Result<(), ValidationError> {
    let expected = num_locations * num_locations;

    if matrices.distances.len() != expected || matrices.times.len() != expected {
        return Err(ValidationError::IncompleteMatrix {
            expected,
            actual: matrices
                .distances
                .len()
                .min(matrices.times.len())
                .min(expected),
        });
    }

    if let Some(index) = matrices
        .times
        .iter()
        .position(|&seconds| seconds > MAX_DURATION_SECS)
    {
        return Err(ValidationError::DurationOutOfRange {
            id: format!(
                "travel from location {} to location {}",
                index / num_locations,
                index % num_locations
            ),
            seconds: matrices.times[index],
            max_seconds: MAX_DURATION_SECS,
        });
    }

    matrices
        .validate("input", num_locations)
        .map_err(|error| match error {
            MatrixProviderError::PartialCoverage { missing, total, .. } => {
                ValidationError::IncompleteMatrix {
                    expected: total,
                    actual: total - missing.len(),
                }
            }
            _ => ValidationError::IncompleteMatrix {
                expected,
                actual: 0,
            },
        })
}
