use dispatch_matrix_providers::{
    cache::MatricesCache,
    error::MatrixProviderError,
    geocoding::{Geocoder, GeocodingError},
    matrix_options::MatrixOptions,
    travel_matrix_client::TravelMatrixClient,
    travel_matrix_provider::TravelMatrixProvider,
};
use fxhash::FxHashMap;
use jiff::SignedDuration;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::{
    problem::{
        cost_weights::{CostWeights, Objective},
        location::{Location, LocationIdx},
        stop::{Stop, StopBuilder},
        time_window::TimeWindow,
        validation::ValidationError,
        vehicle::{Vehicle, VehicleBuilder, VehicleShift},
        vehicle_routing_problem::{VehicleRoutingProblem, VehicleRoutingProblemBuilder},
    },
    solver::{
        ruin::ruin_strategy::RuinStrategy,
        solver_params::{SolverParams, Termination, Threads},
    },
};

#[derive(Debug, Error)]
pub enum BuildProblemError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Provider(MatrixProviderError),
}

impl From<MatrixProviderError> for BuildProblemError {
    /// Pairs the provider could not resolve make the input incomplete.
    fn from(error: MatrixProviderError) -> Self {
        match error {
            MatrixProviderError::PartialCoverage { missing, total, .. } => {
                BuildProblemError::Validation(ValidationError::IncompleteMatrix {
                    expected: total,
                    actual: total - missing.len(),
                })
            }
            error => BuildProblemError::Provider(error),
        }
    }
}

#[derive(Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "VehicleRoutingProblem")]
pub struct JsonVehicleRoutingProblem {
    pub id: Option<String>,
    pub locations: Vec<JsonLocation>,
    pub stops: Vec<JsonStop>,
    pub vehicles: Vec<JsonVehicle>,

    #[serde(default)]
    pub matrix_provider: TravelMatrixProvider,
    #[serde(default)]
    pub matrix_options: MatrixOptions,

    /// Preset of cost weights, ignored when `cost_weights` is set
    pub objective: Option<Objective>,
    pub cost_weights: Option<CostWeights>,

    #[serde(default)]
    pub solver: JsonSolverParams,
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "Location")]
pub struct JsonLocation {
    pub id: String,
    /// `[lon, lat]`, geocoded from `address` when missing
    pub coordinates: Option<[f64; 2]>,
    pub address: Option<String>,
}

impl JsonLocation {
    async fn geocode(
        &self,
        address: &str,
        geocoder: &impl Geocoder,
    ) -> Result<geo::Point, ValidationError> {
        let point = geocoder.geocode(address).await.map_err(|error| match error {
            GeocodingError::Ambiguous { display_name, .. } => ValidationError::AmbiguousAddress {
                location_id: self.id.clone(),
                address: address.to_owned(),
                matched: display_name,
            },
            error => ValidationError::UnresolvedAddress {
                location_id: self.id.clone(),
                address: address.to_owned(),
                reason: error.to_string(),
            },
        })?;

        debug!("Geocoded {} to {:?}", self.id, point);
        Ok(point)
    }
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "Stop")]
pub struct JsonStop {
    pub id: String,
    pub location_id: String,
    pub demand: Option<f64>,
    /// Service duration on site
    pub duration: Option<SignedDuration>,
    pub time_window: Option<TimeWindow>,
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "Vehicle")]
pub struct JsonVehicle {
    pub id: String,
    pub capacity: f64,
    pub start_location_id: String,
    /// Defaults to the start location
    pub end_location_id: Option<String>,
    pub should_return_to_depot: Option<bool>,
    pub shift: Option<VehicleShift>,
}

#[derive(Serialize, Deserialize, JsonSchema, Default, Debug, Clone)]
#[serde(deny_unknown_fields, rename = "SolverParams")]
pub struct JsonSolverParams {
    pub max_iterations: Option<usize>,
    pub max_iterations_without_improvement: Option<usize>,
    /// Wall-clock limit of the search, zero keeps the constructed solution
    pub time_budget: Option<SignedDuration>,
    pub seed: Option<u64>,
    /// Number of nearest stops considered by inter-route moves
    pub neighbors: Option<usize>,
    pub threads: Option<usize>,
    pub ruin_strategies: Option<Vec<RuinStrategy>>,
}

impl JsonSolverParams {
    pub fn solver_params(&self) -> SolverParams {
        let default = SolverParams::default();

        let mut terminations = vec![];
        if let Some(max_iterations) = self.max_iterations {
            terminations.push(Termination::Iterations(max_iterations));
        }
        if let Some(max_iterations) = self.max_iterations_without_improvement {
            terminations.push(Termination::IterationsWithoutImprovement(max_iterations));
        }
        if let Some(time_budget) = self.time_budget {
            terminations.push(Termination::Duration(time_budget));
        }

        let mut ruin = default.ruin.clone();
        if let Some(ruin_strategies) = &self.ruin_strategies {
            ruin.ruin_strategies = ruin_strategies.clone();
        }

        SolverParams {
            terminations: if terminations.is_empty() {
                default.terminations
            } else {
                terminations
            },
            seed: self.seed.unwrap_or(default.seed),
            neighbors: self.neighbors.unwrap_or(default.neighbors),
            threads: self.threads.map_or(Threads::Auto, Threads::Multi),
            ruin,
        }
    }
}

fn resolve_location(
    location_ids: &FxHashMap<&str, LocationIdx>,
    referenced_by: &str,
    location_id: &str,
) -> Result<LocationIdx, ValidationError> {
    location_ids
        .get(location_id)
        .copied()
        .ok_or_else(|| ValidationError::UnknownLocation {
            referenced_by: referenced_by.to_owned(),
            location_id: location_id.to_owned(),
        })
}

impl JsonVehicleRoutingProblem {
    pub fn solver_params(&self) -> SolverParams {
        self.solver.solver_params()
    }

    pub fn cost_weights(&self) -> CostWeights {
        match (self.cost_weights, self.objective) {
            (Some(cost_weights), _) => cost_weights,
            (None, Some(objective)) => CostWeights::for_objective(objective),
            (None, None) => CostWeights::default(),
        }
    }

    /// Locations of the request, address-only ones geocoded one after the other.
    /// Each distinct address is only geocoded once.
    #[instrument(skip_all, level = "debug")]
    pub async fn resolve_locations(
        &self,
        geocoder: &impl Geocoder,
    ) -> Result<Vec<Location>, ValidationError> {
        let mut geocoded: FxHashMap<&str, geo::Point> = FxHashMap::default();
        let mut locations = Vec::with_capacity(self.locations.len());

        for location in &self.locations {
            let point = match (location.coordinates, location.address.as_deref()) {
                (Some([lon, lat]), _) => geo::Point::new(lon, lat),
                (None, Some(address)) => match geocoded.get(address) {
                    Some(point) => *point,
                    None => {
                        let point = location.geocode(address, geocoder).await?;
                        geocoded.insert(address, point);
                        point
                    }
                },
                (None, None) => {
                    return Err(ValidationError::MissingCoordinates(location.id.clone()));
                }
            };

            let resolved = Location::from_lon_lat(location.id.clone(), point.x(), point.y());
            locations.push(match &location.address {
                Some(address) => resolved.with_address(address.clone()),
                None => resolved,
            });
        }

        Ok(locations)
    }

    /// Resolves the references of the request, geocodes the address-only locations
    /// and fetches its travel matrices.
    #[instrument(skip_all, level = "debug")]
    pub async fn build_problem(
        self,
        client: &TravelMatrixClient<impl MatricesCache>,
        geocoder: &impl Geocoder,
    ) -> Result<VehicleRoutingProblem, BuildProblemError> {
        let mut builder = VehicleRoutingProblemBuilder::default();
        builder.set_cost_weights(self.cost_weights());

        if let Some(id) = &self.id {
            builder.set_id(id.clone());
        }

        let (stops, vehicles) = {
            let location_ids = self
                .locations
                .iter()
                .enumerate()
                .map(|(index, location)| (location.id.as_str(), LocationIdx::new(index)))
                .collect::<FxHashMap<_, _>>();

            let stops = self
                .stops
                .iter()
                .map(|stop| -> Result<Stop, ValidationError> {
                    let location_id = resolve_location(&location_ids, &stop.id, &stop.location_id)?;
                    let mut builder = StopBuilder::new(stop.id.clone(), location_id);

                    if let Some(demand) = stop.demand {
                        builder.set_demand(demand);
                    }

                    if let Some(duration) = stop.duration {
                        builder.set_duration(duration);
                    }

                    if let Some(time_window) = stop.time_window {
                        builder.set_time_window(time_window);
                    }

                    Ok(builder.build())
                })
                .collect::<Result<Vec<_>, _>>()?;

            let vehicles = self
                .vehicles
                .iter()
                .map(|vehicle| -> Result<Vehicle, ValidationError> {
                    let start_location_id =
                        resolve_location(&location_ids, &vehicle.id, &vehicle.start_location_id)?;
                    let mut builder = VehicleBuilder::new(vehicle.id.clone(), start_location_id);
                    builder.set_capacity(vehicle.capacity);

                    if let Some(end_location_id) = &vehicle.end_location_id {
                        builder.set_end_location_id(resolve_location(
                            &location_ids,
                            &vehicle.id,
                            end_location_id,
                        )?);
                    }

                    if let Some(should_return) = vehicle.should_return_to_depot {
                        builder.set_return(should_return);
                    }

                    if let Some(shift) = vehicle.shift {
                        builder.set_shift(shift);
                    }

                    Ok(builder.build())
                })
                .collect::<Result<Vec<_>, _>>()?;

            (stops, vehicles)
        };

        let locations = self.resolve_locations(geocoder).await?;

        let travel_matrices = client
            .fetch_matrix(&locations, &self.matrix_provider, &self.matrix_options)
            .await?;
        debug!(
            "Fetched {} matrices for {} locations",
            self.matrix_provider.name(),
            locations.len()
        );

        builder
            .set_locations(locations)
            .set_stops(stops)
            .set_vehicles(vehicles)
            .set_travel_matrices(travel_matrices);

        Ok(builder.build()?)
    }
}
