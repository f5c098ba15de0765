use geo::{Distance, Haversine};
use serde::Serialize;

use crate::define_index_newtype;

define_index_newtype!(LocationIdx, Location);

#[derive(Serialize, Debug, Clone)]
pub struct Location {
    external_id: String,
    point: geo::Point,
    address: Option<String>,
}

impl Location {
    pub fn from_lon_lat(external_id: impl Into<String>, lon: f64, lat: f64) -> Self {
        Self {
            external_id: external_id.into(),
            point: geo::Point::new(lon, lat),
            address: None,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    pub fn lon(&self) -> f64 {
        self.point.x()
    }

    pub fn lat(&self) -> f64 {
        self.point.y()
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn has_valid_coordinates(&self) -> bool {
        (-180.0..=180.0).contains(&self.lon()) && (-90.0..=90.0).contains(&self.lat())
    }

    pub fn haversine_distance(&self, to: &Location) -> f64 {
        Haversine.distance(self.point, to.point)
    }
}

impl From<&Location> for geo::Point<f64> {
    fn from(location: &Location) -> Self {
        location.point
    }
}
