use rstar::primitives::GeomWithData;
use rstar::{AABB, PointDistance, RTree, RTreeObject};

use crate::utils::enumerate_idx::EnumerateIdx;

use super::{location::Location, stop::Stop, stop::StopIdx};

/// Planar approximation of a lon/lat point: longitudes are scaled by the cosine
/// of the mean latitude so euclidean distances track ground distances.
pub struct IndexedPoint {
    x: f64,
    y: f64,
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.x, self.y])
    }
}

impl PointDistance for IndexedPoint {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.x - point[0];
        let dy = self.y - point[1];
        dx * dx + dy * dy
    }
}

pub struct IndexedData {
    stop_id: StopIdx,
}

pub type ServiceLocationIndexObject = GeomWithData<IndexedPoint, IndexedData>;

pub struct ServiceLocationIndex {
    tree: RTree<ServiceLocationIndexObject>,
    lon_scale: f64,
}

impl ServiceLocationIndex {
    pub fn new(locations: &[Location], stops: &[Stop]) -> ServiceLocationIndex {
        let mean_lat = if stops.is_empty() {
            0.0
        } else {
            stops
                .iter()
                .map(|stop| locations[stop.location_id()].lat())
                .sum::<f64>()
                / stops.len() as f64
        };
        let lon_scale = mean_lat.to_radians().cos();

        let tree = RTree::bulk_load(
            stops
                .iter()
                .enumerate_idx::<StopIdx>()
                .map(|(stop_id, stop)| {
                    let location = &locations[stop.location_id()];
                    ServiceLocationIndexObject::new(
                        IndexedPoint {
                            x: location.lon() * lon_scale,
                            y: location.lat(),
                        },
                        IndexedData { stop_id },
                    )
                })
                .collect(),
        );

        ServiceLocationIndex { tree, lon_scale }
    }

    /// Stops ordered by increasing distance to `location`.
    pub fn nearest_neighbor_iter<'a>(
        &'a self,
        location: &Location,
    ) -> impl Iterator<Item = StopIdx> + 'a {
        self.tree
            .nearest_neighbor_iter(&[location.lon() * self.lon_scale, location.lat()])
            .map(|geom_with_data| geom_with_data.data.stop_id)
    }
}
