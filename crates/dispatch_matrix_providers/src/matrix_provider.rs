use std::future::Future;

use crate::{
    error::MatrixProviderError, matrix_options::MatrixOptions, travel_matrices::TravelMatrices,
};

/// A source of travel matrices for a list of points.
///
/// Implementations must return complete matrices or fail with
/// [`MatrixProviderError::PartialCoverage`], never zero-filled cells.
pub trait MatrixProvider {
    fn name(&self) -> &'static str;

    fn fetch_matrix(
        &self,
        points: &[geo_types::Point],
        options: &MatrixOptions,
    ) -> impl Future<Output = Result<TravelMatrices, MatrixProviderError>> + Send;
}
