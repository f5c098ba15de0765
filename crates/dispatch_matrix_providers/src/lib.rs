pub mod as_the_crow_flies;
pub mod cache;
pub mod error;
pub mod geocoding;
pub mod google_api;
pub mod matrix_options;
pub mod matrix_provider;
pub mod travel_matrices;
pub mod travel_matrix_client;
pub mod travel_matrix_provider;
