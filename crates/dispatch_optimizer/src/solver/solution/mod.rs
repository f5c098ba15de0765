pub mod extract;
pub mod route;
pub mod route_id;
pub mod utils;
pub mod working_solution;
