pub mod cost_weights;
pub mod location;
pub mod service_location_index;
pub mod stop;
pub mod time_window;
pub mod travel_cost_matrix;
pub mod validation;
pub mod vehicle;
pub mod vehicle_routing_problem;
