pub mod accepted_solution;
pub mod construction;
pub mod insertion;
pub mod ls;
pub mod recreate;
pub mod ruin;
pub mod score;
pub mod search;
pub mod solution;
pub mod solver;
pub mod solver_manager;
pub mod solver_params;
