use schemars::schema_for;

use crate::{json::types, solver::solution::extract::Solution};

pub fn generate_json_schema() -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&schema_for!(types::JsonVehicleRoutingProblem))
}

pub fn generate_solution_json_schema() -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&schema_for!(Solution))
}
