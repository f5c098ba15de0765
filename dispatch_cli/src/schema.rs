use std::path::PathBuf;

use clap::Subcommand;

use crate::file_utils;

#[derive(Subcommand)]
pub enum SchemaSubcommands {
    /// JSON schema of the solve request
    Request {
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
    },
    /// JSON schema of the solution
    Solution {
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
    },
}

pub fn run(subcommand: SchemaSubcommands) -> Result<(), anyhow::Error> {
    let (schema, out) = match subcommand {
        SchemaSubcommands::Request { out } => {
            (dispatch_optimizer::json::schema::generate_json_schema()?, out)
        }
        SchemaSubcommands::Solution { out } => (
            dispatch_optimizer::json::schema::generate_solution_json_schema()?,
            out,
        ),
    };

    match out {
        Some(out) => file_utils::write_output(&out, &schema)?,
        None => println!("{schema}"),
    }

    Ok(())
}
