use clap::{Parser, Subcommand};

#[cfg(not(feature = "dhat-heap"))]
use mimalloc::MiMalloc;

use crate::{
    config::Config, matrix::MatrixArgs, risk::RiskArgs, schema::SchemaSubcommands,
    solve::SolveArgs,
};

mod config;
mod file_utils;
mod matrix;
mod parsers;
mod risk;
mod schema;
mod solve;

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

#[cfg(not(feature = "dhat-heap"))]
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Plans the routes of a request and prints the solution
    #[command(visible_alias = "s")]
    Solve {
        #[command(flatten)]
        args: SolveArgs,
    },
    /// Fetches the travel matrices of requests, filling the cache
    Matrix {
        #[command(flatten)]
        args: MatrixArgs,
    },
    /// Scores the maintenance risk of a fleet
    Risk {
        #[command(flatten)]
        args: RiskArgs,
    },
    Schema {
        #[command(subcommand)]
        commands: SchemaSubcommands,
    },
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    let config = Config::from_env()?;

    match cli.command {
        Commands::Solve { args } => solve::run(args, &config).await?,
        Commands::Matrix { args } => matrix::run(args, &config).await?,
        Commands::Risk { args } => risk::run(args)?,
        Commands::Schema { commands } => schema::run(commands)?,
    }

    Ok(())
}
