use std::{fs::File, io::BufReader, path::PathBuf, sync::Arc, time::Duration};

use clap::Args;
use comfy_table::Table;
use dispatch_matrix_providers::{
    cache::{FileCache, MatricesCache, NoCache},
    geocoding::{Geocoder, NominatimGeocoder},
    travel_matrix_client::TravelMatrixClient,
};
use dispatch_optimizer::{
    json::types::JsonVehicleRoutingProblem,
    solver::{
        solution::extract::Solution,
        solver::Solver,
        solver_params::{SolverParams, Termination, Threads},
    },
};
use indicatif::ProgressBar;
use tracing::{info, warn};

use crate::{config::Config, file_utils, parsers};

#[derive(Args)]
pub struct SolveArgs {
    /// The request to solve
    #[arg(short = 'i', long)]
    input: PathBuf,

    /// Overrides the time budget of the request (e.g., "30s", "5m", "PT1H30M")
    #[arg(short, long, value_parser = parsers::parse_duration)]
    timeout: Option<jiff::SignedDuration>,

    /// Overrides the maximum number of iterations of the request
    #[arg(long, short = 'n')]
    iterations: Option<usize>,

    #[arg(long)]
    threads: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    /// Writes the solution to this file instead of stdout
    #[arg(long, short = 'o')]
    out: Option<PathBuf>,
}

impl SolveArgs {
    fn apply(&self, params: &mut SolverParams) {
        if let Some(timeout) = self.timeout {
            params
                .terminations
                .retain(|termination| !matches!(termination, Termination::Duration(_)));
            params.terminations.push(Termination::Duration(timeout));
        }

        if let Some(iterations) = self.iterations {
            params
                .terminations
                .retain(|termination| !matches!(termination, Termination::Iterations(_)));
            params.terminations.push(Termination::Iterations(iterations));
        }

        if let Some(threads) = self.threads {
            params.threads = Threads::Multi(threads);
        }

        if let Some(seed) = self.seed {
            params.seed = seed;
        }
    }
}

pub async fn run(args: SolveArgs, config: &Config) -> anyhow::Result<()> {
    let geocoder = NominatimGeocoder::new(config.geocoder_params());

    match &config.cache_folder {
        Some(folder) => {
            std::fs::create_dir_all(folder)?;
            let client = TravelMatrixClient::new(config.client_params(), FileCache::new(folder)?);
            solve(args, &client, &geocoder).await
        }
        None => {
            let client = TravelMatrixClient::new(config.client_params(), NoCache);
            solve(args, &client, &geocoder).await
        }
    }
}

async fn solve(
    args: SolveArgs,
    client: &TravelMatrixClient<impl MatricesCache>,
    geocoder: &impl Geocoder,
) -> anyhow::Result<()> {
    let f = File::open(&args.input)?;
    let request: JsonVehicleRoutingProblem = serde_json::from_reader(BufReader::new(f))?;

    let mut params = request.solver_params();
    args.apply(&mut params);

    let problem = request.build_problem(client, geocoder).await?;
    info!(
        "Solving {} stops with {} vehicles",
        problem.stops().len(),
        problem.vehicles().len()
    );

    let solver = Arc::new(Solver::new(problem, params));

    let spinner = ProgressBar::new_spinner();
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message("solving...");

    let mut handle = tokio::task::spawn_blocking({
        let solver = Arc::clone(&solver);
        move || solver.solve()
    });

    let result = tokio::select! {
        result = &mut handle => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, stopping the search");
            solver.stop();
            handle.await
        }
    };

    spinner.finish_and_clear();
    let solution = result??;

    info!(
        "Finished: routes = {}, cost = {:.2}, unassigned = {}, iterations = {}",
        solution
            .routes
            .iter()
            .filter(|route| !route.stops.is_empty())
            .count(),
        solution.total_cost,
        solution.unassigned_stops.len(),
        solution.iterations,
    );
    eprintln!("{}", summary_table(&solution));

    let json = serde_json::to_string_pretty(&solution)?;
    match args.out {
        Some(out) => file_utils::write_output(&out, &json)?,
        None => println!("{json}"),
    }

    Ok(())
}

fn summary_table(solution: &Solution) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        "Vehicle", "Stops", "Load", "Distance (km)", "Duration", "Waiting", "Cost",
    ]);

    for route in &solution.routes {
        table.add_row(vec![
            route.vehicle_id.clone(),
            route.stops.len().to_string(),
            format!("{:.1}", route.load),
            format!("{:.2}", route.distance / 1000.0),
            format!("{:#}", route.duration),
            format!("{:#}", route.waiting_duration),
            format!("{:.2}", route.cost),
        ]);
    }

    table.add_row(vec![
        String::from("Total"),
        solution.assigned_stops_count().to_string(),
        String::new(),
        format!("{:.2}", solution.total_distance / 1000.0),
        format!("{:#}", solution.total_duration),
        String::new(),
        format!("{:.2}", solution.total_cost),
    ]);

    table
}

#[cfg(test)]
mod tests {
    use jiff::SignedDuration;

    use super::*;

    fn args() -> SolveArgs {
        SolveArgs {
            input: PathBuf::from("request.json"),
            timeout: None,
            iterations: None,
            threads: None,
            seed: None,
            out: None,
        }
    }

    #[test]
    fn test_overrides_replace_terminations() {
        let mut params = SolverParams {
            terminations: vec![
                Termination::Iterations(100),
                Termination::Duration(SignedDuration::from_secs(60)),
                Termination::IterationsWithoutImprovement(20),
            ],
            ..SolverParams::default()
        };

        let args = SolveArgs {
            timeout: Some(SignedDuration::from_secs(5)),
            iterations: Some(10),
            seed: Some(3),
            ..args()
        };
        args.apply(&mut params);

        assert_eq!(
            params.terminations,
            vec![
                Termination::IterationsWithoutImprovement(20),
                Termination::Duration(SignedDuration::from_secs(5)),
                Termination::Iterations(10),
            ]
        );
        assert_eq!(params.seed, 3);
    }

    #[test]
    fn test_no_overrides() {
        let mut params = SolverParams::default();
        let terminations = params.terminations.clone();

        args().apply(&mut params);

        assert_eq!(params.terminations, terminations);
        assert_eq!(params.seed, SolverParams::default().seed);
    }

    #[tokio::test]
    async fn test_solve_fixture() {
        let out = std::env::temp_dir().join("dispatch_cli_test_solve_fixture.json");
        let args = SolveArgs {
            input: std::env::current_dir()
                .unwrap()
                .join("tests/fixtures/requests/nested/two_stops.json"),
            out: Some(out.clone()),
            threads: Some(1),
            ..args()
        };
        let client = TravelMatrixClient::new(Config::default().client_params(), NoCache);
        let geocoder = NominatimGeocoder::new(Config::default().geocoder_params());

        solve(args, &client, &geocoder).await.unwrap();

        let solution: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(solution["unassigned_stops"], serde_json::json!([]));
        assert_eq!(solution["routes"][0]["stops"].as_array().unwrap().len(), 2);
    }
}
