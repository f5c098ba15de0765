use std::{fs::File, io::BufReader, path::PathBuf};

use clap::Args;
use dispatch_matrix_providers::{
    cache::{FileCache, MatricesCache, NoCache},
    geocoding::{Geocoder, NominatimGeocoder},
    travel_matrices::TravelMatrices,
    travel_matrix_client::TravelMatrixClient,
};
use dispatch_optimizer::json::types::JsonVehicleRoutingProblem;
use indicatif::ProgressBar;
use tracing::{info, warn};

use crate::{config::Config, file_utils};

#[derive(Args)]
pub struct MatrixArgs {
    /// A request file, or a folder of requests to warm the cache with
    #[arg(short = 'i', long)]
    input: PathBuf,

    /// Writes the matrices of a single request to this file
    #[arg(long, short = 'o')]
    out: Option<PathBuf>,
}

pub async fn run(args: MatrixArgs, config: &Config) -> anyhow::Result<()> {
    let geocoder = NominatimGeocoder::new(config.geocoder_params());

    match &config.cache_folder {
        Some(folder) => {
            std::fs::create_dir_all(folder)?;
            let client = TravelMatrixClient::new(config.client_params(), FileCache::new(folder)?);
            fetch_all(args, &client, &geocoder).await
        }
        None => {
            let client = TravelMatrixClient::new(config.client_params(), NoCache);
            fetch_all(args, &client, &geocoder).await
        }
    }
}

async fn fetch_matrix(
    client: &TravelMatrixClient<impl MatricesCache>,
    geocoder: &impl Geocoder,
    file: &PathBuf,
) -> anyhow::Result<TravelMatrices> {
    let f = File::open(file)?;
    let request: JsonVehicleRoutingProblem = serde_json::from_reader(BufReader::new(f))?;
    let locations = request.resolve_locations(geocoder).await?;

    let matrices = client
        .fetch_matrix(
            &locations,
            &request.matrix_provider,
            &request.matrix_options,
        )
        .await?;

    Ok(matrices)
}

async fn fetch_all(
    args: MatrixArgs,
    client: &TravelMatrixClient<impl MatricesCache>,
    geocoder: &impl Geocoder,
) -> anyhow::Result<()> {
    let paths = file_utils::input_files(&args.input)?;

    if let Some(out) = &args.out {
        let [path] = paths.as_slice() else {
            anyhow::bail!("--out needs a single request, found {}", paths.len());
        };

        let matrices = fetch_matrix(client, geocoder, path).await?;
        file_utils::write_output(out, &serde_json::to_string(&matrices)?)?;
        info!("Wrote {} entries to {}", matrices.distances.len(), out.display());

        return Ok(());
    }

    let loading_bar = ProgressBar::new(paths.len() as u64);
    let mut failures = 0;

    for path in &paths {
        if let Err(err) = fetch_matrix(client, geocoder, path).await {
            warn!("Failed to fetch the matrix of {}: {err}", path.display());
            failures += 1;
        }

        loading_bar.inc(1);
    }

    loading_bar.finish_and_clear();
    info!("Fetched {} matrices, {failures} failed", paths.len() - failures);

    Ok(())
}
