use std::{fs::File, io::BufReader, path::PathBuf};

use clap::Args;
use comfy_table::Table;
use dispatch_maintenance::{
    error::MaintenanceError,
    risk_provider::MaintenanceRiskProvider,
    risk_score::RiskScore,
    static_risk_provider::StaticRiskProvider,
    telemetry::VehicleTelemetry,
    telemetry_risk_model::{TelemetryRiskModel, TelemetryRiskModelParams},
};
use fxhash::FxHashMap;
use jiff::civil::Date;
use serde::Deserialize;
use tracing::warn;

#[derive(Args)]
pub struct RiskArgs {
    /// File with the telemetry or the fixed probabilities of the fleet
    #[arg(short = 'i', long)]
    input: PathBuf,

    /// Scoring date, today by default
    #[arg(long)]
    as_of: Option<Date>,
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
enum RiskSource {
    Telemetry(FxHashMap<String, VehicleTelemetry>),
    Static {
        probabilities: FxHashMap<String, f64>,
        #[serde(default = "default_horizon_days")]
        horizon_days: u32,
    },
}

fn default_horizon_days() -> u32 {
    TelemetryRiskModelParams::default().horizon_days
}

impl RiskSource {
    fn vehicle_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = match self {
            RiskSource::Telemetry(telemetry) => telemetry.keys().cloned().collect(),
            RiskSource::Static { probabilities, .. } => probabilities.keys().cloned().collect(),
        };
        ids.sort();
        ids
    }

    fn into_provider(self) -> Box<dyn MaintenanceRiskProvider> {
        match self {
            RiskSource::Telemetry(telemetry) => Box::new(TelemetryRiskModel::new(
                telemetry,
                TelemetryRiskModelParams::default(),
            )),
            RiskSource::Static {
                probabilities,
                horizon_days,
            } => Box::new(StaticRiskProvider::new(probabilities, horizon_days)),
        }
    }
}

fn score_fleet(
    source: RiskSource,
    as_of: Date,
) -> Vec<(String, Result<RiskScore, MaintenanceError>)> {
    let vehicle_ids = source.vehicle_ids();
    let provider = source.into_provider();

    vehicle_ids
        .into_iter()
        .map(|vehicle_id| {
            let score = provider.risk_score(&vehicle_id, as_of);
            (vehicle_id, score)
        })
        .collect()
}

pub fn run(args: RiskArgs) -> anyhow::Result<()> {
    let f = File::open(&args.input)?;
    let source: RiskSource = serde_json::from_reader(BufReader::new(f))?;
    let as_of = args
        .as_of
        .unwrap_or_else(|| jiff::Zoned::now().date());

    let mut table = Table::new();
    table.set_header(vec!["Vehicle", "Probability", "Level", "Horizon (days)"]);

    for (vehicle_id, score) in score_fleet(source, as_of) {
        match score {
            Ok(score) => {
                table.add_row(vec![
                    vehicle_id,
                    format!("{:.3}", score.probability),
                    format!("{:?}", score.level()),
                    score.horizon_days.to_string(),
                ]);
            }
            Err(err) => warn!("{err}"),
        }
    }

    println!("{table}");

    Ok(())
}
