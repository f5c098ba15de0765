use std::{path::PathBuf, time::Duration};

use dispatch_matrix_providers::{
    geocoding::NominatimGeocoderParams, google_api::GoogleMatrixClientParams,
    travel_matrix_client::TravelMatrixClientParams,
};
use tracing::debug;

const GOOGLE_API_KEY: &str = "DISPATCH_GOOGLE_API_KEY";
const CACHE_FOLDER: &str = "DISPATCH_CACHE_FOLDER";
const MATRIX_TIMEOUT: &str = "DISPATCH_MATRIX_TIMEOUT_SECS";
const GEOCODER_USER_AGENT: &str = "DISPATCH_GEOCODER_USER_AGENT";
const GEOCODER_COUNTRY_CODES: &str = "DISPATCH_GEOCODER_COUNTRY_CODES";
const MAPSCO_API_KEY: &str = "DISPATCH_MAPSCO_API_KEY";

/// Settings read from the environment, `.env.local` included.
#[derive(Debug, Default)]
pub struct Config {
    pub google_api_key: Option<String>,
    pub cache_folder: Option<PathBuf>,
    pub matrix_timeout: Option<Duration>,
    pub geocoder_user_agent: Option<String>,
    pub geocoder_country_codes: Option<String>,
    pub mapsco_api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        if let Err(err) = dotenvy::from_filename(".env.local") {
            debug!("No .env.local loaded: {err}");
        }

        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let matrix_timeout = var(MATRIX_TIMEOUT)
            .map(|secs| secs.parse::<u64>().map(Duration::from_secs))
            .transpose()
            .map_err(|err| anyhow::anyhow!("{MATRIX_TIMEOUT} is not a number of seconds: {err}"))?;

        Ok(Config {
            google_api_key: var(GOOGLE_API_KEY).filter(|key| !key.is_empty()),
            cache_folder: var(CACHE_FOLDER).map(PathBuf::from),
            matrix_timeout,
            geocoder_user_agent: var(GEOCODER_USER_AGENT).filter(|agent| !agent.is_empty()),
            geocoder_country_codes: var(GEOCODER_COUNTRY_CODES).filter(|codes| !codes.is_empty()),
            mapsco_api_key: var(MAPSCO_API_KEY).filter(|key| !key.is_empty()),
        })
    }

    pub fn client_params(&self) -> TravelMatrixClientParams {
        let default = TravelMatrixClientParams::default();

        TravelMatrixClientParams {
            timeout: self.matrix_timeout.unwrap_or(default.timeout),
            google: self
                .google_api_key
                .clone()
                .map(|api_key| GoogleMatrixClientParams { api_key }),
            ..default
        }
    }

    pub fn geocoder_params(&self) -> NominatimGeocoderParams {
        let default = NominatimGeocoderParams::default();

        NominatimGeocoderParams {
            user_agent: self
                .geocoder_user_agent
                .clone()
                .unwrap_or(default.user_agent.clone()),
            country_codes: self.geocoder_country_codes.clone(),
            mapsco_api_key: self.mapsco_api_key.clone(),
            ..default
        }
    }
}
