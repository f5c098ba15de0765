use std::{future::Future, time::Duration};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument, warn};

pub const NOMINATIM_SEARCH_URL: &str = "https://nominatim.openstreetmap.org/search";
pub const MAPSCO_SEARCH_URL: &str = "https://geocode.maps.co/search";

/// Place kinds covering a whole area rather than a street address
const AREA_KINDS: [&str; 12] = [
    "administrative",
    "city",
    "country",
    "county",
    "district",
    "municipality",
    "postcode",
    "region",
    "state",
    "suburb",
    "town",
    "village",
];

#[derive(Debug, Error)]
pub enum GeocodingError {
    #[error("empty address")]
    EmptyAddress,

    #[error("address not found: {0}")]
    NotFound(String),

    #[error("address {address} only matches the area {display_name}, add a street and a number")]
    Ambiguous {
        address: String,
        display_name: String,
    },

    #[error("invalid coordinates returned for {0}")]
    InvalidCoordinates(String),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP error: {status} - {message}")]
    Http {
        status: reqwest::StatusCode,
        message: String,
    },
}

/// Turns a postal address into a point.
pub trait Geocoder {
    fn geocode(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<geo_types::Point, GeocodingError>> + Send;
}

/// Trims the address, collapses whitespace and normalizes the comma separators.
pub fn normalize_address(address: &str) -> String {
    address
        .split(',')
        .map(|part| part.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Deserialize, Debug)]
struct Place {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    addresstype: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

impl Place {
    fn is_area(&self) -> bool {
        self.addresstype
            .iter()
            .chain(self.kind.iter())
            .any(|kind| AREA_KINDS.contains(&kind.as_str()))
    }

    fn into_point(self, address: &str) -> Result<geo_types::Point, GeocodingError> {
        let invalid = || GeocodingError::InvalidCoordinates(address.to_owned());
        let lat = self.lat.parse::<f64>().map_err(|_| invalid())?;
        let lon = self.lon.parse::<f64>().map_err(|_| invalid())?;

        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(invalid());
        }

        // Without a house number an area match is a guess
        if !address.chars().any(|c| c.is_ascii_digit()) && self.is_area() {
            return Err(GeocodingError::Ambiguous {
                address: address.to_owned(),
                display_name: self.display_name,
            });
        }

        Ok(geo_types::Point::new(lon, lat))
    }
}

pub struct NominatimGeocoderParams {
    pub nominatim_url: String,
    /// Sent with every request, the Nominatim usage policy requires one
    pub user_agent: String,
    /// ISO 3166-1 alpha-2 codes restricting the search, comma separated
    pub country_codes: Option<String>,
    /// Enables the maps.co fallback
    pub mapsco_api_key: Option<String>,
    pub mapsco_url: String,
    pub timeout: Duration,
    /// Pause before the single retry of a rate-limited request
    pub retry_delay: Duration,
}

impl Default for NominatimGeocoderParams {
    fn default() -> Self {
        Self {
            nominatim_url: String::from(NOMINATIM_SEARCH_URL),
            user_agent: format!("dispatch/{}", env!("CARGO_PKG_VERSION")),
            country_codes: None,
            mapsco_api_key: None,
            mapsco_url: String::from(MAPSCO_SEARCH_URL),
            timeout: Duration::from_secs(10),
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// Geocodes with Nominatim, falling back to maps.co when a key is configured.
pub struct NominatimGeocoder {
    params: NominatimGeocoderParams,
    client: reqwest::Client,
}

impl NominatimGeocoder {
    pub fn new(params: NominatimGeocoderParams) -> Self {
        Self {
            params,
            client: reqwest::Client::new(),
        }
    }

    async fn search_nominatim(&self, address: &str) -> Result<Option<Place>, GeocodingError> {
        let mut query = vec![
            ("q", address.to_owned()),
            ("format", String::from("jsonv2")),
            ("limit", String::from("1")),
        ];
        if let Some(country_codes) = &self.params.country_codes {
            query.push(("countrycodes", country_codes.clone()));
        }

        let request = self
            .client
            .get(&self.params.nominatim_url)
            .header(reqwest::header::USER_AGENT, &self.params.user_agent)
            .query(&query);

        self.send(request).await
    }

    async fn search_mapsco(
        &self,
        address: &str,
        api_key: &str,
    ) -> Result<Option<Place>, GeocodingError> {
        let request = self
            .client
            .get(&self.params.mapsco_url)
            .query(&[("q", address), ("api_key", api_key)]);

        self.send(request).await
    }

    /// Sends the search, retrying once after `retry_delay` when rate limited.
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Option<Place>, GeocodingError> {
        let request = request.timeout(self.params.timeout);
        let retry = request.try_clone();

        let mut response = request.send().await?;
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS
            && let Some(retry) = retry
        {
            debug!("Geocoder rate limited, retrying in {:?}", self.params.retry_delay);
            tokio::time::sleep(self.params.retry_delay).await;
            response = retry.send().await?;
        }

        if !response.status().is_success() {
            let status = response.status();
            let message = response.text().await.unwrap_or_default();
            return Err(GeocodingError::Http { status, message });
        }

        let places: Vec<Place> = response.json().await?;
        Ok(places.into_iter().next())
    }
}

/// Settles the outcome of one provider: a place ends the search, nothing or a
/// failure moves on to the next provider.
fn settle(
    provider: &str,
    address: &str,
    result: Result<Option<Place>, GeocodingError>,
    last_error: &mut Option<GeocodingError>,
) -> Option<Result<geo_types::Point, GeocodingError>> {
    match result {
        Ok(Some(place)) => Some(place.into_point(address)),
        Ok(None) => {
            debug!("{provider} found nothing for {address}");
            *last_error = Some(GeocodingError::NotFound(address.to_owned()));
            None
        }
        Err(error) => {
            warn!("{provider} geocoding of {address} failed: {error}");
            if last_error.is_none() {
                *last_error = Some(error);
            }
            None
        }
    }
}

impl Geocoder for NominatimGeocoder {
    #[instrument(skip_all, level = "debug")]
    async fn geocode(&self, address: &str) -> Result<geo_types::Point, GeocodingError> {
        let address = normalize_address(address);
        if address.is_empty() {
            return Err(GeocodingError::EmptyAddress);
        }

        let mut last_error = None;

        let result = self.search_nominatim(&address).await;
        if let Some(resolved) = settle("nominatim", &address, result, &mut last_error) {
            return resolved;
        }

        if let Some(api_key) = &self.params.mapsco_api_key {
            let result = self.search_mapsco(&address, api_key).await;
            if let Some(resolved) = settle("maps.co", &address, result, &mut last_error) {
                return resolved;
            }
        }

        Err(last_error.unwrap_or(GeocodingError::NotFound(address)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(json: serde_json::Value) -> Place {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_normalize_address() {
        assert_eq!(
            normalize_address("  Rua   da Aurora,325 ,  Boa Vista,,Recife "),
            "Rua da Aurora, 325, Boa Vista, Recife"
        );
        assert_eq!(normalize_address(" , \t "), "");
    }

    #[test]
    fn test_place_into_point() {
        let point = place(serde_json::json!({
            "lat": "-8.0631",
            "lon": "-34.8811",
            "display_name": "325, Rua da Aurora, Boa Vista, Recife",
            "addresstype": "building"
        }))
        .into_point("Rua da Aurora 325, Recife")
        .unwrap();

        assert_eq!(point.x(), -34.8811);
        assert_eq!(point.y(), -8.0631);
    }

    #[test]
    fn test_area_match_without_number_is_ambiguous() {
        let recife = || {
            place(serde_json::json!({
                "lat": "-8.0578",
                "lon": "-34.8829",
                "display_name": "Recife, Pernambuco, Brasil",
                "addresstype": "city"
            }))
        };

        assert!(matches!(
            recife().into_point("Recife"),
            Err(GeocodingError::Ambiguous { ref display_name, .. })
                if display_name == "Recife, Pernambuco, Brasil"
        ));

        // A house number makes the closest match acceptable
        assert!(recife().into_point("Rua Nova 12, Recife").is_ok());
    }

    #[test]
    fn test_maps_co_place_kind() {
        let town = place(serde_json::json!({
            "lat": "50.85",
            "lon": "4.35",
            "display_name": "Bruxelles",
            "class": "boundary",
            "type": "administrative"
        }));

        assert!(matches!(
            town.into_point("Bruxelles"),
            Err(GeocodingError::Ambiguous { .. })
        ));
    }

    #[test]
    fn test_invalid_coordinates() {
        let out_of_range = place(serde_json::json!({ "lat": "91.0", "lon": "0.0" }));
        let not_a_number = place(serde_json::json!({ "lat": "north", "lon": "0.0" }));

        assert!(matches!(
            out_of_range.into_point("Pole 1"),
            Err(GeocodingError::InvalidCoordinates(_))
        ));
        assert!(matches!(
            not_a_number.into_point("Pole 1"),
            Err(GeocodingError::InvalidCoordinates(_))
        ));
    }

    #[test]
    fn test_settle_prefers_not_found_over_failures() {
        let mut last_error = None;

        assert!(settle("nominatim", "Rua 1", Ok(None), &mut last_error).is_none());
        assert!(matches!(last_error, Some(GeocodingError::NotFound(_))));

        let failure = GeocodingError::Http {
            status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
            message: String::new(),
        };
        let mut last_error = None;
        assert!(settle("nominatim", "Rua 1", Err(failure), &mut last_error).is_none());
        assert!(settle("maps.co", "Rua 1", Ok(None), &mut last_error).is_none());
        assert!(matches!(last_error, Some(GeocodingError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_empty_address_is_rejected_before_any_request() {
        let geocoder = NominatimGeocoder::new(NominatimGeocoderParams {
            nominatim_url: String::from("http://127.0.0.1:9/search"),
            ..NominatimGeocoderParams::default()
        });

        assert!(matches!(
            geocoder.geocode("  ,  ").await,
            Err(GeocodingError::EmptyAddress)
        ));
    }
}
