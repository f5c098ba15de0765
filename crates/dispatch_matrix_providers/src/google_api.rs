use jiff::Timestamp;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::{
    error::MatrixProviderError, matrix_options::MatrixOptions, matrix_provider::MatrixProvider,
    travel_matrices::TravelMatrices,
};

pub const GOOGLE_DISTANCE_MATRIX_API_URL: &str =
    "https://maps.googleapis.com/maps/api/distancematrix/json";

/// The API allows at most 100 elements per request
const MAX_CHUNK_SIZE: usize = 10;

const PROVIDER_NAME: &str = "google";

#[derive(Debug, Error)]
pub enum GoogleMatrixError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP error: {status} - {message}")]
    Http {
        status: reqwest::StatusCode,
        message: String,
    },

    #[error("API error: {status} - {message}")]
    Api { status: String, message: String },
}

/// Statuses describing a request the API will keep refusing, whatever the retry
const REJECTED_STATUSES: [&str; 4] = [
    "INVALID_REQUEST",
    "REQUEST_DENIED",
    "MAX_ELEMENTS_EXCEEDED",
    "MAX_DIMENSIONS_EXCEEDED",
];

impl GoogleMatrixError {
    fn is_rejected_request(&self) -> bool {
        match self {
            GoogleMatrixError::Request(_) => false,
            GoogleMatrixError::Http { status, .. } => {
                status.is_client_error() && *status != reqwest::StatusCode::TOO_MANY_REQUESTS
            }
            GoogleMatrixError::Api { status, .. } => {
                REJECTED_STATUSES.contains(&status.as_str())
            }
        }
    }
}

impl From<GoogleMatrixError> for MatrixProviderError {
    fn from(error: GoogleMatrixError) -> Self {
        if error.is_rejected_request() {
            MatrixProviderError::InvalidRequest(format!("{PROVIDER_NAME}: {error}"))
        } else {
            MatrixProviderError::unavailable(PROVIDER_NAME, error.to_string())
        }
    }
}

#[derive(Deserialize, Debug)]
struct ValueField {
    value: f64,
}

#[derive(Deserialize, Debug)]
struct DistanceMatrixElement {
    status: String,
    distance: Option<ValueField>,
    duration: Option<ValueField>,
    duration_in_traffic: Option<ValueField>,
}

#[derive(Deserialize, Debug)]
struct DistanceMatrixRow {
    elements: Vec<DistanceMatrixElement>,
}

#[derive(Deserialize, Debug)]
struct DistanceMatrixResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    rows: Vec<DistanceMatrixRow>,
}

pub struct GoogleMatrixClientParams {
    pub api_key: String,
}

pub struct GoogleMatrixClient {
    params: GoogleMatrixClientParams,
    client: reqwest::Client,
}

/// Cells of a matrix being assembled from several chunked responses
struct MatrixCells {
    num_points: usize,
    distances: Vec<f64>,
    times: Vec<f64>,
    missing: Vec<(usize, usize)>,
}

impl MatrixCells {
    fn new(num_points: usize) -> Self {
        Self {
            num_points,
            distances: vec![f64::NAN; num_points * num_points],
            times: vec![f64::NAN; num_points * num_points],
            missing: vec![],
        }
    }

    fn apply_response(
        &mut self,
        response: DistanceMatrixResponse,
        origins: std::ops::Range<usize>,
        destinations: std::ops::Range<usize>,
        traffic_aware: bool,
    ) -> Result<(), GoogleMatrixError> {
        if response.status != "OK" {
            return Err(GoogleMatrixError::Api {
                status: response.status,
                message: response.error_message.unwrap_or_default(),
            });
        }

        for from in origins.clone() {
            let row = response.rows.get(from - origins.start);
            for to in destinations.clone() {
                let element = row.and_then(|row| row.elements.get(to - destinations.start));

                let resolved = element.filter(|e| e.status == "OK").and_then(|e| {
                    let duration = if traffic_aware {
                        e.duration_in_traffic.as_ref().or(e.duration.as_ref())
                    } else {
                        e.duration.as_ref()
                    };
                    Some((e.distance.as_ref()?.value, duration?.value))
                });

                match resolved {
                    Some((distance, time)) => {
                        self.distances[from * self.num_points + to] = distance;
                        self.times[from * self.num_points + to] = time;
                    }
                    None => self.missing.push((from, to)),
                }
            }
        }

        Ok(())
    }

    fn into_matrices(self) -> Result<TravelMatrices, MatrixProviderError> {
        if !self.missing.is_empty() {
            return Err(MatrixProviderError::PartialCoverage {
                provider: PROVIDER_NAME,
                missing: self.missing,
                total: self.num_points * self.num_points,
            });
        }

        Ok(TravelMatrices {
            distances: self.distances,
            times: self.times,
            tolls: None,
        })
    }
}

fn format_points(points: &[geo_types::Point]) -> String {
    points
        .iter()
        .map(|point| format!("{},{}", point.y(), point.x()))
        .collect::<Vec<_>>()
        .join("|")
}

fn departure_time_param(departure_time: Option<Timestamp>) -> String {
    match departure_time {
        // The API rejects departure times in the past
        Some(time) if time > Timestamp::now() => time.as_second().to_string(),
        _ => String::from("now"),
    }
}

impl GoogleMatrixClient {
    pub fn new(params: GoogleMatrixClientParams) -> Self {
        Self {
            params,
            client: reqwest::Client::new(),
        }
    }

    async fn request_chunk(
        &self,
        origins: &[geo_types::Point],
        destinations: &[geo_types::Point],
        options: &MatrixOptions,
    ) -> Result<DistanceMatrixResponse, GoogleMatrixError> {
        let mut query = vec![
            ("origins", format_points(origins)),
            ("destinations", format_points(destinations)),
            ("units", String::from("metric")),
            ("key", self.params.api_key.clone()),
        ];

        if options.traffic_aware {
            query.push(("departure_time", departure_time_param(options.departure_time)));
            query.push(("traffic_model", String::from("best_guess")));
        }

        let response = self
            .client
            .get(GOOGLE_DISTANCE_MATRIX_API_URL)
            .query(&query)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response.text().await.unwrap_or_default();
            return Err(GoogleMatrixError::Http { status, message });
        }

        Ok(response.json().await?)
    }
}

impl MatrixProvider for GoogleMatrixClient {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    #[instrument(skip_all, level = "debug")]
    async fn fetch_matrix(
        &self,
        points: &[geo_types::Point],
        options: &MatrixOptions,
    ) -> Result<TravelMatrices, MatrixProviderError> {
        if self.params.api_key.is_empty() {
            return Err(MatrixProviderError::unavailable(
                PROVIDER_NAME,
                "missing API key",
            ));
        }

        let mut cells = MatrixCells::new(points.len());

        for (origin_chunk_index, origins) in points.chunks(MAX_CHUNK_SIZE).enumerate() {
            let origins_start = origin_chunk_index * MAX_CHUNK_SIZE;
            for (destination_chunk_index, destinations) in
                points.chunks(MAX_CHUNK_SIZE).enumerate()
            {
                let destinations_start = destination_chunk_index * MAX_CHUNK_SIZE;

                debug!(
                    "GoogleDistanceMatrix: requesting origins {}..{} destinations {}..{}",
                    origins_start,
                    origins_start + origins.len(),
                    destinations_start,
                    destinations_start + destinations.len()
                );

                let response = self.request_chunk(origins, destinations, options).await?;
                cells.apply_response(
                    response,
                    origins_start..origins_start + origins.len(),
                    destinations_start..destinations_start + destinations.len(),
                    options.traffic_aware,
                )?;
            }
        }

        if !cells.missing.is_empty() {
            warn!(
                "GoogleDistanceMatrix: {} location pairs could not be resolved",
                cells.missing.len()
            );
        }

        cells.into_matrices()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(status: &str, distance: f64, duration: f64, in_traffic: Option<f64>) -> String {
        match in_traffic {
            Some(in_traffic) => format!(
                r#"{{ "status": "{status}", "distance": {{ "value": {distance} }}, "duration": {{ "value": {duration} }}, "duration_in_traffic": {{ "value": {in_traffic} }} }}"#
            ),
            None => format!(
                r#"{{ "status": "{status}", "distance": {{ "value": {distance} }}, "duration": {{ "value": {duration} }} }}"#
            ),
        }
    }

    fn response(rows: Vec<Vec<String>>) -> DistanceMatrixResponse {
        let rows = rows
            .into_iter()
            .map(|elements| format!(r#"{{ "elements": [{}] }}"#, elements.join(",")))
            .collect::<Vec<_>>()
            .join(",");
        serde_json::from_str(&format!(r#"{{ "status": "OK", "rows": [{rows}] }}"#)).unwrap()
    }

    #[test]
    fn test_apply_response_reads_duration_in_traffic() {
        let mut cells = MatrixCells::new(2);
        let response = response(vec![
            vec![
                element("OK", 0.0, 0.0, Some(0.0)),
                element("OK", 1000.0, 100.0, Some(150.0)),
            ],
            vec![
                element("OK", 1100.0, 110.0, Some(160.0)),
                element("OK", 0.0, 0.0, Some(0.0)),
            ],
        ]);

        cells.apply_response(response, 0..2, 0..2, true).unwrap();
        let matrices = cells.into_matrices().unwrap();

        assert_eq!(matrices.distances, vec![0.0, 1000.0, 1100.0, 0.0]);
        assert_eq!(matrices.times, vec![0.0, 150.0, 160.0, 0.0]);
    }

    #[test]
    fn test_apply_response_without_traffic() {
        let mut cells = MatrixCells::new(2);
        let response = response(vec![
            vec![
                element("OK", 0.0, 0.0, None),
                element("OK", 1000.0, 100.0, Some(150.0)),
            ],
            vec![
                element("OK", 1100.0, 110.0, None),
                element("OK", 0.0, 0.0, None),
            ],
        ]);

        cells.apply_response(response, 0..2, 0..2, false).unwrap();
        let matrices = cells.into_matrices().unwrap();

        assert_eq!(matrices.times, vec![0.0, 100.0, 110.0, 0.0]);
        assert!(matrices.tolls.is_none());
    }

    #[test]
    fn test_unresolved_elements_are_partial_coverage() {
        let mut cells = MatrixCells::new(2);
        let response = response(vec![
            vec![
                element("OK", 0.0, 0.0, None),
                element("ZERO_RESULTS", 0.0, 0.0, None),
            ],
            vec![element("OK", 1100.0, 110.0, None)],
        ]);

        cells.apply_response(response, 0..2, 0..2, false).unwrap();

        match cells.into_matrices() {
            Err(MatrixProviderError::PartialCoverage { missing, total, .. }) => {
                assert_eq!(missing, vec![(0, 1), (1, 1)]);
                assert_eq!(total, 4);
            }
            other => panic!("expected partial coverage, got {other:?}"),
        }
    }

    fn api_error(status: &str) -> MatrixProviderError {
        let mut cells = MatrixCells::new(1);
        let response: DistanceMatrixResponse = serde_json::from_str(&format!(
            r#"{{ "status": "{status}", "error_message": "rejected", "rows": [] }}"#
        ))
        .unwrap();

        cells
            .apply_response(response, 0..1, 0..1, false)
            .unwrap_err()
            .into()
    }

    #[test]
    fn test_rejected_requests_are_not_retried() {
        for status in ["REQUEST_DENIED", "INVALID_REQUEST", "MAX_ELEMENTS_EXCEEDED"] {
            let error = api_error(status);

            assert!(
                matches!(error, MatrixProviderError::InvalidRequest(_)),
                "{status} gave {error:?}"
            );
            assert!(!error.is_transient());
            assert!(error.to_string().contains(status));
        }
    }

    #[test]
    fn test_rate_limits_are_transient() {
        for status in ["OVER_QUERY_LIMIT", "UNKNOWN_ERROR"] {
            let error = api_error(status);

            assert!(error.is_transient(), "{status} gave {error:?}");
        }

        let error: MatrixProviderError = GoogleMatrixError::Http {
            status: reqwest::StatusCode::TOO_MANY_REQUESTS,
            message: String::new(),
        }
        .into();
        assert!(error.is_transient());

        let error: MatrixProviderError = GoogleMatrixError::Http {
            status: reqwest::StatusCode::FORBIDDEN,
            message: String::new(),
        }
        .into();
        assert!(!error.is_transient());
    }

    #[test]
    fn test_format_points_is_lat_lng() {
        let points = vec![
            geo_types::Point::new(2.35, 48.85),
            geo_types::Point::new(4.83, 45.76),
        ];
        assert_eq!(format_points(&points), "48.85,2.35|45.76,4.83");
    }

    #[test]
    fn test_departure_time_in_the_past_is_now() {
        assert_eq!(departure_time_param(None), "now");
        assert_eq!(departure_time_param(Some(Timestamp::UNIX_EPOCH)), "now");
    }

    #[tokio::test]
    async fn test_missing_api_key_is_unavailable() {
        let client = GoogleMatrixClient::new(GoogleMatrixClientParams {
            api_key: String::new(),
        });

        let result = client
            .fetch_matrix(&[geo_types::Point::new(0.0, 0.0)], &MatrixOptions::default())
            .await;

        assert!(matches!(
            result,
            Err(MatrixProviderError::ProviderUnavailable { .. })
        ));
    }
}
