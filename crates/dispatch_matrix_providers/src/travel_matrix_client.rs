use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::{
    as_the_crow_flies::AsTheCrowFliesProvider,
    cache::MatricesCache,
    error::MatrixProviderError,
    google_api::{GoogleMatrixClient, GoogleMatrixClientParams},
    matrix_options::MatrixOptions,
    matrix_provider::MatrixProvider,
    travel_matrices::TravelMatrices,
    travel_matrix_provider::TravelMatrixProvider,
};

pub struct TravelMatrixClientParams {
    /// Timeout applied to each provider call
    pub timeout: Duration,
    /// Pause before the single retry of a transient failure
    pub retry_delay: Duration,
    pub google: Option<GoogleMatrixClientParams>,
}

impl Default for TravelMatrixClientParams {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retry_delay: Duration::from_millis(500),
            google: None,
        }
    }
}

pub struct TravelMatrixClient<C: MatricesCache> {
    timeout: Duration,
    retry_delay: Duration,
    google_client: Option<GoogleMatrixClient>,
    cache: C,
}

impl<C: MatricesCache> TravelMatrixClient<C> {
    pub fn new(params: TravelMatrixClientParams, cache: C) -> Self {
        Self {
            timeout: params.timeout,
            retry_delay: params.retry_delay,
            google_client: params.google.map(GoogleMatrixClient::new),
            cache,
        }
    }

    #[instrument(skip_all, level = "debug")]
    pub async fn fetch_matrix<P>(
        &self,
        points: &[P],
        provider: &TravelMatrixProvider,
        options: &MatrixOptions,
    ) -> Result<TravelMatrices, MatrixProviderError>
    where
        for<'a> &'a P: Into<geo_types::Point>,
    {
        let points: Vec<geo_types::Point> = points.iter().map(|point| point.into()).collect();

        // Traffic-aware matrices depend on the time of the request
        let use_cache =
            options.is_cacheable() && !matches!(provider, TravelMatrixProvider::Custom { .. });

        if use_cache {
            match self.cache.get(&points, provider) {
                Ok(Some(matrices)) => {
                    debug!("Using cached matrices for {} points", points.len());
                    return Ok(matrices);
                }
                Ok(None) => {}
                Err(error) => warn!("Failed to read matrices cache: {}", error),
            }
        }

        let matrices = match provider {
            TravelMatrixProvider::GoogleDistanceMatrix { toll_per_km } => {
                let client = self.google_client.as_ref().ok_or_else(|| {
                    MatrixProviderError::unavailable("google", "client is not configured")
                })?;
                let mut matrices = self.fetch_with_retry(client, &points, options).await?;
                if let Some(rate) = toll_per_km {
                    matrices.set_tolls_per_km(*rate);
                }
                matrices
            }
            TravelMatrixProvider::AsTheCrowFlies {
                speed_kmh,
                toll_per_km,
            } => {
                let provider = AsTheCrowFliesProvider {
                    speed_kmh: *speed_kmh,
                    toll_per_km: *toll_per_km,
                };
                self.fetch_with_retry(&provider, &points, options).await?
            }
            TravelMatrixProvider::Custom { matrices } => matrices.clone(),
        };

        matrices.validate(provider.name(), points.len())?;

        if use_cache && let Err(error) = self.cache.put(&points, provider, &matrices) {
            warn!("Failed to write matrices cache: {}", error);
        }

        Ok(matrices)
    }

    /// Calls the provider with a timeout, retrying once when the failure is transient.
    async fn fetch_with_retry<M: MatrixProvider>(
        &self,
        provider: &M,
        points: &[geo_types::Point],
        options: &MatrixOptions,
    ) -> Result<TravelMatrices, MatrixProviderError> {
        match self.fetch_with_timeout(provider, points, options).await {
            Err(error) if error.is_transient() => {
                warn!("{} matrix request failed, retrying once: {}", provider.name(), error);
                tokio::time::sleep(self.retry_delay).await;
                self.fetch_with_timeout(provider, points, options).await
            }
            result => result,
        }
    }

    async fn fetch_with_timeout<M: MatrixProvider>(
        &self,
        provider: &M,
        points: &[geo_types::Point],
        options: &MatrixOptions,
    ) -> Result<TravelMatrices, MatrixProviderError> {
        tokio::time::timeout(self.timeout, provider.fetch_matrix(points, options))
            .await
            .unwrap_or(Err(MatrixProviderError::Timeout {
                provider: provider.name(),
                timeout: self.timeout,
            }))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::cache::NoCache;

    struct FlakyProvider {
        calls: AtomicUsize,
        failures: usize,
        error: fn() -> MatrixProviderError,
    }

    impl MatrixProvider for FlakyProvider {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn fetch_matrix(
            &self,
            points: &[geo_types::Point],
            _options: &MatrixOptions,
        ) -> Result<TravelMatrices, MatrixProviderError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err((self.error)());
            }
            let n = points.len();
            Ok(TravelMatrices {
                distances: vec![0.0; n * n],
                times: vec![0.0; n * n],
                tolls: None,
            })
        }
    }

    struct SlowProvider;

    impl MatrixProvider for SlowProvider {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn fetch_matrix(
            &self,
            _points: &[geo_types::Point],
            _options: &MatrixOptions,
        ) -> Result<TravelMatrices, MatrixProviderError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Err(MatrixProviderError::InvalidRequest(String::from("unreachable")))
        }
    }

    fn client() -> TravelMatrixClient<NoCache> {
        TravelMatrixClient::new(
            TravelMatrixClientParams {
                timeout: Duration::from_secs(1),
                retry_delay: Duration::from_millis(10),
                google: None,
            },
            NoCache,
        )
    }

    struct Stop {
        lon: f64,
        lat: f64,
    }

    impl From<&Stop> for geo_types::Point {
        fn from(stop: &Stop) -> Self {
            geo_types::Point::new(stop.lon, stop.lat)
        }
    }

    fn stops() -> Vec<Stop> {
        vec![
            Stop { lon: 0.0, lat: 0.0 },
            Stop {
                lon: 0.01,
                lat: 0.01,
            },
        ]
    }

    fn points() -> Vec<geo_types::Point> {
        stops().iter().map(|stop| stop.into()).collect()
    }

    #[tokio::test]
    async fn test_retry_once_on_transient_failure() {
        let provider = FlakyProvider {
            calls: AtomicUsize::new(0),
            failures: 1,
            error: || MatrixProviderError::unavailable("flaky", "503"),
        };

        let result = client()
            .fetch_with_retry(&provider, &points(), &MatrixOptions::default())
            .await;

        assert!(result.is_ok());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_second_failure() {
        let provider = FlakyProvider {
            calls: AtomicUsize::new(0),
            failures: 5,
            error: || MatrixProviderError::unavailable("flaky", "503"),
        };

        let result = client()
            .fetch_with_retry(&provider, &points(), &MatrixOptions::default())
            .await;

        assert!(matches!(
            result,
            Err(MatrixProviderError::ProviderUnavailable { .. })
        ));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_partial_coverage_is_not_retried() {
        let provider = FlakyProvider {
            calls: AtomicUsize::new(0),
            failures: 5,
            error: || MatrixProviderError::PartialCoverage {
                provider: "flaky",
                missing: vec![(0, 1)],
                total: 4,
            },
        };

        let result = client()
            .fetch_with_retry(&provider, &points(), &MatrixOptions::default())
            .await;

        assert!(result.is_err_and(|error| error.is_partial_coverage()));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let result = client()
            .fetch_with_retry(&SlowProvider, &points(), &MatrixOptions::default())
            .await;

        assert!(matches!(
            result,
            Err(MatrixProviderError::Timeout {
                provider: "slow",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_custom_matrices_are_validated() {
        let provider = TravelMatrixProvider::Custom {
            matrices: TravelMatrices {
                distances: vec![0.0, 1.0, 1.0],
                times: vec![0.0, 1.0, 1.0],
                tolls: None,
            },
        };

        let result = client()
            .fetch_matrix(&stops(), &provider, &MatrixOptions::default())
            .await;

        assert!(result.is_err_and(|error| error.is_partial_coverage()));
    }

    #[tokio::test]
    async fn test_as_the_crow_flies() {
        let matrices = client()
            .fetch_matrix(
                &stops(),
                &TravelMatrixProvider::default(),
                &MatrixOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(matrices.distances.len(), 4);
        assert!(matrices.distances[1] > 0.0);
    }

    #[tokio::test]
    async fn test_google_without_configuration_is_unavailable() {
        let result = client()
            .fetch_matrix(
                &stops(),
                &TravelMatrixProvider::GoogleDistanceMatrix { toll_per_km: None },
                &MatrixOptions::default(),
            )
            .await;

        assert!(matches!(
            result,
            Err(MatrixProviderError::ProviderUnavailable { .. })
        ));
    }
}
