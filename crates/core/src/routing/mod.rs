//! Traffic- and weather-adjusted ETA estimation over a mapping provider.

pub mod weather;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

pub use weather::{weather_alerts, weather_multiplier, WeatherCondition, WeatherObservation};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

/// One driving route as reported by the mapping provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProviderRoute {
    pub summary: String,
    pub distance_meters: u64,
    pub duration_secs: u64,
    pub traffic_duration_secs: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("provider is not configured: {0}")]
    NotConfigured(String),
    #[error("provider request failed: {0}")]
    Transport(String),
    #[error("provider returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("provider response could not be decoded: {0}")]
    Decode(String),
    #[error("provider returned no route")]
    NoRoute,
}

#[async_trait]
pub trait DirectionsProvider: Send + Sync {
    /// Routes ordered as the provider ranks them; the first is primary.
    async fn directions(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<Vec<ProviderRoute>, ProviderError>;
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current(&self, at: Coordinates) -> Result<WeatherObservation, ProviderError>;
}

#[async_trait]
impl<T: DirectionsProvider + ?Sized> DirectionsProvider for Arc<T> {
    async fn directions(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<Vec<ProviderRoute>, ProviderError> {
        (**self).directions(origin, destination).await
    }
}

#[async_trait]
impl<T: WeatherProvider + ?Sized> WeatherProvider for Arc<T> {
    async fn current(&self, at: Coordinates) -> Result<WeatherObservation, ProviderError> {
        (**self).current(at).await
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteOptimizationRequest {
    pub origin: Coordinates,
    pub destination: Coordinates,
    #[serde(default = "default_include_weather")]
    pub include_weather: bool,
}

fn default_include_weather() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlternativeRoute {
    pub summary: String,
    pub distance_km: f64,
    pub duration_secs: u64,
    pub traffic_duration_secs: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteOptimizationResult {
    pub summary: String,
    pub distance_km: f64,
    pub normal_duration_secs: u64,
    pub traffic_duration_secs: u64,
    pub congestion_level: f64,
    pub average_speed_kmh: f64,
    pub traffic_multiplier: f64,
    pub weather_multiplier: f64,
    pub estimated_duration_secs: u64,
    pub weather: Option<WeatherObservation>,
    pub alternatives: Vec<AlternativeRoute>,
    pub alerts: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RouteError {
    /// Cause is kept for logs only; callers see the generic message.
    #[error("failed to optimize route")]
    OptimizationFailed(String),
}

/// `traffic / normal * 100`; a zero free-flow duration reads as 100.
pub fn congestion_level(normal_duration_secs: u64, traffic_duration_secs: u64) -> f64 {
    if normal_duration_secs == 0 {
        return 100.0;
    }
    traffic_duration_secs as f64 / normal_duration_secs as f64 * 100.0
}

pub fn traffic_multiplier(congestion_level: f64) -> f64 {
    if congestion_level > 150.0 {
        1.5
    } else if congestion_level > 120.0 {
        1.3
    } else {
        1.0
    }
}

pub fn average_speed_kmh(distance_km: f64, duration_secs: u64) -> f64 {
    if duration_secs == 0 {
        return 0.0;
    }
    distance_km / (duration_secs as f64 / 3600.0)
}

pub fn traffic_alerts(congestion_level: f64) -> Vec<String> {
    if congestion_level > 150.0 {
        vec!["Heavy traffic: expect significant delays".to_string()]
    } else if congestion_level > 120.0 {
        vec!["Moderate traffic on route".to_string()]
    } else {
        Vec::new()
    }
}

fn meters_to_km(meters: u64) -> f64 {
    meters as f64 / 1000.0
}

#[derive(Clone, Debug)]
pub struct RouteEstimator<D, W> {
    directions: D,
    weather: Option<W>,
}

impl<D, W> RouteEstimator<D, W>
where
    D: DirectionsProvider,
    W: WeatherProvider,
{
    pub fn new(directions: D, weather: Option<W>) -> Self {
        Self { directions, weather }
    }

    pub async fn optimize(
        &self,
        request: &RouteOptimizationRequest,
    ) -> Result<RouteOptimizationResult, RouteError> {
        let weather_lookup = async {
            match (&self.weather, request.include_weather) {
                (Some(provider), true) => Some(provider.current(request.origin).await),
                _ => None,
            }
        };
        let (routes, weather) = tokio::join!(
            self.directions.directions(request.origin, request.destination),
            weather_lookup
        );

        let routes = routes.map_err(|error| {
            warn!(
                event_name = "routing.directions.failed",
                origin = %request.origin,
                destination = %request.destination,
                error = %error,
                "directions lookup failed"
            );
            RouteError::OptimizationFailed(error.to_string())
        })?;

        let weather = match weather {
            Some(Ok(observation)) => Some(observation),
            Some(Err(error)) => {
                warn!(
                    event_name = "routing.weather.unavailable",
                    origin = %request.origin,
                    error = %error,
                    "continuing without weather adjustment"
                );
                None
            }
            None => None,
        };

        let result = estimate(routes, weather)?;
        info!(
            event_name = "routing.estimate.computed",
            distance_km = result.distance_km,
            congestion_level = result.congestion_level,
            estimated_duration_secs = result.estimated_duration_secs,
            "route estimate computed"
        );
        Ok(result)
    }
}

/// Folds provider routes and optional weather into one estimate.
pub fn estimate(
    routes: Vec<ProviderRoute>,
    weather: Option<WeatherObservation>,
) -> Result<RouteOptimizationResult, RouteError> {
    let mut routes = routes.into_iter();
    let primary = routes
        .next()
        .ok_or_else(|| RouteError::OptimizationFailed(ProviderError::NoRoute.to_string()))?;

    let distance_km = meters_to_km(primary.distance_meters);
    let normal_duration_secs = primary.duration_secs;
    let traffic_duration_secs = primary.traffic_duration_secs.unwrap_or(normal_duration_secs);
    let congestion_level = congestion_level(normal_duration_secs, traffic_duration_secs);
    let traffic_multiplier = traffic_multiplier(congestion_level);
    let weather_multiplier = weather.as_ref().map(weather_multiplier).unwrap_or(1.0);
    let estimated_duration_secs =
        (normal_duration_secs as f64 * traffic_multiplier * weather_multiplier).round() as u64;

    let mut alerts = traffic_alerts(congestion_level);
    if let Some(observation) = &weather {
        alerts.extend(weather_alerts(observation));
    }

    let alternatives = routes
        .map(|route| AlternativeRoute {
            summary: route.summary,
            distance_km: meters_to_km(route.distance_meters),
            duration_secs: route.duration_secs,
            traffic_duration_secs: route.traffic_duration_secs.unwrap_or(route.duration_secs),
        })
        .collect();

    Ok(RouteOptimizationResult {
        summary: primary.summary,
        distance_km,
        normal_duration_secs,
        traffic_duration_secs,
        congestion_level,
        average_speed_kmh: average_speed_kmh(distance_km, normal_duration_secs),
        traffic_multiplier,
        weather_multiplier,
        estimated_duration_secs,
        weather,
        alternatives,
        alerts,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::{
        average_speed_kmh, congestion_level, estimate, traffic_multiplier, Coordinates,
        DirectionsProvider, ProviderError, ProviderRoute, RouteError, RouteEstimator,
        RouteOptimizationRequest, WeatherObservation, WeatherProvider,
    };

    struct FixedDirections(Result<Vec<ProviderRoute>, ProviderError>);

    #[async_trait]
    impl DirectionsProvider for FixedDirections {
        async fn directions(
            &self,
            _origin: Coordinates,
            _destination: Coordinates,
        ) -> Result<Vec<ProviderRoute>, ProviderError> {
            self.0.clone()
        }
    }

    #[derive(Clone)]
    struct CountingWeather {
        calls: Arc<AtomicUsize>,
        result: Result<WeatherObservation, ProviderError>,
    }

    #[async_trait]
    impl WeatherProvider for CountingWeather {
        async fn current(&self, _at: Coordinates) -> Result<WeatherObservation, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    fn route(summary: &str, duration_secs: u64, traffic_duration_secs: u64) -> ProviderRoute {
        ProviderRoute {
            summary: summary.to_string(),
            distance_meters: 30_000,
            duration_secs,
            traffic_duration_secs: Some(traffic_duration_secs),
        }
    }

    fn rain() -> WeatherObservation {
        WeatherObservation {
            condition: "Rain".to_string(),
            description: "moderate rain".to_string(),
            visibility_m: Some(10_000),
            temperature_c: Some(24.0),
            wind_speed_mps: Some(5.0),
        }
    }

    fn request(include_weather: bool) -> RouteOptimizationRequest {
        RouteOptimizationRequest {
            origin: Coordinates { lat: 24.4539, lng: 54.3773 },
            destination: Coordinates { lat: 24.4330, lng: 54.6511 },
            include_weather,
        }
    }

    #[test]
    fn multiplier_is_neutral_up_to_free_flow() {
        for congestion in [0.0, 50.0, 99.9, 100.0, 120.0] {
            assert_eq!(traffic_multiplier(congestion), 1.0);
        }
        assert_eq!(traffic_multiplier(120.1), 1.3);
        assert_eq!(traffic_multiplier(150.0), 1.3);
        assert_eq!(traffic_multiplier(150.1), 1.5);
        assert_eq!(traffic_multiplier(400.0), 1.5);
    }

    #[test]
    fn congestion_and_speed_handle_zero_durations() {
        assert_eq!(congestion_level(0, 600), 100.0);
        assert_eq!(congestion_level(1200, 1800), 150.0);
        assert_eq!(average_speed_kmh(30.0, 0), 0.0);
        assert_eq!(average_speed_kmh(30.0, 1800), 60.0);
    }

    #[test]
    fn heavy_traffic_applies_one_and_a_half() {
        let result = estimate(vec![route("E11", 1_000, 1_600)], None).expect("estimate");
        assert_eq!(result.congestion_level, 160.0);
        assert_eq!(result.traffic_multiplier, 1.5);
        assert_eq!(result.estimated_duration_secs, 1_500);
        assert_eq!(result.alerts, vec!["Heavy traffic: expect significant delays".to_string()]);
    }

    #[test]
    fn weather_folds_into_estimate_and_alerts() {
        let result =
            estimate(vec![route("E11", 1_000, 1_300), route("E10", 1_100, 1_200)], Some(rain()))
                .expect("estimate");
        assert_eq!(result.traffic_multiplier, 1.3);
        assert_eq!(result.weather_multiplier, 1.2);
        assert_eq!(result.estimated_duration_secs, 1_560);
        assert_eq!(result.alternatives.len(), 1);
        assert_eq!(result.alternatives[0].summary, "E10");
        assert!(result.alerts.iter().any(|alert| alert.contains("Rain")));
    }

    #[test]
    fn empty_route_list_is_a_generic_failure() {
        let error = estimate(Vec::new(), None).expect_err("no routes");
        assert_eq!(error.to_string(), "failed to optimize route");
    }

    #[tokio::test]
    async fn directions_failure_surfaces_generic_error() {
        let estimator = RouteEstimator::new(
            FixedDirections(Err(ProviderError::Status {
                status: 403,
                message: "REQUEST_DENIED".to_string(),
            })),
            None::<CountingWeather>,
        );

        let error = estimator.optimize(&request(true)).await.expect_err("provider failure");
        assert!(matches!(error, RouteError::OptimizationFailed(ref cause) if cause.contains("403")));
        assert_eq!(error.to_string(), "failed to optimize route");
    }

    #[tokio::test]
    async fn weather_failure_does_not_block_estimate() {
        let calls = Arc::new(AtomicUsize::new(0));
        let estimator = RouteEstimator::new(
            FixedDirections(Ok(vec![route("E11", 1_000, 1_000)])),
            Some(CountingWeather {
                calls: calls.clone(),
                result: Err(ProviderError::Transport("timeout".to_string())),
            }),
        );

        let result = estimator.optimize(&request(true)).await.expect("estimate");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.weather, None);
        assert_eq!(result.weather_multiplier, 1.0);
        assert_eq!(result.estimated_duration_secs, 1_000);
    }

    #[tokio::test]
    async fn weather_is_skipped_when_not_requested() {
        let calls = Arc::new(AtomicUsize::new(0));
        let estimator = RouteEstimator::new(
            FixedDirections(Ok(vec![route("E11", 1_000, 1_000)])),
            Some(CountingWeather { calls: calls.clone(), result: Ok(rain()) }),
        );

        let result = estimator.optimize(&request(false)).await.expect("estimate");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(result.weather_multiplier, 1.0);
    }
}
