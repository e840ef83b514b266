use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tripxl_core::config::MapsConfig;
use tripxl_core::routing::{Coordinates, DirectionsProvider, ProviderError, ProviderRoute};

use super::{http_client, status_error, transport_error};

const DIRECTIONS_PATH: &str = "/maps/api/directions/json";

/// Google Maps Directions API, driving mode with live traffic.
pub struct GoogleDirectionsClient {
    client: Client,
    base_url: String,
    api_key: Option<SecretString>,
}

impl GoogleDirectionsClient {
    pub fn from_config(config: &MapsConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    routes: Vec<RouteBody>,
}

#[derive(Debug, Deserialize)]
struct RouteBody {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    legs: Vec<LegBody>,
}

#[derive(Debug, Deserialize)]
struct LegBody {
    distance: ValueBody,
    duration: ValueBody,
    #[serde(default)]
    duration_in_traffic: Option<ValueBody>,
}

#[derive(Debug, Deserialize)]
struct ValueBody {
    value: u64,
}

impl RouteBody {
    fn into_provider_route(self) -> ProviderRoute {
        let distance_meters = self.legs.iter().map(|leg| leg.distance.value).sum();
        let duration_secs = self.legs.iter().map(|leg| leg.duration.value).sum();
        let traffic_duration_secs = self
            .legs
            .iter()
            .map(|leg| leg.duration_in_traffic.as_ref().map(|value| value.value))
            .sum::<Option<u64>>();

        ProviderRoute { summary: self.summary, distance_meters, duration_secs, traffic_duration_secs }
    }
}

#[async_trait::async_trait]
impl DirectionsProvider for GoogleDirectionsClient {
    async fn directions(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<Vec<ProviderRoute>, ProviderError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| ProviderError::NotConfigured("maps.api_key is not set".to_string()))?;

        let response = self
            .client
            .get(format!("{}{DIRECTIONS_PATH}", self.base_url))
            .query(&[
                ("origin", origin.to_string()),
                ("destination", destination.to_string()),
                ("mode", "driving".to_string()),
                ("departure_time", "now".to_string()),
                ("alternatives", "true".to_string()),
                ("key", api_key.expose_secret().to_string()),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let body: DirectionsResponse =
            response.json().await.map_err(|error| ProviderError::Decode(error.to_string()))?;

        match body.status.as_str() {
            "OK" => {}
            "ZERO_RESULTS" | "NOT_FOUND" => return Err(ProviderError::NoRoute),
            other => {
                return Err(ProviderError::Status {
                    status: 200,
                    message: format!(
                        "{other}: {}",
                        body.error_message.unwrap_or_else(|| "no detail".to_string())
                    ),
                })
            }
        }

        let routes: Vec<ProviderRoute> =
            body.routes.into_iter().map(RouteBody::into_provider_route).collect();
        if routes.is_empty() {
            return Err(ProviderError::NoRoute);
        }
        Ok(routes)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tripxl_core::config::MapsConfig;
    use tripxl_core::routing::{Coordinates, DirectionsProvider, ProviderError};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::GoogleDirectionsClient;

    fn client(base_url: &str, api_key: Option<&str>) -> GoogleDirectionsClient {
        GoogleDirectionsClient::from_config(&MapsConfig {
            base_url: base_url.to_string(),
            api_key: api_key.map(|key| key.to_string().into()),
            timeout_secs: 5,
        })
        .expect("client")
    }

    const ORIGIN: Coordinates = Coordinates { lat: 24.4539, lng: 54.3773 };
    const DESTINATION: Coordinates = Coordinates { lat: 24.433, lng: 54.6511 };

    #[tokio::test]
    async fn parses_routes_and_sums_legs() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/maps/api/directions/json"))
            .and(query_param("departure_time", "now"))
            .and(query_param("alternatives", "true"))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "routes": [
                    {
                        "summary": "E10",
                        "legs": [
                            {"distance": {"value": 20000}, "duration": {"value": 1200},
                             "duration_in_traffic": {"value": 1500}},
                            {"distance": {"value": 5000}, "duration": {"value": 300},
                             "duration_in_traffic": {"value": 420}}
                        ]
                    },
                    {
                        "summary": "E20",
                        "legs": [{"distance": {"value": 28000}, "duration": {"value": 1600}}]
                    }
                ]
            })))
            .mount(&server)
            .await;

        let routes =
            client(&server.uri(), Some("test-key")).directions(ORIGIN, DESTINATION).await.expect("routes");

        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].summary, "E10");
        assert_eq!(routes[0].distance_meters, 25_000);
        assert_eq!(routes[0].duration_secs, 1_500);
        assert_eq!(routes[0].traffic_duration_secs, Some(1_920));
        assert_eq!(routes[1].traffic_duration_secs, None);
    }

    #[tokio::test]
    async fn zero_results_is_no_route() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/maps/api/directions/json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"status": "ZERO_RESULTS", "routes": []})),
            )
            .mount(&server)
            .await;

        let error = client(&server.uri(), Some("test-key"))
            .directions(ORIGIN, DESTINATION)
            .await
            .expect_err("no route");
        assert_eq!(error, ProviderError::NoRoute);
    }

    #[tokio::test]
    async fn denied_request_and_http_failure_surface_as_status_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/maps/api/directions/json"))
            .and(query_param("key", "bad-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "REQUEST_DENIED",
                "error_message": "The provided API key is invalid."
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/maps/api/directions/json"))
            .and(query_param("key", "flaky-key"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let denied = client(&server.uri(), Some("bad-key"))
            .directions(ORIGIN, DESTINATION)
            .await
            .expect_err("denied");
        assert!(matches!(denied, ProviderError::Status { ref message, .. } if message.starts_with("REQUEST_DENIED")));

        let unavailable = client(&server.uri(), Some("flaky-key"))
            .directions(ORIGIN, DESTINATION)
            .await
            .expect_err("503");
        assert!(matches!(unavailable, ProviderError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn missing_api_key_is_not_configured() {
        let error = client("http://127.0.0.1:9", None)
            .directions(ORIGIN, DESTINATION)
            .await
            .expect_err("not configured");
        assert!(matches!(error, ProviderError::NotConfigured(_)));
    }
}
