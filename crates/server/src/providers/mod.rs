//! reqwest clients for the outbound mapping and weather providers.

pub mod google;
pub mod openweather;

use std::time::Duration;

use reqwest::Client;
use tripxl_core::routing::ProviderError;

pub use google::GoogleDirectionsClient;
pub use openweather::OpenWeatherClient;

pub(crate) fn http_client(timeout_secs: u64) -> Result<Client, reqwest::Error> {
    Client::builder().timeout(Duration::from_secs(timeout_secs)).build()
}

pub(crate) fn transport_error(error: reqwest::Error) -> ProviderError {
    ProviderError::Transport(error.without_url().to_string())
}

/// Turns a non-2xx response into `ProviderError::Status`, keeping a short body excerpt.
pub(crate) async fn status_error(response: reqwest::Response) -> ProviderError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    ProviderError::Status { status, message: body.chars().take(200).collect() }
}
