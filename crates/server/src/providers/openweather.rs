use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tripxl_core::config::WeatherConfig;
use tripxl_core::routing::{Coordinates, ProviderError, WeatherObservation, WeatherProvider};

use super::{http_client, status_error, transport_error};

const CURRENT_WEATHER_PATH: &str = "/data/2.5/weather";

/// OpenWeather current conditions at a point, metric units.
pub struct OpenWeatherClient {
    client: Client,
    base_url: String,
    api_key: SecretString,
}

impl OpenWeatherClient {
    /// `None` when weather is disabled or has no key; routing then skips the weather factor.
    pub fn from_config(config: &WeatherConfig) -> Result<Option<Self>, reqwest::Error> {
        let Some(api_key) = config.api_key.clone().filter(|_| config.enabled) else {
            return Ok(None);
        };
        Ok(Some(Self {
            client: http_client(config.timeout_secs)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        }))
    }
}

#[derive(Debug, Deserialize)]
struct CurrentWeatherBody {
    #[serde(default)]
    weather: Vec<ConditionBody>,
    #[serde(default)]
    visibility: Option<u32>,
    #[serde(default)]
    main: Option<MainBody>,
    #[serde(default)]
    wind: Option<WindBody>,
}

#[derive(Debug, Deserialize)]
struct ConditionBody {
    main: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct MainBody {
    temp: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WindBody {
    speed: Option<f64>,
}

#[async_trait::async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn current(&self, at: Coordinates) -> Result<WeatherObservation, ProviderError> {
        let response = self
            .client
            .get(format!("{}{CURRENT_WEATHER_PATH}", self.base_url))
            .query(&[
                ("lat", at.lat.to_string()),
                ("lon", at.lng.to_string()),
                ("units", "metric".to_string()),
                ("appid", self.api_key.expose_secret().to_string()),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let body: CurrentWeatherBody =
            response.json().await.map_err(|error| ProviderError::Decode(error.to_string()))?;
        let condition = body
            .weather
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Decode("weather list is empty".to_string()))?;

        Ok(WeatherObservation {
            condition: condition.main,
            description: condition.description,
            visibility_m: body.visibility,
            temperature_c: body.main.and_then(|main| main.temp),
            wind_speed_mps: body.wind.and_then(|wind| wind.speed),
        })
    }
}
