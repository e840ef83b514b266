use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    /// Provider condition group, e.g. `Rain`, `Snow`, `Mist`.
    pub condition: String,
    pub description: String,
    pub visibility_m: Option<u32>,
    pub temperature_c: Option<f64>,
    pub wind_speed_mps: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WeatherCondition {
    Clear,
    Rain,
    Snow,
    Thunderstorm,
    LowVisibility,
}

impl WeatherCondition {
    pub fn classify(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "rain" | "drizzle" => Self::Rain,
            "snow" => Self::Snow,
            "thunderstorm" => Self::Thunderstorm,
            "fog" | "mist" | "haze" => Self::LowVisibility,
            _ => Self::Clear,
        }
    }

    pub fn multiplier(&self) -> f64 {
        match self {
            Self::Clear => 1.0,
            Self::Rain => 1.2,
            Self::Snow => 1.4,
            Self::Thunderstorm => 1.5,
            Self::LowVisibility => 1.3,
        }
    }
}

const SEVERE_VISIBILITY_M: u32 = 1_000;
const REDUCED_VISIBILITY_M: u32 = 3_000;

fn visibility_boost(visibility_m: Option<u32>) -> f64 {
    match visibility_m {
        Some(meters) if meters < SEVERE_VISIBILITY_M => 1.2,
        Some(meters) if meters < REDUCED_VISIBILITY_M => 1.1,
        _ => 1.0,
    }
}

pub fn weather_multiplier(observation: &WeatherObservation) -> f64 {
    WeatherCondition::classify(&observation.condition).multiplier()
        * visibility_boost(observation.visibility_m)
}

pub fn weather_alerts(observation: &WeatherObservation) -> Vec<String> {
    let mut alerts = Vec::new();
    if WeatherCondition::classify(&observation.condition) != WeatherCondition::Clear {
        alerts.push(format!("Weather alert: {} may slow travel", observation.condition.trim()));
    }
    if let Some(meters) = observation.visibility_m.filter(|meters| *meters < REDUCED_VISIBILITY_M)
    {
        alerts.push(format!("Low visibility: {meters} m"));
    }
    alerts
}
