use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use tracing::warn;
use tripxl_core::config::AppConfig;
use tripxl_db::{ping, DbPool};

/// What the routing providers were started with; fixed for the process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProviderSetup {
    pub maps_key_configured: bool,
    pub weather_enabled: bool,
}

impl ProviderSetup {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            maps_key_configured: config.maps.api_key.is_some(),
            weather_enabled: config.weather.enabled,
        }
    }
}

#[derive(Clone)]
pub struct ReadinessState {
    db_pool: DbPool,
    providers: ProviderSetup,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    /// Bookings, approvals and route estimates all work.
    Ready,
    /// Bookings work; route estimation will fail.
    Limited,
    Unavailable,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ComponentStatus {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReadinessReport {
    pub status: Readiness,
    pub version: &'static str,
    pub database: ComponentStatus,
    pub directions: ComponentStatus,
    pub weather: ComponentStatus,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool, providers: ProviderSetup) -> Router {
    Router::new().route("/health", get(health)).with_state(ReadinessState { db_pool, providers })
}

pub async fn health(State(state): State<ReadinessState>) -> (StatusCode, Json<ReadinessReport>) {
    let database = match ping(&state.db_pool).await {
        Ok(()) => ComponentStatus { status: "up", detail: "SELECT 1 succeeded".to_string() },
        Err(error) => {
            warn!(event_name = "system.health.database_down", error = %error, "database ping failed");
            ComponentStatus { status: "down", detail: error.to_string() }
        }
    };

    let directions = if state.providers.maps_key_configured {
        ComponentStatus { status: "configured", detail: "Google Directions".to_string() }
    } else {
        ComponentStatus {
            status: "unconfigured",
            detail: "maps.api_key is unset; route optimization returns 502".to_string(),
        }
    };

    let weather = if state.providers.weather_enabled {
        ComponentStatus { status: "configured", detail: "OpenWeather".to_string() }
    } else {
        ComponentStatus {
            status: "disabled",
            detail: "estimates use traffic adjustment only".to_string(),
        }
    };

    let status = match (database.status, directions.status) {
        ("down", _) => Readiness::Unavailable,
        (_, "unconfigured") => Readiness::Limited,
        _ => Readiness::Ready,
    };
    let code = match status {
        Readiness::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        Readiness::Ready | Readiness::Limited => StatusCode::OK,
    };

    let report = ReadinessReport {
        status,
        version: env!("CARGO_PKG_VERSION"),
        database,
        directions,
        weather,
        checked_at: Utc::now().to_rfc3339(),
    };
    (code, Json(report))
}
