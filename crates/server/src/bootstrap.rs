use std::sync::Arc;

use axum::Router;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::info;
use tripxl_core::config::{AppConfig, ConfigError, LoadOptions};
use tripxl_core::routing::{DirectionsProvider, WeatherProvider};
use tripxl_db::{connect_with_config, migrations, DbPool};

use crate::api::{self, AppState};
use crate::health::{self, ProviderSetup};
use crate::providers::{GoogleDirectionsClient, OpenWeatherClient};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("http client construction failed: {0}")]
    HttpClient(#[source] reqwest::Error),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let directions: Arc<dyn DirectionsProvider> = Arc::new(
        GoogleDirectionsClient::from_config(&config.maps).map_err(BootstrapError::HttpClient)?,
    );
    let weather = OpenWeatherClient::from_config(&config.weather)
        .map_err(BootstrapError::HttpClient)?
        .map(|client| Arc::new(client) as Arc<dyn WeatherProvider>);
    info!(
        event_name = "system.bootstrap.providers_ready",
        maps_key_configured = config.maps.api_key.is_some(),
        weather_enabled = weather.is_some(),
        "routing providers initialized"
    );

    let state = AppState::with_sql(db_pool.clone(), directions, weather);
    Ok(Application { config, db_pool, state })
}

/// API routes, `/health`, and request tracing.
pub fn app_router(app: &Application) -> Router {
    api::router(app.state.clone())
        .merge(health::router(app.db_pool.clone(), ProviderSetup::from_config(&app.config)))
        .layer(TraceLayer::new_for_http())
}
