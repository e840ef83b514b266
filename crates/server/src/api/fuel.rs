use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use tripxl_core::domain::fuel::{FuelPriceRecord, FuelPriceSnapshot};

use super::{ApiError, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/fuel-types/update", post(update_prices))
        .route("/api/fuel-types/latest", get(latest_prices))
}

#[derive(Debug, Serialize)]
pub struct FuelUpdateResponse {
    pub recorded: usize,
    pub effective_at: DateTime<Utc>,
    pub source: String,
}

/// Appends a price announcement to the history. Earlier rows are kept.
pub async fn update_prices(
    State(state): State<AppState>,
    Json(snapshot): Json<FuelPriceSnapshot>,
) -> Result<(StatusCode, Json<FuelUpdateResponse>), ApiError> {
    if snapshot.prices.is_empty() {
        return Err(ApiError::BadRequest("prices must contain at least one fuel type".to_string()));
    }
    if let Some((fuel_type, price)) =
        snapshot.prices.iter().find(|(_, price)| **price <= Decimal::ZERO)
    {
        return Err(ApiError::BadRequest(format!(
            "price for {fuel_type} must be positive, got {price}"
        )));
    }
    if snapshot.source.trim().is_empty() {
        return Err(ApiError::BadRequest("source must not be blank".to_string()));
    }

    let effective_at = snapshot.date;
    let source = snapshot.source.trim().to_string();
    let recorded = state
        .fuel_prices
        .record(FuelPriceSnapshot { source: source.clone(), ..snapshot }.into_records())
        .await?;

    info!(
        event_name = "api.fuel.prices_recorded",
        recorded,
        effective_at = %effective_at,
        source = %source,
        "fuel prices recorded"
    );
    Ok((StatusCode::CREATED, Json(FuelUpdateResponse { recorded, effective_at, source })))
}

pub async fn latest_prices(
    State(state): State<AppState>,
) -> Result<Json<Vec<FuelPriceRecord>>, ApiError> {
    Ok(Json(state.fuel_prices.latest().await?))
}
