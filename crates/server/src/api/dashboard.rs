use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tripxl_core::domain::vehicle::VehicleTypeId;
use tripxl_core::metrics::{estimate_fuel_cost, BookingSummary, FleetFuelSummary, FuelCostEstimate};
use tripxl_db::repositories::BookingFilter;

use super::{ApiError, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/dashboard/metrics", get(metrics))
        .route("/api/dashboard/fuel-estimate", post(fuel_estimate))
}

#[derive(Debug, Serialize)]
pub struct FleetCounts {
    pub vehicles: u64,
    pub active_vehicles: u64,
    pub vehicle_types: u64,
}

#[derive(Debug, Serialize)]
pub struct DashboardMetrics {
    pub bookings: BookingSummary,
    pub fleet: FleetCounts,
    pub fuel: FleetFuelSummary,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct FuelEstimateRequest {
    pub vehicle_type_id: String,
    pub distance_km: f64,
}

pub async fn metrics(State(state): State<AppState>) -> Result<Json<DashboardMetrics>, ApiError> {
    let bookings = state.bookings.list(&BookingFilter::default()).await?;
    let vehicle_types = state.vehicles.list_types().await?;
    let vehicles = state.vehicles.list_vehicles().await?;
    let latest_prices = state.fuel_prices.latest().await?;

    Ok(Json(DashboardMetrics {
        bookings: BookingSummary::from_bookings(&bookings),
        fleet: FleetCounts {
            vehicles: vehicles.len() as u64,
            active_vehicles: vehicles.iter().filter(|vehicle| vehicle.is_active).count() as u64,
            vehicle_types: vehicle_types.len() as u64,
        },
        fuel: FleetFuelSummary::build(&vehicle_types, &vehicles, &latest_prices),
        generated_at: Utc::now(),
    }))
}

/// Trip fuel cost at the latest recorded price for the type's fuel.
pub async fn fuel_estimate(
    State(state): State<AppState>,
    Json(body): Json<FuelEstimateRequest>,
) -> Result<Json<FuelCostEstimate>, ApiError> {
    let id = body.vehicle_type_id.trim().to_string();
    let vehicle_type = state
        .vehicles
        .find_type(&VehicleTypeId(id.clone()))
        .await?
        .ok_or_else(|| ApiError::not_found("vehicle type", &id))?;

    let price = state
        .fuel_prices
        .latest()
        .await?
        .into_iter()
        .find(|record| record.fuel_type == vehicle_type.fuel_type)
        .ok_or_else(|| {
            ApiError::NotFound(format!("no price recorded for {}", vehicle_type.fuel_type))
        })?;

    Ok(Json(estimate_fuel_cost(&vehicle_type, body.distance_km, price.price_per_litre)?))
}
