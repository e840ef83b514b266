use axum::{extract::State, routing::post, Json, Router};

use tripxl_core::routing::{Coordinates, RouteOptimizationRequest, RouteOptimizationResult};

use super::{ApiError, AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/routes/optimize", post(optimize_route))
}

pub async fn optimize_route(
    State(state): State<AppState>,
    Json(request): Json<RouteOptimizationRequest>,
) -> Result<Json<RouteOptimizationResult>, ApiError> {
    check_coordinates("origin", request.origin)?;
    check_coordinates("destination", request.destination)?;
    Ok(Json(state.estimator.optimize(&request).await?))
}

fn check_coordinates(field: &str, at: Coordinates) -> Result<(), ApiError> {
    if !(-90.0..=90.0).contains(&at.lat) || !(-180.0..=180.0).contains(&at.lng) {
        return Err(ApiError::BadRequest(format!(
            "{field} coordinates ({}, {}) are out of range",
            at.lat, at.lng
        )));
    }
    Ok(())
}
