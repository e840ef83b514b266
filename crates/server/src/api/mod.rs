//! JSON API routes.
//!
//! - `/api/bookings`            submit, list, approve / reject, cancel / complete
//! - `/api/approval-workflows`  workflow administration and dry-run resolution
//! - `/api/employees`           employee directory
//! - `/api/vehicle-*`           vehicle group, type and master records
//! - `/api/fuel-types`          fuel price history
//! - `/api/routes/optimize`     traffic and weather adjusted ETA
//! - `/api/dashboard`           booking and fleet metrics

pub mod bookings;
pub mod dashboard;
pub mod employees;
pub mod fuel;
pub mod routes;
pub mod vehicles;
pub mod workflows;

use std::sync::Arc;

use axum::{http::StatusCode, response::IntoResponse, Json, Router};
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

use tripxl_core::approvals::{
    ApprovalError, InMemoryEmployeeDirectory, MatchError, ResolutionError, RoutingError,
};
use tripxl_core::errors::DomainError;
use tripxl_core::routing::{DirectionsProvider, RouteError, RouteEstimator, WeatherProvider};
use tripxl_db::repositories::{
    BookingRepository, EmployeeRepository, FuelPriceRepository, RepositoryError,
    SqlBookingRepository, SqlEmployeeRepository, SqlFuelPriceRepository, SqlVehicleRepository,
    SqlWorkflowRepository, VehicleRepository, WorkflowRepository,
};
use tripxl_db::DbPool;

pub type SharedEstimator = RouteEstimator<Arc<dyn DirectionsProvider>, Arc<dyn WeatherProvider>>;

#[derive(Clone)]
pub struct AppState {
    pub employees: Arc<dyn EmployeeRepository>,
    pub workflows: Arc<dyn WorkflowRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub vehicles: Arc<dyn VehicleRepository>,
    pub fuel_prices: Arc<dyn FuelPriceRepository>,
    pub estimator: Arc<SharedEstimator>,
}

impl AppState {
    pub fn with_sql(
        db_pool: DbPool,
        directions: Arc<dyn DirectionsProvider>,
        weather: Option<Arc<dyn WeatherProvider>>,
    ) -> Self {
        Self {
            employees: Arc::new(SqlEmployeeRepository::new(db_pool.clone())),
            workflows: Arc::new(SqlWorkflowRepository::new(db_pool.clone())),
            bookings: Arc::new(SqlBookingRepository::new(db_pool.clone())),
            vehicles: Arc::new(SqlVehicleRepository::new(db_pool.clone())),
            fuel_prices: Arc::new(SqlFuelPriceRepository::new(db_pool)),
            estimator: Arc::new(RouteEstimator::new(directions, weather)),
        }
    }

    /// Snapshot of all employees, used to resolve workflow approvers.
    pub(crate) async fn employee_directory(&self) -> Result<InMemoryEmployeeDirectory, ApiError> {
        Ok(InMemoryEmployeeDirectory::new(self.employees.list().await?))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(bookings::routes())
        .merge(workflows::routes())
        .merge(employees::routes())
        .merge(vehicles::routes())
        .merge(fuel::routes())
        .merge(routes::routes())
        .merge(dashboard::routes())
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unprocessable(String),
    #[error("failed to optimize route")]
    Upstream,
    #[error("an internal error occurred")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Upstream => StatusCode::BAD_GATEWAY,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn not_found(entity: &str, id: &str) -> Self {
        Self::NotFound(format!("{entity} `{id}` not found"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status(), Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

impl From<RepositoryError> for ApiError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Conflict(message) => Self::Conflict(message),
            other => {
                error!(event_name = "api.repository.error", error = %other, "repository failure");
                Self::Internal
            }
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(value: DomainError) -> Self {
        Self::BadRequest(value.to_string())
    }
}

impl From<MatchError> for ApiError {
    fn from(value: MatchError) -> Self {
        match value {
            MatchError::NoMatchingWorkflow { .. } => Self::Unprocessable(value.to_string()),
            MatchError::AmbiguousWorkflow { .. } => Self::Conflict(value.to_string()),
        }
    }
}

impl From<RoutingError> for ApiError {
    fn from(value: RoutingError) -> Self {
        Self::Unprocessable(value.to_string())
    }
}

impl From<ResolutionError> for ApiError {
    fn from(value: ResolutionError) -> Self {
        match value {
            ResolutionError::Match(error) => error.into(),
            ResolutionError::Routing(error) => error.into(),
        }
    }
}

impl From<ApprovalError> for ApiError {
    fn from(value: ApprovalError) -> Self {
        Self::BadRequest(value.to_string())
    }
}

impl From<RouteError> for ApiError {
    fn from(value: RouteError) -> Self {
        let RouteError::OptimizationFailed(cause) = &value;
        error!(event_name = "api.routes.optimize_failed", cause = %cause, "route optimization failed");
        Self::Upstream
    }
}

pub(crate) fn new_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

pub(crate) fn require_text(field: &str, value: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::BadRequest(format!("{field} must not be blank")));
    }
    Ok(trimmed.to_string())
}
