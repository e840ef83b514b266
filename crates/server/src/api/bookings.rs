use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use tripxl_core::approvals::{ApprovalRouter, WorkflowMatcher};
use tripxl_core::domain::booking::{
    ApprovalDecision, Booking, BookingId, BookingPriority, BookingStatus, Location,
};
use tripxl_core::domain::employee::EmployeeId;
use tripxl_core::domain::vehicle::VehicleTypeId;
use tripxl_core::routing::{Coordinates, RouteOptimizationRequest};
use tripxl_db::repositories::BookingFilter;

use super::{new_id, ApiError, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/bookings", get(list_bookings).post(submit_booking))
        .route("/api/bookings/{id}", get(get_booking))
        .route("/api/bookings/{id}/approve", post(approve_booking))
        .route("/api/bookings/{id}/reject", post(reject_booking))
        .route("/api/bookings/{id}/cancel", post(cancel_booking))
        .route("/api/bookings/{id}/complete", post(complete_booking))
}

#[derive(Debug, Default, Deserialize)]
pub struct BookingListQuery {
    pub status: Option<String>,
    pub employee_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitBookingRequest {
    pub employee_id: String,
    pub region: Option<String>,
    pub department: Option<String>,
    pub unit: Option<String>,
    pub pickup: Location,
    pub dropoff: Location,
    pub pickup_time: DateTime<Utc>,
    pub dropoff_time: DateTime<Utc>,
    pub purpose: String,
    #[serde(default = "default_priority")]
    pub priority: BookingPriority,
    #[serde(default = "default_passenger_count")]
    pub passenger_count: u32,
    pub vehicle_type_id: Option<String>,
    /// Runs the route estimator and stores its ETA on the booking.
    #[serde(default)]
    pub estimate_route: bool,
}

fn default_priority() -> BookingPriority {
    BookingPriority::Normal
}

fn default_passenger_count() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct ApprovalActionRequest {
    pub approver_id: String,
    pub comments: Option<String>,
}

pub async fn list_bookings(
    State(state): State<AppState>,
    Query(query): Query<BookingListQuery>,
) -> Result<Json<Vec<Booking>>, ApiError> {
    let status = match query.status.as_deref().map(str::trim).filter(|raw| !raw.is_empty()) {
        Some(raw) => Some(
            BookingStatus::parse(raw)
                .ok_or_else(|| ApiError::BadRequest(format!("unknown booking status `{raw}`")))?,
        ),
        None => None,
    };
    let filter = BookingFilter {
        status,
        employee_id: query
            .employee_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .map(EmployeeId),
    };
    Ok(Json(state.bookings.list(&filter).await?))
}

pub async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Booking>, ApiError> {
    Ok(Json(load_booking(&state, &id).await?))
}

/// Resolves the approval chain for the requester's scope and stores the
/// booking as `pending`.
pub async fn submit_booking(
    State(state): State<AppState>,
    Json(body): Json<SubmitBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), ApiError> {
    let employee_id = EmployeeId(body.employee_id.trim().to_string());
    let requester = state
        .employees
        .find_by_id(&employee_id)
        .await?
        .ok_or_else(|| ApiError::not_found("employee", &employee_id.0))?;
    if !requester.is_active {
        return Err(ApiError::BadRequest(format!("employee `{}` is inactive", requester.id)));
    }

    let vehicle_type_id = match body.vehicle_type_id.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => {
            let id = VehicleTypeId(raw.to_string());
            if state.vehicles.find_type(&id).await?.is_none() {
                return Err(ApiError::BadRequest(format!("unknown vehicle type `{raw}`")));
            }
            Some(id)
        }
        _ => None,
    };

    let region = scope_field(body.region, &requester.region);
    let department = scope_field(body.department, &requester.department);
    let unit = scope_field(body.unit, &requester.unit);

    let matcher = WorkflowMatcher::new(state.workflows.list().await?);
    let directory = state.employee_directory().await?;
    let resolved = ApprovalRouter.resolve(&matcher, &region, &department, &unit, &directory)?;

    let now = Utc::now();
    let mut booking = Booking {
        id: BookingId(new_id("BK")),
        employee_id,
        region,
        department,
        unit,
        pickup: body.pickup,
        dropoff: body.dropoff,
        pickup_time: body.pickup_time,
        dropoff_time: body.dropoff_time,
        purpose: body.purpose.trim().to_string(),
        priority: body.priority,
        passenger_count: body.passenger_count,
        vehicle_type_id,
        status: BookingStatus::Pending,
        approval_plan: resolved.plan,
        approvals: Vec::new(),
        estimated_duration_secs: None,
        created_at: now,
        updated_at: now,
    };
    booking.check_trip()?;

    if body.estimate_route {
        let request = RouteOptimizationRequest {
            origin: Coordinates { lat: booking.pickup.lat, lng: booking.pickup.lng },
            destination: Coordinates { lat: booking.dropoff.lat, lng: booking.dropoff.lng },
            include_weather: true,
        };
        match state.estimator.optimize(&request).await {
            Ok(result) => booking.estimated_duration_secs = Some(result.estimated_duration_secs),
            Err(error) => warn!(
                event_name = "api.booking.estimate_skipped",
                booking_id = %booking.id,
                error = %error,
                "submitting booking without route estimate"
            ),
        }
    }

    state.bookings.save(booking.clone()).await?;
    info!(
        event_name = "api.booking.submitted",
        booking_id = %booking.id,
        employee_id = %booking.employee_id,
        workflow_id = %booking.approval_plan.workflow_id,
        levels_required = booking.approval_plan.levels_required.as_str(),
        level_1_approver = %resolved.level_1_approver.id,
        "booking submitted"
    );
    Ok((StatusCode::CREATED, Json(booking)))
}

pub async fn approve_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ApprovalActionRequest>,
) -> Result<Json<Booking>, ApiError> {
    decide(&state, &id, body, ApprovalDecision::Approved).await
}

pub async fn reject_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ApprovalActionRequest>,
) -> Result<Json<Booking>, ApiError> {
    decide(&state, &id, body, ApprovalDecision::Rejected).await
}

pub async fn cancel_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Booking>, ApiError> {
    transition(&state, &id, BookingStatus::Cancelled).await
}

pub async fn complete_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Booking>, ApiError> {
    transition(&state, &id, BookingStatus::Completed).await
}

async fn decide(
    state: &AppState,
    id: &str,
    body: ApprovalActionRequest,
    decision: ApprovalDecision,
) -> Result<Json<Booking>, ApiError> {
    let mut booking = load_booking(state, id).await?;
    let previous = booking.status;
    let approver_id = EmployeeId(body.approver_id.trim().to_string());
    let approval =
        ApprovalRouter.decide(&mut booking, &approver_id, decision, body.comments, Utc::now())?;
    state.bookings.update_status(booking.clone(), previous).await?;

    info!(
        event_name = "api.booking.decided",
        booking_id = %booking.id,
        level = approval.level,
        decision = decision.as_str(),
        status = booking.status.as_str(),
        "approval recorded"
    );
    Ok(Json(booking))
}

async fn transition(
    state: &AppState,
    id: &str,
    next: BookingStatus,
) -> Result<Json<Booking>, ApiError> {
    let mut booking = load_booking(state, id).await?;
    let previous = booking.status;
    booking.transition_to(next, Utc::now())?;
    state.bookings.update_status(booking.clone(), previous).await?;

    info!(
        event_name = "api.booking.transitioned",
        booking_id = %booking.id,
        from = previous.as_str(),
        to = next.as_str(),
        "booking status changed"
    );
    Ok(Json(booking))
}

async fn load_booking(state: &AppState, id: &str) -> Result<Booking, ApiError> {
    state
        .bookings
        .find_by_id(&BookingId(id.to_string()))
        .await?
        .ok_or_else(|| ApiError::not_found("booking", id))
}

fn scope_field(supplied: Option<String>, fallback: &str) -> String {
    supplied
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}
