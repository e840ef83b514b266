use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Deserialize;
use tracing::info;

use tripxl_core::domain::employee::{Employee, EmployeeId, EmployeeRole};

use super::{new_id, require_text, ApiError, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/employees", get(list_employees).post(create_employee))
        .route("/api/employees/approvers", get(list_approvers))
}

#[derive(Debug, Deserialize)]
pub struct CreateEmployeeRequest {
    pub employee_code: String,
    pub name: String,
    pub email: String,
    pub region: String,
    pub department: String,
    pub unit: String,
    #[serde(default)]
    pub designation: String,
    #[serde(default = "default_role")]
    pub role: EmployeeRole,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_role() -> EmployeeRole {
    EmployeeRole::Employee
}

fn default_active() -> bool {
    true
}

pub async fn list_employees(State(state): State<AppState>) -> Result<Json<Vec<Employee>>, ApiError> {
    Ok(Json(state.employees.list().await?))
}

/// Active employees that may be named as workflow approvers.
pub async fn list_approvers(State(state): State<AppState>) -> Result<Json<Vec<Employee>>, ApiError> {
    let approvers =
        state.employees.list().await?.into_iter().filter(Employee::can_approve).collect();
    Ok(Json(approvers))
}

pub async fn create_employee(
    State(state): State<AppState>,
    Json(body): Json<CreateEmployeeRequest>,
) -> Result<(StatusCode, Json<Employee>), ApiError> {
    let email = require_text("email", &body.email)?;
    if !email.contains('@') {
        return Err(ApiError::BadRequest(format!("`{email}` is not an email address")));
    }

    let employee = Employee {
        id: EmployeeId(new_id("EMP")),
        employee_code: require_text("employee_code", &body.employee_code)?,
        name: require_text("name", &body.name)?,
        email,
        region: require_text("region", &body.region)?,
        department: require_text("department", &body.department)?,
        unit: require_text("unit", &body.unit)?,
        designation: body.designation.trim().to_string(),
        role: body.role,
        is_active: body.is_active,
    };
    state.employees.save(employee.clone()).await?;

    info!(
        event_name = "api.employee.created",
        employee_id = %employee.id,
        role = employee.role.as_str(),
        "employee created"
    );
    Ok((StatusCode::CREATED, Json(employee)))
}
