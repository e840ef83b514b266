use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Deserialize;
use tracing::info;

use tripxl_core::domain::fuel::FuelType;
use tripxl_core::domain::vehicle::{
    VehicleGroup, VehicleGroupId, VehicleId, VehicleMaster, VehicleType, VehicleTypeId,
};

use super::{new_id, require_text, ApiError, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/vehicle-groups", get(list_groups).post(create_group))
        .route("/api/vehicle-types", get(list_types).post(create_type))
        .route("/api/vehicle-master", get(list_vehicles).post(create_vehicle))
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub group_code: String,
    pub name: String,
    pub region: String,
    pub department: String,
    #[serde(default)]
    pub group_type: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateTypeRequest {
    pub group_id: Option<String>,
    pub type_code: String,
    pub name: String,
    #[serde(default)]
    pub manufacturer: String,
    pub model_year: u16,
    pub fuel_type: FuelType,
    pub fuel_efficiency_km_per_l: f64,
    pub passenger_capacity: u32,
    #[serde(default)]
    pub co2_g_per_km: f64,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateVehicleRequest {
    pub vehicle_number: String,
    pub vehicle_type_id: String,
    pub group_id: Option<String>,
    pub region: String,
    pub department: String,
    #[serde(default)]
    pub current_odometer_km: f64,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

pub async fn list_groups(
    State(state): State<AppState>,
) -> Result<Json<Vec<VehicleGroup>>, ApiError> {
    Ok(Json(state.vehicles.list_groups().await?))
}

pub async fn create_group(
    State(state): State<AppState>,
    Json(body): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<VehicleGroup>), ApiError> {
    let group = VehicleGroup {
        id: VehicleGroupId(new_id("VG")),
        group_code: require_text("group_code", &body.group_code)?.to_ascii_uppercase(),
        name: require_text("name", &body.name)?,
        region: require_text("region", &body.region)?,
        department: require_text("department", &body.department)?,
        group_type: body.group_type.trim().to_string(),
        is_active: body.is_active,
    };
    state.vehicles.save_group(group.clone()).await?;

    info!(event_name = "api.vehicle_group.created", group_code = %group.group_code, "vehicle group created");
    Ok((StatusCode::CREATED, Json(group)))
}

pub async fn list_types(State(state): State<AppState>) -> Result<Json<Vec<VehicleType>>, ApiError> {
    Ok(Json(state.vehicles.list_types().await?))
}

pub async fn create_type(
    State(state): State<AppState>,
    Json(body): Json<CreateTypeRequest>,
) -> Result<(StatusCode, Json<VehicleType>), ApiError> {
    let group_id = existing_group(&state, body.group_id).await?;
    let vehicle_type = VehicleType {
        id: VehicleTypeId(new_id("VT")),
        group_id,
        type_code: body.type_code.trim().to_ascii_uppercase(),
        name: body.name.trim().to_string(),
        manufacturer: body.manufacturer.trim().to_string(),
        model_year: body.model_year,
        fuel_type: body.fuel_type,
        fuel_efficiency_km_per_l: body.fuel_efficiency_km_per_l,
        passenger_capacity: body.passenger_capacity,
        co2_g_per_km: body.co2_g_per_km,
        is_active: body.is_active,
    };
    vehicle_type.check()?;
    state.vehicles.save_type(vehicle_type.clone()).await?;

    info!(
        event_name = "api.vehicle_type.created",
        type_code = %vehicle_type.type_code,
        fuel_type = vehicle_type.fuel_type.as_str(),
        "vehicle type created"
    );
    Ok((StatusCode::CREATED, Json(vehicle_type)))
}

pub async fn list_vehicles(
    State(state): State<AppState>,
) -> Result<Json<Vec<VehicleMaster>>, ApiError> {
    Ok(Json(state.vehicles.list_vehicles().await?))
}

pub async fn create_vehicle(
    State(state): State<AppState>,
    Json(body): Json<CreateVehicleRequest>,
) -> Result<(StatusCode, Json<VehicleMaster>), ApiError> {
    let vehicle_type_id = VehicleTypeId(body.vehicle_type_id.trim().to_string());
    if state.vehicles.find_type(&vehicle_type_id).await?.is_none() {
        return Err(ApiError::BadRequest(format!(
            "unknown vehicle type `{}`",
            vehicle_type_id.0
        )));
    }
    let group_id = existing_group(&state, body.group_id).await?;

    let mut vehicle = VehicleMaster {
        id: VehicleId(new_id("VEH")),
        vehicle_number: body.vehicle_number,
        vehicle_type_id,
        group_id,
        region: require_text("region", &body.region)?,
        department: require_text("department", &body.department)?,
        current_odometer_km: body.current_odometer_km,
        is_active: body.is_active,
    };
    vehicle.check()?;
    state.vehicles.save_vehicle(vehicle.clone()).await?;

    info!(
        event_name = "api.vehicle.registered",
        vehicle_number = %vehicle.vehicle_number,
        vehicle_type_id = %vehicle.vehicle_type_id.0,
        "vehicle registered"
    );
    Ok((StatusCode::CREATED, Json(vehicle)))
}

async fn existing_group(
    state: &AppState,
    raw: Option<String>,
) -> Result<Option<VehicleGroupId>, ApiError> {
    let Some(id) = raw.map(|id| id.trim().to_string()).filter(|id| !id.is_empty()) else {
        return Ok(None);
    };
    let id = VehicleGroupId(id);
    if state.vehicles.find_group(&id).await?.is_none() {
        return Err(ApiError::BadRequest(format!("unknown vehicle group `{}`", id.0)));
    }
    Ok(Some(id))
}

#[cfg(test)]
mod tests {
    use axum::{extract::State, http::StatusCode, Json};
    use tripxl_core::domain::fuel::FuelType;

    use super::*;
    use crate::api::testing::state;
    use crate::api::AppState;

    fn sedan() -> CreateTypeRequest {
        CreateTypeRequest {
            group_id: None,
            type_code: "sedan".to_string(),
            name: "Sedan".to_string(),
            manufacturer: "Toyota".to_string(),
            model_year: 2025,
            fuel_type: FuelType::Super,
            fuel_efficiency_km_per_l: 15.0,
            passenger_capacity: 4,
            co2_g_per_km: 140.0,
            is_active: true,
        }
    }

    fn plate(vehicle_number: &str, vehicle_type_id: &str) -> CreateVehicleRequest {
        CreateVehicleRequest {
            vehicle_number: vehicle_number.to_string(),
            vehicle_type_id: vehicle_type_id.to_string(),
            group_id: None,
            region: "Dubai".to_string(),
            department: "Finance".to_string(),
            current_odometer_km: 18_250.0,
            is_active: true,
        }
    }

    async fn created_type(state: &AppState) -> VehicleType {
        let (_, Json(vehicle_type)) =
            create_type(State(state.clone()), Json(sedan())).await.expect("type");
        vehicle_type
    }

    #[tokio::test]
    async fn type_codes_are_upper_cased_and_validated() {
        let state = state();
        let vehicle_type = created_type(&state).await;
        assert_eq!(vehicle_type.type_code, "SEDAN");

        let mut broken = sedan();
        broken.type_code = "van".to_string();
        broken.passenger_capacity = 0;
        let error = create_type(State(state), Json(broken)).await.expect_err("capacity");
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn type_with_unknown_group_is_rejected() {
        let mut body = sedan();
        body.group_id = Some("VG-missing".to_string());
        let error = create_type(State(state()), Json(body)).await.expect_err("group");
        assert!(error.to_string().contains("VG-missing"));
    }

    #[tokio::test]
    async fn vehicle_numbers_are_normalized_and_unique() {
        let state = state();
        let vehicle_type = created_type(&state).await;

        let (status, Json(vehicle)) =
            create_vehicle(State(state.clone()), Json(plate(" dxb 77 120 ", &vehicle_type.id.0)))
                .await
                .expect("register");
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(vehicle.vehicle_number, "DXB77120");

        let error = create_vehicle(State(state.clone()), Json(plate("DXB77120", &vehicle_type.id.0)))
            .await
            .expect_err("duplicate plate");
        assert_eq!(error.status(), StatusCode::CONFLICT);

        let Json(fleet) = list_vehicles(State(state)).await.expect("list");
        assert_eq!(fleet.len(), 1);
    }

    #[tokio::test]
    async fn vehicle_requires_known_type() {
        let error = create_vehicle(State(state()), Json(plate("AD1", "VT-missing")))
            .await
            .expect_err("unknown type");
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn duplicate_group_code_conflicts() {
        let state = state();
        let body = || CreateGroupRequest {
            group_code: "ad-pool".to_string(),
            name: "Abu Dhabi Pool".to_string(),
            region: "Abu Dhabi".to_string(),
            department: "Operations".to_string(),
            group_type: "pool".to_string(),
            is_active: true,
        };
        let (_, Json(group)) = create_group(State(state.clone()), Json(body())).await.expect("group");
        assert_eq!(group.group_code, "AD-POOL");

        let error = create_group(State(state), Json(body())).await.expect_err("duplicate");
        assert_eq!(error.status(), StatusCode::CONFLICT);
    }
}
