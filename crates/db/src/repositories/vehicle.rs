use sqlx::Row;

use tripxl_core::domain::fuel::FuelType;
use tripxl_core::domain::vehicle::{
    VehicleGroup, VehicleGroupId, VehicleId, VehicleMaster, VehicleType, VehicleTypeId,
};

use super::{decode_err, RepositoryError, VehicleRepository};
use crate::DbPool;

pub struct SqlVehicleRepository {
    pool: DbPool,
}

impl SqlVehicleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const GROUP_COLUMNS: &str = "id, group_code, name, region, department, group_type, is_active";
const TYPE_COLUMNS: &str = "id, group_id, type_code, name, manufacturer, model_year, fuel_type,
     fuel_efficiency_km_per_l, passenger_capacity, co2_g_per_km, is_active";
const VEHICLE_COLUMNS: &str = "id, vehicle_number, vehicle_type_id, group_id, region, department,
     current_odometer_km, is_active";

fn row_to_group(row: &sqlx::sqlite::SqliteRow) -> Result<VehicleGroup, RepositoryError> {
    Ok(VehicleGroup {
        id: VehicleGroupId(row.try_get("id").map_err(decode_err)?),
        group_code: row.try_get("group_code").map_err(decode_err)?,
        name: row.try_get("name").map_err(decode_err)?,
        region: row.try_get("region").map_err(decode_err)?,
        department: row.try_get("department").map_err(decode_err)?,
        group_type: row.try_get("group_type").map_err(decode_err)?,
        is_active: row.try_get("is_active").map_err(decode_err)?,
    })
}

fn row_to_type(row: &sqlx::sqlite::SqliteRow) -> Result<VehicleType, RepositoryError> {
    let group_id: Option<String> = row.try_get("group_id").map_err(decode_err)?;
    let fuel_type: String = row.try_get("fuel_type").map_err(decode_err)?;
    let model_year: i64 = row.try_get("model_year").map_err(decode_err)?;
    let passenger_capacity: i64 = row.try_get("passenger_capacity").map_err(decode_err)?;

    Ok(VehicleType {
        id: VehicleTypeId(row.try_get("id").map_err(decode_err)?),
        group_id: group_id.map(VehicleGroupId),
        type_code: row.try_get("type_code").map_err(decode_err)?,
        name: row.try_get("name").map_err(decode_err)?,
        manufacturer: row.try_get("manufacturer").map_err(decode_err)?,
        model_year: u16::try_from(model_year).map_err(decode_err)?,
        fuel_type: FuelType::parse(&fuel_type)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown fuel type `{fuel_type}`")))?,
        fuel_efficiency_km_per_l: row.try_get("fuel_efficiency_km_per_l").map_err(decode_err)?,
        passenger_capacity: u32::try_from(passenger_capacity).map_err(decode_err)?,
        co2_g_per_km: row.try_get("co2_g_per_km").map_err(decode_err)?,
        is_active: row.try_get("is_active").map_err(decode_err)?,
    })
}

fn row_to_vehicle(row: &sqlx::sqlite::SqliteRow) -> Result<VehicleMaster, RepositoryError> {
    let group_id: Option<String> = row.try_get("group_id").map_err(decode_err)?;

    Ok(VehicleMaster {
        id: VehicleId(row.try_get("id").map_err(decode_err)?),
        vehicle_number: row.try_get("vehicle_number").map_err(decode_err)?,
        vehicle_type_id: VehicleTypeId(row.try_get("vehicle_type_id").map_err(decode_err)?),
        group_id: group_id.map(VehicleGroupId),
        region: row.try_get("region").map_err(decode_err)?,
        department: row.try_get("department").map_err(decode_err)?,
        current_odometer_km: row.try_get("current_odometer_km").map_err(decode_err)?,
        is_active: row.try_get("is_active").map_err(decode_err)?,
    })
}

#[async_trait::async_trait]
impl VehicleRepository for SqlVehicleRepository {
    async fn list_groups(&self) -> Result<Vec<VehicleGroup>, RepositoryError> {
        let rows =
            sqlx::query(&format!("SELECT {GROUP_COLUMNS} FROM vehicle_groups ORDER BY group_code"))
                .fetch_all(&self.pool)
                .await?;
        rows.iter().map(row_to_group).collect()
    }

    async fn find_group(
        &self,
        id: &VehicleGroupId,
    ) -> Result<Option<VehicleGroup>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {GROUP_COLUMNS} FROM vehicle_groups WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_group).transpose()
    }

    async fn save_group(&self, group: VehicleGroup) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO vehicle_groups (id, group_code, name, region, department, group_type,
                                         is_active)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 group_code = excluded.group_code,
                 name = excluded.name,
                 region = excluded.region,
                 department = excluded.department,
                 group_type = excluded.group_type,
                 is_active = excluded.is_active",
        )
        .bind(&group.id.0)
        .bind(&group.group_code)
        .bind(&group.name)
        .bind(&group.region)
        .bind(&group.department)
        .bind(&group.group_type)
        .bind(group.is_active)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            RepositoryError::on_unique(error, || {
                format!("vehicle group code `{}` already exists", group.group_code)
            })
        })?;
        Ok(())
    }

    async fn list_types(&self) -> Result<Vec<VehicleType>, RepositoryError> {
        let rows =
            sqlx::query(&format!("SELECT {TYPE_COLUMNS} FROM vehicle_types ORDER BY type_code"))
                .fetch_all(&self.pool)
                .await?;
        rows.iter().map(row_to_type).collect()
    }

    async fn find_type(&self, id: &VehicleTypeId) -> Result<Option<VehicleType>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {TYPE_COLUMNS} FROM vehicle_types WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_type).transpose()
    }

    async fn save_type(&self, vehicle_type: VehicleType) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO vehicle_types (id, group_id, type_code, name, manufacturer, model_year,
                                        fuel_type, fuel_efficiency_km_per_l, passenger_capacity,
                                        co2_g_per_km, is_active)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 group_id = excluded.group_id,
                 type_code = excluded.type_code,
                 name = excluded.name,
                 manufacturer = excluded.manufacturer,
                 model_year = excluded.model_year,
                 fuel_type = excluded.fuel_type,
                 fuel_efficiency_km_per_l = excluded.fuel_efficiency_km_per_l,
                 passenger_capacity = excluded.passenger_capacity,
                 co2_g_per_km = excluded.co2_g_per_km,
                 is_active = excluded.is_active",
        )
        .bind(&vehicle_type.id.0)
        .bind(vehicle_type.group_id.as_ref().map(|id| id.0.as_str()))
        .bind(&vehicle_type.type_code)
        .bind(&vehicle_type.name)
        .bind(&vehicle_type.manufacturer)
        .bind(i64::from(vehicle_type.model_year))
        .bind(vehicle_type.fuel_type.as_str())
        .bind(vehicle_type.fuel_efficiency_km_per_l)
        .bind(i64::from(vehicle_type.passenger_capacity))
        .bind(vehicle_type.co2_g_per_km)
        .bind(vehicle_type.is_active)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            RepositoryError::on_unique(error, || {
                format!("vehicle type code `{}` already exists", vehicle_type.type_code)
            })
        })?;
        Ok(())
    }

    async fn list_vehicles(&self) -> Result<Vec<VehicleMaster>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {VEHICLE_COLUMNS} FROM vehicle_master ORDER BY vehicle_number"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_vehicle).collect()
    }

    async fn save_vehicle(&self, vehicle: VehicleMaster) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO vehicle_master (id, vehicle_number, vehicle_type_id, group_id, region,
                                         department, current_odometer_km, is_active)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 vehicle_number = excluded.vehicle_number,
                 vehicle_type_id = excluded.vehicle_type_id,
                 group_id = excluded.group_id,
                 region = excluded.region,
                 department = excluded.department,
                 current_odometer_km = excluded.current_odometer_km,
                 is_active = excluded.is_active",
        )
        .bind(&vehicle.id.0)
        .bind(&vehicle.vehicle_number)
        .bind(&vehicle.vehicle_type_id.0)
        .bind(vehicle.group_id.as_ref().map(|id| id.0.as_str()))
        .bind(&vehicle.region)
        .bind(&vehicle.department)
        .bind(vehicle.current_odometer_km)
        .bind(vehicle.is_active)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            RepositoryError::on_unique(error, || {
                format!("vehicle number `{}` is already registered", vehicle.vehicle_number)
            })
        })?;
        Ok(())
    }
}
