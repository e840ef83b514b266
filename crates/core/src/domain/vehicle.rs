use serde::{Deserialize, Serialize};

use crate::domain::fuel::FuelType;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VehicleGroupId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VehicleTypeId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VehicleId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleGroup {
    pub id: VehicleGroupId,
    pub group_code: String,
    pub name: String,
    pub region: String,
    pub department: String,
    pub group_type: String,
    pub is_active: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VehicleType {
    pub id: VehicleTypeId,
    pub group_id: Option<VehicleGroupId>,
    pub type_code: String,
    pub name: String,
    pub manufacturer: String,
    pub model_year: u16,
    pub fuel_type: FuelType,
    pub fuel_efficiency_km_per_l: f64,
    pub passenger_capacity: u32,
    pub co2_g_per_km: f64,
    pub is_active: bool,
}

impl VehicleType {
    pub fn check(&self) -> Result<(), DomainError> {
        if self.type_code.trim().is_empty() || self.name.trim().is_empty() {
            return Err(DomainError::InvariantViolation(
                "type_code and name must not be blank".to_string(),
            ));
        }
        if !(self.fuel_efficiency_km_per_l > 0.0) {
            return Err(DomainError::InvariantViolation(
                "fuel_efficiency_km_per_l must be greater than zero".to_string(),
            ));
        }
        if self.passenger_capacity == 0 {
            return Err(DomainError::InvariantViolation(
                "passenger_capacity must be at least 1".to_string(),
            ));
        }
        if self.co2_g_per_km < 0.0 {
            return Err(DomainError::InvariantViolation(
                "co2_g_per_km must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VehicleMaster {
    pub id: VehicleId,
    pub vehicle_number: String,
    pub vehicle_type_id: VehicleTypeId,
    pub group_id: Option<VehicleGroupId>,
    pub region: String,
    pub department: String,
    pub current_odometer_km: f64,
    pub is_active: bool,
}

impl VehicleMaster {
    /// Plate numbers are compared upper-cased with all whitespace removed.
    pub fn normalize_vehicle_number(raw: &str) -> String {
        raw.chars().filter(|ch| !ch.is_whitespace()).collect::<String>().to_ascii_uppercase()
    }

    pub fn check(&mut self) -> Result<(), DomainError> {
        self.vehicle_number = Self::normalize_vehicle_number(&self.vehicle_number);
        if self.vehicle_number.is_empty() {
            return Err(DomainError::InvariantViolation(
                "vehicle_number must not be blank".to_string(),
            ));
        }
        if self.current_odometer_km < 0.0 {
            return Err(DomainError::InvariantViolation(
                "current_odometer_km must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{VehicleId, VehicleMaster, VehicleType, VehicleTypeId};
    use crate::domain::fuel::FuelType;

    #[test]
    fn vehicle_numbers_are_normalized() {
        let mut vehicle = VehicleMaster {
            id: VehicleId("V-1".to_string()),
            vehicle_number: " ad 12 345 ".to_string(),
            vehicle_type_id: VehicleTypeId("VT-1".to_string()),
            group_id: None,
            region: "Abu Dhabi".to_string(),
            department: "Operations".to_string(),
            current_odometer_km: 1200.0,
            is_active: true,
        };
        vehicle.check().expect("valid vehicle");
        assert_eq!(vehicle.vehicle_number, "AD12345");
    }

    #[test]
    fn vehicle_type_requires_positive_efficiency() {
        let vehicle_type = VehicleType {
            id: VehicleTypeId("VT-1".to_string()),
            group_id: None,
            type_code: "SEDAN".to_string(),
            name: "Sedan".to_string(),
            manufacturer: "Toyota".to_string(),
            model_year: 2024,
            fuel_type: FuelType::Petrol,
            fuel_efficiency_km_per_l: 0.0,
            passenger_capacity: 4,
            co2_g_per_km: 150.0,
            is_active: true,
        };
        assert!(vehicle_type.check().is_err());
    }
}
