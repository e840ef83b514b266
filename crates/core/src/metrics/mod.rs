//! Dashboard figures derived from bookings, vehicle masters and fuel prices.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::booking::{Booking, BookingStatus};
use crate::domain::fuel::{FuelPriceRecord, FuelType};
use crate::domain::vehicle::{VehicleMaster, VehicleType, VehicleTypeId};
use crate::errors::DomainError;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BookingSummary {
    pub total: u64,
    pub by_status: BTreeMap<String, u64>,
    /// Bookings still waiting on an approver.
    pub awaiting_approval: u64,
    /// Approved (or completed) share of decided bookings, 0.0 to 1.0.
    pub approval_rate: f64,
}

impl BookingSummary {
    pub fn from_bookings(bookings: &[Booking]) -> Self {
        let mut by_status: BTreeMap<String, u64> =
            BookingStatus::ALL.iter().map(|status| (status.as_str().to_string(), 0)).collect();
        let mut awaiting_approval = 0;
        let mut approved = 0u64;
        let mut rejected = 0u64;

        for booking in bookings {
            *by_status.entry(booking.status.as_str().to_string()).or_default() += 1;
            match booking.status {
                BookingStatus::Completed => approved += 1,
                BookingStatus::Rejected => rejected += 1,
                BookingStatus::Pending => awaiting_approval += 1,
                BookingStatus::Level1Approved | BookingStatus::Level2Approved => {
                    if booking.is_fully_approved() {
                        approved += 1;
                    } else {
                        awaiting_approval += 1;
                    }
                }
                BookingStatus::Cancelled => {}
            }
        }

        let decided = approved + rejected;
        let approval_rate = if decided == 0 { 0.0 } else { approved as f64 / decided as f64 };
        Self { total: bookings.len() as u64, by_status, awaiting_approval, approval_rate }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FuelCostEstimate {
    pub vehicle_type_id: VehicleTypeId,
    pub fuel_type: FuelType,
    pub distance_km: f64,
    pub litres: f64,
    pub price_per_litre: Decimal,
    pub fuel_cost: Decimal,
    pub co2_kg: f64,
}

fn decimal_from(value: f64, what: &str) -> Result<Decimal, DomainError> {
    Decimal::try_from(value)
        .map_err(|_| DomainError::InvariantViolation(format!("{what} is not representable")))
}

pub fn estimate_fuel_cost(
    vehicle_type: &VehicleType,
    distance_km: f64,
    price_per_litre: Decimal,
) -> Result<FuelCostEstimate, DomainError> {
    if !distance_km.is_finite() || distance_km < 0.0 {
        return Err(DomainError::InvariantViolation(
            "distance_km must be a non-negative number".to_string(),
        ));
    }
    if !(vehicle_type.fuel_efficiency_km_per_l > 0.0) {
        return Err(DomainError::InvariantViolation(format!(
            "vehicle type `{}` has no usable fuel efficiency",
            vehicle_type.id.0
        )));
    }

    let litres = distance_km / vehicle_type.fuel_efficiency_km_per_l;
    let fuel_cost = (decimal_from(litres, "litres")? * price_per_litre).round_dp(2);
    Ok(FuelCostEstimate {
        vehicle_type_id: vehicle_type.id.clone(),
        fuel_type: vehicle_type.fuel_type,
        distance_km,
        litres,
        price_per_litre,
        fuel_cost,
        co2_kg: distance_km * vehicle_type.co2_g_per_km / 1000.0,
    })
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FleetFuelLine {
    pub fuel_type: FuelType,
    pub active_vehicles: u64,
    pub average_efficiency_km_per_l: Option<f64>,
    pub latest_price: Option<Decimal>,
    pub cost_per_100km: Option<Decimal>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FleetFuelSummary {
    pub lines: Vec<FleetFuelLine>,
}

impl FleetFuelSummary {
    /// One line per fuel type. Efficiency is averaged over active vehicles,
    /// so a type with many vehicles weighs more.
    pub fn build(
        vehicle_types: &[VehicleType],
        vehicles: &[VehicleMaster],
        latest_prices: &[FuelPriceRecord],
    ) -> Self {
        let types: HashMap<&VehicleTypeId, &VehicleType> =
            vehicle_types.iter().map(|vehicle_type| (&vehicle_type.id, vehicle_type)).collect();
        let prices: HashMap<FuelType, Decimal> = latest_prices
            .iter()
            .map(|record| (record.fuel_type, record.price_per_litre))
            .collect();

        let mut efficiencies: BTreeMap<FuelType, Vec<f64>> = BTreeMap::new();
        for vehicle in vehicles.iter().filter(|vehicle| vehicle.is_active) {
            if let Some(vehicle_type) = types.get(&vehicle.vehicle_type_id) {
                efficiencies
                    .entry(vehicle_type.fuel_type)
                    .or_default()
                    .push(vehicle_type.fuel_efficiency_km_per_l);
            }
        }

        let lines = FuelType::ALL
            .iter()
            .map(|fuel_type| {
                let samples = efficiencies.get(fuel_type).map(Vec::as_slice).unwrap_or_default();
                let average_efficiency_km_per_l = (!samples.is_empty())
                    .then(|| samples.iter().sum::<f64>() / samples.len() as f64);
                let latest_price = prices.get(fuel_type).copied();
                let cost_per_100km = match (average_efficiency_km_per_l, latest_price) {
                    (Some(efficiency), Some(price)) if efficiency > 0.0 => {
                        Decimal::try_from(100.0 / efficiency)
                            .ok()
                            .map(|litres| (litres * price).round_dp(2))
                    }
                    _ => None,
                };
                FleetFuelLine {
                    fuel_type: *fuel_type,
                    active_vehicles: samples.len() as u64,
                    average_efficiency_km_per_l,
                    latest_price,
                    cost_per_100km,
                }
            })
            .collect();

        Self { lines }
    }
}
