use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FuelType {
    Petrol,
    Super,
    Eplus,
    Diesel,
}

impl FuelType {
    pub const ALL: [FuelType; 4] = [Self::Petrol, Self::Super, Self::Eplus, Self::Diesel];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Petrol => "PETROL",
            Self::Super => "SUPER",
            Self::Eplus => "EPLUS",
            Self::Diesel => "DIESEL",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PETROL" => Some(Self::Petrol),
            "SUPER" => Some(Self::Super),
            "EPLUS" => Some(Self::Eplus),
            "DIESEL" => Some(Self::Diesel),
            _ => None,
        }
    }
}

impl std::fmt::Display for FuelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Monthly price announcement, AED per litre.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuelPriceSnapshot {
    pub prices: BTreeMap<FuelType, Decimal>,
    pub date: DateTime<Utc>,
    pub source: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuelPriceRecord {
    pub fuel_type: FuelType,
    pub price_per_litre: Decimal,
    pub effective_at: DateTime<Utc>,
    pub source: String,
}

impl FuelPriceSnapshot {
    pub fn into_records(self) -> Vec<FuelPriceRecord> {
        let Self { prices, date, source } = self;
        prices
            .into_iter()
            .map(|(fuel_type, price_per_litre)| FuelPriceRecord {
                fuel_type,
                price_per_litre,
                effective_at: date,
                source: source.clone(),
            })
            .collect()
    }
}
