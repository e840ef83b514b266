pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_config, connect_with_settings, ping, DbPool};
pub use fixtures::{FleetSeedDataset, ScopeSeedInfo, SeedResult, VerificationResult};
