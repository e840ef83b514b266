use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use tripxl_core::domain::booking::{Booking, BookingId, BookingStatus};
use tripxl_core::domain::employee::{Employee, EmployeeId};
use tripxl_core::domain::fuel::FuelPriceRecord;
use tripxl_core::domain::vehicle::{
    VehicleGroup, VehicleGroupId, VehicleMaster, VehicleType, VehicleTypeId,
};
use tripxl_core::domain::workflow::{ApprovalWorkflow, WorkflowId};

pub mod booking;
pub mod employee;
pub mod fuel_price;
pub mod memory;
pub mod vehicle;
pub mod workflow;

pub use booking::SqlBookingRepository;
pub use employee::SqlEmployeeRepository;
pub use fuel_price::SqlFuelPriceRepository;
pub use memory::{
    InMemoryBookingRepository, InMemoryEmployeeRepository, InMemoryFuelPriceRepository,
    InMemoryVehicleRepository, InMemoryWorkflowRepository,
};
pub use vehicle::SqlVehicleRepository;
pub use workflow::SqlWorkflowRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("{0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Maps unique-constraint failures to `Conflict` with `message`.
    pub(crate) fn on_unique(error: sqlx::Error, message: impl FnOnce() -> String) -> Self {
        match &error {
            sqlx::Error::Database(db) if db.is_unique_violation() => Self::Conflict(message()),
            _ => Self::Database(error),
        }
    }
}

pub(crate) fn decode_err(error: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("invalid timestamp `{raw}`: {error}")))
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub employee_id: Option<EmployeeId>,
}

impl BookingFilter {
    pub fn matches(&self, booking: &Booking) -> bool {
        self.status.map(|status| booking.status == status).unwrap_or(true)
            && self.employee_id.as_ref().map(|id| &booking.employee_id == id).unwrap_or(true)
    }
}

#[async_trait]
pub trait EmployeeRepository: Send + Sync {
    async fn find_by_id(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError>;
    async fn list(&self) -> Result<Vec<Employee>, RepositoryError>;
    async fn save(&self, employee: Employee) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    async fn find_by_id(&self, id: &WorkflowId)
        -> Result<Option<ApprovalWorkflow>, RepositoryError>;
    async fn list(&self) -> Result<Vec<ApprovalWorkflow>, RepositoryError>;
    async fn save(&self, workflow: ApprovalWorkflow) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Loads the booking together with its recorded approvals.
    async fn find_by_id(&self, id: &BookingId) -> Result<Option<Booking>, RepositoryError>;
    /// Newest first.
    async fn list(&self, filter: &BookingFilter) -> Result<Vec<Booking>, RepositoryError>;
    /// Upserts the booking and appends approvals not yet stored.
    async fn save(&self, booking: Booking) -> Result<(), RepositoryError>;
    /// Writes the booking's new status and approvals only while the stored
    /// status is still `expected`; otherwise `Conflict`.
    async fn update_status(
        &self,
        booking: Booking,
        expected: BookingStatus,
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait VehicleRepository: Send + Sync {
    async fn list_groups(&self) -> Result<Vec<VehicleGroup>, RepositoryError>;
    async fn find_group(&self, id: &VehicleGroupId)
        -> Result<Option<VehicleGroup>, RepositoryError>;
    async fn save_group(&self, group: VehicleGroup) -> Result<(), RepositoryError>;

    async fn list_types(&self) -> Result<Vec<VehicleType>, RepositoryError>;
    async fn find_type(&self, id: &VehicleTypeId) -> Result<Option<VehicleType>, RepositoryError>;
    async fn save_type(&self, vehicle_type: VehicleType) -> Result<(), RepositoryError>;

    async fn list_vehicles(&self) -> Result<Vec<VehicleMaster>, RepositoryError>;
    async fn save_vehicle(&self, vehicle: VehicleMaster) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait FuelPriceRepository: Send + Sync {
    async fn record(&self, records: Vec<FuelPriceRecord>) -> Result<usize, RepositoryError>;
    /// Most recent price per fuel type, ordered by fuel type.
    async fn latest(&self) -> Result<Vec<FuelPriceRecord>, RepositoryError>;
}
