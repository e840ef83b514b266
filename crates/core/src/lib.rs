pub mod approvals;
pub mod config;
pub mod domain;
pub mod errors;
pub mod fuel;
pub mod metrics;
pub mod routing;

pub use approvals::{
    ApprovalError, ApprovalRouter, EmployeeDirectory, InMemoryEmployeeDirectory, MatchError,
    ResolutionError, ResolvedApprovers, RoutingError, WorkflowMatcher,
};
pub use domain::booking::{
    ApprovalDecision, ApprovalPlan, Booking, BookingApproval, BookingId, BookingPriority,
    BookingStatus, Location,
};
pub use domain::employee::{Employee, EmployeeId, EmployeeRole};
pub use domain::fuel::{FuelPriceRecord, FuelPriceSnapshot, FuelType};
pub use domain::vehicle::{
    VehicleGroup, VehicleGroupId, VehicleId, VehicleMaster, VehicleType, VehicleTypeId,
};
pub use domain::workflow::{ApprovalWorkflow, LevelsRequired, OrgScope, WorkflowId};
pub use errors::DomainError;
pub use metrics::{BookingSummary, FleetFuelSummary, FuelCostEstimate};
pub use routing::{
    Coordinates, DirectionsProvider, ProviderError, ProviderRoute, RouteError, RouteEstimator,
    RouteOptimizationRequest, RouteOptimizationResult, WeatherObservation, WeatherProvider,
};
