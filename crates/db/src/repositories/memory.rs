use std::collections::{BTreeMap, HashMap};

use tokio::sync::RwLock;

use tripxl_core::domain::booking::{Booking, BookingId, BookingStatus};
use tripxl_core::domain::employee::{Employee, EmployeeId};
use tripxl_core::domain::fuel::{FuelPriceRecord, FuelType};
use tripxl_core::domain::vehicle::{
    VehicleGroup, VehicleGroupId, VehicleMaster, VehicleType, VehicleTypeId,
};
use tripxl_core::domain::workflow::{ApprovalWorkflow, WorkflowId};

use super::{
    BookingFilter, BookingRepository, EmployeeRepository, FuelPriceRepository, RepositoryError,
    VehicleRepository, WorkflowRepository,
};

#[derive(Default)]
pub struct InMemoryEmployeeRepository {
    employees: RwLock<HashMap<String, Employee>>,
}

#[async_trait::async_trait]
impl EmployeeRepository for InMemoryEmployeeRepository {
    async fn find_by_id(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        let employees = self.employees.read().await;
        Ok(employees.get(&id.0).cloned())
    }

    async fn list(&self) -> Result<Vec<Employee>, RepositoryError> {
        let employees = self.employees.read().await;
        let mut all: Vec<_> = employees.values().cloned().collect();
        all.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(all)
    }

    async fn save(&self, employee: Employee) -> Result<(), RepositoryError> {
        let mut employees = self.employees.write().await;
        if employees
            .values()
            .any(|other| other.employee_code == employee.employee_code && other.id != employee.id)
        {
            return Err(RepositoryError::Conflict(format!(
                "employee code `{}` is already in use",
                employee.employee_code
            )));
        }
        employees.insert(employee.id.0.clone(), employee);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryWorkflowRepository {
    workflows: RwLock<HashMap<String, ApprovalWorkflow>>,
}

#[async_trait::async_trait]
impl WorkflowRepository for InMemoryWorkflowRepository {
    async fn find_by_id(
        &self,
        id: &WorkflowId,
    ) -> Result<Option<ApprovalWorkflow>, RepositoryError> {
        let workflows = self.workflows.read().await;
        Ok(workflows.get(&id.0).cloned())
    }

    async fn list(&self) -> Result<Vec<ApprovalWorkflow>, RepositoryError> {
        let workflows = self.workflows.read().await;
        let mut all: Vec<_> = workflows.values().cloned().collect();
        all.sort_by(|left, right| {
            (&left.region, &left.department, &left.unit, &left.id.0).cmp(&(
                &right.region,
                &right.department,
                &right.unit,
                &right.id.0,
            ))
        });
        Ok(all)
    }

    async fn save(&self, workflow: ApprovalWorkflow) -> Result<(), RepositoryError> {
        let mut workflows = self.workflows.write().await;
        workflows.insert(workflow.id.0.clone(), workflow);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryBookingRepository {
    bookings: RwLock<HashMap<String, Booking>>,
}

#[async_trait::async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn find_by_id(&self, id: &BookingId) -> Result<Option<Booking>, RepositoryError> {
        let bookings = self.bookings.read().await;
        Ok(bookings.get(&id.0).cloned())
    }

    async fn list(&self, filter: &BookingFilter) -> Result<Vec<Booking>, RepositoryError> {
        let bookings = self.bookings.read().await;
        let mut matching: Vec<_> =
            bookings.values().filter(|booking| filter.matches(booking)).cloned().collect();
        matching.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(matching)
    }

    async fn save(&self, mut booking: Booking) -> Result<(), RepositoryError> {
        let mut bookings = self.bookings.write().await;
        if let Some(existing) = bookings.get(&booking.id.0) {
            // Stored approvals are immutable; only unseen levels are appended.
            let mut approvals = existing.approvals.clone();
            for approval in booking.approvals.drain(..) {
                if approvals.iter().all(|stored| stored.level != approval.level) {
                    approvals.push(approval);
                }
            }
            approvals.sort_by_key(|approval| approval.level);
            booking.approvals = approvals;
        }
        bookings.insert(booking.id.0.clone(), booking);
        Ok(())
    }

    async fn update_status(
        &self,
        booking: Booking,
        expected: BookingStatus,
    ) -> Result<(), RepositoryError> {
        let mut bookings = self.bookings.write().await;
        let Some(stored) = bookings.get_mut(&booking.id.0) else {
            return Err(RepositoryError::Conflict(format!(
                "booking `{}` does not exist",
                booking.id
            )));
        };
        if stored.status != expected {
            return Err(RepositoryError::Conflict(format!(
                "booking `{}` is no longer `{}`; reload and retry",
                booking.id,
                expected.as_str()
            )));
        }

        for approval in booking.approvals {
            if stored.approvals.iter().all(|recorded| recorded.level != approval.level) {
                stored.approvals.push(approval);
            }
        }
        stored.approvals.sort_by_key(|approval| approval.level);
        stored.status = booking.status;
        stored.updated_at = booking.updated_at;
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryVehicleRepository {
    groups: RwLock<HashMap<String, VehicleGroup>>,
    types: RwLock<HashMap<String, VehicleType>>,
    vehicles: RwLock<HashMap<String, VehicleMaster>>,
}

#[async_trait::async_trait]
impl VehicleRepository for InMemoryVehicleRepository {
    async fn list_groups(&self) -> Result<Vec<VehicleGroup>, RepositoryError> {
        let groups = self.groups.read().await;
        let mut all: Vec<_> = groups.values().cloned().collect();
        all.sort_by(|left, right| left.group_code.cmp(&right.group_code));
        Ok(all)
    }

    async fn find_group(
        &self,
        id: &VehicleGroupId,
    ) -> Result<Option<VehicleGroup>, RepositoryError> {
        let groups = self.groups.read().await;
        Ok(groups.get(&id.0).cloned())
    }

    async fn save_group(&self, group: VehicleGroup) -> Result<(), RepositoryError> {
        let mut groups = self.groups.write().await;
        if groups.values().any(|other| other.group_code == group.group_code && other.id != group.id)
        {
            return Err(RepositoryError::Conflict(format!(
                "vehicle group code `{}` already exists",
                group.group_code
            )));
        }
        groups.insert(group.id.0.clone(), group);
        Ok(())
    }

    async fn list_types(&self) -> Result<Vec<VehicleType>, RepositoryError> {
        let types = self.types.read().await;
        let mut all: Vec<_> = types.values().cloned().collect();
        all.sort_by(|left, right| left.type_code.cmp(&right.type_code));
        Ok(all)
    }

    async fn find_type(&self, id: &VehicleTypeId) -> Result<Option<VehicleType>, RepositoryError> {
        let types = self.types.read().await;
        Ok(types.get(&id.0).cloned())
    }

    async fn save_type(&self, vehicle_type: VehicleType) -> Result<(), RepositoryError> {
        let mut types = self.types.write().await;
        if types
            .values()
            .any(|other| other.type_code == vehicle_type.type_code && other.id != vehicle_type.id)
        {
            return Err(RepositoryError::Conflict(format!(
                "vehicle type code `{}` already exists",
                vehicle_type.type_code
            )));
        }
        types.insert(vehicle_type.id.0.clone(), vehicle_type);
        Ok(())
    }

    async fn list_vehicles(&self) -> Result<Vec<VehicleMaster>, RepositoryError> {
        let vehicles = self.vehicles.read().await;
        let mut all: Vec<_> = vehicles.values().cloned().collect();
        all.sort_by(|left, right| left.vehicle_number.cmp(&right.vehicle_number));
        Ok(all)
    }

    async fn save_vehicle(&self, vehicle: VehicleMaster) -> Result<(), RepositoryError> {
        let mut vehicles = self.vehicles.write().await;
        if vehicles
            .values()
            .any(|other| other.vehicle_number == vehicle.vehicle_number && other.id != vehicle.id)
        {
            return Err(RepositoryError::Conflict(format!(
                "vehicle number `{}` is already registered",
                vehicle.vehicle_number
            )));
        }
        vehicles.insert(vehicle.id.0.clone(), vehicle);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryFuelPriceRepository {
    history: RwLock<Vec<FuelPriceRecord>>,
}

#[async_trait::async_trait]
impl FuelPriceRepository for InMemoryFuelPriceRepository {
    async fn record(&self, records: Vec<FuelPriceRecord>) -> Result<usize, RepositoryError> {
        let mut history = self.history.write().await;
        let count = records.len();
        history.extend(records);
        Ok(count)
    }

    async fn latest(&self) -> Result<Vec<FuelPriceRecord>, RepositoryError> {
        let history = self.history.read().await;
        let mut latest: BTreeMap<FuelType, &FuelPriceRecord> = BTreeMap::new();
        for record in history.iter() {
            match latest.get(&record.fuel_type) {
                Some(current) if current.effective_at > record.effective_at => {}
                _ => {
                    latest.insert(record.fuel_type, record);
                }
            }
        }
        Ok(latest.into_values().cloned().collect())
    }
}
