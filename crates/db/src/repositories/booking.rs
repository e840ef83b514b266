use std::collections::HashMap;

use sqlx::Row;

use tripxl_core::domain::booking::{
    ApprovalDecision, ApprovalPlan, Booking, BookingApproval, BookingId, BookingPriority,
    BookingStatus, Location,
};
use tripxl_core::domain::employee::EmployeeId;
use tripxl_core::domain::vehicle::VehicleTypeId;
use tripxl_core::domain::workflow::{LevelsRequired, WorkflowId};

use super::{decode_err, parse_timestamp, BookingFilter, BookingRepository, RepositoryError};
use crate::DbPool;

pub struct SqlBookingRepository {
    pool: DbPool,
}

impl SqlBookingRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const BOOKING_COLUMNS: &str = "id, employee_id, region, department, unit,
     pickup_address, pickup_lat, pickup_lng, dropoff_address, dropoff_lat, dropoff_lng,
     pickup_time, dropoff_time, purpose, priority, passenger_count, vehicle_type_id, status,
     workflow_id, levels_required, level_1_approver_id, level_2_approver_id,
     estimated_duration_secs, created_at, updated_at";

const FILTER_CLAUSE: &str =
    "(?1 IS NULL OR status = ?1) AND (?2 IS NULL OR employee_id = ?2)";

fn row_to_booking(row: &sqlx::sqlite::SqliteRow) -> Result<Booking, RepositoryError> {
    let priority: String = row.try_get("priority").map_err(decode_err)?;
    let status: String = row.try_get("status").map_err(decode_err)?;
    let levels: String = row.try_get("levels_required").map_err(decode_err)?;
    let passenger_count: i64 = row.try_get("passenger_count").map_err(decode_err)?;
    let vehicle_type_id: Option<String> = row.try_get("vehicle_type_id").map_err(decode_err)?;
    let level_2: Option<String> = row.try_get("level_2_approver_id").map_err(decode_err)?;
    let estimated: Option<i64> = row.try_get("estimated_duration_secs").map_err(decode_err)?;
    let pickup_time: String = row.try_get("pickup_time").map_err(decode_err)?;
    let dropoff_time: String = row.try_get("dropoff_time").map_err(decode_err)?;
    let created_at: String = row.try_get("created_at").map_err(decode_err)?;
    let updated_at: String = row.try_get("updated_at").map_err(decode_err)?;

    Ok(Booking {
        id: BookingId(row.try_get("id").map_err(decode_err)?),
        employee_id: EmployeeId(row.try_get("employee_id").map_err(decode_err)?),
        region: row.try_get("region").map_err(decode_err)?,
        department: row.try_get("department").map_err(decode_err)?,
        unit: row.try_get("unit").map_err(decode_err)?,
        pickup: Location {
            address: row.try_get("pickup_address").map_err(decode_err)?,
            lat: row.try_get("pickup_lat").map_err(decode_err)?,
            lng: row.try_get("pickup_lng").map_err(decode_err)?,
        },
        dropoff: Location {
            address: row.try_get("dropoff_address").map_err(decode_err)?,
            lat: row.try_get("dropoff_lat").map_err(decode_err)?,
            lng: row.try_get("dropoff_lng").map_err(decode_err)?,
        },
        pickup_time: parse_timestamp(&pickup_time)?,
        dropoff_time: parse_timestamp(&dropoff_time)?,
        purpose: row.try_get("purpose").map_err(decode_err)?,
        priority: BookingPriority::parse(&priority)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown priority `{priority}`")))?,
        passenger_count: u32::try_from(passenger_count).map_err(decode_err)?,
        vehicle_type_id: vehicle_type_id.map(VehicleTypeId),
        status: BookingStatus::parse(&status)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown booking status `{status}`")))?,
        approval_plan: ApprovalPlan {
            workflow_id: WorkflowId(row.try_get("workflow_id").map_err(decode_err)?),
            levels_required: LevelsRequired::parse(&levels).ok_or_else(|| {
                RepositoryError::Decode(format!("unknown levels_required `{levels}`"))
            })?,
            level_1_approver_id: EmployeeId(
                row.try_get("level_1_approver_id").map_err(decode_err)?,
            ),
            level_2_approver_id: level_2.map(EmployeeId),
        },
        approvals: Vec::new(),
        estimated_duration_secs: estimated.map(u64::try_from).transpose().map_err(decode_err)?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn row_to_approval(row: &sqlx::sqlite::SqliteRow) -> Result<BookingApproval, RepositoryError> {
    let level: i64 = row.try_get("level").map_err(decode_err)?;
    let decision: String = row.try_get("decision").map_err(decode_err)?;
    let decided_at: String = row.try_get("decided_at").map_err(decode_err)?;

    Ok(BookingApproval {
        booking_id: BookingId(row.try_get("booking_id").map_err(decode_err)?),
        level: u8::try_from(level).map_err(decode_err)?,
        approver_id: EmployeeId(row.try_get("approver_id").map_err(decode_err)?),
        decision: ApprovalDecision::parse(&decision)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown decision `{decision}`")))?,
        comments: row.try_get("comments").map_err(decode_err)?,
        decided_at: parse_timestamp(&decided_at)?,
    })
}

#[async_trait::async_trait]
impl BookingRepository for SqlBookingRepository {
    async fn find_by_id(&self, id: &BookingId) -> Result<Option<Booking>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let mut booking = row_to_booking(&row)?;
        let approvals = sqlx::query(
            "SELECT booking_id, level, approver_id, decision, comments, decided_at
             FROM booking_approvals WHERE booking_id = ? ORDER BY level",
        )
        .bind(&id.0)
        .fetch_all(&self.pool)
        .await?;
        booking.approvals = approvals.iter().map(row_to_approval).collect::<Result<_, _>>()?;

        Ok(Some(booking))
    }

    async fn list(&self, filter: &BookingFilter) -> Result<Vec<Booking>, RepositoryError> {
        let status = filter.status.map(|status| status.as_str());
        let employee_id = filter.employee_id.as_ref().map(|id| id.0.as_str());

        let rows = sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE {FILTER_CLAUSE}
             ORDER BY created_at DESC, id"
        ))
        .bind(status)
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?;
        let mut bookings = rows.iter().map(row_to_booking).collect::<Result<Vec<_>, _>>()?;

        let approval_rows = sqlx::query(&format!(
            "SELECT booking_id, level, approver_id, decision, comments, decided_at
             FROM booking_approvals
             WHERE booking_id IN (SELECT id FROM bookings WHERE {FILTER_CLAUSE})
             ORDER BY booking_id, level"
        ))
        .bind(status)
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?;

        let mut approvals: HashMap<String, Vec<BookingApproval>> = HashMap::new();
        for row in &approval_rows {
            let approval = row_to_approval(row)?;
            approvals.entry(approval.booking_id.0.clone()).or_default().push(approval);
        }
        for booking in &mut bookings {
            booking.approvals = approvals.remove(&booking.id.0).unwrap_or_default();
        }

        Ok(bookings)
    }

    async fn save(&self, booking: Booking) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO bookings (id, employee_id, region, department, unit,
                                   pickup_address, pickup_lat, pickup_lng,
                                   dropoff_address, dropoff_lat, dropoff_lng,
                                   pickup_time, dropoff_time, purpose, priority, passenger_count,
                                   vehicle_type_id, status, workflow_id, levels_required,
                                   level_1_approver_id, level_2_approver_id,
                                   estimated_duration_secs, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 pickup_address = excluded.pickup_address,
                 pickup_lat = excluded.pickup_lat,
                 pickup_lng = excluded.pickup_lng,
                 dropoff_address = excluded.dropoff_address,
                 dropoff_lat = excluded.dropoff_lat,
                 dropoff_lng = excluded.dropoff_lng,
                 pickup_time = excluded.pickup_time,
                 dropoff_time = excluded.dropoff_time,
                 purpose = excluded.purpose,
                 priority = excluded.priority,
                 passenger_count = excluded.passenger_count,
                 vehicle_type_id = excluded.vehicle_type_id,
                 status = excluded.status,
                 estimated_duration_secs = excluded.estimated_duration_secs,
                 updated_at = excluded.updated_at",
        )
        .bind(&booking.id.0)
        .bind(&booking.employee_id.0)
        .bind(&booking.region)
        .bind(&booking.department)
        .bind(&booking.unit)
        .bind(&booking.pickup.address)
        .bind(booking.pickup.lat)
        .bind(booking.pickup.lng)
        .bind(&booking.dropoff.address)
        .bind(booking.dropoff.lat)
        .bind(booking.dropoff.lng)
        .bind(booking.pickup_time.to_rfc3339())
        .bind(booking.dropoff_time.to_rfc3339())
        .bind(&booking.purpose)
        .bind(booking.priority.as_str())
        .bind(i64::from(booking.passenger_count))
        .bind(booking.vehicle_type_id.as_ref().map(|id| id.0.as_str()))
        .bind(booking.status.as_str())
        .bind(&booking.approval_plan.workflow_id.0)
        .bind(booking.approval_plan.levels_required.as_str())
        .bind(&booking.approval_plan.level_1_approver_id.0)
        .bind(booking.approval_plan.level_2_approver_id.as_ref().map(|id| id.0.as_str()))
        .bind(booking.estimated_duration_secs.and_then(|secs| i64::try_from(secs).ok()))
        .bind(booking.created_at.to_rfc3339())
        .bind(booking.updated_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        for approval in &booking.approvals {
            sqlx::query(
                "INSERT INTO booking_approvals (booking_id, level, approver_id, decision,
                                                comments, decided_at)
                 VALUES (?, ?, ?, ?, ?, ?)
                 ON CONFLICT(booking_id, level) DO NOTHING",
            )
            .bind(&approval.booking_id.0)
            .bind(i64::from(approval.level))
            .bind(&approval.approver_id.0)
            .bind(approval.decision.as_str())
            .bind(&approval.comments)
            .bind(approval.decided_at.to_rfc3339())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn update_status(
        &self,
        booking: Booking,
        expected: BookingStatus,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE bookings SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(booking.status.as_str())
        .bind(booking.updated_at.to_rfc3339())
        .bind(&booking.id.0)
        .bind(expected.as_str())
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(stale_status(&booking.id, expected));
        }

        let (stored_levels,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM booking_approvals WHERE booking_id = ?")
                .bind(&booking.id.0)
                .fetch_one(&mut *tx)
                .await?;
        for approval in booking.approvals.iter().skip(usize::try_from(stored_levels).unwrap_or(0)) {
            let inserted = sqlx::query(
                "INSERT INTO booking_approvals (booking_id, level, approver_id, decision,
                                                comments, decided_at)
                 VALUES (?, ?, ?, ?, ?, ?)
                 ON CONFLICT(booking_id, level) DO NOTHING",
            )
            .bind(&approval.booking_id.0)
            .bind(i64::from(approval.level))
            .bind(&approval.approver_id.0)
            .bind(approval.decision.as_str())
            .bind(&approval.comments)
            .bind(approval.decided_at.to_rfc3339())
            .execute(&mut *tx)
            .await?;
            if inserted.rows_affected() == 0 {
                return Err(stale_status(&booking.id, expected));
            }
        }

        tx.commit().await?;
        Ok(())
    }
}

fn stale_status(id: &BookingId, expected: BookingStatus) -> RepositoryError {
    RepositoryError::Conflict(format!(
        "booking `{id}` is no longer `{}`; reload and retry",
        expected.as_str()
    ))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use tripxl_core::approvals::ApprovalRouter;
    use tripxl_core::domain::booking::{
        ApprovalDecision, ApprovalPlan, Booking, BookingId, BookingPriority, BookingStatus,
        Location,
    };
    use tripxl_core::domain::employee::{Employee, EmployeeId, EmployeeRole};
    use tripxl_core::domain::workflow::{ApprovalWorkflow, LevelsRequired, WorkflowId};

    use super::SqlBookingRepository;
    use crate::repositories::{
        BookingFilter, BookingRepository, EmployeeRepository, RepositoryError,
        SqlEmployeeRepository, SqlWorkflowRepository, WorkflowRepository,
    };
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        let employees = SqlEmployeeRepository::new(pool.clone());
        for (id, code, role) in [
            ("E-1", "1001", EmployeeRole::Employee),
            ("E-2", "1002", EmployeeRole::Employee),
            ("E-MGR", "2001", EmployeeRole::Approver),
            ("E-DIR", "2002", EmployeeRole::Approver),
        ] {
            employees
                .save(Employee {
                    id: EmployeeId(id.to_string()),
                    employee_code: code.to_string(),
                    name: id.to_string(),
                    email: format!("{code}@example.com"),
                    region: "Abu Dhabi".to_string(),
                    department: "Operations".to_string(),
                    unit: "Logistics".to_string(),
                    designation: String::new(),
                    role,
                    is_active: true,
                })
                .await
                .expect("insert employee");
        }

        let now = Utc::now();
        SqlWorkflowRepository::new(pool.clone())
            .save(ApprovalWorkflow {
                id: WorkflowId("WF-1".to_string()),
                workflow_name: "Logistics".to_string(),
                region: "Abu Dhabi".to_string(),
                department: "Operations".to_string(),
                unit: "Logistics".to_string(),
                levels_required: LevelsRequired::BothLevels,
                level_1_approver_id: Some(EmployeeId("E-MGR".to_string())),
                level_2_approver_id: Some(EmployeeId("E-DIR".to_string())),
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .await
            .expect("insert workflow");
        pool
    }

    fn booking(id: &str, employee_id: &str, created_offset_mins: i64) -> Booking {
        let created_at = Utc::now() + Duration::minutes(created_offset_mins);
        let pickup_time = created_at + Duration::days(1);
        Booking {
            id: BookingId(id.to_string()),
            employee_id: EmployeeId(employee_id.to_string()),
            region: "Abu Dhabi".to_string(),
            department: "Operations".to_string(),
            unit: "Logistics".to_string(),
            pickup: Location { address: "HQ".to_string(), lat: 24.4539, lng: 54.3773 },
            dropoff: Location { address: "Airport".to_string(), lat: 24.4330, lng: 54.6511 },
            pickup_time,
            dropoff_time: pickup_time + Duration::hours(3),
            purpose: "Site inspection".to_string(),
            priority: BookingPriority::High,
            passenger_count: 3,
            vehicle_type_id: None,
            status: BookingStatus::Pending,
            approval_plan: ApprovalPlan {
                workflow_id: WorkflowId("WF-1".to_string()),
                levels_required: LevelsRequired::BothLevels,
                level_1_approver_id: EmployeeId("E-MGR".to_string()),
                level_2_approver_id: Some(EmployeeId("E-DIR".to_string())),
            },
            approvals: Vec::new(),
            estimated_duration_secs: Some(2_400),
            created_at,
            updated_at: created_at,
        }
    }

    #[tokio::test]
    async fn save_and_find_by_id_with_approvals() {
        let repo = SqlBookingRepository::new(setup().await);
        let mut saved = booking("BK-1", "E-1", 0);
        repo.save(saved.clone()).await.expect("save");

        ApprovalRouter
            .decide(
                &mut saved,
                &EmployeeId("E-MGR".to_string()),
                ApprovalDecision::Approved,
                Some("ok".to_string()),
                Utc::now(),
            )
            .expect("level 1 approval");
        repo.save(saved.clone()).await.expect("save approval");

        let found = repo.find_by_id(&saved.id).await.expect("find").expect("should exist");
        assert_eq!(found.status, BookingStatus::Level1Approved);
        assert_eq!(found.approvals.len(), 1);
        assert_eq!(found.approvals[0].comments.as_deref(), Some("ok"));
        assert_eq!(found.estimated_duration_secs, Some(2_400));
        assert_eq!(found.priority, BookingPriority::High);
    }

    #[tokio::test]
    async fn resaving_does_not_duplicate_approvals() {
        let repo = SqlBookingRepository::new(setup().await);
        let mut saved = booking("BK-1", "E-1", 0);
        ApprovalRouter
            .decide(
                &mut saved,
                &EmployeeId("E-MGR".to_string()),
                ApprovalDecision::Approved,
                None,
                Utc::now(),
            )
            .expect("approve");

        repo.save(saved.clone()).await.expect("save");
        repo.save(saved.clone()).await.expect("save again");

        let found = repo.find_by_id(&saved.id).await.expect("find").expect("exists");
        assert_eq!(found.approvals.len(), 1);
    }

    #[tokio::test]
    async fn stale_copy_cannot_overwrite_a_recorded_decision() {
        let repo = SqlBookingRepository::new(setup().await);
        let stored = booking("BK-1", "E-1", 0);
        repo.save(stored.clone()).await.expect("save");

        let mut approved = repo.find_by_id(&stored.id).await.expect("find").expect("exists");
        let mut rejected = approved.clone();
        let approver = EmployeeId("E-MGR".to_string());
        ApprovalRouter
            .decide(&mut approved, &approver, ApprovalDecision::Approved, None, Utc::now())
            .expect("approve");
        ApprovalRouter
            .decide(&mut rejected, &approver, ApprovalDecision::Rejected, None, Utc::now())
            .expect("reject");

        repo.update_status(approved, BookingStatus::Pending).await.expect("first decision wins");
        let error = repo
            .update_status(rejected, BookingStatus::Pending)
            .await
            .expect_err("second decision is stale");
        assert!(matches!(error, RepositoryError::Conflict(_)));

        let found = repo.find_by_id(&stored.id).await.expect("find").expect("exists");
        assert_eq!(found.status, BookingStatus::Level1Approved);
        assert_eq!(found.approvals.len(), 1);
        assert_eq!(found.approvals[0].decision, ApprovalDecision::Approved);
    }

    #[tokio::test]
    async fn list_filters_by_status_and_employee() {
        let repo = SqlBookingRepository::new(setup().await);
        repo.save(booking("BK-1", "E-1", 0)).await.expect("save 1");
        repo.save(booking("BK-2", "E-2", 5)).await.expect("save 2");
        let mut cancelled = booking("BK-3", "E-1", 10);
        cancelled.status = BookingStatus::Cancelled;
        repo.save(cancelled).await.expect("save 3");

        let all = repo.list(&BookingFilter::default()).await.expect("list all");
        assert_eq!(
            all.iter().map(|booking| booking.id.0.as_str()).collect::<Vec<_>>(),
            vec!["BK-3", "BK-2", "BK-1"]
        );

        let pending_e1 = repo
            .list(&BookingFilter {
                status: Some(BookingStatus::Pending),
                employee_id: Some(EmployeeId("E-1".to_string())),
            })
            .await
            .expect("list filtered");
        assert_eq!(pending_e1.len(), 1);
        assert_eq!(pending_e1[0].id.0, "BK-1");
    }

    #[tokio::test]
    async fn unknown_employee_is_rejected_by_foreign_key() {
        let repo = SqlBookingRepository::new(setup().await);
        assert!(repo.save(booking("BK-9", "E-GHOST", 0)).await.is_err());
    }
}
