use crate::connection::DbPool;
use crate::repositories::RepositoryError;
use sqlx::Executor;

/// One organisational scope in the demo data and the workflow that covers it.
const SEED_SCOPES: &[SeedScopeContract] = &[
    SeedScopeContract {
        workflow_id: "wf-ad-ops-logistics",
        region: "Abu Dhabi",
        department: "Operations",
        unit: "Logistics",
        levels_required: "BOTH_LEVELS",
        requester_id: "emp-ad-ops-001",
        approver_ids: &["emp-ad-ops-mgr", "emp-ad-ops-dir"],
        description: "Two-level approval chain for Abu Dhabi logistics trips",
    },
    SeedScopeContract {
        workflow_id: "wf-dxb-fin-treasury",
        region: "Dubai",
        department: "Finance",
        unit: "Treasury",
        levels_required: "LEVEL_1_ONLY",
        requester_id: "emp-dxb-fin-001",
        approver_ids: &["emp-dxb-fin-mgr"],
        description: "Single manager approval for Dubai treasury trips",
    },
];

const SEED_EMPLOYEE_IDS: &[&str] = &[
    "emp-ad-ops-001",
    "emp-ad-ops-mgr",
    "emp-ad-ops-dir",
    "emp-dxb-fin-001",
    "emp-dxb-fin-mgr",
    "emp-fleet-admin",
];

const SEED_GROUP_IDS: &[&str] = &["vg-ad-pool", "vg-dxb-exec"];

const SEED_VEHICLE_TYPE_IDS: &[&str] = &["vt-sedan", "vt-suv", "vt-van"];

const SEED_VEHICLE_IDS: &[&str] = &["veh-ad-001", "veh-ad-002", "veh-dxb-001", "veh-dxb-002"];

const SEED_FUEL_PRICE_IDS: &[i64] = &[1, 2, 3, 4];

/// Demo fleet dataset used by `tripxl seed` and the integration tests.
///
/// Covers both approval depths:
/// 1. Abu Dhabi / Operations / Logistics routed through two levels
/// 2. Dubai / Finance / Treasury routed through level 1 only
pub struct FleetSeedDataset;

impl FleetSeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/tripxl_seed_data.sql");

    /// Loads the dataset. Existing rows with the same ids are left untouched.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        let scopes_seeded = SEED_SCOPES
            .iter()
            .map(|scope| ScopeSeedInfo {
                workflow_id: scope.workflow_id,
                levels_required: scope.levels_required,
                description: scope.description,
            })
            .collect::<Vec<_>>();

        Ok(SeedResult { scopes_seeded, vehicles_seeded: SEED_VEHICLE_IDS.len() })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        checks.push((
            "employees",
            count_ids(pool, "employees", SEED_EMPLOYEE_IDS).await? == SEED_EMPLOYEE_IDS.len(),
        ));
        checks.push((
            "vehicle-groups",
            count_ids(pool, "vehicle_groups", SEED_GROUP_IDS).await? == SEED_GROUP_IDS.len(),
        ));
        checks.push((
            "vehicle-types",
            count_ids(pool, "vehicle_types", SEED_VEHICLE_TYPE_IDS).await?
                == SEED_VEHICLE_TYPE_IDS.len(),
        ));
        checks.push((
            "vehicles",
            count_ids(pool, "vehicle_master", SEED_VEHICLE_IDS).await? == SEED_VEHICLE_IDS.len(),
        ));

        let fuel_types: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(DISTINCT fuel_type) FROM fuel_prices WHERE id IN {}",
            sql_array_from_numbers(SEED_FUEL_PRICE_IDS)
        ))
        .fetch_one(pool)
        .await?;
        checks.push(("fuel-prices", fuel_types == 4));

        for scope in SEED_SCOPES {
            let workflow_ok: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM approval_workflows
                               WHERE id = ?1 AND region = ?2 AND department = ?3 AND unit = ?4
                                 AND levels_required = ?5 AND is_active = 1)",
            )
            .bind(scope.workflow_id)
            .bind(scope.region)
            .bind(scope.department)
            .bind(scope.unit)
            .bind(scope.levels_required)
            .fetch_one(pool)
            .await?;
            checks.push((scope.workflow_id, workflow_ok == 1));

            checks.push((scope.approvers_label(), Self::verify_approvers(pool, scope).await?));

            let requester_ok: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM employees
                               WHERE id = ?1 AND region = ?2 AND department = ?3 AND unit = ?4)",
            )
            .bind(scope.requester_id)
            .bind(scope.region)
            .bind(scope.department)
            .bind(scope.unit)
            .fetch_one(pool)
            .await?;
            checks.push((scope.requester_label(), requester_ok == 1));
        }

        let all_present = checks.iter().all(|(_, exists)| *exists);
        Ok(VerificationResult { all_present, checks })
    }

    async fn verify_approvers(
        pool: &DbPool,
        scope: &SeedScopeContract,
    ) -> Result<bool, RepositoryError> {
        let (level_1, level_2) = sqlx::query_as::<_, (Option<String>, Option<String>)>(
            "SELECT level_1_approver_id, level_2_approver_id FROM approval_workflows WHERE id = ?",
        )
        .bind(scope.workflow_id)
        .fetch_one(pool)
        .await?;

        let configured = [level_1, level_2].into_iter().flatten().collect::<Vec<_>>();
        if configured.len() != scope.approver_ids.len()
            || !configured.iter().zip(scope.approver_ids).all(|(actual, expected)| actual == expected)
        {
            return Ok(false);
        }

        let active_approvers: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM employees WHERE role = 'approver' AND is_active = 1 AND id IN {}",
            sql_array_from_ids(scope.approver_ids)
        ))
        .fetch_one(pool)
        .await?;
        Ok(active_approvers as usize == scope.approver_ids.len())
    }

    /// Removes the seeded rows. Bookings referencing them are removed first.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        let employees = sql_array_from_ids(SEED_EMPLOYEE_IDS);
        let workflows = sql_array_from_ids(
            &SEED_SCOPES.iter().map(|scope| scope.workflow_id).collect::<Vec<_>>(),
        );

        sqlx::query(&format!(
            "DELETE FROM bookings WHERE employee_id IN {employees} OR workflow_id IN {workflows}"
        ))
        .execute(&mut *tx)
        .await?;
        sqlx::query(&format!(
            "DELETE FROM fuel_prices WHERE id IN {}",
            sql_array_from_numbers(SEED_FUEL_PRICE_IDS)
        ))
        .execute(&mut *tx)
        .await?;
        sqlx::query(&format!(
            "DELETE FROM vehicle_master WHERE id IN {}",
            sql_array_from_ids(SEED_VEHICLE_IDS)
        ))
        .execute(&mut *tx)
        .await?;
        sqlx::query(&format!(
            "DELETE FROM vehicle_types WHERE id IN {}",
            sql_array_from_ids(SEED_VEHICLE_TYPE_IDS)
        ))
        .execute(&mut *tx)
        .await?;
        sqlx::query(&format!(
            "DELETE FROM vehicle_groups WHERE id IN {}",
            sql_array_from_ids(SEED_GROUP_IDS)
        ))
        .execute(&mut *tx)
        .await?;
        sqlx::query(&format!("DELETE FROM approval_workflows WHERE id IN {workflows}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM employees WHERE id IN {employees}"))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedScopeContract {
    workflow_id: &'static str,
    region: &'static str,
    department: &'static str,
    unit: &'static str,
    levels_required: &'static str,
    requester_id: &'static str,
    approver_ids: &'static [&'static str],
    description: &'static str,
}

impl SeedScopeContract {
    fn approvers_label(&self) -> &'static str {
        match self.levels_required {
            "BOTH_LEVELS" => "two-level-approvers",
            _ => "single-level-approvers",
        }
    }

    fn requester_label(&self) -> &'static str {
        match self.levels_required {
            "BOTH_LEVELS" => "two-level-requester",
            _ => "single-level-requester",
        }
    }
}

async fn count_ids(pool: &DbPool, table: &str, ids: &[&str]) -> Result<usize, RepositoryError> {
    let count: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(1) FROM {table} WHERE id IN {}",
        sql_array_from_ids(ids)
    ))
    .fetch_one(pool)
    .await?;
    Ok(count as usize)
}

fn sql_array_from_ids(ids: &[&str]) -> String {
    let quoted = ids.iter().map(|id| format!("'{}'", id)).collect::<Vec<_>>().join(",");
    format!("({quoted})")
}

fn sql_array_from_numbers(ids: &[i64]) -> String {
    let joined = ids.iter().map(i64::to_string).collect::<Vec<_>>().join(",");
    format!("({joined})")
}

#[derive(Debug)]
pub struct SeedResult {
    pub scopes_seeded: Vec<ScopeSeedInfo>,
    pub vehicles_seeded: usize,
}

#[derive(Debug)]
pub struct ScopeSeedInfo {
    pub workflow_id: &'static str,
    pub levels_required: &'static str,
    pub description: &'static str,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
