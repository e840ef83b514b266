use sqlx::Row;

use tripxl_core::domain::employee::EmployeeId;
use tripxl_core::domain::workflow::{ApprovalWorkflow, LevelsRequired, WorkflowId};

use super::{decode_err, parse_timestamp, RepositoryError, WorkflowRepository};
use crate::DbPool;

pub struct SqlWorkflowRepository {
    pool: DbPool,
}

impl SqlWorkflowRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const WORKFLOW_COLUMNS: &str = "id, workflow_name, region, department, unit, levels_required,
     level_1_approver_id, level_2_approver_id, is_active, created_at, updated_at";

fn row_to_workflow(row: &sqlx::sqlite::SqliteRow) -> Result<ApprovalWorkflow, RepositoryError> {
    let levels: String = row.try_get("levels_required").map_err(decode_err)?;
    let levels_required = LevelsRequired::parse(&levels)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown levels_required `{levels}`")))?;
    let level_1: Option<String> = row.try_get("level_1_approver_id").map_err(decode_err)?;
    let level_2: Option<String> = row.try_get("level_2_approver_id").map_err(decode_err)?;
    let created_at: String = row.try_get("created_at").map_err(decode_err)?;
    let updated_at: String = row.try_get("updated_at").map_err(decode_err)?;

    Ok(ApprovalWorkflow {
        id: WorkflowId(row.try_get("id").map_err(decode_err)?),
        workflow_name: row.try_get("workflow_name").map_err(decode_err)?,
        region: row.try_get("region").map_err(decode_err)?,
        department: row.try_get("department").map_err(decode_err)?,
        unit: row.try_get("unit").map_err(decode_err)?,
        levels_required,
        level_1_approver_id: level_1.map(EmployeeId),
        level_2_approver_id: level_2.map(EmployeeId),
        is_active: row.try_get("is_active").map_err(decode_err)?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

#[async_trait::async_trait]
impl WorkflowRepository for SqlWorkflowRepository {
    async fn find_by_id(
        &self,
        id: &WorkflowId,
    ) -> Result<Option<ApprovalWorkflow>, RepositoryError> {
        let row =
            sqlx::query(&format!("SELECT {WORKFLOW_COLUMNS} FROM approval_workflows WHERE id = ?"))
                .bind(&id.0)
                .fetch_optional(&self.pool)
                .await?;

        row.as_ref().map(row_to_workflow).transpose()
    }

    async fn list(&self) -> Result<Vec<ApprovalWorkflow>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {WORKFLOW_COLUMNS} FROM approval_workflows ORDER BY region, department, unit, id"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_workflow).collect()
    }

    async fn save(&self, workflow: ApprovalWorkflow) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO approval_workflows (id, workflow_name, region, department, unit,
                                             levels_required, level_1_approver_id,
                                             level_2_approver_id, is_active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 workflow_name = excluded.workflow_name,
                 region = excluded.region,
                 department = excluded.department,
                 unit = excluded.unit,
                 levels_required = excluded.levels_required,
                 level_1_approver_id = excluded.level_1_approver_id,
                 level_2_approver_id = excluded.level_2_approver_id,
                 is_active = excluded.is_active,
                 updated_at = excluded.updated_at",
        )
        .bind(&workflow.id.0)
        .bind(&workflow.workflow_name)
        .bind(&workflow.region)
        .bind(&workflow.department)
        .bind(&workflow.unit)
        .bind(workflow.levels_required.as_str())
        .bind(workflow.level_1_approver_id.as_ref().map(|id| id.0.as_str()))
        .bind(workflow.level_2_approver_id.as_ref().map(|id| id.0.as_str()))
        .bind(workflow.is_active)
        .bind(workflow.created_at.to_rfc3339())
        .bind(workflow.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
