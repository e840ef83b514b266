use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use tripxl_core::approvals::{ApprovalRouter, EmployeeDirectory, WorkflowMatcher};
use tripxl_core::domain::booking::ApprovalPlan;
use tripxl_core::domain::employee::{Employee, EmployeeId};
use tripxl_core::domain::workflow::{ApprovalWorkflow, LevelsRequired, WorkflowId};

use super::{new_id, ApiError, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/approval-workflows", get(list_workflows).post(create_workflow))
        .route("/api/approval-workflows/resolve", post(resolve_workflow))
        .route("/api/approval-workflows/{id}", get(get_workflow).put(update_workflow))
}

#[derive(Debug, Deserialize)]
pub struct WorkflowRequest {
    pub workflow_name: String,
    pub region: String,
    pub department: String,
    pub unit: String,
    pub levels_required: LevelsRequired,
    pub level_1_approver_id: Option<String>,
    pub level_2_approver_id: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub region: String,
    pub department: String,
    pub unit: String,
}

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub workflow_id: WorkflowId,
    pub workflow_name: String,
    pub plan: ApprovalPlan,
    pub level_1_approver: Employee,
    pub level_2_approver: Option<Employee>,
}

pub async fn list_workflows(
    State(state): State<AppState>,
) -> Result<Json<Vec<ApprovalWorkflow>>, ApiError> {
    Ok(Json(state.workflows.list().await?))
}

pub async fn get_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApprovalWorkflow>, ApiError> {
    let workflow = state
        .workflows
        .find_by_id(&WorkflowId(id.clone()))
        .await?
        .ok_or_else(|| ApiError::not_found("approval workflow", &id))?;
    Ok(Json(workflow))
}

pub async fn create_workflow(
    State(state): State<AppState>,
    Json(body): Json<WorkflowRequest>,
) -> Result<(StatusCode, Json<ApprovalWorkflow>), ApiError> {
    let now = Utc::now();
    let workflow = body.into_workflow(WorkflowId(new_id("WF")), now, now);
    let workflow = store(&state, workflow).await?;

    info!(
        event_name = "api.workflow.created",
        workflow_id = %workflow.id,
        levels_required = workflow.levels_required.as_str(),
        "approval workflow created"
    );
    Ok((StatusCode::CREATED, Json(workflow)))
}

pub async fn update_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<WorkflowRequest>,
) -> Result<Json<ApprovalWorkflow>, ApiError> {
    let existing = state
        .workflows
        .find_by_id(&WorkflowId(id.clone()))
        .await?
        .ok_or_else(|| ApiError::not_found("approval workflow", &id))?;

    let workflow = body.into_workflow(existing.id, existing.created_at, Utc::now());
    let workflow = store(&state, workflow).await?;

    info!(
        event_name = "api.workflow.updated",
        workflow_id = %workflow.id,
        is_active = workflow.is_active,
        "approval workflow updated"
    );
    Ok(Json(workflow))
}

/// Dry run of the match-and-plan step performed at booking submission.
pub async fn resolve_workflow(
    State(state): State<AppState>,
    Json(body): Json<ResolveRequest>,
) -> Result<Json<ResolveResponse>, ApiError> {
    let matcher = WorkflowMatcher::new(state.workflows.list().await?);
    let workflow = matcher.find(&body.region, &body.department, &body.unit)?;
    let directory = state.employee_directory().await?;
    let resolved = ApprovalRouter.plan(workflow, &directory)?;

    Ok(Json(ResolveResponse {
        workflow_id: workflow.id.clone(),
        workflow_name: workflow.workflow_name.clone(),
        plan: resolved.plan,
        level_1_approver: resolved.level_1_approver,
        level_2_approver: resolved.level_2_approver,
    }))
}

impl WorkflowRequest {
    fn into_workflow(
        self,
        id: WorkflowId,
        created_at: chrono::DateTime<Utc>,
        updated_at: chrono::DateTime<Utc>,
    ) -> ApprovalWorkflow {
        ApprovalWorkflow {
            id,
            workflow_name: self.workflow_name,
            region: self.region,
            department: self.department,
            unit: self.unit,
            levels_required: self.levels_required,
            level_1_approver_id: approver_id(self.level_1_approver_id),
            level_2_approver_id: approver_id(self.level_2_approver_id),
            is_active: self.is_active,
            created_at,
            updated_at,
        }
    }
}

fn approver_id(raw: Option<String>) -> Option<EmployeeId> {
    raw.map(|id| id.trim().to_string()).filter(|id| !id.is_empty()).map(EmployeeId)
}

/// Validates fields, approvers and scope uniqueness, then persists.
async fn store(state: &AppState, mut workflow: ApprovalWorkflow) -> Result<ApprovalWorkflow, ApiError> {
    workflow.normalize_and_check()?;

    let directory = state.employee_directory().await?;
    let mut canonical_ids = Vec::new();
    for level in 1..=workflow.levels_required.level_count() {
        let Some(approver_id) = workflow.approver_for_level(level) else {
            continue;
        };
        let approver = directory.find(approver_id).ok_or_else(|| {
            ApiError::BadRequest(format!("level {level} approver `{approver_id}` does not exist"))
        })?;
        if !approver.can_approve() {
            return Err(ApiError::BadRequest(format!(
                "level {level} approver `{approver_id}` is not an active approver"
            )));
        }
        canonical_ids.push((level, approver.id));
    }
    // Stored ids must match the employee rows exactly.
    for (level, id) in canonical_ids {
        match level {
            1 => workflow.level_1_approver_id = Some(id),
            _ => workflow.level_2_approver_id = Some(id),
        }
    }
    workflow.normalize_and_check()?;

    let matcher = WorkflowMatcher::new(state.workflows.list().await?);
    let conflicts = matcher.conflicting(&workflow);
    if !conflicts.is_empty() {
        let ids: Vec<&str> = conflicts.iter().map(|other| other.id.0.as_str()).collect();
        return Err(ApiError::Conflict(format!(
            "an active workflow already covers {} / {} / {}: {}",
            workflow.region,
            workflow.department,
            workflow.unit,
            ids.join(", ")
        )));
    }

    state.workflows.save(workflow.clone()).await?;
    Ok(workflow)
}

#[cfg(test)]
mod tests {
    use axum::{
        extract::{Path, State},
        http::StatusCode,
        Json,
    };
    use tripxl_core::domain::employee::{EmployeeId, EmployeeRole};
    use tripxl_core::domain::workflow::LevelsRequired;
    use tripxl_db::repositories::EmployeeRepository;

    use super::*;
    use crate::api::testing::{employee, seed_people, state};

    fn request(levels_required: LevelsRequired) -> WorkflowRequest {
        WorkflowRequest {
            workflow_name: "Ops Logistics".to_string(),
            region: "Abu Dhabi".to_string(),
            department: "Operations".to_string(),
            unit: "Logistics".to_string(),
            levels_required,
            level_1_approver_id: Some("mgr-1".to_string()),
            level_2_approver_id: Some("dir-1".to_string()),
            is_active: true,
        }
    }

    #[tokio::test]
    async fn single_level_create_drops_level_two_approver() {
        let state = state();
        seed_people(&state).await;

        let (status, Json(workflow)) =
            create_workflow(State(state), Json(request(LevelsRequired::Level1Only)))
                .await
                .expect("create");
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(workflow.level_2_approver_id, None);
    }

    #[tokio::test]
    async fn both_levels_without_level_two_is_bad_request() {
        let state = state();
        seed_people(&state).await;

        let mut body = request(LevelsRequired::BothLevels);
        body.level_2_approver_id = Some("   ".to_string());
        let error = create_workflow(State(state), Json(body)).await.expect_err("missing level 2");
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn approver_must_exist_and_hold_approver_role() {
        let state = state();
        seed_people(&state).await;

        let mut unknown = request(LevelsRequired::Level1Only);
        unknown.level_1_approver_id = Some("nobody".to_string());
        let error = create_workflow(State(state.clone()), Json(unknown)).await.expect_err("unknown");
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);

        let mut plain_employee = request(LevelsRequired::Level1Only);
        plain_employee.level_1_approver_id = Some("emp-1".to_string());
        let error =
            create_workflow(State(state), Json(plain_employee)).await.expect_err("not approver");
        assert!(error.to_string().contains("not an active approver"));
    }

    #[tokio::test]
    async fn same_approver_in_different_case_is_rejected_for_both_levels() {
        let state = state();
        seed_people(&state).await;

        let mut body = request(LevelsRequired::BothLevels);
        body.level_1_approver_id = Some("mgr-1".to_string());
        body.level_2_approver_id = Some("MGR-1".to_string());
        let error = create_workflow(State(state), Json(body)).await.expect_err("same approver");
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn approver_ids_are_stored_in_canonical_form() {
        let state = state();
        seed_people(&state).await;

        let mut body = request(LevelsRequired::BothLevels);
        body.level_1_approver_id = Some(" MGR-1".to_string());
        let (_, Json(workflow)) =
            create_workflow(State(state), Json(body)).await.expect("create");
        assert_eq!(workflow.level_1_approver_id, Some(EmployeeId("mgr-1".to_string())));
    }

    #[tokio::test]
    async fn second_active_workflow_for_same_scope_conflicts() {
        let state = state();
        seed_people(&state).await;
        create_workflow(State(state.clone()), Json(request(LevelsRequired::BothLevels)))
            .await
            .expect("first");

        let mut duplicate = request(LevelsRequired::Level1Only);
        duplicate.region = " abu dhabi ".to_string();
        let error =
            create_workflow(State(state.clone()), Json(duplicate)).await.expect_err("duplicate");
        assert_eq!(error.status(), StatusCode::CONFLICT);

        let mut inactive = request(LevelsRequired::Level1Only);
        inactive.is_active = false;
        create_workflow(State(state), Json(inactive)).await.expect("inactive duplicate allowed");
    }

    #[tokio::test]
    async fn update_keeps_identity_and_can_change_levels() {
        let state = state();
        seed_people(&state).await;
        let (_, Json(created)) =
            create_workflow(State(state.clone()), Json(request(LevelsRequired::BothLevels)))
                .await
                .expect("create");

        let Json(updated) = update_workflow(
            State(state.clone()),
            Path(created.id.0.clone()),
            Json(request(LevelsRequired::Level1Only)),
        )
        .await
        .expect("update");
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.levels_required, LevelsRequired::Level1Only);

        let error = update_workflow(
            State(state),
            Path("WF-missing".to_string()),
            Json(request(LevelsRequired::Level1Only)),
        )
        .await
        .expect_err("missing");
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn resolve_returns_plan_or_unprocessable() {
        let state = state();
        seed_people(&state).await;
        create_workflow(State(state.clone()), Json(request(LevelsRequired::BothLevels)))
            .await
            .expect("create");

        let Json(resolved) = resolve_workflow(
            State(state.clone()),
            Json(ResolveRequest {
                region: "ABU DHABI".to_string(),
                department: "operations".to_string(),
                unit: "logistics ".to_string(),
            }),
        )
        .await
        .expect("resolve");
        assert_eq!(resolved.plan.level_2_approver_id, Some(EmployeeId("dir-1".to_string())));
        assert_eq!(resolved.level_1_approver.id.0, "mgr-1");

        let error = resolve_workflow(
            State(state),
            Json(ResolveRequest {
                region: "Dubai".to_string(),
                department: "Operations".to_string(),
                unit: "Logistics".to_string(),
            }),
        )
        .await
        .expect_err("no workflow");
        assert_eq!(error.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn resolve_reports_deactivated_approver() {
        let state = state();
        seed_people(&state).await;
        create_workflow(State(state.clone()), Json(request(LevelsRequired::Level1Only)))
            .await
            .expect("create");

        let mut departed = employee("mgr-1", EmployeeRole::Approver);
        departed.is_active = false;
        state.employees.save(departed).await.expect("deactivate");

        let error = resolve_workflow(
            State(state),
            Json(ResolveRequest {
                region: "Abu Dhabi".to_string(),
                department: "Operations".to_string(),
                unit: "Logistics".to_string(),
            }),
        )
        .await
        .expect_err("unresolved approver");
        assert_eq!(error.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
