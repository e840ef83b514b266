use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::booking::{
    ApprovalDecision, ApprovalPlan, Booking, BookingApproval, BookingStatus,
};
use crate::domain::employee::{Employee, EmployeeId};
use crate::domain::workflow::{ApprovalWorkflow, LevelsRequired, OrgScope};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("no active approval workflow for region `{region}`, department `{department}`, unit `{unit}`")]
    NoMatchingWorkflow { region: String, department: String, unit: String },
    #[error("{} active approval workflows match the same scope: {}", .workflow_ids.len(), .workflow_ids.join(", "))]
    AmbiguousWorkflow { workflow_ids: Vec<String> },
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RoutingError {
    #[error("workflow `{workflow_id}` has no level {level} approver")]
    MissingApprover { workflow_id: String, level: u8 },
    #[error("level {level} approver `{approver_id}` does not resolve to an active employee")]
    UnresolvedApprover { level: u8, approver_id: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error(transparent)]
    Match(#[from] MatchError),
    #[error(transparent)]
    Routing(#[from] RoutingError),
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ApprovalError {
    #[error("booking in status `{}` has no approval pending", .status.as_str())]
    NothingPending { status: BookingStatus },
    #[error("employee `{actual}` is not the level {level} approver (expected `{expected}`)")]
    NotAssignedApprover { level: u8, expected: String, actual: String },
    #[error(transparent)]
    Transition(#[from] DomainError),
}

/// Looks up employees referenced by workflows.
pub trait EmployeeDirectory {
    fn find(&self, id: &EmployeeId) -> Option<Employee>;
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryEmployeeDirectory {
    employees: HashMap<String, Employee>,
}

impl InMemoryEmployeeDirectory {
    pub fn new(employees: Vec<Employee>) -> Self {
        Self {
            employees: employees
                .into_iter()
                .map(|employee| (normalize_key(&employee.id.0), employee))
                .collect(),
        }
    }
}

impl EmployeeDirectory for InMemoryEmployeeDirectory {
    fn find(&self, id: &EmployeeId) -> Option<Employee> {
        self.employees.get(&normalize_key(&id.0)).cloned()
    }
}

#[derive(Clone, Debug, Default)]
pub struct WorkflowMatcher {
    workflows: Vec<ApprovalWorkflow>,
}

impl WorkflowMatcher {
    pub fn new(workflows: Vec<ApprovalWorkflow>) -> Self {
        Self { workflows }
    }

    /// Returns the single active workflow for the scope. Zero or several
    /// matches are reported, never tie-broken.
    pub fn find(
        &self,
        region: &str,
        department: &str,
        unit: &str,
    ) -> Result<&ApprovalWorkflow, MatchError> {
        let scope = OrgScope::new(region, department, unit);
        let mut matches: Vec<&ApprovalWorkflow> = self
            .workflows
            .iter()
            .filter(|workflow| workflow.is_active && workflow.scope() == scope)
            .collect();

        match matches.len() {
            0 => Err(MatchError::NoMatchingWorkflow {
                region: region.trim().to_string(),
                department: department.trim().to_string(),
                unit: unit.trim().to_string(),
            }),
            1 => Ok(matches.remove(0)),
            _ => {
                let mut workflow_ids: Vec<String> =
                    matches.iter().map(|workflow| workflow.id.0.clone()).collect();
                workflow_ids.sort();
                Err(MatchError::AmbiguousWorkflow { workflow_ids })
            }
        }
    }

    /// Other active workflows already claiming the candidate's scope.
    pub fn conflicting(&self, candidate: &ApprovalWorkflow) -> Vec<&ApprovalWorkflow> {
        if !candidate.is_active {
            return Vec::new();
        }
        let scope = candidate.scope();
        self.workflows
            .iter()
            .filter(|workflow| workflow.is_active && workflow.id != candidate.id)
            .filter(|workflow| workflow.scope() == scope)
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedApprovers {
    pub plan: ApprovalPlan,
    pub level_1_approver: Employee,
    pub level_2_approver: Option<Employee>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ApprovalRouter;

impl ApprovalRouter {
    /// Resolves the approver chain a workflow demands.
    pub fn plan<D>(
        &self,
        workflow: &ApprovalWorkflow,
        directory: &D,
    ) -> Result<ResolvedApprovers, RoutingError>
    where
        D: EmployeeDirectory + ?Sized,
    {
        let level_1_approver = resolve_level(workflow, 1, directory)?;
        let level_2_approver = match workflow.levels_required {
            LevelsRequired::Level1Only => None,
            LevelsRequired::BothLevels => Some(resolve_level(workflow, 2, directory)?),
        };

        Ok(ResolvedApprovers {
            plan: ApprovalPlan {
                workflow_id: workflow.id.clone(),
                levels_required: workflow.levels_required,
                level_1_approver_id: level_1_approver.id.clone(),
                level_2_approver_id: level_2_approver.as_ref().map(|employee| employee.id.clone()),
            },
            level_1_approver,
            level_2_approver,
        })
    }

    /// Match then plan in one step, as done at booking submission.
    pub fn resolve<D>(
        &self,
        matcher: &WorkflowMatcher,
        region: &str,
        department: &str,
        unit: &str,
        directory: &D,
    ) -> Result<ResolvedApprovers, ResolutionError>
    where
        D: EmployeeDirectory + ?Sized,
    {
        let workflow = matcher.find(region, department, unit)?;
        Ok(self.plan(workflow, directory)?)
    }

    pub fn pending_level(&self, booking: &Booking) -> Option<u8> {
        match booking.status {
            BookingStatus::Pending => Some(1),
            BookingStatus::Level1Approved
                if booking.approval_plan.levels_required == LevelsRequired::BothLevels =>
            {
                Some(2)
            }
            _ => None,
        }
    }

    pub fn decide(
        &self,
        booking: &mut Booking,
        approver_id: &EmployeeId,
        decision: ApprovalDecision,
        comments: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<BookingApproval, ApprovalError> {
        let level = self
            .pending_level(booking)
            .ok_or(ApprovalError::NothingPending { status: booking.status })?;
        let expected = booking
            .approval_plan
            .approver_for_level(level)
            .cloned()
            .ok_or(ApprovalError::NothingPending { status: booking.status })?;

        if normalize_key(&expected.0) != normalize_key(&approver_id.0) {
            return Err(ApprovalError::NotAssignedApprover {
                level,
                expected: expected.0.clone(),
                actual: approver_id.0.clone(),
            });
        }

        let next = match (level, decision) {
            (_, ApprovalDecision::Rejected) => BookingStatus::Rejected,
            (1, ApprovalDecision::Approved) => BookingStatus::Level1Approved,
            (_, ApprovalDecision::Approved) => BookingStatus::Level2Approved,
        };
        booking.transition_to(next, now)?;

        let approval = BookingApproval {
            booking_id: booking.id.clone(),
            level,
            approver_id: expected,
            decision,
            comments: comments.map(|text| text.trim().to_string()).filter(|text| !text.is_empty()),
            decided_at: now,
        };
        booking.approvals.push(approval.clone());
        Ok(approval)
    }
}

fn resolve_level<D>(
    workflow: &ApprovalWorkflow,
    level: u8,
    directory: &D,
) -> Result<Employee, RoutingError>
where
    D: EmployeeDirectory + ?Sized,
{
    let approver_id = workflow
        .approver_for_level(level)
        .ok_or_else(|| RoutingError::MissingApprover { workflow_id: workflow.id.0.clone(), level })?;

    directory.find(approver_id).filter(|employee| employee.is_active).ok_or_else(|| {
        RoutingError::UnresolvedApprover { level, approver_id: approver_id.0.clone() }
    })
}

fn normalize_key(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}
