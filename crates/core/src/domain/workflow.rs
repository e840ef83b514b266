use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::employee::EmployeeId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkflowId(pub String);

impl std::fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelsRequired {
    #[serde(rename = "LEVEL_1_ONLY")]
    Level1Only,
    #[serde(rename = "BOTH_LEVELS")]
    BothLevels,
}

impl LevelsRequired {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Level1Only => "LEVEL_1_ONLY",
            Self::BothLevels => "BOTH_LEVELS",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "LEVEL_1_ONLY" => Some(Self::Level1Only),
            "BOTH_LEVELS" => Some(Self::BothLevels),
            _ => None,
        }
    }

    pub fn level_count(&self) -> u8 {
        match self {
            Self::Level1Only => 1,
            Self::BothLevels => 2,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalWorkflow {
    pub id: WorkflowId,
    pub workflow_name: String,
    pub region: String,
    pub department: String,
    pub unit: String,
    pub levels_required: LevelsRequired,
    pub level_1_approver_id: Option<EmployeeId>,
    pub level_2_approver_id: Option<EmployeeId>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Normalized (region, department, unit) triple used for matching and
/// uniqueness checks.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrgScope {
    pub region: String,
    pub department: String,
    pub unit: String,
}

impl OrgScope {
    pub fn new(region: &str, department: &str, unit: &str) -> Self {
        Self {
            region: normalize(region),
            department: normalize(department),
            unit: normalize(unit),
        }
    }
}

impl ApprovalWorkflow {
    pub fn scope(&self) -> OrgScope {
        OrgScope::new(&self.region, &self.department, &self.unit)
    }

    pub fn approver_for_level(&self, level: u8) -> Option<&EmployeeId> {
        match level {
            1 => self.level_1_approver_id.as_ref(),
            2 => self.level_2_approver_id.as_ref(),
            _ => None,
        }
    }

    /// Field-level checks that need no employee lookups. Clears a stray
    /// level-2 approver on single-level workflows.
    pub fn normalize_and_check(&mut self) -> Result<(), DomainError> {
        for (field, value) in [
            ("workflow_name", &self.workflow_name),
            ("region", &self.region),
            ("department", &self.department),
            ("unit", &self.unit),
        ] {
            if value.trim().is_empty() {
                return Err(DomainError::InvariantViolation(format!("{field} must not be blank")));
            }
        }

        self.workflow_name = self.workflow_name.trim().to_string();
        self.region = self.region.trim().to_string();
        self.department = self.department.trim().to_string();
        self.unit = self.unit.trim().to_string();

        let Some(level_1) = self.level_1_approver_id.as_ref() else {
            return Err(DomainError::InvariantViolation(
                "level_1_approver_id is required".to_string(),
            ));
        };

        match self.levels_required {
            LevelsRequired::Level1Only => {
                self.level_2_approver_id = None;
            }
            LevelsRequired::BothLevels => {
                let Some(level_2) = self.level_2_approver_id.as_ref() else {
                    return Err(DomainError::InvariantViolation(
                        "level_2_approver_id is required when levels_required is BOTH_LEVELS"
                            .to_string(),
                    ));
                };
                if normalize(&level_1.0) == normalize(&level_2.0) {
                    return Err(DomainError::InvariantViolation(
                        "level 1 and level 2 approvers must be different employees".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }
}

pub(crate) fn normalize(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}
