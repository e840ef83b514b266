use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmployeeId(pub String);

impl std::fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeRole {
    Employee,
    Approver,
    Admin,
}

impl EmployeeRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Employee => "employee",
            Self::Approver => "approver",
            Self::Admin => "admin",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "employee" => Some(Self::Employee),
            "approver" => Some(Self::Approver),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub employee_code: String,
    pub name: String,
    pub email: String,
    pub region: String,
    pub department: String,
    pub unit: String,
    pub designation: String,
    pub role: EmployeeRole,
    pub is_active: bool,
}

impl Employee {
    pub fn can_approve(&self) -> bool {
        self.is_active && matches!(self.role, EmployeeRole::Approver | EmployeeRole::Admin)
    }
}

#[cfg(test)]
mod tests {
    use super::{Employee, EmployeeId, EmployeeRole};

    fn employee(role: EmployeeRole, is_active: bool) -> Employee {
        Employee {
            id: EmployeeId("E-1".to_string()),
            employee_code: "1001".to_string(),
            name: "Mariam Haddad".to_string(),
            email: "mariam@example.com".to_string(),
            region: "Abu Dhabi".to_string(),
            department: "Operations".to_string(),
            unit: "Logistics".to_string(),
            designation: "Manager".to_string(),
            role,
            is_active,
        }
    }

    #[test]
    fn only_active_approvers_and_admins_can_approve() {
        assert!(employee(EmployeeRole::Approver, true).can_approve());
        assert!(employee(EmployeeRole::Admin, true).can_approve());
        assert!(!employee(EmployeeRole::Employee, true).can_approve());
        assert!(!employee(EmployeeRole::Approver, false).can_approve());
    }

    #[test]
    fn role_parse_is_case_insensitive() {
        assert_eq!(EmployeeRole::parse(" Approver "), Some(EmployeeRole::Approver));
        assert_eq!(EmployeeRole::parse("driver"), None);
    }
}
