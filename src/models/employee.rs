use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::department::DepartmentId;

pub type EmployeeId = i32;

const ADMIN_ROLE: &str = "Admin";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EmployeeRole {
    Admin,
    Other(String),
}

impl EmployeeRole {
    pub fn as_str(&self) -> &str {
        match self {
            EmployeeRole::Admin => ADMIN_ROLE,
            EmployeeRole::Other(role) => role,
        }
    }

    /// Only admins may be put in charge of a department.
    pub fn can_manage_department(&self) -> bool {
        matches!(self, EmployeeRole::Admin)
    }
}

impl From<String> for EmployeeRole {
    fn from(role: String) -> Self {
        if role == ADMIN_ROLE {
            EmployeeRole::Admin
        } else {
            EmployeeRole::Other(role)
        }
    }
}

impl From<&str> for EmployeeRole {
    fn from(role: &str) -> Self {
        EmployeeRole::from(role.to_string())
    }
}

impl From<EmployeeRole> for String {
    fn from(role: EmployeeRole) -> Self {
        match role {
            EmployeeRole::Admin => ADMIN_ROLE.to_string(),
            EmployeeRole::Other(role) => role,
        }
    }
}

impl fmt::Display for EmployeeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub employee_id: EmployeeId,
    pub name: String,
    pub surname: String,
    pub email: Option<String>,
    #[sqlx(try_from = "String")]
    pub role: EmployeeRole,
    pub is_department_manager: bool,
    pub department_id: Option<DepartmentId>,
    pub row_version: i32,
}

impl Employee {
    pub fn name_surname(&self) -> String {
        format!("{} {}", self.name, self.surname)
    }
}

/// An employee whose role has been checked to allow department management.
///
/// The only way to obtain one is `EligibleManager::try_from(employee)`, so any
/// function taking an `EligibleManager` cannot be handed a non-admin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibleManager(Employee);

impl EligibleManager {
    /// Marks the employee as manager of `department_id` and moves them into it.
    pub fn appointed_to(self, department_id: DepartmentId) -> Employee {
        Employee {
            is_department_manager: true,
            department_id: Some(department_id),
            ..self.0
        }
    }
}

impl TryFrom<Employee> for EligibleManager {
    type Error = Employee;

    fn try_from(employee: Employee) -> Result<Self, Self::Error> {
        if employee.role.can_manage_department() {
            Ok(EligibleManager(employee))
        } else {
            Err(employee)
        }
    }
}
