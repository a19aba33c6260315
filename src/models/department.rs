use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::employee::{Employee, EmployeeId};

pub type DepartmentId = i32;

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub department_id: DepartmentId,
    pub name: String,
    pub description: Option<String>,
    pub establishment_date: NaiveDate,
    pub manager_id: Option<EmployeeId>,
    pub row_version: i32,
}

/// The user-editable part of a department. The manager pointer is never part
/// of a draft; it only changes through the assignment coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartmentDraft {
    pub name: String,
    pub description: Option<String>,
    pub establishment_date: NaiveDate,
}

impl Department {
    pub fn with_draft(&self, draft: &DepartmentDraft, manager_id: Option<EmployeeId>) -> Self {
        Self {
            department_id: self.department_id,
            name: draft.name.clone(),
            description: draft.description.clone(),
            establishment_date: draft.establishment_date,
            manager_id,
            row_version: self.row_version,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ManagerSummary {
    pub employee_id: EmployeeId,
    pub name_surname: String,
}

impl From<&Employee> for ManagerSummary {
    fn from(employee: &Employee) -> Self {
        Self {
            employee_id: employee.employee_id,
            name_surname: employee.name_surname(),
        }
    }
}

/// A department together with its manager, as shown on list and detail screens.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentView {
    #[serde(flatten)]
    pub department: Department,
    pub manager: Option<ManagerSummary>,
}
