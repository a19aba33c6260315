#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;

use monday_backend::coordinator::AssignmentCoordinator;
use monday_backend::models::department::DepartmentDraft;
use monday_backend::models::employee::{Employee, EmployeeRole};
use monday_backend::store::memory::MemoryStore;

pub struct Staff {
    pub admins: Vec<Employee>,
    pub others: Vec<Employee>,
}

impl Staff {
    /// Every seeded employee, ordered by key like the store lists them.
    pub fn all_sorted(&self) -> Vec<Employee> {
        let mut all: Vec<Employee> = self.admins.iter().chain(self.others.iter()).cloned().collect();
        all.sort_by_key(|employee| employee.employee_id);
        all
    }
}

pub fn draft(name: &str) -> DepartmentDraft {
    DepartmentDraft {
        name: name.to_string(),
        description: Some(format!("{name} department")),
        establishment_date: NaiveDate::from_ymd_opt(2021, 1, 18).unwrap(),
    }
}

/// A memory store with four admins and two non-admins, interleaved so that
/// ordering by key differs from ordering by insertion of admins only.
pub async fn seeded() -> (MemoryStore, AssignmentCoordinator, Staff) {
    let store = MemoryStore::new();
    let mut admins = Vec::new();
    let mut others = Vec::new();

    admins.push(store.seed_employee("Ada", "Lovelace", "Admin").await);
    others.push(store.seed_employee("Alan", "Turing", "Developer").await);
    admins.push(store.seed_employee("Grace", "Hopper", "Admin").await);
    others.push(store.seed_employee("Linus", "Torvalds", "Superadmin").await);
    admins.push(store.seed_employee("Edsger", "Dijkstra", "Admin").await);
    admins.push(store.seed_employee("Barbara", "Liskov", "Admin").await);

    let coordinator = AssignmentCoordinator::new(Arc::new(store.clone()), Duration::from_secs(60));
    (store, coordinator, Staff { admins, others })
}

/// Panics unless departments and employees agree on who manages what.
pub async fn assert_invariants(store: &MemoryStore) {
    let departments = store.departments().await;
    let employees = store.employees().await;

    let mut managers = HashSet::new();
    for department in &departments {
        let Some(manager_id) = department.manager_id else {
            continue;
        };
        assert!(
            managers.insert(manager_id),
            "employee {manager_id} manages more than one department"
        );
        let manager = employees
            .iter()
            .find(|employee| employee.employee_id == manager_id)
            .unwrap_or_else(|| panic!("department {} points at missing employee", department.department_id));
        assert!(manager.is_department_manager, "manager {manager_id} is not flagged");
        assert_eq!(manager.department_id, Some(department.department_id));
        assert_eq!(manager.role, EmployeeRole::Admin);
    }

    for employee in &employees {
        assert_eq!(
            employee.is_department_manager,
            managers.contains(&employee.employee_id),
            "flag of employee {} disagrees with departments",
            employee.employee_id
        );
    }
}
