//! Record store boundary.
//!
//! Everything the assignment coordinator reads or writes goes through a
//! [`UnitOfWork`] obtained from a [`RecordStore`]. A unit of work is a
//! transaction: writes become visible to other units only on `commit`, and
//! `rollback` (or dropping it) discards them.

pub mod memory;
pub mod postgres;

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::department::{Department, DepartmentDraft, DepartmentId};
use crate::models::employee::{Employee, EmployeeId, EmployeeRole};

/// Name of the unique index that allows one department per manager.
pub const MANAGER_UNIQUE_CONSTRAINT: &str = "departments_manager_id_key";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Department,
    Employee,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Department => f.write_str("department"),
            Entity::Employee => f.write_str("employee"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The row was changed or removed since it was read.
    #[error("{entity} {key} was modified since it was read")]
    ConcurrencyConflict { entity: Entity, key: i32 },
    #[error("unique constraint {0} violated")]
    UniqueViolation(String),
    /// Transient: connection, pool or serialization failure. Safe to retry.
    #[error("record store unavailable: {0}")]
    Unavailable(String),
    #[error("record store failure: {0}")]
    Database(String),
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError>;
}

#[async_trait]
pub trait UnitOfWork: Send {
    /// Reads a department and holds it for the rest of the unit of work, so
    /// concurrent edits of the same department serialize.
    async fn find_department(&mut self, id: DepartmentId) -> Result<Option<Department>, StoreError>;

    async fn list_departments(&mut self) -> Result<Vec<Department>, StoreError>;

    async fn department_managed_by(
        &mut self,
        manager_id: EmployeeId,
    ) -> Result<Option<Department>, StoreError>;

    async fn find_employee(&mut self, id: EmployeeId) -> Result<Option<Employee>, StoreError>;

    /// Employees with exactly this role, ordered by key.
    async fn employees_with_role(&mut self, role: &EmployeeRole) -> Result<Vec<Employee>, StoreError>;

    async fn insert_department(
        &mut self,
        draft: &DepartmentDraft,
        manager_id: Option<EmployeeId>,
    ) -> Result<Department, StoreError>;

    /// Writes every column of `department`, provided its `row_version` still
    /// matches the stored one. Returns the row with the bumped version.
    async fn update_department(&mut self, department: &Department) -> Result<Department, StoreError>;

    async fn remove_department(&mut self, department: &Department) -> Result<(), StoreError>;

    /// Writes the coordinator-owned columns of an employee: the manager flag
    /// and the department membership. Version-checked like departments.
    async fn update_employee_assignment(&mut self, employee: &Employee) -> Result<Employee, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
