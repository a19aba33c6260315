//! In-process record store.
//!
//! Each unit of work holds the store lock for its whole lifetime and works on
//! a private copy of the tables, which replaces the shared tables on commit.
//! This gives serializable units of work. Writes can be made to fail on demand
//! to exercise rollback paths.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::models::department::{Department, DepartmentDraft, DepartmentId};
use crate::models::employee::{Employee, EmployeeId, EmployeeRole};
use crate::store::{Entity, RecordStore, StoreError, UnitOfWork, MANAGER_UNIQUE_CONSTRAINT};

const FAULTS_DISARMED: usize = usize::MAX;

#[derive(Debug, Clone, Default)]
struct Tables {
    departments: BTreeMap<DepartmentId, Department>,
    employees: BTreeMap<EmployeeId, Employee>,
    last_department_id: DepartmentId,
    last_employee_id: EmployeeId,
}

#[derive(Clone)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    writes_until_fault: Arc<AtomicUsize>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables::default())),
            writes_until_fault: Arc::new(AtomicUsize::new(FAULTS_DISARMED)),
        }
    }

    /// Adds an employee outside of any unit of work. Employees are owned by
    /// the personnel screens, so the coordinator never creates them.
    pub async fn seed_employee(
        &self,
        name: &str,
        surname: &str,
        role: impl Into<EmployeeRole>,
    ) -> Employee {
        let mut tables = self.tables.lock().await;
        tables.last_employee_id += 1;
        let employee = Employee {
            employee_id: tables.last_employee_id,
            name: name.to_string(),
            surname: surname.to_string(),
            email: None,
            role: role.into(),
            is_department_manager: false,
            department_id: None,
            row_version: 0,
        };
        tables.employees.insert(employee.employee_id, employee.clone());
        employee
    }

    pub async fn departments(&self) -> Vec<Department> {
        self.tables.lock().await.departments.values().cloned().collect()
    }

    pub async fn employees(&self) -> Vec<Employee> {
        self.tables.lock().await.employees.values().cloned().collect()
    }

    pub async fn employee(&self, id: EmployeeId) -> Option<Employee> {
        self.tables.lock().await.employees.get(&id).cloned()
    }

    pub async fn department(&self, id: DepartmentId) -> Option<Department> {
        self.tables.lock().await.departments.get(&id).cloned()
    }

    /// Lets `successful_writes` more writes through, then fails the next one
    /// with `StoreError::Unavailable`. The fault fires once.
    pub fn fail_after_writes(&self, successful_writes: usize) {
        self.writes_until_fault.store(successful_writes, Ordering::SeqCst);
    }

    pub fn disarm_faults(&self) {
        self.writes_until_fault.store(FAULTS_DISARMED, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryUnitOfWork {
            guard,
            working,
            writes_until_fault: Arc::clone(&self.writes_until_fault),
        }))
    }
}

pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
    writes_until_fault: Arc<AtomicUsize>,
}

impl MemoryUnitOfWork {
    fn before_write(&self) -> Result<(), StoreError> {
        let remaining = self.writes_until_fault.load(Ordering::SeqCst);
        if remaining == FAULTS_DISARMED {
            return Ok(());
        }
        if remaining == 0 {
            self.writes_until_fault.store(FAULTS_DISARMED, Ordering::SeqCst);
            return Err(StoreError::Unavailable("injected write fault".to_string()));
        }
        self.writes_until_fault.store(remaining - 1, Ordering::SeqCst);
        Ok(())
    }

    fn check_manager_unique(
        &self,
        department_id: Option<DepartmentId>,
        manager_id: Option<EmployeeId>,
    ) -> Result<(), StoreError> {
        let Some(manager_id) = manager_id else {
            return Ok(());
        };
        let taken = self.working.departments.values().any(|department| {
            department.manager_id == Some(manager_id) && Some(department.department_id) != department_id
        });
        if taken {
            return Err(StoreError::UniqueViolation(MANAGER_UNIQUE_CONSTRAINT.to_string()));
        }
        Ok(())
    }

    fn department_conflict(department: &Department) -> StoreError {
        StoreError::ConcurrencyConflict {
            entity: Entity::Department,
            key: department.department_id,
        }
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn find_department(&mut self, id: DepartmentId) -> Result<Option<Department>, StoreError> {
        Ok(self.working.departments.get(&id).cloned())
    }

    async fn list_departments(&mut self) -> Result<Vec<Department>, StoreError> {
        Ok(self.working.departments.values().cloned().collect())
    }

    async fn department_managed_by(
        &mut self,
        manager_id: EmployeeId,
    ) -> Result<Option<Department>, StoreError> {
        Ok(self
            .working
            .departments
            .values()
            .find(|department| department.manager_id == Some(manager_id))
            .cloned())
    }

    async fn find_employee(&mut self, id: EmployeeId) -> Result<Option<Employee>, StoreError> {
        Ok(self.working.employees.get(&id).cloned())
    }

    async fn employees_with_role(&mut self, role: &EmployeeRole) -> Result<Vec<Employee>, StoreError> {
        Ok(self
            .working
            .employees
            .values()
            .filter(|employee| &employee.role == role)
            .cloned()
            .collect())
    }

    async fn insert_department(
        &mut self,
        draft: &DepartmentDraft,
        manager_id: Option<EmployeeId>,
    ) -> Result<Department, StoreError> {
        self.before_write()?;
        self.check_manager_unique(None, manager_id)?;

        self.working.last_department_id += 1;
        let department = Department {
            department_id: self.working.last_department_id,
            name: draft.name.clone(),
            description: draft.description.clone(),
            establishment_date: draft.establishment_date,
            manager_id,
            row_version: 0,
        };
        self.working
            .departments
            .insert(department.department_id, department.clone());
        Ok(department)
    }

    async fn update_department(&mut self, department: &Department) -> Result<Department, StoreError> {
        self.before_write()?;
        let stored_version = self
            .working
            .departments
            .get(&department.department_id)
            .map(|stored| stored.row_version);
        if stored_version != Some(department.row_version) {
            return Err(Self::department_conflict(department));
        }
        self.check_manager_unique(Some(department.department_id), department.manager_id)?;

        let updated = Department {
            row_version: department.row_version + 1,
            ..department.clone()
        };
        self.working
            .departments
            .insert(updated.department_id, updated.clone());
        Ok(updated)
    }

    async fn remove_department(&mut self, department: &Department) -> Result<(), StoreError> {
        self.before_write()?;
        let stored_version = self
            .working
            .departments
            .get(&department.department_id)
            .map(|stored| stored.row_version);
        if stored_version != Some(department.row_version) {
            return Err(Self::department_conflict(department));
        }

        self.working.departments.remove(&department.department_id);
        // ON DELETE SET NULL
        for employee in self.working.employees.values_mut() {
            if employee.department_id == Some(department.department_id) {
                employee.department_id = None;
            }
        }
        Ok(())
    }

    async fn update_employee_assignment(&mut self, employee: &Employee) -> Result<Employee, StoreError> {
        self.before_write()?;
        let stored = self
            .working
            .employees
            .get_mut(&employee.employee_id)
            .filter(|stored| stored.row_version == employee.row_version)
            .ok_or(StoreError::ConcurrencyConflict {
                entity: Entity::Employee,
                key: employee.employee_id,
            })?;

        stored.is_department_manager = employee.is_department_manager;
        stored.department_id = employee.department_id;
        stored.row_version += 1;
        Ok(stored.clone())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryUnitOfWork {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
