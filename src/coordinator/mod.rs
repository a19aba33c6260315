//! Department manager assignment.
//!
//! A department points at its manager through `manager_id`, and the manager's
//! employee row carries `is_department_manager` plus `department_id`. Both sides
//! are only ever written here, and every operation runs in a single unit of
//! work so a failure part way through leaves neither side changed.
//!
//! Write order inside an operation is fixed: release the outgoing manager,
//! write the department, appoint the incoming manager.

pub mod error;
pub mod session;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use crate::models::department::{Department, DepartmentDraft, DepartmentId, DepartmentView, ManagerSummary};
use crate::models::employee::{EligibleManager, Employee, EmployeeId, EmployeeRole};
use crate::store::{Entity, RecordStore, StoreError, UnitOfWork, MANAGER_UNIQUE_CONSTRAINT};

pub use error::AssignmentError;
pub use session::{EditSessions, EditSnapshot};

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct EditForm {
    pub department: Department,
    pub edit_token: Uuid,
    pub eligible_managers: Vec<ManagerSummary>,
}

pub struct AssignmentCoordinator {
    store: Arc<dyn RecordStore>,
    sessions: EditSessions,
}

impl AssignmentCoordinator {
    pub fn new(store: Arc<dyn RecordStore>, edit_session_ttl: Duration) -> Self {
        Self {
            store,
            sessions: EditSessions::new(edit_session_ttl),
        }
    }

    pub fn edit_sessions(&self) -> &EditSessions {
        &self.sessions
    }

    /// Creates a department and, if a manager is given, appoints them.
    pub async fn assign_on_create(
        &self,
        draft: DepartmentDraft,
        manager_id: Option<EmployeeId>,
    ) -> Result<Department, AssignmentError> {
        let mut tx = self.store.begin().await?;
        let outcome = Self::create_in(&mut *tx, &draft, manager_id).await;
        let department = Self::finish(tx, outcome).await.map_err(|err| {
            log::warn!("Creation of department {} rejected: {}", draft.name, err);
            err
        })?;

        log::info!(
            "Created department {} ({}) with manager {:?}",
            department.department_id,
            department.name,
            department.manager_id
        );
        Ok(department)
    }

    /// Loads a department for editing and remembers which manager it had.
    /// The returned token must accompany the matching `apply_edit`.
    pub async fn prepare_edit(&self, department_id: DepartmentId) -> Result<EditForm, AssignmentError> {
        let mut tx = self.store.begin().await?;
        let outcome = Self::edit_form_in(&mut *tx, department_id).await;
        let (department, eligible_managers) = Self::finish(tx, outcome).await?;

        let edit_token = self.sessions.issue(EditSnapshot::from(&department));
        Ok(EditForm {
            department,
            edit_token,
            eligible_managers: eligible_managers.iter().map(ManagerSummary::from).collect(),
        })
    }

    /// Applies a submitted edit form. `new_manager_id` may keep, replace or
    /// clear the manager recorded when the form was opened.
    pub async fn apply_edit(
        &self,
        department_id: DepartmentId,
        edit_token: Uuid,
        draft: DepartmentDraft,
        new_manager_id: Option<EmployeeId>,
    ) -> Result<Department, AssignmentError> {
        let snapshot = self
            .sessions
            .get(department_id, edit_token)
            .ok_or(AssignmentError::EditSessionExpired)?;

        let mut tx = self.store.begin().await?;
        let outcome = Self::edit_in(&mut *tx, snapshot, &draft, new_manager_id).await;
        let outcome = match Self::finish(tx, outcome).await {
            Err(err) => Err(self.resolve_conflict(department_id, err).await),
            ok => ok,
        };

        match &outcome {
            Ok(department) => {
                self.sessions.discard(department_id, edit_token);
                log::info!(
                    "Updated department {}: manager {:?} -> {:?}",
                    department_id,
                    snapshot.previous_manager_id,
                    department.manager_id
                );
            }
            Err(err) if err.invalidates_edit_session() => {
                self.sessions.discard(department_id, edit_token);
                log::warn!("Edit of department {} abandoned: {}", department_id, err);
            }
            Err(err) => log::warn!("Edit of department {} rejected: {}", department_id, err),
        }
        outcome
    }

    /// Takes the manager off a department, leaving the department in place.
    pub async fn release(&self, department_id: DepartmentId) -> Result<Department, AssignmentError> {
        let mut tx = self.store.begin().await?;
        let outcome = Self::release_in(&mut *tx, department_id).await;
        let department = match Self::finish(tx, outcome).await {
            Ok(department) => department,
            Err(err) => {
                let err = self.resolve_conflict(department_id, err).await;
                log::warn!("Release of manager of department {} failed: {}", department_id, err);
                return Err(err);
            }
        };

        log::info!("Released manager of department {}", department_id);
        Ok(department)
    }

    /// Releases the manager, then removes the department row.
    pub async fn delete(&self, department_id: DepartmentId) -> Result<Department, AssignmentError> {
        let mut tx = self.store.begin().await?;
        let outcome = Self::delete_in(&mut *tx, department_id).await;
        let department = match Self::finish(tx, outcome).await {
            Ok(department) => department,
            Err(err) => {
                let err = self.resolve_conflict(department_id, err).await;
                log::warn!("Deletion of department {} failed: {}", department_id, err);
                return Err(err);
            }
        };

        log::info!("Deleted department {} ({})", department_id, department.name);
        Ok(department)
    }

    /// Employees whose role allows them to manage a department, by key.
    pub async fn eligible_managers(&self) -> Result<Vec<Employee>, AssignmentError> {
        let mut tx = self.store.begin().await?;
        let outcome = tx
            .employees_with_role(&EmployeeRole::Admin)
            .await
            .map_err(AssignmentError::from);
        Self::finish(tx, outcome).await
    }

    pub async fn list(&self) -> Result<Vec<DepartmentView>, AssignmentError> {
        let mut tx = self.store.begin().await?;
        let outcome = Self::list_in(&mut *tx).await;
        Self::finish(tx, outcome).await
    }

    pub async fn details(&self, department_id: DepartmentId) -> Result<DepartmentView, AssignmentError> {
        let mut tx = self.store.begin().await?;
        let outcome = Self::details_in(&mut *tx, department_id).await;
        Self::finish(tx, outcome).await
    }

    async fn create_in(
        tx: &mut dyn UnitOfWork,
        draft: &DepartmentDraft,
        manager_id: Option<EmployeeId>,
    ) -> Result<Department, AssignmentError> {
        let manager = match manager_id {
            Some(manager_id) => Some(Self::claimable_manager(tx, manager_id, None).await?),
            None => None,
        };

        let department = tx
            .insert_department(draft, manager_id)
            .await
            .map_err(|err| Self::duplicate_manager_or(err, manager_id))?;

        if let Some(manager) = manager {
            Self::appoint(tx, manager, department.department_id).await?;
        }
        Ok(department)
    }

    async fn edit_form_in(
        tx: &mut dyn UnitOfWork,
        department_id: DepartmentId,
    ) -> Result<(Department, Vec<Employee>), AssignmentError> {
        let department = Self::load_department(tx, department_id).await?;
        let eligible = tx.employees_with_role(&EmployeeRole::Admin).await?;
        Ok((department, eligible))
    }

    async fn edit_in(
        tx: &mut dyn UnitOfWork,
        snapshot: EditSnapshot,
        draft: &DepartmentDraft,
        new_manager_id: Option<EmployeeId>,
    ) -> Result<Department, AssignmentError> {
        let current = Self::load_department(tx, snapshot.department_id).await?;
        if current.row_version != snapshot.row_version {
            return Err(AssignmentError::ConcurrencyConflict {
                entity: Entity::Department,
                key: current.department_id,
            });
        }

        let previous_manager_id = snapshot.previous_manager_id;
        let manager_changed = new_manager_id != previous_manager_id;

        // Validate the incoming manager before anything is written.
        let incoming = match new_manager_id {
            Some(manager_id) if manager_changed => {
                Some(Self::claimable_manager(tx, manager_id, Some(current.department_id)).await?)
            }
            _ => None,
        };

        if manager_changed {
            if let Some(previous_manager_id) = previous_manager_id {
                Self::unappoint(tx, previous_manager_id).await?;
            }
        }

        let updated = tx
            .update_department(&current.with_draft(draft, new_manager_id))
            .await
            .map_err(|err| Self::duplicate_manager_or(err, new_manager_id))?;

        if let Some(manager) = incoming {
            Self::appoint(tx, manager, updated.department_id).await?;
        }
        Ok(updated)
    }

    async fn release_in(
        tx: &mut dyn UnitOfWork,
        department_id: DepartmentId,
    ) -> Result<Department, AssignmentError> {
        let department = Self::load_department(tx, department_id).await?;
        let Some(manager_id) = department.manager_id else {
            return Ok(department);
        };

        Self::unappoint(tx, manager_id).await?;
        let released = tx
            .update_department(&Department {
                manager_id: None,
                ..department
            })
            .await?;
        Ok(released)
    }

    async fn delete_in(
        tx: &mut dyn UnitOfWork,
        department_id: DepartmentId,
    ) -> Result<Department, AssignmentError> {
        let released = Self::release_in(tx, department_id).await?;
        tx.remove_department(&released).await?;
        Ok(released)
    }

    async fn list_in(tx: &mut dyn UnitOfWork) -> Result<Vec<DepartmentView>, AssignmentError> {
        let departments = tx.list_departments().await?;
        let mut views = Vec::with_capacity(departments.len());
        for department in departments {
            views.push(Self::view_of(tx, department).await?);
        }
        Ok(views)
    }

    async fn details_in(
        tx: &mut dyn UnitOfWork,
        department_id: DepartmentId,
    ) -> Result<DepartmentView, AssignmentError> {
        let department = Self::load_department(tx, department_id).await?;
        Self::view_of(tx, department).await
    }

    async fn view_of(
        tx: &mut dyn UnitOfWork,
        department: Department,
    ) -> Result<DepartmentView, AssignmentError> {
        let manager = match department.manager_id {
            Some(manager_id) => tx.find_employee(manager_id).await?,
            None => None,
        };
        Ok(DepartmentView {
            manager: manager.as_ref().map(ManagerSummary::from),
            department,
        })
    }

    async fn load_department(
        tx: &mut dyn UnitOfWork,
        department_id: DepartmentId,
    ) -> Result<Department, AssignmentError> {
        tx.find_department(department_id)
            .await?
            .ok_or_else(|| AssignmentError::department_not_found(department_id))
    }

    /// Loads `manager_id` and checks it may manage `department_id`, which is
    /// `None` for a department that does not exist yet.
    async fn claimable_manager(
        tx: &mut dyn UnitOfWork,
        manager_id: EmployeeId,
        department_id: Option<DepartmentId>,
    ) -> Result<EligibleManager, AssignmentError> {
        let employee = tx
            .find_employee(manager_id)
            .await?
            .ok_or_else(|| AssignmentError::employee_not_found(manager_id))?;
        let manager = EligibleManager::try_from(employee)
            .map_err(|employee| AssignmentError::IneligibleManager(employee.employee_id))?;

        if let Some(held) = tx.department_managed_by(manager_id).await? {
            if Some(held.department_id) != department_id {
                return Err(AssignmentError::DuplicateManager { manager_id });
            }
        }
        Ok(manager)
    }

    async fn appoint(
        tx: &mut dyn UnitOfWork,
        manager: EligibleManager,
        department_id: DepartmentId,
    ) -> Result<Employee, AssignmentError> {
        let appointed = manager.appointed_to(department_id);
        Ok(tx.update_employee_assignment(&appointed).await?)
    }

    /// Clears the manager flag. The employee stays a member of the department.
    async fn unappoint(tx: &mut dyn UnitOfWork, manager_id: EmployeeId) -> Result<(), AssignmentError> {
        let employee = tx
            .find_employee(manager_id)
            .await?
            .ok_or_else(|| AssignmentError::employee_not_found(manager_id))?;
        if employee.is_department_manager {
            tx.update_employee_assignment(&Employee {
                is_department_manager: false,
                ..employee
            })
            .await?;
        }
        Ok(())
    }

    fn duplicate_manager_or(err: StoreError, manager_id: Option<EmployeeId>) -> AssignmentError {
        match (&err, manager_id) {
            (StoreError::UniqueViolation(constraint), Some(manager_id))
                if constraint == MANAGER_UNIQUE_CONSTRAINT =>
            {
                AssignmentError::DuplicateManager { manager_id }
            }
            _ => AssignmentError::from(err),
        }
    }

    /// Commits on success and rolls back on failure.
    async fn finish<T>(
        tx: Box<dyn UnitOfWork>,
        outcome: Result<T, AssignmentError>,
    ) -> Result<T, AssignmentError> {
        match outcome {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => match tx.rollback().await {
                Ok(()) => Err(err),
                Err(rollback_err) => {
                    log::error!("Rollback failed after '{}': {}", err, rollback_err);
                    Err(AssignmentError::Store(format!(
                        "rollback failed after '{err}': {rollback_err}"
                    )))
                }
            },
        }
    }

    /// A department that vanished underneath an operation is reported as not
    /// found; any other conflict is passed on for the caller to reload.
    async fn resolve_conflict(&self, department_id: DepartmentId, err: AssignmentError) -> AssignmentError {
        if !matches!(
            err,
            AssignmentError::ConcurrencyConflict {
                entity: Entity::Department,
                ..
            }
        ) {
            return err;
        }

        let exists = match self.store.begin().await {
            Ok(mut tx) => {
                let found = tx.find_department(department_id).await.map(|found| found.is_some());
                if let Err(rollback_err) = tx.rollback().await {
                    log::error!("Rollback of existence check failed: {}", rollback_err);
                }
                found
            }
            Err(store_err) => Err(store_err),
        };

        match exists {
            Ok(false) => AssignmentError::department_not_found(department_id),
            Ok(true) => err,
            Err(store_err) => {
                log::error!("Could not re-check department {}: {}", department_id, store_err);
                err
            }
        }
    }
}
