use thiserror::Error;

use crate::models::employee::EmployeeId;
use crate::store::{Entity, StoreError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssignmentError {
    #[error("employee {manager_id} is already assigned to a department")]
    DuplicateManager { manager_id: EmployeeId },
    #[error("employee {0} does not have a role that can manage a department")]
    IneligibleManager(EmployeeId),
    #[error("{entity} {key} not found")]
    NotFound { entity: Entity, key: i32 },
    #[error("{entity} {key} was changed by another request; reload and try again")]
    ConcurrencyConflict { entity: Entity, key: i32 },
    #[error("edit session expired or unknown; reload the edit form")]
    EditSessionExpired,
    #[error("record store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("record store failure: {0}")]
    Store(String),
}

impl AssignmentError {
    pub fn department_not_found(key: i32) -> Self {
        AssignmentError::NotFound {
            entity: Entity::Department,
            key,
        }
    }

    pub fn employee_not_found(key: EmployeeId) -> Self {
        AssignmentError::NotFound {
            entity: Entity::Employee,
            key,
        }
    }

    /// Whether a stored edit session can no longer be used after this error.
    pub fn invalidates_edit_session(&self) -> bool {
        matches!(
            self,
            AssignmentError::ConcurrencyConflict { .. }
                | AssignmentError::NotFound {
                    entity: Entity::Department,
                    ..
                }
        )
    }
}

impl From<StoreError> for AssignmentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ConcurrencyConflict { entity, key } => {
                AssignmentError::ConcurrencyConflict { entity, key }
            }
            StoreError::Unavailable(msg) => AssignmentError::StoreUnavailable(msg),
            StoreError::UniqueViolation(constraint) => {
                AssignmentError::Store(format!("unique constraint {constraint} violated"))
            }
            StoreError::Database(msg) => AssignmentError::Store(msg),
        }
    }
}
