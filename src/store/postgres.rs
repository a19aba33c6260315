use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::department::{Department, DepartmentDraft, DepartmentId};
use crate::models::employee::{Employee, EmployeeId, EmployeeRole};
use crate::store::{Entity, RecordStore, StoreError, UnitOfWork};

const DEPARTMENT_COLUMNS: &str =
    "department_id, name, description, establishment_date, manager_id, row_version";
const EMPLOYEE_COLUMNS: &str =
    "employee_id, name, surname, email, role, is_department_manager, department_id, row_version";

pub fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            Some("23505") => StoreError::UniqueViolation(
                db_err.constraint().unwrap_or_default().to_string(),
            ),
            // serialization_failure, deadlock_detected
            Some("40001") | Some("40P01") => StoreError::Unavailable(err.to_string()),
            _ => StoreError::Database(err.to_string()),
        },
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::WorkerCrashed => StoreError::Unavailable(err.to_string()),
        _ => StoreError::Database(err.to_string()),
    }
}

#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }
}

pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn find_department(&mut self, id: DepartmentId) -> Result<Option<Department>, StoreError> {
        let sql = format!("SELECT {DEPARTMENT_COLUMNS} FROM departments WHERE department_id = $1 FOR UPDATE");
        sqlx::query_as::<_, Department>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)
    }

    async fn list_departments(&mut self) -> Result<Vec<Department>, StoreError> {
        let sql = format!("SELECT {DEPARTMENT_COLUMNS} FROM departments ORDER BY department_id");
        sqlx::query_as::<_, Department>(&sql)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)
    }

    async fn department_managed_by(
        &mut self,
        manager_id: EmployeeId,
    ) -> Result<Option<Department>, StoreError> {
        let sql = format!("SELECT {DEPARTMENT_COLUMNS} FROM departments WHERE manager_id = $1");
        sqlx::query_as::<_, Department>(&sql)
            .bind(manager_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)
    }

    async fn find_employee(&mut self, id: EmployeeId) -> Result<Option<Employee>, StoreError> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE employee_id = $1");
        sqlx::query_as::<_, Employee>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)
    }

    async fn employees_with_role(&mut self, role: &EmployeeRole) -> Result<Vec<Employee>, StoreError> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE role = $1 ORDER BY employee_id");
        sqlx::query_as::<_, Employee>(&sql)
            .bind(role.as_str())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)
    }

    async fn insert_department(
        &mut self,
        draft: &DepartmentDraft,
        manager_id: Option<EmployeeId>,
    ) -> Result<Department, StoreError> {
        let sql = format!(
            "INSERT INTO departments (name, description, establishment_date, manager_id) \
             VALUES ($1, $2, $3, $4) RETURNING {DEPARTMENT_COLUMNS}"
        );
        sqlx::query_as::<_, Department>(&sql)
            .bind(&draft.name)
            .bind(&draft.description)
            .bind(draft.establishment_date)
            .bind(manager_id)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)
    }

    async fn update_department(&mut self, department: &Department) -> Result<Department, StoreError> {
        let sql = format!(
            "UPDATE departments SET name = $1, description = $2, establishment_date = $3, \
             manager_id = $4, row_version = row_version + 1 \
             WHERE department_id = $5 AND row_version = $6 RETURNING {DEPARTMENT_COLUMNS}"
        );
        sqlx::query_as::<_, Department>(&sql)
            .bind(&department.name)
            .bind(&department.description)
            .bind(department.establishment_date)
            .bind(department.manager_id)
            .bind(department.department_id)
            .bind(department.row_version)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?
            .ok_or(StoreError::ConcurrencyConflict {
                entity: Entity::Department,
                key: department.department_id,
            })
    }

    async fn remove_department(&mut self, department: &Department) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM departments WHERE department_id = $1 AND row_version = $2")
            .bind(department.department_id)
            .bind(department.row_version)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ConcurrencyConflict {
                entity: Entity::Department,
                key: department.department_id,
            });
        }
        Ok(())
    }

    async fn update_employee_assignment(&mut self, employee: &Employee) -> Result<Employee, StoreError> {
        let sql = format!(
            "UPDATE employees SET is_department_manager = $1, department_id = $2, \
             row_version = row_version + 1 \
             WHERE employee_id = $3 AND row_version = $4 RETURNING {EMPLOYEE_COLUMNS}"
        );
        sqlx::query_as::<_, Employee>(&sql)
            .bind(employee.is_department_manager)
            .bind(employee.department_id)
            .bind(employee.employee_id)
            .bind(employee.row_version)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?
            .ok_or(StoreError::ConcurrencyConflict {
                entity: Entity::Employee,
                key: employee.employee_id,
            })
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(map_sqlx_error)
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await.map_err(map_sqlx_error)
    }
}
