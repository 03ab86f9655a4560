pub mod auth;
pub mod comments;
pub mod employees;
pub mod groups;
pub mod health;
pub mod notifications;
pub mod posts;
pub mod requests;

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::employee::{DbEmployee, Employee, EmployeeStatus};

pub(crate) const EMPLOYEE_COLUMNS: &str =
    "id, name, email, password_hash, role, department, position, cap_bac, status, created_at, updated_at";

pub(crate) async fn load_employee(pool: &SqlitePool, emp_id: Uuid) -> Result<Employee, AppError> {
    let row = sqlx::query_as::<_, DbEmployee>(&format!(
        "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?"
    ))
    .bind(emp_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("employee not found"))?;

    row.try_into()
}

/// Resolves the authenticated id to a full employee profile. Resigned
/// accounts keep their rows but may no longer act.
pub(crate) async fn load_actor(pool: &SqlitePool, emp_id: Uuid) -> Result<Employee, AppError> {
    let employee = load_employee(pool, emp_id)
        .await
        .map_err(|_| AppError::unauthorized("unknown account"))?;

    if employee.status == EmployeeStatus::Resigned {
        return Err(AppError::unauthorized("account is resigned"));
    }

    Ok(employee)
}
