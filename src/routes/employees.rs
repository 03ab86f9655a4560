use axum::extract::{Path, State};
use axum::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::employee::{
    DbEmployee, DepartmentTransferRequest, Employee, ProfileUpdateRequest, Role,
    StatusUpdateRequest,
};
use crate::routes::EMPLOYEE_COLUMNS;
use crate::utils::{require_non_blank, utc_now};

#[utoipa::path(
    get,
    path = "/employees",
    tag = "Employees",
    responses((status = 200, description = "List employees", body = [Employee])),
    security(("bearerAuth" = []))
)]
pub async fn list_employees(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<Vec<Employee>>> {
    let actor = super::load_actor(&state.pool, auth.emp_id).await?;
    if !actor.role.is_managerial() {
        return Err(AppError::forbidden("only managers or admins may list employees"));
    }

    let rows = sqlx::query_as::<_, DbEmployee>(&format!(
        "SELECT {EMPLOYEE_COLUMNS} FROM employees ORDER BY name"
    ))
    .fetch_all(&state.pool)
    .await?;

    let employees = rows.into_iter().map(Employee::try_from).collect::<Result<_, _>>()?;
    Ok(Json(employees))
}

#[utoipa::path(
    get,
    path = "/employees/{id}",
    tag = "Employees",
    params(("id" = Uuid, Path, description = "Employee id")),
    responses((status = 200, description = "Employee profile", body = Employee)),
    security(("bearerAuth" = []))
)]
pub async fn get_employee(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth: AuthUser,
) -> AppResult<Json<Employee>> {
    let actor = super::load_actor(&state.pool, auth.emp_id).await?;
    if actor.id != id && !actor.role.is_managerial() {
        return Err(AppError::forbidden("not allowed to view this profile"));
    }

    let employee = super::load_employee(&state.pool, id).await?;
    Ok(Json(employee))
}

#[utoipa::path(
    put,
    path = "/employees/{id}",
    tag = "Employees",
    params(("id" = Uuid, Path, description = "Employee id")),
    request_body = ProfileUpdateRequest,
    responses((status = 200, description = "Profile updated", body = Employee)),
    security(("bearerAuth" = []))
)]
pub async fn update_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth: AuthUser,
    Json(payload): Json<ProfileUpdateRequest>,
) -> AppResult<Json<Employee>> {
    let actor = super::load_actor(&state.pool, auth.emp_id).await?;
    if actor.id != id && actor.role != Role::Admin {
        return Err(AppError::forbidden("not allowed to edit this profile"));
    }

    let current = super::load_employee(&state.pool, id).await?;
    let name = payload.name.unwrap_or(current.name);
    require_non_blank(&name, "name")?;
    let position = payload.position.or(current.position);
    let cap_bac = payload.cap_bac.or(current.cap_bac);

    sqlx::query("UPDATE employees SET name = ?, position = ?, cap_bac = ?, updated_at = ? WHERE id = ?")
        .bind(&name)
        .bind(&position)
        .bind(&cap_bac)
        .bind(utc_now())
        .bind(id)
        .execute(&state.pool)
        .await?;

    let employee = super::load_employee(&state.pool, id).await?;
    Ok(Json(employee))
}

#[utoipa::path(
    put,
    path = "/employees/{id}/status",
    tag = "Employees",
    params(("id" = Uuid, Path, description = "Employee id")),
    request_body = StatusUpdateRequest,
    responses((status = 200, description = "Status updated", body = Employee)),
    security(("bearerAuth" = []))
)]
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth: AuthUser,
    Json(payload): Json<StatusUpdateRequest>,
) -> AppResult<Json<Employee>> {
    let actor = super::load_actor(&state.pool, auth.emp_id).await?;
    if actor.role != Role::Admin {
        return Err(AppError::forbidden("only admins may change employment status"));
    }

    // Make sure the target exists before touching it.
    super::load_employee(&state.pool, id).await?;

    sqlx::query("UPDATE employees SET status = ?, updated_at = ? WHERE id = ?")
        .bind(payload.status.as_str())
        .bind(utc_now())
        .bind(id)
        .execute(&state.pool)
        .await?;

    let employee = super::load_employee(&state.pool, id).await?;
    Ok(Json(employee))
}

#[utoipa::path(
    put,
    path = "/employees/{id}/department",
    tag = "Employees",
    params(("id" = Uuid, Path, description = "Employee id")),
    request_body = DepartmentTransferRequest,
    responses((status = 200, description = "Department changed", body = Employee)),
    security(("bearerAuth" = []))
)]
pub async fn transfer_department(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth: AuthUser,
    Json(payload): Json<DepartmentTransferRequest>,
) -> AppResult<Json<Employee>> {
    let actor = super::load_actor(&state.pool, auth.emp_id).await?;
    if actor.role != Role::Admin {
        return Err(AppError::forbidden("only admins may transfer departments"));
    }
    require_non_blank(&payload.department, "department")?;

    super::load_employee(&state.pool, id).await?;

    sqlx::query("UPDATE employees SET department = ?, updated_at = ? WHERE id = ?")
        .bind(&payload.department)
        .bind(utc_now())
        .bind(id)
        .execute(&state.pool)
        .await?;

    // A transfer is one of the explicit sync points for department groups.
    let group = super::groups::ensure_department_group_record(&state.pool, &payload.department).await?;
    super::groups::sync_department_members(&state.pool, &group).await?;

    let employee = super::load_employee(&state.pool, id).await?;
    Ok(Json(employee))
}

pub(crate) async fn list_active_in_department(
    pool: &SqlitePool,
    department: &str,
) -> Result<Vec<Employee>, AppError> {
    let rows = sqlx::query_as::<_, DbEmployee>(&format!(
        "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE department = ? AND status = 'active' ORDER BY created_at"
    ))
    .bind(department)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Employee::try_from).collect()
}
