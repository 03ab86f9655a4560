use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::employee::{
    AuthResponse, DbEmployee, Employee, LoginRequest, RegisterRequest,
};
use crate::routes::EMPLOYEE_COLUMNS;
use crate::utils::{hash_password, require_non_blank, utc_now, verify_password};

#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Employee registered", body = AuthResponse),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    require_non_blank(&payload.name, "name")?;
    require_non_blank(&payload.email, "email")?;
    ensure_email_available(&state.pool, &payload.email).await?;

    let password_hash = hash_password(&payload.password)?;
    let now = utc_now();
    let emp_id = Uuid::new_v4();

    sqlx::query(
        "INSERT INTO employees (id, name, email, password_hash, role, department, position, cap_bac, status, created_at, updated_at) \
         VALUES (?, ?, ?, ?, 'employee', ?, ?, NULL, 'active', ?, ?)",
    )
    .bind(emp_id)
    .bind(&payload.name)
    .bind(&payload.email)
    .bind(password_hash)
    .bind(&payload.department)
    .bind(&payload.position)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    let employee = super::load_employee(&state.pool, emp_id).await?;
    let token = state.jwt.encode(employee.id)?;

    Ok((StatusCode::CREATED, Json(AuthResponse { token, employee })))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let row = sqlx::query_as::<_, DbEmployee>(&format!(
        "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE email = ?"
    ))
    .bind(&payload.email)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::unauthorized("invalid credentials"))?;

    let password_ok = verify_password(&payload.password, &row.password_hash)?;
    if !password_ok {
        return Err(AppError::unauthorized("invalid credentials"));
    }

    let employee: Employee = row.try_into()?;
    if !matches!(
        employee.status,
        crate::models::employee::EmployeeStatus::Active
            | crate::models::employee::EmployeeStatus::OnLeave
    ) {
        return Err(AppError::unauthorized("account is resigned"));
    }

    let token = state.jwt.encode(employee.id)?;
    Ok(Json(AuthResponse { token, employee }))
}

#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "Auth",
    responses((status = 200, description = "Current employee", body = Employee)),
    security(("bearerAuth" = []))
)]
pub async fn me(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Employee>> {
    let employee = super::load_actor(&state.pool, auth.emp_id).await?;
    Ok(Json(employee))
}

async fn ensure_email_available(pool: &SqlitePool, email: &str) -> Result<(), AppError> {
    let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM employees WHERE email = ?")
        .bind(email)
        .fetch_one(pool)
        .await?;

    if existing > 0 {
        return Err(AppError::conflict("email already in use"));
    }
    Ok(())
}
