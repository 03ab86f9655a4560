use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::errors::{AppError, AppResult};
use crate::events::RequestEvent;
use crate::jwt::AuthUser;
use crate::models::request::{ApprovalRequest, DbRequest, RejectRequest, SubmitRequest};
use crate::utils::utc_now;
use crate::workflow;

const REQUEST_COLUMNS: &str = "id, emp_id, request_type, title, content, attached_file, request_date, status, approved_by, approved_date, approver_role, rejection_reason";

#[derive(Debug, Deserialize)]
pub struct RequestListQuery {
    pub department: Option<String>,
}

#[utoipa::path(
    post,
    path = "/requests",
    tag = "Requests",
    request_body = SubmitRequest,
    responses(
        (status = 201, description = "Request submitted", body = ApprovalRequest),
        (status = 400, description = "Missing title or content")
    ),
    security(("bearerAuth" = []))
)]
pub async fn submit_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<SubmitRequest>,
) -> AppResult<(StatusCode, Json<ApprovalRequest>)> {
    let actor = super::load_actor(&state.pool, auth.emp_id).await?;
    let request = workflow::submit(actor.id, payload, utc_now())?;

    sqlx::query(
        "INSERT INTO requests (id, emp_id, request_type, title, content, attached_file, request_date, status) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(request.id)
    .bind(request.emp_id)
    .bind(&request.request_type)
    .bind(&request.title)
    .bind(&request.content)
    .bind(&request.attached_file)
    .bind(request.request_date)
    .bind(request.status.as_str())
    .execute(&state.pool)
    .await?;

    Ok((StatusCode::CREATED, Json(request)))
}

#[utoipa::path(
    get,
    path = "/requests",
    tag = "Requests",
    params(("department" = Option<String>, Query, description = "Department filter, managers/admins only")),
    responses((status = 200, description = "List requests", body = [ApprovalRequest])),
    security(("bearerAuth" = []))
)]
pub async fn list_requests(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<RequestListQuery>,
) -> AppResult<Json<Vec<ApprovalRequest>>> {
    let actor = super::load_actor(&state.pool, auth.emp_id).await?;

    let rows = match query.department {
        Some(department) => {
            if !actor.role.is_managerial() {
                return Err(AppError::forbidden(
                    "only managers or admins may browse department requests",
                ));
            }
            sqlx::query_as::<_, DbRequest>(
                "SELECT r.* FROM requests r JOIN employees e ON e.id = r.emp_id \
                 WHERE e.department = ? ORDER BY r.request_date DESC",
            )
            .bind(&department)
            .fetch_all(&state.pool)
            .await?
        }
        None if actor.role.is_managerial() => {
            sqlx::query_as::<_, DbRequest>(&format!(
                "SELECT {REQUEST_COLUMNS} FROM requests ORDER BY request_date DESC"
            ))
            .fetch_all(&state.pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, DbRequest>(&format!(
                "SELECT {REQUEST_COLUMNS} FROM requests WHERE emp_id = ? ORDER BY request_date DESC"
            ))
            .bind(actor.id)
            .fetch_all(&state.pool)
            .await?
        }
    };

    let requests = rows
        .into_iter()
        .map(ApprovalRequest::try_from)
        .collect::<Result<_, _>>()?;
    Ok(Json(requests))
}

#[utoipa::path(
    get,
    path = "/requests/{id}",
    tag = "Requests",
    params(("id" = Uuid, Path, description = "Request id")),
    responses((status = 200, description = "Request detail", body = ApprovalRequest)),
    security(("bearerAuth" = []))
)]
pub async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth: AuthUser,
) -> AppResult<Json<ApprovalRequest>> {
    let actor = super::load_actor(&state.pool, auth.emp_id).await?;
    let request = fetch_request(&state.pool, id).await?;

    if request.emp_id != actor.id && !actor.role.is_managerial() {
        return Err(AppError::forbidden("not allowed to view this request"));
    }

    Ok(Json(request))
}

#[utoipa::path(
    post,
    path = "/requests/{id}/approve",
    tag = "Requests",
    params(("id" = Uuid, Path, description = "Request id")),
    responses(
        (status = 200, description = "Request approved", body = ApprovalRequest),
        (status = 403, description = "Not an approver, or self-approval"),
        (status = 409, description = "Request already resolved")
    ),
    security(("bearerAuth" = []))
)]
pub async fn approve_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth: AuthUser,
) -> AppResult<Json<ApprovalRequest>> {
    let approver = super::load_actor(&state.pool, auth.emp_id).await?;
    let request = fetch_request(&state.pool, id).await?;

    let (updated, event) = workflow::approve(&request, &approver, utc_now())?;
    commit_decision(&state.pool, &updated).await?;
    deliver(&state, &event).await;

    Ok(Json(updated))
}

#[utoipa::path(
    post,
    path = "/requests/{id}/reject",
    tag = "Requests",
    params(("id" = Uuid, Path, description = "Request id")),
    request_body = RejectRequest,
    responses(
        (status = 200, description = "Request rejected", body = ApprovalRequest),
        (status = 400, description = "Missing rejection reason"),
        (status = 409, description = "Request already resolved")
    ),
    security(("bearerAuth" = []))
)]
pub async fn reject_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth: AuthUser,
    Json(payload): Json<RejectRequest>,
) -> AppResult<Json<ApprovalRequest>> {
    let approver = super::load_actor(&state.pool, auth.emp_id).await?;
    let request = fetch_request(&state.pool, id).await?;

    let (updated, event) =
        workflow::reject(&request, &approver, payload.rejection_reason, utc_now())?;
    commit_decision(&state.pool, &updated).await?;
    deliver(&state, &event).await;

    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/requests/{id}",
    tag = "Requests",
    params(("id" = Uuid, Path, description = "Request id")),
    responses(
        (status = 204, description = "Request withdrawn"),
        (status = 403, description = "Not the submitter, or already resolved")
    ),
    security(("bearerAuth" = []))
)]
pub async fn withdraw_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth: AuthUser,
) -> AppResult<StatusCode> {
    let actor = super::load_actor(&state.pool, auth.emp_id).await?;
    let request = fetch_request(&state.pool, id).await?;

    workflow::withdraw(&request, &actor)?;

    // Same compare-and-set as decisions: only a still-pending row goes away.
    // A concurrent decision re-triggers the same rule the policy enforces.
    let result = sqlx::query("DELETE FROM requests WHERE id = ? AND status = 'pending'")
        .bind(id)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::forbidden("request is no longer pending"));
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_request(pool: &SqlitePool, id: Uuid) -> Result<ApprovalRequest, AppError> {
    let row = sqlx::query_as::<_, DbRequest>(&format!(
        "SELECT {REQUEST_COLUMNS} FROM requests WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("request not found"))?;

    row.try_into()
}

/// Commits a resolved request. The `status = 'pending'` guard is the
/// optimistic check: when two approvers race, the second update matches no
/// row and surfaces `InvalidTransition`.
async fn commit_decision(pool: &SqlitePool, updated: &ApprovalRequest) -> Result<(), AppError> {
    let result = sqlx::query(
        "UPDATE requests SET status = ?, approved_by = ?, approved_date = ?, approver_role = ?, rejection_reason = ? \
         WHERE id = ? AND status = 'pending'",
    )
    .bind(updated.status.as_str())
    .bind(updated.approved_by)
    .bind(updated.approved_date)
    .bind(updated.approver_role.map(|role| role.as_str()))
    .bind(&updated.rejection_reason)
    .bind(updated.id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::invalid_transition("request was resolved concurrently"));
    }

    Ok(())
}

/// The decision is committed by the time this runs; a delivery problem must
/// not turn a persisted transition into an error response.
async fn deliver(state: &AppState, event: &RequestEvent) {
    if let Err(err) = super::notifications::record_notification(&state.pool, event).await {
        tracing::warn!(event = event.name(), %err, "failed to record notification");
    }
    if let Err(err) = state.notifier.notify(event).await {
        tracing::warn!(event = event.name(), %err, "failed to deliver notification");
    }
}
