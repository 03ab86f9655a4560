use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::app::AppState;
use crate::errors::{AppError, AppResult};
use crate::events::RequestEvent;
use crate::jwt::AuthUser;
use crate::utils::utc_now;

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct Notification {
    pub id: Uuid,
    pub emp_id: Uuid,
    pub event: String,
    #[schema(value_type = Object)]
    pub payload: String,
    pub created_at: DateTime<Utc>,
}

#[utoipa::path(
    get,
    path = "/notifications",
    tag = "Notifications",
    responses((status = 200, description = "Own notifications, newest first", body = [Notification])),
    security(("bearerAuth" = []))
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<Vec<Notification>>> {
    let actor = super::load_actor(&state.pool, auth.emp_id).await?;

    let rows = sqlx::query_as::<_, Notification>(
        "SELECT id, emp_id, event, payload, created_at FROM notifications WHERE emp_id = ? ORDER BY created_at DESC",
    )
    .bind(actor.id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(rows))
}

pub(crate) async fn record_notification(
    pool: &SqlitePool,
    event: &RequestEvent,
) -> Result<(), AppError> {
    let payload = serde_json::to_string(event)
        .map_err(|err| AppError::internal(format!("failed to serialize event: {err}")))?;

    sqlx::query(
        "INSERT INTO notifications (id, emp_id, event, payload, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4())
    .bind(event.recipient())
    .bind(event.name())
    .bind(payload)
    .bind(utc_now())
    .execute(pool)
    .await?;

    Ok(())
}
