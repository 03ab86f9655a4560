use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{self, Action, Target};
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::post::{
    Comment, CommentCreateRequest, CommentUpdateRequest, DbComment,
};
use crate::utils::{require_non_blank, utc_now};

const COMMENT_COLUMNS: &str = "id, post_id, author_id, content, status, created_at, updated_at";

#[utoipa::path(
    post,
    path = "/posts/{id}/comments",
    tag = "Comments",
    params(("id" = Uuid, Path, description = "Post id")),
    request_body = CommentCreateRequest,
    responses((status = 201, description = "Comment created", body = Comment)),
    security(("bearerAuth" = []))
)]
pub async fn create_comment(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    auth: AuthUser,
    Json(payload): Json<CommentCreateRequest>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    let actor = super::load_actor(&state.pool, auth.emp_id).await?;
    require_non_blank(&payload.content, "content")?;
    super::posts::fetch_post(&state.pool, post_id).await?;

    let id = Uuid::new_v4();
    let now = utc_now();

    sqlx::query(
        "INSERT INTO comments (id, post_id, author_id, content, status, created_at, updated_at) VALUES (?, ?, ?, ?, 'published', ?, ?)",
    )
    .bind(id)
    .bind(post_id)
    .bind(actor.id)
    .bind(&payload.content)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    let comment = fetch_comment(&state.pool, post_id, id).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

#[utoipa::path(
    get,
    path = "/posts/{id}/comments",
    tag = "Comments",
    params(("id" = Uuid, Path, description = "Post id")),
    responses((status = 200, description = "Published comments, oldest first", body = [Comment])),
    security(("bearerAuth" = []))
)]
pub async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    auth: AuthUser,
) -> AppResult<Json<Vec<Comment>>> {
    super::load_actor(&state.pool, auth.emp_id).await?;
    super::posts::fetch_post(&state.pool, post_id).await?;

    let rows = sqlx::query_as::<_, DbComment>(&format!(
        "SELECT {COMMENT_COLUMNS} FROM comments WHERE post_id = ? AND status = 'published' ORDER BY created_at"
    ))
    .bind(post_id)
    .fetch_all(&state.pool)
    .await?;

    let comments = rows.into_iter().map(Comment::try_from).collect::<Result<_, _>>()?;
    Ok(Json(comments))
}

#[utoipa::path(
    put,
    path = "/posts/{id}/comments/{comment_id}",
    tag = "Comments",
    params(
        ("id" = Uuid, Path, description = "Post id"),
        ("comment_id" = Uuid, Path, description = "Comment id")
    ),
    request_body = CommentUpdateRequest,
    responses(
        (status = 200, description = "Comment updated", body = Comment),
        (status = 403, description = "Only the author may edit a comment")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_comment(
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
    auth: AuthUser,
    Json(payload): Json<CommentUpdateRequest>,
) -> AppResult<Json<Comment>> {
    let actor = super::load_actor(&state.pool, auth.emp_id).await?;
    let comment = fetch_comment(&state.pool, post_id, comment_id).await?;

    let policy_actor = authz::Actor::from_employee(&actor);
    let target = Target::Comment { author_id: comment.author_id };
    if !authz::check(&policy_actor, Action::Edit, &target).is_allow() {
        return Err(AppError::forbidden("only the author may edit a comment"));
    }

    require_non_blank(&payload.content, "content")?;

    sqlx::query("UPDATE comments SET content = ?, updated_at = ? WHERE id = ?")
        .bind(&payload.content)
        .bind(utc_now())
        .bind(comment_id)
        .execute(&state.pool)
        .await?;

    let comment = fetch_comment(&state.pool, post_id, comment_id).await?;
    Ok(Json(comment))
}

#[utoipa::path(
    delete,
    path = "/posts/{id}/comments/{comment_id}",
    tag = "Comments",
    params(
        ("id" = Uuid, Path, description = "Post id"),
        ("comment_id" = Uuid, Path, description = "Comment id")
    ),
    responses(
        (status = 204, description = "Comment deleted"),
        (status = 403, description = "Not allowed to delete this comment")
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_comment(
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
    auth: AuthUser,
) -> AppResult<StatusCode> {
    let actor = super::load_actor(&state.pool, auth.emp_id).await?;
    let comment = fetch_comment(&state.pool, post_id, comment_id).await?;

    let policy_actor = authz::Actor::from_employee(&actor);
    let target = Target::Comment { author_id: comment.author_id };
    if !authz::check(&policy_actor, Action::Delete, &target).is_allow() {
        return Err(AppError::forbidden("not allowed to delete this comment"));
    }

    // Soft delete keeps the row for moderation history.
    sqlx::query("UPDATE comments SET status = 'deleted', updated_at = ? WHERE id = ?")
        .bind(utc_now())
        .bind(comment_id)
        .execute(&state.pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_comment(
    pool: &SqlitePool,
    post_id: Uuid,
    comment_id: Uuid,
) -> Result<Comment, AppError> {
    let row = sqlx::query_as::<_, DbComment>(&format!(
        "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ? AND post_id = ? AND status != 'deleted'"
    ))
    .bind(comment_id)
    .bind(post_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("comment not found"))?;

    row.try_into()
}
