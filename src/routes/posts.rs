use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{self, Action, Target};
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::post::{DbPost, Post, PostCreateRequest, PostStatus, PostUpdateRequest};
use crate::utils::{require_non_blank, utc_now};

const POST_COLUMNS: &str = "id, author_id, title, content, status, created_at, updated_at";

#[utoipa::path(
    post,
    path = "/posts",
    tag = "Posts",
    request_body = PostCreateRequest,
    responses((status = 201, description = "Post created", body = Post)),
    security(("bearerAuth" = []))
)]
pub async fn create_post(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<PostCreateRequest>,
) -> AppResult<(StatusCode, Json<Post>)> {
    let actor = super::load_actor(&state.pool, auth.emp_id).await?;
    require_non_blank(&payload.title, "title")?;
    require_non_blank(&payload.content, "content")?;

    let id = Uuid::new_v4();
    let now = utc_now();
    let status = payload.status.unwrap_or(PostStatus::Public);

    sqlx::query(
        "INSERT INTO posts (id, author_id, title, content, status, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(actor.id)
    .bind(&payload.title)
    .bind(&payload.content)
    .bind(status.as_str())
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    let post = fetch_post(&state.pool, id).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

#[utoipa::path(
    get,
    path = "/posts",
    tag = "Posts",
    responses((status = 200, description = "Public posts, newest first", body = [Post])),
    security(("bearerAuth" = []))
)]
pub async fn list_posts(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<Vec<Post>>> {
    let actor = super::load_actor(&state.pool, auth.emp_id).await?;

    // Everyone sees public posts plus their own drafts/hidden ones.
    let rows = sqlx::query_as::<_, DbPost>(&format!(
        "SELECT {POST_COLUMNS} FROM posts WHERE status = 'public' OR author_id = ? ORDER BY created_at DESC"
    ))
    .bind(actor.id)
    .fetch_all(&state.pool)
    .await?;

    let posts = rows.into_iter().map(Post::try_from).collect::<Result<_, _>>()?;
    Ok(Json(posts))
}

#[utoipa::path(
    get,
    path = "/posts/{id}",
    tag = "Posts",
    params(("id" = Uuid, Path, description = "Post id")),
    responses((status = 200, description = "Post detail", body = Post)),
    security(("bearerAuth" = []))
)]
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth: AuthUser,
) -> AppResult<Json<Post>> {
    let actor = super::load_actor(&state.pool, auth.emp_id).await?;
    let post = fetch_post(&state.pool, id).await?;

    if post.status != PostStatus::Public && post.author_id != actor.id && !actor.role.is_managerial()
    {
        return Err(AppError::not_found("post not found"));
    }

    Ok(Json(post))
}

#[utoipa::path(
    put,
    path = "/posts/{id}",
    tag = "Posts",
    params(("id" = Uuid, Path, description = "Post id")),
    request_body = PostUpdateRequest,
    responses(
        (status = 200, description = "Post updated", body = Post),
        (status = 403, description = "Not allowed to edit this post")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth: AuthUser,
    Json(payload): Json<PostUpdateRequest>,
) -> AppResult<Json<Post>> {
    let actor = super::load_actor(&state.pool, auth.emp_id).await?;
    let post = fetch_post(&state.pool, id).await?;

    let policy_actor = authz::Actor::from_employee(&actor);
    let target = Target::Post { author_id: post.author_id };
    if !authz::check(&policy_actor, Action::Edit, &target).is_allow() {
        return Err(AppError::forbidden("not allowed to edit this post"));
    }

    let title = payload.title.unwrap_or(post.title);
    require_non_blank(&title, "title")?;
    let content = payload.content.unwrap_or(post.content);
    require_non_blank(&content, "content")?;
    let status = payload.status.unwrap_or(post.status);

    sqlx::query("UPDATE posts SET title = ?, content = ?, status = ?, updated_at = ? WHERE id = ?")
        .bind(&title)
        .bind(&content)
        .bind(status.as_str())
        .bind(utc_now())
        .bind(id)
        .execute(&state.pool)
        .await?;

    let post = fetch_post(&state.pool, id).await?;
    Ok(Json(post))
}

#[utoipa::path(
    delete,
    path = "/posts/{id}",
    tag = "Posts",
    params(("id" = Uuid, Path, description = "Post id")),
    responses(
        (status = 204, description = "Post deleted"),
        (status = 403, description = "Not allowed to delete this post")
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth: AuthUser,
) -> AppResult<StatusCode> {
    let actor = super::load_actor(&state.pool, auth.emp_id).await?;
    let post = fetch_post(&state.pool, id).await?;

    let policy_actor = authz::Actor::from_employee(&actor);
    let target = Target::Post { author_id: post.author_id };
    if !authz::check(&policy_actor, Action::Delete, &target).is_allow() {
        return Err(AppError::forbidden("not allowed to delete this post"));
    }

    sqlx::query("DELETE FROM comments WHERE post_id = ?")
        .bind(id)
        .execute(&state.pool)
        .await?;
    sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(id)
        .execute(&state.pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn fetch_post(pool: &SqlitePool, id: Uuid) -> Result<Post, AppError> {
    let row = sqlx::query_as::<_, DbPost>(&format!(
        "SELECT {POST_COLUMNS} FROM posts WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("post not found"))?;

    row.try_into()
}
