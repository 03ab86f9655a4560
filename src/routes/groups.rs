use std::collections::HashSet;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use sqlx::SqlitePool;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{self, Action, GroupTarget, Target};
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::membership;
use crate::models::group::{
    AddMemberRequest, CustomGroupCreateRequest, DbGroupChat, DbGroupMember,
    EnsureDepartmentGroupRequest, GroupChat, GroupMember, GroupMemberRole, GroupUpdateRequest,
    GroupWithMembers,
};
use crate::utils::{require_non_blank, utc_now};

const GROUP_COLUMNS: &str =
    "id, group_name, group_type, department, created_by, group_avatar, description, created_at";

#[derive(Debug, Serialize, ToSchema)]
pub struct SyncResponse {
    pub group_id: Uuid,
    pub enrolled: usize,
}

#[utoipa::path(
    post,
    path = "/groups",
    tag = "Groups",
    request_body = CustomGroupCreateRequest,
    responses((status = 201, description = "Custom group created", body = GroupWithMembers)),
    security(("bearerAuth" = []))
)]
pub async fn create_custom_group(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CustomGroupCreateRequest>,
) -> AppResult<(StatusCode, Json<GroupWithMembers>)> {
    let actor = super::load_actor(&state.pool, auth.emp_id).await?;
    require_non_blank(&payload.group_name, "group_name")?;

    let group_id = Uuid::new_v4();
    let now = utc_now();

    sqlx::query(
        "INSERT INTO group_chats (id, group_name, group_type, department, created_by, group_avatar, description, created_at) \
         VALUES (?, ?, 'custom', NULL, ?, ?, ?, ?)",
    )
    .bind(group_id)
    .bind(&payload.group_name)
    .bind(actor.id)
    .bind(&payload.group_avatar)
    .bind(&payload.description)
    .bind(now)
    .execute(&state.pool)
    .await?;

    let members = membership::initial_custom_members(group_id, actor.id, &payload.member_ids, now);
    for member in &members {
        insert_member(&state.pool, member).await?;
    }

    let group = fetch_group(&state.pool, group_id).await?;
    Ok((StatusCode::CREATED, Json(GroupWithMembers { group, members })))
}

#[utoipa::path(
    get,
    path = "/groups",
    tag = "Groups",
    responses((status = 200, description = "Groups the caller belongs to", body = [GroupChat])),
    security(("bearerAuth" = []))
)]
pub async fn list_my_groups(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<Vec<GroupChat>>> {
    let actor = super::load_actor(&state.pool, auth.emp_id).await?;

    let rows = sqlx::query_as::<_, DbGroupChat>(
        "SELECT g.* FROM group_chats g JOIN group_members m ON m.group_id = g.id \
         WHERE m.emp_id = ? ORDER BY g.created_at",
    )
    .bind(actor.id)
    .fetch_all(&state.pool)
    .await?;

    let groups = rows.into_iter().map(GroupChat::try_from).collect::<Result<_, _>>()?;
    Ok(Json(groups))
}

#[utoipa::path(
    get,
    path = "/groups/{id}",
    tag = "Groups",
    params(("id" = Uuid, Path, description = "Group id")),
    responses((status = 200, description = "Group with members", body = GroupWithMembers)),
    security(("bearerAuth" = []))
)]
pub async fn get_group(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth: AuthUser,
) -> AppResult<Json<GroupWithMembers>> {
    let actor = super::load_actor(&state.pool, auth.emp_id).await?;
    let group = fetch_group(&state.pool, id).await?;

    let actor_role = fetch_member_role(&state.pool, id, actor.id).await?;
    if actor_role.is_none() && !actor.role.is_managerial() {
        return Err(AppError::forbidden("not a member of this group"));
    }

    let members = fetch_members(&state.pool, id).await?;
    Ok(Json(GroupWithMembers { group, members }))
}

#[utoipa::path(
    put,
    path = "/groups/{id}",
    tag = "Groups",
    params(("id" = Uuid, Path, description = "Group id")),
    request_body = GroupUpdateRequest,
    responses(
        (status = 200, description = "Group updated", body = GroupChat),
        (status = 403, description = "Not allowed to edit this group")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_group(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth: AuthUser,
    Json(payload): Json<GroupUpdateRequest>,
) -> AppResult<Json<GroupChat>> {
    let actor = super::load_actor(&state.pool, auth.emp_id).await?;
    let group = fetch_group(&state.pool, id).await?;

    let policy_actor = authz::Actor::from_employee(&actor);
    let target = Target::Group(GroupTarget::new(&group));
    if !authz::check(&policy_actor, Action::Edit, &target).is_allow() {
        return Err(AppError::forbidden("not allowed to edit this group"));
    }

    let group_name = payload.group_name.unwrap_or(group.group_name);
    require_non_blank(&group_name, "group_name")?;
    let description = payload.description.or(group.description);
    let group_avatar = payload.group_avatar.or(group.group_avatar);

    sqlx::query("UPDATE group_chats SET group_name = ?, description = ?, group_avatar = ? WHERE id = ?")
        .bind(&group_name)
        .bind(&description)
        .bind(&group_avatar)
        .bind(id)
        .execute(&state.pool)
        .await?;

    let group = fetch_group(&state.pool, id).await?;
    Ok(Json(group))
}

#[utoipa::path(
    delete,
    path = "/groups/{id}",
    tag = "Groups",
    params(("id" = Uuid, Path, description = "Group id")),
    responses(
        (status = 204, description = "Group deleted"),
        (status = 403, description = "Department groups are never deletable; custom groups only by their creator")
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_group(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth: AuthUser,
) -> AppResult<StatusCode> {
    let actor = super::load_actor(&state.pool, auth.emp_id).await?;
    let group = fetch_group(&state.pool, id).await?;

    let policy_actor = authz::Actor::from_employee(&actor);
    let target = Target::Group(GroupTarget::new(&group));
    if !authz::check(&policy_actor, Action::Delete, &target).is_allow() {
        return Err(AppError::forbidden("not allowed to delete this group"));
    }

    sqlx::query("DELETE FROM group_members WHERE group_id = ?")
        .bind(id)
        .execute(&state.pool)
        .await?;
    sqlx::query("DELETE FROM group_chats WHERE id = ?")
        .bind(id)
        .execute(&state.pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/groups/department",
    tag = "Groups",
    request_body = EnsureDepartmentGroupRequest,
    responses((status = 200, description = "Department group (created or existing)", body = GroupChat)),
    security(("bearerAuth" = []))
)]
pub async fn ensure_department_group(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<EnsureDepartmentGroupRequest>,
) -> AppResult<Json<GroupChat>> {
    let actor = super::load_actor(&state.pool, auth.emp_id).await?;
    if !actor.role.is_managerial() {
        return Err(AppError::forbidden("only managers or admins manage department groups"));
    }
    require_non_blank(&payload.department, "department")?;

    let group = ensure_department_group_record(&state.pool, &payload.department).await?;
    Ok(Json(group))
}

#[utoipa::path(
    post,
    path = "/groups/department/sync",
    tag = "Groups",
    request_body = EnsureDepartmentGroupRequest,
    responses((status = 200, description = "Membership synced", body = SyncResponse)),
    security(("bearerAuth" = []))
)]
pub async fn sync_department_membership(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<EnsureDepartmentGroupRequest>,
) -> AppResult<Json<SyncResponse>> {
    let actor = super::load_actor(&state.pool, auth.emp_id).await?;
    if !actor.role.is_managerial() {
        return Err(AppError::forbidden("only managers or admins manage department groups"));
    }
    require_non_blank(&payload.department, "department")?;

    let group = ensure_department_group_record(&state.pool, &payload.department).await?;
    let enrolled = sync_department_members(&state.pool, &group).await?;

    Ok(Json(SyncResponse { group_id: group.id, enrolled }))
}

#[utoipa::path(
    post,
    path = "/groups/{id}/members",
    tag = "Groups",
    params(("id" = Uuid, Path, description = "Group id")),
    request_body = AddMemberRequest,
    responses(
        (status = 201, description = "Member added", body = GroupMember),
        (status = 403, description = "Not allowed to add members"),
        (status = 409, description = "Already a member")
    ),
    security(("bearerAuth" = []))
)]
pub async fn add_member(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth: AuthUser,
    Json(payload): Json<AddMemberRequest>,
) -> AppResult<(StatusCode, Json<GroupMember>)> {
    let actor = super::load_actor(&state.pool, auth.emp_id).await?;
    let group = fetch_group(&state.pool, id).await?;

    let policy_actor = authz::Actor::from_employee(&actor);
    let target = Target::Group(GroupTarget::new(&group).with_subject(payload.emp_id));
    if !authz::check(&policy_actor, Action::AddMember, &target).is_allow() {
        return Err(AppError::forbidden("not allowed to add members to this group"));
    }

    // The new member must be a real, still-employed account.
    super::load_employee(&state.pool, payload.emp_id).await?;

    if fetch_member_role(&state.pool, id, payload.emp_id).await?.is_some() {
        return Err(AppError::conflict("already a member of this group"));
    }

    let member = GroupMember {
        group_id: id,
        emp_id: payload.emp_id,
        role: GroupMemberRole::Member,
        joined_at: utc_now(),
    };
    insert_member(&state.pool, &member).await?;

    Ok((StatusCode::CREATED, Json(member)))
}

#[utoipa::path(
    delete,
    path = "/groups/{id}/members/{emp_id}",
    tag = "Groups",
    params(
        ("id" = Uuid, Path, description = "Group id"),
        ("emp_id" = Uuid, Path, description = "Member to remove")
    ),
    responses(
        (status = 204, description = "Member removed"),
        (status = 403, description = "Only group admins may remove others; department groups forbid leaving")
    ),
    security(("bearerAuth" = []))
)]
pub async fn remove_member(
    State(state): State<AppState>,
    Path((id, emp_id)): Path<(Uuid, Uuid)>,
    auth: AuthUser,
) -> AppResult<StatusCode> {
    let actor = super::load_actor(&state.pool, auth.emp_id).await?;
    let group = fetch_group(&state.pool, id).await?;
    let actor_role = fetch_member_role(&state.pool, id, actor.id).await?;

    let policy_actor = authz::Actor::from_employee(&actor);
    let target = Target::Group(
        GroupTarget::new(&group)
            .with_actor_role(actor_role)
            .with_subject(emp_id),
    );
    if !authz::check(&policy_actor, Action::RemoveMember, &target).is_allow() {
        return Err(AppError::forbidden("not allowed to remove this member"));
    }

    let result = sqlx::query("DELETE FROM group_members WHERE group_id = ? AND emp_id = ?")
        .bind(id)
        .bind(emp_id)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("not a member of this group"));
    }

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Shared helpers (also used by the employee transfer route)
// =============================================================================

/// Idempotent department-group lookup-or-create. The creator is the first
/// head-of-department found in the roster; a department without a head keeps
/// an unset creator.
pub(crate) async fn ensure_department_group_record(
    pool: &SqlitePool,
    department: &str,
) -> Result<GroupChat, AppError> {
    let existing = sqlx::query_as::<_, DbGroupChat>(&format!(
        "SELECT {GROUP_COLUMNS} FROM group_chats WHERE group_type = 'department' AND department = ?"
    ))
    .bind(department)
    .fetch_optional(pool)
    .await?;

    if let Some(row) = existing {
        return row.try_into();
    }

    let roster = super::employees::list_active_in_department(pool, department).await?;
    let created_by = membership::pick_department_head(&roster).map(|head| head.id);

    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO group_chats (id, group_name, group_type, department, created_by, created_at) \
         VALUES (?, ?, 'department', ?, ?, ?)",
    )
    .bind(id)
    .bind(department)
    .bind(department)
    .bind(created_by)
    .bind(utc_now())
    .execute(pool)
    .await?;

    fetch_group(pool, id).await
}

/// Upserts missing membership rows for a department group. Existing rows are
/// never re-graded; calling this twice with an unchanged roster adds nothing.
pub(crate) async fn sync_department_members(
    pool: &SqlitePool,
    group: &GroupChat,
) -> Result<usize, AppError> {
    let department = group
        .department
        .as_deref()
        .ok_or_else(|| AppError::internal("department group without department"))?;

    let roster = super::employees::list_active_in_department(pool, department).await?;
    let existing: HashSet<Uuid> =
        sqlx::query_scalar::<_, Uuid>("SELECT emp_id FROM group_members WHERE group_id = ?")
            .bind(group.id)
            .fetch_all(pool)
            .await?
            .into_iter()
            .collect();

    let plan = membership::plan_department_sync(group.id, &roster, &existing, utc_now());
    for member in &plan {
        insert_member(pool, member).await?;
    }

    Ok(plan.len())
}

async fn insert_member(pool: &SqlitePool, member: &GroupMember) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO group_members (group_id, emp_id, role, joined_at) VALUES (?, ?, ?, ?)",
    )
    .bind(member.group_id)
    .bind(member.emp_id)
    .bind(member.role.as_str())
    .bind(member.joined_at)
    .execute(pool)
    .await?;
    Ok(())
}

async fn fetch_group(pool: &SqlitePool, id: Uuid) -> Result<GroupChat, AppError> {
    let row = sqlx::query_as::<_, DbGroupChat>(&format!(
        "SELECT {GROUP_COLUMNS} FROM group_chats WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("group not found"))?;

    row.try_into()
}

async fn fetch_member_role(
    pool: &SqlitePool,
    group_id: Uuid,
    emp_id: Uuid,
) -> Result<Option<GroupMemberRole>, AppError> {
    let raw = sqlx::query_scalar::<_, String>(
        "SELECT role FROM group_members WHERE group_id = ? AND emp_id = ?",
    )
    .bind(group_id)
    .bind(emp_id)
    .fetch_optional(pool)
    .await?;

    match raw {
        Some(raw) => GroupMemberRole::parse(&raw)
            .map(Some)
            .ok_or_else(|| AppError::internal(format!("unknown member role: {raw}"))),
        None => Ok(None),
    }
}

async fn fetch_members(pool: &SqlitePool, group_id: Uuid) -> Result<Vec<GroupMember>, AppError> {
    let rows = sqlx::query_as::<_, DbGroupMember>(
        "SELECT group_id, emp_id, role, joined_at FROM group_members WHERE group_id = ? ORDER BY joined_at",
    )
    .bind(group_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(GroupMember::try_from).collect()
}
