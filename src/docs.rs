use axum::Router;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::models;
use crate::routes;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::health::health,
        routes::auth::register,
        routes::auth::login,
        routes::auth::me,
        routes::employees::list_employees,
        routes::employees::get_employee,
        routes::employees::update_profile,
        routes::employees::update_status,
        routes::employees::transfer_department,
        routes::posts::create_post,
        routes::posts::list_posts,
        routes::posts::get_post,
        routes::posts::update_post,
        routes::posts::delete_post,
        routes::comments::create_comment,
        routes::comments::list_comments,
        routes::comments::update_comment,
        routes::comments::delete_comment,
        routes::requests::submit_request,
        routes::requests::list_requests,
        routes::requests::get_request,
        routes::requests::approve_request,
        routes::requests::reject_request,
        routes::requests::withdraw_request,
        routes::groups::create_custom_group,
        routes::groups::list_my_groups,
        routes::groups::get_group,
        routes::groups::update_group,
        routes::groups::delete_group,
        routes::groups::ensure_department_group,
        routes::groups::sync_department_membership,
        routes::groups::add_member,
        routes::groups::remove_member,
        routes::notifications::list_notifications
    ),
    components(
        schemas(
            models::employee::Employee,
            models::employee::Role,
            models::employee::EmployeeStatus,
            models::employee::AuthResponse,
            models::employee::LoginRequest,
            models::employee::RegisterRequest,
            models::employee::ProfileUpdateRequest,
            models::employee::StatusUpdateRequest,
            models::employee::DepartmentTransferRequest,
            models::post::Post,
            models::post::PostStatus,
            models::post::PostCreateRequest,
            models::post::PostUpdateRequest,
            models::post::Comment,
            models::post::CommentStatus,
            models::post::CommentCreateRequest,
            models::post::CommentUpdateRequest,
            models::request::ApprovalRequest,
            models::request::RequestStatus,
            models::request::SubmitRequest,
            models::request::RejectRequest,
            models::group::GroupChat,
            models::group::GroupType,
            models::group::GroupMember,
            models::group::GroupMemberRole,
            models::group::GroupWithMembers,
            models::group::CustomGroupCreateRequest,
            models::group::GroupUpdateRequest,
            models::group::EnsureDepartmentGroupRequest,
            models::group::AddMemberRequest,
            routes::groups::SyncResponse,
            routes::notifications::Notification,
            routes::health::HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Employees", description = "Employee directory and lifecycle"),
        (name = "Posts", description = "Forum posts"),
        (name = "Comments", description = "Post comments"),
        (name = "Requests", description = "Approval-gated requests"),
        (name = "Groups", description = "Department and custom chat groups"),
        (name = "Notifications", description = "Workflow notifications")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearerAuth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

pub fn swagger_routes() -> Router {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into()
}
