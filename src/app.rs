use std::sync::Arc;

use axum::http::Method;
use axum::routing::{delete, get, post, put};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::errors::AppError;
use crate::events::{init_event_bus, BusNotifier, Notifier};
use crate::jwt::JwtConfig;
use crate::routes::{auth, comments, employees, groups, health, notifications, posts, requests};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt: JwtConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            pool,
            jwt: Arc::new(jwt),
            notifier,
        }
    }
}

pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let (bus, _rx) = init_event_bus();
    create_app_with_bus(pool, bus).await
}

/// Variant that accepts the notification bus, so tests can subscribe before
/// the app starts emitting.
pub async fn create_app_with_bus(
    pool: SqlitePool,
    bus: crate::events::EventBus,
) -> Result<Router, AppError> {
    let jwt_config = JwtConfig::from_env()?;
    let notifier: Arc<dyn Notifier> = Arc::new(BusNotifier::new(bus));
    let state = AppState::new(pool, jwt_config, notifier);

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me));

    let employee_routes = Router::new()
        .route("/", get(employees::list_employees))
        .route("/:id", get(employees::get_employee))
        .route("/:id", put(employees::update_profile))
        .route("/:id/status", put(employees::update_status))
        .route("/:id/department", put(employees::transfer_department));

    let post_routes = Router::new()
        .route("/", get(posts::list_posts))
        .route("/", post(posts::create_post))
        .route("/:id", get(posts::get_post))
        .route("/:id", put(posts::update_post))
        .route("/:id", delete(posts::delete_post))
        .route("/:id/comments", get(comments::list_comments))
        .route("/:id/comments", post(comments::create_comment))
        .route("/:id/comments/:comment_id", put(comments::update_comment))
        .route("/:id/comments/:comment_id", delete(comments::delete_comment));

    let request_routes = Router::new()
        .route("/", get(requests::list_requests))
        .route("/", post(requests::submit_request))
        .route("/:id", get(requests::get_request))
        .route("/:id", delete(requests::withdraw_request))
        .route("/:id/approve", post(requests::approve_request))
        .route("/:id/reject", post(requests::reject_request));

    let group_routes = Router::new()
        .route("/", get(groups::list_my_groups))
        .route("/", post(groups::create_custom_group))
        .route("/department", post(groups::ensure_department_group))
        .route("/department/sync", post(groups::sync_department_membership))
        .route("/:id", get(groups::get_group))
        .route("/:id", put(groups::update_group))
        .route("/:id", delete(groups::delete_group))
        .route("/:id/members", post(groups::add_member))
        .route("/:id/members/:emp_id", delete(groups::remove_member));

    let router = Router::new()
        .route("/api/health", get(health::health))
        .nest("/auth", auth_routes)
        .nest("/employees", employee_routes)
        .nest("/posts", post_routes)
        .nest("/requests", request_routes)
        .nest("/groups", group_routes)
        .route("/notifications", get(notifications::list_notifications))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(router)
}
