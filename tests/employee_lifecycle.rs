use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::tempdir;
use tower::util::ServiceExt;
use uuid::Uuid;
use workhub::create_app;

async fn setup(db_name: &str) -> Result<(Router, SqlitePool, tempfile::TempDir)> {
    let dir = tempdir().context("failed to create tempdir")?;
    let db_path = dir.path().join(db_name);
    let opts = SqliteConnectOptions::new()
        .filename(db_path.as_path())
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator = sqlx::migrate::Migrator::new(
        std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations"),
    )
    .await?;
    migrator.run(&pool).await?;

    std::env::set_var("JWT_SECRET", "test-secret");
    let app = create_app(pool.clone()).await?;
    Ok((app, pool, dir))
}

async fn body_json(resp: Response) -> Result<Value> {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

async fn register(app: &Router, name: &str, email: &str, department: &str) -> Result<(String, Uuid)> {
    let req = Request::builder()
        .method("POST")
        .uri("/auth/register")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "name": name,
                "email": email,
                "password": "password123",
                "department": department
            })
            .to_string(),
        ))?;
    let resp = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let json = body_json(resp).await?;
    let token = json["token"].as_str().unwrap().to_string();
    let id = Uuid::parse_str(json["employee"]["id"].as_str().unwrap())?;
    Ok((token, id))
}

fn authed(method: &str, uri: &str, token: &str, body: Option<Value>) -> Result<Request<Body>> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"));
    Ok(match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))?,
        None => builder.body(Body::empty())?,
    })
}

#[tokio::test]
async fn resignation_keeps_the_row_but_blocks_acting() -> Result<()> {
    let (app, pool, _dir) = setup("test_emp_resign.db").await?;

    let (emp_token, emp_id) = register(&app, "Leaver", "leaver@example.com", "Sales").await?;
    let (admin_token, admin_id) = register(&app, "Admin", "admin@example.com", "Sales").await?;
    sqlx::query("UPDATE employees SET role = 'admin' WHERE id = ?")
        .bind(admin_id)
        .execute(&pool)
        .await?;

    // Only admins may change employment status.
    let req = authed(
        "PUT",
        &format!("/employees/{admin_id}/status"),
        &emp_token,
        Some(json!({"status": "resigned"})),
    )?;
    let resp = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = authed(
        "PUT",
        &format!("/employees/{emp_id}/status"),
        &admin_token,
        Some(json!({"status": "resigned"})),
    )?;
    let resp = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await?;
    assert_eq!(json["status"], "resigned");

    // The row still exists, but the old token no longer acts.
    let req = authed("GET", "/auth/me", &emp_token, None)?;
    let resp = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM employees WHERE id = ?")
        .bind(emp_id)
        .fetch_one(&pool)
        .await?;
    assert_eq!(count, 1);

    Ok(())
}

#[tokio::test]
async fn department_transfer_syncs_the_target_group() -> Result<()> {
    let (app, pool, _dir) = setup("test_emp_transfer.db").await?;

    let (_, emp_id) = register(&app, "Mover", "mover@example.com", "Sales").await?;
    let (admin_token, admin_id) = register(&app, "Admin", "admin@example.com", "Sales").await?;
    sqlx::query("UPDATE employees SET role = 'admin' WHERE id = ?")
        .bind(admin_id)
        .execute(&pool)
        .await?;

    let req = authed(
        "PUT",
        &format!("/employees/{emp_id}/department"),
        &admin_token,
        Some(json!({"department": "Engineering"})),
    )?;
    let resp = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await?;
    assert_eq!(json["department"], "Engineering");

    // The transfer auto-created the Engineering group and enrolled the mover.
    let role = sqlx::query_scalar::<_, String>(
        "SELECT m.role FROM group_members m \
         JOIN group_chats g ON g.id = m.group_id \
         WHERE g.group_type = 'department' AND g.department = 'Engineering' AND m.emp_id = ?",
    )
    .bind(emp_id)
    .fetch_one(&pool)
    .await?;
    assert_eq!(role, "member");

    Ok(())
}

#[tokio::test]
async fn profile_updates_are_self_or_admin_only() -> Result<()> {
    let (app, pool, _dir) = setup("test_emp_profile.db").await?;

    let (emp_token, emp_id) = register(&app, "Worker", "worker@example.com", "Sales").await?;
    let (other_token, _) = register(&app, "Other", "other@example.com", "Sales").await?;
    let (admin_token, admin_id) = register(&app, "Admin", "admin@example.com", "Sales").await?;
    sqlx::query("UPDATE employees SET role = 'admin' WHERE id = ?")
        .bind(admin_id)
        .execute(&pool)
        .await?;

    let req = authed(
        "PUT",
        &format!("/employees/{emp_id}"),
        &other_token,
        Some(json!({"position": "Sneaky"})),
    )?;
    let resp = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = authed(
        "PUT",
        &format!("/employees/{emp_id}"),
        &emp_token,
        Some(json!({"position": "Senior sales rep"})),
    )?;
    let resp = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = authed(
        "PUT",
        &format!("/employees/{emp_id}"),
        &admin_token,
        Some(json!({"cap_bac": "A1"})),
    )?;
    let resp = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await?;
    assert_eq!(json["cap_bac"], "A1");
    assert_eq!(json["position"], "Senior sales rep");

    Ok(())
}
