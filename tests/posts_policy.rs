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

async fn register(
    app: &Router,
    name: &str,
    email: &str,
    position: Option<&str>,
) -> Result<(String, Uuid)> {
    let req = Request::builder()
        .method("POST")
        .uri("/auth/register")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "name": name,
                "email": email,
                "password": "password123",
                "department": "Sales",
                "position": position
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

async fn create_post(app: &Router, token: &str) -> Result<String> {
    let req = authed(
        "POST",
        "/posts",
        token,
        Some(json!({"title": "Team update", "content": "Hello all"})),
    )?;
    let resp = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let json = body_json(resp).await?;
    Ok(json["id"].as_str().unwrap().to_string())
}

async fn create_comment(app: &Router, token: &str, post_id: &str) -> Result<String> {
    let req = authed(
        "POST",
        &format!("/posts/{post_id}/comments"),
        token,
        Some(json!({"content": "Nice one"})),
    )?;
    let resp = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let json = body_json(resp).await?;
    Ok(json["id"].as_str().unwrap().to_string())
}

#[tokio::test]
async fn managers_override_posts_but_not_comment_edits() -> Result<()> {
    let (app, pool, _dir) = setup("test_posts_mgr.db").await?;

    let (author_token, _) = register(&app, "Author", "author@example.com", None).await?;
    let (mgr_token, mgr_id) = register(&app, "Mgr", "mgr@example.com", None).await?;
    sqlx::query("UPDATE employees SET role = 'manager' WHERE id = ?")
        .bind(mgr_id)
        .execute(&pool)
        .await?;

    let post_id = create_post(&app, &author_token).await?;
    let comment_id = create_comment(&app, &author_token, &post_id).await?;

    // A manager may edit someone else's post...
    let req = authed(
        "PUT",
        &format!("/posts/{post_id}"),
        &mgr_token,
        Some(json!({"title": "Team update (edited)"})),
    )?;
    let resp = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);

    // ...but never someone else's comment.
    let req = authed(
        "PUT",
        &format!("/posts/{post_id}/comments/{comment_id}"),
        &mgr_token,
        Some(json!({"content": "reworded"})),
    )?;
    let resp = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // And a manager role alone does not allow deleting the comment either.
    let req = authed(
        "DELETE",
        &format!("/posts/{post_id}/comments/{comment_id}"),
        &mgr_token,
        None,
    )?;
    let resp = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    Ok(())
}

#[tokio::test]
async fn department_head_may_delete_comments() -> Result<()> {
    let (app, _pool, _dir) = setup("test_posts_head.db").await?;

    let (author_token, _) = register(&app, "Author", "author@example.com", None).await?;
    let (head_token, _) = register(&app, "Head", "head@example.com", Some("Trưởng phòng")).await?;

    let post_id = create_post(&app, &author_token).await?;
    let comment_id = create_comment(&app, &author_token, &post_id).await?;

    let req = authed(
        "DELETE",
        &format!("/posts/{post_id}/comments/{comment_id}"),
        &head_token,
        None,
    )?;
    let resp = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    // Deleted comments disappear from the listing.
    let req = authed("GET", &format!("/posts/{post_id}/comments"), &author_token, None)?;
    let resp = app.clone().oneshot(req).await?;
    let json = body_json(resp).await?;
    assert!(json.as_array().unwrap().is_empty());

    Ok(())
}

#[tokio::test]
async fn cap_bac_a1_grants_post_deletion() -> Result<()> {
    let (app, pool, _dir) = setup("test_posts_capbac.db").await?;

    let (author_token, _) = register(&app, "Author", "author@example.com", None).await?;
    let (elev_token, elev_id) = register(&app, "Elevated", "elev@example.com", None).await?;

    let post_id = create_post(&app, &author_token).await?;

    // Without the rank, the colleague is denied.
    let req = authed("DELETE", &format!("/posts/{post_id}"), &elev_token, None)?;
    let resp = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    sqlx::query("UPDATE employees SET cap_bac = 'A1' WHERE id = ?")
        .bind(elev_id)
        .execute(&pool)
        .await?;

    let req = authed("DELETE", &format!("/posts/{post_id}"), &elev_token, None)?;
    let resp = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    Ok(())
}

#[tokio::test]
async fn drafts_are_visible_only_to_author_and_managers() -> Result<()> {
    let (app, pool, _dir) = setup("test_posts_draft.db").await?;

    let (author_token, _) = register(&app, "Author", "author@example.com", None).await?;
    let (other_token, _) = register(&app, "Other", "other@example.com", None).await?;
    let (mgr_token, mgr_id) = register(&app, "Mgr", "mgr@example.com", None).await?;
    sqlx::query("UPDATE employees SET role = 'manager' WHERE id = ?")
        .bind(mgr_id)
        .execute(&pool)
        .await?;

    let req = authed(
        "POST",
        "/posts",
        &author_token,
        Some(json!({"title": "WIP", "content": "draft body", "status": "draft"})),
    )?;
    let resp = app.clone().oneshot(req).await?;
    let json = body_json(resp).await?;
    let post_id = json["id"].as_str().unwrap().to_string();

    let req = authed("GET", &format!("/posts/{post_id}"), &other_token, None)?;
    let resp = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = authed("GET", &format!("/posts/{post_id}"), &author_token, None)?;
    let resp = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = authed("GET", &format!("/posts/{post_id}"), &mgr_token, None)?;
    let resp = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);

    Ok(())
}
