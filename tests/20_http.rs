mod common;

use anyhow::Result;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{app, test_config, ADMIN_PASSWORD};

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<String>,
) -> Result<(StatusCode, Value)> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = builder.body(body.map(Body::from).unwrap_or_else(Body::empty))?;

    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, value))
}

async fn login(app: &Router, user: &str, password: &str) -> Result<String> {
    let body = json!({ "login": user, "password": password }).to_string();
    let (status, value) = send(app, Method::POST, "/login", None, Some(body)).await?;
    assert_eq!(status, StatusCode::OK, "login failed: {}", value);
    Ok(value["token"].as_str().unwrap_or_default().to_string())
}

async fn seed(app: &Router) -> Result<()> {
    let body = r#"[
        {"id":"loki","password":"loki-pass","data":"lorem ipsum"},
        {"id":"hulk","password":"hulk-pass"}
    ]"#;
    let (status, _) = send(app, Method::POST, "/add/users", None, Some(body.into())).await?;
    assert_eq!(status, StatusCode::CREATED);
    Ok(())
}

#[tokio::test]
async fn health_is_public() -> Result<()> {
    let (app, _) = app(&test_config());
    let (status, value) = send(&app, Method::GET, "/health", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn login_issues_token_for_own_record() -> Result<()> {
    let (app, _) = app(&test_config());
    seed(&app).await?;

    let token = login(&app, "loki", "loki-pass").await?;
    let (status, value) = send(&app, Method::GET, "/user/loki", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["id"], "loki");
    assert_eq!(value["data"], "lorem ipsum");

    let (status, value) = send(&app, Method::GET, "/user/hulk", Some(&token), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(value["error"], true);
    Ok(())
}

#[tokio::test]
async fn bad_credentials_and_bad_tokens() -> Result<()> {
    let (app, _) = app(&test_config());
    seed(&app).await?;

    let body = json!({ "login": "loki", "password": "nope" }).to_string();
    let (status, _) = send(&app, Method::POST, "/login", None, Some(body)).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::POST, "/login", None, Some("{}".into())).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::GET, "/user/loki", Some("garbage"), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, Method::GET, "/user/loki", None, None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn admin_lists_everything() -> Result<()> {
    let (app, _) = app(&test_config());
    seed(&app).await?;
    let token = login(&app, "admin", ADMIN_PASSWORD).await?;

    let (status, value) = send(
        &app,
        Method::GET,
        "/users/list?offset=0&count=10",
        Some(&token),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["offset"], 0);
    let ids: Vec<&str> = value["data"]
        .as_array()
        .map(|records| records.iter().filter_map(|r| r["id"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(ids, vec!["hulk", "loki"]);

    let (status, _) = send(
        &app,
        Method::GET,
        "/users/list?offset=zero",
        Some(&token),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn update_and_delete_own_record() -> Result<()> {
    let (app, _) = app(&test_config());
    seed(&app).await?;
    let token = login(&app, "hulk", "hulk-pass").await?;

    let body = r#"{"id":"hulk","password":"hulk-pass","data":"smash"}"#;
    let (status, _) = send(
        &app,
        Method::PATCH,
        "/user/hulk",
        Some(&token),
        Some(body.into()),
    )
    .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, value) = send(&app, Method::GET, "/user/hulk", Some(&token), None).await?;
    assert_eq!(value["data"], "smash");

    let (status, _) = send(&app, Method::DELETE, "/delete/user/hulk", Some(&token), None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::GET, "/user/hulk", Some(&token), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn malformed_bulk_input_is_rejected() -> Result<()> {
    let (app, _) = app(&test_config());
    let (status, value) = send(
        &app,
        Method::POST,
        "/add/users",
        None,
        Some(r#"[{"id":"loki""#.into()),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["code"], "BAD_INPUT");
    Ok(())
}
