mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::ADMIN_PASSWORD;

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/health", server.base_url))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = res.json::<Value>().await?;
    assert_eq!(body["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn bulk_add_then_read_as_admin() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/add/users", server.base_url))
        .body(r#"[{"id":"smoke-thor","password":"mjolnir","data":"thunder"}]"#)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .post(format!("{}/login", server.base_url))
        .json(&json!({ "login": "admin", "password": ADMIN_PASSWORD }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let token = res.json::<Value>().await?["token"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    assert!(!token.is_empty());

    let res = client
        .get(format!("{}/user/smoke-thor", server.base_url))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let record = res.json::<Value>().await?;
    assert_eq!(record["data"], "thunder");
    assert_ne!(record["password"], "mjolnir");
    Ok(())
}

#[tokio::test]
async fn anonymous_read_is_forbidden() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/user/anyone", server.base_url))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    Ok(())
}
