use axum::{
    body::{Body, Bytes},
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use futures::TryStreamExt;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use tokio_util::io::StreamReader;

use super::AppState;
use crate::auth::{generate_jwt, Claims};
use crate::context::RequestContext;
use crate::data::record::{ListQuery, Record, RecordList};
use crate::error::ApiError;
use crate::handler::RecordStream;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub password: String,
}

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now(),
    }))
}

/// POST /login - exchange credentials for a session token
pub async fn login(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let request: LoginRequest = serde_json::from_slice(&body)?;
    state.api.login(&ctx, &request.login, &request.password).await?;

    let claims = Claims::new(request.login, state.token_expiry_hours);
    let token = generate_jwt(&claims, &state.jwt_secret).map_err(|e| {
        tracing::error!("Failed to issue session token: {}", e);
        ApiError::internal("failed to issue session token")
    })?;

    Ok(Json(json!({ "token": token })))
}

/// POST /add/users - body is a JSON array of records, read as it arrives
pub async fn add_users(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    body: Body,
) -> Result<StatusCode, ApiError> {
    let stream = body
        .into_data_stream()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
    let input: RecordStream = Box::new(StreamReader::new(stream));

    state.api.add_users(&ctx, Some(input)).await?;
    Ok(StatusCode::CREATED)
}

/// DELETE /delete/user/:id
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.api.delete_user(&ctx, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /user/:id
pub async fn get_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<Json<Record>, ApiError> {
    let record = state.api.get_user(&ctx, &id).await?;
    Ok(Json(record))
}

/// PATCH /user/:id - body is the full record
pub async fn update_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    body: String,
) -> Result<StatusCode, ApiError> {
    state.api.update_user(&ctx, &id, &body).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /users/list?offset=&count=
pub async fn list_users(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<RecordList>, ApiError> {
    let query = ListQuery::new(
        query_number(&params, "offset")?,
        query_number(&params, "count")?,
    );
    let list = state.api.get_user_list(&ctx, query).await?;
    Ok(Json(list))
}

/// Missing or empty parameters read as zero
fn query_number(params: &HashMap<String, String>, name: &str) -> Result<i64, ApiError> {
    match params.get(name).map(|v| v.trim()) {
        None | Some("") => Ok(0),
        Some(value) => value
            .parse()
            .map_err(|_| ApiError::bad_input(format!("{} must be a number", name))),
    }
}
