use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

use super::AppState;
use crate::auth::validate_jwt;
use crate::context::RequestContext;
use crate::error::ApiError;

/// Attach a [`RequestContext`] to every request. Requests without an
/// `Authorization` header run anonymously; a header carrying an invalid
/// token is refused outright.
pub async fn identity_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx = match bearer_token(request.headers())? {
        None => RequestContext::anonymous(),
        Some(token) => {
            let claims = validate_jwt(&token, &state.jwt_secret).map_err(|e| {
                tracing::debug!("Rejected session token: {}", e);
                ApiError::forbidden("invalid session token")
            })?;
            RequestContext::with_identity(claims.sub)
        }
    };

    request.extensions_mut().insert(ctx);
    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Result<Option<String>, ApiError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value
        .to_str()
        .map_err(|_| ApiError::forbidden("invalid Authorization header"))?;
    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(Some(token.trim().to_string())),
        _ => Err(ApiError::forbidden(
            "Authorization header must use Bearer token format",
        )),
    }
}
