// HTTP adapter over the user operations

pub mod handlers;
pub mod middleware;

use anyhow::anyhow;
use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::env::Services;
use crate::handler::{build_api, UserApi};

/// Shared state of every request handler
#[derive(Clone)]
pub struct AppState {
    pub api: Arc<dyn UserApi>,
    pub jwt_secret: Arc<str>,
    pub token_expiry_hours: u64,
}

impl AppState {
    pub fn new(api: Arc<dyn UserApi>, jwt_secret: &str, token_expiry_hours: u64) -> Self {
        Self {
            api,
            jwt_secret: Arc::from(jwt_secret),
            token_expiry_hours,
        }
    }

    /// Wire the full pipeline over `services`. The session key must already
    /// be resolved in `config`.
    pub fn from_services(services: Arc<Services>, config: &AppConfig) -> anyhow::Result<Self> {
        let jwt_secret = config
            .security
            .jwt_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("session key is not configured"))?;

        Ok(Self::new(
            Arc::from(build_api(services)),
            jwt_secret,
            config.security.token_expiry_hours,
        ))
    }
}

pub fn router(state: AppState, enable_cors: bool) -> Router {
    let app = Router::new()
        .route("/login", post(handlers::login))
        .route("/add/users", post(handlers::add_users))
        .route("/delete/user/:id", delete(handlers::delete_user))
        .route(
            "/user/:id",
            get(handlers::get_user).patch(handlers::update_user),
        )
        .route("/users/list", get(handlers::list_users))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::identity_middleware,
        ))
        // Outside the identity layer: liveness never looks at tokens
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if enable_cors {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}
