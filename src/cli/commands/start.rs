use anyhow::Context;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::env::Services;
use crate::http::{router, AppState};

#[derive(Debug, Args)]
pub struct StartArgs {
    #[arg(long, help = "Port to listen on")]
    pub port: Option<u16>,

    #[arg(long, help = "Postgres connection URL (in-memory store when omitted)")]
    pub db_uri: Option<String>,

    #[arg(long, help = "Directory for externalized record data")]
    pub data_dir: Option<PathBuf>,
}

impl StartArgs {
    /// Flags win over the environment
    pub fn apply(&self, mut config: AppConfig) -> AppConfig {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(db_uri) = &self.db_uri {
            config.server.database_url = Some(db_uri.clone());
        }
        if let Some(data_dir) = &self.data_dir {
            config.server.data_dir = Some(data_dir.clone());
        }
        config
    }
}

pub async fn handle(args: StartArgs) -> anyhow::Result<()> {
    let config = args
        .apply(AppConfig::from_env())
        .resolve_secrets()
        .await
        .context("failed to load secrets")?;
    tracing::info!("Starting Ditt API in {:?} mode", config.environment);

    let services = Arc::new(Services::from_config(&config).await?);
    let state = AppState::from_services(services, &config)?;
    let app = router(state, config.server.enable_cors);

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Ditt API listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Ditt API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = StartArgs {
            port: Some(9999),
            db_uri: None,
            data_dir: Some(PathBuf::from("/srv/ditt")),
        };
        let config = args.apply(AppConfig::development());
        assert_eq!(config.server.port, 9999);
        assert!(config.server.database_url.is_none());
        assert_eq!(config.data_dir(), PathBuf::from("/srv/ditt"));
    }
}
