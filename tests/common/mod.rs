#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;

use ditt_api::config::AppConfig;
use ditt_api::handler::{build_api, RecordStream, UserApi};
use ditt_api::http::{router, AppState};
use ditt_api::Services;

pub const ADMIN_PASSWORD: &str = "password";

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
    _config_dir: tempfile::TempDir,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);
        let config_dir = tempfile::tempdir().context("failed to create config dir")?;

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_ditt-api"));
        cmd.args(["start", "--port", &port.to_string()])
            .env("DITT_CONFIG_DIR", config_dir.path())
            .env("DITT_ADMIN_PASSWORD", ADMIN_PASSWORD)
            .env("DATABASE_URL", "")
            .env("PROCESSING_HASH_COST", "4")
            .env("LIST_MAX_COUNT", "50")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self {
            port,
            base_url,
            child,
            _config_dir: config_dir,
        })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// Test configuration with a list maximum large enough for multi-record pages
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::for_tests();
    config.listing.max_count = 50;
    config
}

/// Full pipeline over in-memory collaborators
pub fn pipeline(config: &AppConfig) -> (Box<dyn UserApi>, Arc<Services>) {
    let services = Arc::new(Services::in_memory(config));
    (build_api(services.clone()), services)
}

/// Axum router over in-memory collaborators
pub fn app(config: &AppConfig) -> (axum::Router, Arc<Services>) {
    let services = Arc::new(Services::in_memory(config));
    let state = AppState::from_services(services.clone(), config).expect("test state");
    (router(state, false), services)
}

pub fn stream(input: &'static str) -> Option<RecordStream> {
    Some(Box::new(input.as_bytes()))
}
