pub mod secrets;

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub listing: ListingConfig,
    pub processing: ProcessingConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub config_dir: PathBuf,
    /// Blob directory; `<config_dir>/data` when unset
    pub data_dir: Option<PathBuf>,
    /// Postgres URL; the in-memory store is used when unset
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub enable_cors: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    /// Default and maximum page size of list operations
    pub max_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Records processed at once by a fan-out run; unbounded when unset
    pub max_concurrency: Option<usize>,
    /// bcrypt work factor
    pub hash_cost: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub admin_password: Option<String>,
    #[serde(skip_serializing)]
    pub jwt_secret: Option<String>,
    pub token_expiry_hours: u64,
    pub require_admin_for_add_users: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("DITT_PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("DITT_CONFIG_DIR") {
            self.server.config_dir = PathBuf::from(v);
        }
        if let Ok(v) = env::var("DITT_DATA_DIR") {
            self.server.data_dir = Some(PathBuf::from(v));
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.server.database_url = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.server.max_connections = v.parse().unwrap_or(self.server.max_connections);
        }
        if let Ok(v) = env::var("SERVER_ENABLE_CORS") {
            self.server.enable_cors = v.parse().unwrap_or(self.server.enable_cors);
        }

        // Listing overrides
        if let Ok(v) = env::var("LIST_MAX_COUNT") {
            self.listing.max_count = v
                .parse()
                .ok()
                .filter(|n: &i64| *n > 0)
                .unwrap_or(self.listing.max_count);
        }

        // Processing overrides
        if let Ok(v) = env::var("PROCESSING_MAX_CONCURRENCY") {
            self.processing.max_concurrency = v.parse().ok().filter(|n: &usize| *n > 0);
        }
        if let Ok(v) = env::var("PROCESSING_HASH_COST") {
            self.processing.hash_cost = v.parse().unwrap_or(self.processing.hash_cost);
        }

        // Security overrides
        if let Ok(v) = env::var("DITT_ADMIN_PASSWORD") {
            self.security.admin_password = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env::var("SECURITY_TOKEN_EXPIRY_HOURS") {
            self.security.token_expiry_hours = v.parse().unwrap_or(self.security.token_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_REQUIRE_ADMIN_FOR_ADD_USERS") {
            self.security.require_admin_for_add_users =
                v.parse().unwrap_or(self.security.require_admin_for_add_users);
        }

        self
    }

    /// Directory where externalized blobs are written
    pub fn data_dir(&self) -> PathBuf {
        self.server
            .data_dir
            .clone()
            .unwrap_or_else(|| self.server.config_dir.join("data"))
    }

    fn default_config_dir() -> PathBuf {
        env::var("HOME")
            .map(|home| PathBuf::from(home).join(".config").join("ditt"))
            .unwrap_or_else(|_| PathBuf::from(".ditt"))
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 8080,
                config_dir: Self::default_config_dir(),
                data_dir: None,
                database_url: None,
                max_connections: 5,
                enable_cors: true,
            },
            listing: ListingConfig { max_count: 1 },
            processing: ProcessingConfig {
                max_concurrency: None,
                hash_cost: 12,
            },
            security: SecurityConfig {
                admin_password: None,
                jwt_secret: None,
                token_expiry_hours: 24 * 7, // 1 week
                require_admin_for_add_users: false,
            },
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                port: 8080,
                config_dir: Self::default_config_dir(),
                data_dir: None,
                database_url: None,
                max_connections: 10,
                enable_cors: true,
            },
            listing: ListingConfig { max_count: 1 },
            processing: ProcessingConfig {
                max_concurrency: Some(64),
                hash_cost: 12,
            },
            security: SecurityConfig {
                admin_password: None,
                jwt_secret: None,
                token_expiry_hours: 24,
                require_admin_for_add_users: false,
            },
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                port: 80,
                config_dir: Self::default_config_dir(),
                data_dir: None,
                database_url: None,
                max_connections: 20,
                enable_cors: false,
            },
            listing: ListingConfig { max_count: 1 },
            processing: ProcessingConfig {
                max_concurrency: Some(32),
                hash_cost: 12,
            },
            security: SecurityConfig {
                admin_password: None,
                jwt_secret: None,
                token_expiry_hours: 4,
                require_admin_for_add_users: false,
            },
        }
    }

    /// Minimal-cost configuration for tests: fast hashing, nothing on disk
    pub fn for_tests() -> Self {
        let mut config = Self::development();
        config.processing.hash_cost = 4;
        config.security.admin_password = Some("password".to_string());
        config.security.jwt_secret = Some("test-secret".to_string());
        config
    }
}
