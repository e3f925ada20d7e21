// Secrets kept as files in the configuration directory

use std::io;
use std::path::Path;
use uuid::Uuid;

use super::AppConfig;

pub const ADMIN_AUTH_FILE: &str = "admin-auth";
pub const SESSION_KEY_FILE: &str = "session-key";

/// Read the secret stored at `path`, writing a fresh random one first when the
/// file does not exist yet. Surrounding whitespace is ignored.
pub async fn load_or_create(path: &Path) -> io::Result<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) if !content.trim().is_empty() => return Ok(content.trim().to_string()),
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let secret = Uuid::new_v4().simple().to_string();
    tokio::fs::write(path, &secret).await?;
    tracing::info!("Generated new secret at {}", path.display());
    Ok(secret)
}

impl AppConfig {
    /// Fill the admin password and session key from the config directory
    /// when the environment did not provide them.
    pub async fn resolve_secrets(mut self) -> io::Result<Self> {
        let config_dir = self.server.config_dir.clone();

        if self.security.admin_password.is_none() {
            let password = load_or_create(&config_dir.join(ADMIN_AUTH_FILE)).await?;
            self.security.admin_password = Some(password);
        }
        if self.security.jwt_secret.is_none() {
            let secret = load_or_create(&config_dir.join(SESSION_KEY_FILE)).await?;
            self.security.jwt_secret = Some(secret);
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_secret_is_generated_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(ADMIN_AUTH_FILE);

        let first = load_or_create(&path).await.unwrap();
        let second = load_or_create(&path).await.unwrap();
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_existing_secret_is_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SESSION_KEY_FILE);
        std::fs::write(&path, "  s3cret\n").unwrap();

        assert_eq!(load_or_create(&path).await.unwrap(), "s3cret");
    }

    #[tokio::test]
    async fn test_resolve_keeps_env_values() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::development();
        config.server.config_dir = dir.path().to_path_buf();
        config.security.admin_password = Some("from-env".into());

        let config = config.resolve_secrets().await.unwrap();
        assert_eq!(config.security.admin_password.as_deref(), Some("from-env"));
        assert!(config.security.jwt_secret.is_some());
        assert!(!dir.path().join(ADMIN_AUTH_FILE).exists());
    }
}
