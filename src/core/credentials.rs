//! GitHub token storage.
//!
//! The token lives in `~/.homelab/github-config.json`, readable only by the
//! owner. `HOMELAB_GITHUB_TOKEN` takes precedence over the stored file.

use std::env;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::error::AppError;
use crate::core::paths;

pub const TOKEN_ENV_VAR: &str = "HOMELAB_GITHUB_TOKEN";

/// Persisted GitHub connection.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GitHubConfig {
    pub token: String,
    pub username: String,
    pub connected_at: DateTime<Utc>,
}

// Keeps the token out of `{:?}` output.
impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("token", &"****")
            .field("username", &self.username)
            .field("connected_at", &self.connected_at)
            .finish()
    }
}

impl GitHubConfig {
    pub fn new(token: &str, username: &str) -> Self {
        Self {
            token: token.trim().to_string(),
            username: username.to_string(),
            connected_at: Utc::now(),
        }
    }

    /// Loads the stored connection. Missing file means not connected.
    pub fn load() -> Result<Option<Self>, AppError> {
        Self::load_from(&paths::github_config_file()?)
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, AppError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read GitHub config: {}", e)))?;
        let config = serde_json::from_str(&content)
            .map_err(|e| AppError::Config(format!("Invalid GitHub config: {}", e)))?;
        Ok(Some(config))
    }

    pub fn save(&self) -> Result<(), AppError> {
        self.save_to(&paths::github_config_file()?)
    }

    /// Writes the file with mode 600 on Unix.
    pub fn save_to(&self, path: &Path) -> Result<(), AppError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options
            .open(path)
            .map_err(|e| AppError::Config(format!("Failed to create GitHub config: {}", e)))?;
        file.write_all(content.as_bytes())
            .map_err(|e| AppError::Config(format!("Failed to write GitHub config: {}", e)))?;
        Ok(())
    }

    /// Removes the stored connection. Returns false if there was none.
    pub fn delete() -> Result<bool, AppError> {
        Self::delete_at(&paths::github_config_file()?)
    }

    pub fn delete_at(path: &Path) -> Result<bool, AppError> {
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(path)?;
        Ok(true)
    }
}

/// Where the active token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Environment,
    ConfigFile,
}

/// Returns the token to use: environment first, then the stored file.
pub fn resolve_token() -> Result<Option<(String, TokenSource)>, AppError> {
    resolve_token_from(env::var(TOKEN_ENV_VAR).ok(), &paths::github_config_file()?)
}

pub fn resolve_token_from(
    env_token: Option<String>,
    path: &Path,
) -> Result<Option<(String, TokenSource)>, AppError> {
    if let Some(token) = env_token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) {
        return Ok(Some((token, TokenSource::Environment)));
    }
    Ok(GitHubConfig::load_from(path)?.map(|c| (c.token, TokenSource::ConfigFile)))
}

/// Like `resolve_token`, but a missing token is `GitHubNotConnected`.
pub fn require_token() -> Result<String, AppError> {
    resolve_token()?
        .map(|(token, _)| token)
        .ok_or(AppError::GitHubNotConnected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("github-config.json");
        let config = GitHubConfig::new(" ghp_abc123 ", "octocat");

        config.save_to(&path).unwrap();
        let loaded = GitHubConfig::load_from(&path).unwrap().unwrap();

        assert_eq!(loaded, config);
        assert_eq!(loaded.token, "ghp_abc123");

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"connectedAt\""));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("github-config.json");
        GitHubConfig::new("ghp_abc", "octocat").save_to(&path).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempdir().unwrap();
        assert!(GitHubConfig::load_from(&dir.path().join("nope.json"))
            .unwrap()
            .is_none());
        assert!(!GitHubConfig::delete_at(&dir.path().join("nope.json")).unwrap());
    }

    #[test]
    fn test_debug_hides_token() {
        let config = GitHubConfig::new("ghp_topsecret", "octocat");
        assert!(!format!("{:?}", config).contains("topsecret"));
    }

    #[test]
    fn test_env_token_takes_precedence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("github-config.json");
        GitHubConfig::new("ghp_file", "octocat").save_to(&path).unwrap();

        let (token, source) = resolve_token_from(Some("ghp_env".into()), &path)
            .unwrap()
            .unwrap();
        assert_eq!(token, "ghp_env");
        assert_eq!(source, TokenSource::Environment);

        let (token, source) = resolve_token_from(Some("  ".into()), &path).unwrap().unwrap();
        assert_eq!(token, "ghp_file");
        assert_eq!(source, TokenSource::ConfigFile);
    }
}
