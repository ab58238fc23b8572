//! Filesystem locations used by the console.
//!
//! Everything lives under `~/.homelab`. The home directory is taken from
//! `HOMELAB_HOME`, then `HOME`, then `USERPROFILE`, and finally whatever the
//! platform reports.

use std::env;
use std::path::PathBuf;

use crate::core::error::AppError;

/// Name of the per-user data directory.
pub const HOMELAB_DIR_NAME: &str = ".homelab";
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const GITHUB_CONFIG_FILE_NAME: &str = "github-config.json";

/// Resolves the user's home directory.
pub fn home_dir() -> Result<PathBuf, AppError> {
    for var in ["HOMELAB_HOME", "HOME", "USERPROFILE"] {
        if let Some(value) = env::var_os(var) {
            if !value.is_empty() {
                return Ok(PathBuf::from(value));
            }
        }
    }

    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .ok_or_else(|| AppError::Config("Could not determine the home directory".into()))
}

/// `~/.homelab`
pub fn homelab_dir() -> Result<PathBuf, AppError> {
    Ok(home_dir()?.join(HOMELAB_DIR_NAME))
}

/// `~/.homelab/config.json`
pub fn config_file() -> Result<PathBuf, AppError> {
    Ok(homelab_dir()?.join(CONFIG_FILE_NAME))
}

/// `~/.homelab/github-config.json`
pub fn github_config_file() -> Result<PathBuf, AppError> {
    Ok(homelab_dir()?.join(GITHUB_CONFIG_FILE_NAME))
}

/// `~/.homelab/repos`
pub fn repos_dir() -> Result<PathBuf, AppError> {
    Ok(homelab_dir()?.join("repos"))
}

/// `~/.homelab/vpn`
pub fn vpn_dir() -> Result<PathBuf, AppError> {
    Ok(homelab_dir()?.join("vpn"))
}

/// Certificate store, overridable with `HOMELAB_CERT_DIR`.
pub fn certificates_dir() -> Result<PathBuf, AppError> {
    if let Some(dir) = env::var_os("HOMELAB_CERT_DIR") {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    Ok(homelab_dir()?.join("certificates"))
}

/// Scratch directory for rendered templates (`TEMP`, then `TMPDIR`).
pub fn temp_dir() -> PathBuf {
    for var in ["TEMP", "TMPDIR"] {
        if let Some(value) = env::var_os(var) {
            if !value.is_empty() {
                return PathBuf::from(value).join("homelab");
            }
        }
    }
    env::temp_dir().join("homelab")
}
