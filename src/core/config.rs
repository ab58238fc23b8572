use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::core::error::AppError;
use crate::core::logging::LogLevel;
use crate::core::paths;

pub const DEFAULT_ENV: &str = "dev";
pub const DEFAULT_LOC: &str = "we";
pub const DEFAULT_PROJECT: &str = "homelab";
pub const DEFAULT_LOCATION: &str = "westeurope";

const LOG_FILE_PREFIX: &str = "homelab_";

/// Short location codes used in resource names and the Azure region each stands for.
pub const LOCATION_CODES: &[(&str, &str)] = &[
    ("we", "westeurope"),
    ("ne", "northeurope"),
    ("eus", "eastus"),
    ("eus2", "eastus2"),
    ("wus", "westus"),
    ("wus2", "westus2"),
    ("cus", "centralus"),
    ("uks", "uksouth"),
    ("ukw", "ukwest"),
    ("sea", "southeastasia"),
    ("ea", "eastasia"),
];

/// Returns the Azure region for a location code.
pub fn region_for_code(code: &str) -> Option<&'static str> {
    LOCATION_CODES
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, region)| *region)
}

/// Keys accepted by `HomelabConfig::set`. `configFile` is read-only: the
/// console always loads `~/.homelab/config.json`.
pub const CONFIG_KEYS: &[&str] = &["env", "loc", "project", "location", "logFile", "logLevel"];

/// `logs/homelab_<YYYYMMDD>.log` under the `.homelab` directory, dated today.
fn dated_log_file(homelab_dir: &Path) -> PathBuf {
    homelab_dir.join("logs").join(format!(
        "{}{}.log",
        LOG_FILE_PREFIX,
        Local::now().format("%Y%m%d")
    ))
}

/// Console configuration stored in ~/.homelab/config.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomelabConfig {
    /// Environment prefix (dev, test, prod).
    pub env: String,
    /// Short location code used in resource names.
    pub loc: String,
    /// Project suffix used in resource names.
    pub project: String,
    /// Azure region resources are created in.
    pub location: String,
    pub log_file: PathBuf,
    pub config_file: PathBuf,
    #[serde(default)]
    pub log_level: LogLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_setup: Option<DateTime<Utc>>,
    /// Repository chosen in the GitHub menu, used as the default deploy source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_repository: Option<RepositorySelection>,
}

/// A GitHub repository picked for deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositorySelection {
    pub name: String,
    pub full_name: String,
    pub clone_url: String,
    pub branch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub private: bool,
}

impl HomelabConfig {
    /// Default configuration rooted at the given `.homelab` directory.
    pub fn default_in(homelab_dir: &Path) -> Self {
        Self {
            env: DEFAULT_ENV.to_string(),
            loc: DEFAULT_LOC.to_string(),
            project: DEFAULT_PROJECT.to_string(),
            location: DEFAULT_LOCATION.to_string(),
            log_file: dated_log_file(homelab_dir),
            config_file: homelab_dir.join(paths::CONFIG_FILE_NAME),
            log_level: LogLevel::Info,
            last_setup: None,
            selected_repository: None,
        }
    }

    /// Default configuration in the user's home directory.
    pub fn default_for_user() -> Result<Self, AppError> {
        Ok(Self::default_in(&paths::homelab_dir()?))
    }

    /// Loads the configuration from ~/.homelab/config.json, or defaults if missing.
    pub fn load() -> Result<Self, AppError> {
        let path = paths::config_file()?;
        if !path.exists() {
            return Self::default_for_user();
        }
        Self::load_from(&path)
    }

    /// Loads the configuration from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, AppError> {
        let content = fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read {}: {}", path.display(), e)))?;

        let mut config: Self = serde_json::from_str(&content).map_err(|e| {
            AppError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config.config_file = path.to_path_buf();
        config.roll_log_file();
        Ok(config)
    }

    /// Moves a generated dated log file to today's date. Paths set by the user are kept.
    pub fn roll_log_file(&mut self) {
        if !self.has_dated_log_file() {
            return;
        }
        if let Some(dir) = self.config_file.parent() {
            self.log_file = dated_log_file(dir);
        }
    }

    fn has_dated_log_file(&self) -> bool {
        let Some(dir) = self.config_file.parent() else {
            return false;
        };
        if self.log_file.parent() != Some(dir.join("logs").as_path()) {
            return false;
        }
        self.log_file
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.strip_prefix(LOG_FILE_PREFIX))
            .and_then(|name| name.strip_suffix(".log"))
            .is_some_and(|date| date.len() == 8 && date.chars().all(|c| c.is_ascii_digit()))
    }

    /// Saves the configuration to its own `config_file`.
    pub fn save(&self) -> Result<(), AppError> {
        self.save_to(&self.config_file)
    }

    /// Saves the configuration to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<(), AppError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, content)
            .map_err(|e| AppError::Config(format!("Failed to write {}: {}", path.display(), e)))
    }

    /// True once the setup wizard has completed at least once.
    pub fn is_configured(&self) -> bool {
        self.last_setup.is_some()
    }

    /// Records that setup completed now.
    pub fn mark_setup(&mut self) {
        self.last_setup = Some(Utc::now());
    }

    /// Restores defaults while keeping the file locations.
    pub fn reset(&mut self) {
        let log_file = self.log_file.clone();
        let config_file = self.config_file.clone();
        let dir = config_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        *self = Self::default_in(&dir);
        self.log_file = log_file;
        self.config_file = config_file;
    }

    /// Reads a value by key.
    pub fn get(&self, key: &str) -> Result<String, AppError> {
        Ok(match key {
            "env" => self.env.clone(),
            "loc" => self.loc.clone(),
            "project" => self.project.clone(),
            "location" => self.location.clone(),
            "logFile" => self.log_file.display().to_string(),
            "configFile" => self.config_file.display().to_string(),
            "logLevel" => self.log_level.to_string(),
            "lastSetup" => self
                .last_setup
                .map(|t| t.to_rfc3339())
                .unwrap_or_default(),
            other => return Err(AppError::UnknownConfigKey(other.to_string())),
        })
    }

    /// Updates a value by key, validating it first.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), AppError> {
        use crate::utils::validation::{validate_env, validate_location_code, validate_project};

        let value = value.trim();
        match key {
            "env" => {
                validate_env(value)?;
                self.env = value.to_string();
            }
            "loc" => {
                validate_location_code(value)?;
                self.loc = value.to_lowercase();
                if let Some(region) = region_for_code(value) {
                    self.location = region.to_string();
                }
            }
            "project" => {
                validate_project(value)?;
                self.project = value.to_string();
            }
            "location" => {
                if value.is_empty() || value.contains(char::is_whitespace) {
                    return Err(AppError::Validation(format!(
                        "'{}' is not a valid Azure region name",
                        value
                    )));
                }
                self.location = value.to_lowercase();
            }
            "logFile" => self.log_file = PathBuf::from(value),
            "configFile" => {
                return Err(AppError::Validation(format!(
                    "configFile is read-only ({})",
                    self.config_file.display()
                )))
            }
            "logLevel" => self.log_level = value.parse()?,
            other => return Err(AppError::UnknownConfigKey(other.to_string())),
        }
        Ok(())
    }

    /// Key/value pairs in display order.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let mut entries: Vec<(&'static str, String)> = CONFIG_KEYS
            .iter()
            .map(|key| (*key, self.get(key).unwrap_or_default()))
            .collect();
        entries.push(("configFile", self.config_file.display().to_string()));
        entries.push((
            "lastSetup",
            self.last_setup
                .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "never".to_string()),
        ));
        if let Some(repo) = &self.selected_repository {
            entries.push((
                "selectedRepository",
                format!("{} ({})", repo.full_name, repo.branch),
            ));
        }
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = HomelabConfig::default_in(dir.path());
        config.config_file = path.clone();
        config.set("env", "prod").unwrap();
        config.set("project", "lab").unwrap();
        config.mark_setup();
        config.selected_repository = Some(RepositorySelection {
            name: "site".into(),
            full_name: "octo/site".into(),
            clone_url: "https://github.com/octo/site.git".into(),
            branch: "main".into(),
            description: Some("Personal site".into()),
            private: false,
        });
        config.save().unwrap();

        let loaded = HomelabConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.entries(), config.entries());
    }

    #[test]
    fn test_saved_file_uses_camel_case_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = HomelabConfig::default_in(dir.path());
        config.save_to(&path).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["env"], "dev");
        assert_eq!(raw["loc"], "we");
        assert_eq!(raw["project"], "homelab");
        assert!(raw.get("logFile").is_some());
        assert!(raw.get("lastSetup").is_none());
    }

    #[test]
    fn test_set_loc_updates_region() {
        let dir = tempdir().unwrap();
        let mut config = HomelabConfig::default_in(dir.path());
        config.set("loc", "eus").unwrap();
        assert_eq!(config.loc, "eus");
        assert_eq!(config.location, "eastus");
    }

    #[test]
    fn test_set_rejects_unknown_key_and_bad_values() {
        let dir = tempdir().unwrap();
        let mut config = HomelabConfig::default_in(dir.path());
        assert!(matches!(
            config.set("colour", "blue"),
            Err(AppError::UnknownConfigKey(_))
        ));
        assert!(config.set("env", "Dev Env").is_err());
        assert!(config.set("location", "west europe").is_err());
        assert_eq!(config.env, DEFAULT_ENV);
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            HomelabConfig::load_from(&path),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_reset_keeps_file_locations() {
        let dir = tempdir().unwrap();
        let mut config = HomelabConfig::default_in(dir.path());
        config.log_file = dir.path().join("custom.log");
        config.set("env", "prod").unwrap();
        config.mark_setup();

        config.reset();
        assert_eq!(config.env, DEFAULT_ENV);
        assert_eq!(config.log_file, dir.path().join("custom.log"));
        assert!(!config.is_configured());
    }

    #[test]
    fn test_config_file_is_read_only() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = HomelabConfig::default_in(dir.path());
        config.save().unwrap();

        let moved = dir.path().join("elsewhere.json");
        assert!(matches!(
            config.set("configFile", &moved.display().to_string()),
            Err(AppError::Validation(_))
        ));
        config.set("env", "prod").unwrap();
        config.save().unwrap();

        assert!(!moved.exists());
        assert_eq!(HomelabConfig::load_from(&path).unwrap().env, "prod");
        assert!(!CONFIG_KEYS.contains(&"configFile"));
    }

    #[test]
    fn test_dated_log_file_rolls_over_on_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = HomelabConfig::default_in(dir.path());
        config.log_file = dir.path().join("logs").join("homelab_20200101.log");
        config.save().unwrap();

        let loaded = HomelabConfig::load_from(&path).unwrap();
        assert_eq!(loaded.log_file, dated_log_file(dir.path()));
        assert_ne!(loaded.log_file, config.log_file);
    }

    #[test]
    fn test_explicit_log_file_is_kept_on_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = HomelabConfig::default_in(dir.path());
        config.set("logFile", &dir.path().join("custom.log").display().to_string()).unwrap();
        config.save().unwrap();

        let loaded = HomelabConfig::load_from(&path).unwrap();
        assert_eq!(loaded.log_file, dir.path().join("custom.log"));
    }

    #[test]
    fn test_region_for_code() {
        assert_eq!(region_for_code("NE"), Some("northeurope"));
        assert_eq!(region_for_code("xx"), None);
    }
}
