//! Level-gated console and file logging.
//!
//! Every message goes to the console with the same glyphs as `ui::output`
//! and, when a log file is configured, is appended as
//! `[YYYY-MM-DD HH:MM:SS] [Level] message`.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Local;
use console::style;
use serde::{Deserialize, Serialize};

use crate::core::error::AppError;
use crate::ui;

/// Log severity. `Success` is reported like `Info` but rendered with a check mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    /// Levels a user can pick as the minimum threshold.
    pub fn selectable() -> &'static [LogLevel] {
        &[LogLevel::Debug, LogLevel::Info, LogLevel::Warning, LogLevel::Error]
    }

    /// Rank used for gating; `Success` shares the `Info` rank.
    fn rank(self) -> u8 {
        match self {
            LogLevel::Debug => 0,
            LogLevel::Info | LogLevel::Success => 1,
            LogLevel::Warning => 2,
            LogLevel::Error => 3,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debug => write!(f, "Debug"),
            Self::Info => write!(f, "Info"),
            Self::Success => write!(f, "Success"),
            Self::Warning => write!(f, "Warning"),
            Self::Error => write!(f, "Error"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "success" => Ok(Self::Success),
            "warning" | "warn" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            other => Err(AppError::Validation(format!(
                "Unknown log level '{}'. Expected Debug, Info, Warning or Error",
                other
            ))),
        }
    }
}

/// Console + file logger. Cheap to clone, so background monitors get their own copy.
#[derive(Debug, Clone)]
pub struct Logger {
    level: LogLevel,
    file: Option<PathBuf>,
    console: bool,
}

impl Logger {
    pub fn new(level: LogLevel, file: Option<PathBuf>) -> Self {
        Self {
            level,
            file,
            console: true,
        }
    }

    /// Logger that only writes to the file (used by background jobs).
    pub fn quiet(mut self) -> Self {
        self.console = false;
        self
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn set_level(&mut self, level: LogLevel) {
        self.level = level;
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Whether a message at `level` passes the threshold.
    pub fn enabled(&self, level: LogLevel) -> bool {
        level.rank() >= self.level.rank()
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn success(&self, message: &str) {
        self.log(LogLevel::Success, message);
    }

    pub fn warning(&self, message: &str) {
        self.log(LogLevel::Warning, message);
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    /// Logs an error together with its hint, if it has one. The hint is
    /// shown on the console only.
    pub fn app_error(&self, context: &str, err: &AppError) {
        let message = format!("{}: {}", context, err);
        match err.hint() {
            Some(hint) if self.console && self.enabled(LogLevel::Error) => {
                ui::error_with_hint(&message, hint);
                self.write_file(LogLevel::Error, &message);
            }
            _ => self.error(&message),
        }
    }

    pub fn log(&self, level: LogLevel, message: &str) {
        if !self.enabled(level) {
            return;
        }

        if self.console {
            print_console(level, message);
        }
        self.write_file(level, message);
    }

    fn write_file(&self, level: LogLevel, message: &str) {
        if let Some(path) = &self.file {
            let line = format_line(&Local::now().format("%Y-%m-%d %H:%M:%S").to_string(), level, message);
            if let Err(e) = append_line(path, &line) {
                if self.console {
                    eprintln!(
                        "{} Could not write log file {}: {}",
                        style("!").yellow(),
                        path.display(),
                        e
                    );
                }
            }
        }
    }

    /// Returns the last `lines` lines of the log file.
    pub fn tail(&self, lines: usize) -> Result<Vec<String>, AppError> {
        let Some(path) = &self.file else {
            return Ok(Vec::new());
        };
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(path)?;
        let all: Vec<&str> = content.lines().collect();
        let start = all.len().saturating_sub(lines);
        Ok(all[start..].iter().map(|l| l.to_string()).collect())
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(LogLevel::Info, None)
    }
}

/// Formats a single log file line.
pub fn format_line(timestamp: &str, level: LogLevel, message: &str) -> String {
    format!("[{}] [{}] {}", timestamp, level, message)
}

fn print_console(level: LogLevel, message: &str) {
    match level {
        LogLevel::Debug => println!("{} {}", style("·").dim(), style(message).dim()),
        LogLevel::Info => ui::info(message),
        LogLevel::Success => ui::success(message),
        LogLevel::Warning => ui::warning(message),
        LogLevel::Error => ui::error(message),
    }
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_format_line() {
        assert_eq!(
            format_line("2024-05-01 10:00:00", LogLevel::Warning, "disk almost full"),
            "[2024-05-01 10:00:00] [Warning] disk almost full"
        );
    }

    #[test]
    fn test_level_gating() {
        let logger = Logger::new(LogLevel::Warning, None);
        assert!(!logger.enabled(LogLevel::Debug));
        assert!(!logger.enabled(LogLevel::Info));
        assert!(!logger.enabled(LogLevel::Success));
        assert!(logger.enabled(LogLevel::Warning));
        assert!(logger.enabled(LogLevel::Error));
    }

    #[test]
    fn test_success_passes_info_threshold() {
        let logger = Logger::new(LogLevel::Info, None);
        assert!(logger.enabled(LogLevel::Success));
        assert!(!logger.enabled(LogLevel::Debug));
    }

    #[test]
    fn test_file_logging_respects_level() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("homelab.log");
        let logger = Logger::new(LogLevel::Info, Some(path.clone())).quiet();

        logger.debug("hidden");
        logger.info("first");
        logger.error("second");

        let lines = logger.tail(10).unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("[Info] first"));
        assert!(lines[1].ends_with("[Error] second"));
        assert!(lines[0].starts_with('['));
    }

    #[test]
    fn test_tail_returns_last_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("homelab.log");
        let logger = Logger::new(LogLevel::Debug, Some(path)).quiet();
        for i in 0..5 {
            logger.info(&format!("line {}", i));
        }

        let lines = logger.tail(2).unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].ends_with("line 4"));
    }

    #[test]
    fn test_app_error_logs_message_without_hint() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("homelab.log");
        let logger = Logger::new(LogLevel::Info, Some(path)).quiet();

        logger.app_error("Repository list", &AppError::GitHubUnauthorized);

        let lines = logger.tail(10).unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("[Error] Repository list: "));
        let hint = AppError::GitHubUnauthorized.hint().unwrap();
        assert!(!lines[0].contains(hint));
    }

    #[test]
    fn test_parse_level() {
        assert_eq!("warn".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert!("verbose".parse::<LogLevel>().is_err());
    }
}
