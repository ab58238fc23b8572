//! State shared by every command for one run of the console.

use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::core::config::HomelabConfig;
use crate::core::context::ExecutionContext;
use crate::core::error::AppError;
use crate::core::logging::{LogLevel, Logger};
use crate::core::monitor::{BackgroundJobs, DeploymentMonitor, MonitorSettings};
use crate::core::naming::ResourceNames;
use crate::ui;

pub const LOG_LEVEL_ENV_VAR: &str = "HOMELAB_LOG_LEVEL";

pub struct Session {
    pub config: HomelabConfig,
    pub logger: Logger,
    pub ctx: ExecutionContext,
    pub jobs: BackgroundJobs,
    cancel: Arc<AtomicBool>,
}

impl Session {
    /// Loads the configuration and sets up logging.
    pub fn start(dry_run: bool, verbose: bool) -> Result<Self, AppError> {
        let config = HomelabConfig::load()?;
        let level = effective_level(
            config.log_level,
            env::var(LOG_LEVEL_ENV_VAR).ok().as_deref(),
            verbose,
        );
        let logger = Logger::new(level, Some(config.log_file.clone()));
        Ok(Self::from_parts(config, logger, ExecutionContext::new(dry_run, verbose)))
    }

    pub fn from_parts(config: HomelabConfig, logger: Logger, ctx: ExecutionContext) -> Self {
        Self {
            config,
            logger,
            ctx,
            jobs: BackgroundJobs::new(),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn names(&self) -> ResourceNames {
        ResourceNames::from_config(&self.config)
    }

    /// Flag set by Ctrl-C; foreground monitors stop when it flips.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Monitor for a foreground wait, bound to the Ctrl-C flag.
    pub fn foreground_monitor(&self, settings: MonitorSettings) -> DeploymentMonitor {
        self.cancel.store(false, Ordering::SeqCst);
        DeploymentMonitor::new(settings, self.logger.clone()).with_cancel_flag(self.cancel_flag())
    }

    /// Monitor for a background job; it has its own cancel flag.
    pub fn background_monitor(&self, settings: MonitorSettings) -> DeploymentMonitor {
        DeploymentMonitor::new(settings, self.logger.clone().quiet())
    }

    pub fn save_config(&self) -> Result<(), AppError> {
        if self.ctx.is_dry_run() {
            ui::info("[DRY-RUN] Configuration not saved");
            return Ok(());
        }
        self.config.save()
    }

    /// Applies a new log level to the running logger and the config.
    pub fn set_log_level(&mut self, level: LogLevel) {
        self.config.log_level = level;
        self.logger.set_level(level);
    }

    /// Reports the outcome of a menu action. Errors are logged and shown, never propagated.
    pub fn report(&self, action: &str, result: Result<(), AppError>) {
        match result {
            Ok(()) => {}
            Err(AppError::Cancelled) => self.logger.warning(&format!("{} cancelled", action)),
            Err(e) => self.logger.app_error(action, &e),
        }
    }

    /// Prints finished background jobs and returns how many there were.
    pub fn report_background_jobs(&mut self) -> usize {
        let finished = self.jobs.collect_finished();
        for (label, outcome) in &finished {
            match outcome.clone().into_result(label) {
                Ok(elapsed) => self.logger.success(&format!(
                    "Background job finished: {} ({})",
                    label,
                    crate::core::monitor::format_duration(elapsed)
                )),
                Err(e) => self
                    .logger
                    .app_error(&format!("Background job {}", label), &e),
            }
        }
        finished.len()
    }
}

/// `--verbose` wins, then `HOMELAB_LOG_LEVEL`, then the configured level.
pub fn effective_level(configured: LogLevel, env_level: Option<&str>, verbose: bool) -> LogLevel {
    if verbose {
        return LogLevel::Debug;
    }
    env_level
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(configured)
}

/// Installs the Ctrl-C handler: the first press cancels, the second exits.
pub fn install_interrupt_handler(cancel: Arc<AtomicBool>) {
    let _ = ctrlc::set_handler(move || {
        if cancel.swap(true, Ordering::SeqCst) {
            println!();
            std::process::exit(130);
        }
        println!();
        ui::warning("Stopping... press Ctrl-C again to quit");
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_effective_level() {
        assert_eq!(effective_level(LogLevel::Info, None, true), LogLevel::Debug);
        assert_eq!(
            effective_level(LogLevel::Info, Some("warning"), false),
            LogLevel::Warning
        );
        assert_eq!(
            effective_level(LogLevel::Error, Some("nonsense"), false),
            LogLevel::Error
        );
    }

    #[test]
    fn test_names_follow_config() {
        let dir = tempdir().unwrap();
        let mut config = HomelabConfig::default_in(dir.path());
        config.env = "prod".into();
        let session = Session::from_parts(config, Logger::default().quiet(), ExecutionContext::default());
        assert_eq!(session.names().resource_group(), "prod-we-rg-homelab");
    }

    #[test]
    fn test_foreground_monitor_resets_cancel_flag() {
        let dir = tempdir().unwrap();
        let session = Session::from_parts(
            HomelabConfig::default_in(dir.path()),
            Logger::default().quiet(),
            ExecutionContext::default(),
        );
        session.cancel_flag().store(true, Ordering::SeqCst);
        let monitor = session.foreground_monitor(MonitorSettings::network());
        assert!(!monitor.cancel_flag().load(Ordering::SeqCst));
    }
}
