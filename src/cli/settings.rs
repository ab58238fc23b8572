//! Configuration and log settings.

use crate::cli::{run_action, setup};
use crate::core::config::CONFIG_KEYS;
use crate::core::error::AppError;
use crate::core::logging::{LogLevel, Logger};
use crate::core::session::Session;
use crate::ui::{self, Menu, MenuChoice};

const RECENT_LOG_LINES: usize = 30;

const MENU_ITEMS: &[&str] = &[
    "Show configuration",
    "Change a value",
    "Change log level",
    "View recent log entries",
    "Run setup again",
    "Reset to defaults",
];

pub fn menu(session: &mut Session) -> Result<(), AppError> {
    loop {
        match Menu::new("Settings", MENU_ITEMS).run()? {
            MenuChoice::Back => return Ok(()),
            MenuChoice::Item(0) => run_action(session, "Show configuration", |s| {
                show(s);
                Ok(())
            }),
            MenuChoice::Item(1) => run_action(session, "Change setting", |s| {
                let index = ui::select("Setting", CONFIG_KEYS)?;
                let key = CONFIG_KEYS[index];
                let value = ui::input_with_default(key, &s.config.get(key)?)?;
                set(s, key, &value)
            }),
            MenuChoice::Item(2) => run_action(session, "Change log level", |s| {
                let levels = LogLevel::selectable();
                let current = levels.iter().position(|l| *l == s.config.log_level).unwrap_or(1);
                let level = levels[ui::select_with_default("Log level", levels, current)?];
                set(s, "logLevel", &level.to_string())
            }),
            MenuChoice::Item(3) => run_action(session, "View log", show_log),
            MenuChoice::Item(4) => run_action(session, "Setup", setup::run),
            MenuChoice::Item(_) => run_action(session, "Reset configuration", |s| {
                if !ui::confirm("Restore all settings to their defaults?", false)? {
                    return Err(AppError::Cancelled);
                }
                s.config.reset();
                s.set_log_level(s.config.log_level);
                s.save_config()?;
                s.logger.success("Configuration reset");
                Ok(())
            }),
        }
    }
}

pub fn show(session: &Session) {
    ui::section("Configuration");
    let entries = session.config.entries();
    let rows: Vec<(&str, String)> = entries.iter().map(|(k, v)| (*k, v.clone())).collect();
    ui::key_values(&rows);
}

/// Sets one key, applies it to the running session and saves.
pub fn set(session: &mut Session, key: &str, value: &str) -> Result<(), AppError> {
    session.config.set(key, value)?;
    match key {
        "logLevel" => session.set_log_level(session.config.log_level),
        "logFile" => {
            session.logger = Logger::new(session.logger.level(), Some(session.config.log_file.clone()))
        }
        _ => {}
    }
    session.save_config()?;
    session
        .logger
        .success(&format!("{} = {}", key, session.config.get(key)?));
    if matches!(key, "env" | "loc" | "project") {
        ui::info(&format!(
            "Resource group is now {}",
            session.names().resource_group()
        ));
    }
    Ok(())
}

pub fn path(session: &Session) {
    println!("{}", session.config.config_file.display());
}

fn show_log(session: &mut Session) -> Result<(), AppError> {
    let lines = session.logger.tail(RECENT_LOG_LINES)?;
    if lines.is_empty() {
        ui::info("The log file is empty");
        return Ok(());
    }
    ui::section(&format!("Last {} log entries", lines.len()));
    for line in lines {
        println!("{}", line);
    }
    if let Some(file) = session.logger.file() {
        ui::info(&format!("Full log: {}", file.display()));
    }
    Ok(())
}
