//! First-run setup wizard.

use crate::core::config::LOCATION_CODES;
use crate::core::error::AppError;
use crate::core::logging::LogLevel;
use crate::core::session::Session;
use crate::ui;
use crate::utils::{validate_env, validate_project};

/// Asks for the naming parts and log level, then saves the configuration.
pub fn run(session: &mut Session) -> Result<(), AppError> {
    ui::section("Setup");
    println!("Resources are named {{env}}-{{loc}}-{{type}}-{{project}}, e.g. dev-we-rg-homelab.");
    println!();

    let env = ui::input_validated("Environment", Some(session.config.env.as_str()), validate_env)?;

    let labels: Vec<String> = LOCATION_CODES
        .iter()
        .map(|(code, region)| format!("{:<5} {}", code, region))
        .collect();
    let current = LOCATION_CODES
        .iter()
        .position(|(code, _)| *code == session.config.loc)
        .unwrap_or(0);
    let (loc, _) = LOCATION_CODES[ui::select_with_default("Location", &labels, current)?];

    let project = ui::input_validated("Project", Some(session.config.project.as_str()), validate_project)?;

    let levels = LogLevel::selectable();
    let current_level = levels
        .iter()
        .position(|l| *l == session.config.log_level)
        .unwrap_or(1);
    let level = levels[ui::select_with_default("Log level", levels, current_level)?];

    session.config.set("env", &env)?;
    session.config.set("loc", loc)?;
    session.config.set("project", &project)?;
    session.set_log_level(level);
    session.config.mark_setup();
    session.save_config()?;

    let names = session.names();
    ui::key_values(&[
        ("Resource group", names.resource_group()),
        ("Region", session.config.location.clone()),
        ("Config file", session.config.config_file.display().to_string()),
    ]);
    session.logger.success("Setup complete");
    Ok(())
}
