//! Top-level interactive menu.

use crate::cli::{deploy, docs, github, infra, nat, settings, vpn};
use crate::core::error::AppError;
use crate::core::session::Session;
use crate::ui::{self, Menu, MenuChoice};

const MAIN_ITEMS: &[&str] = &[
    "Deploy infrastructure",
    "Deploy website",
    "VPN certificates",
    "VPN gateway",
    "VPN client",
    "NAT gateway",
    "GitHub",
    "Documentation",
    "Settings",
];

pub fn run(session: &mut Session) -> Result<(), AppError> {
    session.logger.debug("Interactive menu started");
    loop {
        ui::header();
        session.report_background_jobs();
        print_status_line(session);

        let choice = Menu::new("Main menu", MAIN_ITEMS).back_label("Exit").run()?;
        let result = match choice {
            MenuChoice::Back => {
                if confirm_exit(session)? {
                    break;
                }
                continue;
            }
            MenuChoice::Item(0) => infra::menu(session),
            MenuChoice::Item(1) => deploy::menu(session),
            MenuChoice::Item(2) => vpn::certificate_menu(session),
            MenuChoice::Item(3) => vpn::gateway_menu(session),
            MenuChoice::Item(4) => vpn::client_menu(session),
            MenuChoice::Item(5) => nat::menu(session),
            MenuChoice::Item(6) => github::menu(session),
            MenuChoice::Item(7) => docs::menu(),
            MenuChoice::Item(_) => settings::menu(session),
        };
        // Prompt failures inside a submenu drop back here.
        session.report("Menu", result);
    }
    session.logger.debug("Interactive menu closed");
    Ok(())
}

fn print_status_line(session: &Session) {
    let names = session.names();
    let mut line = format!(
        "Resource group: {}  Region: {}",
        names.resource_group(),
        session.config.location
    );
    if let Some(repo) = &session.config.selected_repository {
        line.push_str(&format!("  Repository: {}", repo.full_name));
    }
    if session.ctx.is_dry_run() {
        line.push_str("  [DRY-RUN]");
    }
    ui::info(&line);

    let running = session.jobs.running_labels();
    if !running.is_empty() {
        ui::info(&format!("Running in background: {}", running.join(", ")));
    }
}

/// Asks before leaving while background monitors are still running.
fn confirm_exit(session: &Session) -> Result<bool, AppError> {
    if session.jobs.running() == 0 {
        return Ok(true);
    }
    ui::warning(&format!(
        "{} background monitor(s) still running. Azure keeps provisioning after exit",
        session.jobs.running()
    ));
    if ui::confirm("Exit anyway?", false)? {
        session.jobs.cancel_all();
        Ok(true)
    } else {
        Ok(false)
    }
}
