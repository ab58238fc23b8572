use anyhow::{Context, Result};
use clap::Parser;
use homelab::cli::{
    deploy::DeployOptions, Cli, Commands, ConfigCommands, GithubCommands,
    InfraCommands, NatCommands, VpnCommands,
};
use homelab::core::error::AppError;
use homelab::core::session::{install_interrupt_handler, Session};
use homelab::ui;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut session = Session::start(cli.dry_run, cli.verbose)
        .context("Failed to load the homelab configuration")?;
    install_interrupt_handler(session.cancel_flag());

    let result = match cli.command {
        Some(command) => run_command(&mut session, command),
        None => run_interactive(&mut session),
    };

    if let Err(e) = result {
        if matches!(e, AppError::Cancelled) {
            session.logger.warning("Cancelled");
            std::process::exit(130);
        }
        session.logger.app_error("Command failed", &e);
        std::process::exit(1);
    }
    Ok(())
}

fn run_interactive(session: &mut Session) -> Result<(), AppError> {
    if !session.config.is_configured() {
        ui::header();
        ui::info("No configuration found, starting setup");
        homelab::cli::setup::run(session)?;
    }
    homelab::cli::menu::run(session)
}

fn run_command(session: &mut Session, command: Commands) -> Result<(), AppError> {
    match command {
        Commands::Setup => homelab::cli::setup::run(session),

        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                homelab::cli::settings::show(session);
                Ok(())
            }
            ConfigCommands::Set { key, value } => {
                homelab::cli::settings::set(session, &key, &value)
            }
            ConfigCommands::Path => {
                homelab::cli::settings::path(session);
                Ok(())
            }
        },

        Commands::Infra { command } => match command {
            InfraCommands::Deploy {
                component,
                background,
                force,
            } => {
                homelab::cli::infra::deploy(session, &component.components(), background, force)?;
                report_detached_jobs(session);
                Ok(())
            }
            InfraCommands::Status => homelab::cli::infra::status(session),
            InfraCommands::Reset { yes } => homelab::cli::infra::reset(session, yes),
        },

        Commands::Deploy {
            path,
            target,
            name,
            domain,
            repo,
        } => homelab::cli::deploy::deploy(
            session,
            DeployOptions {
                path,
                target,
                name,
                domain,
                use_repository: repo,
            },
        ),

        Commands::Detect { path } => homelab::cli::deploy::detect(&path),

        Commands::Vpn { command } => match command {
            VpnCommands::Gateway { action } => homelab::cli::vpn::gateway(session, action),
            VpnCommands::Cert { command } => homelab::cli::vpn::certificates(session, command),
            VpnCommands::Client => homelab::cli::vpn::client(session),
        },

        Commands::Nat { command } => match command {
            NatCommands::Enable { background } => {
                homelab::cli::nat::enable(session, background)?;
                report_detached_jobs(session);
                Ok(())
            }
            NatCommands::Disable { yes } => homelab::cli::nat::disable(session, yes),
            NatCommands::Status => homelab::cli::nat::status(session),
        },

        Commands::Github { command } => match command {
            GithubCommands::Connect { token } => {
                let token = token.or_else(|| {
                    std::env::var(homelab::core::credentials::TOKEN_ENV_VAR).ok()
                });
                homelab::cli::github::connect(session, token)
            }
            GithubCommands::Disconnect => homelab::cli::github::disconnect(session),
            GithubCommands::Status => homelab::cli::github::status(session),
            GithubCommands::Repos => homelab::cli::github::repos(session),
            GithubCommands::Select => homelab::cli::github::select(session),
            GithubCommands::Clone => homelab::cli::github::clone(session),
        },

        Commands::Docs { topic } => homelab::cli::docs::docs(topic.as_deref()),
    }
}

/// One-shot commands have no menu to report jobs in; list what is still provisioning.
fn report_detached_jobs(session: &mut Session) {
    session.report_background_jobs();
    let running = session.jobs.running_labels();
    if !running.is_empty() {
        ui::info(&format!(
            "Still provisioning in Azure: {}. Check with 'homelab infra status'",
            running.join(", ")
        ));
        session.jobs.cancel_all();
    }
}
