//! GitHub account, repository selection and local checkouts.

use std::path::PathBuf;

use crate::cli::run_action;
use crate::core::config::RepositorySelection;
use crate::core::credentials::{self, GitHubConfig, TokenSource};
use crate::core::error::AppError;
use crate::core::paths;
use crate::core::session::Session;
use crate::providers::git::GitProvider;
use crate::providers::github::{ConnectionStatus, GitHubClient, Repository};
use crate::ui::{self, Menu, MenuChoice, Spinner};
use crate::utils::validate_github_token;

const MENU_ITEMS: &[&str] = &[
    "Connect account",
    "Connection status",
    "List repositories",
    "Select repository",
    "Clone or update selected repository",
    "Disconnect",
];

pub fn menu(session: &mut Session) -> Result<(), AppError> {
    loop {
        match Menu::new("GitHub", MENU_ITEMS).run()? {
            MenuChoice::Back => return Ok(()),
            MenuChoice::Item(0) => run_action(session, "GitHub connect", |s| connect(s, None)),
            MenuChoice::Item(1) => run_action(session, "GitHub status", status),
            MenuChoice::Item(2) => run_action(session, "List repositories", repos),
            MenuChoice::Item(3) => run_action(session, "Select repository", select),
            MenuChoice::Item(4) => run_action(session, "Clone repository", clone),
            MenuChoice::Item(_) => run_action(session, "GitHub disconnect", disconnect),
        }
    }
}

/// Validates a personal access token against `/user` and stores it.
pub fn connect(session: &mut Session, token: Option<String>) -> Result<(), AppError> {
    let token = match token {
        Some(token) => token.trim().to_string(),
        None => {
            ui::info("Create a token at https://github.com/settings/tokens (scope: repo)");
            ui::password("Personal access token")?
        }
    };
    validate_github_token(&token)?;

    let spinner = Spinner::new("Checking token");
    let user = match GitHubClient::new(&token)?.user() {
        Ok(user) => {
            spinner.finish(&format!("Authenticated as {}", user.login));
            user
        }
        Err(e) => {
            spinner.finish_error("Token rejected");
            return Err(e);
        }
    };

    if session.ctx.is_dry_run() {
        ui::info("[DRY-RUN] Token not saved");
    } else {
        GitHubConfig::new(&token, &user.login).save()?;
    }
    session
        .logger
        .success(&format!("Connected to GitHub as {}", user.login));
    Ok(())
}

pub fn disconnect(session: &mut Session) -> Result<(), AppError> {
    if session.ctx.is_dry_run() {
        ui::info("[DRY-RUN] Token not removed");
        return Ok(());
    }
    if GitHubConfig::delete()? {
        session.logger.success("GitHub token removed");
    } else {
        ui::info("No stored GitHub token");
    }
    if std::env::var_os(credentials::TOKEN_ENV_VAR).is_some() {
        ui::warning(&format!(
            "{} is still set and will keep being used",
            credentials::TOKEN_ENV_VAR
        ));
    }
    Ok(())
}

/// Prints whether the token works. An invalid token is reported, not raised.
pub fn status(session: &mut Session) -> Result<(), AppError> {
    let Some((token, source)) = credentials::resolve_token()? else {
        ui::key_values(&[("GitHub", ui::state("Not connected"))]);
        ui::info("Connect with 'homelab github connect'");
        return Ok(());
    };

    let client = GitHubClient::new(&token)?;
    match client.validate_token() {
        ConnectionStatus::Connected(user) => {
            let mut rows = vec![
                ("GitHub", ui::state("Connected")),
                ("User", user.login.clone()),
                ("Token source", source_label(source).to_string()),
            ];
            if let Some(name) = user.name {
                rows.push(("Name", name));
            }
            if let Ok(rate) = client.rate_limit() {
                let reset = rate
                    .reset_at()
                    .map(|t| t.with_timezone(&chrono::Local).format("%H:%M").to_string())
                    .unwrap_or_default();
                rows.push((
                    "Rate limit",
                    format!("{}/{} (resets {})", rate.remaining, rate.limit, reset),
                ));
            }
            if let Some(repo) = &session.config.selected_repository {
                rows.push(("Selected repository", format!("{} ({})", repo.full_name, repo.branch)));
            }
            ui::key_values(&rows);
        }
        ConnectionStatus::NotConnected { reason, hint } => {
            ui::key_values(&[
                ("GitHub", ui::state("Not connected")),
                ("Token source", source_label(source).to_string()),
            ]);
            session.logger.warning(&format!("GitHub token check failed: {}", reason));
            if let Some(hint) = hint {
                ui::info(hint);
            }
        }
    }
    Ok(())
}

fn source_label(source: TokenSource) -> &'static str {
    match source {
        TokenSource::Environment => credentials::TOKEN_ENV_VAR,
        TokenSource::ConfigFile => "~/.homelab/github-config.json",
    }
}

fn fetch_repositories() -> Result<Vec<Repository>, AppError> {
    let token = credentials::require_token()?;
    let spinner = Spinner::new("Fetching repositories");
    match GitHubClient::new(&token)?.repositories() {
        Ok(repos) => {
            spinner.finish(&format!("{} repositories", repos.len()));
            Ok(repos)
        }
        Err(e) => {
            spinner.finish_error("Could not list repositories");
            Err(e)
        }
    }
}

pub fn repos(_session: &mut Session) -> Result<(), AppError> {
    let repos = fetch_repositories()?;
    ui::section("Repositories");
    for repo in &repos {
        println!("  {}", repo.label());
    }
    Ok(())
}

/// Picks the repository used by website deployments and saves it in the config.
pub fn select(session: &mut Session) -> Result<(), AppError> {
    let repos = fetch_repositories()?;
    if repos.is_empty() {
        return Err(AppError::Validation("The account has no repositories".into()));
    }
    let labels: Vec<String> = repos.iter().map(Repository::label).collect();
    let index = ui::fuzzy_select("Repository", &labels)?;
    let mut selection = repos[index].to_selection();
    selection.branch =
        ui::input_with_default("Branch to deploy", &selection.branch)?;

    session
        .logger
        .success(&format!("Selected {} ({})", selection.full_name, selection.branch));
    session.config.selected_repository = Some(selection);
    session.save_config()
}

pub fn clone(session: &mut Session) -> Result<(), AppError> {
    let selection = session
        .config
        .selected_repository
        .clone()
        .ok_or_else(|| AppError::Validation("No repository selected - run 'homelab github select'".into()))?;
    let dir = ensure_checkout(session, &selection)?;
    ui::key_values(&[("Checkout", dir.display().to_string())]);
    Ok(())
}

/// Clones the selected repository under `~/.homelab/repos`, or brings an
/// existing checkout to the tip of the selected branch.
pub fn ensure_checkout(session: &Session, selection: &RepositorySelection) -> Result<PathBuf, AppError> {
    let dir = paths::repos_dir()?.join(&selection.name);
    let token = credentials::resolve_token()?.map(|(token, _)| token);

    if GitProvider::is_repo(&dir) {
        let spinner = Spinner::new(&format!(
            "Updating {} ({})",
            selection.full_name, selection.branch
        ));
        match GitProvider::sync_branch(&dir, &selection.branch, token.as_deref(), &session.ctx) {
            Ok(true) => spinner.finish(&format!("{} at latest {}", selection.name, selection.branch)),
            Ok(false) => spinner.finish(&format!("{} already up to date", selection.name)),
            Err(e) => {
                spinner.finish_error("Update failed");
                return Err(e);
            }
        }
    } else {
        let spinner = Spinner::new(&format!("Cloning {}", selection.full_name));
        if let Some(parent) = dir.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if let Err(e) = GitProvider::clone(
            &selection.clone_url,
            &selection.branch,
            &dir,
            token.as_deref(),
            &session.ctx,
        ) {
            spinner.finish_error("Clone failed");
            return Err(e);
        }
        spinner.finish(&format!("Cloned into {}", dir.display()));
    }

    session
        .logger
        .info(&format!("Repository {} ready at {}", selection.full_name, dir.display()));
    Ok(dir)
}
