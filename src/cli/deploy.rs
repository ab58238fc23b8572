//! Website deployment: detect the site type, pick a target, dispatch to its provider.

use std::path::{Path, PathBuf};

use crate::cli::{github, require_azure, run_action};
use crate::core::detection::{detect_deployment_type, DeploymentKind, DetectionResult};
use crate::core::error::AppError;
use crate::core::naming::ResourceKind;
use crate::core::session::Session;
use crate::core::website::{
    recommended_target, DeployRequest, DeploymentStatus, DeploymentTarget, SiteSource,
};
use crate::providers::hosting::create_hosting_provider;
use crate::ui::{self, Menu, MenuChoice, Spinner};
use crate::utils::{validate_app_name, validate_domain};

/// Port Container Apps expose when the Dockerfile does not say otherwise.
const CONTAINER_PORT: u16 = 80;

const MENU_ITEMS: &[&str] = &[
    "Deploy selected GitHub repository",
    "Deploy local directory",
    "Detect website type",
];

/// Options from the command line; missing values are prompted for.
#[derive(Debug, Default)]
pub struct DeployOptions {
    pub path: Option<PathBuf>,
    pub target: Option<String>,
    pub name: Option<String>,
    pub domain: Option<String>,
    pub use_repository: bool,
}

pub fn menu(session: &mut Session) -> Result<(), AppError> {
    loop {
        match Menu::new("Website deployment", MENU_ITEMS).run()? {
            MenuChoice::Back => return Ok(()),
            MenuChoice::Item(0) => run_action(session, "Website deployment", |s| {
                deploy(
                    s,
                    DeployOptions {
                        use_repository: true,
                        ..DeployOptions::default()
                    },
                )
            }),
            MenuChoice::Item(1) => run_action(session, "Website deployment", |s| {
                let path = ui::input_with_default("Project directory", ".")?;
                deploy(
                    s,
                    DeployOptions {
                        path: Some(PathBuf::from(path)),
                        ..DeployOptions::default()
                    },
                )
            }),
            MenuChoice::Item(_) => run_action(session, "Detect website type", |_| {
                let path = ui::input_with_default("Project directory", ".")?;
                detect(Path::new(&path))
            }),
        }
    }
}

/// Prints what `detect_deployment_type` finds in `path`.
pub fn detect(path: &Path) -> Result<(), AppError> {
    if !path.is_dir() {
        return Err(AppError::Validation(format!(
            "{} is not a directory",
            path.display()
        )));
    }
    let detection = detect_deployment_type(path);
    print_detection(&detection);
    Ok(())
}

fn print_detection(detection: &DetectionResult) {
    let mut rows = vec![
        (
            "Type",
            detection
                .kind
                .map(|k| k.display_name().to_string())
                .unwrap_or_else(|| "Unknown".into()),
        ),
        ("Confidence", detection.confidence.display().to_string()),
    ];
    if let Some(runtime) = &detection.runtime {
        rows.push(("Runtime", runtime.app_service_runtime()));
    }
    if let Some(root) = &detection.static_root {
        let shown = if root.is_empty() { "." } else { root.as_str() };
        rows.push(("Static output", shown.to_string()));
    }
    if !detection.detected_files.is_empty() {
        rows.push(("Detected from", detection.detected_files.join(", ")));
    }
    if let Some(kind) = detection.kind {
        rows.push(("Recommended target", recommended_target(kind).to_string()));
    }
    ui::key_values(&rows);
}

pub fn deploy(session: &mut Session, options: DeployOptions) -> Result<(), AppError> {
    let source = resolve_source(session, &options)?;
    let dir = source.local_dir().clone();
    if !dir.is_dir() && !session.ctx.is_dry_run() {
        return Err(AppError::Validation(format!(
            "{} is not a directory",
            dir.display()
        )));
    }

    ui::section("Detecting website type");
    let detection = detect_deployment_type(&dir);
    print_detection(&detection);
    let kind = match detection.kind {
        Some(kind) => kind,
        None => {
            ui::warning("Could not detect the website type");
            let kinds = DeploymentKind::all();
            let labels: Vec<&str> = kinds.iter().map(|k| k.display_name()).collect();
            kinds[ui::select("Website type", &labels)?]
        }
    };

    let target = choose_target(options.target.as_deref(), kind)?;
    if !target.supports(kind) {
        ui::warning(&format!(
            "{} is not a natural fit for a {} site",
            target.display_name(),
            kind.display_name()
        ));
        if !ui::confirm("Deploy anyway?", false)? {
            return Err(AppError::Cancelled);
        }
    }

    let site_name = match options.name {
        Some(name) => {
            validate_app_name(&name)?;
            name
        }
        None => {
            let default = default_site_name(&dir);
            ui::input_validated("Site name", default.as_deref(), validate_app_name)?
        }
    };

    let custom_domain = match options.domain {
        Some(domain) => {
            validate_domain(&domain)?;
            Some(domain)
        }
        None if target.is_azure() && options.target.is_none() => {
            match ui::input_optional("Custom domain (leave empty to skip)")? {
                Some(domain) => {
                    validate_domain(&domain)?;
                    Some(domain)
                }
                None => None,
            }
        }
        None => None,
    };

    if target.is_azure() {
        require_azure(session)?;
    }

    let names = session.names();
    let output_dir = match kind {
        DeploymentKind::Static => detection.static_root.clone(),
        _ => None,
    };

    let request = DeployRequest {
        resource_name: names.site(resource_kind(target, kind), &site_name),
        site_name,
        kind,
        runtime: detection.runtime.clone(),
        source,
        output_dir,
        resource_group: names.resource_group(),
        location: session.config.location.clone(),
        app_service_plan: names.app_service_plan(),
        tags: names.tags(),
        custom_domain,
        container_port: CONTAINER_PORT,
    };

    ui::section(&format!("Deploying to {}", target.display_name()));
    session.logger.info(&format!(
        "Deploying {} ({}) to {}",
        request.site_name,
        kind.display_name(),
        target.display_name()
    ));

    let provider = create_hosting_provider(target);
    let spinner = Spinner::new(&format!("Deploying with {}", provider.name()));
    let result = match provider.deploy(&request, &session.ctx) {
        Ok(result) => result,
        Err(e) => {
            spinner.finish_error("Deployment could not start");
            return Err(e);
        }
    };

    match result.status {
        DeploymentStatus::Succeeded => spinner.finish("Deployment finished"),
        DeploymentStatus::NotSupported => spinner.abandon(),
        _ => spinner.finish_error("Deployment failed"),
    }
    ui::key_values(&result.summary());

    match result.status {
        DeploymentStatus::Succeeded => {
            session.logger.success(&format!(
                "{} deployed{}",
                request.site_name,
                result
                    .url
                    .as_deref()
                    .map(|u| format!(" at {}", u))
                    .unwrap_or_default()
            ));
            if let Some(url) = &result.url {
                ui::url(url);
            }
            Ok(())
        }
        DeploymentStatus::NotSupported => {
            session.logger.warning(&format!(
                "{} deployments are not supported yet",
                target.display_name()
            ));
            Ok(())
        }
        _ => Err(AppError::Deploy(
            result
                .error
                .unwrap_or_else(|| "deployment failed".to_string()),
        )),
    }
}

fn resolve_source(session: &Session, options: &DeployOptions) -> Result<SiteSource, AppError> {
    if let Some(path) = &options.path {
        return Ok(SiteSource::Local(path.clone()));
    }

    let Some(repo) = session.config.selected_repository.clone() else {
        if options.use_repository {
            return Err(AppError::Validation(
                "No repository selected - run 'homelab github select'".into(),
            ));
        }
        return Ok(SiteSource::Local(PathBuf::from(".")));
    };

    let use_repository = options.use_repository
        || ui::confirm(
            &format!("Deploy the selected repository {}?", repo.full_name),
            true,
        )?;
    if !use_repository {
        return Ok(SiteSource::Local(PathBuf::from(".")));
    }

    let checkout = github::ensure_checkout(session, &repo)?;
    Ok(SiteSource::GitHub {
        clone_url: repo.clone_url,
        branch: repo.branch,
        checkout,
    })
}

fn choose_target(flag: Option<&str>, kind: DeploymentKind) -> Result<DeploymentTarget, AppError> {
    if let Some(raw) = flag {
        return DeploymentTarget::parse(raw)
            .ok_or_else(|| AppError::Validation(format!("Unknown deployment target '{}'", raw)));
    }

    let targets = DeploymentTarget::all();
    let recommended = recommended_target(kind);
    let labels: Vec<String> = targets
        .iter()
        .map(|t| {
            if *t == recommended {
                format!("{} (recommended)", t.display_name())
            } else {
                t.display_name().to_string()
            }
        })
        .collect();
    let default = targets.iter().position(|t| *t == recommended).unwrap_or(0);
    Ok(targets[ui::select_with_default("Deployment target", &labels, default)?])
}

/// Lowercased directory name, if it is a usable site name.
fn default_site_name(dir: &Path) -> Option<String> {
    let name = dir
        .canonicalize()
        .ok()?
        .file_name()?
        .to_string_lossy()
        .to_lowercase()
        .replace(['_', ' ', '.'], "-");
    validate_app_name(&name).ok().map(|_| name)
}

/// Azure resource type of the target. Other hosts name the project after the site kind.
fn resource_kind(target: DeploymentTarget, kind: DeploymentKind) -> ResourceKind {
    match target {
        DeploymentTarget::AzureStaticWebApp => ResourceKind::StaticWebApp,
        DeploymentTarget::AzureAppService => ResourceKind::WebApp,
        DeploymentTarget::AzureContainerApp => ResourceKind::ContainerApp,
        _ => match kind {
            DeploymentKind::Static => ResourceKind::StaticWebApp,
            DeploymentKind::AppService => ResourceKind::WebApp,
            DeploymentKind::ContainerApp => ResourceKind::ContainerApp,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_choose_target_from_flag() {
        assert_eq!(
            choose_target(Some("netlify"), DeploymentKind::Static).unwrap(),
            DeploymentTarget::Netlify
        );
        assert!(matches!(
            choose_target(Some("heroku"), DeploymentKind::Static),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_resource_kind_follows_azure_target() {
        let names = crate::core::naming::ResourceNames::new("dev", "we", "homelab");
        let name = |target, kind| names.site(resource_kind(target, kind), "blog");

        assert_eq!(
            name(DeploymentTarget::AzureAppService, DeploymentKind::Static),
            "dev-we-app-blog"
        );
        assert_eq!(
            name(DeploymentTarget::AzureContainerApp, DeploymentKind::Static),
            "dev-we-ca-blog"
        );
        assert_eq!(
            name(DeploymentTarget::AzureStaticWebApp, DeploymentKind::AppService),
            "dev-we-swa-blog"
        );
    }

    #[test]
    fn test_default_site_name() {
        let dir = tempdir().unwrap();
        let site = dir.path().join("My_Blog");
        std::fs::create_dir(&site).unwrap();
        assert_eq!(default_site_name(&site).as_deref(), Some("my-blog"));
    }
}
