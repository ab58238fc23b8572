//! Website hosting providers.
//!
//! One implementation per `DeploymentTarget`. Azure targets go through
//! `AzureCli`; Vercel and Netlify shell out to their own CLIs.

use std::time::Instant;

use serde_json::Value;

use crate::core::context::ExecutionContext;
use crate::core::error::AppError;
use crate::core::website::{
    https_url, DeployRequest, DeploymentResult, DeploymentTarget, SiteSource,
};
use crate::providers::azure::{AzureCli, StaticWebAppSpec};

const STATIC_WEB_APP_SKU: &str = "Free";
const APP_SERVICE_SKU: &str = "B1";
const DEFAULT_RUNTIME: &str = "NODE:20-lts";

/// A place a website can be deployed to.
pub trait HostingProvider {
    fn target(&self) -> DeploymentTarget;

    fn name(&self) -> &str;

    /// External tools as `(command, version flag)` pairs.
    fn required_tools(&self, request: &DeployRequest) -> Vec<(&'static str, &'static str)>;

    /// Performs the provider calls. Returns the public URL when known.
    fn execute(
        &self,
        request: &DeployRequest,
        ctx: &ExecutionContext,
        result: &mut DeploymentResult,
    ) -> Result<Option<String>, AppError>;

    /// Deploys the site. Missing tools are an `Err`; anything that fails
    /// once provider calls have started is reported as a `Failed` result.
    fn deploy(
        &self,
        request: &DeployRequest,
        ctx: &ExecutionContext,
    ) -> Result<DeploymentResult, AppError> {
        for (tool, version_arg) in self.required_tools(request) {
            ctx.require_tool(tool, version_arg)?;
        }

        let started = Instant::now();
        let mut result = DeploymentResult::new(self.target());
        if self.target().is_azure() {
            result.resource_group = Some(request.resource_group.clone());
        }

        let outcome = self.execute(request, ctx, &mut result);
        result.duration = started.elapsed();

        Ok(match outcome {
            Ok(url) => result.succeed(url),
            Err(e) => result.fail(e),
        })
    }
}

/// Creates the provider for a target.
pub fn create_hosting_provider(target: DeploymentTarget) -> Box<dyn HostingProvider> {
    match target {
        DeploymentTarget::AzureStaticWebApp => Box::new(StaticWebAppProvider),
        DeploymentTarget::AzureAppService => Box::new(AppServiceProvider),
        DeploymentTarget::AzureContainerApp => Box::new(ContainerAppProvider),
        DeploymentTarget::Vercel => Box::new(VercelProvider),
        DeploymentTarget::Netlify => Box::new(NetlifyProvider),
        DeploymentTarget::Aws | DeploymentTarget::Gcp => Box::new(UnsupportedProvider(target)),
    }
}

fn ensure_group(
    az: &AzureCli<'_>,
    request: &DeployRequest,
    result: &mut DeploymentResult,
) -> Result<(), AppError> {
    if az.ensure_group(&request.resource_group, &request.location, &request.tags)? {
        result.created(request.resource_group.clone());
    }
    Ok(())
}

fn static_dir(request: &DeployRequest) -> std::path::PathBuf {
    let root = request.source.local_dir();
    match request.output_dir.as_deref() {
        Some(dir) if !dir.is_empty() => root.join(dir),
        _ => root.clone(),
    }
}

// === Azure Static Web Apps ===

pub struct StaticWebAppProvider;

impl HostingProvider for StaticWebAppProvider {
    fn target(&self) -> DeploymentTarget {
        DeploymentTarget::AzureStaticWebApp
    }

    fn name(&self) -> &str {
        "staticwebapp"
    }

    fn required_tools(&self, _request: &DeployRequest) -> Vec<(&'static str, &'static str)> {
        vec![("az", "version"), ("swa", "--version")]
    }

    fn execute(
        &self,
        request: &DeployRequest,
        ctx: &ExecutionContext,
        result: &mut DeploymentResult,
    ) -> Result<Option<String>, AppError> {
        let az = AzureCli::new(ctx);
        ensure_group(&az, request, result)?;

        az.create_static_web_app(&StaticWebAppSpec {
            name: &request.resource_name,
            resource_group: &request.resource_group,
            location: &request.location,
            sku: STATIC_WEB_APP_SKU,
        })?;
        result.created(request.resource_name.clone());

        // GitHub sources upload their local checkout too. The SWA CLI reads
        // the deployment token from the environment.
        let token =
            az.static_web_app_deployment_token(&request.resource_name, &request.resource_group)?;
        let dir = static_dir(request);
        let dir_arg = dir.to_string_lossy();
        ctx.run_command_with_env(
            "swa",
            &["deploy", &*dir_arg, "--env", "production"],
            None,
            &[("SWA_CLI_DEPLOYMENT_TOKEN", token.as_str())],
        )?
        .ensure_success("swa deploy failed")?;

        if let Some(domain) = &request.custom_domain {
            az.static_web_app_set_hostname(&request.resource_name, &request.resource_group, domain)?;
        }

        let host = az.static_web_app_hostname(&request.resource_name, &request.resource_group)?;
        Ok(https_url(&host))
    }
}

// === Azure App Service ===

pub struct AppServiceProvider;

impl HostingProvider for AppServiceProvider {
    fn target(&self) -> DeploymentTarget {
        DeploymentTarget::AzureAppService
    }

    fn name(&self) -> &str {
        "appservice"
    }

    fn required_tools(&self, _request: &DeployRequest) -> Vec<(&'static str, &'static str)> {
        vec![("az", "version")]
    }

    fn execute(
        &self,
        request: &DeployRequest,
        ctx: &ExecutionContext,
        result: &mut DeploymentResult,
    ) -> Result<Option<String>, AppError> {
        let az = AzureCli::new(ctx);
        ensure_group(&az, request, result)?;

        let runtime = request
            .runtime
            .as_ref()
            .map(|r| r.app_service_runtime())
            .unwrap_or_else(|| DEFAULT_RUNTIME.to_string());

        match &request.source {
            SiteSource::GitHub {
                clone_url, branch, ..
            } => {
                az.create_app_service_plan(
                    &request.app_service_plan,
                    &request.resource_group,
                    &request.location,
                    APP_SERVICE_SKU,
                )?;
                result.created(request.app_service_plan.clone());
                az.create_web_app(
                    &request.resource_name,
                    &request.resource_group,
                    &request.app_service_plan,
                    &runtime,
                )?;
                result.created(request.resource_name.clone());
                az.web_app_source_config(
                    &request.resource_name,
                    &request.resource_group,
                    clone_url,
                    branch,
                )?;
            }
            SiteSource::Local(dir) => {
                // `webapp up` creates the plan and app when they are missing.
                az.web_app_up(
                    dir,
                    &request.resource_name,
                    &request.resource_group,
                    &request.app_service_plan,
                    &runtime,
                    &request.location,
                )?;
                result.created(request.resource_name.clone());
            }
        }

        if let Some(domain) = &request.custom_domain {
            az.web_app_add_hostname(&request.resource_name, &request.resource_group, domain)?;
        }

        let host = az.web_app_hostname(&request.resource_name, &request.resource_group)?;
        Ok(https_url(&host))
    }
}

// === Azure Container Apps ===

pub struct ContainerAppProvider;

impl HostingProvider for ContainerAppProvider {
    fn target(&self) -> DeploymentTarget {
        DeploymentTarget::AzureContainerApp
    }

    fn name(&self) -> &str {
        "containerapp"
    }

    fn required_tools(&self, _request: &DeployRequest) -> Vec<(&'static str, &'static str)> {
        vec![("az", "version")]
    }

    fn execute(
        &self,
        request: &DeployRequest,
        ctx: &ExecutionContext,
        result: &mut DeploymentResult,
    ) -> Result<Option<String>, AppError> {
        let az = AzureCli::new(ctx);
        ensure_group(&az, request, result)?;

        az.container_app_up(
            request.source.local_dir(),
            &request.resource_name,
            &request.resource_group,
            &request.location,
            request.container_port,
        )?;
        result.created(request.resource_name.clone());

        let fqdn = az.container_app_fqdn(&request.resource_name, &request.resource_group)?;
        Ok(https_url(&fqdn))
    }
}

// === Vercel ===

pub struct VercelProvider;

impl HostingProvider for VercelProvider {
    fn target(&self) -> DeploymentTarget {
        DeploymentTarget::Vercel
    }

    fn name(&self) -> &str {
        "vercel"
    }

    fn required_tools(&self, _request: &DeployRequest) -> Vec<(&'static str, &'static str)> {
        vec![("vercel", "--version")]
    }

    fn execute(
        &self,
        request: &DeployRequest,
        ctx: &ExecutionContext,
        result: &mut DeploymentResult,
    ) -> Result<Option<String>, AppError> {
        let output = ctx.run_command_in(
            request.source.local_dir(),
            "vercel",
            &["deploy", "--prod", "--yes"],
        )?;
        output.ensure_success("vercel deploy failed")?;
        result.created(request.site_name.clone());

        // The deployment URL is the last line vercel prints to stdout.
        Ok(output
            .stdout
            .lines()
            .rev()
            .find(|l| l.trim().starts_with("https://"))
            .map(|l| l.trim().to_string()))
    }
}

// === Netlify ===

pub struct NetlifyProvider;

impl HostingProvider for NetlifyProvider {
    fn target(&self) -> DeploymentTarget {
        DeploymentTarget::Netlify
    }

    fn name(&self) -> &str {
        "netlify"
    }

    fn required_tools(&self, _request: &DeployRequest) -> Vec<(&'static str, &'static str)> {
        vec![("netlify", "--version")]
    }

    fn execute(
        &self,
        request: &DeployRequest,
        ctx: &ExecutionContext,
        result: &mut DeploymentResult,
    ) -> Result<Option<String>, AppError> {
        let dir = static_dir(request);
        let dir_arg = dir.to_string_lossy();
        let output = ctx.run_command_in(
            request.source.local_dir(),
            "netlify",
            &["deploy", "--prod", "--dir", &*dir_arg, "--json"],
        )?;
        output.ensure_success("netlify deploy failed")?;
        result.created(request.site_name.clone());
        Ok(parse_netlify_url(&output.stdout))
    }
}

fn parse_netlify_url(stdout: &str) -> Option<String> {
    let json: Value = serde_json::from_str(stdout).ok()?;
    ["url", "deploy_url"]
        .iter()
        .find_map(|key| json.get(key).and_then(Value::as_str))
        .map(str::to_string)
}

// === AWS / GCP ===

pub struct UnsupportedProvider(DeploymentTarget);

impl HostingProvider for UnsupportedProvider {
    fn target(&self) -> DeploymentTarget {
        self.0
    }

    fn name(&self) -> &str {
        match self.0 {
            DeploymentTarget::Aws => "aws",
            _ => "gcp",
        }
    }

    fn required_tools(&self, _request: &DeployRequest) -> Vec<(&'static str, &'static str)> {
        Vec::new()
    }

    fn execute(
        &self,
        _request: &DeployRequest,
        _ctx: &ExecutionContext,
        _result: &mut DeploymentResult,
    ) -> Result<Option<String>, AppError> {
        Err(AppError::Deploy(format!("{} is not supported", self.0)))
    }

    fn deploy(
        &self,
        _request: &DeployRequest,
        _ctx: &ExecutionContext,
    ) -> Result<DeploymentResult, AppError> {
        Ok(DeploymentResult::not_supported(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::detection::{DeploymentKind, Runtime};
    use crate::core::website::DeploymentStatus;
    use std::path::PathBuf;

    fn request(source: SiteSource, kind: DeploymentKind) -> DeployRequest {
        DeployRequest {
            site_name: "blog".into(),
            kind,
            runtime: Some(Runtime::Node { version: None }),
            source,
            output_dir: Some("dist".into()),
            resource_group: "dev-we-rg-homelab".into(),
            location: "westeurope".into(),
            resource_name: "dev-we-swa-blog".into(),
            app_service_plan: "dev-we-asp-homelab".into(),
            tags: Vec::new(),
            custom_domain: None,
            container_port: 80,
        }
    }

    #[test]
    fn test_factory_names() {
        for target in DeploymentTarget::all() {
            let provider = create_hosting_provider(*target);
            assert_eq!(provider.target(), *target);
            assert!(!provider.name().is_empty());
        }
    }

    #[test]
    fn test_aws_and_gcp_not_supported() {
        let ctx = ExecutionContext::new(true, false);
        let req = request(SiteSource::Local(PathBuf::from("/srv/site")), DeploymentKind::Static);

        for target in [DeploymentTarget::Aws, DeploymentTarget::Gcp] {
            let result = create_hosting_provider(target).deploy(&req, &ctx).unwrap();
            assert_eq!(result.status, DeploymentStatus::NotSupported);
        }
        assert!(ctx.planned_commands().is_empty());
    }

    #[test]
    fn test_static_web_app_local_upload_plan() {
        let ctx = ExecutionContext::new(true, false);
        let req = request(SiteSource::Local(PathBuf::from("/srv/site")), DeploymentKind::Static);

        let result = StaticWebAppProvider.deploy(&req, &ctx).unwrap();
        assert!(result.is_success());
        assert_eq!(result.resource_group.as_deref(), Some("dev-we-rg-homelab"));

        let plan = ctx.planned_commands();
        assert!(plan.iter().any(|c| c.starts_with("az staticwebapp create --name dev-we-swa-blog")));
        assert!(plan.iter().any(|c| c == "swa deploy /srv/site/dist --env production"));
    }

    #[test]
    fn test_static_web_app_from_github_uploads_checkout() {
        let ctx = ExecutionContext::new(true, false);
        let req = request(
            SiteSource::GitHub {
                clone_url: "https://github.com/octo/blog.git".into(),
                branch: "main".into(),
                checkout: PathBuf::from("/home/octo/.homelab/repos/blog"),
            },
            DeploymentKind::Static,
        );

        let result = StaticWebAppProvider.deploy(&req, &ctx).unwrap();
        assert!(result.is_success());

        let plan = ctx.planned_commands();
        assert!(plan
            .iter()
            .any(|c| c == "swa deploy /home/octo/.homelab/repos/blog/dist --env production"));
        for command in plan.iter().filter(|c| c.starts_with("az ")) {
            assert!(!command.contains("--source"), "{}", command);
            assert!(!command.contains("--token"), "{}", command);
        }
    }

    #[test]
    fn test_app_service_local_uses_webapp_up() {
        let ctx = ExecutionContext::new(true, false);
        let mut req = request(
            SiteSource::Local(PathBuf::from("/srv/api")),
            DeploymentKind::AppService,
        );
        req.resource_name = "dev-we-app-api".into();

        let result = AppServiceProvider.deploy(&req, &ctx).unwrap();
        assert!(result.is_success());
        assert!(ctx
            .planned_commands()
            .iter()
            .any(|c| c.starts_with("az webapp up --name dev-we-app-api") && c.contains("NODE:20-lts")));
    }

    #[test]
    fn test_parse_netlify_url() {
        let stdout = r#"{"site_id":"1","deploy_url":"https://abc--site.netlify.app","url":"https://site.netlify.app"}"#;
        assert_eq!(
            parse_netlify_url(stdout).as_deref(),
            Some("https://site.netlify.app")
        );
        assert_eq!(parse_netlify_url("not json"), None);
    }
}
