//! Website deployment targets, requests, and results.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::core::detection::{DeploymentKind, Runtime};
use crate::core::monitor::format_duration;

/// Where a website can be deployed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentTarget {
    AzureStaticWebApp,
    AzureAppService,
    AzureContainerApp,
    Vercel,
    Netlify,
    Aws,
    Gcp,
}

impl DeploymentTarget {
    pub fn all() -> &'static [DeploymentTarget] {
        &[
            Self::AzureStaticWebApp,
            Self::AzureAppService,
            Self::AzureContainerApp,
            Self::Vercel,
            Self::Netlify,
            Self::Aws,
            Self::Gcp,
        ]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::AzureStaticWebApp => "Azure Static Web Apps",
            Self::AzureAppService => "Azure App Service",
            Self::AzureContainerApp => "Azure Container Apps",
            Self::Vercel => "Vercel",
            Self::Netlify => "Netlify",
            Self::Aws => "AWS (not supported yet)",
            Self::Gcp => "Google Cloud (not supported yet)",
        }
    }

    pub fn is_azure(&self) -> bool {
        matches!(
            self,
            Self::AzureStaticWebApp | Self::AzureAppService | Self::AzureContainerApp
        )
    }

    /// Whether the target can serve this kind of site.
    pub fn supports(&self, kind: DeploymentKind) -> bool {
        match self {
            Self::AzureStaticWebApp | Self::Netlify => kind == DeploymentKind::Static,
            Self::AzureAppService => kind != DeploymentKind::ContainerApp,
            Self::AzureContainerApp => kind == DeploymentKind::ContainerApp,
            Self::Vercel => kind != DeploymentKind::ContainerApp,
            Self::Aws | Self::Gcp => true,
        }
    }

    /// Parses a CLI value such as `swa`, `appservice`, or `vercel`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "swa" | "static" | "staticwebapp" => Some(Self::AzureStaticWebApp),
            "appservice" | "webapp" | "app" => Some(Self::AzureAppService),
            "containerapp" | "container" | "ca" => Some(Self::AzureContainerApp),
            "vercel" => Some(Self::Vercel),
            "netlify" => Some(Self::Netlify),
            "aws" => Some(Self::Aws),
            "gcp" => Some(Self::Gcp),
            _ => None,
        }
    }
}

impl fmt::Display for DeploymentTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Default Azure target for a detected site kind.
pub fn recommended_target(kind: DeploymentKind) -> DeploymentTarget {
    match kind {
        DeploymentKind::Static => DeploymentTarget::AzureStaticWebApp,
        DeploymentKind::AppService => DeploymentTarget::AzureAppService,
        DeploymentKind::ContainerApp => DeploymentTarget::AzureContainerApp,
    }
}

/// Where the site's code comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteSource {
    /// A local directory uploaded by the provider CLI.
    Local(PathBuf),
    /// A GitHub repository connected for continuous deployment.
    GitHub {
        clone_url: String,
        branch: String,
        /// Local checkout, used for detection and CLI-based providers.
        checkout: PathBuf,
    },
}

impl SiteSource {
    /// Directory the provider CLIs run against.
    pub fn local_dir(&self) -> &PathBuf {
        match self {
            SiteSource::Local(path) => path,
            SiteSource::GitHub { checkout, .. } => checkout,
        }
    }
}

/// Everything a hosting provider needs to deploy one site.
#[derive(Debug, Clone)]
pub struct DeployRequest {
    /// Short site name, e.g. `blog`; combined with the naming scheme for Azure.
    pub site_name: String,
    pub kind: DeploymentKind,
    pub runtime: Option<Runtime>,
    pub source: SiteSource,
    /// Static output folder relative to the source ("" = root).
    pub output_dir: Option<String>,
    pub resource_group: String,
    pub location: String,
    /// Fully resolved Azure resource name for the site.
    pub resource_name: String,
    pub app_service_plan: String,
    /// Tags applied to a resource group this deployment creates.
    pub tags: Vec<(String, String)>,
    pub custom_domain: Option<String>,
    pub container_port: u16,
}

/// Outcome status of a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentStatus {
    Succeeded,
    Failed,
    InProgress,
    NotSupported,
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::InProgress => "In progress",
            Self::NotSupported => "Not supported",
        };
        write!(f, "{}", label)
    }
}

/// Result of a website deployment.
#[derive(Debug, Clone)]
pub struct DeploymentResult {
    pub status: DeploymentStatus,
    pub target: DeploymentTarget,
    pub resource_group: Option<String>,
    pub url: Option<String>,
    pub resources_created: Vec<String>,
    pub error: Option<String>,
    pub duration: Duration,
}

impl DeploymentResult {
    pub fn new(target: DeploymentTarget) -> Self {
        Self {
            status: DeploymentStatus::InProgress,
            target,
            resource_group: None,
            url: None,
            resources_created: Vec::new(),
            error: None,
            duration: Duration::ZERO,
        }
    }

    pub fn not_supported(target: DeploymentTarget) -> Self {
        Self {
            status: DeploymentStatus::NotSupported,
            error: Some(format!("Deployment to {} is not supported yet", target)),
            ..Self::new(target)
        }
    }

    pub fn succeed(mut self, url: Option<String>) -> Self {
        self.status = DeploymentStatus::Succeeded;
        self.url = url;
        self
    }

    pub fn fail(mut self, error: impl fmt::Display) -> Self {
        self.status = DeploymentStatus::Failed;
        self.error = Some(error.to_string());
        self
    }

    pub fn created(&mut self, resource: impl Into<String>) {
        self.resources_created.push(resource.into());
    }

    pub fn is_success(&self) -> bool {
        self.status == DeploymentStatus::Succeeded
    }

    /// Rows for `ui::key_values`.
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        let mut rows = vec![
            ("Target", self.target.to_string()),
            ("Status", self.status.to_string()),
        ];
        if let Some(rg) = &self.resource_group {
            rows.push(("Resource group", rg.clone()));
        }
        if let Some(url) = &self.url {
            rows.push(("URL", url.clone()));
        }
        if !self.resources_created.is_empty() {
            rows.push(("Created", self.resources_created.join(", ")));
        }
        if let Some(error) = &self.error {
            rows.push(("Error", error.clone()));
        }
        rows.push(("Duration", format_duration(self.duration)));
        rows
    }
}

/// Prefixes `https://` to a bare hostname.
pub fn https_url(host: &str) -> Option<String> {
    let host = host.trim();
    if host.is_empty() {
        None
    } else if host.starts_with("http://") || host.starts_with("https://") {
        Some(host.to_string())
    } else {
        Some(format!("https://{}", host))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recommended_target() {
        assert_eq!(
            recommended_target(DeploymentKind::Static),
            DeploymentTarget::AzureStaticWebApp
        );
        assert_eq!(
            recommended_target(DeploymentKind::AppService),
            DeploymentTarget::AzureAppService
        );
        assert_eq!(
            recommended_target(DeploymentKind::ContainerApp),
            DeploymentTarget::AzureContainerApp
        );
    }

    #[test]
    fn test_recommended_target_supports_kind() {
        for kind in DeploymentKind::all() {
            assert!(recommended_target(*kind).supports(*kind));
        }
        assert!(!DeploymentTarget::Netlify.supports(DeploymentKind::ContainerApp));
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(DeploymentTarget::parse("SWA"), Some(DeploymentTarget::AzureStaticWebApp));
        assert_eq!(DeploymentTarget::parse("netlify"), Some(DeploymentTarget::Netlify));
        assert_eq!(DeploymentTarget::parse("heroku"), None);
    }

    #[test]
    fn test_not_supported_result() {
        let result = DeploymentResult::not_supported(DeploymentTarget::Aws);
        assert_eq!(result.status, DeploymentStatus::NotSupported);
        assert!(!result.is_success());
        assert!(result.error.unwrap().contains("AWS"));
    }

    #[test]
    fn test_summary_rows() {
        let mut result = DeploymentResult::new(DeploymentTarget::AzureStaticWebApp);
        result.resource_group = Some("dev-we-rg-homelab".into());
        result.created("dev-we-swa-blog");
        let result = result.succeed(https_url("blue-sky.azurestaticapps.net"));

        let rows = result.summary();
        assert!(rows.contains(&("URL", "https://blue-sky.azurestaticapps.net".to_string())));
        assert!(rows.contains(&("Created", "dev-we-swa-blog".to_string())));
    }

    #[test]
    fn test_https_url() {
        assert_eq!(https_url(""), None);
        assert_eq!(https_url("http://x.dev").as_deref(), Some("http://x.dev"));
    }
}
