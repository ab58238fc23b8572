//! Azure resource names derived from the configuration.
//!
//! Every name follows `{env}-{loc}-{kind}-{project}`, e.g. `dev-we-rg-homelab`.

use std::fmt;

use crate::core::config::HomelabConfig;

/// Subnet that hosts workloads and gets the NAT gateway attached.
pub const DEFAULT_SUBNET: &str = "default";
/// Subnet name Azure requires for virtual network gateways.
pub const GATEWAY_SUBNET: &str = "GatewaySubnet";

/// Resource kinds that appear in names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    ResourceGroup,
    VirtualNetwork,
    VpnGateway,
    VpnGatewayPublicIp,
    NatGateway,
    NatGatewayPublicIp,
    AppServicePlan,
    StaticWebApp,
    WebApp,
    ContainerApp,
}

impl ResourceKind {
    /// Abbreviation used in the resource name.
    pub fn abbreviation(&self) -> &'static str {
        match self {
            Self::ResourceGroup => "rg",
            Self::VirtualNetwork => "vnet",
            Self::VpnGateway => "vpng",
            Self::VpnGatewayPublicIp => "pip-vpng",
            Self::NatGateway => "natgw",
            Self::NatGatewayPublicIp => "pip-natgw",
            Self::AppServicePlan => "asp",
            Self::StaticWebApp => "swa",
            Self::WebApp => "app",
            Self::ContainerApp => "ca",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.abbreviation())
    }
}

/// Name builder bound to an env/loc/project triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNames {
    env: String,
    loc: String,
    project: String,
}

impl ResourceNames {
    pub fn new(env: &str, loc: &str, project: &str) -> Self {
        Self {
            env: env.to_string(),
            loc: loc.to_string(),
            project: project.to_string(),
        }
    }

    pub fn from_config(config: &HomelabConfig) -> Self {
        Self::new(&config.env, &config.loc, &config.project)
    }

    /// Builds the name for a resource kind.
    pub fn name(&self, kind: ResourceKind) -> String {
        format!(
            "{}-{}-{}-{}",
            self.env,
            self.loc,
            kind.abbreviation(),
            self.project
        )
    }

    /// Name for a per-site resource, e.g. `dev-we-app-blog`.
    pub fn site(&self, kind: ResourceKind, site: &str) -> String {
        format!("{}-{}-{}-{}", self.env, self.loc, kind.abbreviation(), site)
    }

    pub fn resource_group(&self) -> String {
        self.name(ResourceKind::ResourceGroup)
    }

    pub fn vnet(&self) -> String {
        self.name(ResourceKind::VirtualNetwork)
    }

    pub fn vpn_gateway(&self) -> String {
        self.name(ResourceKind::VpnGateway)
    }

    pub fn nat_gateway(&self) -> String {
        self.name(ResourceKind::NatGateway)
    }

    pub fn app_service_plan(&self) -> String {
        self.name(ResourceKind::AppServicePlan)
    }

    /// Tags applied to everything the console creates.
    pub fn tags(&self) -> Vec<(String, String)> {
        vec![
            ("environment".to_string(), self.env.clone()),
            ("project".to_string(), self.project.clone()),
            ("managedBy".to_string(), "homelab".to_string()),
        ]
    }

    pub fn env(&self) -> &str {
        &self.env
    }

    pub fn loc(&self) -> &str {
        &self.loc
    }

    pub fn project(&self) -> &str {
        &self.project
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_group_name() {
        let names = ResourceNames::new("dev", "we", "homelab");
        assert_eq!(names.resource_group(), "dev-we-rg-homelab");
    }

    #[test]
    fn test_network_names() {
        let names = ResourceNames::new("prod", "eus", "lab");
        assert_eq!(names.vnet(), "prod-eus-vnet-lab");
        assert_eq!(names.vpn_gateway(), "prod-eus-vpng-lab");
        assert_eq!(names.nat_gateway(), "prod-eus-natgw-lab");
        assert_eq!(
            names.name(ResourceKind::VpnGatewayPublicIp),
            "prod-eus-pip-vpng-lab"
        );
    }

    #[test]
    fn test_site_names() {
        let names = ResourceNames::new("dev", "we", "homelab");
        assert_eq!(names.site(ResourceKind::WebApp, "blog"), "dev-we-app-blog");
    }

    #[test]
    fn test_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = HomelabConfig::default_in(dir.path());
        assert_eq!(
            ResourceNames::from_config(&config).resource_group(),
            "dev-we-rg-homelab"
        );
    }
}
