//! Bicep templates shipped with the binary.
//!
//! Templates are embedded at compile time and written to the temp directory
//! right before `az deployment group create` consumes them.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::core::error::AppError;
use crate::core::monitor::MonitorSettings;
use crate::core::naming::ResourceNames;

const NETWORK_TEMPLATE: &str = include_str!("../../infra/network.bicep");
const VPN_GATEWAY_TEMPLATE: &str = include_str!("../../infra/vpn-gateway.bicep");
const NAT_GATEWAY_TEMPLATE: &str = include_str!("../../infra/nat-gateway.bicep");

/// Infrastructure pieces that have a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfraComponent {
    Network,
    VpnGateway,
    NatGateway,
}

impl InfraComponent {
    /// Deployment order: the gateways need the network.
    pub fn all() -> &'static [InfraComponent] {
        &[Self::Network, Self::VpnGateway, Self::NatGateway]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Network => "Virtual network",
            Self::VpnGateway => "VPN gateway",
            Self::NatGateway => "NAT gateway",
        }
    }

    pub fn template_file_name(&self) -> &'static str {
        match self {
            Self::Network => "network.bicep",
            Self::VpnGateway => "vpn-gateway.bicep",
            Self::NatGateway => "nat-gateway.bicep",
        }
    }

    pub fn template_source(&self) -> &'static str {
        match self {
            Self::Network => NETWORK_TEMPLATE,
            Self::VpnGateway => VPN_GATEWAY_TEMPLATE,
            Self::NatGateway => NAT_GATEWAY_TEMPLATE,
        }
    }

    /// Short slug used in deployment names.
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::VpnGateway => "vpn-gateway",
            Self::NatGateway => "nat-gateway",
        }
    }

    /// Components that must exist before this one can be deployed.
    pub fn depends_on(&self) -> &'static [InfraComponent] {
        match self {
            Self::Network => &[],
            Self::VpnGateway | Self::NatGateway => &[Self::Network],
        }
    }

    pub fn monitor_settings(&self) -> MonitorSettings {
        match self {
            Self::Network => MonitorSettings::network(),
            Self::VpnGateway => MonitorSettings::vpn_gateway(),
            Self::NatGateway => MonitorSettings::nat_gateway(),
        }
    }

    /// Unique deployment name, e.g. `homelab-network-20240501T101500`.
    pub fn deployment_name(&self) -> String {
        format!(
            "homelab-{}-{}",
            self.slug(),
            Utc::now().format("%Y%m%dT%H%M%S")
        )
    }
}

impl fmt::Display for InfraComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Writes a component's template into `dir` and returns its path.
pub fn write_template(component: InfraComponent, dir: &Path) -> Result<PathBuf, AppError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(component.template_file_name());
    fs::write(&path, component.template_source()).map_err(|e| {
        AppError::Deploy(format!(
            "Failed to write template {}: {}",
            path.display(),
            e
        ))
    })?;
    Ok(path)
}

/// `key=value` parameters every template accepts.
pub fn template_parameters(names: &ResourceNames, location: &str) -> Vec<String> {
    vec![
        format!("env={}", names.env()),
        format!("loc={}", names.loc()),
        format!("project={}", names.project()),
        format!("location={}", location),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_templates_declare_naming_parameters() {
        for component in InfraComponent::all() {
            let source = component.template_source();
            for param in ["param env string", "param loc string", "param project string"] {
                assert!(
                    source.contains(param),
                    "{} is missing '{}'",
                    component.template_file_name(),
                    param
                );
            }
        }
    }

    #[test]
    fn test_write_template() {
        let dir = tempdir().unwrap();
        let path = write_template(InfraComponent::NatGateway, dir.path()).unwrap();
        assert!(path.ends_with("nat-gateway.bicep"));
        let written = fs::read_to_string(path).unwrap();
        assert!(written.contains("Microsoft.Network/natGateways"));
    }

    #[test]
    fn test_template_parameters() {
        let names = ResourceNames::new("dev", "we", "homelab");
        assert_eq!(
            template_parameters(&names, "westeurope"),
            vec!["env=dev", "loc=we", "project=homelab", "location=westeurope"]
        );
    }

    #[test]
    fn test_deployment_name_has_slug() {
        assert!(InfraComponent::VpnGateway
            .deployment_name()
            .starts_with("homelab-vpn-gateway-"));
    }
}
