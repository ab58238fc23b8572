//! Azure CLI (`az`) wrapper.
//!
//! Every method is a single `az` invocation; output is requested as JSON or
//! TSV and parsed here so the command handlers only see typed values.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::core::context::{CommandOutput, ExecutionContext};
use crate::core::error::AppError;
use crate::core::monitor::{DeploymentMonitor, MonitorOutcome, ProvisioningProbe, ProvisioningState};

/// Markers `az` prints when a resource does not exist.
const NOT_FOUND_MARKERS: &[&str] = &[
    "ResourceNotFound",
    "ResourceGroupNotFound",
    "NotFound",
    "was not found",
    "could not be found",
];

/// The signed-in subscription, from `az account show`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AzureAccount {
    pub name: String,
    pub id: String,
    #[serde(default)]
    pub tenant_id: String,
    pub user: AzureUser,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AzureUser {
    pub name: String,
    #[serde(rename = "type", default)]
    pub user_type: String,
}

impl AzureAccount {
    fn dry_run() -> Self {
        Self {
            name: "dry-run subscription".into(),
            id: "00000000-0000-0000-0000-000000000000".into(),
            tenant_id: String::new(),
            user: AzureUser {
                name: "dry-run".into(),
                user_type: "user".into(),
            },
        }
    }
}

/// Parameters for `az staticwebapp create`.
#[derive(Debug, Clone)]
pub struct StaticWebAppSpec<'a> {
    pub name: &'a str,
    pub resource_group: &'a str,
    pub location: &'a str,
    pub sku: &'a str,
}

/// Azure CLI wrapper bound to an execution context.
pub struct AzureCli<'a> {
    ctx: &'a ExecutionContext,
}

impl<'a> AzureCli<'a> {
    pub fn new(ctx: &'a ExecutionContext) -> Self {
        Self { ctx }
    }

    /// Runs `az` and returns trimmed stdout, mapping failures to `AzureCli`/`NotLoggedIn`.
    fn az(&self, args: &[&str]) -> Result<CommandOutput, AppError> {
        let output = self.ctx.run_command("az", args)?;
        if output.success {
            return Ok(output);
        }
        Err(classify_failure(&output))
    }

    /// Runs a `show`-style query, mapping "not found" to `NotFound`.
    fn state_query(&self, args: &[&str]) -> Result<ProvisioningState, AppError> {
        let output = self.ctx.run_command("az", args)?;
        if output.dry_run {
            return Ok(ProvisioningState::NotFound);
        }
        if output.success {
            return Ok(ProvisioningState::parse(&output.stdout));
        }
        if is_not_found(&output.stderr) {
            return Ok(ProvisioningState::NotFound);
        }
        Err(classify_failure(&output))
    }

    /// Fails with `ToolMissing` if the Azure CLI is not installed.
    pub fn ensure_cli(&self) -> Result<(), AppError> {
        self.ctx.require_tool("az", "version")
    }

    // === Account ===

    pub fn account(&self) -> Result<AzureAccount, AppError> {
        let output = self.az(&["account", "show", "--output", "json"])?;
        if output.dry_run {
            return Ok(AzureAccount::dry_run());
        }
        serde_json::from_str(&output.stdout)
            .map_err(|e| AppError::AzureCli(format!("Unexpected 'az account show' output: {}", e)))
    }

    /// Interactive `az login` (opens a browser or prints a device code).
    pub fn login(&self) -> Result<(), AppError> {
        self.ctx
            .run_command_streaming("az", &["login"])?
            .ensure_success("az login failed")
    }

    /// Returns the account, or `NotLoggedIn` when there is no usable session.
    pub fn ensure_logged_in(&self) -> Result<AzureAccount, AppError> {
        self.ensure_cli()?;
        self.account()
    }

    // === Resource groups ===

    pub fn group_exists(&self, name: &str) -> Result<bool, AppError> {
        let output = self.az(&["group", "exists", "--name", name])?;
        Ok(output.stdout.trim() == "true")
    }

    pub fn create_group(
        &self,
        name: &str,
        location: &str,
        tags: &[(String, String)],
    ) -> Result<(), AppError> {
        let tag_args: Vec<String> = tags.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        let mut args = vec![
            "group", "create", "--name", name, "--location", location, "--output", "none",
        ];
        if !tag_args.is_empty() {
            args.push("--tags");
            args.extend(tag_args.iter().map(String::as_str));
        }
        self.az(&args)?;
        Ok(())
    }

    /// Creates the group if missing. Returns true when it was created.
    pub fn ensure_group(
        &self,
        name: &str,
        location: &str,
        tags: &[(String, String)],
    ) -> Result<bool, AppError> {
        if self.group_exists(name)? {
            return Ok(false);
        }
        self.create_group(name, location, tags)?;
        Ok(true)
    }

    pub fn show_group(&self, name: &str) -> Result<ProvisioningState, AppError> {
        self.state_query(&[
            "group",
            "show",
            "--name",
            name,
            "--query",
            "properties.provisioningState",
            "--output",
            "tsv",
        ])
    }

    pub fn delete_group(&self, name: &str, no_wait: bool) -> Result<(), AppError> {
        let mut args = vec!["group", "delete", "--name", name, "--yes"];
        if no_wait {
            args.push("--no-wait");
        }
        self.az(&args)?;
        Ok(())
    }

    /// Deletes a resource group and blocks until Azure reports it gone.
    pub fn reset_resource_group(
        &self,
        name: &str,
        monitor: &DeploymentMonitor,
    ) -> Result<MonitorOutcome, AppError> {
        if !self.group_exists(name)? && !self.ctx.is_dry_run() {
            return Ok(MonitorOutcome::Succeeded {
                elapsed: Duration::ZERO,
            });
        }
        self.delete_group(name, true)?;
        let mut probe = GroupDeletionProbe::new(self.ctx.clone(), name);
        Ok(monitor.run(&mut probe, |_, _| {}))
    }

    // === Template deployments ===

    pub fn deploy_template(
        &self,
        resource_group: &str,
        deployment_name: &str,
        template: &Path,
        parameters: &[String],
        no_wait: bool,
    ) -> Result<(), AppError> {
        let template = template.to_string_lossy();
        let mut args = vec![
            "deployment",
            "group",
            "create",
            "--resource-group",
            resource_group,
            "--name",
            deployment_name,
            "--template-file",
            &*template,
            "--output",
            "none",
        ];
        if !parameters.is_empty() {
            args.push("--parameters");
            args.extend(parameters.iter().map(String::as_str));
        }
        if no_wait {
            args.push("--no-wait");
        }
        self.az(&args)?;
        Ok(())
    }

    pub fn deployment_state(
        &self,
        resource_group: &str,
        deployment_name: &str,
    ) -> Result<ProvisioningState, AppError> {
        self.state_query(&[
            "deployment",
            "group",
            "show",
            "--resource-group",
            resource_group,
            "--name",
            deployment_name,
            "--query",
            "properties.provisioningState",
            "--output",
            "tsv",
        ])
    }

    /// Error message of a failed deployment, if Azure recorded one.
    pub fn deployment_error(
        &self,
        resource_group: &str,
        deployment_name: &str,
    ) -> Result<Option<String>, AppError> {
        let output = self.az(&[
            "deployment",
            "group",
            "show",
            "--resource-group",
            resource_group,
            "--name",
            deployment_name,
            "--query",
            "properties.error.details[0].message || properties.error.message",
            "--output",
            "tsv",
        ])?;
        let message = output.stdout.trim();
        Ok(if message.is_empty() {
            None
        } else {
            Some(message.to_string())
        })
    }

    // === Network ===

    pub fn vnet_state(&self, resource_group: &str, name: &str) -> Result<ProvisioningState, AppError> {
        self.state_query(&[
            "network",
            "vnet",
            "show",
            "--resource-group",
            resource_group,
            "--name",
            name,
            "--query",
            "provisioningState",
            "--output",
            "tsv",
        ])
    }

    // === VPN gateway ===

    pub fn vpn_gateway_state(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<ProvisioningState, AppError> {
        self.state_query(&[
            "network",
            "vnet-gateway",
            "show",
            "--resource-group",
            resource_group,
            "--name",
            name,
            "--query",
            "provisioningState",
            "--output",
            "tsv",
        ])
    }

    pub fn start_vpn_gateway(&self, resource_group: &str, name: &str) -> Result<(), AppError> {
        self.az(&[
            "network",
            "vnet-gateway",
            "start",
            "--resource-group",
            resource_group,
            "--name",
            name,
            "--no-wait",
        ])?;
        Ok(())
    }

    pub fn stop_vpn_gateway(&self, resource_group: &str, name: &str) -> Result<(), AppError> {
        self.az(&[
            "network",
            "vnet-gateway",
            "stop",
            "--resource-group",
            resource_group,
            "--name",
            name,
            "--no-wait",
        ])?;
        Ok(())
    }

    /// Names of the root certificates uploaded to the gateway.
    pub fn list_root_certificates(
        &self,
        resource_group: &str,
        gateway: &str,
    ) -> Result<Vec<String>, AppError> {
        let output = self.az(&[
            "network",
            "vnet-gateway",
            "show",
            "--resource-group",
            resource_group,
            "--name",
            gateway,
            "--query",
            "vpnClientConfiguration.vpnClientRootCertificates[].name",
            "--output",
            "tsv",
        ])?;
        Ok(tsv_lines(&output.stdout))
    }

    pub fn add_root_certificate(
        &self,
        resource_group: &str,
        gateway: &str,
        cert_name: &str,
        public_cert_data: &str,
    ) -> Result<(), AppError> {
        self.az(&[
            "network",
            "vnet-gateway",
            "root-cert",
            "create",
            "--resource-group",
            resource_group,
            "--gateway-name",
            gateway,
            "--name",
            cert_name,
            "--public-cert-data",
            public_cert_data,
            "--output",
            "none",
        ])?;
        Ok(())
    }

    pub fn remove_root_certificate(
        &self,
        resource_group: &str,
        gateway: &str,
        cert_name: &str,
    ) -> Result<(), AppError> {
        self.az(&[
            "network",
            "vnet-gateway",
            "root-cert",
            "delete",
            "--resource-group",
            resource_group,
            "--gateway-name",
            gateway,
            "--name",
            cert_name,
        ])?;
        Ok(())
    }

    /// Generates the VPN client package and returns its download URL.
    pub fn generate_vpn_client_package(
        &self,
        resource_group: &str,
        gateway: &str,
    ) -> Result<String, AppError> {
        let output = self.az(&[
            "network",
            "vnet-gateway",
            "vpn-client",
            "generate",
            "--resource-group",
            resource_group,
            "--name",
            gateway,
            "--processor-architecture",
            "Amd64",
            "--output",
            "tsv",
        ])?;
        Ok(output.stdout.trim().trim_matches('"').to_string())
    }

    // === NAT gateway ===

    pub fn nat_gateway_state(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<ProvisioningState, AppError> {
        self.state_query(&[
            "network",
            "nat",
            "gateway",
            "show",
            "--resource-group",
            resource_group,
            "--name",
            name,
            "--query",
            "provisioningState",
            "--output",
            "tsv",
        ])
    }

    /// Removes the NAT gateway association from a subnet.
    pub fn detach_nat_gateway(
        &self,
        resource_group: &str,
        vnet: &str,
        subnet: &str,
    ) -> Result<(), AppError> {
        self.az(&[
            "network",
            "vnet",
            "subnet",
            "update",
            "--resource-group",
            resource_group,
            "--vnet-name",
            vnet,
            "--name",
            subnet,
            "--remove",
            "natGateway",
            "--output",
            "none",
        ])?;
        Ok(())
    }

    /// Associates a NAT gateway with a subnet.
    pub fn attach_nat_gateway(
        &self,
        resource_group: &str,
        vnet: &str,
        subnet: &str,
        nat_gateway: &str,
    ) -> Result<(), AppError> {
        self.az(&[
            "network",
            "vnet",
            "subnet",
            "update",
            "--resource-group",
            resource_group,
            "--vnet-name",
            vnet,
            "--name",
            subnet,
            "--nat-gateway",
            nat_gateway,
            "--output",
            "none",
        ])?;
        Ok(())
    }

    pub fn delete_nat_gateway(&self, resource_group: &str, name: &str) -> Result<(), AppError> {
        self.az(&[
            "network",
            "nat",
            "gateway",
            "delete",
            "--resource-group",
            resource_group,
            "--name",
            name,
        ])?;
        Ok(())
    }

    pub fn delete_public_ip(&self, resource_group: &str, name: &str) -> Result<(), AppError> {
        self.az(&[
            "network",
            "public-ip",
            "delete",
            "--resource-group",
            resource_group,
            "--name",
            name,
        ])?;
        Ok(())
    }

    // === Static Web Apps ===

    pub fn create_static_web_app(&self, spec: &StaticWebAppSpec<'_>) -> Result<(), AppError> {
        self.az(&[
            "staticwebapp",
            "create",
            "--name",
            spec.name,
            "--resource-group",
            spec.resource_group,
            "--location",
            spec.location,
            "--sku",
            spec.sku,
            "--output",
            "none",
        ])?;
        Ok(())
    }

    pub fn static_web_app_hostname(
        &self,
        name: &str,
        resource_group: &str,
    ) -> Result<String, AppError> {
        let output = self.az(&[
            "staticwebapp",
            "show",
            "--name",
            name,
            "--resource-group",
            resource_group,
            "--query",
            "defaultHostname",
            "--output",
            "tsv",
        ])?;
        Ok(output.stdout.trim().to_string())
    }

    /// Deployment token used by the SWA CLI for local uploads.
    pub fn static_web_app_deployment_token(
        &self,
        name: &str,
        resource_group: &str,
    ) -> Result<String, AppError> {
        let output = self.az(&[
            "staticwebapp",
            "secrets",
            "list",
            "--name",
            name,
            "--resource-group",
            resource_group,
            "--query",
            "properties.apiKey",
            "--output",
            "tsv",
        ])?;
        Ok(output.stdout.trim().to_string())
    }

    pub fn static_web_app_set_hostname(
        &self,
        name: &str,
        resource_group: &str,
        hostname: &str,
    ) -> Result<(), AppError> {
        self.az(&[
            "staticwebapp",
            "hostname",
            "set",
            "--name",
            name,
            "--resource-group",
            resource_group,
            "--hostname",
            hostname,
            "--no-wait",
        ])?;
        Ok(())
    }

    // === App Service ===

    pub fn create_app_service_plan(
        &self,
        name: &str,
        resource_group: &str,
        location: &str,
        sku: &str,
    ) -> Result<(), AppError> {
        self.az(&[
            "appservice",
            "plan",
            "create",
            "--name",
            name,
            "--resource-group",
            resource_group,
            "--location",
            location,
            "--sku",
            sku,
            "--is-linux",
            "--output",
            "none",
        ])?;
        Ok(())
    }

    pub fn create_web_app(
        &self,
        name: &str,
        resource_group: &str,
        plan: &str,
        runtime: &str,
    ) -> Result<(), AppError> {
        self.az(&[
            "webapp",
            "create",
            "--name",
            name,
            "--resource-group",
            resource_group,
            "--plan",
            plan,
            "--runtime",
            runtime,
            "--output",
            "none",
        ])?;
        Ok(())
    }

    /// Points a web app at a GitHub repository (manual integration, no webhook).
    pub fn web_app_source_config(
        &self,
        name: &str,
        resource_group: &str,
        repo_url: &str,
        branch: &str,
    ) -> Result<(), AppError> {
        self.az(&[
            "webapp",
            "deployment",
            "source",
            "config",
            "--name",
            name,
            "--resource-group",
            resource_group,
            "--repo-url",
            repo_url,
            "--branch",
            branch,
            "--manual-integration",
            "--output",
            "none",
        ])?;
        Ok(())
    }

    /// Zips and uploads a local directory with `az webapp up`.
    pub fn web_app_up(
        &self,
        source_dir: &Path,
        name: &str,
        resource_group: &str,
        plan: &str,
        runtime: &str,
        location: &str,
    ) -> Result<(), AppError> {
        let output = self.ctx.run_command_in(
            source_dir,
            "az",
            &[
                "webapp",
                "up",
                "--name",
                name,
                "--resource-group",
                resource_group,
                "--plan",
                plan,
                "--runtime",
                runtime,
                "--location",
                location,
                "--output",
                "none",
            ],
        )?;
        if output.success {
            Ok(())
        } else {
            Err(classify_failure(&output))
        }
    }

    pub fn web_app_hostname(&self, name: &str, resource_group: &str) -> Result<String, AppError> {
        let output = self.az(&[
            "webapp",
            "show",
            "--name",
            name,
            "--resource-group",
            resource_group,
            "--query",
            "defaultHostName",
            "--output",
            "tsv",
        ])?;
        Ok(output.stdout.trim().to_string())
    }

    pub fn web_app_add_hostname(
        &self,
        name: &str,
        resource_group: &str,
        hostname: &str,
    ) -> Result<(), AppError> {
        self.az(&[
            "webapp",
            "config",
            "hostname",
            "add",
            "--webapp-name",
            name,
            "--resource-group",
            resource_group,
            "--hostname",
            hostname,
            "--output",
            "none",
        ])?;
        Ok(())
    }

    // === Container Apps ===

    /// Builds the source directory in ACR and deploys it as a container app.
    pub fn container_app_up(
        &self,
        source_dir: &Path,
        name: &str,
        resource_group: &str,
        location: &str,
        target_port: u16,
    ) -> Result<(), AppError> {
        let source = source_dir.to_string_lossy();
        let port = target_port.to_string();
        self.az(&[
            "containerapp",
            "up",
            "--name",
            name,
            "--resource-group",
            resource_group,
            "--location",
            location,
            "--source",
            &*source,
            "--ingress",
            "external",
            "--target-port",
            &port,
        ])?;
        Ok(())
    }

    pub fn container_app_fqdn(&self, name: &str, resource_group: &str) -> Result<String, AppError> {
        let output = self.az(&[
            "containerapp",
            "show",
            "--name",
            name,
            "--resource-group",
            resource_group,
            "--query",
            "properties.configuration.ingress.fqdn",
            "--output",
            "tsv",
        ])?;
        Ok(output.stdout.trim().to_string())
    }
}

/// Maps a failed `az` run to the most specific error.
fn classify_failure(output: &CommandOutput) -> AppError {
    let stderr = output.stderr.trim();
    if stderr.contains("az login") || stderr.contains("Please run 'az login'") {
        return AppError::NotLoggedIn;
    }
    let message = stderr
        .lines()
        .find(|l| l.starts_with("ERROR:"))
        .map(|l| l.trim_start_matches("ERROR:").trim())
        .unwrap_or(if stderr.is_empty() {
            "az exited with an error"
        } else {
            stderr
        });
    AppError::AzureCli(message.to_string())
}

fn is_not_found(stderr: &str) -> bool {
    NOT_FOUND_MARKERS.iter().any(|m| stderr.contains(m))
}

fn tsv_lines(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

// === Probes for the deployment monitor ===

/// Watches `az deployment group show` for a template deployment.
pub struct DeploymentProbe {
    ctx: ExecutionContext,
    resource_group: String,
    deployment_name: String,
    label: String,
}

impl DeploymentProbe {
    pub fn new(ctx: ExecutionContext, resource_group: &str, deployment_name: &str, label: &str) -> Self {
        Self {
            ctx,
            resource_group: resource_group.to_string(),
            deployment_name: deployment_name.to_string(),
            label: label.to_string(),
        }
    }
}

impl ProvisioningProbe for DeploymentProbe {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn poll(&mut self) -> Result<ProvisioningState, AppError> {
        if self.ctx.is_dry_run() {
            return Ok(ProvisioningState::Succeeded);
        }
        let state = AzureCli::new(&self.ctx).deployment_state(&self.resource_group, &self.deployment_name)?;
        // The deployment record can lag a few seconds behind `--no-wait`.
        Ok(match state {
            ProvisioningState::NotFound => ProvisioningState::InProgress("Pending".into()),
            other => other,
        })
    }
}

/// Reports `Succeeded` once a resource group no longer exists.
pub struct GroupDeletionProbe {
    ctx: ExecutionContext,
    resource_group: String,
}

impl GroupDeletionProbe {
    pub fn new(ctx: ExecutionContext, resource_group: &str) -> Self {
        Self {
            ctx,
            resource_group: resource_group.to_string(),
        }
    }
}

impl ProvisioningProbe for GroupDeletionProbe {
    fn label(&self) -> String {
        format!("deletion of {}", self.resource_group)
    }

    fn poll(&mut self) -> Result<ProvisioningState, AppError> {
        if self.ctx.is_dry_run() {
            return Ok(ProvisioningState::Succeeded);
        }
        let exists = AzureCli::new(&self.ctx).group_exists(&self.resource_group)?;
        Ok(if exists {
            ProvisioningState::Deleting
        } else {
            ProvisioningState::Succeeded
        })
    }
}

/// Watches a VPN gateway after a start/stop request.
pub struct VpnGatewayProbe {
    ctx: ExecutionContext,
    resource_group: String,
    gateway: String,
}

impl VpnGatewayProbe {
    pub fn new(ctx: ExecutionContext, resource_group: &str, gateway: &str) -> Self {
        Self {
            ctx,
            resource_group: resource_group.to_string(),
            gateway: gateway.to_string(),
        }
    }
}

impl ProvisioningProbe for VpnGatewayProbe {
    fn label(&self) -> String {
        format!("VPN gateway {}", self.gateway)
    }

    fn poll(&mut self) -> Result<ProvisioningState, AppError> {
        if self.ctx.is_dry_run() {
            return Ok(ProvisioningState::Succeeded);
        }
        AzureCli::new(&self.ctx).vpn_gateway_state(&self.resource_group, &self.gateway)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed(stderr: &str) -> CommandOutput {
        CommandOutput {
            success: false,
            code: 1,
            stdout: String::new(),
            stderr: stderr.to_string(),
            dry_run: false,
        }
    }

    #[test]
    fn test_parse_account() {
        let json = r#"{
            "environmentName": "AzureCloud",
            "id": "1111-2222",
            "isDefault": true,
            "name": "Pay-As-You-Go",
            "tenantId": "tenant",
            "user": { "name": "me@example.com", "type": "user" }
        }"#;
        let account: AzureAccount = serde_json::from_str(json).unwrap();
        assert_eq!(account.name, "Pay-As-You-Go");
        assert_eq!(account.user.name, "me@example.com");
    }

    #[test]
    fn test_classify_not_logged_in() {
        let err = classify_failure(&failed("ERROR: Please run 'az login' to setup account."));
        assert!(matches!(err, AppError::NotLoggedIn));
    }

    #[test]
    fn test_classify_extracts_error_line() {
        let err = classify_failure(&failed(
            "WARNING: something\nERROR: (InvalidTemplate) Deployment template validation failed",
        ));
        match err {
            AppError::AzureCli(msg) => assert!(msg.starts_with("(InvalidTemplate)")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_not_found_detection() {
        assert!(is_not_found("ERROR: (ResourceGroupNotFound) Resource group 'x' could not be found."));
        assert!(!is_not_found("ERROR: (AuthorizationFailed)"));
    }

    #[test]
    fn test_dry_run_create_group_plan() {
        let ctx = ExecutionContext::new(true, false);
        let az = AzureCli::new(&ctx);
        let tags = vec![("project".to_string(), "homelab".to_string())];

        assert!(az.ensure_group("dev-we-rg-homelab", "westeurope", &tags).unwrap());
        assert_eq!(
            ctx.planned_commands(),
            vec![
                "az group exists --name dev-we-rg-homelab",
                "az group create --name dev-we-rg-homelab --location westeurope --output none --tags project=homelab",
            ]
        );
    }

    #[test]
    fn test_dry_run_deploy_template_plan() {
        let ctx = ExecutionContext::new(true, false);
        let az = AzureCli::new(&ctx);
        let params = vec!["env=dev".to_string(), "loc=we".to_string()];

        az.deploy_template(
            "dev-we-rg-homelab",
            "homelab-network-1",
            Path::new("/tmp/homelab/network.bicep"),
            &params,
            true,
        )
        .unwrap();

        let plan = ctx.planned_commands();
        assert_eq!(plan.len(), 1);
        assert!(plan[0].starts_with("az deployment group create --resource-group dev-we-rg-homelab"));
        assert!(plan[0].ends_with("--parameters env=dev loc=we --no-wait"));
    }

    #[test]
    fn test_static_web_app_create_has_no_source() {
        let ctx = ExecutionContext::new(true, false);
        let az = AzureCli::new(&ctx);
        az.create_static_web_app(&StaticWebAppSpec {
            name: "dev-we-swa-blog",
            resource_group: "dev-we-rg-homelab",
            location: "westeurope",
            sku: "Free",
        })
        .unwrap();

        let plan = ctx.planned_commands();
        assert_eq!(
            plan,
            vec!["az staticwebapp create --name dev-we-swa-blog --resource-group dev-we-rg-homelab \
--location westeurope --sku Free --output none"]
        );
    }

    #[test]
    fn test_dry_run_reset_resource_group() {
        let ctx = ExecutionContext::new(true, false);
        let az = AzureCli::new(&ctx);
        let monitor = DeploymentMonitor::new(
            crate::core::monitor::MonitorSettings::new(Duration::from_millis(1), Duration::from_secs(1)),
            crate::core::logging::Logger::default().quiet(),
        );

        let outcome = az.reset_resource_group("dev-we-rg-homelab", &monitor).unwrap();
        assert!(outcome.is_success());
        assert!(ctx
            .planned_commands()
            .contains(&"az group delete --name dev-we-rg-homelab --yes --no-wait".to_string()));
    }

    #[test]
    fn test_dry_run_probes_succeed_immediately() {
        let ctx = ExecutionContext::new(true, false);
        let mut probe = GroupDeletionProbe::new(ctx, "dev-we-rg-homelab");
        assert_eq!(probe.poll().unwrap(), ProvisioningState::Succeeded);
    }
}
