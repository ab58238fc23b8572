//! Infrastructure commands: deploy the Bicep templates, show state, reset.

use crate::cli::{require_azure, run_action, ComponentArg};
use crate::core::error::AppError;
use crate::core::monitor::{format_duration, MonitorSettings, ProvisioningState};
use crate::core::naming::{ResourceNames, DEFAULT_SUBNET};
use crate::core::paths;
use crate::core::session::Session;
use crate::providers::azure::{AzureCli, DeploymentProbe};
use crate::templates::{template_parameters, write_template, InfraComponent};
use crate::ui::{self, Menu, MenuChoice, Spinner};

const MENU_ITEMS: &[&str] = &[
    "Deploy virtual network",
    "Deploy VPN gateway",
    "Deploy NAT gateway",
    "Deploy everything",
    "Show status",
    "Reset resource group",
    "Log in to Azure",
];

impl ComponentArg {
    pub fn components(self) -> Vec<InfraComponent> {
        match self {
            ComponentArg::Network => vec![InfraComponent::Network],
            ComponentArg::Vpn => vec![InfraComponent::VpnGateway],
            ComponentArg::Nat => vec![InfraComponent::NatGateway],
            ComponentArg::All => InfraComponent::all().to_vec(),
        }
    }
}

pub fn menu(session: &mut Session) -> Result<(), AppError> {
    loop {
        match Menu::new("Infrastructure", MENU_ITEMS).run()? {
            MenuChoice::Back => return Ok(()),
            MenuChoice::Item(0) => run_action(session, "Deploy network", |s| {
                deploy(s, &[InfraComponent::Network], false, false)
            }),
            MenuChoice::Item(1) => run_action(session, "Deploy VPN gateway", |s| {
                let background = ui::confirm(
                    "VPN gateways take 30-45 minutes. Monitor in the background?",
                    true,
                )?;
                deploy(s, &[InfraComponent::VpnGateway], background, false)
            }),
            MenuChoice::Item(2) => run_action(session, "Deploy NAT gateway", |s| {
                deploy(s, &[InfraComponent::NatGateway], false, false)
            }),
            MenuChoice::Item(3) => run_action(session, "Deploy infrastructure", |s| {
                let background = ui::confirm("Monitor the gateways in the background?", true)?;
                deploy(s, InfraComponent::all(), background, false)
            }),
            MenuChoice::Item(4) => run_action(session, "Infrastructure status", status),
            MenuChoice::Item(5) => run_action(session, "Reset resource group", |s| reset(s, false)),
            MenuChoice::Item(_) => run_action(session, "Azure login", |s| {
                AzureCli::new(&s.ctx).login()?;
                let account = AzureCli::new(&s.ctx).account()?;
                s.logger
                    .success(&format!("Logged in as {} ({})", account.user.name, account.name));
                Ok(())
            }),
        }
    }
}

/// Deploys components in order. The network always waits in the foreground
/// because the gateways depend on it. Components that are already deployed
/// are skipped unless `force` is set.
pub fn deploy(
    session: &mut Session,
    components: &[InfraComponent],
    background: bool,
    force: bool,
) -> Result<(), AppError> {
    require_azure(session)?;
    let names = session.names();
    let rg = names.resource_group();
    let az = AzureCli::new(&session.ctx);

    ui::section("Deploying infrastructure");
    ui::key_values(&[
        ("Resource group", rg.clone()),
        ("Location", session.config.location.clone()),
        (
            "Components",
            components
                .iter()
                .map(|c| c.display_name())
                .collect::<Vec<_>>()
                .join(", "),
        ),
    ]);

    if az.ensure_group(&rg, &session.config.location, &names.tags())? {
        session.logger.success(&format!("Created resource group {}", rg));
    } else {
        session.logger.debug(&format!("Resource group {} exists", rg));
    }

    for component in components {
        let current = component_state(&az, &names, *component)?;
        if !needs_deploy(&current, force) {
            ui::info(&format!(
                "{} is already deployed, skipping (use --force to redeploy)",
                component.display_name()
            ));
            continue;
        }
        let redeploy = current == ProvisioningState::Succeeded;
        if redeploy {
            ui::warning(redeploy_warning(*component));
        }

        for dependency in component.depends_on() {
            if !components.contains(dependency) && !session.ctx.is_dry_run() {
                let state = component_state(&az, &names, *dependency)?;
                if state == ProvisioningState::NotFound {
                    return Err(AppError::Validation(format!(
                        "{} needs the {} - deploy it first",
                        component.display_name(),
                        dependency.display_name().to_lowercase()
                    )));
                }
            }
        }

        let template = write_template(*component, &paths::temp_dir())?;
        let deployment_name = component.deployment_name();
        let parameters = template_parameters(&names, &session.config.location);

        session.logger.info(&format!(
            "Starting deployment {} ({})",
            deployment_name,
            component.display_name()
        ));
        az.deploy_template(&rg, &deployment_name, &template, &parameters, true)?;

        let probe = DeploymentProbe::new(
            session.ctx.clone(),
            &rg,
            &deployment_name,
            component.display_name(),
        );

        if background && *component != InfraComponent::Network {
            let handle = session
                .background_monitor(component.monitor_settings())
                .spawn(Box::new(probe));
            session.jobs.push(handle);
            session.logger.info(&format!(
                "{} is provisioning; progress is reported in the main menu",
                component.display_name()
            ));
            continue;
        }

        wait_for_deployment(session, *component, probe, &rg, &deployment_name)?;
        if redeploy && *component == InfraComponent::Network {
            reattach_nat_gateway(session, &az, &names)?;
        }
    }

    Ok(())
}

fn needs_deploy(current: &ProvisioningState, force: bool) -> bool {
    force || *current != ProvisioningState::Succeeded
}

fn component_state(
    az: &AzureCli<'_>,
    names: &ResourceNames,
    component: InfraComponent,
) -> Result<ProvisioningState, AppError> {
    let rg = names.resource_group();
    match component {
        InfraComponent::Network => az.vnet_state(&rg, &names.vnet()),
        InfraComponent::VpnGateway => az.vpn_gateway_state(&rg, &names.vpn_gateway()),
        InfraComponent::NatGateway => az.nat_gateway_state(&rg, &names.nat_gateway()),
    }
}

/// What a template redeploy resets on a live component.
fn redeploy_warning(component: InfraComponent) -> &'static str {
    match component {
        InfraComponent::Network => {
            "Redeploying the virtual network resets its subnets; an existing NAT gateway is re-attached afterwards"
        }
        InfraComponent::VpnGateway => {
            "Redeploying the VPN gateway removes uploaded root certificates; upload them again with 'homelab vpn cert upload'"
        }
        InfraComponent::NatGateway => "Redeploying the NAT gateway re-applies its subnet association",
    }
}

/// The network template declares the default subnet without a NAT gateway.
fn reattach_nat_gateway(
    session: &Session,
    az: &AzureCli<'_>,
    names: &ResourceNames,
) -> Result<(), AppError> {
    let rg = names.resource_group();
    let nat = names.nat_gateway();
    if az.nat_gateway_state(&rg, &nat)? != ProvisioningState::Succeeded {
        return Ok(());
    }
    az.attach_nat_gateway(&rg, &names.vnet(), DEFAULT_SUBNET, &nat)?;
    session
        .logger
        .success(&format!("NAT gateway {} re-attached to subnet {}", nat, DEFAULT_SUBNET));
    Ok(())
}

fn wait_for_deployment(
    session: &Session,
    component: InfraComponent,
    mut probe: DeploymentProbe,
    rg: &str,
    deployment_name: &str,
) -> Result<(), AppError> {
    let monitor = session.foreground_monitor(component.monitor_settings());
    let spinner = Spinner::new(component.display_name());
    let outcome = monitor.run(&mut probe, |state, _| spinner.set_message(&state.to_string()));

    match outcome.into_result(component.display_name()) {
        Ok(elapsed) => {
            spinner.finish(&format!("{} deployed", component.display_name()));
            session.logger.success(&format!(
                "{} deployed in {}",
                component.display_name(),
                format_duration(elapsed)
            ));
            Ok(())
        }
        Err(e) => {
            spinner.finish_error(&format!("{} did not finish", component.display_name()));
            if let Ok(Some(detail)) = AzureCli::new(&session.ctx).deployment_error(rg, deployment_name) {
                session.logger.error(&format!("Azure reported: {}", detail));
            }
            Err(e)
        }
    }
}

/// Prints the provisioning state of every component.
pub fn status(session: &mut Session) -> Result<(), AppError> {
    require_azure(session)?;
    let names = session.names();
    let rg = names.resource_group();
    let az = AzureCli::new(&session.ctx);

    let group = az.show_group(&rg)?;
    let mut rows = vec![("Resource group", format!("{}  {}", rg, ui::state(&group.to_string())))];

    if group != ProvisioningState::NotFound {
        let vnet = az.vnet_state(&rg, &names.vnet())?;
        let vpn = az.vpn_gateway_state(&rg, &names.vpn_gateway())?;
        let nat = az.nat_gateway_state(&rg, &names.nat_gateway())?;
        rows.push(("Virtual network", format!("{}  {}", names.vnet(), ui::state(&vnet.to_string()))));
        rows.push(("VPN gateway", format!("{}  {}", names.vpn_gateway(), ui::state(&vpn.to_string()))));
        rows.push(("NAT gateway", format!("{}  {}", names.nat_gateway(), ui::state(&nat.to_string()))));
    }

    ui::section("Infrastructure status");
    ui::key_values(&rows);

    let running = session.jobs.running_labels();
    if !running.is_empty() {
        ui::info(&format!("Monitoring in background: {}", running.join(", ")));
    }
    Ok(())
}

/// Deletes the resource group after confirmation and waits until it is gone.
pub fn reset(session: &mut Session, skip_confirm: bool) -> Result<(), AppError> {
    require_azure(session)?;
    let rg = session.names().resource_group();

    if !skip_confirm {
        ui::warning(&format!(
            "This deletes {} and every resource in it (VNet, gateways, websites)",
            rg
        ));
        let typed = ui::input("Type the resource group name to confirm")?;
        if typed.trim() != rg {
            return Err(AppError::Cancelled);
        }
    }

    session.jobs.cancel_all();
    let monitor = session.foreground_monitor(MonitorSettings::resource_group_deletion());
    let spinner = Spinner::new(&format!("Deleting {}", rg));
    let outcome = AzureCli::new(&session.ctx).reset_resource_group(&rg, &monitor)?;

    match outcome.into_result(&format!("deletion of {}", rg)) {
        Ok(elapsed) => {
            spinner.finish(&format!("{} deleted", rg));
            session
                .logger
                .success(&format!("Resource group {} deleted in {}", rg, format_duration(elapsed)));
            Ok(())
        }
        Err(e) => {
            spinner.finish_error(&format!("{} not deleted", rg));
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::HomelabConfig;
    use crate::core::context::ExecutionContext;
    use crate::core::logging::Logger;
    use tempfile::tempdir;

    #[test]
    fn test_deploy_network_plan() {
        let dir = tempdir().unwrap();
        let mut session = Session::from_parts(
            HomelabConfig::default_in(dir.path()),
            Logger::default().quiet(),
            ExecutionContext::new(true, false),
        );

        deploy(&mut session, &[InfraComponent::Network], false, false).unwrap();

        let plan = session.ctx.planned_commands();
        let create_group = plan
            .iter()
            .position(|c| c.starts_with("az group create --name dev-we-rg-homelab --location westeurope"))
            .unwrap();
        let create_deployment = plan
            .iter()
            .position(|c| {
                c.starts_with("az deployment group create --resource-group dev-we-rg-homelab --name homelab-network-")
            })
            .unwrap();
        assert!(create_group < create_deployment);

        let deployment = &plan[create_deployment];
        assert!(deployment.contains("network.bicep"));
        assert!(deployment.contains("--parameters env=dev loc=we project=homelab location=westeurope"));
        assert!(deployment.ends_with("--no-wait"));
        assert!(paths::temp_dir().join("network.bicep").is_file());
    }

    #[test]
    fn test_deployed_components_are_skipped_unless_forced() {
        assert!(needs_deploy(&ProvisioningState::NotFound, false));
        assert!(needs_deploy(&ProvisioningState::Failed, false));
        assert!(needs_deploy(&ProvisioningState::InProgress("Updating".into()), false));
        assert!(!needs_deploy(&ProvisioningState::Succeeded, false));
        assert!(needs_deploy(&ProvisioningState::Succeeded, true));
    }

    #[test]
    fn test_redeploy_warnings_name_lost_state() {
        assert!(redeploy_warning(InfraComponent::Network).contains("NAT gateway"));
        assert!(redeploy_warning(InfraComponent::VpnGateway).contains("root certificates"));
    }
}
