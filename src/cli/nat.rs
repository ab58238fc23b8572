use crate::cli::{infra, require_azure, run_action};
use crate::core::error::AppError;
use crate::core::monitor::ProvisioningState;
use crate::core::naming::{ResourceKind, DEFAULT_SUBNET};
use crate::core::session::Session;
use crate::providers::azure::AzureCli;
use crate::templates::InfraComponent;
use crate::ui::{self, Menu, MenuChoice, Spinner};

const MENU_ITEMS: &[&str] = &["Enable NAT gateway", "Disable NAT gateway", "Show status"];

pub fn menu(session: &mut Session) -> Result<(), AppError> {
    loop {
        match Menu::new("NAT gateway", MENU_ITEMS).run()? {
            MenuChoice::Back => return Ok(()),
            MenuChoice::Item(0) => run_action(session, "Enable NAT gateway", |s| enable(s, false)),
            MenuChoice::Item(1) => run_action(session, "Disable NAT gateway", |s| disable(s, false)),
            MenuChoice::Item(_) => run_action(session, "NAT gateway status", status),
        }
    }
}

/// Deploys the NAT gateway template, which also associates it with the default
/// subnet. An existing gateway is only re-attached.
pub fn enable(session: &mut Session, background: bool) -> Result<(), AppError> {
    require_azure(session)?;
    let names = session.names();
    let current = AzureCli::new(&session.ctx)
        .nat_gateway_state(&names.resource_group(), &names.nat_gateway())?;
    enable_from(session, &current, background)
}

fn enable_from(
    session: &mut Session,
    current: &ProvisioningState,
    background: bool,
) -> Result<(), AppError> {
    if *current != ProvisioningState::Succeeded {
        return infra::deploy(session, &[InfraComponent::NatGateway], background, false);
    }

    let names = session.names();
    let nat = names.nat_gateway();
    AzureCli::new(&session.ctx).attach_nat_gateway(
        &names.resource_group(),
        &names.vnet(),
        DEFAULT_SUBNET,
        &nat,
    )?;
    session
        .logger
        .success(&format!("NAT gateway {} attached to subnet {}", nat, DEFAULT_SUBNET));
    Ok(())
}

/// Detaches the NAT gateway from the subnet, then deletes it and its public IP.
pub fn disable(session: &mut Session, skip_confirm: bool) -> Result<(), AppError> {
    require_azure(session)?;
    let names = session.names();
    let rg = names.resource_group();
    let nat = names.nat_gateway();
    let az = AzureCli::new(&session.ctx);

    if !session.ctx.is_dry_run() && !az.nat_gateway_state(&rg, &nat)?.exists() {
        ui::info(&format!("NAT gateway {} is not deployed", nat));
        return Ok(());
    }

    if !skip_confirm
        && !ui::confirm(
            &format!("Delete {}? Outbound traffic falls back to default SNAT", nat),
            false,
        )?
    {
        return Err(AppError::Cancelled);
    }

    let spinner = Spinner::new(&format!("Detaching {} from {}", nat, DEFAULT_SUBNET));
    let result = (|| -> Result<(), AppError> {
        az.detach_nat_gateway(&rg, &names.vnet(), DEFAULT_SUBNET)?;
        spinner.set_message(&format!("Deleting {}", nat));
        az.delete_nat_gateway(&rg, &nat)?;
        spinner.set_message("Deleting public IP");
        az.delete_public_ip(&rg, &names.name(ResourceKind::NatGatewayPublicIp))?;
        Ok(())
    })();

    match result {
        Ok(()) => {
            spinner.finish(&format!("{} removed", nat));
            session.logger.success(&format!("NAT gateway {} disabled", nat));
            Ok(())
        }
        Err(e) => {
            spinner.finish_error("NAT gateway not removed");
            Err(e)
        }
    }
}

pub fn status(session: &mut Session) -> Result<(), AppError> {
    require_azure(session)?;
    let names = session.names();
    let state = AzureCli::new(&session.ctx).nat_gateway_state(&names.resource_group(), &names.nat_gateway())?;

    ui::key_values(&[(
        "NAT gateway",
        format!("{}  {}", names.nat_gateway(), ui::state(&state.to_string())),
    )]);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::HomelabConfig;
    use crate::core::context::ExecutionContext;
    use crate::core::logging::Logger;
    use tempfile::tempdir;

    fn dry_run_session(dir: &std::path::Path) -> Session {
        Session::from_parts(
            HomelabConfig::default_in(dir),
            Logger::default().quiet(),
            ExecutionContext::new(true, false),
        )
    }

    fn position(plan: &[String], prefix: &str) -> usize {
        plan.iter()
            .position(|c| c.starts_with(prefix))
            .unwrap_or_else(|| panic!("no '{}' in {:?}", prefix, plan))
    }

    #[test]
    fn test_disable_detaches_before_deleting() {
        let dir = tempdir().unwrap();
        let mut session = dry_run_session(dir.path());

        disable(&mut session, true).unwrap();

        let plan = session.ctx.planned_commands();
        let detach = position(
            &plan,
            "az network vnet subnet update --resource-group dev-we-rg-homelab \
--vnet-name dev-we-vnet-homelab --name default --remove natGateway",
        );
        let delete_nat = position(
            &plan,
            "az network nat gateway delete --resource-group dev-we-rg-homelab",
        );
        let delete_ip = position(
            &plan,
            "az network public-ip delete --resource-group dev-we-rg-homelab \
--name dev-we-pip-natgw-homelab",
        );
        assert!(detach < delete_nat);
        assert!(delete_nat < delete_ip);
    }

    #[test]
    fn test_enable_reattaches_existing_gateway() {
        let dir = tempdir().unwrap();
        let mut session = dry_run_session(dir.path());

        enable_from(&mut session, &ProvisioningState::Succeeded, false).unwrap();

        assert_eq!(
            session.ctx.planned_commands(),
            vec!["az network vnet subnet update --resource-group dev-we-rg-homelab \
--vnet-name dev-we-vnet-homelab --name default --nat-gateway dev-we-natgw-homelab --output none"]
        );
    }

    #[test]
    fn test_enable_deploys_missing_gateway() {
        let dir = tempdir().unwrap();
        let mut session = dry_run_session(dir.path());

        enable_from(&mut session, &ProvisioningState::NotFound, false).unwrap();

        let plan = session.ctx.planned_commands();
        assert!(plan
            .iter()
            .any(|c| c.starts_with("az deployment group create") && c.contains("nat-gateway.bicep")));
        assert!(!plan.iter().any(|c| c.contains("--nat-gateway")));
    }
}
