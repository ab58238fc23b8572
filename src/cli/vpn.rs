//! VPN gateway start/stop, point-to-site certificates and the client package.

use std::fs;
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;

use crate::cli::{require_azure, run_action, CertCommands, GatewayAction};
use crate::core::certificates::{fingerprint, Certificate, CertificateStore};
use crate::core::error::AppError;
use crate::core::monitor::{format_duration, AwaitTransition, MonitorSettings};
use crate::core::paths;
use crate::core::session::Session;
use crate::providers::azure::{AzureCli, VpnGatewayProbe};
use crate::ui::{self, Menu, MenuChoice, Spinner};
use crate::utils::validate_certificate_name;

const DEFAULT_ROOT: &str = "HomelabRootCert";

const GATEWAY_ITEMS: &[&str] = &["Start gateway", "Stop gateway", "Show gateway status"];

const CERT_ITEMS: &[&str] = &[
    "Create root certificate",
    "Create client certificate",
    "List local certificates",
    "Upload root certificate to gateway",
    "List gateway root certificates",
];

const CLIENT_ITEMS: &[&str] = &["Download VPN client package", "Connection instructions"];

pub fn gateway_menu(session: &mut Session) -> Result<(), AppError> {
    loop {
        match Menu::new("VPN gateway", GATEWAY_ITEMS).run()? {
            MenuChoice::Back => return Ok(()),
            MenuChoice::Item(0) => {
                run_action(session, "Start VPN gateway", |s| gateway(s, GatewayAction::Start))
            }
            MenuChoice::Item(1) => {
                run_action(session, "Stop VPN gateway", |s| gateway(s, GatewayAction::Stop))
            }
            MenuChoice::Item(_) => {
                run_action(session, "VPN gateway status", |s| gateway(s, GatewayAction::Status))
            }
        }
    }
}

pub fn certificate_menu(session: &mut Session) -> Result<(), AppError> {
    loop {
        match Menu::new("VPN certificates", CERT_ITEMS).run()? {
            MenuChoice::Back => return Ok(()),
            MenuChoice::Item(0) => run_action(session, "Create root certificate", |s| {
                let name = prompt_cert_name("Root certificate name", DEFAULT_ROOT)?;
                certificates(s, CertCommands::Root { name })
            }),
            MenuChoice::Item(1) => run_action(session, "Create client certificate", |s| {
                let root = pick_root()?;
                let name = prompt_cert_name("Client certificate name", "HomelabClient")?;
                certificates(s, CertCommands::Client { name, root })
            }),
            MenuChoice::Item(2) => {
                run_action(session, "List certificates", |s| certificates(s, CertCommands::List))
            }
            MenuChoice::Item(3) => run_action(session, "Upload root certificate", |s| {
                let name = pick_root()?;
                certificates(s, CertCommands::Upload { name })
            }),
            MenuChoice::Item(_) => run_action(session, "Gateway certificates", |s| {
                certificates(s, CertCommands::Gateway)
            }),
        }
    }
}

pub fn client_menu(session: &mut Session) -> Result<(), AppError> {
    loop {
        match Menu::new("VPN client", CLIENT_ITEMS).run()? {
            MenuChoice::Back => return Ok(()),
            MenuChoice::Item(0) => run_action(session, "VPN client package", client),
            MenuChoice::Item(_) => run_action(session, "VPN instructions", |_| {
                print_instructions(None);
                Ok(())
            }),
        }
    }
}

fn prompt_cert_name(prompt: &str, default: &str) -> Result<String, AppError> {
    ui::input_validated(prompt, Some(default), validate_certificate_name)
}

fn pick_root() -> Result<String, AppError> {
    let roots = CertificateStore::open_default()?.roots()?;
    match roots.len() {
        0 => Err(AppError::Certificate(
            "No root certificate yet - create one first".into(),
        )),
        1 => Ok(roots[0].name.clone()),
        _ => {
            let names: Vec<&str> = roots.iter().map(|c| c.name.as_str()).collect();
            let index = ui::select("Root certificate", &names)?;
            Ok(names[index].to_string())
        }
    }
}

/// `Succeeded` reads in a row (15 s apart) before a start/stop with no visible
/// transition is taken as done.
const GATEWAY_SETTLE_POLLS: u32 = 4;

/// Starts or stops the gateway and waits until Azure reports a settled state.
pub fn gateway(session: &mut Session, action: GatewayAction) -> Result<(), AppError> {
    require_azure(session)?;
    let names = session.names();
    let rg = names.resource_group();
    let gw = names.vpn_gateway();
    let az = AzureCli::new(&session.ctx);

    let verb = match action {
        GatewayAction::Status => {
            let state = az.vpn_gateway_state(&rg, &gw)?;
            ui::key_values(&[("VPN gateway", format!("{}  {}", gw, ui::state(&state.to_string())))]);
            if state.exists() {
                let certs = az.list_root_certificates(&rg, &gw)?;
                ui::key_values(&[("Root certificates", certs.len().to_string())]);
            }
            return Ok(());
        }
        GatewayAction::Start => {
            az.start_vpn_gateway(&rg, &gw)?;
            "started"
        }
        GatewayAction::Stop => {
            az.stop_vpn_gateway(&rg, &gw)?;
            "stopped"
        }
    };

    let monitor = session.foreground_monitor(MonitorSettings::gateway_toggle());
    let spinner = Spinner::new(&format!("Waiting for {}", gw));
    let settle_polls = if session.ctx.is_dry_run() { 1 } else { GATEWAY_SETTLE_POLLS };
    let mut gateway = AwaitTransition::new(
        VpnGatewayProbe::new(session.ctx.clone(), &rg, &gw),
        settle_polls,
    );
    let outcome = monitor.run(&mut gateway, |state, elapsed| {
        spinner.set_message(&format!("{} ({})", state, format_duration(elapsed)))
    });

    match outcome.into_result(&format!("VPN gateway {}", gw)) {
        Ok(elapsed) => {
            spinner.finish(&format!("{} {}", gw, verb));
            session
                .logger
                .success(&format!("VPN gateway {} {} in {}", gw, verb, format_duration(elapsed)));
            Ok(())
        }
        Err(e) => {
            spinner.finish_error(&format!("{} not {}", gw, verb));
            Err(e)
        }
    }
}

pub fn certificates(session: &mut Session, command: CertCommands) -> Result<(), AppError> {
    let store = CertificateStore::open_default()?;
    match command {
        CertCommands::Root { name } => {
            validate_certificate_name(&name)?;
            session.ctx.require_tool("openssl", "version")?;
            let cert = store.create_root(&name, &session.ctx)?;
            session.logger.success(&format!("Root certificate {} created", cert.name));
            ui::key_values(&[
                ("Certificate", cert.cert_path.display().to_string()),
                ("Private key", cert.key_path.display().to_string()),
            ]);
            ui::info("Upload it to the gateway with 'homelab vpn cert upload'");
        }
        CertCommands::Client { name, root } => {
            validate_certificate_name(&name)?;
            session.ctx.require_tool("openssl", "version")?;
            let root = store.root(&root).ok_or_else(|| {
                AppError::Certificate(format!("Root certificate '{}' not found", root))
            })?;
            let password = ui::new_password("PFX export password")?;
            let cert = store.create_client(&name, &root, &password, &session.ctx)?;
            session.logger.success(&format!(
                "Client certificate {} signed by {}",
                cert.name, root.name
            ));
            if let Some(pfx) = &cert.pfx_path {
                ui::key_values(&[("PFX bundle", pfx.display().to_string())]);
                ui::info("Import the PFX into the certificate store of the connecting machine");
            }
        }
        CertCommands::List => list_certificates(&store)?,
        CertCommands::Upload { name } => upload_root(session, &store, &name)?,
        CertCommands::Gateway => {
            require_azure(session)?;
            let names = session.names();
            let certs = AzureCli::new(&session.ctx)
                .list_root_certificates(&names.resource_group(), &names.vpn_gateway())?;
            if certs.is_empty() {
                ui::info("No root certificates on the gateway");
            }
            for cert in certs {
                println!("  {}", cert);
            }
        }
    }
    Ok(())
}

fn list_certificates(store: &CertificateStore) -> Result<(), AppError> {
    let certs = store.list()?;
    if certs.is_empty() {
        ui::info(&format!("No certificates in {}", store.dir().display()));
        return Ok(());
    }
    ui::section("Certificates");
    for cert in &certs {
        let short = fs::read_to_string(&cert.cert_path)
            .ok()
            .and_then(|pem| fingerprint(&pem).ok())
            .map(|fp| fp[..16].to_string())
            .unwrap_or_else(|| "unreadable".into());
        println!("  {:<8} {:<24} {}", cert.kind.label(), cert.name, short);
    }
    Ok(())
}

fn upload_root(session: &Session, store: &CertificateStore, name: &str) -> Result<(), AppError> {
    let cert: Certificate = store
        .root(name)
        .ok_or_else(|| AppError::Certificate(format!("Root certificate '{}' not found", name)))?;
    let data = store.read_public_data(&cert)?;

    require_azure(session)?;
    let names = session.names();
    let rg = names.resource_group();
    let gw = names.vpn_gateway();
    let az = AzureCli::new(&session.ctx);

    if !session.ctx.is_dry_run() {
        if !az.vpn_gateway_state(&rg, &gw)?.exists() {
            return Err(AppError::Validation(format!(
                "VPN gateway {} is not deployed",
                gw
            )));
        }
        if az.list_root_certificates(&rg, &gw)?.iter().any(|c| c == name) {
            ui::info(&format!("Replacing existing root certificate {}", name));
            az.remove_root_certificate(&rg, &gw, name)?;
        }
    }

    az.add_root_certificate(&rg, &gw, name, &data)?;
    session
        .logger
        .success(&format!("Root certificate {} uploaded to {}", name, gw));
    Ok(())
}

/// Generates the client configuration package and downloads it to `~/.homelab/vpn`.
pub fn client(session: &mut Session) -> Result<(), AppError> {
    require_azure(session)?;
    let names = session.names();
    let gw = names.vpn_gateway();

    let spinner = Spinner::new("Generating VPN client package");
    let url = match AzureCli::new(&session.ctx).generate_vpn_client_package(&names.resource_group(), &gw) {
        Ok(url) => url,
        Err(e) => {
            spinner.finish_error("Package generation failed");
            return Err(e);
        }
    };

    if session.ctx.is_dry_run() {
        spinner.finish("[DRY-RUN] Package not downloaded");
        return Ok(());
    }
    if url.is_empty() {
        spinner.finish_error("Azure returned no download URL");
        return Err(AppError::AzureCli("Empty VPN client package URL".into()));
    }

    let target = paths::vpn_dir()?.join(format!("{}-client.zip", gw));
    spinner.set_message("Downloading package");
    match download(&url, &target) {
        Ok(()) => spinner.finish(&format!("Saved {}", target.display())),
        Err(e) => {
            spinner.finish_error("Download failed");
            return Err(e);
        }
    }
    session
        .logger
        .info(&format!("VPN client package saved to {}", target.display()));
    print_instructions(Some(target.as_path()));
    Ok(())
}

fn download(url: &str, path: &Path) -> Result<(), AppError> {
    let client = Client::builder().timeout(Duration::from_secs(120)).build()?;
    let response = client.get(url).send()?.error_for_status()?;
    let body = response.bytes()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, &body)?;
    Ok(())
}

fn print_instructions(package: Option<&Path>) {
    ui::section("Connecting to the VPN");
    let package = package
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "the client package".into());
    println!("  1. Extract {}", package);
    println!("  2. Import your client certificate PFX on this machine");
    println!("  3. Windows: run the installer from WindowsAmd64/");
    println!("     macOS/Linux: import OpenVPN/vpnconfig.ovpn or use the Azure VPN Client");
    println!("  4. Connect and check that 10.0.0.0/16 is reachable");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::HomelabConfig;
    use crate::core::context::ExecutionContext;
    use crate::core::logging::Logger;
    use tempfile::tempdir;

    fn dry_run_session(dir: &Path) -> Session {
        Session::from_parts(
            HomelabConfig::default_in(dir),
            Logger::default().quiet(),
            ExecutionContext::new(true, false),
        )
    }

    #[test]
    fn test_gateway_start_plan() {
        let dir = tempdir().unwrap();
        let mut session = dry_run_session(dir.path());

        gateway(&mut session, GatewayAction::Start).unwrap();

        let plan = session.ctx.planned_commands();
        assert!(plan.contains(
            &"az network vnet-gateway start --resource-group dev-we-rg-homelab \
--name dev-we-vpng-homelab --no-wait"
                .to_string()
        ));
    }

    #[test]
    fn test_gateway_stop_plan() {
        let dir = tempdir().unwrap();
        let mut session = dry_run_session(dir.path());

        gateway(&mut session, GatewayAction::Stop).unwrap();

        let plan = session.ctx.planned_commands();
        assert!(plan
            .iter()
            .any(|c| c.starts_with("az network vnet-gateway stop --resource-group dev-we-rg-homelab")));
        assert!(!plan.iter().any(|c| c.contains("vnet-gateway start")));
    }
}
