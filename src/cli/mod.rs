use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::core::error::AppError;
use crate::core::session::Session;
use crate::providers::azure::{AzureAccount, AzureCli};
use crate::ui;

pub mod deploy;
pub mod docs;
pub mod github;
pub mod infra;
pub mod menu;
pub mod nat;
pub mod settings;
pub mod setup;
pub mod vpn;

/// Homelab - Azure home lab operations console
#[derive(Parser)]
#[command(
    name = "homelab",
    version,
    about = "Operations console for an Azure home lab",
    long_about = "Provision networking, deploy websites, manage VPN certificates and gateways,\nand connect GitHub. Run without a command for the interactive menu."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output (forces the Debug log level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print the commands that would run without executing them
    #[arg(long, global = true)]
    pub dry_run: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the first-time setup wizard
    Setup,

    /// Show or change the configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Deploy and inspect the network infrastructure
    Infra {
        #[command(subcommand)]
        command: InfraCommands,
    },

    /// Deploy a website
    Deploy {
        /// Local project directory (defaults to the selected GitHub repository, then ".")
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Hosting target: swa, appservice, containerapp, vercel, netlify, aws, gcp
        #[arg(short, long)]
        target: Option<String>,

        /// Site name used in resource names
        #[arg(short, long)]
        name: Option<String>,

        /// Custom domain to bind (Azure targets)
        #[arg(short, long)]
        domain: Option<String>,

        /// Deploy the repository selected with 'homelab github select'
        #[arg(long, conflicts_with = "path")]
        repo: bool,
    },

    /// Detect the website type of a directory
    Detect {
        /// Project directory
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// VPN gateway, certificates, and client package
    Vpn {
        #[command(subcommand)]
        command: VpnCommands,
    },

    /// NAT gateway
    Nat {
        #[command(subcommand)]
        command: NatCommands,
    },

    /// GitHub account and repositories
    Github {
        #[command(subcommand)]
        command: GithubCommands,
    },

    /// Show built-in documentation
    Docs {
        /// Topic name (omit to list topics)
        topic: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the configuration
    Show,
    /// Change a configuration value
    Set {
        /// Key (env, loc, project, location, logFile, logLevel)
        key: String,
        value: String,
    },
    /// Print the configuration file path
    Path,
}

#[derive(Subcommand)]
pub enum InfraCommands {
    /// Deploy infrastructure components
    Deploy {
        #[arg(value_enum, default_value = "all")]
        component: ComponentArg,

        /// Keep monitoring the gateways in the background
        #[arg(short, long)]
        background: bool,

        /// Redeploy components that are already deployed
        #[arg(short, long)]
        force: bool,
    },
    /// Show provisioning state of every component
    Status,
    /// Delete the resource group and everything in it
    Reset {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ComponentArg {
    Network,
    Vpn,
    Nat,
    All,
}

#[derive(Subcommand)]
pub enum VpnCommands {
    /// Start, stop, or inspect the VPN gateway
    Gateway {
        #[arg(value_enum)]
        action: GatewayAction,
    },
    /// Manage VPN certificates
    Cert {
        #[command(subcommand)]
        command: CertCommands,
    },
    /// Generate and download the VPN client package
    Client,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum GatewayAction {
    Start,
    Stop,
    Status,
}

#[derive(Subcommand)]
pub enum CertCommands {
    /// Create a self-signed root certificate
    Root {
        #[arg(default_value = "HomelabRootCert")]
        name: String,
    },
    /// Create a client certificate signed by a root
    Client {
        name: String,
        /// Root certificate to sign with
        #[arg(short, long, default_value = "HomelabRootCert")]
        root: String,
    },
    /// List local certificates
    List,
    /// Upload a root certificate to the VPN gateway
    Upload {
        #[arg(default_value = "HomelabRootCert")]
        name: String,
    },
    /// List root certificates configured on the gateway
    Gateway,
}

#[derive(Subcommand)]
pub enum NatCommands {
    /// Deploy the NAT gateway and attach it to the default subnet
    Enable {
        #[arg(short, long)]
        background: bool,
    },
    /// Detach and delete the NAT gateway
    Disable {
        #[arg(short, long)]
        yes: bool,
    },
    /// Show NAT gateway state
    Status,
}

#[derive(Subcommand)]
pub enum GithubCommands {
    /// Connect with a personal access token
    Connect {
        /// Token (prompted when omitted; HOMELAB_GITHUB_TOKEN is used if set)
        #[arg(long)]
        token: Option<String>,
    },
    /// Remove the stored token
    Disconnect,
    /// Show connection and rate limit
    Status,
    /// List repositories
    Repos,
    /// Pick the repository used for deployments
    Select,
    /// Clone or update the selected repository
    Clone,
}

/// Makes sure `az` is installed and logged in, offering `az login` when it is not.
pub(crate) fn require_azure(session: &Session) -> Result<AzureAccount, AppError> {
    let az = AzureCli::new(&session.ctx);
    match az.ensure_logged_in() {
        Ok(account) => {
            session
                .logger
                .debug(&format!("Azure subscription: {} ({})", account.name, account.id));
            Ok(account)
        }
        Err(AppError::NotLoggedIn) => {
            ui::warning("You are not logged in to Azure");
            if !ui::confirm("Run 'az login' now?", true)? {
                return Err(AppError::NotLoggedIn);
            }
            az.login()?;
            let account = az.account()?;
            session
                .logger
                .success(&format!("Logged in as {} ({})", account.user.name, account.name));
            Ok(account)
        }
        Err(e) => Err(e),
    }
}

/// Runs one submenu action and keeps the menu alive on failure.
pub(crate) fn run_action<F>(session: &mut Session, action: &str, f: F)
where
    F: FnOnce(&mut Session) -> Result<(), AppError>,
{
    let result = f(session);
    session.report(action, result);
    ui::pause();
}
