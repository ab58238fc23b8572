use crate::core::error::AppError;
use crate::ui::{self, Menu, MenuChoice};

pub struct Topic {
    pub slug: &'static str,
    pub title: &'static str,
    pub body: &'static str,
}

pub const TOPICS: &[Topic] = &[
    Topic {
        slug: "getting-started",
        title: "Getting started",
        body: "\
Requirements: the Azure CLI (az), openssl for VPN certificates, git for
repository deployments. Optional: swa, vercel, netlify CLIs.

1. Run 'homelab setup' to choose environment, location and project.
2. Log in with 'az login' (the console offers it when needed).
3. Deploy the network: 'homelab infra deploy network'.
4. Add gateways or deploy websites from the main menu.

Every command accepts --dry-run to print the az/git/openssl calls
without running them, and --verbose for debug logging.",
    },
    Topic {
        slug: "naming",
        title: "Resource naming",
        body: "\
Every resource is named {env}-{loc}-{type}-{project}.

  env      dev, test, prod...  (lowercase letters and digits)
  loc      short location code, e.g. we = westeurope, eus = eastus
  type     rg, vnet, vpng, natgw, pip-vpng, pip-natgw, asp, swa, app, ca
  project  your project name

Example: env=dev, loc=we, project=homelab gives the resource group
dev-we-rg-homelab. Website resources use the site name in place of the
project: dev-we-swa-blog.",
    },
    Topic {
        slug: "infrastructure",
        title: "Infrastructure",
        body: "\
The network template creates a 10.0.0.0/16 virtual network with a
'default' subnet (10.0.1.0/24) and a GatewaySubnet (10.0.255.0/27).

Deployments run with --no-wait and are polled until Azure reports a final
state. Typical durations:
  virtual network   1-2 minutes
  NAT gateway       2-5 minutes
  VPN gateway       30-45 minutes

Gateway deployments can be monitored in the background; finished jobs are
reported the next time the main menu is shown. Press Ctrl-C once to stop
waiting (the Azure operation continues), twice to quit.

'homelab infra reset' deletes the resource group and waits for it to go.",
    },
    Topic {
        slug: "websites",
        title: "Website deployment",
        body: "\
The project directory is inspected to choose how to host it:
  Dockerfile                          Container App
  package.json with a server package  App Service (Node)
  package.json without one            Static site (build output)
  requirements.txt, pyproject.toml    App Service (Python)
  *.csproj                            App Service (.NET) or static (Blazor WASM)
  composer.json, index.php            App Service (PHP)
  index.html                          Static site

Targets: Azure Static Web Apps, Azure App Service, Azure Container Apps,
Vercel and Netlify. AWS and GCP are listed but report 'not supported'.

A repository selected under GitHub is cloned to ~/.homelab/repos and the
checkout of the selected branch is what gets deployed. App Service is also
connected to the repository for continuous deployment.",
    },
    Topic {
        slug: "vpn",
        title: "Point-to-site VPN",
        body: "\
1. Deploy the VPN gateway (30-45 minutes).
2. Create a root certificate: 'homelab vpn cert root'.
3. Upload it: 'homelab vpn cert upload'.
4. Create a client certificate: 'homelab vpn cert client laptop'.
   The PFX bundle is protected with the password you enter.
5. Download the client package: 'homelab vpn client'.

Certificates live in ~/.homelab/certificates (override with
HOMELAB_CERT_DIR). Stop the gateway with 'homelab vpn gateway stop'
when you do not need it.",
    },
    Topic {
        slug: "nat",
        title: "NAT gateway",
        body: "\
The NAT gateway gives the 'default' subnet a static outbound public IP.
'homelab nat enable' deploys it and associates it with the subnet.
'homelab nat disable' detaches it, then deletes the gateway and its IP.",
    },
    Topic {
        slug: "github",
        title: "GitHub",
        body: "\
Create a personal access token with the 'repo' scope and run
'homelab github connect'. The token is validated against the API and
stored in ~/.homelab/github-config.json (readable only by you).
HOMELAB_GITHUB_TOKEN takes precedence over the stored token.

A 401 means the token is invalid or expired; a 403 means it lacks scope
or the rate limit is exhausted ('homelab github status' shows both).",
    },
    Topic {
        slug: "configuration",
        title: "Configuration and logs",
        body: "\
Settings are stored in ~/.homelab/config.json:
  env, loc, project, location, logFile, configFile, logLevel

Change them with 'homelab config set <key> <value>' or the Settings menu.
configFile is read-only; 'homelab config path' prints it.
Log lines look like '[2024-05-01 10:15:00] [Info] message' and are written
to ~/.homelab/logs/homelab_<YYYYMMDD>.log, a new file each day, unless
logFile points somewhere else. HOMELAB_LOG_LEVEL overrides the configured
level and --verbose forces Debug.",
    },
    Topic {
        slug: "troubleshooting",
        title: "Troubleshooting",
        body: "\
'Not logged in to Azure'   run 'az login' and retry
'az: command not found'    install the Azure CLI and reopen the shell
Deployment timed out       the operation may still be running; check
                           'homelab infra status' or the portal
GitHub 401                 reconnect with a new token
GitHub 403                 check token scopes and the rate limit

Run with --verbose to see every external command in the log.",
    },
];

pub fn find(name: &str) -> Option<&'static Topic> {
    let name = name.trim().to_lowercase();
    TOPICS
        .iter()
        .find(|t| t.slug == name || t.title.to_lowercase() == name)
}

pub fn print_topic(topic: &Topic) {
    ui::section(topic.title);
    println!("{}", topic.body);
    println!();
}

pub fn docs(topic: Option<&str>) -> Result<(), AppError> {
    match topic {
        Some(name) => {
            let topic = find(name).ok_or_else(|| {
                AppError::Validation(format!(
                    "Unknown topic '{}'. Run 'homelab docs' to list topics",
                    name
                ))
            })?;
            print_topic(topic);
        }
        None => {
            ui::section("Documentation topics");
            for topic in TOPICS {
                println!("  {:<18} {}", topic.slug, topic.title);
            }
        }
    }
    Ok(())
}

pub fn menu() -> Result<(), AppError> {
    let titles: Vec<&str> = TOPICS.iter().map(|t| t.title).collect();
    loop {
        match Menu::new("Documentation", &titles).run()? {
            MenuChoice::Back => return Ok(()),
            MenuChoice::Item(index) => {
                print_topic(&TOPICS[index]);
                ui::pause();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_by_slug_or_title() {
        assert_eq!(find("vpn").map(|t| t.title), Some("Point-to-site VPN"));
        assert_eq!(find("Resource Naming").map(|t| t.slug), Some("naming"));
        assert!(find("kubernetes").is_none());
    }

    #[test]
    fn test_naming_topic_matches_resource_names() {
        use crate::core::naming::{ResourceKind, ResourceNames};
        let names = ResourceNames::new("dev", "we", "homelab");
        let body = find("naming").unwrap().body;
        assert!(body.contains(&names.resource_group()));
        assert!(body.contains(&names.site(ResourceKind::StaticWebApp, "blog")));
    }
}
