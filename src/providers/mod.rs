pub mod azure;
pub mod git;
pub mod github;
pub mod hosting;

pub use azure::{AzureAccount, AzureCli, DeploymentProbe, GroupDeletionProbe, VpnGatewayProbe};
pub use git::GitProvider;
pub use github::{ConnectionStatus, GitHubClient, Repository};
pub use hosting::{create_hosting_provider, HostingProvider};
