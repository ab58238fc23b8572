pub mod certificates;
pub mod config;
pub mod context;
pub mod credentials;
pub mod detection;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod naming;
pub mod paths;
pub mod session;
pub mod website;

pub use certificates::{Certificate, CertificateKind, CertificateStore};
pub use config::{HomelabConfig, RepositorySelection};
pub use context::{CommandOutput, ExecutionContext};
pub use credentials::{GitHubConfig, TokenSource};
pub use detection::{detect_deployment_type, DeploymentKind, DetectionConfidence, DetectionResult, Runtime};
pub use error::AppError;
pub use logging::{LogLevel, Logger};
pub use monitor::{
    AwaitTransition, BackgroundJobs, DeploymentMonitor, MonitorHandle, MonitorOutcome,
    MonitorSettings, ProvisioningProbe, ProvisioningState,
};
pub use naming::{ResourceKind, ResourceNames};
pub use session::Session;
pub use website::{
    recommended_target, DeployRequest, DeploymentResult, DeploymentStatus, DeploymentTarget,
    SiteSource,
};
