use thiserror::Error;

/// Application-level errors for homelab operations.
#[derive(Debug, Error)]
pub enum AppError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown configuration key '{0}'")]
    UnknownConfigKey(String),

    // Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    // External command errors
    #[error("Command execution failed: {0}")]
    Command(String),

    #[error("Required tool '{0}' is not installed or not on PATH")]
    ToolMissing(String),

    // Azure errors
    #[error("Azure CLI error: {0}")]
    AzureCli(String),

    #[error("Not logged in to Azure")]
    NotLoggedIn,

    // GitHub errors
    #[error("GitHub API returned {status}: {message}")]
    GitHub { status: u16, message: String },

    #[error("GitHub rejected the token (401 Unauthorized)")]
    GitHubUnauthorized,

    #[error("GitHub refused the request (403 Forbidden): {0}")]
    GitHubForbidden(String),

    #[error("GitHub is not connected")]
    GitHubNotConnected,

    #[error("Git error: {0}")]
    Git(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // VPN certificates
    #[error("Certificate error: {0}")]
    Certificate(String),

    // Deployment errors
    #[error("Deployment error: {0}")]
    Deploy(String),

    #[error("Timed out after {minutes} minutes waiting for {what}")]
    MonitorTimeout { what: String, minutes: u64 },

    // Other errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Operation cancelled by user")]
    Cancelled,
}

impl AppError {
    /// Returns a short resolution hint for errors the user can act on.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::GitHubUnauthorized => Some(
                "The token is invalid or expired. Create a new PAT with the 'repo' scope at https://github.com/settings/tokens",
            ),
            Self::GitHubForbidden(_) => Some(
                "The token lacks the required scope or the API rate limit is exhausted. Check 'homelab github status'",
            ),
            Self::GitHubNotConnected => Some("Run 'homelab github connect' first"),
            Self::NotLoggedIn => Some("Run 'az login' (or choose 'Log in' from the menu)"),
            Self::ToolMissing(tool) if tool == "az" => {
                Some("Install the Azure CLI: https://aka.ms/installazurecli")
            }
            Self::ToolMissing(_) => Some("Install the tool and make sure it is on PATH"),
            Self::MonitorTimeout { .. } => Some(
                "The operation may still be running in Azure. Check the portal or run 'homelab infra status'",
            ),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_has_token_hint() {
        let err = AppError::GitHubUnauthorized;
        assert!(err.hint().unwrap().contains("PAT"));
    }

    #[test]
    fn test_plain_errors_have_no_hint() {
        assert!(AppError::Config("broken".into()).hint().is_none());
    }
}
