//! GitHub REST API client (PAT authentication).

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::core::config::RepositorySelection;
use crate::core::error::AppError;

pub const GITHUB_API_URL: &str = "https://api.github.com";
const PER_PAGE: usize = 100;
/// Upper bound on pages fetched for `/user/repos`.
const MAX_PAGES: usize = 20;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct GitHubUser {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub public_repos: u32,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Repository {
    pub name: String,
    pub full_name: String,
    pub clone_url: String,
    #[serde(default = "default_branch")]
    pub default_branch: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub updated_at: Option<String>,
}

fn default_branch() -> String {
    "main".to_string()
}

impl Repository {
    /// Label for selection lists.
    pub fn label(&self) -> String {
        let visibility = if self.private { "private" } else { "public" };
        match &self.description {
            Some(desc) if !desc.is_empty() => {
                format!("{} ({}) - {}", self.full_name, visibility, desc)
            }
            _ => format!("{} ({})", self.full_name, visibility),
        }
    }

    pub fn to_selection(&self) -> RepositorySelection {
        RepositorySelection {
            name: self.name.clone(),
            full_name: self.full_name.clone(),
            clone_url: self.clone_url.clone(),
            branch: self.default_branch.clone(),
            description: self.description.clone(),
            private: self.private,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RateLimitResponse {
    rate: RateLimit,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct RateLimit {
    pub limit: u32,
    pub remaining: u32,
    /// Unix timestamp when the window resets.
    pub reset: i64,
}

impl RateLimit {
    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.reset, 0).single()
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Result of checking a token against `/user`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected(GitHubUser),
    NotConnected {
        reason: String,
        hint: Option<&'static str>,
    },
}

/// Blocking GitHub API client.
pub struct GitHubClient {
    client: Client,
    base_url: String,
}

impl GitHubClient {
    pub fn new(token: &str) -> Result<Self, AppError> {
        Self::with_base_url(GITHUB_API_URL, token)
    }

    /// Client against another API root (GitHub Enterprise, tests).
    pub fn with_base_url(base_url: &str, token: &str) -> Result<Self, AppError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("token {}", token.trim()))
            .map_err(|_| AppError::Validation("Token contains invalid characters".into()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("homelab-console"));

        let builder = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(15));
        // Mock servers in tests listen on loopback.
        #[cfg(test)]
        let builder = builder.no_proxy();
        let client = builder.build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, AppError> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .send()?;
        Ok(check_status(response)?.json()?)
    }

    /// `GET /user`
    pub fn user(&self) -> Result<GitHubUser, AppError> {
        self.get("/user")
    }

    /// `GET /user/repos`, most recently updated first, all pages.
    pub fn repositories(&self) -> Result<Vec<Repository>, AppError> {
        let mut repos = Vec::new();
        for page in 1..=MAX_PAGES {
            let batch: Vec<Repository> = self.get(&format!(
                "/user/repos?per_page={}&sort=updated&page={}",
                PER_PAGE, page
            ))?;
            let done = batch.len() < PER_PAGE;
            repos.extend(batch);
            if done {
                break;
            }
        }
        Ok(repos)
    }

    /// `GET /rate_limit`
    pub fn rate_limit(&self) -> Result<RateLimit, AppError> {
        let body: RateLimitResponse = self.get("/rate_limit")?;
        Ok(body.rate)
    }

    /// Checks the token. Auth failures are a status, not an error.
    pub fn validate_token(&self) -> ConnectionStatus {
        match self.user() {
            Ok(user) => ConnectionStatus::Connected(user),
            Err(e) => ConnectionStatus::NotConnected {
                reason: e.to_string(),
                hint: e.hint(),
            },
        }
    }
}

/// Maps non-2xx responses to errors.
fn check_status(response: Response) -> Result<Response, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .text()
        .ok()
        .and_then(|body| serde_json::from_str::<ErrorBody>(&body).ok())
        .map(|b| b.message)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());

    Err(match status {
        StatusCode::UNAUTHORIZED => AppError::GitHubUnauthorized,
        StatusCode::FORBIDDEN => AppError::GitHubForbidden(message),
        _ => AppError::GitHub {
            status: status.as_u16(),
            message,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tiny_http::{Header, Response as MockResponse, Server};

    /// Serves canned responses for the given number of requests and
    /// returns the base URL plus the captured `Authorization` headers.
    fn mock_server(
        replies: Vec<(u16, String)>,
    ) -> (String, thread::JoinHandle<Vec<(String, String)>>) {
        let server = Server::http("127.0.0.1:0").unwrap();
        let url = format!("http://{}", server.server_addr().to_ip().unwrap());

        let handle = thread::spawn(move || {
            let mut seen = Vec::new();
            for (status, body) in replies {
                let request = server.recv().unwrap();
                let auth = request
                    .headers()
                    .iter()
                    .find(|h| h.field.equiv("Authorization"))
                    .map(|h| h.value.as_str().to_string())
                    .unwrap_or_default();
                seen.push((request.url().to_string(), auth));
                let response = MockResponse::from_string(body)
                    .with_status_code(status)
                    .with_header(
                        Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                            .unwrap(),
                    );
                request.respond(response).unwrap();
            }
            seen
        });

        (url, handle)
    }

    #[test]
    fn test_invalid_token_is_not_connected_with_hint() {
        let (url, handle) = mock_server(vec![(
            401,
            r#"{"message":"Bad credentials","documentation_url":"https://docs.github.com/rest"}"#
                .to_string(),
        )]);

        let client = GitHubClient::with_base_url(&url, "ghp_invalid").unwrap();
        let status = client.validate_token();

        match status {
            ConnectionStatus::NotConnected { reason, hint } => {
                assert!(reason.contains("401"));
                assert!(hint.unwrap().contains("PAT"));
            }
            other => panic!("expected NotConnected, got {:?}", other),
        }

        let seen = handle.join().unwrap();
        assert_eq!(seen[0].0, "/user");
        assert_eq!(seen[0].1, "token ghp_invalid");
    }

    #[test]
    fn test_valid_token_parses_user() {
        let (url, handle) = mock_server(vec![(
            200,
            r#"{"login":"octocat","name":"The Octocat","public_repos":8,"id":1}"#.to_string(),
        )]);

        let client = GitHubClient::with_base_url(&url, "ghp_valid").unwrap();
        let status = client.validate_token();
        handle.join().unwrap();

        assert_eq!(
            status,
            ConnectionStatus::Connected(GitHubUser {
                login: "octocat".into(),
                name: Some("The Octocat".into()),
                public_repos: 8,
            })
        );
    }

    #[test]
    fn test_forbidden_keeps_message() {
        let (url, handle) = mock_server(vec![(
            403,
            r#"{"message":"API rate limit exceeded"}"#.to_string(),
        )]);

        let client = GitHubClient::with_base_url(&url, "ghp_valid").unwrap();
        let err = client.rate_limit().unwrap_err();
        handle.join().unwrap();

        assert!(matches!(err, AppError::GitHubForbidden(_)));
        assert!(err.to_string().contains("rate limit exceeded"));
    }

    #[test]
    fn test_rate_limit() {
        let (url, handle) = mock_server(vec![(
            200,
            r#"{"resources":{},"rate":{"limit":5000,"remaining":4999,"reset":1714557600,"used":1}}"#
                .to_string(),
        )]);

        let client = GitHubClient::with_base_url(&url, "ghp_valid").unwrap();
        let rate = client.rate_limit().unwrap();
        handle.join().unwrap();

        assert_eq!(rate.limit, 5000);
        assert_eq!(rate.remaining, 4999);
        assert!(rate.reset_at().is_some());
    }

    #[test]
    fn test_repositories_single_page() {
        let (url, handle) = mock_server(vec![(
            200,
            r#"[{"name":"blog","full_name":"octo/blog","clone_url":"https://github.com/octo/blog.git",
                 "default_branch":"main","description":"My blog","private":false}]"#
                .to_string(),
        )]);

        let client = GitHubClient::with_base_url(&url, "ghp_valid").unwrap();
        let repos = client.repositories().unwrap();
        let seen = handle.join().unwrap();

        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].label(), "octo/blog (public) - My blog");
        assert_eq!(seen[0].0, "/user/repos?per_page=100&sort=updated&page=1");
        assert_eq!(repos[0].to_selection().branch, "main");
    }

    #[test]
    fn test_other_status_maps_to_github_error() {
        let (url, handle) = mock_server(vec![(404, r#"{"message":"Not Found"}"#.to_string())]);

        let client = GitHubClient::with_base_url(&url, "ghp_valid").unwrap();
        let err = client.user().unwrap_err();
        handle.join().unwrap();

        assert!(matches!(err, AppError::GitHub { status: 404, .. }));
    }
}
