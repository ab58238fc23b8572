//! Website type detection from project files.
//!
//! Inspects a project directory and decides which kind of Azure hosting fits:
//! a static site, an App Service web app, or a container app.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Node packages that mean "this is a server, not a static build".
const NODE_SERVER_PACKAGES: &[&str] = &[
    "express",
    "koa",
    "fastify",
    "@nestjs/core",
    "@hapi/hapi",
    "hapi",
];

const PYTHON_MARKERS: &[&str] = &["requirements.txt", "pyproject.toml", "Pipfile"];
const DOTNET_EXTENSIONS: &[&str] = &["csproj", "fsproj", "sln"];
const STATIC_ROOTS: &[&str] = &["", "public", "dist"];

/// How a website is hosted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeploymentKind {
    /// Pre-built HTML/JS/CSS (Static Web Apps, Vercel, Netlify).
    Static,
    /// Server-side app on a managed runtime.
    AppService,
    /// Anything with a Dockerfile.
    ContainerApp,
}

impl DeploymentKind {
    pub fn all() -> &'static [DeploymentKind] {
        &[Self::Static, Self::AppService, Self::ContainerApp]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Static => "Static website",
            Self::AppService => "App Service (server-side)",
            Self::ContainerApp => "Container App (Dockerfile)",
        }
    }
}

impl fmt::Display for DeploymentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Language runtime found alongside the deployment kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Runtime {
    Node { version: Option<String> },
    Python { version: Option<String> },
    DotNet,
    Php,
}

impl Runtime {
    /// App Service `--runtime` value.
    pub fn app_service_runtime(&self) -> String {
        match self {
            Runtime::Node { version } => {
                let major = version
                    .as_deref()
                    .filter(|v| matches!(*v, "18" | "20" | "22"))
                    .unwrap_or("20");
                format!("NODE:{}-lts", major)
            }
            Runtime::Python { version } => {
                let minor = version
                    .as_deref()
                    .filter(|v| v.starts_with("3."))
                    .unwrap_or("3.11");
                format!("PYTHON:{}", minor)
            }
            Runtime::DotNet => "DOTNETCORE:8.0".to_string(),
            Runtime::Php => "PHP:8.2".to_string(),
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Runtime::Node { .. } => "Node.js",
            Runtime::Python { .. } => "Python",
            Runtime::DotNet => ".NET",
            Runtime::Php => "PHP",
        }
    }
}

/// Confidence level of detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetectionConfidence {
    /// An explicit marker file (Dockerfile, package.json, *.csproj).
    High,
    /// A weaker signal such as a lone index.html.
    Medium,
    /// Nothing detected
    #[default]
    None,
}

impl DetectionConfidence {
    pub fn display(&self) -> &str {
        match self {
            DetectionConfidence::High => "high confidence",
            DetectionConfidence::Medium => "medium confidence",
            DetectionConfidence::None => "not detected",
        }
    }
}

/// Result of website detection.
#[derive(Debug, Clone, Default)]
pub struct DetectionResult {
    pub kind: Option<DeploymentKind>,
    pub runtime: Option<Runtime>,
    pub confidence: DetectionConfidence,
    /// Files that decided the result, relative to the project root.
    pub detected_files: Vec<String>,
    /// Directory holding the static output, relative to the root ("" = root).
    pub static_root: Option<String>,
}

impl DetectionResult {
    fn found(kind: DeploymentKind, runtime: Option<Runtime>, file: &str) -> Self {
        Self {
            kind: Some(kind),
            runtime,
            confidence: DetectionConfidence::High,
            detected_files: vec![file.to_string()],
            static_root: None,
        }
    }
}

/// Detects how the project at `path` should be hosted. First match wins.
pub fn detect_deployment_type(path: &Path) -> DetectionResult {
    if path.join("Dockerfile").is_file() {
        return DetectionResult::found(DeploymentKind::ContainerApp, None, "Dockerfile");
    }

    if path.join("package.json").is_file() {
        return detect_node(path);
    }

    if let Some(marker) = PYTHON_MARKERS.iter().find(|m| path.join(m).is_file()) {
        let version = read_trimmed(&path.join(".python-version"))
            .map(|v| v.split('.').take(2).collect::<Vec<_>>().join("."));
        return DetectionResult::found(
            DeploymentKind::AppService,
            Some(Runtime::Python { version }),
            marker,
        );
    }

    if let Some(project) = find_dotnet_project(path) {
        let kind = if is_blazor_wasm(&path.join(&project)) {
            DeploymentKind::Static
        } else {
            DeploymentKind::AppService
        };
        return DetectionResult::found(kind, Some(Runtime::DotNet), &project);
    }

    for marker in ["composer.json", "index.php"] {
        if path.join(marker).is_file() {
            return DetectionResult::found(DeploymentKind::AppService, Some(Runtime::Php), marker);
        }
    }

    for root in STATIC_ROOTS {
        let index = path.join(root).join("index.html");
        if index.is_file() {
            let file = if root.is_empty() {
                "index.html".to_string()
            } else {
                format!("{}/index.html", root)
            };
            return DetectionResult {
                kind: Some(DeploymentKind::Static),
                runtime: None,
                confidence: DetectionConfidence::Medium,
                detected_files: vec![file],
                static_root: Some(root.to_string()),
            };
        }
    }

    DetectionResult::default()
}

fn detect_node(path: &Path) -> DetectionResult {
    let manifest = fs::read_to_string(path.join("package.json"))
        .ok()
        .and_then(|content| serde_json::from_str::<Value>(&content).ok());

    let version = read_trimmed(&path.join(".nvmrc"))
        .map(|v| major_version(&v))
        .or_else(|| manifest.as_ref().and_then(node_engine_version));

    let is_server = manifest.as_ref().map(has_server_dependency).unwrap_or(false);
    let kind = if is_server {
        DeploymentKind::AppService
    } else {
        DeploymentKind::Static
    };

    let mut result = DetectionResult::found(kind, Some(Runtime::Node { version }), "package.json");
    if kind == DeploymentKind::Static {
        result.static_root = Some(
            ["dist", "build", "out", "public"]
                .iter()
                .find(|d| path.join(d).is_dir())
                .map(|d| d.to_string())
                .unwrap_or_else(|| "dist".to_string()),
        );
    }
    result
}

fn has_server_dependency(manifest: &Value) -> bool {
    ["dependencies", "devDependencies"].iter().any(|section| {
        manifest
            .get(section)
            .and_then(Value::as_object)
            .map(|deps| NODE_SERVER_PACKAGES.iter().any(|p| deps.contains_key(*p)))
            .unwrap_or(false)
    })
}

fn node_engine_version(manifest: &Value) -> Option<String> {
    manifest
        .get("engines")
        .and_then(|e| e.get("node"))
        .and_then(Value::as_str)
        .map(major_version)
        .filter(|v| !v.is_empty())
}

/// `">=18.2"` -> `"18"`, `"v20.11.0"` -> `"20"`.
fn major_version(raw: &str) -> String {
    raw.trim()
        .trim_start_matches(['>', '=', '<', '^', '~', 'v', ' '])
        .split(['.', ' '])
        .next()
        .unwrap_or("")
        .to_string()
}

fn find_dotnet_project(path: &Path) -> Option<String> {
    let mut matches: Vec<String> = fs::read_dir(path)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| {
            Path::new(name)
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| DOTNET_EXTENSIONS.contains(&e))
                .unwrap_or(false)
        })
        .collect();
    // Project files before solutions, so Blazor detection can read the SDK.
    matches.sort_by_key(|name| (name.ends_with(".sln"), name.clone()));
    matches.into_iter().next()
}

fn is_blazor_wasm(project: &Path) -> bool {
    fs::read_to_string(project)
        .map(|content| {
            content.contains("Microsoft.NET.Sdk.BlazorWebAssembly")
                || content.contains("Microsoft.AspNetCore.Components.WebAssembly")
        })
        .unwrap_or(false)
}

fn read_trimmed(path: &Path) -> Option<String> {
    fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
