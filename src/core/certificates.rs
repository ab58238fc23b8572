//! Self-signed certificates for point-to-site VPN.
//!
//! Layout under the certificate directory:
//! `roots/<name>.crt|.key` and `clients/<name>.crt|.key|.pfx`.

use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};

use crate::core::context::ExecutionContext;
use crate::core::error::AppError;
use crate::core::paths;

const ROOTS_DIR: &str = "roots";
const CLIENTS_DIR: &str = "clients";
const ROOT_VALIDITY_DAYS: &str = "3650";
const CLIENT_VALIDITY_DAYS: &str = "730";
const KEY_SPEC: &str = "rsa:4096";
const PFX_PASSWORD_ENV: &str = "HOMELAB_PFX_PASSWORD";

const PEM_BEGIN: &str = "-----BEGIN CERTIFICATE-----";
const PEM_END: &str = "-----END CERTIFICATE-----";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateKind {
    Root,
    Client,
}

impl CertificateKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Client => "client",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    pub name: String,
    pub kind: CertificateKind,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    /// PKCS#12 bundle, clients only.
    pub pfx_path: Option<PathBuf>,
}

/// Certificates on disk plus the `openssl` calls that create them.
pub struct CertificateStore {
    dir: PathBuf,
}

impl CertificateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store at `~/.homelab/certificates` (or `HOMELAB_CERT_DIR`).
    pub fn open_default() -> Result<Self, AppError> {
        Ok(Self::new(paths::certificates_dir()?))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn kind_dir(&self, kind: CertificateKind) -> PathBuf {
        match kind {
            CertificateKind::Root => self.dir.join(ROOTS_DIR),
            CertificateKind::Client => self.dir.join(CLIENTS_DIR),
        }
    }

    fn certificate(&self, name: &str, kind: CertificateKind) -> Certificate {
        let dir = self.kind_dir(kind);
        Certificate {
            name: name.to_string(),
            kind,
            cert_path: dir.join(format!("{}.crt", name)),
            key_path: dir.join(format!("{}.key", name)),
            pfx_path: match kind {
                CertificateKind::Root => None,
                CertificateKind::Client => Some(dir.join(format!("{}.pfx", name))),
            },
        }
    }

    pub fn root(&self, name: &str) -> Option<Certificate> {
        let cert = self.certificate(name, CertificateKind::Root);
        (cert.cert_path.exists() && cert.key_path.exists()).then_some(cert)
    }

    /// Creates a self-signed root CA.
    pub fn create_root(&self, name: &str, ctx: &ExecutionContext) -> Result<Certificate, AppError> {
        let cert = self.certificate(name, CertificateKind::Root);
        if cert.cert_path.exists() {
            return Err(AppError::Certificate(format!(
                "Root certificate '{}' already exists",
                name
            )));
        }
        fs::create_dir_all(self.kind_dir(CertificateKind::Root))?;

        let key = cert.key_path.to_string_lossy();
        let crt = cert.cert_path.to_string_lossy();
        let subject = format!("/CN={}", name);
        openssl(
            ctx,
            &[
                "req", "-x509", "-new", "-newkey", KEY_SPEC, "-sha256", "-nodes", "-days",
                ROOT_VALIDITY_DAYS, "-keyout", &*key, "-out", &*crt, "-subj",
                &subject,
            ],
            &[],
            "Failed to create root certificate",
        )?;
        Ok(cert)
    }

    /// Creates a client certificate signed by `root` and bundles it as PFX.
    pub fn create_client(
        &self,
        name: &str,
        root: &Certificate,
        pfx_password: &str,
        ctx: &ExecutionContext,
    ) -> Result<Certificate, AppError> {
        let cert = self.certificate(name, CertificateKind::Client);
        if cert.cert_path.exists() {
            return Err(AppError::Certificate(format!(
                "Client certificate '{}' already exists",
                name
            )));
        }
        let client_dir = self.kind_dir(CertificateKind::Client);
        fs::create_dir_all(&client_dir)?;

        let csr_path = client_dir.join(format!("{}.csr", name));
        let ext_path = client_dir.join(format!("{}.ext", name));
        fs::write(&ext_path, "extendedKeyUsage = clientAuth\n")?;

        let key = cert.key_path.to_string_lossy().into_owned();
        let crt = cert.cert_path.to_string_lossy().into_owned();
        let csr = csr_path.to_string_lossy().into_owned();
        let ext = ext_path.to_string_lossy().into_owned();
        let root_crt = root.cert_path.to_string_lossy().into_owned();
        let root_key = root.key_path.to_string_lossy().into_owned();
        let subject = format!("/CN={}", name);

        let result: Result<(), AppError> = (|| {
            openssl(
                ctx,
                &[
                    "req", "-new", "-newkey", KEY_SPEC, "-nodes", "-keyout", &*key, "-out",
                    &*csr, "-subj", &subject,
                ],
                &[],
                "Failed to create client key",
            )?;
            openssl(
                ctx,
                &[
                    "x509", "-req", "-in", &*csr, "-CA", &*root_crt, "-CAkey",
                    &*root_key, "-CAcreateserial", "-out", &*crt, "-days",
                    CLIENT_VALIDITY_DAYS, "-sha256", "-extfile", &*ext,
                ],
                &[],
                "Failed to sign client certificate",
            )?;
            if let Some(pfx) = &cert.pfx_path {
                let pfx = pfx.to_string_lossy();
                let passout = format!("env:{}", PFX_PASSWORD_ENV);
                openssl(
                    ctx,
                    &[
                        "pkcs12", "-export", "-inkey", &*key, "-in", &*crt,
                        "-certfile", &*root_crt, "-out", &*pfx, "-passout",
                        &passout,
                    ],
                    &[(PFX_PASSWORD_ENV, pfx_password)],
                    "Failed to export PFX",
                )?;
            }
            Ok(())
        })();

        let _ = fs::remove_file(&csr_path);
        let _ = fs::remove_file(&ext_path);
        result.map(|_| cert)
    }

    /// All certificates, roots first, sorted by name.
    pub fn list(&self) -> Result<Vec<Certificate>, AppError> {
        let mut certs = Vec::new();
        for kind in [CertificateKind::Root, CertificateKind::Client] {
            let dir = self.kind_dir(kind);
            if !dir.is_dir() {
                continue;
            }
            let mut names: Vec<String> = fs::read_dir(&dir)?
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("crt"))
                .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
                .collect();
            names.sort();
            certs.extend(names.iter().map(|n| self.certificate(n, kind)));
        }
        Ok(certs)
    }

    pub fn roots(&self) -> Result<Vec<Certificate>, AppError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|c| c.kind == CertificateKind::Root)
            .collect())
    }

    /// Base64 body of a certificate, as Azure expects for `--public-cert-data`.
    pub fn read_public_data(&self, cert: &Certificate) -> Result<String, AppError> {
        let pem = fs::read_to_string(&cert.cert_path).map_err(|e| {
            AppError::Certificate(format!("Cannot read {}: {}", cert.cert_path.display(), e))
        })?;
        public_cert_data(&pem)
    }
}

fn openssl(
    ctx: &ExecutionContext,
    args: &[&str],
    envs: &[(&str, &str)],
    context: &str,
) -> Result<(), AppError> {
    let output = ctx.run_command_with_env("openssl", args, None, envs)?;
    if output.dry_run || output.success {
        Ok(())
    } else {
        Err(AppError::Certificate(format!("{}: {}", context, output.stderr)))
    }
}

/// Strips the PEM armor and whitespace from the first certificate block.
pub fn public_cert_data(pem: &str) -> Result<String, AppError> {
    let start = pem
        .find(PEM_BEGIN)
        .ok_or_else(|| AppError::Certificate("No PEM certificate block found".into()))?;
    let body = &pem[start + PEM_BEGIN.len()..];
    let end = body
        .find(PEM_END)
        .ok_or_else(|| AppError::Certificate("Unterminated PEM certificate block".into()))?;

    let data: String = body[..end].chars().filter(|c| !c.is_whitespace()).collect();
    if data.is_empty() {
        return Err(AppError::Certificate("Empty PEM certificate block".into()));
    }
    STANDARD
        .decode(&data)
        .map_err(|e| AppError::Certificate(format!("Certificate is not valid base64: {}", e)))?;
    Ok(data)
}

/// SHA-256 of the DER bytes, lowercase hex.
pub fn fingerprint(pem: &str) -> Result<String, AppError> {
    let der = STANDARD
        .decode(public_cert_data(pem)?)
        .map_err(|e| AppError::Certificate(e.to_string()))?;
    Ok(hex::encode(Sha256::digest(&der)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const PEM: &str = "-----BEGIN CERTIFICATE-----\nTUlJ\nQg==\n-----END CERTIFICATE-----\n";

    #[test]
    fn test_public_cert_data() {
        assert_eq!(public_cert_data(PEM).unwrap(), "TUlJQg==");
    }

    #[test]
    fn test_public_cert_data_rejects_garbage() {
        assert!(public_cert_data("hello").is_err());
        assert!(public_cert_data("-----BEGIN CERTIFICATE-----\n!!!\n-----END CERTIFICATE-----").is_err());
        assert!(public_cert_data("-----BEGIN CERTIFICATE-----\n-----END CERTIFICATE-----").is_err());
    }

    #[test]
    fn test_fingerprint() {
        assert_eq!(
            fingerprint(PEM).unwrap(),
            "bd7f32578c72343bdb2f56a6b320ed68a08a3c31f7edce306a595f55aa1502e5"
        );
    }

    #[test]
    fn test_list_and_read() {
        let dir = tempdir().unwrap();
        let store = CertificateStore::new(dir.path());
        assert!(store.list().unwrap().is_empty());

        fs::create_dir_all(dir.path().join("roots")).unwrap();
        fs::create_dir_all(dir.path().join("clients")).unwrap();
        fs::write(dir.path().join("roots/HomelabRoot.crt"), PEM).unwrap();
        fs::write(dir.path().join("roots/HomelabRoot.key"), "key").unwrap();
        fs::write(dir.path().join("clients/laptop.crt"), PEM).unwrap();

        let certs = store.list().unwrap();
        assert_eq!(certs.len(), 2);
        assert_eq!(certs[0].kind, CertificateKind::Root);
        assert_eq!(certs[1].name, "laptop");
        assert!(certs[1].pfx_path.is_some());

        let root = store.root("HomelabRoot").unwrap();
        assert_eq!(store.read_public_data(&root).unwrap(), "TUlJQg==");
        assert_eq!(store.roots().unwrap().len(), 1);
    }

    #[test]
    fn test_create_client_dry_run_keeps_password_out_of_argv() {
        let dir = tempdir().unwrap();
        let store = CertificateStore::new(dir.path());
        let ctx = ExecutionContext::new(true, false);

        let root = store.create_root("HomelabRoot", &ctx).unwrap();
        store.create_client("laptop", &root, "s3cret", &ctx).unwrap();

        let plan = ctx.planned_commands();
        assert_eq!(plan.len(), 4);
        assert!(plan[0].starts_with("openssl req -x509"));
        assert!(plan[3].contains("-passout env:HOMELAB_PFX_PASSWORD"));
        assert!(plan.iter().all(|c| !c.contains("s3cret")));
        // Temporary signing files are removed.
        assert!(!dir.path().join("clients/laptop.ext").exists());
    }

    #[test]
    fn test_existing_root_is_not_overwritten() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("roots")).unwrap();
        fs::write(dir.path().join("roots/HomelabRoot.crt"), PEM).unwrap();

        let store = CertificateStore::new(dir.path());
        let ctx = ExecutionContext::new(true, false);
        assert!(store.create_root("HomelabRoot", &ctx).is_err());
    }
}
