//! Per-job certbot workspace

use std::fs;
use std::path::{Path, PathBuf};

use certship_core::IssueError;
use tempfile::TempDir;
use tracing::debug;
use uuid::Uuid;

/// Isolated filesystem layout for one certbot run. Dropping the value
/// removes the whole tree, so teardown happens on success and on every
/// error path alike.
pub struct CertbotWorkspace {
    root: TempDir,
    cert_name: String,
    config_dir: PathBuf,
    logs_dir: PathBuf,
    work_dir: PathBuf,
    secret_path: PathBuf,
    certificates_dir: PathBuf,
}

impl CertbotWorkspace {
    /// Creates the directory layout and writes the credential payload
    /// verbatim to `secret.file`. The certificate output directory
    /// (`config/live/<cert-name>`) is computed here but created by certbot.
    pub fn prepare(secret: &str) -> Result<Self, IssueError> {
        let root = tempfile::Builder::new()
            .prefix("certbot-")
            .tempdir()
            .map_err(|e| IssueError::Internal(format!("Cannot create workspace root: {e}")))?;

        let config_dir = root.path().join("config");
        let logs_dir = root.path().join("logs");
        let work_dir = root.path().join("workspace");
        let secret_path = root.path().join("secret.file");
        create(&config_dir)?;
        create(&logs_dir)?;
        create(&work_dir)?;
        fs::write(&secret_path, secret).map_err(|e| {
            IssueError::Internal(format!("Cannot write {}: {e}", secret_path.display()))
        })?;

        let cert_name = format!("cert-{}", Uuid::new_v4());
        let certificates_dir = config_dir.join("live").join(&cert_name);
        debug!(
            root = %root.path().display(),
            cert_name = %cert_name,
            "Certbot workspace prepared"
        );
        Ok(Self {
            root,
            cert_name,
            config_dir,
            logs_dir,
            work_dir,
            secret_path,
            certificates_dir,
        })
    }

    /// Random certificate lineage name, `cert-<uuid>`
    pub fn cert_name(&self) -> &str {
        &self.cert_name
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn logs_dir(&self) -> &Path {
        &self.logs_dir
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn secret_path(&self) -> &Path {
        &self.secret_path
    }

    /// Where certbot leaves the issued bundle. Computed from certbot's
    /// `live/<cert-name>` naming convention, not discovered from output;
    /// this is the single place to touch if that convention moves.
    pub fn certificates_dir(&self) -> &Path {
        &self.certificates_dir
    }

    pub fn root_path(&self) -> &Path {
        self.root.path()
    }
}

fn create(dir: &Path) -> Result<(), IssueError> {
    fs::create_dir(dir)
        .map_err(|e| IssueError::Internal(format!("Cannot create {}: {e}", dir.display())))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[test]
    fn lays_out_distinct_paths() {
        let ws = CertbotWorkspace::prepare("secret").unwrap();
        let paths: BTreeSet<&Path> = [
            ws.config_dir(),
            ws.logs_dir(),
            ws.work_dir(),
            ws.secret_path(),
            ws.certificates_dir(),
        ]
        .into_iter()
        .collect();
        assert_eq!(paths.len(), 5);
        for path in &paths {
            assert!(path.starts_with(ws.root_path()));
        }
    }

    #[test]
    fn creates_directories_but_not_the_certificate_dir() {
        let ws = CertbotWorkspace::prepare("secret").unwrap();
        assert!(ws.config_dir().is_dir());
        assert!(ws.logs_dir().is_dir());
        assert!(ws.work_dir().is_dir());
        assert!(!ws.certificates_dir().exists());
        assert_eq!(
            ws.certificates_dir(),
            ws.config_dir().join("live").join(ws.cert_name())
        );
    }

    #[test]
    fn writes_the_secret_verbatim() {
        let payload = "line one\nline two";
        let ws = CertbotWorkspace::prepare(payload).unwrap();
        let written = fs::read_to_string(ws.secret_path()).unwrap();
        assert_eq!(written, payload);
    }

    #[test]
    fn cert_name_is_a_random_uuid() {
        let a = CertbotWorkspace::prepare("s").unwrap();
        let b = CertbotWorkspace::prepare("s").unwrap();
        let suffix = a.cert_name().strip_prefix("cert-").unwrap();
        assert!(Uuid::parse_str(suffix).is_ok());
        assert_ne!(a.cert_name(), b.cert_name());
        assert_ne!(a.root_path(), b.root_path());
    }

    #[test]
    fn drop_removes_the_tree() {
        let ws = CertbotWorkspace::prepare("secret").unwrap();
        let root = ws.root_path().to_path_buf();
        assert!(root.exists());
        drop(ws);
        assert!(!root.exists());
    }
}
