//! Certificate issuance orchestration

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use certship_core::{IssueError, IssueRequest};
use certship_secrets::SecretResolver;
use certship_storage::{normalize_key, publish_directory, publish_marker, ObjectStore};
use chrono::Utc;
use tracing::{error, info};

use crate::command::{CommandError, CommandRunner, OutputSink};
use crate::providers::{self, DnsProvider};
use crate::workspace::CertbotWorkspace;

/// Timestamp layout for snapshot prefixes and log markers.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S_UTC";

/// Locators of a published certificate bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishResult {
    pub live_s3_path: String,
    pub timed_s3_path: String,
}

/// Drives one issuance job end to end: credentials, workspace, certbot,
/// publish. A single instance serves all requests; per-job state lives on
/// the stack of `issue`.
pub struct IssueService {
    secrets: SecretResolver,
    store: Arc<dyn ObjectStore>,
    runner: Arc<dyn CommandRunner>,
    sink: Arc<dyn OutputSink>,
    certbot_path: String,
}

impl IssueService {
    pub fn new(
        secrets: SecretResolver,
        store: Arc<dyn ObjectStore>,
        runner: Arc<dyn CommandRunner>,
        sink: Arc<dyn OutputSink>,
        certbot_path: impl Into<String>,
    ) -> Self {
        Self {
            secrets,
            store,
            runner,
            sink,
            certbot_path: certbot_path.into(),
        }
    }

    /// Uploads the zero-byte marker to `<path>/logs/<timestamp>`. Proves
    /// the bucket is writable before any expensive work and stays behind
    /// as the job's log marker.
    pub async fn preflight_marker(&self, req: &IssueRequest) -> Result<(), IssueError> {
        let bucket = self.store.bucket(&req.target_bucket).await?;
        let stamp = Utc::now().format(TIMESTAMP_FORMAT).to_string();
        let marker = normalize_key(&format!("{}/logs/{}", req.target_bucket_path, stamp));
        publish_marker(bucket.as_ref(), &marker).await
    }

    /// Runs the issuance pipeline for a validated request. The workspace
    /// is torn down when this returns, whatever the outcome.
    pub async fn issue(&self, req: &IssueRequest) -> Result<PublishResult, IssueError> {
        let provider = providers::lookup(&req.provider)?;
        let secret = self.secrets.resolve(&req.project, &req.secret_id).await?;
        let workspace = CertbotWorkspace::prepare(&secret)?;

        let command = build_command(&self.certbot_path, provider, req, &workspace);
        let timeout_secs = issue_timeout_secs(req.propagation_seconds);
        info!(command = %command.join(" "), timeout_secs, "Issue command");

        let outcome = match self
            .runner
            .run(&command, Duration::from_secs(timeout_secs), self.sink.clone())
            .await
        {
            Ok(outcome) => outcome,
            Err(CommandError::TimedOut { output }) => {
                return Err(IssueError::CertbotTimeout {
                    command,
                    timeout_secs,
                    output,
                })
            }
            Err(e) => {
                error!(error = %e, "Certbot could not be run");
                return Err(IssueError::Certbot {
                    command,
                    timeout_secs,
                    output: String::new(),
                });
            }
        };
        if outcome.exit_code != 0 {
            return Err(IssueError::Certbot {
                command,
                timeout_secs,
                output: outcome.output,
            });
        }

        info!(cert_name = workspace.cert_name(), "Certbot finished, publishing bundle");
        self.publish(req, workspace.certificates_dir()).await
    }

    async fn publish(
        &self,
        req: &IssueRequest,
        certificates_dir: &Path,
    ) -> Result<PublishResult, IssueError> {
        let bucket = self.store.bucket(&req.target_bucket).await?;
        // one timestamp for the snapshot prefix and any log correlation
        let stamp = Utc::now().format(TIMESTAMP_FORMAT).to_string();
        let live_prefix = normalize_key(&format!("{}/live", req.target_bucket_path));
        let timed_prefix = normalize_key(&format!("{}/{}", req.target_bucket_path, stamp));

        publish_directory(certificates_dir, bucket.as_ref(), &live_prefix).await?;
        publish_directory(certificates_dir, bucket.as_ref(), &timed_prefix).await?;

        Ok(PublishResult {
            live_s3_path: format!("s3://{}/{}", bucket.name(), live_prefix),
            timed_s3_path: format!("s3://{}/{}", bucket.name(), timed_prefix),
        })
    }
}

/// Deadline for the certbot run: double the propagation wait the tool will
/// sleep through, never under ten seconds.
pub fn issue_timeout_secs(propagation_seconds: u64) -> u64 {
    propagation_seconds.saturating_mul(2).max(10)
}

/// The exact certbot argv for a request. Auth tokens are whitespace-split
/// (godaddy encodes two), `-d` pairs keep the caller's domain order.
fn build_command(
    certbot_path: &str,
    provider: &DnsProvider,
    req: &IssueRequest,
    workspace: &CertbotWorkspace,
) -> Vec<String> {
    let mut command = vec![
        certbot_path.to_string(),
        "--noninteractive".to_string(),
        format!("--config-dir={}", workspace.config_dir().display()),
        format!("--work-dir={}", workspace.work_dir().display()),
        format!("--logs-dir={}", workspace.logs_dir().display()),
        "--force-renewal".to_string(),
        "--agree-tos".to_string(),
        "--email".to_string(),
        req.email.clone(),
        "--manual-public-ip-logging-ok".to_string(),
        "certonly".to_string(),
    ];
    command.extend(provider.auth_option.split_whitespace().map(String::from));
    command.push(provider.credentials_option.to_string());
    command.push(workspace.secret_path().display().to_string());
    command.push(provider.propagation_option.to_string());
    command.push(req.propagation_seconds.to_string());
    command.push("--cert-name".to_string());
    command.push(workspace.cert_name().to_string());
    for domain in &req.domains {
        command.push("-d".to_string());
        command.push(domain.clone());
    }
    command
}
