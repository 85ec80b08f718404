//! AWS Secrets Manager backend

use async_trait::async_trait;
use aws_sdk_secretsmanager::Client;
use certship_core::IssueError;
use tracing::{debug, error};

use crate::store::SecretStore;

/// Secret store backed by AWS Secrets Manager. Credentials and region come
/// from the standard environment; nothing is read from config files.
pub struct AwsSecretStore {
    client: Client,
}

impl AwsSecretStore {
    /// Create a store from the ambient AWS environment
    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self {
            client: Client::new(&config),
        }
    }

    /// Create a store from an already configured client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretStore for AwsSecretStore {
    async fn fetch_latest(&self, name: &str) -> Result<Vec<u8>, IssueError> {
        debug!(secret = name, "Fetching secret value");
        let value = self
            .client
            .get_secret_value()
            .secret_id(name)
            .send()
            .await
            .map_err(|e| {
                error!(secret = name, error = %e, "Secret fetch failed");
                IssueError::SecretFetch(format!("Cannot fetch secret {name}!"))
            })?;
        if let Some(text) = value.secret_string() {
            return Ok(text.as_bytes().to_vec());
        }
        if let Some(blob) = value.secret_binary() {
            return Ok(blob.as_ref().to_vec());
        }
        Err(IssueError::SecretFetch(format!(
            "Secret {name} has no value!"
        )))
    }
}
