//! Secret store trait

use async_trait::async_trait;
use certship_core::IssueError;

/// Backend-neutral secret access, implemented for different secret backends
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch the current value of the named secret
    async fn fetch_latest(&self, name: &str) -> Result<Vec<u8>, IssueError>;
}
