//! Object storage traits

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use certship_core::IssueError;
use thiserror::Error;

/// Failure of a single object transfer. Carries the backend message only;
/// the publisher attaches bucket and source attribution.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct UploadError(pub String);

/// Object storage backend, resolved into bucket handles
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Resolve a bucket handle, verifying the bucket is reachable. Missing
    /// or unauthorized buckets fail before any object is attempted.
    async fn bucket(&self, name: &str) -> Result<Arc<dyn Bucket>, IssueError>;
}

/// Handle to one resolved bucket
#[async_trait]
pub trait Bucket: Send + Sync {
    fn name(&self) -> &str;

    /// Upload one local file to the given object key
    async fn upload_file(&self, source: &Path, dest: &str) -> Result<(), UploadError>;

    /// Upload an in-memory payload to the given object key
    async fn upload_bytes(&self, data: Vec<u8>, dest: &str) -> Result<(), UploadError>;
}
