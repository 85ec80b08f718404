//! S3-backed object store

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use certship_core::IssueError;
use tracing::{debug, error};

use crate::store::{Bucket, ObjectStore, UploadError};

/// Object store backed by S3 or an S3-compatible endpoint.
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    /// Create a store from the ambient AWS environment. An explicit
    /// `endpoint` overrides the S3 URL and forces path-style addressing,
    /// which MinIO-style deployments require.
    pub async fn from_env(endpoint: Option<&str>) -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let client = match endpoint {
            Some(url) => {
                let s3_config = aws_sdk_s3::config::Builder::from(&config)
                    .endpoint_url(url)
                    .force_path_style(true)
                    .build();
                Client::from_conf(s3_config)
            }
            None => Client::new(&config),
        };
        Self { client }
    }

    /// Create a store from an already configured client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn bucket(&self, name: &str) -> Result<Arc<dyn Bucket>, IssueError> {
        debug!(bucket = name, "Resolving bucket");
        self.client
            .head_bucket()
            .bucket(name)
            .send()
            .await
            .map_err(|e| {
                error!(bucket = name, error = %e, "Bucket resolution failed");
                IssueError::S3 {
                    bucket: name.to_string(),
                }
            })?;
        Ok(Arc::new(S3Bucket {
            client: self.client.clone(),
            name: name.to_string(),
        }))
    }
}

/// Handle to one verified bucket
struct S3Bucket {
    client: Client,
    name: String,
}

#[async_trait]
impl Bucket for S3Bucket {
    fn name(&self) -> &str {
        &self.name
    }

    async fn upload_file(&self, source: &Path, dest: &str) -> Result<(), UploadError> {
        let body = ByteStream::from_path(source)
            .await
            .map_err(|e| UploadError(format!("Cannot read {}: {e}", source.display())))?;
        self.client
            .put_object()
            .bucket(&self.name)
            .key(dest)
            .body(body)
            .send()
            .await
            .map_err(|e| UploadError(e.to_string()))?;
        Ok(())
    }

    async fn upload_bytes(&self, data: Vec<u8>, dest: &str) -> Result<(), UploadError> {
        self.client
            .put_object()
            .bucket(&self.name)
            .key(dest)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| UploadError(e.to_string()))?;
        Ok(())
    }
}
