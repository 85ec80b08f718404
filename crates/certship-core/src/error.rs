//! Error taxonomy shared by every stage of the issuance pipeline

use std::collections::BTreeMap;

use thiserror::Error;

/// Everything that can go wrong between accepting a request and returning
/// the published certificate locators. Lower layers construct the variant
/// that matches the fault; the HTTP boundary maps kind to status and JSON.
#[derive(Error, Debug)]
pub enum IssueError {
    /// The request failed validation. Keys are field names (or `_request`
    /// for an unparseable body), values are the messages for that field.
    #[error("Request is invalid")]
    Validation {
        errors: BTreeMap<String, Vec<String>>,
    },

    /// The DNS provider credentials could not be fetched from the secret
    /// store. Sub-causes are logged where they occur, not carried here.
    #[error("{0}")]
    SecretFetch(String),

    /// The target bucket could not be resolved (missing or unauthorized),
    /// before any object was attempted.
    #[error("Cannot get bucket {bucket}!")]
    S3 { bucket: String },

    /// A specific object failed to upload.
    #[error("Upload of {source_path} to s3://{bucket}/{bucket_path} failed!")]
    S3Upload {
        source_path: String,
        bucket: String,
        bucket_path: String,
    },

    /// The certbot process failed to spawn or exited non-zero.
    #[error("Certbot command failed! Check logs!")]
    Certbot {
        command: Vec<String>,
        timeout_secs: u64,
        output: String,
    },

    /// The certbot process was still running when the deadline expired.
    #[error("Certbot command haven't finished in {timeout_secs} seconds!")]
    CertbotTimeout {
        command: Vec<String>,
        timeout_secs: u64,
        output: String,
    },

    /// A provider id that passed validation is absent from the registry.
    /// Unreachable through the HTTP surface; the registry still guards it.
    #[error("Unknown DNS provider: {0}")]
    UnknownProvider(String),

    /// Catch-all for faults outside the taxonomy. Message only.
    #[error("{0}")]
    Internal(String),
}

impl IssueError {
    /// The `type` discriminator used in error responses. `UnknownProvider`
    /// and `Internal` both collapse to the generic shape on the wire.
    pub fn error_type(&self) -> &'static str {
        match self {
            IssueError::Validation { .. } => "ValidationError",
            IssueError::SecretFetch(_) => "SecretFetchError",
            IssueError::S3 { .. } => "S3Error",
            IssueError::S3Upload { .. } => "S3UploadError",
            IssueError::Certbot { .. } => "CertbotError",
            IssueError::CertbotTimeout { .. } => "CertbotTimeoutError",
            IssueError::UnknownProvider(_) | IssueError::Internal(_) => "InternalError",
        }
    }
}

/// Result type alias for issuance operations
pub type IssueResult<T> = Result<T, IssueError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_type_matches_wire_contract() {
        let cases: Vec<(IssueError, &str)> = vec![
            (
                IssueError::Validation {
                    errors: BTreeMap::new(),
                },
                "ValidationError",
            ),
            (
                IssueError::SecretFetch("no access".into()),
                "SecretFetchError",
            ),
            (
                IssueError::S3 {
                    bucket: "certs".into(),
                },
                "S3Error",
            ),
            (
                IssueError::S3Upload {
                    source_path: "/tmp/cert.pem".into(),
                    bucket: "certs".into(),
                    bucket_path: "path/live/cert.pem".into(),
                },
                "S3UploadError",
            ),
            (
                IssueError::Certbot {
                    command: vec!["certbot".into()],
                    timeout_secs: 10,
                    output: String::new(),
                },
                "CertbotError",
            ),
            (
                IssueError::CertbotTimeout {
                    command: vec!["certbot".into()],
                    timeout_secs: 10,
                    output: String::new(),
                },
                "CertbotTimeoutError",
            ),
            (
                IssueError::UnknownProvider("acme-dns".into()),
                "InternalError",
            ),
            (IssueError::Internal("boom".into()), "InternalError"),
        ];
        for (err, expected) in cases {
            assert_eq!(err.error_type(), expected);
        }
    }

    #[test]
    fn timeout_message_names_the_deadline() {
        let err = IssueError::CertbotTimeout {
            command: vec![],
            timeout_secs: 1200,
            output: String::new(),
        };
        assert_eq!(
            err.to_string(),
            "Certbot command haven't finished in 1200 seconds!"
        );
    }
}
