//! Object storage publishing for issued certificate bundles
//!
//! The publisher walks a local directory in deterministic order and mirrors
//! it under a key prefix. Production talks to S3; tests substitute the
//! [`Bucket`] and [`ObjectStore`] traits.

pub mod publisher;
pub mod s3;
pub mod store;

pub use publisher::{normalize_key, publish_directory, publish_marker};
pub use s3::S3ObjectStore;
pub use store::{Bucket, ObjectStore, UploadError};
