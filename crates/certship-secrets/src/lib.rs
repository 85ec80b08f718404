//! Secret access for DNS provider credentials
//!
//! Production uses AWS Secrets Manager; tests substitute the
//! [`SecretStore`] trait with fixtures.

pub mod aws;
pub mod resolver;
pub mod store;

pub use aws::AwsSecretStore;
pub use resolver::SecretResolver;
pub use store::SecretStore;
