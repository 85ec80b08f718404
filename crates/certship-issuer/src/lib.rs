//! Certificate issuance pipeline
//!
//! Drives certbot inside a disposable workspace and publishes the issued
//! bundle: provider registry, per-job filesystem layout, timed subprocess
//! runner, and the orchestrating service.

pub mod command;
pub mod providers;
pub mod service;
pub mod workspace;

pub use command::{
    CommandError, CommandOutcome, CommandRunner, OutputSink, TokioCommandRunner, TracingSink,
};
pub use providers::{lookup, sorted_provider_ids, DnsProvider, PROVIDERS};
pub use service::{IssueService, PublishResult};
pub use workspace::CertbotWorkspace;
