//! Shared request validation and error taxonomy for certship crates

pub mod error;
pub mod request;

pub use error::{IssueError, IssueResult};
pub use request::{IssueRequest, RawIssueRequest, DEFAULT_PROPAGATION_SECONDS};
