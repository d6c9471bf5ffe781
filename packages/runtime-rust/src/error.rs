//! Errors raised while fetching remote options.
//!
//! These never reach form-level error state: the resolver logs and swallows
//! them, leaving the option list at its last known value.

/// Failure of a remote option request.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {target} failed: {source}")]
    Transport {
        target: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{target} responded with status {status}")]
    Status { target: String, status: u16 },
    #[error("failed to decode response from {target}: {source}")]
    Decode {
        target: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("expected a list of records from {target}")]
    UnexpectedShape { target: String },
    #[error("invalid option endpoint {target}: {reason}")]
    InvalidTarget { target: String, reason: String },
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
