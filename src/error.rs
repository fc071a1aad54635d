//! Error taxonomy for the BenchBot client.
//!
//! Transport failures are classified into [`BenchBotError::ConnectionFailure`]
//! (the supervisor could not be reached at all) and
//! [`BenchBotError::UnexpectedResponse`] (the supervisor answered with a
//! non-success status). Malformed actions are rejected locally and never sent
//! over the wire.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Convenience alias used throughout the library.
pub type Result<T, E = BenchBotError> = std::result::Result<T, E>;

/// Every failure the client can surface to its caller.
#[derive(Debug, Error)]
pub enum BenchBotError {
    /// The policy collaborator could not be built with the requested
    /// capabilities.
    #[error("cannot construct agent '{name}'; known agents are: {}", .known.join(", "))]
    Construction { name: String, known: Vec<String> },

    /// The supervisor could not be reached.
    #[error("failed to establish a connection to the BenchBot supervisor at '{address}': {reason}")]
    ConnectionFailure { address: String, reason: String },

    /// The supervisor was reached but answered with a failure status.
    #[error(
        "received an unexpected response from the BenchBot supervisor at '{address}' \
         (HTTP status code: {status})"
    )]
    UnexpectedResponse { address: String, status: u16 },

    /// The supervisor answered successfully but the body was not usable.
    #[error("malformed response from '{address}': {reason}")]
    MalformedResponse { address: String, reason: String },

    /// The action name is not part of the action schema.
    #[error("'{action}' is not a valid action; valid actions are: {}", .valid.join(", "))]
    InvalidAction { action: String, valid: Vec<String> },

    /// The action received the wrong number of arguments.
    #[error("'{action}' requires {expected} argument(s); {supplied} supplied")]
    ArgumentCountMismatch {
        action: String,
        expected: usize,
        supplied: usize,
    },

    /// The action received arguments it does not accept.
    #[error(
        "valid arguments to '{action}' are: [{}]; the following arguments are invalid: [{}]",
        .valid.join(", "),
        .invalid.join(", ")
    )]
    InvalidArgumentName {
        action: String,
        valid: Vec<String>,
        invalid: Vec<String>,
    },

    /// The robot configuration names a callback that is not registered.
    #[error("observation '{observation}' declares unknown callback '{callback}'")]
    UnknownCallback {
        observation: String,
        callback: String,
    },

    /// The simulator did not report readiness within the configured bound.
    #[error("simulator was not running after waiting {waited:?}")]
    ReadinessTimeout { waited: Duration },

    /// The result artifact directory could not be prepared.
    #[error("cannot prepare result location '{path}': {source}")]
    ResultLocation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    /// The policy collaborator failed while picking an action or saving.
    #[error("agent failed: {0:#}")]
    Agent(#[source] anyhow::Error),
}

impl BenchBotError {
    /// Builds a connection failure for `address`.
    pub fn connection(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConnectionFailure {
            address: address.into(),
            reason: reason.into(),
        }
    }

    /// Builds a malformed-response error for `address`.
    pub fn malformed(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            address: address.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error was raised by local action validation.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidAction { .. }
                | Self::ArgumentCountMismatch { .. }
                | Self::InvalidArgumentName { .. }
        )
    }
}
