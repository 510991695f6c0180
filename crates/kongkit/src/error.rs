//! Error types for admin API operations.
//!
//! Every failing call carries the action, the entity kind and the entity it
//! targeted, so the caller can print a complete message without extra
//! bookkeeping. Errors are also grouped into categories for user feedback.

use crate::types::{Action, EntityKind};
use std::fmt;

/// Result type alias for admin API operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of gateway errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The request never completed (connect, send, timeout).
    Transport,
    /// A response arrived with a status other than the expected one.
    Status,
    /// A body could not be encoded or decoded.
    Format,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Transport => "Admin API unreachable",
            Self::Status => "Unexpected response from the admin API",
            Self::Format => "Malformed request or response body",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Transport => "Check the configured host and that the admin API is listening",
            Self::Status => "Inspect the gateway logs; re-run apply once the cause is fixed",
            Self::Format => "Check the gateway version matches the expected admin API",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while talking to the admin API.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Request could not be sent, or the connection failed or timed out.
    #[error("failed to {action} {kind} {entity}: {message}")]
    Transport {
        /// What was being done.
        action: Action,
        /// Entity kind targeted.
        kind: EntityKind,
        /// Entity identity (name, username, id) or collection path.
        entity: String,
        /// Underlying transport message.
        message: String,
    },

    /// Response status differs from the single code expected for the call.
    #[error("[HTTP {status}] failed to {action} {kind} {entity}: bad response from the API (expected {expected})")]
    UnexpectedStatus {
        /// What was being done.
        action: Action,
        /// Entity kind targeted.
        kind: EntityKind,
        /// Entity identity (name, username, id) or collection path.
        entity: String,
        /// Status returned by the gateway.
        status: u16,
        /// Status the action requires.
        expected: u16,
    },

    /// Successful response whose body could not be decoded.
    #[error("invalid response to {action} {kind} {entity}: {message}")]
    InvalidResponse {
        /// What was being done.
        action: Action,
        /// Entity kind targeted.
        kind: EntityKind,
        /// Entity identity (name, username, id) or collection path.
        entity: String,
        /// Decoder message.
        message: String,
    },

    /// Request body could not be serialized.
    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),
}

impl Error {
    /// Create a transport error.
    pub fn transport(
        action: Action,
        kind: EntityKind,
        entity: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Transport {
            action,
            kind,
            entity: entity.into(),
            message: message.into(),
        }
    }

    /// Create an unexpected-status error for `action`.
    pub fn unexpected_status(
        action: Action,
        kind: EntityKind,
        entity: impl Into<String>,
        status: u16,
    ) -> Self {
        Self::UnexpectedStatus {
            action,
            kind,
            entity: entity.into(),
            status,
            expected: action.expected_status(),
        }
    }

    /// Create an invalid-response error.
    pub fn invalid_response(
        action: Action,
        kind: EntityKind,
        entity: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidResponse {
            action,
            kind,
            entity: entity.into(),
            message: message.into(),
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Transport { .. } => ErrorCategory::Transport,
            Error::UnexpectedStatus { .. } => ErrorCategory::Status,
            Error::InvalidResponse { .. } | Error::Encode(_) => ErrorCategory::Format,
        }
    }

    /// HTTP status of the failing response, when one was received.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Identity of the entity the failing call targeted.
    #[must_use]
    pub fn entity(&self) -> Option<&str> {
        match self {
            Error::Transport { entity, .. }
            | Error::UnexpectedStatus { entity, .. }
            | Error::InvalidResponse { entity, .. } => Some(entity),
            Error::Encode(_) => None,
        }
    }

    /// Entity kind the failing call targeted.
    #[must_use]
    pub fn kind(&self) -> Option<EntityKind> {
        match self {
            Error::Transport { kind, .. }
            | Error::UnexpectedStatus { kind, .. }
            | Error::InvalidResponse { kind, .. } => Some(*kind),
            Error::Encode(_) => None,
        }
    }
}

/// Enforce the single-code success rule for `action`.
///
/// Returns `Err(Error::UnexpectedStatus)` for every status other than
/// [`Action::expected_status`].
pub fn check_status(action: Action, kind: EntityKind, entity: &str, status: u16) -> Result<()> {
    if action.accepts(status) {
        Ok(())
    } else {
        Err(Error::unexpected_status(action, kind, entity, status))
    }
}
