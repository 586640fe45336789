//! Classroom client error types.
//!
//! Bootstrap and join failures are terminal and user-visible; each exposes a
//! `client_message()` that is safe to render. Leave failures are only ever
//! logged.

use common::error::TransportError;
use thiserror::Error;

use crate::config::ConfigError;

/// Classroom client error type.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Session context could not be loaded from persisted storage.
    #[error("Bootstrap error: {0}")]
    Bootstrap(#[from] BootstrapError),

    /// Joining the room failed.
    #[error("Join error: {0}")]
    Join(#[from] JoinError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Actor channel or task failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Missing or corrupt session context.
///
/// Terminal; no leave is needed because no join occurred.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BootstrapError {
    /// Neither a session blob nor a fallback token is stored.
    #[error("No stored session")]
    MissingSessionContext,

    /// The session blob could not be parsed and no fallback token exists.
    #[error("Stored session is corrupt: {0}")]
    CorruptSessionContext(String),

    /// A session blob exists but carries no usable token, and no fallback token exists.
    #[error("No access token")]
    MissingAccessToken,

    /// Persisted storage could not be read.
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Join failures.
///
/// A rejected or failed join resets the join gate once, allowing one re-attempt.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JoinError {
    /// The collaborator rejected the access token.
    #[error("Access token rejected: {0}")]
    Rejected(String),

    /// The network failed during join.
    #[error("Network failure during join: {0}")]
    Network(String),

    /// A join already succeeded for this session.
    #[error("Already joined")]
    AlreadyJoined,

    /// The join gate is closed and no retries remain.
    #[error("Join retries exhausted after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },
}

/// The collaborator's `leave()` rejected. Logged, never surfaced.
#[derive(Debug, Error)]
#[error("Leave failed: {0}")]
pub struct LeaveError(#[from] pub TransportError);

impl From<TransportError> for JoinError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::InvalidToken(msg) | TransportError::Rejected(msg) => {
                JoinError::Rejected(msg)
            }
            TransportError::Network(msg) => JoinError::Network(msg),
            TransportError::Closed => JoinError::Network("transport closed".to_string()),
        }
    }
}

impl ClientError {
    /// Returns a user-facing message (no internal details).
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            ClientError::Bootstrap(e) => e.client_message(),
            ClientError::Join(e) => e.client_message(),
            ClientError::Config(_) | ClientError::Internal(_) => {
                "Something went wrong. Please return to the dashboard and try again.".to_string()
            }
        }
    }
}

impl BootstrapError {
    /// Returns a user-facing message (no internal details).
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            BootstrapError::MissingSessionContext
            | BootstrapError::CorruptSessionContext(_)
            | BootstrapError::MissingAccessToken => {
                "Session details not found. Please join the class again from your dashboard."
                    .to_string()
            }
            BootstrapError::Storage(_) => {
                "Could not read session details. Please try again.".to_string()
            }
        }
    }
}

impl JoinError {
    /// Returns a user-facing message (no internal details).
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            JoinError::Rejected(_) => {
                "Your session link has expired or is invalid. Please rejoin from the dashboard."
                    .to_string()
            }
            JoinError::Network(_) => {
                "Could not connect to the class. Check your connection and try again.".to_string()
            }
            JoinError::AlreadyJoined => "You are already in this class.".to_string(),
            JoinError::RetriesExhausted { .. } => {
                "Could not join the class. Please rejoin from the dashboard.".to_string()
            }
        }
    }

    /// Whether the join gate may be reset for another attempt.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, JoinError::Rejected(_) | JoinError::Network(_))
    }
}
