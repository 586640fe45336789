//! Errors reported by the media collaborator.

use thiserror::Error;

/// Errors the media transport can return from `join` or `leave`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The access token was rejected (invalid, expired or already used)
    #[error("Invalid access token: {0}")]
    InvalidToken(String),

    /// The network failed while talking to the room
    #[error("Network error: {0}")]
    Network(String),

    /// The room refused the request for another reason
    #[error("Rejected: {0}")]
    Rejected(String),

    /// The transport has already been closed
    #[error("Transport closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_formatting() {
        assert_eq!(
            TransportError::InvalidToken("expired".to_string()).to_string(),
            "Invalid access token: expired"
        );
        assert_eq!(TransportError::Closed.to_string(), "Transport closed");
    }
}
