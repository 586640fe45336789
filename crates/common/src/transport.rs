//! The media transport seam.
//!
//! The real-time media stack (connection setup, encode/decode, signaling wire
//! protocol) lives outside this workspace. The client sees it through two
//! request/response calls on [`MediaTransport`] and one stream of
//! [`MediaEvent`]s carrying the collaborator's reactive state.

use crate::error::TransportError;
use crate::secret::SecretString;
use crate::types::{JoinSettings, Peer};
use serde::{Deserialize, Serialize};

/// Request/response surface of the media collaborator.
#[async_trait::async_trait]
pub trait MediaTransport: Send + Sync {
    /// Join the room with a single-use access token.
    ///
    /// # Errors
    ///
    /// Fails with [`TransportError::InvalidToken`] when the token is invalid or
    /// expired, or [`TransportError::Network`] when the room is unreachable.
    async fn join(
        &self,
        access_token: &SecretString,
        settings: JoinSettings,
    ) -> Result<(), TransportError>;

    /// Leave the room.
    ///
    /// # Errors
    ///
    /// Any error is informational; callers treat leave as best-effort.
    async fn leave(&self) -> Result<(), TransportError>;
}

/// Reactive state pushed by the media collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MediaEvent {
    /// The collaborator's `connected` boolean was re-evaluated.
    Connection { connected: bool },
    /// The ordered peer collection changed.
    Roster { peers: Vec<Peer> },
    /// An opaque notification arrived from the signaling layer.
    Notification { payload: serde_json::Value },
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_media_event_tagged_representation() {
        let event: MediaEvent =
            serde_json::from_str(r#"{"kind": "connection", "connected": false}"#)
                .expect("deserialize");
        assert_eq!(event, MediaEvent::Connection { connected: false });

        let event: MediaEvent = serde_json::from_str(
            r#"{"kind": "notification", "payload": {"type": "ROOM_ENDED"}}"#,
        )
        .expect("deserialize");
        assert!(matches!(event, MediaEvent::Notification { .. }));
    }

    #[test]
    fn test_roster_event_carries_peers() {
        let event: MediaEvent = serde_json::from_str(
            r#"{"kind": "roster", "peers": [{"id": "p1", "displayName": "Sam", "isLocal": true}]}"#,
        )
        .expect("deserialize");

        match event {
            MediaEvent::Roster { peers } => {
                assert_eq!(peers.len(), 1);
                assert!(peers.first().map(|p| p.is_local).unwrap_or(false));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
