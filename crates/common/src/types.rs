//! Session and roster data types.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of a classroom session (the room a participant joins).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Create an ad-hoc session ID for sessions bootstrapped from a bare token.
    #[must_use]
    pub fn adhoc() -> Self {
        Self(format!("adhoc-{}", Uuid::new_v4()))
    }

    /// Borrow the underlying identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identifier of a peer, assigned by the media collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(pub String);

impl PeerId {
    /// Borrow the underlying identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A participant's connection handle within the room.
///
/// Owned by the media collaborator; the client only ever reads snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Peer {
    /// Peer ID.
    pub id: PeerId,
    /// Display name as shown on the video tile.
    pub display_name: String,
    /// Role tag assigned by the platform ("tutor", "student", ...).
    #[serde(default)]
    pub role_tag: String,
    /// Whether this peer is the local participant.
    #[serde(default)]
    pub is_local: bool,
    /// Whether the peer currently publishes an audio track.
    #[serde(default)]
    pub has_audio_track: bool,
    /// Whether the peer currently publishes a video track.
    #[serde(default)]
    pub has_video_track: bool,
    /// Whether the collaborator flagged this peer as auxiliary (recorder, relay).
    #[serde(default)]
    pub is_auxiliary: bool,
}

impl Peer {
    /// Whether this peer carries the given role (case-insensitive).
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.role_tag.eq_ignore_ascii_case(role)
    }
}

/// Media settings passed to the collaborator on join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinSettings {
    /// Join with the microphone muted.
    pub audio_muted: bool,
    /// Join with the camera off.
    pub video_muted: bool,
}

impl Default for JoinSettings {
    fn default() -> Self {
        Self {
            audio_muted: true,
            video_muted: true,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_deserializes_with_defaults() {
        let json = r#"{"id": "p-1", "displayName": "Ada"}"#;
        let peer: Peer = serde_json::from_str(json).expect("deserialize");

        assert_eq!(peer.id.as_str(), "p-1");
        assert_eq!(peer.display_name, "Ada");
        assert!(peer.role_tag.is_empty());
        assert!(!peer.is_local);
        assert!(!peer.is_auxiliary);
    }

    #[test]
    fn test_has_role_is_case_insensitive() {
        let peer = Peer {
            id: PeerId::from("p-2"),
            display_name: "Mentor".to_string(),
            role_tag: "Tutor".to_string(),
            is_local: false,
            has_audio_track: true,
            has_video_track: true,
            is_auxiliary: false,
        };

        assert!(peer.has_role("tutor"));
        assert!(peer.has_role("TUTOR"));
        assert!(!peer.has_role("student"));
    }

    #[test]
    fn test_adhoc_session_ids_are_unique() {
        let a = SessionId::adhoc();
        let b = SessionId::adhoc();

        assert!(a.as_str().starts_with("adhoc-"));
        assert_ne!(a, b);
    }
}
