//! Pre-configured test data fixtures.
//!
//! Provides builders for:
//! - Roster peers with different roles (local, tutor, student, auxiliary)
//! - Persisted session blobs as the dashboard writes them

use common::types::{Peer, PeerId};
use serde_json::json;

/// Test peer fixture.
#[derive(Debug, Clone)]
pub struct TestPeer {
    peer: Peer,
}

impl TestPeer {
    fn new(id: impl Into<String>, role: &str, is_local: bool) -> Self {
        let id = id.into();
        Self {
            peer: Peer {
                display_name: format!("Peer {id}"),
                id: PeerId(id),
                role_tag: role.to_string(),
                is_local,
                has_audio_track: true,
                has_video_track: true,
                is_auxiliary: false,
            },
        }
    }

    /// The local participant (a student).
    #[must_use]
    pub fn local(id: impl Into<String>) -> Self {
        Self::new(id, "student", true)
    }

    /// A remote peer carrying the `tutor` role.
    #[must_use]
    pub fn tutor(id: impl Into<String>) -> Self {
        Self::new(id, "tutor", false)
    }

    /// A remote student.
    #[must_use]
    pub fn student(id: impl Into<String>) -> Self {
        Self::new(id, "student", false)
    }

    /// A media relay, flagged auxiliary by the collaborator.
    #[must_use]
    pub fn relay(id: impl Into<String>) -> Self {
        Self::new(id, "", false).auxiliary()
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.peer.display_name = name.into();
        self
    }

    /// Flag the peer as auxiliary.
    #[must_use]
    pub fn auxiliary(mut self) -> Self {
        self.peer.is_auxiliary = true;
        self
    }

    #[must_use]
    pub fn build(self) -> Peer {
        self.peer
    }
}

/// Roster with the local participant and the given remote peers.
#[must_use]
pub fn roster_with(remote: Vec<TestPeer>) -> Vec<Peer> {
    std::iter::once(TestPeer::local("me"))
        .chain(remote)
        .map(TestPeer::build)
        .collect()
}

/// Roster containing only the local participant.
#[must_use]
pub fn local_only_roster() -> Vec<Peer> {
    roster_with(Vec::new())
}

/// A session blob in the shape the dashboard persists.
#[must_use]
pub fn session_blob(session_id: &str, access_token: &str) -> String {
    json!({
        "sessionId": session_id,
        "accessToken": access_token,
        "hostName": "Ms. Rivera",
        "courseTitle": "Algebra II",
        "participantName": "Sam",
    })
    .to_string()
}

/// A room-ended notification payload with a custom message.
#[must_use]
pub fn room_ended_payload(message: &str) -> serde_json::Value {
    json!({"type": "ROOM_ENDED_BY_HOST", "message": message})
}
