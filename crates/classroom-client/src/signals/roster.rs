//! Roster heuristics: the visible peer set and tutor presence edges.
//!
//! Instructor-side crashes do not always produce a room-ended notification,
//! so the roster is read for indirect evidence. Every derived signal is an
//! edge relative to the previous roster, so repeated identical rosters never
//! re-trigger anything.

use common::types::Peer;
use tracing::debug;

/// Roster filtering rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterPolicy {
    /// Role tag of the instructor (case-insensitive).
    pub tutor_role: String,
    /// Lower-cased display-name fragments marking auxiliary peers.
    pub auxiliary_name_markers: Vec<String>,
}

impl RosterPolicy {
    /// Whether `peer` is auxiliary (recorder, relay) and must not be shown.
    #[must_use]
    pub fn is_auxiliary(&self, peer: &Peer) -> bool {
        if peer.is_auxiliary {
            return true;
        }
        let name = peer.display_name.to_ascii_lowercase();
        self.auxiliary_name_markers
            .iter()
            .any(|marker| name.contains(marker.as_str()))
    }
}

/// Peers eligible for rendering. Never contains auxiliary peers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisiblePeerSet {
    peers: Vec<Peer>,
}

impl VisiblePeerSet {
    /// Filter a raw roster, preserving the collaborator's order.
    #[must_use]
    pub fn from_roster(peers: &[Peer], policy: &RosterPolicy) -> Self {
        Self {
            peers: peers
                .iter()
                .filter(|peer| !policy.is_auxiliary(peer))
                .cloned()
                .collect(),
        }
    }

    #[must_use]
    pub fn peers(&self) -> &[Peer] {
        &self.peers
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Visible peers other than the local participant.
    pub fn remote(&self) -> impl Iterator<Item = &Peer> {
        self.peers.iter().filter(|peer| !peer.is_local)
    }

    #[must_use]
    pub fn remote_count(&self) -> usize {
        self.remote().count()
    }

    /// Whether any remote visible peer carries the tutor role.
    #[must_use]
    pub fn has_tutor(&self, tutor_role: &str) -> bool {
        self.remote().any(|peer| peer.has_role(tutor_role))
    }
}

/// Edges derived from one roster change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterUpdate {
    /// Remote visible peers went non-empty -> empty.
    pub all_peers_vanished: bool,
    /// Remote visible peers went empty -> non-empty.
    pub peers_returned: bool,
    /// `tutor_present` went true -> false.
    pub tutor_vanished: bool,
    /// `tutor_present` went false -> true.
    pub tutor_arrived: bool,
    /// Remote peers are present and the tutor has never been seen.
    pub awaiting_tutor: bool,
}

#[derive(Debug)]
pub struct RosterSignal {
    policy: RosterPolicy,
    visible: VisiblePeerSet,
    tutor_present: bool,
    tutor_seen: bool,
}

impl RosterSignal {
    #[must_use]
    pub fn new(policy: RosterPolicy) -> Self {
        Self {
            policy,
            visible: VisiblePeerSet::default(),
            tutor_present: false,
            tutor_seen: false,
        }
    }

    /// Recompute the visible set from a new roster snapshot and derive edges.
    pub fn observe(&mut self, peers: &[Peer]) -> RosterUpdate {
        let visible = VisiblePeerSet::from_roster(peers, &self.policy);
        let tutor_present = visible.has_tutor(&self.policy.tutor_role);

        let had_remote = self.visible.remote_count() > 0;
        let has_remote = visible.remote_count() > 0;

        let update = RosterUpdate {
            all_peers_vanished: had_remote && !has_remote,
            peers_returned: !had_remote && has_remote,
            // tutor_present was true, so tutor_seen is already set
            tutor_vanished: self.tutor_present && !tutor_present,
            tutor_arrived: !self.tutor_present && tutor_present,
            awaiting_tutor: has_remote && !(self.tutor_seen || tutor_present),
        };

        self.tutor_seen |= tutor_present;
        self.tutor_present = tutor_present;

        debug!(
            target: "classroom.signal.roster",
            raw_peers = peers.len(),
            visible_peers = visible.len(),
            remote_peers = visible.remote_count(),
            tutor_present = tutor_present,
            "Roster observed"
        );

        self.visible = visible;
        update
    }

    #[must_use]
    pub fn visible(&self) -> &VisiblePeerSet {
        &self.visible
    }

    #[must_use]
    pub fn tutor_present(&self) -> bool {
        self.tutor_present
    }

    /// Whether the tutor has been present at least once this session.
    #[must_use]
    pub fn tutor_seen(&self) -> bool {
        self.tutor_seen
    }

    #[must_use]
    pub fn has_remote_peers(&self) -> bool {
        self.visible.remote_count() > 0
    }

    /// Remote peers are present and the tutor has never arrived.
    #[must_use]
    pub fn awaiting_tutor(&self) -> bool {
        self.has_remote_peers() && !self.tutor_seen
    }
}
