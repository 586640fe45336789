//! Message types for the leave coordinator.
//!
//! Every source that can end a session (connection re-evaluation,
//! notifications, roster callbacks, debounce timers) is funnelled into one
//! `mpsc` mailbox as a typed message. Request-reply uses `oneshot`.

use super::timers::TimerKind;
use crate::signals::ConnectionState;
use common::types::Peer;
use serde_json::Value;
use tokio::sync::oneshot;

/// Messages sent to `LeaveCoordinator`.
#[derive(Debug)]
pub enum CoordinatorMessage {
    /// A join request is about to reach the collaborator.
    JoinStarted,

    /// The outstanding join was rejected; no membership exists.
    JoinFailed,

    /// The first join succeeded; start acting on signals.
    Arm,

    /// The collaborator's `connected` boolean was re-evaluated.
    ConnectionChanged { connected: bool },

    /// An opaque notification arrived from the signaling layer.
    NotificationReceived { payload: Value },

    /// The peer roster changed.
    RosterChanged { peers: Vec<Peer> },

    /// A debounce timer expired.
    TimerFired {
        kind: TimerKind,
        /// Generation the timer was armed with; stale generations are ignored.
        generation: u64,
    },

    /// The dashboard redirect has been performed.
    RedirectCompleted { route: String },

    /// Get a snapshot of the coordinator state.
    GetState {
        respond_to: oneshot::Sender<CoordinatorSnapshot>,
    },

    /// The session view is being torn down.
    Teardown {
        respond_to: oneshot::Sender<TeardownReport>,
    },
}

/// Coordinator lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorPhase {
    /// Before the first successful join; all signals ignored.
    NotArmed,
    /// Signals are live.
    Armed,
    /// The leaving flag has been set; `leave()` is being issued.
    LeaveRequested,
    /// `leave()` issued (or abandoned); redirect scheduled.
    Left,
}

impl CoordinatorPhase {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            CoordinatorPhase::NotArmed => "not_armed",
            CoordinatorPhase::Armed => "armed",
            CoordinatorPhase::LeaveRequested => "leave_requested",
            CoordinatorPhase::Left => "left",
        }
    }
}

/// Which rule won the race to end the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeaveTrigger {
    /// Explicit room-ended notification.
    RoomEnded,
    /// Connected -> Disconnected edge while armed.
    ConnectionLost,
    /// "no-peers" timer expired.
    NoPeers,
    /// "host-left" timer expired.
    HostLeft,
    /// "host-absent" timer expired.
    HostAbsent,
    /// The view was torn down before any end condition fired.
    Teardown,
}

impl LeaveTrigger {
    /// Returns the trigger as a string for metric labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            LeaveTrigger::RoomEnded => "room_ended",
            LeaveTrigger::ConnectionLost => "connection_lost",
            LeaveTrigger::NoPeers => "no_peers",
            LeaveTrigger::HostLeft => "host_left",
            LeaveTrigger::HostAbsent => "host_absent",
            LeaveTrigger::Teardown => "teardown",
        }
    }
}

/// The decision that ended the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveOutcome {
    pub trigger: LeaveTrigger,
    /// Message displayed to the participant until the redirect.
    pub message: String,
}

/// Published on every phase change through a `watch` channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorStatus {
    pub phase: CoordinatorPhase,
    pub connection: ConnectionState,
    pub outcome: Option<LeaveOutcome>,
    /// Set once the navigator has been called.
    pub redirected_to: Option<String>,
}

impl Default for CoordinatorStatus {
    fn default() -> Self {
        Self {
            phase: CoordinatorPhase::NotArmed,
            connection: ConnectionState::Joining,
            outcome: None,
            redirected_to: None,
        }
    }
}

/// Point-in-time view of the coordinator (for UI and tests).
#[derive(Debug, Clone)]
pub struct CoordinatorSnapshot {
    pub phase: CoordinatorPhase,
    /// The single-writer leaving flag.
    pub leaving: bool,
    pub connection: ConnectionState,
    pub pending_timers: Vec<TimerKind>,
    pub visible_peers: Vec<Peer>,
    pub tutor_present: bool,
    pub outcome: Option<LeaveOutcome>,
}

/// Result of tearing the coordinator down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeardownReport {
    /// Whether teardown itself issued `leave()`.
    pub leave_issued: bool,
    /// Debounce timers cancelled by teardown.
    pub timers_cancelled: usize,
    /// Timers still pending after teardown (always zero).
    pub pending_timers: usize,
}
