//! Edge detection over the collaborator's `connected` boolean.
//!
//! The boolean is re-evaluated often and flips transiently, so only
//! transitions matter. Before the first successful join the signal is
//! unarmed: readings still update the shadow value but never produce edges,
//! which keeps a pre-join `false` from looking like a dropped session.

/// Shadow of the room connection as seen by this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Join in flight, or joined but the transport has not reported connected yet.
    Joining,
    Connected,
    Disconnected,
    /// The leave sequence has run.
    Left,
}

impl ConnectionState {
    /// Returns the state as a string for log fields.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Joining => "joining",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Left => "left",
        }
    }
}

/// Transition reported by [`ConnectionSignal::observe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEdge {
    /// Connected -> Disconnected.
    Disconnected,
    /// Joining/Disconnected -> Connected.
    Reconnected,
}

#[derive(Debug)]
pub struct ConnectionSignal {
    armed: bool,
    connected: bool,
    state: ConnectionState,
}

impl Default for ConnectionSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionSignal {
    #[must_use]
    pub fn new() -> Self {
        Self {
            armed: false,
            connected: false,
            state: ConnectionState::Joining,
        }
    }

    /// Start emitting edges. Called once the first join has succeeded.
    ///
    /// The current reading becomes the baseline; a `false` here stays
    /// `Joining` rather than counting as a disconnect.
    pub fn arm(&mut self) {
        if self.armed {
            return;
        }
        self.armed = true;
        if self.connected {
            self.state = ConnectionState::Connected;
        }
    }

    /// Record a new reading and return the edge it produces, if any.
    pub fn observe(&mut self, connected: bool) -> Option<ConnectionEdge> {
        let previous = self.connected;
        self.connected = connected;

        if !self.armed || self.state == ConnectionState::Left {
            return None;
        }

        match (previous, connected) {
            (true, false) => {
                self.state = ConnectionState::Disconnected;
                Some(ConnectionEdge::Disconnected)
            }
            (false, true) => {
                self.state = ConnectionState::Connected;
                Some(ConnectionEdge::Reconnected)
            }
            _ => None,
        }
    }

    /// Stop emitting edges; the client is leaving on its own.
    pub fn mark_left(&mut self) {
        self.state = ConnectionState::Left;
    }

    /// Latest connection reading.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }
}
