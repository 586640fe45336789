//! Signal adapters feeding the leave coordinator.
//!
//! Each adapter turns one unreliable collaborator channel into typed edges:
//!
//! - [`connection`] - Connected -> Disconnected edges, armed after join
//! - [`notification`] - room-ended classification of opaque payloads
//! - [`roster`] - visible peer set and tutor presence edges
//!
//! Adapters are plain synchronous state; the coordinator owns them and
//! decides what each edge means.

pub mod connection;
pub mod notification;
pub mod roster;

pub use connection::{ConnectionEdge, ConnectionSignal, ConnectionState};
pub use notification::{classify, Notification, DEFAULT_END_MESSAGE};
pub use roster::{RosterPolicy, RosterSignal, RosterUpdate, VisiblePeerSet};
