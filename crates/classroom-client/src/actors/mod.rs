//! Actor model for the classroom client.
//!
//! One `LeaveCoordinator` per session view. It owns the signal adapters,
//! the debounce timers and the leaving flag; everything else talks to it
//! through a cloneable `LeaveCoordinatorHandle`.
//!
//! ```text
//! MediaTransport events ──► LeaveCoordinatorHandle ──► LeaveCoordinator
//!                                                        ├── ConnectionSignal
//!                                                        ├── RosterSignal
//!                                                        └── PendingTimers
//! ```
//!
//! Cancellation uses `tokio_util::sync::CancellationToken`; cancelling the
//! token runs the same teardown as an explicit `teardown()`.

pub mod coordinator;
pub mod messages;
pub mod timers;

pub use coordinator::{LeaveCoordinator, LeaveCoordinatorHandle};
pub use messages::{
    CoordinatorMessage, CoordinatorPhase, CoordinatorSnapshot, CoordinatorStatus, LeaveOutcome,
    LeaveTrigger, TeardownReport,
};
pub use timers::{PendingTimers, TimerKind};
