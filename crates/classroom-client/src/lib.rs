//! Classroom Client Library
//!
//! Participant-side session controller for a live classroom. The media
//! stack reports session health through three unreliable channels (a
//! `connected` boolean, opaque signaling notifications, and the peer
//! roster). This crate fuses them into one authoritative decision to leave,
//! issues exactly one `leave()`, and redirects the participant to the
//! dashboard.
//!
//! # Architecture
//!
//! ```text
//! ClassroomSession (per session view)
//! ├── SessionBootstrap   load stored context, gated join with one retry
//! └── LeaveCoordinator   actor; sole writer of the leaving flag
//!     ├── ConnectionSignal   Connected -> Disconnected edges
//!     ├── notification       room-ended classification
//!     ├── RosterSignal       visible peers, tutor presence
//!     └── PendingTimers      no-peers / host-left / host-absent
//! ```
//!
//! # Modules
//!
//! - [`actors`] - Leave coordinator actor, messages and debounce timers
//! - [`signals`] - Signal adapters (connection, notification, roster)
//! - [`bootstrap`] - Session context loading and the join gate
//! - [`session`] - End-to-end session driver
//! - [`storage`] - Persisted session blob and fallback token
//! - [`config`] - Policy and settings from environment
//! - [`errors`] - Error types with user-facing messages
//! - [`observability`] - Metrics
//! - [`replay`] - Trace replay for field reports

#![warn(clippy::pedantic)]

pub mod actors;
pub mod bootstrap;
pub mod config;
pub mod errors;
pub mod observability;
pub mod replay;
pub mod session;
pub mod signals;
pub mod storage;
