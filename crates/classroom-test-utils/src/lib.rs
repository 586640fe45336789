//! # Classroom Test Utilities
//!
//! Mocks and fixtures for testing the classroom client without a media
//! stack.
//!
//! ## Modules
//!
//! - `mock_transport` - Scriptable `MediaTransport` that counts calls
//! - `mock_navigator` - `Navigator` that records routes
//! - `fixtures` - Roster peers and persisted session blobs
//!
//! ## Usage
//!
//! ```rust,ignore
//! use classroom_test_utils::*;
//!
//! let transport = MockTransport::builder()
//!     .fail_join_with(TransportError::Network("reset".into()))
//!     .build();
//! let navigator = RecordingNavigator::new();
//!
//! let roster = vec![TestPeer::local("me").build(), TestPeer::tutor("t1").build()];
//! ```

pub mod fixtures;
pub mod mock_navigator;
pub mod mock_transport;

pub use fixtures::*;
pub use mock_navigator::RecordingNavigator;
pub use mock_transport::{MockTransport, MockTransportBuilder};
