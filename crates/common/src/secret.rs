//! Secret types for keeping session access tokens out of logs.
//!
//! Re-exports [`secrecy`] so every crate wraps tokens the same way. A
//! `SecretString` prints as `[REDACTED]` under `{:?}`, which means any struct
//! that derives `Debug` and holds an access token is safe to log, and the
//! buffer is zeroized on drop.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct StoredToken {
//!     session_id: String,
//!     access_token: SecretString,
//! }
//!
//! let stored = StoredToken {
//!     session_id: "sess-1".to_string(),
//!     access_token: SecretString::from("single-use-token"),
//! };
//!
//! assert!(!format!("{stored:?}").contains("single-use-token"));
//! assert_eq!(stored.access_token.expose_secret(), "single-use-token");
//! ```

pub use secrecy::{ExposeSecret, SecretString};

/// Returns true if the secret is empty or only whitespace.
#[must_use]
pub fn is_blank(secret: &SecretString) -> bool {
    secret.expose_secret().trim().is_empty()
}
