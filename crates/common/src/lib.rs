//! Common types and collaborator seams shared across the classroom crates.

#![warn(clippy::pedantic)]

/// Module for the media collaborator's error type
pub mod error;

/// Module for session and roster data types
pub mod types;

/// Module for secret types that prevent accidental logging of access tokens
pub mod secret;

/// Module for the media transport seam
pub mod transport;

/// Module for the client-side navigation seam
pub mod navigation;
