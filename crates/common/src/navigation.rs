//! Client-side navigation seam.

/// Moves the host application to another route.
///
/// Implementations must not block; the coordinator calls this from a timer
/// task once the end-of-session message has been displayed.
pub trait Navigator: Send + Sync {
    /// Navigate to `route`.
    fn navigate(&self, route: &str);
}
