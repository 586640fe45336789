//! Session bootstrap: load the persisted session context and join the room.
//!
//! Joining is guarded by a one-shot gate so overlapping triggers (a re-render
//! racing the first attempt, a retry button pressed twice) never produce two
//! concurrent joins. A failed attempt re-opens the gate while attempts
//! remain; a successful one closes it for good and arms the coordinator.

use crate::actors::LeaveCoordinatorHandle;
use crate::errors::{BootstrapError, ClientError, JoinError};
use crate::observability::metrics;
use crate::storage::{PersistedStorage, SessionContext};

use common::transport::MediaTransport;
use common::types::JoinSettings;
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub struct SessionBootstrap {
    transport: Arc<dyn MediaTransport>,
    settings: JoinSettings,
    max_attempts: u32,
    attempts: u32,
    /// The join gate. Closed while an attempt is outstanding or after success.
    gate_closed: bool,
    joined: bool,
}

impl SessionBootstrap {
    #[must_use]
    pub fn new(transport: Arc<dyn MediaTransport>, settings: JoinSettings, max_attempts: u32) -> Self {
        Self {
            transport,
            settings,
            max_attempts,
            attempts: 0,
            gate_closed: false,
            joined: false,
        }
    }

    /// Read the session context from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `BootstrapError` if neither a usable session blob nor a
    /// fallback token is stored. No join is attempted in that case.
    pub fn load_context(storage: &PersistedStorage) -> Result<SessionContext, BootstrapError> {
        match storage.load_session_context() {
            Ok(context) => {
                info!(
                    target: "classroom.bootstrap",
                    session_id = %context.session_id,
                    course_title = %context.course_title,
                    host = %context.host_display_name,
                    "Session context loaded"
                );
                Ok(context)
            }
            Err(e) => {
                warn!(
                    target: "classroom.bootstrap",
                    error = %e,
                    "Session context unavailable"
                );
                Err(e)
            }
        }
    }

    /// Join the room with the stored access token.
    ///
    /// On success the coordinator is armed. On a retryable failure the gate
    /// re-opens if attempts remain, so the caller may call `join` again.
    ///
    /// # Errors
    ///
    /// - `JoinError::AlreadyJoined` if a join already succeeded
    /// - `JoinError::RetriesExhausted` if the gate is closed after a failure
    /// - `JoinError::Rejected` / `JoinError::Network` from the collaborator
    /// - `ClientError::Internal` if the coordinator is gone. If that is only
    ///   discovered after the collaborator accepted the join, the room is
    ///   left again before returning.
    #[instrument(skip_all, name = "classroom.bootstrap.join", fields(session_id = %context.session_id))]
    pub async fn join(
        &mut self,
        context: &SessionContext,
        coordinator: &LeaveCoordinatorHandle,
    ) -> Result<(), ClientError> {
        if self.joined {
            return Err(JoinError::AlreadyJoined.into());
        }
        if self.gate_closed {
            return Err(JoinError::RetriesExhausted {
                attempts: self.attempts,
            }
            .into());
        }

        // Teardown must know a membership may exist even if this future is dropped
        coordinator.join_started().await?;

        self.gate_closed = true;
        self.attempts += 1;

        info!(
            target: "classroom.bootstrap",
            attempt = self.attempts,
            max_attempts = self.max_attempts,
            audio_muted = self.settings.audio_muted,
            video_muted = self.settings.video_muted,
            "Joining room"
        );

        match self
            .transport
            .join(&context.access_token, self.settings)
            .await
        {
            Ok(()) => {
                metrics::record_join_attempt("success");
                info!(
                    target: "classroom.bootstrap",
                    attempt = self.attempts,
                    "Joined room"
                );
                if let Err(e) = coordinator.arm().await {
                    warn!(
                        target: "classroom.bootstrap",
                        error = %e,
                        "Coordinator gone after join, leaving room"
                    );
                    if let Err(leave_err) = self.transport.leave().await {
                        warn!(
                            target: "classroom.bootstrap",
                            error = %leave_err,
                            "Leave after failed arm rejected"
                        );
                    }
                    return Err(e);
                }
                self.joined = true;
                Ok(())
            }
            Err(e) => {
                // The coordinator may already be gone; the join error is what matters
                let _ = coordinator.join_failed().await;
                let err = JoinError::from(e);
                metrics::record_join_attempt(match err {
                    JoinError::Rejected(_) => "rejected",
                    _ => "network",
                });

                if err.is_retryable() && self.attempts < self.max_attempts {
                    self.gate_closed = false;
                }

                warn!(
                    target: "classroom.bootstrap",
                    attempt = self.attempts,
                    error = %err,
                    can_retry = self.can_retry(),
                    "Join failed"
                );
                Err(err.into())
            }
        }
    }

    /// Whether another `join` call would reach the collaborator.
    #[must_use]
    pub fn can_retry(&self) -> bool {
        !self.joined && !self.gate_closed
    }

    #[must_use]
    pub fn is_joined(&self) -> bool {
        self.joined
    }

    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}
