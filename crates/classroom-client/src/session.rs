//! `ClassroomSession` - drives one session view from mount to redirect.
//!
//! Load context, spawn the coordinator, forward collaborator events, join
//! (with the permitted retry), then wait until either the dashboard redirect
//! has happened or the host asks to shut down. Shutdown is honoured during
//! the join as well. Every path ends in the coordinator's teardown, which
//! guarantees no dangling room membership.

use crate::actors::{LeaveCoordinator, LeaveCoordinatorHandle, LeaveTrigger};
use crate::bootstrap::SessionBootstrap;
use crate::config::Config;
use crate::errors::ClientError;
use crate::storage::{PersistedStorage, SessionContext};

use common::navigation::Navigator;
use common::transport::{MediaEvent, MediaTransport};
use common::types::SessionId;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// How a session view ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub session_id: SessionId,
    pub trigger: LeaveTrigger,
    /// Message that was displayed before the redirect.
    pub message: String,
    /// Route navigated to, if the redirect ran before teardown.
    pub redirected_to: Option<String>,
}

pub struct ClassroomSession {
    config: Config,
    transport: Arc<dyn MediaTransport>,
    navigator: Arc<dyn Navigator>,
}

impl ClassroomSession {
    #[must_use]
    pub fn new(
        config: Config,
        transport: Arc<dyn MediaTransport>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            config,
            transport,
            navigator,
        }
    }

    /// Run the session to completion.
    ///
    /// `events` carries the collaborator's reactive state. `shutdown` is the
    /// host's unmount signal.
    ///
    /// # Errors
    ///
    /// - `ClientError::Bootstrap` if no usable session context is stored
    /// - `ClientError::Join` if joining failed and no retries remain
    /// - `ClientError::Internal` if the coordinator stopped unexpectedly
    #[instrument(skip_all, name = "classroom.session")]
    pub async fn run(
        &self,
        storage: &PersistedStorage,
        events: mpsc::Receiver<MediaEvent>,
        shutdown: CancellationToken,
    ) -> Result<SessionOutcome, ClientError> {
        let context = SessionBootstrap::load_context(storage)?;

        let (coordinator, coordinator_task) = LeaveCoordinator::spawn(
            context.session_id.clone(),
            self.config.policy.clone(),
            Arc::clone(&self.transport),
            Arc::clone(&self.navigator),
            CancellationToken::new(),
        );
        let forwarder = spawn_forwarder(coordinator.clone(), events);

        let joined = tokio::select! {
            () = shutdown.cancelled() => {
                info!(
                    target: "classroom.session",
                    session_id = %context.session_id,
                    "Shutdown requested while joining, abandoning join"
                );
                false
            }
            result = self.join_with_retry(&context, &coordinator) => {
                if let Err(e) = result {
                    forwarder.abort();
                    let _ = coordinator.teardown().await;
                    let _ = coordinator_task.await;
                    return Err(e);
                }
                true
            }
        };

        if joined {
            let mut status = coordinator.subscribe();
            tokio::select! {
                () = shutdown.cancelled() => {
                    info!(
                        target: "classroom.session",
                        session_id = %context.session_id,
                        "Shutdown requested, tearing down session"
                    );
                }
                redirected = status.wait_for(|s| s.redirected_to.is_some()) => {
                    if redirected.is_err() {
                        warn!(
                            target: "classroom.session",
                            session_id = %context.session_id,
                            "Coordinator stopped before redirect"
                        );
                    }
                }
            }
        }

        forwarder.abort();
        let report = coordinator.teardown().await;
        if let Err(e) = coordinator_task.await {
            warn!(
                target: "classroom.session",
                error = %e,
                "Coordinator task failed"
            );
        }
        if let Ok(report) = report {
            debug!(
                target: "classroom.session",
                leave_issued = report.leave_issued,
                timers_cancelled = report.timers_cancelled,
                "Session torn down"
            );
        }

        let final_status = coordinator.status();
        let outcome = final_status.outcome.ok_or_else(|| {
            ClientError::Internal("session ended without a leave outcome".to_string())
        })?;

        info!(
            target: "classroom.session",
            session_id = %context.session_id,
            trigger = outcome.trigger.as_str(),
            redirected_to = final_status.redirected_to.as_deref().unwrap_or("none"),
            "Session finished"
        );

        Ok(SessionOutcome {
            session_id: context.session_id,
            trigger: outcome.trigger,
            message: outcome.message,
            redirected_to: final_status.redirected_to,
        })
    }

    async fn join_with_retry(
        &self,
        context: &SessionContext,
        coordinator: &LeaveCoordinatorHandle,
    ) -> Result<(), ClientError> {
        let mut bootstrap = SessionBootstrap::new(
            Arc::clone(&self.transport),
            self.config.join_settings,
            self.config.max_join_attempts,
        );

        loop {
            match bootstrap.join(context, coordinator).await {
                Ok(()) => return Ok(()),
                Err(e) if bootstrap.can_retry() => {
                    info!(
                        target: "classroom.session",
                        attempt = bootstrap.attempts(),
                        error = %e,
                        "Retrying join"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Forward collaborator events into the coordinator mailbox.
fn spawn_forwarder(
    coordinator: LeaveCoordinatorHandle,
    mut events: mpsc::Receiver<MediaEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if coordinator.dispatch(event).await.is_err() {
                break;
            }
        }
        debug!(
            target: "classroom.session",
            "Media event stream ended"
        );
    })
}
