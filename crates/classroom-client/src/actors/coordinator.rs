//! `LeaveCoordinator` - single owner of the decision to end a session.
//!
//! Connection edges, room-ended notifications, roster heuristics and
//! debounce timers all arrive in one mailbox and are handled one at a time,
//! so the leaving flag has exactly one writer. The first rule to reach
//! `begin_leave` wins; every later trigger observes the flag and is dropped.
//!
//! # Leave sequence
//!
//! 1. Set the leaving flag and publish `LeaveRequested`
//! 2. Cancel every pending debounce timer
//! 3. Issue `leave()` on the transport (failure is logged only)
//! 4. Publish `Left` with the outcome message
//! 5. After the redirect delay, navigate to the dashboard
//!
//! # Teardown
//!
//! Teardown (explicit, cancellation, or every handle dropped) cancels timers
//! and the pending redirect. If the session was joined, or a join was still
//! in flight, and no leave has been issued yet, teardown issues exactly one
//! `leave()`.

use super::messages::{
    CoordinatorMessage, CoordinatorPhase, CoordinatorSnapshot, CoordinatorStatus, LeaveOutcome,
    LeaveTrigger, TeardownReport,
};
use super::timers::{PendingTimers, TimerKind};
use crate::config::LeavePolicy;
use crate::errors::{ClientError, LeaveError};
use crate::observability::metrics;
use crate::signals::{
    classify, ConnectionEdge, ConnectionSignal, Notification, RosterPolicy, RosterSignal,
    DEFAULT_END_MESSAGE,
};

use common::navigation::Navigator;
use common::transport::{MediaEvent, MediaTransport};
use common::types::{Peer, SessionId};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Default channel buffer size for the coordinator mailbox.
const COORDINATOR_CHANNEL_BUFFER: usize = 256;

/// Message shown when the view is torn down before the session ended.
const TEARDOWN_MESSAGE: &str = "You left the session.";

/// Handle to a `LeaveCoordinator`.
#[derive(Clone)]
pub struct LeaveCoordinatorHandle {
    sender: mpsc::Sender<CoordinatorMessage>,
    cancel_token: CancellationToken,
    session_id: SessionId,
    status: watch::Receiver<CoordinatorStatus>,
}

impl LeaveCoordinatorHandle {
    /// Get the session ID.
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Record that a join is about to be sent to the collaborator.
    pub async fn join_started(&self) -> Result<(), ClientError> {
        self.send(CoordinatorMessage::JoinStarted).await
    }

    /// Record that the outstanding join failed.
    pub async fn join_failed(&self) -> Result<(), ClientError> {
        self.send(CoordinatorMessage::JoinFailed).await
    }

    /// Start acting on signals. Sent once, after the first successful join.
    pub async fn arm(&self) -> Result<(), ClientError> {
        self.send(CoordinatorMessage::Arm).await
    }

    /// Forward a re-evaluation of the collaborator's `connected` boolean.
    pub async fn connection_changed(&self, connected: bool) -> Result<(), ClientError> {
        self.send(CoordinatorMessage::ConnectionChanged { connected })
            .await
    }

    /// Forward a signaling notification payload.
    pub async fn notification_received(&self, payload: Value) -> Result<(), ClientError> {
        self.send(CoordinatorMessage::NotificationReceived { payload })
            .await
    }

    /// Forward a roster snapshot.
    pub async fn roster_changed(&self, peers: Vec<Peer>) -> Result<(), ClientError> {
        self.send(CoordinatorMessage::RosterChanged { peers }).await
    }

    /// Forward one collaborator event, whatever its kind.
    pub async fn dispatch(&self, event: MediaEvent) -> Result<(), ClientError> {
        match event {
            MediaEvent::Connection { connected } => self.connection_changed(connected).await,
            MediaEvent::Roster { peers } => self.roster_changed(peers).await,
            MediaEvent::Notification { payload } => self.notification_received(payload).await,
        }
    }

    /// Get current coordinator state.
    pub async fn get_state(&self) -> Result<CoordinatorSnapshot, ClientError> {
        let (tx, rx) = oneshot::channel();
        self.send(CoordinatorMessage::GetState { respond_to: tx })
            .await?;

        rx.await
            .map_err(|e| ClientError::Internal(format!("response receive failed: {e}")))
    }

    /// Tear the coordinator down and wait for it to finish cleanup.
    pub async fn teardown(&self) -> Result<TeardownReport, ClientError> {
        let (tx, rx) = oneshot::channel();
        self.send(CoordinatorMessage::Teardown { respond_to: tx })
            .await?;

        rx.await
            .map_err(|e| ClientError::Internal(format!("response receive failed: {e}")))
    }

    /// Subscribe to status changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CoordinatorStatus> {
        self.status.clone()
    }

    /// Latest published status.
    #[must_use]
    pub fn status(&self) -> CoordinatorStatus {
        self.status.borrow().clone()
    }

    /// Cancel the coordinator. Runs teardown inside the actor.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Check if the coordinator is cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    async fn send(&self, message: CoordinatorMessage) -> Result<(), ClientError> {
        self.sender
            .send(message)
            .await
            .map_err(|e| ClientError::Internal(format!("channel send failed: {e}")))
    }
}

/// The `LeaveCoordinator` implementation.
pub struct LeaveCoordinator {
    session_id: SessionId,
    receiver: mpsc::Receiver<CoordinatorMessage>,
    /// Weak self-sender for the redirect task.
    mailbox: mpsc::WeakSender<CoordinatorMessage>,
    cancel_token: CancellationToken,
    policy: LeavePolicy,
    transport: Arc<dyn MediaTransport>,
    navigator: Arc<dyn Navigator>,
    phase: CoordinatorPhase,
    /// A join was sent and has neither failed nor armed us yet.
    join_in_flight: bool,
    /// Single-writer leaving flag. Once set, no rule may fire again.
    leaving: bool,
    connection: ConnectionSignal,
    roster: RosterSignal,
    timers: PendingTimers,
    outcome: Option<LeaveOutcome>,
    redirected_to: Option<String>,
    leave_task: Option<JoinHandle<()>>,
    redirect_task: Option<JoinHandle<()>>,
    status_tx: watch::Sender<CoordinatorStatus>,
}

impl LeaveCoordinator {
    /// Spawn a new coordinator.
    ///
    /// Returns a handle and the task join handle. The coordinator starts in
    /// `NotArmed`; nothing it observes has any effect until `arm()`.
    pub fn spawn(
        session_id: SessionId,
        policy: LeavePolicy,
        transport: Arc<dyn MediaTransport>,
        navigator: Arc<dyn Navigator>,
        cancel_token: CancellationToken,
    ) -> (LeaveCoordinatorHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(COORDINATOR_CHANNEL_BUFFER);
        let (status_tx, status_rx) = watch::channel(CoordinatorStatus::default());

        let roster_policy = RosterPolicy {
            tutor_role: policy.tutor_role.clone(),
            auxiliary_name_markers: policy.auxiliary_name_markers.clone(),
        };

        let actor = Self {
            session_id: session_id.clone(),
            receiver,
            mailbox: sender.downgrade(),
            cancel_token: cancel_token.clone(),
            policy,
            transport,
            navigator,
            phase: CoordinatorPhase::NotArmed,
            join_in_flight: false,
            leaving: false,
            connection: ConnectionSignal::new(),
            roster: RosterSignal::new(roster_policy),
            timers: PendingTimers::new(sender.downgrade()),
            outcome: None,
            redirected_to: None,
            leave_task: None,
            redirect_task: None,
            status_tx,
        };

        let task_handle = tokio::spawn(actor.run());

        let handle = LeaveCoordinatorHandle {
            sender,
            cancel_token,
            session_id,
            status: status_rx,
        };

        (handle, task_handle)
    }

    /// Run the actor message loop.
    #[instrument(skip_all, name = "classroom.coordinator", fields(session_id = %self.session_id))]
    async fn run(mut self) {
        info!(
            target: "classroom.coordinator",
            session_id = %self.session_id,
            "LeaveCoordinator started"
        );

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!(
                        target: "classroom.coordinator",
                        session_id = %self.session_id,
                        "LeaveCoordinator received cancellation signal"
                    );
                    self.teardown().await;
                    break;
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(CoordinatorMessage::Teardown { respond_to }) => {
                            let report = self.teardown().await;
                            let _ = respond_to.send(report);
                            break;
                        }
                        Some(message) => self.handle_message(message),
                        None => {
                            info!(
                                target: "classroom.coordinator",
                                session_id = %self.session_id,
                                "LeaveCoordinator channel closed, tearing down"
                            );
                            self.teardown().await;
                            break;
                        }
                    }
                }
            }
        }

        info!(
            target: "classroom.coordinator",
            session_id = %self.session_id,
            phase = self.phase.as_str(),
            trigger = self.outcome.as_ref().map_or("none", |o| o.trigger.as_str()),
            "LeaveCoordinator stopped"
        );
    }

    /// Handle a single message.
    fn handle_message(&mut self, message: CoordinatorMessage) {
        match message {
            CoordinatorMessage::JoinStarted => {
                self.join_in_flight = true;
                debug!(
                    target: "classroom.coordinator",
                    "Join in flight"
                );
            }

            CoordinatorMessage::JoinFailed => self.join_in_flight = false,

            CoordinatorMessage::Arm => self.handle_arm(),

            CoordinatorMessage::ConnectionChanged { connected } => {
                self.handle_connection_changed(connected);
            }

            CoordinatorMessage::NotificationReceived { payload } => {
                self.handle_notification(&payload);
            }

            CoordinatorMessage::RosterChanged { peers } => self.handle_roster_changed(&peers),

            CoordinatorMessage::TimerFired { kind, generation } => {
                self.handle_timer_fired(kind, generation);
            }

            CoordinatorMessage::RedirectCompleted { route } => {
                self.redirect_task = None;
                self.redirected_to = Some(route);
                self.publish_status();
            }

            CoordinatorMessage::GetState { respond_to } => {
                let _ = respond_to.send(self.snapshot());
            }

            // Handled in the run loop
            CoordinatorMessage::Teardown { respond_to } => {
                let _ = respond_to.send(TeardownReport {
                    leave_issued: false,
                    timers_cancelled: 0,
                    pending_timers: self.timers.len(),
                });
            }
        }
    }

    fn handle_arm(&mut self) {
        if self.phase != CoordinatorPhase::NotArmed {
            debug!(
                target: "classroom.coordinator",
                phase = self.phase.as_str(),
                "Ignoring duplicate arm"
            );
            return;
        }

        self.phase = CoordinatorPhase::Armed;
        self.join_in_flight = false;
        self.connection.arm();

        info!(
            target: "classroom.coordinator",
            session_id = %self.session_id,
            connection = self.connection.state().as_str(),
            visible_peers = self.roster.visible().len(),
            "LeaveCoordinator armed"
        );

        // Roster snapshots seen before the join are the baseline
        if self.roster.awaiting_tutor() {
            self.timers
                .arm(TimerKind::HostAbsent, self.policy.host_absent_grace);
        }

        self.publish_status();
    }

    fn handle_connection_changed(&mut self, connected: bool) {
        let edge = self.connection.observe(connected);

        if self.phase != CoordinatorPhase::Armed {
            return;
        }

        match edge {
            Some(ConnectionEdge::Disconnected) => {
                self.begin_leave(LeaveTrigger::ConnectionLost, DEFAULT_END_MESSAGE.to_string());
            }
            Some(ConnectionEdge::Reconnected) => {
                if self.policy.roster_rules_require_disconnect {
                    self.cancel_timer(TimerKind::NoPeers, "connection restored");
                    self.cancel_timer(TimerKind::HostLeft, "connection restored");
                }
                self.publish_status();
            }
            None => {}
        }
    }

    fn handle_notification(&mut self, payload: &Value) {
        match classify(payload) {
            Notification::RoomEnded { message } => {
                if self.phase == CoordinatorPhase::Armed {
                    self.begin_leave(LeaveTrigger::RoomEnded, message);
                } else {
                    debug!(
                        target: "classroom.coordinator",
                        phase = self.phase.as_str(),
                        "Ignoring room-ended notification"
                    );
                }
            }
            Notification::Other => {
                debug!(
                    target: "classroom.coordinator",
                    "Dropping unrelated notification"
                );
            }
        }
    }

    fn handle_roster_changed(&mut self, peers: &[Peer]) {
        let update = self.roster.observe(peers);

        if self.phase != CoordinatorPhase::Armed {
            return;
        }

        let gate_open = self.roster_rules_enabled();

        if update.peers_returned {
            self.cancel_timer(TimerKind::NoPeers, "peers returned");
        }
        if update.tutor_arrived {
            self.cancel_timer(TimerKind::HostLeft, "tutor returned");
            self.cancel_timer(TimerKind::HostAbsent, "tutor arrived");
        }

        if update.all_peers_vanished && gate_open {
            self.timers
                .arm(TimerKind::NoPeers, self.policy.no_peers_grace);
        }
        if update.tutor_vanished && gate_open {
            self.timers
                .arm(TimerKind::HostLeft, self.policy.host_left_grace);
        }

        if self.roster.awaiting_tutor() {
            self.timers
                .arm(TimerKind::HostAbsent, self.policy.host_absent_grace);
        } else {
            self.cancel_timer(TimerKind::HostAbsent, "no longer awaiting tutor");
        }
    }

    fn handle_timer_fired(&mut self, kind: TimerKind, generation: u64) {
        if !self.timers.take_fired(kind, generation) {
            debug!(
                target: "classroom.coordinator",
                timer = kind.as_str(),
                generation = generation,
                "Ignoring stale timer"
            );
            return;
        }

        if self.phase != CoordinatorPhase::Armed {
            return;
        }

        // Recovery edges cancel timers, but re-check in case the condition
        // cleared without producing one.
        let still_holds = match kind {
            TimerKind::NoPeers => !self.roster.has_remote_peers() && self.roster_rules_enabled(),
            TimerKind::HostLeft => !self.roster.tutor_present() && self.roster_rules_enabled(),
            TimerKind::HostAbsent => self.roster.awaiting_tutor(),
        };

        if still_holds {
            self.begin_leave(kind.trigger(), DEFAULT_END_MESSAGE.to_string());
        } else {
            debug!(
                target: "classroom.coordinator",
                timer = kind.as_str(),
                "Timer expired after its condition cleared"
            );
        }
    }

    /// Run the leave sequence. Idempotent: only the first caller proceeds.
    fn begin_leave(&mut self, trigger: LeaveTrigger, message: String) {
        if self.leaving {
            debug!(
                target: "classroom.coordinator",
                trigger = trigger.as_str(),
                "Leave already in progress, ignoring trigger"
            );
            return;
        }

        self.leaving = true;
        self.phase = CoordinatorPhase::LeaveRequested;
        self.outcome = Some(LeaveOutcome {
            trigger,
            message: message.clone(),
        });
        self.publish_status();

        let timers_cancelled = self.timers.cancel_all();
        self.connection.mark_left();

        info!(
            target: "classroom.coordinator",
            session_id = %self.session_id,
            trigger = trigger.as_str(),
            message = %message,
            timers_cancelled = timers_cancelled,
            "Leaving session"
        );
        metrics::record_leave(trigger.as_str());

        self.leave_task = Some(self.spawn_leave());

        self.phase = CoordinatorPhase::Left;
        self.redirect_task = Some(self.spawn_redirect());
        self.publish_status();
    }

    /// Issue `leave()` without blocking the mailbox.
    fn spawn_leave(&self) -> JoinHandle<()> {
        let transport = Arc::clone(&self.transport);
        let session_id = self.session_id.clone();

        tokio::spawn(async move {
            let start = Instant::now();
            match transport.leave().await {
                Ok(()) => {
                    debug!(
                        target: "classroom.coordinator",
                        session_id = %session_id,
                        "Transport leave completed"
                    );
                }
                Err(e) => {
                    let err = LeaveError::from(e);
                    warn!(
                        target: "classroom.coordinator",
                        session_id = %session_id,
                        error = %err,
                        "Transport leave failed, continuing"
                    );
                    metrics::record_leave_error();
                }
            }
            metrics::record_leave_call_duration(start.elapsed());
        })
    }

    fn spawn_redirect(&self) -> JoinHandle<()> {
        let navigator = Arc::clone(&self.navigator);
        let mailbox = self.mailbox.clone();
        let route = self.policy.dashboard_route.clone();
        let delay = self.policy.redirect_delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            navigator.navigate(&route);
            if let Some(sender) = mailbox.upgrade() {
                let _ = sender
                    .send(CoordinatorMessage::RedirectCompleted { route })
                    .await;
            }
        })
    }

    /// Release everything the coordinator owns.
    async fn teardown(&mut self) -> TeardownReport {
        let timers_cancelled = self.timers.cancel_all();

        if let Some(redirect) = self.redirect_task.take() {
            if !redirect.is_finished() {
                redirect.abort();
                debug!(
                    target: "classroom.coordinator",
                    "Pending redirect aborted by teardown"
                );
            }
        }

        // A join dropped mid-flight may still have created a membership
        let joined = self.phase == CoordinatorPhase::Armed
            || (self.phase == CoordinatorPhase::NotArmed && self.join_in_flight);
        let leave_issued = joined && !self.leaving;
        if leave_issued {
            self.leaving = true;
            self.connection.mark_left();
            self.outcome = Some(LeaveOutcome {
                trigger: LeaveTrigger::Teardown,
                message: TEARDOWN_MESSAGE.to_string(),
            });
            metrics::record_leave(LeaveTrigger::Teardown.as_str());
            self.leave_task = Some(self.spawn_leave());
        }

        // Give an in-flight leave a bounded chance to reach the collaborator
        if let Some(leave) = self.leave_task.take() {
            if tokio::time::timeout(self.policy.teardown_leave_timeout, leave)
                .await
                .is_err()
            {
                warn!(
                    target: "classroom.coordinator",
                    session_id = %self.session_id,
                    timeout_ms = duration_millis(self.policy.teardown_leave_timeout),
                    "Leave still in flight at teardown, detaching"
                );
            }
        }

        if leave_issued || self.phase == CoordinatorPhase::LeaveRequested {
            self.phase = CoordinatorPhase::Left;
        }
        self.publish_status();

        info!(
            target: "classroom.coordinator",
            session_id = %self.session_id,
            leave_issued = leave_issued,
            timers_cancelled = timers_cancelled,
            "LeaveCoordinator torn down"
        );

        TeardownReport {
            leave_issued,
            timers_cancelled,
            pending_timers: self.timers.len(),
        }
    }

    fn cancel_timer(&mut self, kind: TimerKind, reason: &str) {
        if self.timers.cancel(kind) {
            debug!(
                target: "classroom.coordinator",
                timer = kind.as_str(),
                reason = reason,
                "Condition recovered, timer cancelled"
            );
        }
    }

    /// Whether "no-peers" and "host-left" may arm right now.
    fn roster_rules_enabled(&self) -> bool {
        !self.policy.roster_rules_require_disconnect || !self.connection.is_connected()
    }

    fn snapshot(&self) -> CoordinatorSnapshot {
        CoordinatorSnapshot {
            phase: self.phase,
            leaving: self.leaving,
            connection: self.connection.state(),
            pending_timers: self.timers.pending(),
            visible_peers: self.roster.visible().peers().to_vec(),
            tutor_present: self.roster.tutor_present(),
            outcome: self.outcome.clone(),
        }
    }

    fn publish_status(&self) {
        self.status_tx.send_replace(CoordinatorStatus {
            phase: self.phase,
            connection: self.connection.state(),
            outcome: self.outcome.clone(),
            redirected_to: self.redirected_to.clone(),
        });
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
