//! Trace replay against the real coordinator.
//!
//! A trace is JSON lines, one timestamped collaborator event per line:
//!
//! ```text
//! {"at_ms": 0,    "kind": "connection",   "connected": true}
//! {"at_ms": 250,  "kind": "roster",       "peers": [{"id": "t1", "displayName": "Kim", "roleTag": "tutor"}]}
//! {"at_ms": 9000, "kind": "notification", "payload": {"type": "ROOM_ENDED"}}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. The session is
//! joined at `at_ms = 0` through logging stand-ins for the transport and
//! the navigator, so a field report can be reproduced without a media stack.

use crate::actors::{LeaveCoordinator, LeaveOutcome};
use crate::bootstrap::SessionBootstrap;
use crate::config::Config;
use crate::errors::ClientError;
use crate::storage::{
    SessionContext, DEFAULT_COURSE_TITLE, DEFAULT_HOST_DISPLAY_NAME, DEFAULT_PARTICIPANT_NAME,
};

use common::error::TransportError;
use common::navigation::Navigator;
use common::secret::SecretString;
use common::transport::{MediaEvent, MediaTransport};
use common::types::{JoinSettings, SessionId};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// One timestamped event of a trace.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReplayStep {
    /// Offset from the start of the replay.
    pub at_ms: u64,
    #[serde(flatten)]
    pub event: MediaEvent,
}

#[derive(Debug, Error)]
pub enum ReplayError {
    /// A line is not a valid step.
    #[error("Trace line {line}: {message}")]
    Parse { line: usize, message: String },

    /// A step is timestamped before its predecessor.
    #[error("Trace line {line}: at_ms {at_ms} is earlier than the previous step")]
    OutOfOrder { line: usize, at_ms: u64 },

    /// The trace file could not be read.
    #[error("Failed to read trace: {0}")]
    Io(String),
}

/// Parse a JSON-lines trace. Line numbers in errors are 1-based.
///
/// # Errors
///
/// Returns `ReplayError::Parse` for a malformed line and
/// `ReplayError::OutOfOrder` for a timestamp that goes backwards.
pub fn parse_trace(input: &str) -> Result<Vec<ReplayStep>, ReplayError> {
    let mut steps: Vec<ReplayStep> = Vec::new();

    for (index, raw) in input.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let step: ReplayStep = serde_json::from_str(trimmed).map_err(|e| ReplayError::Parse {
            line,
            message: e.to_string(),
        })?;

        if steps.last().is_some_and(|prev| step.at_ms < prev.at_ms) {
            return Err(ReplayError::OutOfOrder {
                line,
                at_ms: step.at_ms,
            });
        }
        steps.push(step);
    }

    Ok(steps)
}

/// Transport stand-in that accepts every call and logs it.
#[derive(Debug, Default)]
pub struct ReplayTransport;

#[async_trait::async_trait]
impl MediaTransport for ReplayTransport {
    async fn join(
        &self,
        _access_token: &SecretString,
        settings: JoinSettings,
    ) -> Result<(), TransportError> {
        info!(
            target: "classroom.replay",
            audio_muted = settings.audio_muted,
            video_muted = settings.video_muted,
            "join()"
        );
        Ok(())
    }

    async fn leave(&self) -> Result<(), TransportError> {
        info!(target: "classroom.replay", "leave()");
        Ok(())
    }
}

/// Navigator stand-in that logs the route.
#[derive(Debug, Default)]
pub struct LoggingNavigator;

impl Navigator for LoggingNavigator {
    fn navigate(&self, route: &str) {
        info!(target: "classroom.replay", route = %route, "navigate()");
    }
}

/// What happened during a replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayReport {
    pub events_replayed: usize,
    /// None if the trace ended without any rule firing.
    pub outcome: Option<LeaveOutcome>,
    pub redirected_to: Option<String>,
}

/// Replay `steps` against a fresh coordinator configured from `config`.
///
/// After the last step the replay keeps running long enough for any armed
/// debounce timer and the redirect delay to elapse, then tears down.
///
/// # Errors
///
/// Returns `ClientError::Internal` if the coordinator stops mid-replay.
pub async fn run_replay(config: &Config, steps: Vec<ReplayStep>) -> Result<ReplayReport, ClientError> {
    let session_id = SessionId::from("replay");
    let (coordinator, coordinator_task) = LeaveCoordinator::spawn(
        session_id.clone(),
        config.policy.clone(),
        Arc::new(ReplayTransport),
        Arc::new(LoggingNavigator),
        CancellationToken::new(),
    );

    let context = SessionContext {
        session_id,
        access_token: SecretString::from("replay-token".to_string()),
        host_display_name: DEFAULT_HOST_DISPLAY_NAME.to_string(),
        course_title: DEFAULT_COURSE_TITLE.to_string(),
        local_participant_name: DEFAULT_PARTICIPANT_NAME.to_string(),
    };
    let mut bootstrap = SessionBootstrap::new(
        Arc::new(ReplayTransport),
        config.join_settings,
        config.max_join_attempts,
    );
    bootstrap.join(&context, &coordinator).await?;

    let start = Instant::now();
    let events_replayed = steps.len();
    for step in steps {
        tokio::time::sleep_until(start + Duration::from_millis(step.at_ms)).await;
        debug!(
            target: "classroom.replay",
            at_ms = step.at_ms,
            event = ?step.event,
            "Replaying event"
        );
        coordinator.dispatch(step.event).await?;
    }

    let policy = &config.policy;
    let drain = policy
        .no_peers_grace
        .max(policy.host_left_grace)
        .max(policy.host_absent_grace)
        + policy.redirect_delay;

    let mut status = coordinator.subscribe();
    if tokio::time::timeout(drain, status.wait_for(|s| s.redirected_to.is_some()))
        .await
        .is_err()
    {
        debug!(
            target: "classroom.replay",
            "No redirect after draining timers"
        );
    }

    let final_status = coordinator.status();
    coordinator.teardown().await?;
    if let Err(e) = coordinator_task.await {
        warn!(target: "classroom.replay", error = %e, "Coordinator task failed");
    }

    Ok(ReplayReport {
        events_replayed,
        outcome: final_status.outcome,
        redirected_to: final_status.redirected_to,
    })
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::actors::LeaveTrigger;
    use std::collections::HashMap;

    fn config() -> Config {
        Config::from_vars(&HashMap::new()).unwrap()
    }

    #[test]
    fn test_parse_trace_skips_blank_and_comment_lines() {
        let trace = r#"
# field report 4711
{"at_ms": 0, "kind": "connection", "connected": true}

{"at_ms": 50, "kind": "notification", "payload": "ROOM_ENDED"}
"#;
        let steps = parse_trace(trace).unwrap();

        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].event, MediaEvent::Connection { connected: true });
        assert_eq!(steps[1].at_ms, 50);
    }

    #[test]
    fn test_parse_trace_reports_line_number() {
        let trace = "{\"at_ms\": 0, \"kind\": \"connection\", \"connected\": true}\n{\"at_ms\": 5, \"kind\": \"teleport\"}\n";

        match parse_trace(trace) {
            Err(ReplayError::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_trace_rejects_backwards_timestamps() {
        let trace = "{\"at_ms\": 10, \"kind\": \"connection\", \"connected\": true}\n\
                     {\"at_ms\": 5, \"kind\": \"connection\", \"connected\": false}\n";

        assert!(matches!(
            parse_trace(trace),
            Err(ReplayError::OutOfOrder { line: 2, at_ms: 5 })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_room_ended_trace() {
        let trace = r#"
{"at_ms": 0, "kind": "connection", "connected": true}
{"at_ms": 100, "kind": "roster", "peers": [{"id": "me", "displayName": "Sam", "isLocal": true}, {"id": "t1", "displayName": "Ms. Rivera", "roleTag": "tutor"}]}
{"at_ms": 4000, "kind": "notification", "payload": {"type": "ROOM_ENDED", "message": "Class dismissed"}}
"#;
        let report = run_replay(&config(), parse_trace(trace).unwrap())
            .await
            .unwrap();

        assert_eq!(report.events_replayed, 3);
        let outcome = report.outcome.unwrap();
        assert_eq!(outcome.trigger, LeaveTrigger::RoomEnded);
        assert_eq!(outcome.message, "Class dismissed");
        assert_eq!(report.redirected_to.as_deref(), Some("/student/dashboard"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_without_end_condition_tears_down() {
        let trace = r#"{"at_ms": 0, "kind": "connection", "connected": true}"#;

        let report = run_replay(&config(), parse_trace(trace).unwrap())
            .await
            .unwrap();

        assert_eq!(report.outcome, None);
        assert_eq!(report.redirected_to, None);
    }
}
