//! Integration tests for session bootstrap and the end-to-end session driver.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use classroom_client::actors::{CoordinatorPhase, LeaveCoordinator, LeaveTrigger};
use classroom_client::bootstrap::SessionBootstrap;
use classroom_client::config::{Config, LeavePolicy};
use classroom_client::errors::{BootstrapError, ClientError, JoinError};
use classroom_client::session::ClassroomSession;
use classroom_client::storage::{PersistedStorage, SESSION_BLOB_FILE};
use classroom_test_utils::{
    local_only_roster, room_ended_payload, roster_with, session_blob, MockTransport,
    RecordingNavigator, TestPeer,
};
use common::error::TransportError;
use common::secret::SecretString;
use common::transport::MediaEvent;
use common::types::{JoinSettings, SessionId};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

const DASHBOARD: &str = "/student/dashboard";

fn config() -> Config {
    Config::from_vars(&HashMap::new()).unwrap()
}

fn stored_session() -> PersistedStorage {
    PersistedStorage::new(Some(session_blob("sess-42", "tok-1")), None)
}

// ============================================================================
// SessionBootstrap
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_join_retry_after_network_failure() {
    let transport = MockTransport::builder()
        .fail_join_with(TransportError::Network("reset".to_string()))
        .build();
    let (coordinator, _task) = LeaveCoordinator::spawn(
        SessionId::from("sess-42"),
        LeavePolicy::default(),
        transport.clone(),
        RecordingNavigator::new(),
        CancellationToken::new(),
    );
    let context = SessionBootstrap::load_context(&stored_session()).unwrap();
    let mut bootstrap = SessionBootstrap::new(transport.clone(), JoinSettings::default(), 2);

    let err = bootstrap.join(&context, &coordinator).await.unwrap_err();
    assert!(matches!(err, ClientError::Join(JoinError::Network(_))));
    assert!(bootstrap.can_retry());
    assert_eq!(
        coordinator.get_state().await.unwrap().phase,
        CoordinatorPhase::NotArmed
    );

    bootstrap.join(&context, &coordinator).await.unwrap();
    assert!(bootstrap.is_joined());
    assert_eq!(transport.join_calls(), 2);
    assert_eq!(
        coordinator.get_state().await.unwrap().phase,
        CoordinatorPhase::Armed
    );

    let err = bootstrap.join(&context, &coordinator).await.unwrap_err();
    assert!(matches!(err, ClientError::Join(JoinError::AlreadyJoined)));
    assert_eq!(transport.join_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_join_retries_exhausted_after_second_failure() {
    let transport = MockTransport::builder()
        .fail_join_with(TransportError::InvalidToken("expired".to_string()))
        .fail_join_with(TransportError::InvalidToken("expired".to_string()))
        .build();
    let (coordinator, _task) = LeaveCoordinator::spawn(
        SessionId::from("sess-42"),
        LeavePolicy::default(),
        transport.clone(),
        RecordingNavigator::new(),
        CancellationToken::new(),
    );
    let context = SessionBootstrap::load_context(&stored_session()).unwrap();
    let mut bootstrap = SessionBootstrap::new(transport.clone(), JoinSettings::default(), 2);

    for _ in 0..2 {
        let err = bootstrap.join(&context, &coordinator).await.unwrap_err();
        assert!(matches!(err, ClientError::Join(JoinError::Rejected(_))));
    }
    assert!(!bootstrap.can_retry());

    let err = bootstrap.join(&context, &coordinator).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Join(JoinError::RetriesExhausted { attempts: 2 })
    ));
    assert_eq!(transport.join_calls(), 2);

    // Never joined, so teardown must not leave
    let report = coordinator.teardown().await.unwrap();
    assert!(!report.leave_issued);
    assert_eq!(transport.leave_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_join_uses_stored_token_and_muted_settings() {
    let transport = MockTransport::accepting();
    let (coordinator, _task) = LeaveCoordinator::spawn(
        SessionId::from("sess-42"),
        LeavePolicy::default(),
        transport.clone(),
        RecordingNavigator::new(),
        CancellationToken::new(),
    );
    let context = SessionBootstrap::load_context(&stored_session()).unwrap();
    let mut bootstrap = SessionBootstrap::new(transport.clone(), JoinSettings::default(), 2);

    bootstrap.join(&context, &coordinator).await.unwrap();

    let (token, settings) = transport.last_join().unwrap();
    assert_eq!(token, "tok-1");
    assert!(settings.audio_muted);
    assert!(settings.video_muted);
}

#[tokio::test(start_paused = true)]
async fn test_join_accepted_after_coordinator_stopped_leaves_again() {
    let transport = MockTransport::builder()
        .join_delay(Duration::from_secs(2))
        .build();
    let (coordinator, task) = LeaveCoordinator::spawn(
        SessionId::from("sess-42"),
        LeavePolicy::default(),
        transport.clone(),
        RecordingNavigator::new(),
        CancellationToken::new(),
    );
    let context = SessionBootstrap::load_context(&stored_session()).unwrap();
    let mut bootstrap = SessionBootstrap::new(transport.clone(), JoinSettings::default(), 2);

    let (result, ()) = tokio::join!(bootstrap.join(&context, &coordinator), async {
        sleep(Duration::from_millis(500)).await;
        coordinator.cancel();
    });

    assert!(matches!(result, Err(ClientError::Internal(_))));
    assert!(!bootstrap.is_joined());
    assert!(!bootstrap.can_retry());
    task.await.unwrap();
    // One leave from the coordinator's teardown while the join was in
    // flight, one from bootstrap once the late join was accepted
    assert_eq!(transport.join_calls(), 1);
    assert_eq!(transport.leave_calls(), 2);
}

#[test]
fn test_load_context_falls_back_to_raw_token() {
    let storage = PersistedStorage::new(
        Some("{not json".to_string()),
        Some(SecretString::from("raw-token")),
    );

    let context = SessionBootstrap::load_context(&storage).unwrap();
    assert!(context.session_id.as_str().starts_with("adhoc-"));
}

// ============================================================================
// ClassroomSession
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_session_ends_on_room_ended_and_redirects() {
    let transport = MockTransport::accepting();
    let navigator = RecordingNavigator::new();
    let session = ClassroomSession::new(config(), transport.clone(), navigator.clone());
    let (tx, rx) = mpsc::channel(16);
    let shutdown = CancellationToken::new();

    let storage = stored_session();
    let run = tokio::spawn(async move { session.run(&storage, rx, shutdown).await });

    sleep(Duration::from_millis(10)).await;
    assert_eq!(transport.join_calls(), 1);

    tx.send(MediaEvent::Connection { connected: true })
        .await
        .unwrap();
    tx.send(MediaEvent::Roster {
        peers: roster_with(vec![TestPeer::tutor("t1")]),
    })
    .await
    .unwrap();
    tx.send(MediaEvent::Notification {
        payload: room_ended_payload("Class dismissed"),
    })
    .await
    .unwrap();

    let outcome = run.await.unwrap().unwrap();
    assert_eq!(outcome.session_id.as_str(), "sess-42");
    assert_eq!(outcome.trigger, LeaveTrigger::RoomEnded);
    assert_eq!(outcome.message, "Class dismissed");
    assert_eq!(outcome.redirected_to.as_deref(), Some(DASHBOARD));
    assert_eq!(transport.leave_calls(), 1);
    assert_eq!(navigator.routes(), vec![DASHBOARD.to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_session_without_stored_context_never_joins() {
    let transport = MockTransport::accepting();
    let session = ClassroomSession::new(config(), transport.clone(), RecordingNavigator::new());
    let (_tx, rx) = mpsc::channel(16);

    let err = session
        .run(&PersistedStorage::default(), rx, CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ClientError::Bootstrap(BootstrapError::MissingSessionContext)
    ));
    assert_eq!(transport.join_calls(), 0);
    assert_eq!(transport.leave_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_session_surfaces_join_failure_after_retry() {
    let transport = MockTransport::builder()
        .fail_join_with(TransportError::Network("unreachable".to_string()))
        .fail_join_with(TransportError::Network("unreachable".to_string()))
        .build();
    let session = ClassroomSession::new(config(), transport.clone(), RecordingNavigator::new());
    let (_tx, rx) = mpsc::channel(16);

    let err = session
        .run(&stored_session(), rx, CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Join(JoinError::Network(_))));
    assert!(!err.client_message().contains("unreachable"));
    assert_eq!(transport.join_calls(), 2);
    assert_eq!(transport.leave_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_session_shutdown_leaves_once() {
    let transport = MockTransport::accepting();
    let navigator = RecordingNavigator::new();
    let session = ClassroomSession::new(config(), transport.clone(), navigator.clone());
    let (tx, rx) = mpsc::channel(16);
    let shutdown = CancellationToken::new();

    let storage = stored_session();
    let token = shutdown.clone();
    let run = tokio::spawn(async move { session.run(&storage, rx, token).await });

    tx.send(MediaEvent::Connection { connected: true })
        .await
        .unwrap();
    sleep(Duration::from_secs(1)).await;
    shutdown.cancel();

    let outcome = run.await.unwrap().unwrap();
    assert_eq!(outcome.trigger, LeaveTrigger::Teardown);
    assert_eq!(outcome.redirected_to, None);
    assert_eq!(transport.leave_calls(), 1);
    assert_eq!(navigator.navigation_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_session_from_storage_dir_ends_when_tutor_leaves() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(SESSION_BLOB_FILE),
        session_blob("sess-7", "tok-7"),
    )
    .unwrap();
    let storage = PersistedStorage::from_dir(dir.path()).unwrap();

    let transport = MockTransport::accepting();
    let session = ClassroomSession::new(config(), transport.clone(), RecordingNavigator::new());
    let (tx, rx) = mpsc::channel(16);

    let run =
        tokio::spawn(async move { session.run(&storage, rx, CancellationToken::new()).await });

    sleep(Duration::from_millis(10)).await;
    tx.send(MediaEvent::Roster {
        peers: roster_with(vec![TestPeer::tutor("t1")]),
    })
    .await
    .unwrap();
    tx.send(MediaEvent::Roster {
        peers: local_only_roster(),
    })
    .await
    .unwrap();

    let outcome = run.await.unwrap().unwrap();
    assert_eq!(outcome.session_id.as_str(), "sess-7");
    assert_eq!(outcome.trigger, LeaveTrigger::HostLeft);
    assert_eq!(outcome.redirected_to.as_deref(), Some(DASHBOARD));
    assert_eq!(transport.last_join().unwrap().0, "tok-7");
    assert_eq!(transport.leave_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_session_shutdown_while_join_hangs_still_leaves() {
    let transport = MockTransport::builder().join_never_resolves().build();
    let navigator = RecordingNavigator::new();
    let session = ClassroomSession::new(config(), transport.clone(), navigator.clone());
    let (_tx, rx) = mpsc::channel(16);
    let shutdown = CancellationToken::new();

    let storage = stored_session();
    let token = shutdown.clone();
    let run = tokio::spawn(async move { session.run(&storage, rx, token).await });

    sleep(Duration::from_secs(1)).await;
    assert_eq!(transport.join_calls(), 1);
    shutdown.cancel();

    let outcome = tokio::time::timeout(Duration::from_secs(60), run)
        .await
        .expect("run must return once shutdown is requested")
        .unwrap()
        .unwrap();
    assert_eq!(outcome.trigger, LeaveTrigger::Teardown);
    assert_eq!(outcome.redirected_to, None);
    assert_eq!(transport.leave_calls(), 1);
    assert_eq!(navigator.navigation_count(), 0);
}
