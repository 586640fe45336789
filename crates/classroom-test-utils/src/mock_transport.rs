//! Mock media transport.
//!
//! Join results are scripted as a queue; once the queue is empty every join
//! succeeds, optionally after a delay or never at all. Leave either always
//! succeeds or always fails, optionally after a delay so teardown timeouts
//! can be exercised.
//!
//! # Example
//!
//! ```rust,ignore
//! let transport = MockTransport::builder()
//!     .fail_join_with(TransportError::InvalidToken("expired".into()))
//!     .fail_leave_with(TransportError::Closed)
//!     .build();
//!
//! // ... run the client ...
//! assert_eq!(transport.join_calls(), 2);
//! assert_eq!(transport.leave_calls(), 1);
//! ```

use common::error::TransportError;
use common::secret::{ExposeSecret, SecretString};
use common::transport::MediaTransport;
use common::types::JoinSettings;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct MockTransport {
    join_results: Mutex<VecDeque<Result<(), TransportError>>>,
    join_delay: Option<Duration>,
    join_hangs: bool,
    leave_error: Option<TransportError>,
    leave_delay: Option<Duration>,
    join_calls: AtomicUsize,
    leave_calls: AtomicUsize,
    last_join: Mutex<Option<(String, JoinSettings)>>,
}

impl MockTransport {
    /// Create a new builder.
    #[must_use]
    pub fn builder() -> MockTransportBuilder {
        MockTransportBuilder::default()
    }

    /// A transport on which every call succeeds.
    #[must_use]
    pub fn accepting() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of `join()` calls so far.
    pub fn join_calls(&self) -> usize {
        self.join_calls.load(Ordering::SeqCst)
    }

    /// Number of `leave()` calls so far (counted when the call starts).
    pub fn leave_calls(&self) -> usize {
        self.leave_calls.load(Ordering::SeqCst)
    }

    /// Token and settings of the most recent join.
    pub fn last_join(&self) -> Option<(String, JoinSettings)> {
        self.last_join.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl MediaTransport for MockTransport {
    async fn join(
        &self,
        access_token: &SecretString,
        settings: JoinSettings,
    ) -> Result<(), TransportError> {
        self.join_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_join.lock().unwrap() =
            Some((access_token.expose_secret().to_string(), settings));

        if self.join_hangs {
            std::future::pending::<()>().await;
        }
        if let Some(delay) = self.join_delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.join_results.lock().unwrap().pop_front();
        next.unwrap_or(Ok(()))
    }

    async fn leave(&self) -> Result<(), TransportError> {
        self.leave_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.leave_delay {
            tokio::time::sleep(delay).await;
        }

        match &self.leave_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

/// Builder for `MockTransport`.
#[derive(Debug, Default)]
pub struct MockTransportBuilder {
    join_results: VecDeque<Result<(), TransportError>>,
    join_delay: Option<Duration>,
    join_hangs: bool,
    leave_error: Option<TransportError>,
    leave_delay: Option<Duration>,
}

impl MockTransportBuilder {
    /// Fail the next unscripted join with `err`. May be called repeatedly.
    #[must_use]
    pub fn fail_join_with(mut self, err: TransportError) -> Self {
        self.join_results.push_back(Err(err));
        self
    }

    /// Make every `join()` take `delay` before resolving.
    #[must_use]
    pub fn join_delay(mut self, delay: Duration) -> Self {
        self.join_delay = Some(delay);
        self
    }

    /// Make every `join()` hang forever, like a room that never answers.
    #[must_use]
    pub fn join_never_resolves(mut self) -> Self {
        self.join_hangs = true;
        self
    }

    /// Make every `leave()` fail with `err`.
    #[must_use]
    pub fn fail_leave_with(mut self, err: TransportError) -> Self {
        self.leave_error = Some(err);
        self
    }

    /// Make every `leave()` take `delay` before resolving.
    #[must_use]
    pub fn leave_delay(mut self, delay: Duration) -> Self {
        self.leave_delay = Some(delay);
        self
    }

    /// Build the mock.
    #[must_use]
    pub fn build(self) -> Arc<MockTransport> {
        Arc::new(MockTransport {
            join_results: Mutex::new(self.join_results),
            join_delay: self.join_delay,
            join_hangs: self.join_hangs,
            leave_error: self.leave_error,
            leave_delay: self.leave_delay,
            ..MockTransport::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> SecretString {
        SecretString::from("tok-1".to_string())
    }

    #[tokio::test]
    async fn test_scripted_join_results_then_success() {
        let transport = MockTransport::builder()
            .fail_join_with(TransportError::Network("reset".to_string()))
            .build();

        assert!(transport.join(&token(), JoinSettings::default()).await.is_err());
        assert!(transport.join(&token(), JoinSettings::default()).await.is_ok());
        assert_eq!(transport.join_calls(), 2);
        assert_eq!(transport.last_join().unwrap().0, "tok-1");
    }

    #[tokio::test]
    async fn test_leave_failure_is_counted() {
        let transport = MockTransport::builder()
            .fail_leave_with(TransportError::Closed)
            .build();

        assert_eq!(transport.leave().await, Err(TransportError::Closed));
        assert_eq!(transport.leave_calls(), 1);
    }
}
