//! Named, cancellable debounce timers owned by the coordinator.
//!
//! Each timer is a spawned task that sleeps and then posts
//! `TimerFired { kind, generation }` to the coordinator mailbox. The map
//! holds at most one timer per kind. Cancelling removes the entry and aborts
//! the task; a `TimerFired` that was already queued when its timer was
//! cancelled carries a generation that no longer matches and is discarded.
//! Dropping `PendingTimers` aborts whatever is left.

use super::messages::{CoordinatorMessage, LeaveTrigger};
use crate::observability::metrics;

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// The three debounce windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerKind {
    /// All remote peers vanished.
    NoPeers,
    /// The tutor vanished after having been present.
    HostLeft,
    /// Remote peers present but the tutor never arrived.
    HostAbsent,
}

impl TimerKind {
    /// Timer name used in logs and metric labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            TimerKind::NoPeers => "no-peers",
            TimerKind::HostLeft => "host-left",
            TimerKind::HostAbsent => "host-absent",
        }
    }

    /// The leave trigger attributed to this timer when it wins.
    #[must_use]
    pub const fn trigger(&self) -> LeaveTrigger {
        match self {
            TimerKind::NoPeers => LeaveTrigger::NoPeers,
            TimerKind::HostLeft => LeaveTrigger::HostLeft,
            TimerKind::HostAbsent => LeaveTrigger::HostAbsent,
        }
    }
}

#[derive(Debug)]
struct PendingTimer {
    generation: u64,
    task: JoinHandle<()>,
}

#[derive(Debug)]
pub struct PendingTimers {
    mailbox: mpsc::WeakSender<CoordinatorMessage>,
    timers: HashMap<TimerKind, PendingTimer>,
    next_generation: u64,
}

impl PendingTimers {
    /// Timers post back through a weak sender so they never keep the mailbox open.
    #[must_use]
    pub fn new(mailbox: mpsc::WeakSender<CoordinatorMessage>) -> Self {
        Self {
            mailbox,
            timers: HashMap::new(),
            next_generation: 0,
        }
    }

    /// Arm `kind` to fire after `delay`.
    ///
    /// No-op (returns false) if a timer of this kind is already pending; the
    /// original deadline is kept.
    pub fn arm(&mut self, kind: TimerKind, delay: Duration) -> bool {
        if self.timers.contains_key(&kind) {
            return false;
        }

        self.next_generation += 1;
        let generation = self.next_generation;
        let mailbox = self.mailbox.clone();

        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(sender) = mailbox.upgrade() {
                let _ = sender
                    .send(CoordinatorMessage::TimerFired { kind, generation })
                    .await;
            }
        });

        self.timers.insert(kind, PendingTimer { generation, task });
        metrics::record_timer(kind.as_str(), "armed");

        debug!(
            target: "classroom.coordinator.timers",
            timer = kind.as_str(),
            generation = generation,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "Debounce timer armed"
        );
        true
    }

    /// Cancel `kind` if pending. Returns whether a timer was cancelled.
    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        match self.timers.remove(&kind) {
            Some(timer) => {
                timer.task.abort();
                metrics::record_timer(kind.as_str(), "cancelled");
                debug!(
                    target: "classroom.coordinator.timers",
                    timer = kind.as_str(),
                    generation = timer.generation,
                    "Debounce timer cancelled"
                );
                true
            }
            None => false,
        }
    }

    /// Cancel every pending timer. Returns how many were cancelled.
    pub fn cancel_all(&mut self) -> usize {
        let kinds: Vec<TimerKind> = self.timers.keys().copied().collect();
        kinds.into_iter().filter(|kind| self.cancel(*kind)).count()
    }

    /// Resolve a `TimerFired` message.
    ///
    /// Returns true, and removes the entry, only if `generation` matches the
    /// pending timer of that kind.
    pub fn take_fired(&mut self, kind: TimerKind, generation: u64) -> bool {
        let matches = self
            .timers
            .get(&kind)
            .is_some_and(|timer| timer.generation == generation);

        if matches {
            self.timers.remove(&kind);
            metrics::record_timer(kind.as_str(), "fired");
        } else {
            metrics::record_timer(kind.as_str(), "stale");
        }
        matches
    }

    #[must_use]
    pub fn is_pending(&self, kind: TimerKind) -> bool {
        self.timers.contains_key(&kind)
    }

    /// Pending timer kinds, sorted.
    #[must_use]
    pub fn pending(&self) -> Vec<TimerKind> {
        let mut kinds: Vec<TimerKind> = self.timers.keys().copied().collect();
        kinds.sort();
        kinds
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

impl Drop for PendingTimers {
    fn drop(&mut self) {
        for (_, timer) in self.timers.drain() {
            timer.task.abort();
        }
    }
}
