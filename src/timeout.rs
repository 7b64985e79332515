//! Single-shot, restartable retransmit countdown.
//!
//! Reliable delivery requires that an unacknowledged packet is re-sent when
//! no ACK arrives within a bounded time.  [`Timeout`] tracks one logical
//! countdown per sender as a monotonic deadline — there is no timer thread
//! and no busy-waiting.  The event loop arms a `tokio::time::sleep_until` on
//! [`Timeout::deadline`] and reports wakeups through [`Timeout::poll`].
//!
//! # Lifecycle
//!
//! ```text
//!   Idle ──start──▶ Running ──poll past deadline──▶ Expired
//!                      │                               │
//!                   cancel                           start
//!                      ▼                               │
//!                  Cancelled ──────────start───────────┘
//! ```
//!
//! `start` from any state re-arms the countdown; when one is already running
//! it is cancelled first — at most one logical timer exists at any instant.

use std::time::{Duration, Instant};

/// Observable phase of the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// Never started, or re-armed after a previous cycle.
    Idle,
    /// Counting down toward the deadline.
    Running,
    /// The deadline passed without an intervening cancel.
    Expired,
    /// Stopped explicitly before the deadline.
    Cancelled,
}

/// A deadline-based countdown for one sender.
#[derive(Debug)]
pub struct Timeout {
    state: TimerState,
    deadline: Option<Instant>,
}

impl Default for Timeout {
    fn default() -> Self {
        Self::new()
    }
}

impl Timeout {
    /// Construct an idle countdown.
    pub fn new() -> Self {
        Self {
            state: TimerState::Idle,
            deadline: None,
        }
    }

    /// Arm the countdown for `duration` from now.
    ///
    /// Restart semantics: a running countdown is cancelled and replaced;
    /// timers never stack.
    pub fn start(&mut self, duration: Duration) {
        self.state = TimerState::Running;
        self.deadline = Some(Instant::now() + duration);
    }

    /// Stop a running countdown before it expires.
    ///
    /// Idempotent: cancelling an idle or already-stopped countdown changes
    /// nothing.
    pub fn cancel(&mut self) {
        if self.state == TimerState::Running {
            self.state = TimerState::Cancelled;
            self.deadline = None;
        }
    }

    /// Observe the passage of time.
    ///
    /// Returns `true` exactly once per armed countdown, on the first call at
    /// or after the deadline.
    pub fn poll(&mut self, now: Instant) -> bool {
        match (self.state, self.deadline) {
            (TimerState::Running, Some(deadline)) if now >= deadline => {
                self.state = TimerState::Expired;
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// `true` only after natural expiry without an intervening [`cancel`](Self::cancel).
    pub fn has_expired(&self) -> bool {
        self.state == TimerState::Expired
    }

    /// `true` while armed and unexpired.
    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    /// Current phase, for logging and assertions.
    pub fn state(&self) -> TimerState {
        self.state
    }

    /// The instant the countdown will expire, while running.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}
