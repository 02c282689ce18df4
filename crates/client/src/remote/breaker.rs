//! Circuit breaker for the remote origin.
//!
//! After a network timeout the breaker opens for a fixed retry interval.
//! While open, requests fail fast without touching the network. The first
//! request after the interval closes the breaker and goes through.

use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerStatus {
    Normal,
    TimedOut,
}

#[derive(Debug)]
struct BreakerState {
    status: BreakerStatus,
    last_error: Option<Instant>,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    state: Mutex<BreakerState>,
    retry_interval: Duration,
}

impl CircuitBreaker {
    pub fn new(retry_interval: Duration) -> Self {
        Self { state: Mutex::new(BreakerState { status: BreakerStatus::Normal, last_error: None }), retry_interval }
    }

    pub fn status(&self) -> BreakerStatus {
        self.lock().status
    }

    /// Whether a request may be sent now. Resets the breaker once the retry
    /// interval has elapsed.
    pub fn allow_request(&self) -> bool {
        let mut state = self.lock();
        if state.status == BreakerStatus::TimedOut
            && let Some(last_error) = state.last_error
            && last_error.elapsed() < self.retry_interval
        {
            return false;
        }
        state.status = BreakerStatus::Normal;
        true
    }

    /// Record a network timeout.
    pub fn trip(&self) {
        let mut state = self.lock();
        state.status = BreakerStatus::TimedOut;
        state.last_error = Some(Instant::now());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
