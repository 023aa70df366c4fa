use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

/// Shared flag used to abort a running countdown from the outside.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CountdownStatus {
    // `announce` is set whenever the whole number of seconds left changes
    Running { announce: Option<u64> },
    Elapsed,
    Cancelled,
}

/// Pre-race countdown, advanced by the simulation loop.
#[derive(Debug)]
pub struct Countdown {
    remaining: Duration,
    last_announced: Option<u64>,
    token: CancelToken,
}

impl Countdown {
    pub fn new(duration: Duration, token: CancelToken) -> Self {
        Self {
            remaining: duration,
            last_announced: None,
            token,
        }
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    pub fn advance(&mut self, dt: Duration) -> CountdownStatus {
        if self.token.is_cancelled() {
            return CountdownStatus::Cancelled;
        }

        self.remaining = self.remaining.saturating_sub(dt);
        if self.remaining.is_zero() {
            return CountdownStatus::Elapsed;
        }

        let seconds_left = whole_seconds_left(self.remaining);
        if self.last_announced == Some(seconds_left) {
            CountdownStatus::Running { announce: None }
        } else {
            self.last_announced = Some(seconds_left);
            CountdownStatus::Running {
                announce: Some(seconds_left),
            }
        }
    }
}

// 2.3s left reads as "3"
fn whole_seconds_left(remaining: Duration) -> u64 {
    let secs = remaining.as_secs();
    if remaining.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

/// Networked races need at least `network_minimum` of countdown so every
/// peer hears about the start before controls go live.
pub fn effective_countdown(
    requested: Duration,
    networked: bool,
    network_minimum: Duration,
) -> Duration {
    if networked && requested < network_minimum {
        warn!(
            requested_ms = requested.as_millis() as u64,
            minimum_ms = network_minimum.as_millis() as u64,
            "countdown too short for a networked race, raising it to the minimum"
        );
        network_minimum
    } else {
        requested
    }
}
