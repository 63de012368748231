//! Operator control state for running simulations.
//!
//! A single [`RunControl`] is shared (behind an [`Arc`]) between every run
//! in the process and the Ctrl-C handler. The run loop only reads it
//! between sols, so a stop never interrupts a sol half-way.
//!
//! [`Arc`]: std::sync::Arc

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reason why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulationEndReason {
    /// The configured sol or population limit was reached.
    LimitReached,
    /// An operator requested a stop. The run is checkpointed and can be
    /// continued.
    OperatorStop,
}

/// Shared stop flag.
#[derive(Debug)]
pub struct RunControl {
    /// Whether a stop has been requested.
    stop_requested: AtomicBool,

    /// Wall-clock time the process started running simulations.
    started_at: DateTime<Utc>,
}

impl RunControl {
    /// Create a control with no stop requested.
    pub fn new() -> Self {
        Self {
            stop_requested: AtomicBool::new(false),
            started_at: Utc::now(),
        }
    }

    /// Request a clean stop of every run sharing this control.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
    }

    /// Check whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Return the wall-clock start time.
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Return elapsed seconds since start.
    pub fn elapsed_seconds(&self) -> u64 {
        let elapsed = Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds();
        u64::try_from(elapsed.max(0)).unwrap_or(u64::MAX)
    }
}

impl Default for RunControl {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_is_running() {
        let control = RunControl::new();
        assert!(!control.is_stop_requested());
        assert!(control.started_at() <= Utc::now());
    }

    #[test]
    fn stop_request() {
        let control = RunControl::new();
        control.request_stop();
        assert!(control.is_stop_requested());
        // Idempotent.
        control.request_stop();
        assert!(control.is_stop_requested());
    }
}
