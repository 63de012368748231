//! Sol clock and earth-time mapping for the Censere simulation.
//!
//! The clock is the single source of truth for simulated time. Sol 0 is
//! the landing of the initial mission; every later sol is one Martian
//! solar day (88 775.244 earth seconds) after the previous one.
//!
//! # Design Principles
//!
//! - The sol counter only moves forward, one sol per [`SolClock::advance`].
//! - Earth timestamps are derived from the sol counter, never stored.
//! - All derivations use checked arithmetic (no silent overflow).

use chrono::{DateTime, TimeDelta, Utc};

/// Length of one sol in earth milliseconds.
pub const SOL_MILLIS: i64 = 88_775_244;

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Sol counter would overflow.
    #[error("sol counter overflow: cannot advance beyond i64::MAX")]
    SolOverflow,

    /// The earth timestamp for a sol is outside the representable range.
    #[error("earth time for sol {sol} is out of range")]
    TimeOutOfRange {
        /// The sol that could not be mapped.
        sol: i64,
    },

    /// The clock was restored to a negative sol.
    #[error("invalid sol {sol}: the clock starts at 0")]
    NegativeSol {
        /// The rejected sol.
        sol: i64,
    },
}

/// Simulated time for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolClock {
    /// Current sol number (0 = initial mission landing).
    sol: i64,

    /// Earth timestamp of sol 0.
    initial_mission_lands: DateTime<Utc>,
}

impl SolClock {
    /// Create a clock at sol 0.
    pub const fn new(initial_mission_lands: DateTime<Utc>) -> Self {
        Self {
            sol: 0,
            initial_mission_lands,
        }
    }

    /// Create a clock at an arbitrary sol (state restoration).
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::NegativeSol`] if `sol` is below 0.
    pub const fn from_parts(
        sol: i64,
        initial_mission_lands: DateTime<Utc>,
    ) -> Result<Self, ClockError> {
        if sol < 0 {
            return Err(ClockError::NegativeSol { sol });
        }
        Ok(Self {
            sol,
            initial_mission_lands,
        })
    }

    /// Advance the clock by one sol. Returns the new sol number.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::SolOverflow`] if the counter would exceed
    /// `i64::MAX`.
    pub fn advance(&mut self) -> Result<i64, ClockError> {
        self.sol = self.sol.checked_add(1).ok_or(ClockError::SolOverflow)?;
        Ok(self.sol)
    }

    /// Return the current sol number.
    pub const fn sol(&self) -> i64 {
        self.sol
    }

    /// Return the earth timestamp of sol 0.
    pub const fn initial_mission_lands(&self) -> DateTime<Utc> {
        self.initial_mission_lands
    }

    /// Earth timestamp of the current sol.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::TimeOutOfRange`] if the timestamp cannot be
    /// represented.
    pub fn earth_datetime(&self) -> Result<DateTime<Utc>, ClockError> {
        earth_datetime_of(self.initial_mission_lands, self.sol)
    }
}

/// Earth timestamp of `sol` for a run whose sol 0 is `initial_mission_lands`.
///
/// # Errors
///
/// Returns [`ClockError::TimeOutOfRange`] if the timestamp cannot be
/// represented.
pub fn earth_datetime_of(
    initial_mission_lands: DateTime<Utc>,
    sol: i64,
) -> Result<DateTime<Utc>, ClockError> {
    sol.checked_mul(SOL_MILLIS)
        .and_then(TimeDelta::try_milliseconds)
        .and_then(|offset| initial_mission_lands.checked_add_signed(offset))
        .ok_or(ClockError::TimeOutOfRange { sol })
}
