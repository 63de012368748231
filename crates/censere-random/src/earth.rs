//! Earth-year to sol conversion.
//!
//! The factor is fixed so that ages and lifespans from different runs are
//! directly comparable. It must not be changed.

/// Earth days per earth year.
const DAYS_PER_YEAR: f64 = 365.25;

/// Ratio between the two day lengths used throughout the simulation.
const DAY_RATIO: f64 = 1.027_491_25;

/// Map earth years to a whole number of sols, truncating.
#[allow(clippy::cast_possible_truncation)]
pub fn years_to_sols(years: f64) -> i64 {
    // `as` truncates toward zero and saturates at the i64 bounds.
    (years * DAYS_PER_YEAR * DAY_RATIO) as i64
}

/// Map a sol count back to fractional earth years.
pub fn sols_to_years(sols: i64) -> f64 {
    sols_as_f64(sols) / (DAYS_PER_YEAR * DAY_RATIO)
}

#[allow(clippy::cast_precision_loss)]
const fn sols_as_f64(sols: i64) -> f64 {
    // Sol counts stay far below 2^53, so the conversion is exact.
    sols as f64
}
