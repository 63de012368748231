//! Stochastic building blocks for the Censere colony simulation.
//!
//! Configuration describes every random quantity as a distribution spec
//! string. This crate parses those strings, samples them, draws lifespans
//! from an actuarial life table, and owns the seeded generator whose state
//! is checkpointed with a run.
//!
//! # Modules
//!
//! - [`distribution`] -- The spec language ([`DistributionSpec`]) and compiled [`Sampler`]
//! - [`life_table`] -- [`LifeTable`] lookups and [`LifeExpectancy`] draws
//! - [`earth`] -- Fixed earth-year to sol conversion
//! - [`rng`] -- Seeded [`ColonyRng`] with capturable state
//! - [`error`] -- Error types

pub mod distribution;
pub mod earth;
pub mod error;
pub mod life_table;
pub mod rng;

pub use distribution::{DistributionSpec, Sampler};
pub use earth::{sols_to_years, years_to_sols};
pub use error::{LifeTableError, RngStateError, SpecError};
pub use life_table::{LifeExpectancy, LifeTable, LifeTableRow};
pub use rng::ColonyRng;
