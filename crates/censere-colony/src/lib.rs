//! Colonist population and demographic phases for the Censere simulation.
//!
//! This crate holds every rule that changes who is in the colony: landings,
//! pairing, births, deaths, and relationship dissolution. It does no I/O.
//! It sits between `censere-types` (data structures) and `censere-core`
//! (the sol loop and checkpointing).
//!
//! # Modules
//!
//! - [`arrivals`] -- Mission landings ([`land_mission`])
//! - [`death`] -- Planned deaths and relationship expiry
//! - [`error`] -- Error types ([`ColonyError`])
//! - [`family`] -- Parent/child lineage and common-ancestor checks ([`Lineage`])
//! - [`pairing`] -- Pair constraints and relationship formation
//! - [`population`] -- The insertion-ordered colonist arena ([`Population`])
//! - [`reproduction`] -- Fertility and births
//! - [`rules`] -- Compiled demographic parameters ([`ColonyRules`])

pub mod arrivals;
pub mod death;
pub mod error;
pub mod family;
pub mod pairing;
pub mod population;
pub mod reproduction;
pub mod rules;

// Re-export primary types at crate root for convenience.
pub use arrivals::{LandingReport, MissionKind, land_mission};
pub use death::{DeathReport, run_deaths, run_dissolution};
pub use error::ColonyError;
pub use family::Lineage;
pub use pairing::{ConstraintViolation, check_pair, run_pairing};
pub use population::{Census, Population};
pub use reproduction::{is_fertile, run_births};
pub use rules::{ColonyRules, GenderRatio, OrientationRatio, RatioError};
