//! Shared type definitions for the Censere colony simulation.
//!
//! This crate is the single source of truth for the records shared across
//! the Censere workspace. Types flow downstream to `TypeScript` via `ts-rs`
//! for anything that reads the time series or ledger.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for all entity identifiers
//! - [`enums`] -- Colonist attributes, relationship kinds, run limits
//! - [`structs`] -- Colonists, relationships, ledger and time-series rows

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{
    LimitKind, Orientation, Origin, ParseEnumError, RelationshipEnd, RelationshipKind, Sex,
};
pub use ids::{ColonistId, RelationshipId, SimulationId};
pub use structs::{Colonist, ColonySnapshot, Relationship, SimulationRecord, SolSummary};
