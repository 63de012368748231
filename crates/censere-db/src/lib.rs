//! `PostgreSQL` persistence for the Censere colony simulation.
//!
//! ```text
//! Run start ------> SimulationStore (simulations: Run Ledger)
//! Every sol ------> SummaryStore    (summary: append-only time series)
//! Checkpoint -----> ColonyStore     (colony_snapshots, colonists, relationships)
//!              +--> SimulationStore (final counts, random state)
//! ```
//!
//! # Modules
//!
//! - [`postgres`] -- `PostgreSQL` connection pool and configuration
//! - [`simulation_store`] -- Run Ledger rows
//! - [`summary_store`] -- Per-sol time-series rows
//! - [`colony_store`] -- Latest population snapshot of each run
//! - [`merge`] -- Copying runs between databases
//! - [`error`] -- Shared error types

pub mod colony_store;
pub mod error;
pub mod merge;
pub mod postgres;
pub mod simulation_store;
pub mod summary_store;

/// Rows per multi-row `UNNEST` insert.
pub(crate) const BATCH_SIZE: usize = 1_000;

// Re-export primary types for convenience.
pub use colony_store::{ColonistRow, ColonyStore, RelationshipRow};
pub use error::DbError;
pub use merge::{MergeCounts, merge_database, merge_databases};
pub use postgres::{PostgresConfig, PostgresPool};
pub use simulation_store::{SimulationRow, SimulationStore};
pub use summary_store::{SummaryRow, SummaryStore};
