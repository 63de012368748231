//! Sol clock, sol cycle, and run orchestration for the Censere simulation.
//!
//! This crate owns the phase loop that drives a colony one sol at a time:
//! Arrivals, Pairing, Births, Deaths, Dissolution, and Record. Around it sit
//! the configuration layer, the run loop with its limits, and the
//! checkpoint/resume contract.
//!
//! # Modules
//!
//! - [`checkpoint`] -- Snapshot and ledger writes; [`resume`] of a
//!   checkpointed run.
//! - [`clock`] -- Sol counter and sol-to-Earth time conversion.
//! - [`config`] -- Configuration loading from `censere-config.yaml` with
//!   environment overrides, compiled into [`ColonyRules`].
//! - [`operator`] -- Shared stop flag for clean shutdown.
//! - [`runner`] -- Run start, the limit-bounded loop, and end logging.
//! - [`sol`] -- The per-sol phase cycle.
//! - [`store`] -- [`RunStore`] trait and the in-memory [`MemoryStore`].
//!
//! [`ColonyRules`]: censere_colony::ColonyRules

pub mod checkpoint;
pub mod clock;
pub mod config;
pub mod operator;
pub mod runner;
pub mod sol;
pub mod store;

pub use checkpoint::{CheckpointError, Continuation, ResumeError, checkpoint, resume};
pub use clock::{ClockError, SolClock};
pub use config::{ConfigError, GeneratorConfig};
pub use operator::{RunControl, SimulationEndReason};
pub use runner::{
    ColonyRun, RunnerError, SimulationResult, log_simulation_end, run_simulation, start_run,
};
pub use sol::{ColonyState, SolError, run_sol};
pub use store::{MemoryStore, MergeError, MergeReport, RunStore, StoreError};
