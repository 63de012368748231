//! Checkpoint and resume.
//!
//! A checkpoint writes the full colony (every colonist and relationship,
//! plus the mission schedule) as a [`ColonySnapshot`], then updates the
//! ledger row with the final counts and the captured generator state. The
//! generator state, not just the seed, is what lets [`resume`] continue the
//! exact random stream: the number of draws already consumed matters.

use chrono::Utc;
use tracing::info;

use censere_colony::{ColonyError, Population};
use censere_random::RngStateError;
use censere_random::rng::{capture, restore};
use censere_types::{ColonySnapshot, LimitKind, SimulationId};

use crate::clock::{ClockError, SolClock};
use crate::config::{ConfigError, GeneratorConfig};
use crate::runner::ColonyRun;
use crate::sol::ColonyState;
use crate::store::{RunStore, StoreError};

/// Errors raised while writing a checkpoint.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    /// The generator state could not be captured.
    #[error("failed to capture random state: {source}")]
    RandomState {
        /// The underlying encoding error.
        #[from]
        source: RngStateError,
    },

    /// The current sol has no earth timestamp.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// The store rejected the snapshot or ledger update.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: StoreError,
    },
}

/// Errors raised while resuming a run. A failed resume never starts the
/// loop.
#[derive(Debug, thiserror::Error)]
pub enum ResumeError {
    /// No ledger row has this ID.
    #[error("simulation {simulation_id} not found")]
    NotFound {
        /// The requested run.
        simulation_id: SimulationId,
    },

    /// The run was never checkpointed.
    #[error("simulation {simulation_id} has no persisted random state")]
    NoRandomState {
        /// The requested run.
        simulation_id: SimulationId,
    },

    /// The ledger row has random state but no colony snapshot.
    #[error("simulation {simulation_id} has no colony snapshot")]
    NoSnapshot {
        /// The requested run.
        simulation_id: SimulationId,
    },

    /// The run reached its limit and no new limit was given.
    #[error("simulation {simulation_id} already ended; give a new limit to continue it")]
    AlreadyEnded {
        /// The requested run.
        simulation_id: SimulationId,
    },

    /// The stored configuration no longer parses or validates.
    #[error("stored configuration of {simulation_id} is unusable: {source}")]
    IncompatibleConfig {
        /// The requested run.
        simulation_id: SimulationId,
        /// The underlying config error.
        source: Box<ConfigError>,
    },

    /// The stored random state does not decode.
    #[error("stored random state of {simulation_id} is corrupt: {source}")]
    CorruptState {
        /// The requested run.
        simulation_id: SimulationId,
        /// The underlying decoding error.
        source: RngStateError,
    },

    /// The stored snapshot is internally inconsistent.
    #[error("stored snapshot of {simulation_id} is corrupt: {source}")]
    CorruptSnapshot {
        /// The requested run.
        simulation_id: SimulationId,
        /// The underlying colony error.
        source: ColonyError,
    },

    /// The snapshot sol cannot be placed on the clock.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// Reading or writing the store failed.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: StoreError,
    },
}

/// A new terminal condition for a resumed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Continuation {
    /// Kind of limit.
    pub limit: LimitKind,
    /// Limit count.
    pub limit_count: i64,
}

/// Persist the run's snapshot and update its ledger row.
///
/// `ended` marks the run as having reached its limit; an operator stop
/// checkpoints with `ended = false` so the run stays resumable without a
/// continuation.
///
/// # Errors
///
/// Returns [`CheckpointError`] if the state cannot be captured or stored.
pub async fn checkpoint<S: RunStore>(
    store: &S,
    run: &mut ColonyRun,
    ended: bool,
) -> Result<(), CheckpointError> {
    let state = &run.state;
    let snapshot = ColonySnapshot {
        simulation_id: run.record.simulation_id,
        sol: state.clock.sol(),
        next_mission_sol: state.next_mission_sol,
        colonists: state.population.colonists().to_vec(),
        relationships: state.population.relationships().to_vec(),
    };
    store.save_snapshot(&snapshot).await?;

    let living = i64::try_from(state.population.living_count()).unwrap_or(i64::MAX);
    run.record.final_soldays = Some(snapshot.sol);
    run.record.final_population = Some(living);
    run.record.mission_ends = Some(state.clock.earth_datetime()?);
    run.record.random_state = Some(capture(&run.rng)?);
    run.record.end_datetime = ended.then(Utc::now);
    store.update_simulation(&run.record).await?;

    info!(
        simulation_id = %run.record.simulation_id,
        sol = snapshot.sol,
        population = living,
        ended,
        "Checkpoint written"
    );
    Ok(())
}

/// Rebuild a checkpointed run so its loop can continue.
///
/// With a `continuation`, the ledger row's limit is replaced. Either way
/// `end_datetime` is cleared and the updated row is written back.
///
/// # Errors
///
/// Returns [`ResumeError`] if the run is missing, was never checkpointed,
/// already ended without a continuation, or its stored state is unusable.
pub async fn resume<S: RunStore>(
    store: &S,
    simulation_id: SimulationId,
    continuation: Option<Continuation>,
) -> Result<ColonyRun, ResumeError> {
    let mut record = store
        .load_simulation(simulation_id)
        .await?
        .ok_or(ResumeError::NotFound { simulation_id })?;

    let random_state = record
        .random_state
        .as_deref()
        .ok_or(ResumeError::NoRandomState { simulation_id })?;
    if record.end_datetime.is_some() && continuation.is_none() {
        return Err(ResumeError::AlreadyEnded { simulation_id });
    }

    let incompatible = |source: ConfigError| ResumeError::IncompatibleConfig {
        simulation_id,
        source: Box::new(source),
    };
    let rules = GeneratorConfig::from_args(&record.args)
        .and_then(|config| config.compile())
        .map_err(incompatible)?;
    let rng = restore(random_state).map_err(|source| ResumeError::CorruptState {
        simulation_id,
        source,
    })?;

    let snapshot = store
        .load_snapshot(simulation_id)
        .await?
        .ok_or(ResumeError::NoSnapshot { simulation_id })?;
    let population = Population::from_parts(snapshot.colonists, snapshot.relationships)
        .map_err(|source| ResumeError::CorruptSnapshot {
            simulation_id,
            source,
        })?;
    let state = ColonyState {
        clock: SolClock::from_parts(snapshot.sol, record.initial_mission_lands)?,
        population,
        next_mission_sol: snapshot.next_mission_sol,
    };

    if let Some(next) = continuation {
        record.limit = next.limit;
        record.limit_count = next.limit_count;
    }
    record.end_datetime = None;
    store.update_simulation(&record).await?;

    info!(
        %simulation_id,
        sol = snapshot.sol,
        limit = %record.limit,
        limit_count = record.limit_count,
        "Simulation resumed"
    );
    Ok(ColonyRun {
        record,
        rules,
        rng,
        state,
    })
}
