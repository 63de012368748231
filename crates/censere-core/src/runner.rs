//! Run loop with limits and operator stop.
//!
//! This module provides [`start_run`], which founds a colony and writes its
//! ledger row and sol-0 row, and [`run_simulation`], which drives the sol
//! cycle until either:
//!
//! - **Limit reached**: the current sol (for `sols`) or the living
//!   population (for `population`) reaches the limit count, checked before
//!   every advance, or
//! - **Operator stop**: the shared [`RunControl`] asks for a stop.
//!
//! Every sol's row is appended to the store before the next sol runs. A
//! failed append ends the run with [`RunnerError::SinkWrite`]; such a run
//! is not checkpointed.

use chrono::Utc;
use tracing::{info, warn};

use censere_colony::ColonyRules;
use censere_random::ColonyRng;
use censere_random::rng::{resolve_seed, seeded};
use censere_types::{LimitKind, SimulationId, SimulationRecord, SolSummary};

use crate::clock::SolClock;
use crate::config::{ConfigError, GeneratorConfig};
use crate::operator::{RunControl, SimulationEndReason};
use crate::sol::{self, ColonyState, SolError};
use crate::store::{RunStore, StoreError};

/// Errors that can occur during a run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A sol failed to execute.
    #[error("sol error: {source}")]
    Sol {
        /// The underlying sol error.
        #[from]
        source: SolError,
    },

    /// The time-series row for a sol could not be stored.
    #[error("failed to record sol {sol}: {source}")]
    SinkWrite {
        /// The sol whose row was lost.
        sol: i64,
        /// The underlying store error.
        source: StoreError,
    },

    /// The ledger row could not be written.
    #[error("ledger error: {source}")]
    Ledger {
        /// The underlying store error.
        #[from]
        source: StoreError,
    },

    /// The configuration could not be recorded.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },
}

/// One run: its ledger row, compiled rules, generator, and colony.
#[derive(Debug)]
pub struct ColonyRun {
    /// The Run Ledger row as last written.
    pub record: SimulationRecord,
    /// Compiled demographic rules.
    pub rules: ColonyRules,
    /// The run's single generator.
    pub rng: ColonyRng,
    /// Clock, population, and mission schedule.
    pub state: ColonyState,
}

impl ColonyRun {
    /// Build a fresh run from `config`: resolve the seed, found the colony,
    /// and fill in the ledger row. Returns the run and its sol-0 row.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] if the configuration cannot be encoded or
    /// the initial landing fails.
    pub fn begin(
        config: &GeneratorConfig,
        rules: ColonyRules,
    ) -> Result<(Self, SolSummary), RunnerError> {
        let simulation_id = SimulationId::new();
        let random_seed = resolve_seed(config.simulation.random_seed);
        let mut rng = seeded(random_seed);
        let initial_mission_lands = config.simulation.initial_mission_lands;

        let clock = SolClock::new(initial_mission_lands);
        let (state, first) = ColonyState::found(clock, &rules, simulation_id, &mut rng)?;

        let record = SimulationRecord {
            simulation_id,
            initial_mission_lands,
            begin_datetime: Utc::now(),
            end_datetime: None,
            limit: config.simulation.limit,
            limit_count: config.simulation.limit_count,
            mission_ends: None,
            final_soldays: None,
            final_population: None,
            args: config.to_args()?,
            notes: config.simulation.notes.clone(),
            random_seed,
            random_state: None,
        };

        Ok((
            Self {
                record,
                rules,
                rng,
                state,
            },
            first,
        ))
    }

    /// The run's identifier.
    pub const fn simulation_id(&self) -> SimulationId {
        self.record.simulation_id
    }

    /// The current sol.
    pub const fn sol(&self) -> i64 {
        self.state.clock.sol()
    }

    /// Whether the run's terminal condition holds.
    pub fn limit_reached(&self) -> bool {
        match self.record.limit {
            LimitKind::Sols => self.sol() >= self.record.limit_count,
            LimitKind::Population => {
                let living =
                    i64::try_from(self.state.population.living_count()).unwrap_or(i64::MAX);
                living >= self.record.limit_count
            }
        }
    }
}

/// Result of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationResult {
    /// The reason the run ended.
    pub end_reason: SimulationEndReason,
    /// Sols executed by this call.
    pub sols_run: u64,
    /// Last sol executed.
    pub final_sol: i64,
    /// Living colonists after the last sol.
    pub final_population: usize,
}

/// Found a new colony and persist its ledger row and sol-0 row.
///
/// # Errors
///
/// Returns [`RunnerError`] if founding fails or the store rejects the
/// ledger row ([`RunnerError::Ledger`]) or the sol-0 row
/// ([`RunnerError::SinkWrite`]).
pub async fn start_run<S: RunStore>(
    store: &S,
    config: &GeneratorConfig,
    rules: ColonyRules,
) -> Result<ColonyRun, RunnerError> {
    let (run, first) = ColonyRun::begin(config, rules)?;
    store.insert_simulation(&run.record).await?;
    store
        .append_summary(&first)
        .await
        .map_err(|source| RunnerError::SinkWrite { sol: 0, source })?;

    info!(
        simulation_id = %run.simulation_id(),
        random_seed = run.record.random_seed,
        limit = %run.record.limit,
        limit_count = run.record.limit_count,
        population = first.population,
        "Simulation started"
    );
    Ok(run)
}

/// Run the sol loop until the limit is reached or a stop is requested.
///
/// # Errors
///
/// Returns [`RunnerError`] if a sol fails or its row cannot be stored.
pub async fn run_simulation<S: RunStore>(
    run: &mut ColonyRun,
    store: &S,
    control: &RunControl,
) -> Result<SimulationResult, RunnerError> {
    let mut sols_run: u64 = 0;
    let simulation_id = run.simulation_id();

    loop {
        // --- Check limit (before advancing) ---
        if run.limit_reached() {
            info!(
                %simulation_id,
                sol = run.sol(),
                limit = %run.record.limit,
                limit_count = run.record.limit_count,
                "Limit reached"
            );
            return Ok(result(run, SimulationEndReason::LimitReached, sols_run));
        }

        // --- Check stop request ---
        if control.is_stop_requested() {
            info!(%simulation_id, sol = run.sol(), "Operator stop requested");
            return Ok(result(run, SimulationEndReason::OperatorStop, sols_run));
        }

        // --- Execute sol ---
        let summary = sol::run_sol(&mut run.state, &run.rules, simulation_id, &mut run.rng)?;
        store
            .append_summary(&summary)
            .await
            .map_err(|source| RunnerError::SinkWrite {
                sol: summary.sol,
                source,
            })?;
        sols_run = sols_run.saturating_add(1);

        // Let sibling runs and the signal handler make progress.
        tokio::task::yield_now().await;
    }
}

fn result(run: &ColonyRun, end_reason: SimulationEndReason, sols_run: u64) -> SimulationResult {
    SimulationResult {
        end_reason,
        sols_run,
        final_sol: run.sol(),
        final_population: run.state.population.living_count(),
    }
}

/// Log the end of a run.
pub fn log_simulation_end(
    simulation_id: SimulationId,
    result: &SimulationResult,
    control: &RunControl,
) {
    info!(
        %simulation_id,
        reason = ?result.end_reason,
        sols_run = result.sols_run,
        final_sol = result.final_sol,
        final_population = result.final_population,
        elapsed_seconds = control.elapsed_seconds(),
        "Simulation ended"
    );
    if result.sols_run == 0 {
        warn!(%simulation_id, "Simulation ended with no sols executed");
    }
}
