//! Generator binary for the Censere colony simulation.
//!
//! Loads configuration, connects to `PostgreSQL`, and either starts
//! `parallel_runs` fresh simulations or continues one checkpointed
//! simulation. Every run writes its Run Ledger row, one time-series row per
//! sol, and a checkpoint when it ends.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `censere-config.yaml` (or `CENSERE_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Dump the resolved configuration and exit, if asked
//! 4. Compile the configuration into colony rules
//! 5. Connect to `PostgreSQL` and run migrations
//! 6. Install the Ctrl-C handler
//! 7. Start or continue runs, each as its own task
//! 8. Checkpoint each run and log the result

mod error;
mod pg_store;

use std::path::PathBuf;
use std::sync::Arc;

use censere_colony::ColonyRules;
use censere_core::checkpoint::{self, Continuation};
use censere_core::config::{CONFIG_PATH_ENV, DEFAULT_CONFIG_FILE, GeneratorConfig};
use censere_core::operator::{RunControl, SimulationEndReason};
use censere_core::runner::{self, ColonyRun, SimulationResult};
use censere_db::{PostgresConfig, PostgresPool};
use censere_types::SimulationId;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::pg_store::PgRunStore;

/// Application entry point for the generator.
///
/// # Errors
///
/// Returns an error if configuration, the database, or any run fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration (before logging, so it can set the level).
    let config = load_config()?;

    // 2. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.logging.directive())),
        )
        .with_target(true)
        .init();

    info!("censere-generator starting");

    // 3. Dump and exit.
    if config.simulation.dump {
        print!("{}", config.to_yaml()?);
        return Ok(());
    }

    // 4. Compile rules. Any bad option stops here, before any run starts.
    let rules = config.compile()?;
    info!(
        limit = %config.simulation.limit,
        limit_count = config.simulation.limit_count,
        random_seed = config.simulation.random_seed,
        parallel_runs = config.simulation.parallel_runs,
        use_ivf = config.relationships.use_ivf,
        "Configuration loaded"
    );

    // 5. Connect to PostgreSQL.
    let pg = PostgresPool::connect(
        &PostgresConfig::new(&config.infrastructure.database_url)
            .with_max_connections(config.infrastructure.max_connections),
    )
    .await
    .map_err(EngineError::from)?;
    pg.run_migrations().await.map_err(EngineError::from)?;
    let store = Arc::new(PgRunStore::new(pg.clone()));

    // 6. Ctrl-C requests a clean stop between sols.
    let control = Arc::new(RunControl::new());
    {
        let control = Arc::clone(&control);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, stopping after the current sol");
                control.request_stop();
            }
        });
    }

    // 7. Run.
    let outcome = if config.simulation.continue_simulation.is_empty() {
        run_fresh(&config, &rules, &store, &control).await
    } else {
        run_continuation(&config, &store, &control).await
    };

    pg.close().await;
    outcome?;
    info!("censere-generator shutdown complete");
    Ok(())
}

/// Load the configuration from `CENSERE_CONFIG` or `censere-config.yaml`.
///
/// A missing file means defaults plus environment overrides.
fn load_config() -> Result<GeneratorConfig, EngineError> {
    let path = std::env::var_os(CONFIG_PATH_ENV)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from);
    if path.exists() {
        Ok(GeneratorConfig::from_file(&path)?)
    } else {
        Ok(GeneratorConfig::parse("")?)
    }
}

/// Start `parallel_runs` independent simulations and wait for all of them.
///
/// Every run is waited for even if one fails; the first failure is
/// returned.
async fn run_fresh(
    config: &GeneratorConfig,
    rules: &ColonyRules,
    store: &Arc<PgRunStore>,
    control: &Arc<RunControl>,
) -> Result<(), EngineError> {
    let mut runs = JoinSet::new();
    for _ in 0..config.simulation.parallel_runs {
        let config = config.clone();
        let rules = rules.clone();
        let store = Arc::clone(store);
        let control = Arc::clone(control);
        runs.spawn(async move {
            let run = runner::start_run(store.as_ref(), &config, rules).await?;
            drive(store.as_ref(), run, &control).await
        });
    }

    let mut first_error = None;
    while let Some(joined) = runs.join_next().await {
        let outcome = joined.map_err(EngineError::from).and_then(|result| result);
        if let Err(err) = outcome {
            error!(error = %err, "Simulation failed");
            first_error.get_or_insert(err);
        }
    }
    first_error.map_or(Ok(()), Err)
}

/// Continue one checkpointed simulation to the configured limit.
async fn run_continuation(
    config: &GeneratorConfig,
    store: &Arc<PgRunStore>,
    control: &Arc<RunControl>,
) -> Result<(), EngineError> {
    let value = config.simulation.continue_simulation.trim();
    let simulation_id = value
        .parse::<uuid::Uuid>()
        .map(SimulationId::from)
        .map_err(|source| EngineError::InvalidSimulationId {
            value: value.to_owned(),
            source,
        })?;

    let continuation = Continuation {
        limit: config.simulation.limit,
        limit_count: config.simulation.limit_count,
    };
    let run = checkpoint::resume(store.as_ref(), simulation_id, Some(continuation)).await?;
    drive(store.as_ref(), run, control).await?;
    Ok(())
}

/// Run the loop, checkpoint, and log the result.
///
/// A run that reached its limit is marked ended; a stopped run stays
/// resumable.
async fn drive(
    store: &PgRunStore,
    mut run: ColonyRun,
    control: &RunControl,
) -> Result<SimulationResult, EngineError> {
    let result = runner::run_simulation(&mut run, store, control).await?;
    let ended = result.end_reason == SimulationEndReason::LimitReached;
    checkpoint::checkpoint(store, &mut run, ended).await?;
    runner::log_simulation_end(run.simulation_id(), &result, control);
    Ok(result)
}
