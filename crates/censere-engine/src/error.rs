//! Error types for the generator binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during startup and run execution.

/// Top-level error for the generator binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: censere_core::config::ConfigError,
    },

    /// Database connection or migration failed.
    #[error("database error: {source}")]
    Database {
        /// The underlying database error.
        #[from]
        source: censere_db::DbError,
    },

    /// A run failed mid-loop.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: censere_core::runner::RunnerError,
    },

    /// A checkpoint could not be written.
    #[error("checkpoint error: {source}")]
    Checkpoint {
        /// The underlying checkpoint error.
        #[from]
        source: censere_core::checkpoint::CheckpointError,
    },

    /// A run could not be resumed.
    #[error("resume error: {source}")]
    Resume {
        /// The underlying resume error.
        #[from]
        source: censere_core::checkpoint::ResumeError,
    },

    /// `continue_simulation` is not a simulation ID.
    #[error("invalid simulation id {value:?}: {source}")]
    InvalidSimulationId {
        /// The configured text.
        value: String,
        /// The underlying parse error.
        source: uuid::Error,
    },

    /// A run task panicked or was cancelled.
    #[error("run task failed: {source}")]
    Join {
        /// The underlying join error.
        #[from]
        source: tokio::task::JoinError,
    },
}
