//! Error types for the data layer.
//!
//! All errors are propagated via [`DbError`] which wraps the underlying
//! [`sqlx`] errors with additional context about which operation failed.

use censere_types::{ParseEnumError, SimulationId};

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A ledger row with this ID already exists.
    #[error("simulation {0} already exists")]
    DuplicateSimulation(SimulationId),

    /// No ledger row has this ID.
    #[error("simulation {0} not found")]
    UnknownSimulation(SimulationId),

    /// A stored enum column holds text no variant maps to.
    #[error("column {column}: {source}")]
    Decode {
        /// The column being read.
        column: &'static str,
        /// The underlying parse error.
        source: ParseEnumError,
    },

    /// A stored count does not fit its in-memory type.
    #[error("column {column} value {value} is out of range")]
    OutOfRange {
        /// The column being read.
        column: &'static str,
        /// The stored value.
        value: i64,
    },

    /// A snapshot row's position does not fit the `ordinal` column.
    #[error("snapshot row {index} does not fit a BIGINT ordinal")]
    OrdinalOverflow {
        /// The row's position in the snapshot.
        index: usize,
    },

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Narrow a stored `BIGINT` count back to `u32`.
pub(crate) fn count(column: &'static str, value: i64) -> Result<u32, DbError> {
    u32::try_from(value).or(Err(DbError::OutOfRange { column, value }))
}

/// Parse a stored enum column.
pub(crate) fn parse<T>(column: &'static str, value: &str) -> Result<T, DbError>
where
    T: core::str::FromStr<Err = ParseEnumError>,
{
    value
        .parse()
        .map_err(|source| DbError::Decode { column, source })
}
