//! Error types for the censere-random crate.
//!
//! Every error that can come out of a distribution spec is raised while
//! parsing. Sampling a compiled [`Sampler`](crate::Sampler) never fails.

use censere_types::Sex;

/// A malformed distribution spec string.
///
/// Every variant carries the spec verbatim so the caller can name it in a
/// configuration error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpecError {
    /// The spec has no `:` between kind and arguments.
    #[error("distribution {spec:?} is missing the ':' separator")]
    MissingSeparator {
        /// The offending spec.
        spec: String,
    },

    /// The spec contains whitespace.
    #[error("distribution {spec:?} must not contain whitespace")]
    Whitespace {
        /// The offending spec.
        spec: String,
    },

    /// The kind before `:` is not one of `randint`, `randrange`, `triangle`, `cdc`.
    #[error("distribution {spec:?} has unknown kind {kind:?}")]
    UnknownKind {
        /// The offending spec.
        spec: String,
        /// The unrecognized kind.
        kind: String,
    },

    /// Wrong number of arguments for the kind.
    #[error("distribution {spec:?} expects {expected} argument(s) for {kind}, found {found}")]
    ArgumentCount {
        /// The offending spec.
        spec: String,
        /// The distribution kind.
        kind: &'static str,
        /// Number of arguments the kind takes.
        expected: usize,
        /// Number of arguments supplied.
        found: usize,
    },

    /// An argument is not a finite number of the expected type.
    #[error("distribution {spec:?} has non-numeric argument {token:?}")]
    NotANumber {
        /// The offending spec.
        spec: String,
        /// The argument that failed to parse.
        token: String,
    },

    /// `triangle:low,mode,high` with `low <= mode <= high` violated.
    #[error("distribution {spec:?} requires low <= mode <= high")]
    TriangleOrder {
        /// The offending spec.
        spec: String,
    },

    /// `randint` with `low > high` or `randrange` with `low >= high`.
    #[error("distribution {spec:?} describes an empty range")]
    EmptyRange {
        /// The offending spec.
        spec: String,
    },

    /// `cdc:` used where only a numeric sampler is accepted.
    #[error("distribution {spec:?} is only valid for life expectancy options")]
    NotSamplable {
        /// The offending spec.
        spec: String,
    },
}

/// Errors raised while loading or querying a life table.
#[derive(Debug, thiserror::Error)]
pub enum LifeTableError {
    /// The table file could not be read.
    #[error("failed to read life table: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The table is not valid YAML for the expected shape.
    #[error("failed to parse life table YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        #[from]
        source: serde_yml::Error,
    },

    /// The table content is unusable.
    #[error("invalid life table: {reason}")]
    Invalid {
        /// What is wrong with the table.
        reason: String,
    },

    /// The requested age is outside the rows the table covers.
    #[error("no {sex} life expectancy for age {age_years:.2} (table covers 0..={max_age})")]
    AgeOutOfRange {
        /// Sex of the colonist being looked up.
        sex: Sex,
        /// Requested age in earth years.
        age_years: f64,
        /// Oldest age in the table.
        max_age: u32,
    },
}

/// Errors raised while capturing or restoring generator state.
#[derive(Debug, thiserror::Error)]
pub enum RngStateError {
    /// The state could not be encoded or decoded.
    #[error("random state is not valid: {source}")]
    Serialization {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },
}
