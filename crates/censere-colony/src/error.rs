//! Error types for the censere-colony crate.
//!
//! All operations that can fail return typed errors rather than panicking.
//! Pairing rejections are not errors: they are [`ConstraintViolation`]s
//! that the pairing phase handles locally.
//!
//! [`ConstraintViolation`]: crate::pairing::ConstraintViolation

use censere_random::LifeTableError;
use censere_types::{ColonistId, RelationshipId};

/// Errors that can occur while mutating the colony.
#[derive(Debug, thiserror::Error)]
pub enum ColonyError {
    /// Colonist with the given ID is not in the population.
    #[error("colonist not found: {0}")]
    ColonistNotFound(ColonistId),

    /// Relationship with the given ID is not in the population.
    #[error("relationship not found: {0}")]
    RelationshipNotFound(RelationshipId),

    /// A colonist ID was added twice.
    #[error("duplicate colonist: {0}")]
    DuplicateColonist(ColonistId),

    /// A relationship ID was added twice.
    #[error("duplicate relationship: {0}")]
    DuplicateRelationship(RelationshipId),

    /// A colonist would end up in two active relationships.
    #[error("colonist {colonist} is already in relationship {relationship}")]
    AlreadyPartnered {
        /// The colonist.
        colonist: ColonistId,
        /// Their existing relationship.
        relationship: RelationshipId,
    },

    /// A lifespan could not be drawn.
    #[error("life expectancy error: {source}")]
    LifeTable {
        /// The underlying life table error.
        #[from]
        source: LifeTableError,
    },

    /// An arithmetic overflow occurred in a sol computation.
    #[error("arithmetic overflow: {context}")]
    ArithmeticOverflow {
        /// Description of what was being computed.
        context: String,
    },
}
