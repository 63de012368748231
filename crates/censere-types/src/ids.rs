//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Every entity in a colony run has a strongly-typed ID to prevent
//! accidental mixing of identifiers at compile time. Simulation IDs use
//! UUID v7 (time-ordered) so ledger rows index well. Colonist and
//! relationship IDs are built from generator bytes instead, which keeps a
//! replayed run byte-identical to the original.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Build an identifier from 16 random bytes (UUID v4 layout).
            ///
            /// Used when the bytes come from the run's seeded generator.
            pub const fn from_random_bytes(bytes: [u8; 16]) -> Self {
                Self(uuid::Builder::from_random_bytes(bytes).into_uuid())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for one simulation run (a Run Ledger row).
    SimulationId
}

define_id! {
    /// Unique identifier for a colonist, astronaut or Mars-born.
    ColonistId
}

define_id! {
    /// Unique identifier for a relationship between two colonists.
    RelationshipId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let sim = SimulationId::new();
        let colonist = ColonistId::new();
        assert_ne!(sim.into_inner(), Uuid::nil());
        assert_ne!(colonist.into_inner(), Uuid::nil());
    }

    #[test]
    fn random_bytes_are_deterministic() {
        let a = ColonistId::from_random_bytes([7; 16]);
        let b = ColonistId::from_random_bytes([7; 16]);
        assert_eq!(a, b);
        assert_eq!(a.into_inner().get_version_num(), 4);
    }

    #[test]
    fn id_roundtrips_through_json() {
        let id = RelationshipId::new();
        let json = serde_json::to_string(&id).unwrap_or_default();
        let back: Result<RelationshipId, _> = serde_json::from_str(&json);
        assert_eq!(back.ok(), Some(id));
    }
}
