//! Core entity structs for the Censere colony simulation.
//!
//! These are the records that cross process boundaries: the live colony
//! state captured in a [`ColonySnapshot`], the per-sol [`SolSummary`]
//! time-series row, and the [`SimulationRecord`] ledger row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{LimitKind, Orientation, Origin, RelationshipEnd, RelationshipKind, Sex};
use crate::ids::{ColonistId, RelationshipId, SimulationId};

// ---------------------------------------------------------------------------
// Colonist
// ---------------------------------------------------------------------------

/// A single colonist.
///
/// Sols are signed: an astronaut's `birth_sol` is negative because they
/// were born on Earth before the initial landing at sol 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Colonist {
    /// Unique colonist identifier.
    pub id: ColonistId,
    /// Biological sex.
    pub sex: Sex,
    /// Orientation, fixed at creation.
    pub orientation: Orientation,
    /// Arrived by ship or born in the colony.
    pub origin: Origin,
    /// Sol of birth relative to the initial landing.
    pub birth_sol: i64,
    /// Total lifespan in sols, drawn once at creation.
    pub life_expectancy_sols: i64,
    /// First parent (`None` for astronauts).
    pub parent_a: Option<ColonistId>,
    /// Second parent (`None` for astronauts).
    pub parent_b: Option<ColonistId>,
    /// The active relationship, if partnered.
    pub relationship: Option<RelationshipId>,
    /// Sol the colonist died on. Set once.
    pub died_on_sol: Option<i64>,
    /// Generation number (0 for astronauts).
    pub generation: u32,
}

impl Colonist {
    /// Sol on which this colonist is due to die.
    pub const fn planned_death_sol(&self) -> i64 {
        self.birth_sol.saturating_add(self.life_expectancy_sols)
    }

    /// Whether the colonist is still alive.
    pub const fn is_alive(&self) -> bool {
        self.died_on_sol.is_none()
    }

    /// Whether the colonist is currently in a relationship.
    pub const fn is_partnered(&self) -> bool {
        self.relationship.is_some()
    }

    /// Age in sols on the given sol.
    pub const fn age_sols(&self, sol: i64) -> i64 {
        sol.saturating_sub(self.birth_sol)
    }
}

// ---------------------------------------------------------------------------
// Relationship
// ---------------------------------------------------------------------------

/// A partnership between two colonists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Relationship {
    /// Unique relationship identifier.
    pub id: RelationshipId,
    /// The member who sought the pairing.
    pub partner_a: ColonistId,
    /// The member who accepted it.
    pub partner_b: ColonistId,
    /// Derived from the members' sexes.
    pub kind: RelationshipKind,
    /// Sol the relationship formed.
    pub started_on_sol: i64,
    /// Planned length in sols, drawn at formation.
    pub duration_sols: i64,
    /// Children born to this relationship so far.
    pub children: u32,
    /// Earliest sol on which a birth may happen.
    pub next_birth_sol: i64,
    /// Sol the relationship ended, if it has.
    pub ended_on_sol: Option<i64>,
    /// Why the relationship ended, if it has.
    pub end_reason: Option<RelationshipEnd>,
}

impl Relationship {
    /// Whether the relationship is still active.
    pub const fn is_active(&self) -> bool {
        self.ended_on_sol.is_none()
    }

    /// Sol on which the relationship expires if nobody dies first.
    pub const fn planned_end_sol(&self) -> i64 {
        self.started_on_sol.saturating_add(self.duration_sols)
    }

    /// Return the other member, or `None` if `id` is not a member.
    pub fn partner_of(&self, id: ColonistId) -> Option<ColonistId> {
        if self.partner_a == id {
            Some(self.partner_b)
        } else if self.partner_b == id {
            Some(self.partner_a)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Time series
// ---------------------------------------------------------------------------

/// One row of the per-sol time series.
///
/// Rows are append-only and keyed by `(simulation_id, sol)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SolSummary {
    /// The run this row belongs to.
    pub simulation_id: SimulationId,
    /// Sol number.
    pub sol: i64,
    /// Earth timestamp of the sol.
    pub earth_datetime: DateTime<Utc>,
    /// Living colonists at the end of the sol.
    pub population: u32,
    /// Living males.
    pub males: u32,
    /// Living females.
    pub females: u32,
    /// Colonists that landed this sol.
    pub arrivals: u32,
    /// Colonists born this sol.
    pub births: u32,
    /// Colonists that died this sol.
    pub deaths: u32,
    /// Relationships formed this sol.
    pub new_relationships: u32,
    /// Relationships that ended this sol.
    pub ended_relationships: u32,
    /// Relationships active at the end of the sol.
    pub active_relationships: u32,
}

// ---------------------------------------------------------------------------
// Run ledger
// ---------------------------------------------------------------------------

/// One row of the Run Ledger.
///
/// Created when a run starts. Final counts, `mission_ends` and
/// `random_state` are written at every checkpoint; `end_datetime` only
/// when the run reaches its limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SimulationRecord {
    /// Unique run identifier.
    pub simulation_id: SimulationId,
    /// Earth timestamp of sol 0.
    pub initial_mission_lands: DateTime<Utc>,
    /// Wall-clock time the run started.
    pub begin_datetime: DateTime<Utc>,
    /// Wall-clock time the run reached its limit (`None` while resumable).
    pub end_datetime: Option<DateTime<Utc>>,
    /// Kind of limit bounding the run.
    pub limit: LimitKind,
    /// Limit count for `limit`.
    pub limit_count: i64,
    /// Earth timestamp of the last simulated sol.
    pub mission_ends: Option<DateTime<Utc>>,
    /// Last simulated sol.
    pub final_soldays: Option<i64>,
    /// Living population at the last simulated sol.
    pub final_population: Option<i64>,
    /// Resolved configuration as JSON text.
    pub args: String,
    /// Free-text notes. Never null.
    pub notes: String,
    /// Seed the generator was built from.
    pub random_seed: i64,
    /// Serialized generator state at the last checkpoint.
    pub random_state: Option<String>,
}

/// The full colony state needed to resume a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ColonySnapshot {
    /// The run this snapshot belongs to.
    pub simulation_id: SimulationId,
    /// Sol the snapshot was taken on.
    pub sol: i64,
    /// Sol the next mission lands on.
    pub next_mission_sol: i64,
    /// Every colonist, living and dead, in arena order.
    pub colonists: Vec<Colonist>,
    /// Every relationship, active and ended, in formation order.
    pub relationships: Vec<Relationship>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn colonist(birth_sol: i64, life: i64) -> Colonist {
        Colonist {
            id: ColonistId::new(),
            sex: Sex::Female,
            orientation: Orientation::Heterosexual,
            origin: Origin::Astronaut,
            birth_sol,
            life_expectancy_sols: life,
            parent_a: None,
            parent_b: None,
            relationship: None,
            died_on_sol: None,
            generation: 0,
        }
    }

    #[test]
    fn planned_death_and_age() {
        let c = colonist(-12_000, 30_000);
        assert_eq!(c.planned_death_sol(), 18_000);
        assert_eq!(c.age_sols(0), 12_000);
        assert!(c.is_alive());
        assert!(!c.is_partnered());
    }

    #[test]
    fn partner_lookup() {
        let a = ColonistId::new();
        let b = ColonistId::new();
        let rel = Relationship {
            id: RelationshipId::new(),
            partner_a: a,
            partner_b: b,
            kind: RelationshipKind::Heterosexual,
            started_on_sol: 10,
            duration_sols: 100,
            children: 0,
            next_birth_sol: 400,
            ended_on_sol: None,
            end_reason: None,
        };
        assert_eq!(rel.partner_of(a), Some(b));
        assert_eq!(rel.partner_of(b), Some(a));
        assert_eq!(rel.partner_of(ColonistId::new()), None);
        assert_eq!(rel.planned_end_sol(), 110);
        assert!(rel.is_active());
    }
}
