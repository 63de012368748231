//! Deaths and relationship dissolution.
//!
//! Every colonist carries a planned death sol fixed at creation. Dying
//! ends any active relationship with [`RelationshipEnd::Death`]; reaching
//! a relationship's planned end sol ends it with
//! [`RelationshipEnd::Expired`].

use tracing::debug;

use censere_types::{ColonistId, RelationshipEnd, RelationshipId};

use crate::error::ColonyError;
use crate::population::Population;

/// What the death phase changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeathReport {
    /// Colonists who died.
    pub deaths: u32,
    /// Relationships ended by a death.
    pub ended_relationships: u32,
}

/// Kill every living colonist whose planned death sol is at or before
/// `sol`.
///
/// # Errors
///
/// Returns [`ColonyError`] if the arena is inconsistent.
pub fn run_deaths(population: &mut Population, sol: i64) -> Result<DeathReport, ColonyError> {
    let dying: Vec<ColonistId> = population
        .living()
        .filter(|c| c.planned_death_sol() <= sol)
        .map(|c| c.id)
        .collect();

    let mut report = DeathReport::default();
    for id in dying {
        let colonist = population.colonist_mut(id)?;
        colonist.died_on_sol = Some(sol);
        let partnered = colonist.relationship;
        if let Some(relationship) = partnered {
            population.end_relationship(relationship, sol, RelationshipEnd::Death)?;
            report.ended_relationships = report.ended_relationships.saturating_add(1);
        }
        report.deaths = report.deaths.saturating_add(1);
    }

    if report.deaths > 0 {
        debug!(sol, deaths = report.deaths, "Colonists died");
    }
    Ok(report)
}

/// End every active relationship whose planned end sol is at or before
/// `sol`. Returns the number ended.
///
/// # Errors
///
/// Returns [`ColonyError`] if the arena is inconsistent.
pub fn run_dissolution(population: &mut Population, sol: i64) -> Result<u32, ColonyError> {
    let expired: Vec<RelationshipId> = population
        .relationships()
        .iter()
        .filter(|r| r.is_active() && r.planned_end_sol() <= sol)
        .map(|r| r.id)
        .collect();

    let mut ended = 0_u32;
    for id in expired {
        population.end_relationship(id, sol, RelationshipEnd::Expired)?;
        ended = ended.saturating_add(1);
    }
    Ok(ended)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use censere_types::{Relationship, RelationshipKind, Sex};

    use super::*;
    use crate::population::tests::colonist;

    fn paired(duration_sols: i64) -> (Population, ColonistId, ColonistId, RelationshipId) {
        let mut pop = Population::new();
        let mut a = colonist(Sex::Male, -1_000);
        a.life_expectancy_sols = 1_100;
        let b = colonist(Sex::Female, -1_000);
        let (ida, idb) = (a.id, b.id);
        pop.add_colonist(a).unwrap();
        pop.add_colonist(b).unwrap();
        let rel = RelationshipId::new();
        pop.form_relationship(Relationship {
            id: rel,
            partner_a: ida,
            partner_b: idb,
            kind: RelationshipKind::Heterosexual,
            started_on_sol: 0,
            duration_sols,
            children: 0,
            next_birth_sol: 500,
            ended_on_sol: None,
            end_reason: None,
        })
        .unwrap();
        (pop, ida, idb, rel)
    }

    #[test]
    fn colonists_die_on_their_planned_sol() {
        let (mut pop, ida, idb, rel) = paired(10_000);
        assert_eq!(run_deaths(&mut pop, 99).unwrap(), DeathReport::default());

        let report = run_deaths(&mut pop, 100).unwrap();
        assert_eq!(report, DeathReport { deaths: 1, ended_relationships: 1 });
        assert_eq!(pop.colonist(ida).unwrap().died_on_sol, Some(100));
        assert!(pop.colonist(idb).unwrap().relationship.is_none());
        let relationship = pop.relationship(rel).unwrap();
        assert_eq!(relationship.end_reason, Some(RelationshipEnd::Death));
        assert_eq!(relationship.ended_on_sol, Some(100));

        // The dead do not die twice.
        assert_eq!(run_deaths(&mut pop, 101).unwrap().deaths, 0);
    }

    #[test]
    fn relationships_expire_on_their_planned_sol() {
        let (mut pop, ida, _, rel) = paired(40);
        assert_eq!(run_dissolution(&mut pop, 39).unwrap(), 0);
        assert_eq!(run_dissolution(&mut pop, 40).unwrap(), 1);
        assert_eq!(
            pop.relationship(rel).unwrap().end_reason,
            Some(RelationshipEnd::Expired)
        );
        assert!(pop.colonist(ida).unwrap().relationship.is_none());
        assert_eq!(run_dissolution(&mut pop, 41).unwrap(), 0);
    }

    #[test]
    fn a_relationship_ended_by_death_does_not_also_expire() {
        let (mut pop, _, _, _) = paired(100);
        run_deaths(&mut pop, 100).unwrap();
        assert_eq!(run_dissolution(&mut pop, 100).unwrap(), 0);
    }
}
