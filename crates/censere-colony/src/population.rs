//! The colony's population arena.
//!
//! Colonists and relationships live in insertion-ordered vectors with
//! ID-to-slot indexes. Order is significant: every phase walks colonists
//! in arena order, so replaying a run from a snapshot only works if the
//! order survives the round trip. The dead stay in the arena for ancestor
//! checks and historical counts.

use std::collections::HashMap;

use censere_types::{Colonist, ColonistId, Relationship, RelationshipEnd, RelationshipId, Sex};

use crate::error::ColonyError;
use crate::family::Lineage;

/// Head counts at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Census {
    /// Living colonists.
    pub population: u32,
    /// Living males.
    pub males: u32,
    /// Living females.
    pub females: u32,
    /// Active relationships.
    pub active_relationships: u32,
}

/// Every colonist and relationship in a run.
#[derive(Debug, Clone, Default)]
pub struct Population {
    colonists: Vec<Colonist>,
    index: HashMap<ColonistId, usize>,
    relationships: Vec<Relationship>,
    relationship_index: HashMap<RelationshipId, usize>,
    lineage: Lineage,
}

impl Population {
    /// Create an empty population.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a population from snapshot parts, preserving order.
    ///
    /// # Errors
    ///
    /// Returns [`ColonyError`] on duplicate IDs or when a colonist points
    /// at a relationship that does not exist.
    pub fn from_parts(
        colonists: Vec<Colonist>,
        relationships: Vec<Relationship>,
    ) -> Result<Self, ColonyError> {
        let mut population = Self::new();
        for colonist in colonists {
            population.add_colonist(colonist)?;
        }
        for relationship in relationships {
            let id = relationship.id;
            let slot = population.relationships.len();
            if population.relationship_index.insert(id, slot).is_some() {
                return Err(ColonyError::DuplicateRelationship(id));
            }
            population.relationships.push(relationship);
        }
        if let Some(dangling) = population.colonists.iter().find_map(|c| {
            c.relationship
                .filter(|r| !population.relationship_index.contains_key(r))
        }) {
            return Err(ColonyError::RelationshipNotFound(dangling));
        }
        Ok(population)
    }

    /// Split into colonists and relationships, in arena order.
    pub fn into_parts(self) -> (Vec<Colonist>, Vec<Relationship>) {
        (self.colonists, self.relationships)
    }

    /// Append a colonist, recording their parents in the lineage.
    ///
    /// # Errors
    ///
    /// Returns [`ColonyError::DuplicateColonist`] if the ID is taken.
    pub fn add_colonist(&mut self, colonist: Colonist) -> Result<(), ColonyError> {
        let id = colonist.id;
        let slot = self.colonists.len();
        if self.index.insert(id, slot).is_some() {
            return Err(ColonyError::DuplicateColonist(id));
        }
        let parents: Vec<ColonistId> = [colonist.parent_a, colonist.parent_b]
            .into_iter()
            .flatten()
            .collect();
        if !parents.is_empty() {
            self.lineage.record_birth(id, &parents);
        }
        self.colonists.push(colonist);
        Ok(())
    }

    /// Look up a colonist.
    pub fn colonist(&self, id: ColonistId) -> Option<&Colonist> {
        self.index.get(&id).and_then(|slot| self.colonists.get(*slot))
    }

    pub(crate) fn colonist_mut(&mut self, id: ColonistId) -> Result<&mut Colonist, ColonyError> {
        self.index
            .get(&id)
            .and_then(|slot| self.colonists.get_mut(*slot))
            .ok_or(ColonyError::ColonistNotFound(id))
    }

    /// Look up a relationship.
    pub fn relationship(&self, id: RelationshipId) -> Option<&Relationship> {
        self.relationship_index
            .get(&id)
            .and_then(|slot| self.relationships.get(*slot))
    }

    pub(crate) fn relationship_mut(
        &mut self,
        id: RelationshipId,
    ) -> Result<&mut Relationship, ColonyError> {
        self.relationship_index
            .get(&id)
            .and_then(|slot| self.relationships.get_mut(*slot))
            .ok_or(ColonyError::RelationshipNotFound(id))
    }

    /// All colonists, living and dead, in arena order.
    pub fn colonists(&self) -> &[Colonist] {
        &self.colonists
    }

    /// All relationships, active and ended, in formation order.
    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// Living colonists in arena order.
    pub fn living(&self) -> impl Iterator<Item = &Colonist> {
        self.colonists.iter().filter(|c| c.is_alive())
    }

    /// Number of living colonists.
    pub fn living_count(&self) -> usize {
        self.living().count()
    }

    /// Parent/child edges.
    pub const fn lineage(&self) -> &Lineage {
        &self.lineage
    }

    /// Count the living and the active relationships.
    pub fn census(&self) -> Census {
        let mut census = Census::default();
        for colonist in self.living() {
            census.population = census.population.saturating_add(1);
            match colonist.sex {
                Sex::Male => census.males = census.males.saturating_add(1),
                Sex::Female => census.females = census.females.saturating_add(1),
            }
        }
        let active = self.relationships.iter().filter(|r| r.is_active()).count();
        census.active_relationships = u32::try_from(active).unwrap_or(u32::MAX);
        census
    }

    /// Register a new relationship and mark both members as partnered.
    ///
    /// # Errors
    ///
    /// Returns [`ColonyError::AlreadyPartnered`] if either member is in an
    /// active relationship, or [`ColonyError::ColonistNotFound`].
    pub(crate) fn form_relationship(&mut self, relationship: Relationship) -> Result<(), ColonyError> {
        let id = relationship.id;
        for member in [relationship.partner_a, relationship.partner_b] {
            let colonist = self
                .colonist(member)
                .ok_or(ColonyError::ColonistNotFound(member))?;
            if let Some(existing) = colonist.relationship {
                return Err(ColonyError::AlreadyPartnered {
                    colonist: member,
                    relationship: existing,
                });
            }
        }
        let slot = self.relationships.len();
        if self.relationship_index.insert(id, slot).is_some() {
            return Err(ColonyError::DuplicateRelationship(id));
        }
        self.colonist_mut(relationship.partner_a)?.relationship = Some(id);
        self.colonist_mut(relationship.partner_b)?.relationship = Some(id);
        self.relationships.push(relationship);
        Ok(())
    }

    /// End an active relationship and free both members.
    ///
    /// # Errors
    ///
    /// Returns [`ColonyError`] if the relationship or a member is missing.
    pub(crate) fn end_relationship(
        &mut self,
        id: RelationshipId,
        sol: i64,
        reason: RelationshipEnd,
    ) -> Result<(), ColonyError> {
        let relationship = self.relationship_mut(id)?;
        if !relationship.is_active() {
            return Ok(());
        }
        relationship.ended_on_sol = Some(sol);
        relationship.end_reason = Some(reason);
        let members = [relationship.partner_a, relationship.partner_b];
        for member in members {
            let colonist = self.colonist_mut(member)?;
            if colonist.relationship == Some(id) {
                colonist.relationship = None;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use censere_types::{Orientation, Origin, RelationshipKind};

    use super::*;

    pub(crate) fn colonist(sex: Sex, birth_sol: i64) -> Colonist {
        Colonist {
            id: ColonistId::new(),
            sex,
            orientation: Orientation::Heterosexual,
            origin: Origin::Astronaut,
            birth_sol,
            life_expectancy_sols: 30_000,
            parent_a: None,
            parent_b: None,
            relationship: None,
            died_on_sol: None,
            generation: 0,
        }
    }

    fn relationship(a: ColonistId, b: ColonistId) -> Relationship {
        Relationship {
            id: RelationshipId::new(),
            partner_a: a,
            partner_b: b,
            kind: RelationshipKind::Heterosexual,
            started_on_sol: 0,
            duration_sols: 100,
            children: 0,
            next_birth_sol: 400,
            ended_on_sol: None,
            end_reason: None,
        }
    }

    #[test]
    fn census_counts_only_the_living() {
        let mut pop = Population::new();
        let mut dead = colonist(Sex::Male, -10_000);
        dead.died_on_sol = Some(5);
        pop.add_colonist(dead).unwrap();
        pop.add_colonist(colonist(Sex::Male, -10_000)).unwrap();
        pop.add_colonist(colonist(Sex::Female, -10_000)).unwrap();
        let census = pop.census();
        assert_eq!(census.population, 2);
        assert_eq!(census.males, 1);
        assert_eq!(census.females, 1);
        assert_eq!(pop.colonists().len(), 3);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut pop = Population::new();
        let c = colonist(Sex::Male, 0);
        pop.add_colonist(c.clone()).unwrap();
        assert!(matches!(
            pop.add_colonist(c),
            Err(ColonyError::DuplicateColonist(_))
        ));
    }

    #[test]
    fn a_colonist_holds_one_relationship_at_a_time() {
        let mut pop = Population::new();
        let a = colonist(Sex::Male, 0);
        let b = colonist(Sex::Female, 0);
        let c = colonist(Sex::Female, 0);
        let (ida, idb, idc) = (a.id, b.id, c.id);
        for x in [a, b, c] {
            pop.add_colonist(x).unwrap();
        }
        let first = relationship(ida, idb);
        let first_id = first.id;
        pop.form_relationship(first).unwrap();
        assert!(matches!(
            pop.form_relationship(relationship(ida, idc)),
            Err(ColonyError::AlreadyPartnered { .. })
        ));
        pop.end_relationship(first_id, 50, RelationshipEnd::Expired)
            .unwrap();
        assert!(pop.colonist(ida).unwrap().relationship.is_none());
        assert!(pop.form_relationship(relationship(ida, idc)).is_ok());
        assert_eq!(pop.census().active_relationships, 1);
    }

    #[test]
    fn parts_roundtrip_preserves_order_and_lineage() {
        let mut pop = Population::new();
        let mother = colonist(Sex::Female, -9_000);
        let mut child = colonist(Sex::Male, 10);
        child.parent_a = Some(mother.id);
        let (mid, cid) = (mother.id, child.id);
        pop.add_colonist(mother).unwrap();
        pop.add_colonist(child).unwrap();

        let (colonists, relationships) = pop.into_parts();
        let rebuilt = Population::from_parts(colonists, relationships).unwrap();
        let order: Vec<ColonistId> = rebuilt.colonists().iter().map(|c| c.id).collect();
        assert_eq!(order, vec![mid, cid]);
        assert!(rebuilt.lineage().share_ancestor(mid, cid, 1));
    }

    #[test]
    fn dangling_relationship_is_rejected() {
        let mut c = colonist(Sex::Male, 0);
        c.relationship = Some(RelationshipId::new());
        assert!(matches!(
            Population::from_parts(vec![c], Vec::new()),
            Err(ColonyError::RelationshipNotFound(_))
        ));
    }
}
