//! Relationship formation.
//!
//! Each sol, every single living adult rolls to go looking for a partner.
//! A seeker walks a shuffled copy of the day's candidate pool and pairs
//! with the first candidate that passes [`check_pair`]. Rejections are
//! [`ConstraintViolation`]s: logged and dropped, never carried forward.

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, trace};

use censere_types::{Colonist, ColonistId, Relationship, RelationshipId, RelationshipKind};

use crate::error::ColonyError;
use crate::population::Population;
use crate::rules::ColonyRules;

/// Why two colonists may not pair.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConstraintViolation {
    /// A colonist cannot pair with themselves.
    #[error("colonist cannot pair with themselves")]
    SameColonist,

    /// One side is not in the population or is dead.
    #[error("colonist {0} is not alive")]
    NotAlive(ColonistId),

    /// One side is already in an active relationship.
    #[error("colonist {0} is already partnered")]
    AlreadyPartnered(ColonistId),

    /// One side is below the pairing age.
    #[error("colonist {0} is under age")]
    Underage(ColonistId),

    /// One side would not accept the other's sex.
    #[error("orientations are not compatible")]
    Orientation,

    /// The age gap is larger than allowed.
    #[error("age gap of {gap_sols} sols exceeds {max_sols}")]
    AgeGap {
        /// Actual gap in sols.
        gap_sols: i64,
        /// Largest allowed gap in sols.
        max_sols: i64,
    },

    /// The pair share an ancestor within the configured generations.
    #[error("common ancestor within {generations} generations")]
    CommonAncestor {
        /// The configured generation bound.
        generations: u32,
    },
}

/// Decide whether `a` and `b` may form a relationship on `sol`.
///
/// # Errors
///
/// Returns the first [`ConstraintViolation`] found.
pub fn check_pair(
    population: &Population,
    rules: &ColonyRules,
    a: ColonistId,
    b: ColonistId,
    sol: i64,
) -> Result<(), ConstraintViolation> {
    if a == b {
        return Err(ConstraintViolation::SameColonist);
    }
    let first = eligible(population, a, sol)?;
    let second = eligible(population, b, sol)?;

    if !first.orientation.accepts(first.sex, second.sex)
        || !second.orientation.accepts(second.sex, first.sex)
    {
        return Err(ConstraintViolation::Orientation);
    }

    let gap_sols = first.birth_sol.abs_diff(second.birth_sol);
    let max_sols = rules.max_age_difference_sols();
    if gap_sols > max_sols.unsigned_abs() {
        return Err(ConstraintViolation::AgeGap {
            gap_sols: i64::try_from(gap_sols).unwrap_or(i64::MAX),
            max_sols,
        });
    }

    let generations = rules.common_ancestor_generations;
    if population.lineage().share_ancestor(a, b, generations) {
        return Err(ConstraintViolation::CommonAncestor { generations });
    }

    Ok(())
}

fn eligible(population: &Population, id: ColonistId, sol: i64) -> Result<&Colonist, ConstraintViolation> {
    let colonist = population
        .colonist(id)
        .filter(|c| c.is_alive())
        .ok_or(ConstraintViolation::NotAlive(id))?;
    if colonist.is_partnered() {
        return Err(ConstraintViolation::AlreadyPartnered(id));
    }
    if colonist.age_sols(sol) < ColonyRules::adult_age_sols() {
        return Err(ConstraintViolation::Underage(id));
    }
    Ok(colonist)
}

/// Run the pairing phase for `sol`. Returns the number of relationships
/// formed.
///
/// # Errors
///
/// Returns [`ColonyError`] only on internal inconsistencies; rejected
/// pairs are not errors.
pub fn run_pairing<R: Rng>(
    population: &mut Population,
    rules: &ColonyRules,
    sol: i64,
    rng: &mut R,
) -> Result<u32, ColonyError> {
    let adult_age = ColonyRules::adult_age_sols();
    let pool: Vec<ColonistId> = population
        .living()
        .filter(|c| !c.is_partnered() && c.age_sols(sol) >= adult_age)
        .map(|c| c.id)
        .collect();
    let seekers: Vec<ColonistId> = pool
        .iter()
        .copied()
        .filter(|_| rng.sample(rules.pairing))
        .collect();

    let mut formed = 0_u32;
    for seeker in seekers {
        if population.colonist(seeker).is_none_or(Colonist::is_partnered) {
            continue;
        }
        let mut candidates = pool.clone();
        candidates.shuffle(rng);
        let mut partner = None;
        for candidate in candidates {
            match check_pair(population, rules, seeker, candidate, sol) {
                Ok(()) => {
                    partner = Some(candidate);
                    break;
                }
                Err(violation) => {
                    trace!(%seeker, %candidate, %violation, "Pair rejected");
                }
            }
        }
        if let Some(partner) = partner {
            form(population, rules, seeker, partner, sol, rng)?;
            formed = formed.saturating_add(1);
        }
    }

    if formed > 0 {
        debug!(sol, formed, "Relationships formed");
    }
    Ok(formed)
}

fn form<R: Rng>(
    population: &mut Population,
    rules: &ColonyRules,
    a: ColonistId,
    b: ColonistId,
    sol: i64,
    rng: &mut R,
) -> Result<(), ColonyError> {
    let sex_a = population
        .colonist(a)
        .ok_or(ColonyError::ColonistNotFound(a))?
        .sex;
    let sex_b = population
        .colonist(b)
        .ok_or(ColonyError::ColonistNotFound(b))?
        .sex;
    let id = RelationshipId::from_random_bytes(rng.random());
    let duration_sols = rules.relationship_length.sample(rng);
    let first_child_delay = rules.first_child_delay.sample(rng);
    population.form_relationship(Relationship {
        id,
        partner_a: a,
        partner_b: b,
        kind: RelationshipKind::for_pair(sex_a, sex_b),
        started_on_sol: sol,
        duration_sols,
        children: 0,
        next_birth_sol: sol.saturating_add(first_child_delay),
        ended_on_sol: None,
        end_reason: None,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::distr::Bernoulli;

    use censere_random::{ColonyRng, years_to_sols};
    use censere_types::{Orientation, Sex};

    use super::*;
    use crate::population::tests::colonist;
    use crate::rules::test_support::rules;

    fn adult(sex: Sex) -> Colonist {
        colonist(sex, -years_to_sols(30.0))
    }

    #[test]
    fn compatible_adults_pass() {
        let mut pop = Population::new();
        let (m, f) = (adult(Sex::Male), adult(Sex::Female));
        let (mid, fid) = (m.id, f.id);
        pop.add_colonist(m).unwrap();
        pop.add_colonist(f).unwrap();
        assert_eq!(check_pair(&pop, &rules(), mid, fid, 0), Ok(()));
        assert_eq!(
            check_pair(&pop, &rules(), mid, mid, 0),
            Err(ConstraintViolation::SameColonist)
        );
    }

    #[test]
    fn orientation_must_be_mutual() {
        let mut pop = Population::new();
        let a = adult(Sex::Female);
        let mut b = adult(Sex::Female);
        b.orientation = Orientation::Bisexual;
        let (aid, bid) = (a.id, b.id);
        pop.add_colonist(a).unwrap();
        pop.add_colonist(b).unwrap();
        assert_eq!(
            check_pair(&pop, &rules(), aid, bid, 0),
            Err(ConstraintViolation::Orientation)
        );
    }

    #[test]
    fn age_gap_and_minors_are_rejected() {
        let mut pop = Population::new();
        let old = colonist(Sex::Male, -years_to_sols(60.0));
        let young = colonist(Sex::Female, -years_to_sols(25.0));
        let child = colonist(Sex::Female, -years_to_sols(10.0));
        let (oid, yid, cid) = (old.id, young.id, child.id);
        for c in [old, young, child] {
            pop.add_colonist(c).unwrap();
        }
        assert!(matches!(
            check_pair(&pop, &rules(), oid, yid, 0),
            Err(ConstraintViolation::AgeGap { .. })
        ));
        assert_eq!(
            check_pair(&pop, &rules(), oid, cid, 0),
            Err(ConstraintViolation::Underage(cid))
        );
    }

    #[test]
    fn parent_and_child_may_not_pair() {
        let mut pop = Population::new();
        let mother = adult(Sex::Female);
        let mut son = colonist(Sex::Male, -years_to_sols(19.0));
        son.parent_a = Some(mother.id);
        son.generation = 1;
        let (mid, sid) = (mother.id, son.id);
        pop.add_colonist(mother).unwrap();
        pop.add_colonist(son).unwrap();
        assert_eq!(
            check_pair(&pop, &rules(), mid, sid, 0),
            Err(ConstraintViolation::CommonAncestor { generations: 5 })
        );
    }

    #[test]
    fn everybody_pairs_when_everybody_seeks() {
        let mut rules = rules();
        rules.pairing = Bernoulli::new(1.0).unwrap();
        let mut pop = Population::new();
        for i in 0..10 {
            let sex = if i % 2 == 0 { Sex::Male } else { Sex::Female };
            pop.add_colonist(adult(sex)).unwrap();
        }
        let mut rng = ColonyRng::seed_from_u64(21);
        let formed = run_pairing(&mut pop, &rules, 0, &mut rng).unwrap();
        assert_eq!(formed, 5);
        assert_eq!(pop.census().active_relationships, 5);
        for c in pop.colonists() {
            let rel = pop.relationship(c.relationship.unwrap()).unwrap();
            assert_eq!(rel.kind, RelationshipKind::Heterosexual);
            assert!(rel.next_birth_sol >= 350);
        }
    }

    #[test]
    fn nobody_pairs_when_nobody_seeks() {
        let mut rules = rules();
        rules.pairing = Bernoulli::new(0.0).unwrap();
        let mut pop = Population::new();
        pop.add_colonist(adult(Sex::Male)).unwrap();
        pop.add_colonist(adult(Sex::Female)).unwrap();
        let mut rng = ColonyRng::seed_from_u64(22);
        assert_eq!(run_pairing(&mut pop, &rules, 0, &mut rng).unwrap(), 0);
    }
}
