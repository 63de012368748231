//! Births.
//!
//! A relationship can produce a child once its `next_birth_sol` has come
//! and the couple can conceive: a fertile woman in a mixed couple, or a
//! fertile woman in a female couple when IVF is available. Male couples
//! never conceive. Each eligible relationship rolls the daily birth chance
//! once per sol.

use rand::Rng;
use tracing::debug;

use censere_types::{Colonist, ColonistId, Origin, RelationshipId, Sex};

use crate::error::ColonyError;
use crate::population::Population;
use crate::rules::ColonyRules;

/// Whether `colonist` is inside the fertile window on `sol`.
pub fn is_fertile(colonist: &Colonist, rules: &ColonyRules, sol: i64) -> bool {
    if colonist.sex != Sex::Female || !colonist.is_alive() {
        return false;
    }
    let (start, end) = rules.fertile_window_sols();
    let age = colonist.age_sols(sol);
    (start..=end).contains(&age)
}

/// The partner who would carry a child, if the couple can conceive.
pub fn mother<'a>(
    a: &'a Colonist,
    b: &'a Colonist,
    rules: &ColonyRules,
    sol: i64,
) -> Option<&'a Colonist> {
    match (a.sex, b.sex) {
        (Sex::Male, Sex::Male) => None,
        (Sex::Female, Sex::Female) if !rules.use_ivf => None,
        _ => [a, b].into_iter().find(|c| is_fertile(c, rules, sol)),
    }
}

/// Run the birth phase for `sol`. Returns the number of children born.
///
/// # Errors
///
/// Returns [`ColonyError`] if a partner is missing, a lifespan cannot be
/// drawn, or a generation counter overflows.
pub fn run_births<R: Rng>(
    population: &mut Population,
    rules: &ColonyRules,
    sol: i64,
    rng: &mut R,
) -> Result<u32, ColonyError> {
    let due: Vec<RelationshipId> = population
        .relationships()
        .iter()
        .filter(|r| r.is_active() && r.next_birth_sol <= sol)
        .map(|r| r.id)
        .collect();

    let mut births = 0_u32;
    for id in due {
        let Some(parents) = conceiving_parents(population, rules, id, sol)? else {
            continue;
        };
        if !rng.sample(rules.birth) {
            continue;
        }
        let child = newborn(population, rules, parents, sol, rng)?;
        let gap = rules.sols_between_siblings.sample(rng);
        population.add_colonist(child)?;
        let relationship = population.relationship_mut(id)?;
        relationship.children = relationship.children.saturating_add(1);
        relationship.next_birth_sol = sol.saturating_add(gap);
        births = births.saturating_add(1);
    }

    if births > 0 {
        debug!(sol, births, "Children born");
    }
    Ok(births)
}

/// `(mother, other parent)` when the relationship can conceive today.
fn conceiving_parents(
    population: &Population,
    rules: &ColonyRules,
    id: RelationshipId,
    sol: i64,
) -> Result<Option<(ColonistId, ColonistId)>, ColonyError> {
    let relationship = population
        .relationship(id)
        .ok_or(ColonyError::RelationshipNotFound(id))?;
    let a = population
        .colonist(relationship.partner_a)
        .ok_or(ColonyError::ColonistNotFound(relationship.partner_a))?;
    let b = population
        .colonist(relationship.partner_b)
        .ok_or(ColonyError::ColonistNotFound(relationship.partner_b))?;
    Ok(mother(a, b, rules, sol).map(|m| {
        let other = if m.id == a.id { b.id } else { a.id };
        (m.id, other)
    }))
}

fn newborn<R: Rng>(
    population: &Population,
    rules: &ColonyRules,
    (mother, other): (ColonistId, ColonistId),
    sol: i64,
    rng: &mut R,
) -> Result<Colonist, ColonyError> {
    let parent_generation = [mother, other]
        .into_iter()
        .filter_map(|id| population.colonist(id))
        .map(|c| c.generation)
        .max()
        .unwrap_or(0);
    let generation =
        parent_generation
            .checked_add(1)
            .ok_or_else(|| ColonyError::ArithmeticOverflow {
                context: format!("generation after {parent_generation}"),
            })?;

    let id = ColonistId::from_random_bytes(rng.random());
    let sex = rules.martian_gender.draw(rng);
    let orientation = rules.orientation.draw(rng);
    let life_expectancy_sols = rules
        .martian_life
        .lifespan_sols(&rules.life_table, sex, 0, rng)?;

    Ok(Colonist {
        id,
        sex,
        orientation,
        origin: Origin::Martian,
        birth_sol: sol,
        life_expectancy_sols,
        parent_a: Some(mother),
        parent_b: Some(other),
        relationship: None,
        died_on_sol: None,
        generation,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::distr::Bernoulli;

    use censere_random::{ColonyRng, years_to_sols};
    use censere_types::{Relationship, RelationshipKind};

    use super::*;
    use crate::population::tests::colonist;
    use crate::rules::test_support::rules;

    fn couple(
        pop: &mut Population,
        a: Colonist,
        b: Colonist,
        next_birth_sol: i64,
    ) -> RelationshipId {
        let id = RelationshipId::new();
        let kind = RelationshipKind::for_pair(a.sex, b.sex);
        let (ida, idb) = (a.id, b.id);
        pop.add_colonist(a).unwrap();
        pop.add_colonist(b).unwrap();
        pop.form_relationship(Relationship {
            id,
            partner_a: ida,
            partner_b: idb,
            kind,
            started_on_sol: 0,
            duration_sols: 100_000,
            children: 0,
            next_birth_sol,
            ended_on_sol: None,
            end_reason: None,
        })
        .unwrap();
        id
    }

    fn certain_births() -> ColonyRules {
        let mut rules = rules();
        rules.birth = Bernoulli::new(1.0).unwrap();
        rules
    }

    #[test]
    fn fertility_window() {
        let rules = rules();
        let young = colonist(Sex::Female, -years_to_sols(17.0));
        let adult = colonist(Sex::Female, -years_to_sols(30.0));
        let older = colonist(Sex::Female, -years_to_sols(50.0));
        let man = colonist(Sex::Male, -years_to_sols(30.0));
        assert!(!is_fertile(&young, &rules, 0));
        assert!(is_fertile(&adult, &rules, 0));
        assert!(!is_fertile(&older, &rules, 0));
        assert!(!is_fertile(&man, &rules, 0));

        let mut ivf = rules.clone();
        ivf.use_ivf = true;
        assert!(is_fertile(&older, &ivf, 0));
    }

    #[test]
    fn mixed_couple_has_child_with_both_parents() {
        let rules = certain_births();
        let mut pop = Population::new();
        let m = colonist(Sex::Male, -years_to_sols(30.0));
        let f = colonist(Sex::Female, -years_to_sols(28.0));
        let (mid, fid) = (m.id, f.id);
        let rel = couple(&mut pop, m, f, 10);
        let mut rng = ColonyRng::seed_from_u64(31);

        assert_eq!(run_births(&mut pop, &rules, 9, &mut rng).unwrap(), 0);
        assert_eq!(run_births(&mut pop, &rules, 10, &mut rng).unwrap(), 1);

        let child = pop.colonists().last().unwrap();
        assert_eq!(child.parent_a, Some(fid));
        assert_eq!(child.parent_b, Some(mid));
        assert_eq!(child.origin, Origin::Martian);
        assert_eq!(child.birth_sol, 10);
        assert_eq!(child.generation, 1);

        let relationship = pop.relationship(rel).unwrap();
        assert_eq!(relationship.children, 1);
        assert!(relationship.next_birth_sol >= 310);
        assert_eq!(run_births(&mut pop, &rules, 11, &mut rng).unwrap(), 0);
    }

    #[test]
    fn male_couples_never_conceive() {
        let rules = certain_births();
        let mut pop = Population::new();
        let a = colonist(Sex::Male, -years_to_sols(30.0));
        let b = colonist(Sex::Male, -years_to_sols(30.0));
        couple(&mut pop, a, b, 0);
        let mut rng = ColonyRng::seed_from_u64(32);
        assert_eq!(run_births(&mut pop, &rules, 0, &mut rng).unwrap(), 0);
    }

    #[test]
    fn female_couples_need_ivf() {
        let mut rules = certain_births();
        let mut pop = Population::new();
        let a = colonist(Sex::Female, -years_to_sols(30.0));
        let b = colonist(Sex::Female, -years_to_sols(30.0));
        couple(&mut pop, a, b, 0);
        let mut rng = ColonyRng::seed_from_u64(33);
        assert_eq!(run_births(&mut pop, &rules, 0, &mut rng).unwrap(), 0);
        rules.use_ivf = true;
        assert_eq!(run_births(&mut pop, &rules, 0, &mut rng).unwrap(), 1);
    }

    #[test]
    fn infertile_women_do_not_conceive() {
        let rules = certain_births();
        let mut pop = Population::new();
        let m = colonist(Sex::Male, -years_to_sols(50.0));
        let f = colonist(Sex::Female, -years_to_sols(48.0));
        couple(&mut pop, m, f, 0);
        let mut rng = ColonyRng::seed_from_u64(34);
        assert_eq!(run_births(&mut pop, &rules, 0, &mut rng).unwrap(), 0);
    }
}
