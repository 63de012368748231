//! Sol cycle: the phase loop that advances a colony by one sol.
//!
//! Each sol runs these phases in a fixed order:
//!
//! 1. **Arrivals** -- land the scheduled mission, if it is due, and
//!    schedule the next one.
//! 2. **Pairing** -- single adults look for partners.
//! 3. **Births** -- eligible relationships may have a child.
//! 4. **Deaths** -- colonists at their planned death sol die.
//! 5. **Dissolution** -- relationships at their planned end sol expire.
//! 6. **Record** -- counts are folded into a [`SolSummary`].
//!
//! Every draw comes from the run's single generator in phase order, so the
//! cycle is deterministic given the same state and generator position.

use rand::Rng;
use tracing::debug;

use censere_colony::{
    ColonyError, ColonyRules, MissionKind, Population, land_mission, run_births, run_deaths,
    run_dissolution, run_pairing,
};
use censere_types::{SimulationId, SolSummary};

use crate::clock::{ClockError, SolClock};

/// Errors that can occur during sol execution.
#[derive(Debug, thiserror::Error)]
pub enum SolError {
    /// A clock operation failed.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// A colony phase failed.
    #[error("colony error on sol {sol}: {source}")]
    Colony {
        /// The sol being executed.
        sol: i64,
        /// The underlying colony error.
        source: ColonyError,
    },
}

/// The mutable colony state carried from sol to sol.
#[derive(Debug, Clone)]
pub struct ColonyState {
    /// The sol clock.
    pub clock: SolClock,
    /// Every colonist and relationship.
    pub population: Population,
    /// Sol on which the next supply mission lands.
    pub next_mission_sol: i64,
}

/// Per-phase counts for one sol, before the census.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolCounts {
    /// Colonists that landed.
    pub arrivals: u32,
    /// Children born.
    pub births: u32,
    /// Colonists that died.
    pub deaths: u32,
    /// Relationships formed.
    pub new_relationships: u32,
    /// Relationships ended by death or expiry.
    pub ended_relationships: u32,
}

impl ColonyState {
    /// Found a colony: land the initial mission at sol 0 and schedule the
    /// first supply mission. Returns the sol-0 summary.
    ///
    /// # Errors
    ///
    /// Returns [`SolError`] if the landing fails.
    pub fn found<R: Rng>(
        clock: SolClock,
        rules: &ColonyRules,
        simulation_id: SimulationId,
        rng: &mut R,
    ) -> Result<(Self, SolSummary), SolError> {
        let sol = clock.sol();
        let mut population = Population::new();
        let report = land_mission(&mut population, rules, MissionKind::Initial, sol, rng)
            .map_err(|source| SolError::Colony { sol, source })?;
        let state = Self {
            clock,
            population,
            next_mission_sol: schedule_after(sol, rules, rng),
        };
        let counts = SolCounts {
            arrivals: report.settlers,
            ..SolCounts::default()
        };
        let summary = state.summarize(simulation_id, counts)?;
        Ok((state, summary))
    }
}

/// Advance `state` by one sol and run every phase.
///
/// # Errors
///
/// Returns [`SolError`] if the clock overflows or a phase fails.
pub fn run_sol<R: Rng>(
    state: &mut ColonyState,
    rules: &ColonyRules,
    simulation_id: SimulationId,
    rng: &mut R,
) -> Result<SolSummary, SolError> {
    let sol = state.clock.advance()?;
    let colony = |source| SolError::Colony { sol, source };
    let population = &mut state.population;
    let mut counts = SolCounts::default();

    // --- Phase 1: Arrivals ---
    if sol >= state.next_mission_sol {
        let report = land_mission(population, rules, MissionKind::Resupply, sol, rng)
            .map_err(colony)?;
        counts.arrivals = report.settlers;
        state.next_mission_sol = schedule_after(sol, rules, rng);
        debug!(sol, next = state.next_mission_sol, "Next mission scheduled");
    }

    // --- Phase 2: Pairing ---
    counts.new_relationships = run_pairing(population, rules, sol, rng).map_err(colony)?;

    // --- Phase 3: Births ---
    counts.births = run_births(population, rules, sol, rng).map_err(colony)?;

    // --- Phase 4: Deaths ---
    let deaths = run_deaths(population, sol).map_err(colony)?;
    counts.deaths = deaths.deaths;

    // --- Phase 5: Dissolution ---
    let expired = run_dissolution(population, sol).map_err(colony)?;
    counts.ended_relationships = deaths.ended_relationships.saturating_add(expired);

    // --- Phase 6: Record ---
    state.summarize(simulation_id, counts)
}

impl ColonyState {
    /// Fold `counts` and the current census into a time-series row.
    ///
    /// # Errors
    ///
    /// Returns [`SolError::Clock`] if the sol has no earth timestamp.
    pub fn summarize(
        &self,
        simulation_id: SimulationId,
        counts: SolCounts,
    ) -> Result<SolSummary, SolError> {
        let census = self.population.census();
        Ok(SolSummary {
            simulation_id,
            sol: self.clock.sol(),
            earth_datetime: self.clock.earth_datetime()?,
            population: census.population,
            males: census.males,
            females: census.females,
            arrivals: counts.arrivals,
            births: counts.births,
            deaths: counts.deaths,
            new_relationships: counts.new_relationships,
            ended_relationships: counts.ended_relationships,
            active_relationships: census.active_relationships,
        })
    }
}

/// Sol of the mission after one landing on `sol`. Always later than `sol`.
fn schedule_after<R: Rng>(sol: i64, rules: &ColonyRules, rng: &mut R) -> i64 {
    sol.saturating_add(rules.mission_lands.sample(rng).max(1))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use rand::SeedableRng;

    use censere_random::ColonyRng;

    use super::*;
    use crate::config::GeneratorConfig;
    use crate::config::tests::asset_path;

    pub(crate) fn rules() -> ColonyRules {
        let mut config = GeneratorConfig::default();
        config.life_table.path = asset_path();
        config.compile().unwrap()
    }

    fn founded(seed: u64) -> (ColonyState, SolSummary, ColonyRng) {
        let mut rng = ColonyRng::seed_from_u64(seed);
        let clock = SolClock::new(GeneratorConfig::default().simulation.initial_mission_lands);
        let (state, summary) =
            ColonyState::found(clock, &rules(), SimulationId::new(), &mut rng).unwrap();
        (state, summary, rng)
    }

    #[test]
    fn founding_lands_twenty_settlers() {
        let (state, summary, _) = founded(1);
        assert_eq!(summary.sol, 0);
        assert_eq!(summary.population, 20);
        assert_eq!(summary.males, 10);
        assert_eq!(summary.females, 10);
        assert_eq!(summary.arrivals, 20);
        assert_eq!(summary.births, 0);
        assert_eq!(summary.deaths, 0);
        assert_eq!(state.next_mission_sol, 759);
    }

    #[test]
    fn supply_mission_lands_on_schedule() {
        let rules = rules();
        let (mut state, _, mut rng) = founded(2);
        let id = SimulationId::new();
        let mut arrivals = Vec::new();
        for _ in 0..760 {
            let summary = run_sol(&mut state, &rules, id, &mut rng).unwrap();
            if summary.arrivals > 0 {
                arrivals.push((summary.sol, summary.arrivals));
            }
        }
        assert_eq!(arrivals, vec![(759, 40)]);
        assert_eq!(state.next_mission_sol, 1518);
    }

    #[test]
    fn summaries_balance_the_census() {
        let rules = rules();
        let (mut state, first, mut rng) = founded(3);
        let id = SimulationId::new();
        let mut population = i64::from(first.population);
        let mut active = i64::from(first.active_relationships);
        for _ in 0..2_000 {
            let s = run_sol(&mut state, &rules, id, &mut rng).unwrap();
            population = population + i64::from(s.arrivals) + i64::from(s.births)
                - i64::from(s.deaths);
            active = active + i64::from(s.new_relationships) - i64::from(s.ended_relationships);
            assert_eq!(population, i64::from(s.population), "sol {}", s.sol);
            assert_eq!(active, i64::from(s.active_relationships), "sol {}", s.sol);
            assert_eq!(s.males + s.females, s.population);
        }
    }

    #[test]
    fn colony_invariants_hold() {
        let rules = rules();
        let (mut state, _, mut rng) = founded(4);
        let id = SimulationId::new();
        for _ in 0..3_000 {
            run_sol(&mut state, &rules, id, &mut rng).unwrap();
        }
        let population = &state.population;
        for colonist in population.colonists() {
            if let Some(died) = colonist.died_on_sol {
                assert!(died >= colonist.birth_sol);
            }
            if let Some(rel) = colonist.relationship {
                let relationship = population.relationship(rel).unwrap();
                assert!(relationship.is_active());
                assert!(relationship.partner_of(colonist.id).is_some());
            }
        }
        for relationship in population.relationships().iter().filter(|r| r.is_active()) {
            for member in [relationship.partner_a, relationship.partner_b] {
                assert_eq!(
                    population.colonist(member).unwrap().relationship,
                    Some(relationship.id)
                );
            }
        }
    }
}
