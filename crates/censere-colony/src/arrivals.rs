//! Mission landings.
//!
//! A mission is a number of ships, each carrying a number of settlers.
//! Per ship the sexes are apportioned from the astronaut gender ratio,
//! then every settler gets an age, an orientation, and a lifespan drawn
//! from the run generator in that order.

use rand::Rng;
use tracing::debug;

use censere_random::years_to_sols;
use censere_types::{Colonist, ColonistId, Origin, Sex};

use crate::error::ColonyError;
use crate::population::Population;
use crate::rules::ColonyRules;

/// Which ship and settler laws apply to a mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissionKind {
    /// The mission that founds the colony at sol 0.
    Initial,
    /// Every later supply mission.
    Resupply,
}

/// What a landing added to the colony.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LandingReport {
    /// Ships that landed.
    pub ships: u32,
    /// Settlers that disembarked.
    pub settlers: u32,
}

/// Land one mission on `sol`.
///
/// # Errors
///
/// Returns [`ColonyError`] if a lifespan cannot be drawn or an ID collides.
pub fn land_mission<R: Rng>(
    population: &mut Population,
    rules: &ColonyRules,
    kind: MissionKind,
    sol: i64,
    rng: &mut R,
) -> Result<LandingReport, ColonyError> {
    let (ships, per_ship) = match kind {
        MissionKind::Initial => (
            &rules.ships_per_initial_mission,
            &rules.settlers_per_initial_ship,
        ),
        MissionKind::Resupply => (&rules.ships_per_mission, &rules.settlers_per_ship),
    };

    let mut report = LandingReport::default();
    let ship_count = count(ships.sample(rng));
    for _ in 0..ship_count {
        let settlers = count(per_ship.sample(rng));
        for sex in rules.astronaut_gender.apportion(settlers, rng) {
            let colonist = new_astronaut(rules, sex, sol, rng)?;
            population.add_colonist(colonist)?;
            report.settlers = report.settlers.saturating_add(1);
        }
        report.ships = report.ships.saturating_add(1);
    }

    debug!(
        sol,
        ?kind,
        ships = report.ships,
        settlers = report.settlers,
        "Mission landed"
    );
    Ok(report)
}

fn new_astronaut<R: Rng>(
    rules: &ColonyRules,
    sex: Sex,
    sol: i64,
    rng: &mut R,
) -> Result<Colonist, ColonyError> {
    let id = ColonistId::from_random_bytes(rng.random());
    let age_years = rules.astronaut_age_years.sample(rng).max(0);
    let whole_years = i32::try_from(age_years).map_or(f64::from(i32::MAX), f64::from);
    let into_year = rng.random_range(0..years_to_sols(1.0));
    let age_sols = years_to_sols(whole_years).saturating_add(into_year);
    let orientation = rules.orientation.draw(rng);
    let life_expectancy_sols =
        rules
            .astronaut_life
            .lifespan_sols(&rules.life_table, sex, age_sols, rng)?;

    Ok(Colonist {
        id,
        sex,
        orientation,
        origin: Origin::Astronaut,
        birth_sol: sol.saturating_sub(age_sols),
        life_expectancy_sols,
        parent_a: None,
        parent_b: None,
        relationship: None,
        died_on_sol: None,
        generation: 0,
    })
}

/// Clamp a sampled count into `u32`.
fn count(sample: i64) -> u32 {
    u32::try_from(sample.max(0)).unwrap_or(u32::MAX)
}
