//! Compiled demographic rules.
//!
//! [`ColonyRules`] is the validated, sampler-backed form of the generator
//! configuration. Building one is the only place option strings are
//! interpreted; the per-sol phases only ever see compiled values.

use rand::Rng;
use rand::distr::Bernoulli;

use censere_random::{LifeExpectancy, LifeTable, Sampler, years_to_sols};
use censere_types::{Orientation, Sex};

/// Age in earth years at which colonists may pair.
pub const ADULT_AGE_YEARS: f64 = 18.0;

/// Lower bound of the fertile window in earth years.
pub const FERTILE_MIN_YEARS: f64 = 18.0;

/// Upper bound of the fertile window in earth years.
pub const FERTILE_MAX_YEARS: f64 = 45.0;

/// Upper bound of the fertile window when IVF is available.
pub const IVF_FERTILE_MAX_YEARS: f64 = 55.0;

/// A malformed percentage split.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RatioError {
    /// Wrong number of comma-separated parts.
    #[error("expected {expected} comma-separated percentages, found {found}")]
    Arity {
        /// Parts required.
        expected: usize,
        /// Parts supplied.
        found: usize,
    },
    /// A part is not a non-negative integer.
    #[error("{token:?} is not a whole percentage")]
    NotAPercentage {
        /// The offending part.
        token: String,
    },
    /// Parts do not add up to 100.
    #[error("percentages sum to {sum}, not 100")]
    Sum {
        /// The actual total.
        sum: u32,
    },
}

fn percentages<const N: usize>(text: &str) -> Result<[u32; N], RatioError> {
    let tokens: Vec<&str> = text.split(',').collect();
    if tokens.len() != N {
        return Err(RatioError::Arity {
            expected: N,
            found: tokens.len(),
        });
    }
    let mut parts = [0_u32; N];
    for (slot, token) in parts.iter_mut().zip(tokens) {
        *slot = token.trim().parse().map_err(|_err| RatioError::NotAPercentage {
            token: token.to_owned(),
        })?;
    }
    let sum = parts.iter().try_fold(0_u32, |acc, p| acc.checked_add(*p));
    match sum {
        Some(100) => Ok(parts),
        Some(sum) => Err(RatioError::Sum { sum }),
        None => Err(RatioError::Sum { sum: u32::MAX }),
    }
}

/// Male/female split in whole percent, e.g. `50,50`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenderRatio {
    /// Percentage of males.
    pub male: u32,
    /// Percentage of females.
    pub female: u32,
}

impl GenderRatio {
    /// Parse `male,female`.
    ///
    /// # Errors
    ///
    /// Returns a [`RatioError`] unless there are exactly two whole
    /// percentages summing to 100.
    pub fn parse(text: &str) -> Result<Self, RatioError> {
        let [male, female] = percentages::<2>(text)?;
        Ok(Self { male, female })
    }

    /// Draw one sex with probability proportional to the split.
    pub fn draw<R: Rng>(self, rng: &mut R) -> Sex {
        if rng.random_range(0..100) < self.male {
            Sex::Male
        } else {
            Sex::Female
        }
    }

    /// Split `count` seats between the sexes.
    ///
    /// The whole-seat share of each sex is assigned exactly; only a
    /// leftover seat (when `count * percent` is not a multiple of 100) is
    /// drawn. Males come first in the returned list.
    pub fn apportion<R: Rng>(self, count: u32, rng: &mut R) -> Vec<Sex> {
        let count_u64 = u64::from(count);
        let males = count_u64.saturating_mul(u64::from(self.male)) / 100;
        let females = count_u64.saturating_mul(u64::from(self.female)) / 100;
        let leftover = count_u64.saturating_sub(males.saturating_add(females));

        let mut sexes = Vec::with_capacity(usize::try_from(count).unwrap_or(0));
        let mut extra_males = 0_u64;
        let mut extra_females = 0_u64;
        for _ in 0..leftover {
            match self.draw(rng) {
                Sex::Male => extra_males = extra_males.saturating_add(1),
                Sex::Female => extra_females = extra_females.saturating_add(1),
            }
        }
        for _ in 0..males.saturating_add(extra_males) {
            sexes.push(Sex::Male);
        }
        for _ in 0..females.saturating_add(extra_females) {
            sexes.push(Sex::Female);
        }
        sexes
    }
}

/// Heterosexual/homosexual/bisexual split in whole percent, e.g. `90,6,4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrientationRatio {
    /// Percentage of heterosexual colonists.
    pub heterosexual: u32,
    /// Percentage of homosexual colonists.
    pub homosexual: u32,
    /// Percentage of bisexual colonists.
    pub bisexual: u32,
}

impl OrientationRatio {
    /// Parse `heterosexual,homosexual,bisexual`.
    ///
    /// # Errors
    ///
    /// Returns a [`RatioError`] unless there are exactly three whole
    /// percentages summing to 100.
    pub fn parse(text: &str) -> Result<Self, RatioError> {
        let [heterosexual, homosexual, bisexual] = percentages::<3>(text)?;
        Ok(Self {
            heterosexual,
            homosexual,
            bisexual,
        })
    }

    /// Draw one orientation with probability proportional to the split.
    pub fn draw<R: Rng>(self, rng: &mut R) -> Orientation {
        let roll = rng.random_range(0..100_u32);
        if roll < self.heterosexual {
            Orientation::Heterosexual
        } else if roll < self.heterosexual.saturating_add(self.homosexual) {
            Orientation::Homosexual
        } else {
            Orientation::Bisexual
        }
    }
}

/// Every demographic parameter of a run, compiled and validated.
#[derive(Debug, Clone)]
pub struct ColonyRules {
    /// Astronaut age at landing, in earth years.
    pub astronaut_age_years: Sampler,
    /// Sex split on every ship.
    pub astronaut_gender: GenderRatio,
    /// Astronaut lifespan law.
    pub astronaut_life: LifeExpectancy,
    /// Sex split of newborns.
    pub martian_gender: GenderRatio,
    /// Newborn lifespan law.
    pub martian_life: LifeExpectancy,
    /// Orientation split for everybody.
    pub orientation: OrientationRatio,
    /// Sols between missions.
    pub mission_lands: Sampler,
    /// Ships in the initial mission.
    pub ships_per_initial_mission: Sampler,
    /// Ships in every later mission.
    pub ships_per_mission: Sampler,
    /// Settlers per ship in the initial mission.
    pub settlers_per_initial_ship: Sampler,
    /// Settlers per ship in every later mission.
    pub settlers_per_ship: Sampler,
    /// Daily chance that a single adult looks for a partner.
    pub pairing: Bernoulli,
    /// Daily chance that an eligible relationship has a child.
    pub birth: Bernoulli,
    /// Sols from formation to the first possible birth.
    pub first_child_delay: Sampler,
    /// Sols between consecutive births in one relationship.
    pub sols_between_siblings: Sampler,
    /// Planned relationship length in sols.
    pub relationship_length: Sampler,
    /// Largest allowed age gap between partners, in earth years.
    pub partner_max_age_difference_years: u32,
    /// Generations searched for a shared ancestor.
    pub common_ancestor_generations: u32,
    /// Whether IVF extends fertility and lets female couples conceive.
    pub use_ivf: bool,
    /// Table backing `cdc:` lifespans.
    pub life_table: LifeTable,
}

impl ColonyRules {
    /// Minimum pairing age in sols.
    pub fn adult_age_sols() -> i64 {
        years_to_sols(ADULT_AGE_YEARS)
    }

    /// Largest allowed age gap between partners in sols.
    pub fn max_age_difference_sols(&self) -> i64 {
        years_to_sols(f64::from(self.partner_max_age_difference_years))
    }

    /// Fertile window `[start, end]` in sols of age.
    pub fn fertile_window_sols(&self) -> (i64, i64) {
        let upper = if self.use_ivf {
            IVF_FERTILE_MAX_YEARS
        } else {
            FERTILE_MAX_YEARS
        };
        (years_to_sols(FERTILE_MIN_YEARS), years_to_sols(upper))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod test_support {
    //! Shared rules fixture for the phase tests.

    use super::*;

    const ASSET: &str = include_str!("../../../assets/cdc-life-table.yaml");

    /// Rules matching the generator defaults, with fixed 80-year lifespans
    /// so tests are not at the mercy of the life table.
    pub(crate) fn rules() -> ColonyRules {
        let sampler = |s: &str| Sampler::parse(s).unwrap();
        ColonyRules {
            astronaut_age_years: sampler("randrange:32,46"),
            astronaut_gender: GenderRatio { male: 50, female: 50 },
            astronaut_life: LifeExpectancy::parse("randint:80,80").unwrap(),
            martian_gender: GenderRatio { male: 50, female: 50 },
            martian_life: LifeExpectancy::parse("randint:80,80").unwrap(),
            orientation: OrientationRatio {
                heterosexual: 90,
                homosexual: 6,
                bisexual: 4,
            },
            mission_lands: sampler("randint:759,759"),
            ships_per_initial_mission: sampler("randint:1,1"),
            ships_per_mission: sampler("randint:1,1"),
            settlers_per_initial_ship: sampler("randint:20,20"),
            settlers_per_ship: sampler("randint:40,40"),
            pairing: Bernoulli::new(0.01).unwrap(),
            birth: Bernoulli::new(0.25).unwrap(),
            first_child_delay: sampler("randint:350,700"),
            sols_between_siblings: sampler("triangle:300,700,1200"),
            relationship_length: sampler("triangle:28,1031,30752"),
            partner_max_age_difference_years: 20,
            common_ancestor_generations: 5,
            use_ivf: false,
            life_table: LifeTable::parse(ASSET).unwrap(),
        }
    }
}
