//! Actuarial life table and stochastic life-expectancy draws.
//!
//! The table maps (sex, exact age in years) to expected remaining years of
//! life. It is a configuration asset (`assets/cdc-life-table.yaml` by
//! default) rather than data compiled into the engine.
//!
//! A draw is never a plain lookup: the remaining years are sampled from a
//! normal distribution centred on the table value with a standard deviation
//! of [`SPREAD`] times that value, so two colonists of the same age and sex
//! get different lifespans.

use std::path::Path;

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::Deserialize;

use censere_types::Sex;

use crate::distribution::{DistributionSpec, Sampler};
use crate::earth::{sols_to_years, years_to_sols};
use crate::error::{LifeTableError, SpecError};

/// Standard deviation of a draw relative to the table value.
pub const SPREAD: f64 = 0.1;

/// One row of the table.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LifeTableRow {
    /// Exact age in years.
    pub age: u32,
    /// Expected remaining years for males.
    pub male: f64,
    /// Expected remaining years for females.
    pub female: f64,
}

impl LifeTableRow {
    const fn remaining(&self, sex: Sex) -> f64 {
        match sex {
            Sex::Male => self.male,
            Sex::Female => self.female,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LifeTableFile {
    #[serde(default)]
    source: Option<String>,
    rows: Vec<LifeTableRow>,
}

/// A validated life table.
#[derive(Debug, Clone, PartialEq)]
pub struct LifeTable {
    rows: Vec<LifeTableRow>,
}

impl LifeTable {
    /// Build a table from rows sorted by strictly increasing age.
    ///
    /// # Errors
    ///
    /// Returns [`LifeTableError::Invalid`] if the rows are empty, unsorted,
    /// or hold negative or non-finite values.
    pub fn new(rows: Vec<LifeTableRow>) -> Result<Self, LifeTableError> {
        let Some(first) = rows.first() else {
            return Err(LifeTableError::Invalid {
                reason: "table has no rows".to_owned(),
            });
        };
        if first.age != 0 {
            return Err(LifeTableError::Invalid {
                reason: format!("first row must be age 0, found {}", first.age),
            });
        }
        for pair in rows.windows(2) {
            if let [a, b] = pair
                && a.age >= b.age
            {
                return Err(LifeTableError::Invalid {
                    reason: format!("ages must increase, found {} then {}", a.age, b.age),
                });
            }
        }
        if let Some(bad) = rows.iter().find(|r| {
            !r.male.is_finite() || !r.female.is_finite() || r.male < 0.0 || r.female < 0.0
        }) {
            return Err(LifeTableError::Invalid {
                reason: format!("age {} has a negative or non-finite value", bad.age),
            });
        }
        Ok(Self { rows })
    }

    /// Parse a table from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`LifeTableError::Yaml`] for malformed YAML or
    /// [`LifeTableError::Invalid`] for unusable rows.
    pub fn parse(yaml: &str) -> Result<Self, LifeTableError> {
        let file: LifeTableFile = serde_yml::from_str(yaml)?;
        let table = Self::new(file.rows)?;
        tracing::debug!(
            source = file.source.as_deref().unwrap_or("unspecified"),
            rows = table.rows.len(),
            max_age = table.max_age(),
            "Loaded life table"
        );
        Ok(table)
    }

    /// Load a table from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`LifeTableError::Io`] if the file cannot be read, otherwise
    /// the errors of [`LifeTable::parse`].
    pub fn from_file(path: &Path) -> Result<Self, LifeTableError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Oldest age the table covers.
    pub fn max_age(&self) -> u32 {
        self.rows.last().map_or(0, |r| r.age)
    }

    /// Expected remaining years for a colonist of `sex` aged `age_years`,
    /// linearly interpolated between rows.
    ///
    /// # Errors
    ///
    /// Returns [`LifeTableError::AgeOutOfRange`] for negative ages or ages
    /// past the last row.
    pub fn expected_remaining_years(&self, sex: Sex, age_years: f64) -> Result<f64, LifeTableError> {
        let out_of_range = || LifeTableError::AgeOutOfRange {
            sex,
            age_years,
            max_age: self.max_age(),
        };
        if age_years.is_nan() || age_years < 0.0 {
            return Err(out_of_range());
        }
        for pair in self.rows.windows(2) {
            if let [lo, hi] = pair {
                let lo_age = f64::from(lo.age);
                let hi_age = f64::from(hi.age);
                if age_years >= lo_age && age_years <= hi_age {
                    let t = (age_years - lo_age) / (hi_age - lo_age);
                    let (a, b) = (lo.remaining(sex), hi.remaining(sex));
                    return Ok(t.mul_add(b - a, a));
                }
            }
        }
        // Single-row tables and the exact last age.
        match self.rows.last() {
            Some(last) if (age_years - f64::from(last.age)).abs() < f64::EPSILON => {
                Ok(last.remaining(sex))
            }
            _ => Err(out_of_range()),
        }
    }

    /// Draw the remaining lifespan in sols for a colonist of `sex` who is
    /// `age_sols` old.
    ///
    /// # Errors
    ///
    /// Returns [`LifeTableError::AgeOutOfRange`] if the age is not covered.
    pub fn sample_life_expectancy<R: Rng>(
        &self,
        sex: Sex,
        age_sols: i64,
        rng: &mut R,
    ) -> Result<i64, LifeTableError> {
        let mean = self.expected_remaining_years(sex, sols_to_years(age_sols))?;
        let normal = Normal::new(mean, mean * SPREAD).map_err(|e| LifeTableError::Invalid {
            reason: format!("cannot sample around {mean}: {e}"),
        })?;
        let years = normal.sample(rng).max(0.0);
        Ok(years_to_sols(years))
    }
}

// ---------------------------------------------------------------------------
// LifeExpectancy
// ---------------------------------------------------------------------------

/// How a population draws its lifespans.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LifeExpectancy {
    /// Remaining years drawn from the life table (`cdc:`).
    Table,
    /// Total lifespan in earth years drawn from a sampler.
    Years(Sampler),
}

impl LifeExpectancy {
    /// Compile a life expectancy option.
    ///
    /// # Errors
    ///
    /// Returns a [`SpecError`] if the spec is malformed.
    pub fn parse(spec: &str) -> Result<Self, SpecError> {
        match DistributionSpec::parse(spec)? {
            DistributionSpec::Cdc => Ok(Self::Table),
            other => Sampler::from_spec(&other).map(Self::Years),
        }
    }

    /// Total lifespan in sols, counted from birth, for a colonist of `sex`
    /// who is `age_sols` old at creation.
    ///
    /// # Errors
    ///
    /// Returns a [`LifeTableError`] if the table does not cover the age.
    pub fn lifespan_sols<R: Rng>(
        &self,
        table: &LifeTable,
        sex: Sex,
        age_sols: i64,
        rng: &mut R,
    ) -> Result<i64, LifeTableError> {
        match self {
            Self::Table => {
                let remaining = table.sample_life_expectancy(sex, age_sols, rng)?;
                Ok(age_sols.saturating_add(remaining))
            }
            Self::Years(sampler) => {
                let years = sampler.sample(rng).max(0);
                let years = i32::try_from(years).map_or(f64::from(i32::MAX), f64::from);
                Ok(years_to_sols(years))
            }
        }
    }
}
