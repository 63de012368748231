//! The distribution spec language.
//!
//! Configuration expresses every stochastic quantity as a short string of
//! the form `<kind>:<arg>,<arg>,...`:
//!
//! | Spec                        | Meaning                                  |
//! |-----------------------------|------------------------------------------|
//! | `randint:a,b`               | integer uniform in `[a, b]`              |
//! | `randrange:a,b`             | integer uniform in `[a, b)`              |
//! | `triangle:low,mode,high`    | triangular, rounded to the nearest sol   |
//! | `cdc:`                      | actuarial life table (life expectancy)   |
//!
//! Strings are parsed once into a [`DistributionSpec`] and compiled into a
//! [`Sampler`]. All validation happens here; sampling cannot fail.

use core::fmt;
use core::str::FromStr;

use rand::Rng;
use rand_distr::{Distribution, Triangular};

use crate::error::SpecError;

/// A parsed distribution spec.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DistributionSpec {
    /// Integer uniform over `[low, high]`.
    RandInt {
        /// Inclusive lower bound.
        low: i64,
        /// Inclusive upper bound.
        high: i64,
    },
    /// Integer uniform over `[low, high)`.
    RandRange {
        /// Inclusive lower bound.
        low: i64,
        /// Exclusive upper bound.
        high: i64,
    },
    /// Triangular distribution.
    Triangle {
        /// Lower limit.
        low: f64,
        /// Most likely value.
        mode: f64,
        /// Upper limit.
        high: f64,
    },
    /// The actuarial life table.
    Cdc,
}

impl DistributionSpec {
    /// Parse a spec string.
    ///
    /// # Errors
    ///
    /// Returns a [`SpecError`] naming the spec if it is malformed.
    pub fn parse(spec: &str) -> Result<Self, SpecError> {
        if spec.chars().any(char::is_whitespace) {
            return Err(SpecError::Whitespace {
                spec: spec.to_owned(),
            });
        }
        let (kind, args) = spec.split_once(':').ok_or_else(|| SpecError::MissingSeparator {
            spec: spec.to_owned(),
        })?;
        let tokens: Vec<&str> = if args.is_empty() {
            Vec::new()
        } else {
            args.split(',').collect()
        };

        match kind {
            "randint" => {
                let [low, high] = integers(spec, "randint", &tokens)?;
                if low > high {
                    return Err(SpecError::EmptyRange {
                        spec: spec.to_owned(),
                    });
                }
                Ok(Self::RandInt { low, high })
            }
            "randrange" => {
                let [low, high] = integers(spec, "randrange", &tokens)?;
                if low >= high {
                    return Err(SpecError::EmptyRange {
                        spec: spec.to_owned(),
                    });
                }
                Ok(Self::RandRange { low, high })
            }
            "triangle" => {
                let [low, mode, high] = reals(spec, &tokens)?;
                if low > mode || mode > high {
                    return Err(SpecError::TriangleOrder {
                        spec: spec.to_owned(),
                    });
                }
                Ok(Self::Triangle { low, mode, high })
            }
            "cdc" => {
                if !tokens.is_empty() {
                    return Err(SpecError::ArgumentCount {
                        spec: spec.to_owned(),
                        kind: "cdc",
                        expected: 0,
                        found: tokens.len(),
                    });
                }
                Ok(Self::Cdc)
            }
            other => Err(SpecError::UnknownKind {
                spec: spec.to_owned(),
                kind: other.to_owned(),
            }),
        }
    }
}

impl FromStr for DistributionSpec {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DistributionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RandInt { low, high } => write!(f, "randint:{low},{high}"),
            Self::RandRange { low, high } => write!(f, "randrange:{low},{high}"),
            Self::Triangle { low, mode, high } => write!(f, "triangle:{low},{mode},{high}"),
            Self::Cdc => f.write_str("cdc:"),
        }
    }
}

fn integers(spec: &str, kind: &'static str, tokens: &[&str]) -> Result<[i64; 2], SpecError> {
    let [a, b] = tokens else {
        return Err(SpecError::ArgumentCount {
            spec: spec.to_owned(),
            kind,
            expected: 2,
            found: tokens.len(),
        });
    };
    Ok([integer(spec, a)?, integer(spec, b)?])
}

fn integer(spec: &str, token: &str) -> Result<i64, SpecError> {
    token.parse().map_err(|_err| SpecError::NotANumber {
        spec: spec.to_owned(),
        token: token.to_owned(),
    })
}

fn reals(spec: &str, tokens: &[&str]) -> Result<[f64; 3], SpecError> {
    let [a, b, c] = tokens else {
        return Err(SpecError::ArgumentCount {
            spec: spec.to_owned(),
            kind: "triangle",
            expected: 3,
            found: tokens.len(),
        });
    };
    Ok([real(spec, a)?, real(spec, b)?, real(spec, c)?])
}

fn real(spec: &str, token: &str) -> Result<f64, SpecError> {
    token
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| SpecError::NotANumber {
            spec: spec.to_owned(),
            token: token.to_owned(),
        })
}

// ---------------------------------------------------------------------------
// Sampler
// ---------------------------------------------------------------------------

/// A compiled, samplable distribution yielding integer sol or year counts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sampler {
    /// Integer uniform over `[low, high]`.
    RandInt {
        /// Inclusive lower bound.
        low: i64,
        /// Inclusive upper bound.
        high: i64,
    },
    /// Integer uniform over `[low, high)`.
    RandRange {
        /// Inclusive lower bound.
        low: i64,
        /// Exclusive upper bound.
        high: i64,
    },
    /// Triangular distribution, rounded and clamped to `>= 0`.
    Triangle {
        /// The distribution.
        dist: Triangular<f64>,
        /// Upper bound, kept for [`Sampler::max_value`].
        high: f64,
    },
}

impl Sampler {
    /// Compile a spec into a sampler.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::NotSamplable`] for `cdc:`, which only life
    /// expectancy options accept.
    pub fn from_spec(spec: &DistributionSpec) -> Result<Self, SpecError> {
        match *spec {
            DistributionSpec::RandInt { low, high } => Ok(Self::RandInt { low, high }),
            DistributionSpec::RandRange { low, high } => Ok(Self::RandRange { low, high }),
            DistributionSpec::Triangle { low, mode, high } => Triangular::new(low, high, mode)
                .map(|dist| Self::Triangle { dist, high })
                .map_err(|_err| SpecError::TriangleOrder {
                    spec: spec.to_string(),
                }),
            DistributionSpec::Cdc => Err(SpecError::NotSamplable {
                spec: spec.to_string(),
            }),
        }
    }

    /// Parse and compile in one step.
    ///
    /// # Errors
    ///
    /// Returns a [`SpecError`] if the string is malformed or is `cdc:`.
    pub fn parse(spec: &str) -> Result<Self, SpecError> {
        Self::from_spec(&DistributionSpec::parse(spec)?)
    }

    /// Draw one value.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> i64 {
        match *self {
            Self::RandInt { low, high } => rng.random_range(low..=high),
            Self::RandRange { low, high } => rng.random_range(low..high),
            Self::Triangle { dist, .. } => round_to_count(dist.sample(rng)),
        }
    }

    /// Largest value [`Sampler::sample`] can return.
    pub fn max_value(&self) -> i64 {
        match *self {
            Self::RandInt { high, .. } => high,
            Self::RandRange { high, .. } => high.saturating_sub(1),
            Self::Triangle { high, .. } => round_to_count(high),
        }
    }
}

/// Round a real sample to the nearest non-negative integer.
#[allow(clippy::cast_possible_truncation)]
fn round_to_count(value: f64) -> i64 {
    // `as` saturates at the i64 bounds; the clamp handles the low end.
    (value.round() as i64).max(0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn parses_every_kind() {
        assert_eq!(
            DistributionSpec::parse("randint:20,40"),
            Ok(DistributionSpec::RandInt { low: 20, high: 40 })
        );
        assert_eq!(
            DistributionSpec::parse("randrange:32,46"),
            Ok(DistributionSpec::RandRange { low: 32, high: 46 })
        );
        assert!(matches!(
            DistributionSpec::parse("triangle:28,1031,30752"),
            Ok(DistributionSpec::Triangle { .. })
        ));
        assert_eq!(DistributionSpec::parse("cdc:"), Ok(DistributionSpec::Cdc));
    }

    #[test]
    fn display_roundtrips() {
        for text in ["randint:759,759", "randrange:-3,4", "triangle:300,700,1200", "cdc:"] {
            let spec = DistributionSpec::parse(text);
            assert_eq!(spec.map(|s| s.to_string()).ok().as_deref(), Some(text));
        }
    }

    #[test]
    fn malformed_specs_name_the_input() {
        let cases = [
            "randint20,40",
            "randint: 20,40",
            "uniform:1,2",
            "randint:1",
            "randint:1,2,3",
            "randint:a,2",
            "randint:1.5,2",
            "triangle:5,1,10",
            "triangle:1,2,inf",
            "randint:5,4",
            "randrange:4,4",
            "cdc:1",
            "",
        ];
        for text in cases {
            let err = DistributionSpec::parse(text);
            assert!(err.is_err(), "{text:?} should fail");
            let message = err.err().map(|e| e.to_string()).unwrap_or_default();
            assert!(message.contains(&format!("{text:?}")), "{message}");
        }
    }

    #[test]
    fn cdc_is_not_samplable() {
        assert_eq!(
            Sampler::parse("cdc:"),
            Err(SpecError::NotSamplable {
                spec: "cdc:".to_owned()
            })
        );
    }

    #[test]
    fn randint_is_inclusive() {
        let sampler = Sampler::parse("randint:3,5").unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let seen: BTreeSet<i64> = (0..1_000).map(|_| sampler.sample(&mut rng)).collect();
        assert_eq!(seen, BTreeSet::from([3, 4, 5]));
    }

    #[test]
    fn randrange_excludes_upper_bound() {
        let sampler = Sampler::parse("randrange:32,46").unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let seen: BTreeSet<i64> = (0..2_000).map(|_| sampler.sample(&mut rng)).collect();
        assert!(seen.contains(&32));
        assert!(seen.contains(&45));
        assert!(!seen.contains(&46));
        assert!(seen.iter().all(|v| (32..46).contains(v)), "{seen:?}");
    }

    #[test]
    fn triangle_mean_matches_theory() {
        let sampler = Sampler::parse("triangle:300,700,1200").unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let n: i64 = 10_000;
        let total: i64 = (0..n).map(|_| sampler.sample(&mut rng)).sum();
        let mean = total / n;
        // (300 + 700 + 1200) / 3 = 733
        assert!((713..=753).contains(&mean), "mean {mean}");
    }

    #[test]
    fn degenerate_triangle_is_constant() {
        let sampler = Sampler::parse("triangle:7,7,7").unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        assert_eq!(sampler.sample(&mut rng), 7);
    }

    #[test]
    fn max_value_is_the_largest_draw() {
        assert_eq!(Sampler::parse("randint:3,5").unwrap().max_value(), 5);
        assert_eq!(Sampler::parse("randrange:32,46").unwrap().max_value(), 45);
        assert_eq!(Sampler::parse("triangle:28,1031,30752.4").unwrap().max_value(), 30752);

        let sampler = Sampler::parse("triangle:0,1,2").unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        assert!((0..5_000).all(|_| sampler.sample(&mut rng) <= sampler.max_value()));
    }
}
