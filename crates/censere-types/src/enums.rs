//! Enumeration types for the Censere colony simulation.
//!
//! Every enum here is stored as lowercase text in the database. The
//! [`core::fmt::Display`] and [`core::str::FromStr`] impls are the single
//! mapping between the two.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Failure to map a stored string back to an enum value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value:?}")]
pub struct ParseEnumError {
    /// Name of the enum being parsed.
    pub kind: &'static str,
    /// The text that did not match any variant.
    pub value: String,
}

/// Implements `as_str`, `Display`, and `FromStr` for a fieldless enum.
macro_rules! text_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Stable lowercase name used in storage and logs.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ParseEnumError {
                        kind: $kind,
                        value: other.to_owned(),
                    }),
                }
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Colonist attributes
// ---------------------------------------------------------------------------

/// Biological sex of a colonist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Sex {
    /// Male colonist.
    Male,
    /// Female colonist.
    Female,
}

text_enum!(Sex, "sex", { Male => "male", Female => "female" });

/// Sexual orientation, which decides which partners a colonist accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Orientation {
    /// Accepts partners of the other sex.
    Heterosexual,
    /// Accepts partners of the same sex.
    Homosexual,
    /// Accepts partners of either sex.
    Bisexual,
}

text_enum!(Orientation, "orientation", {
    Heterosexual => "heterosexual",
    Homosexual => "homosexual",
    Bisexual => "bisexual",
});

impl Orientation {
    /// Whether a colonist of sex `own` with this orientation would accept a
    /// partner of sex `other`.
    pub fn accepts(self, own: Sex, other: Sex) -> bool {
        match self {
            Self::Heterosexual => own != other,
            Self::Homosexual => own == other,
            Self::Bisexual => true,
        }
    }
}

/// How a colonist came to be in the colony.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Origin {
    /// Arrived on a ship.
    Astronaut,
    /// Born in the colony.
    Martian,
}

text_enum!(Origin, "origin", { Astronaut => "astronaut", Martian => "martian" });

// ---------------------------------------------------------------------------
// Relationships
// ---------------------------------------------------------------------------

/// Kind of a relationship, derived from the members' sexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum RelationshipKind {
    /// Members differ in sex.
    Heterosexual,
    /// Members share a sex.
    Homosexual,
}

text_enum!(RelationshipKind, "relationship kind", {
    Heterosexual => "heterosexual",
    Homosexual => "homosexual",
});

impl RelationshipKind {
    /// Classify a pair by the sexes of its members.
    pub fn for_pair(a: Sex, b: Sex) -> Self {
        if a == b {
            Self::Homosexual
        } else {
            Self::Heterosexual
        }
    }
}

/// Why a relationship ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum RelationshipEnd {
    /// Its planned duration ran out.
    Expired,
    /// One of the members died.
    Death,
}

text_enum!(RelationshipEnd, "relationship end", { Expired => "expired", Death => "death" });

// ---------------------------------------------------------------------------
// Run limits
// ---------------------------------------------------------------------------

/// Which quantity bounds a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum LimitKind {
    /// Stop once the current sol reaches the limit count.
    Sols,
    /// Stop once the living population reaches the limit count.
    Population,
}

text_enum!(LimitKind, "limit", { Sols => "sols", Population => "population" });

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_roundtrip() {
        for sex in [Sex::Male, Sex::Female] {
            assert_eq!(sex.as_str().parse::<Sex>(), Ok(sex));
        }
        assert_eq!("bisexual".parse::<Orientation>(), Ok(Orientation::Bisexual));
        assert_eq!(LimitKind::Population.to_string(), "population");
    }

    #[test]
    fn unknown_text_is_rejected() {
        let err = "Male".parse::<Sex>();
        assert_eq!(
            err,
            Err(ParseEnumError {
                kind: "sex",
                value: "Male".to_owned(),
            })
        );
    }

    #[test]
    fn orientation_acceptance() {
        assert!(Orientation::Heterosexual.accepts(Sex::Male, Sex::Female));
        assert!(!Orientation::Heterosexual.accepts(Sex::Female, Sex::Female));
        assert!(Orientation::Homosexual.accepts(Sex::Female, Sex::Female));
        assert!(!Orientation::Homosexual.accepts(Sex::Male, Sex::Female));
        assert!(Orientation::Bisexual.accepts(Sex::Male, Sex::Male));
    }

    #[test]
    fn limit_kind_deserializes_lowercase() {
        let kind: Result<LimitKind, _> = serde_json::from_str("\"sols\"");
        assert_eq!(kind.ok(), Some(LimitKind::Sols));
    }

    #[test]
    fn relationship_kind_for_pair() {
        assert_eq!(
            RelationshipKind::for_pair(Sex::Male, Sex::Female),
            RelationshipKind::Heterosexual
        );
        assert_eq!(
            RelationshipKind::for_pair(Sex::Female, Sex::Female),
            RelationshipKind::Homosexual
        );
    }
}
