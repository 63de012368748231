//! Lineage tracking for common-ancestor checks.
//!
//! [`Lineage`] records every birth as parent/child edges and answers the
//! one question pairing needs: do two colonists share an ancestor within a
//! given number of generations?
//!
//! # Generation counting
//!
//! A colonist is their own generation 0, parents are generation 1,
//! grandparents generation 2, and so on. Two colonists "share an ancestor
//! within N generations" when their ancestor sets up to depth N (each
//! including the colonist themselves) intersect. That makes a parent/child
//! pair related at depth 1 and full siblings related at depth 1 through
//! the shared parents.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use censere_types::ColonistId;

/// Parent/child edges for the whole colony, living and dead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lineage {
    /// Child-to-parents mapping for ancestry tracing.
    child_to_parents: BTreeMap<ColonistId, BTreeSet<ColonistId>>,
}

impl Lineage {
    /// Create an empty lineage.
    pub const fn new() -> Self {
        Self {
            child_to_parents: BTreeMap::new(),
        }
    }

    /// Record the birth of a child to one or two parents.
    pub fn record_birth(&mut self, child: ColonistId, parents: &[ColonistId]) {
        for parent in parents {
            self.child_to_parents.entry(child).or_default().insert(*parent);
        }
    }

    /// Parents of a colonist (empty for astronauts).
    pub fn parents(&self, id: ColonistId) -> BTreeSet<ColonistId> {
        self.child_to_parents.get(&id).cloned().unwrap_or_default()
    }

    /// A colonist and their ancestors up to `generations` back.
    ///
    /// Breadth-first, so each ancestor is reached at its shortest depth.
    pub fn ancestors_within(&self, id: ColonistId, generations: u32) -> BTreeSet<ColonistId> {
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::new();
        seen.insert(id);
        queue.push_back((id, 0_u32));

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= generations {
                continue;
            }
            if let Some(parents) = self.child_to_parents.get(&current) {
                for parent in parents {
                    if seen.insert(*parent) {
                        queue.push_back((*parent, depth.saturating_add(1)));
                    }
                }
            }
        }

        seen
    }

    /// Whether `a` and `b` share an ancestor within `generations`.
    ///
    /// Returns `false` when `generations` is 0 unless `a == b`.
    pub fn share_ancestor(&self, a: ColonistId, b: ColonistId, generations: u32) -> bool {
        let ours = self.ancestors_within(a, generations);
        let theirs = self.ancestors_within(b, generations);
        !ours.is_disjoint(&theirs)
    }
}
