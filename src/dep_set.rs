//! Dependency sets (C1): which branching levels a fact depends on.
//!
//! A dep-set is a set of branching levels. Union is idempotent and the
//! maximum element tells the engine where to backjump to. Levels are
//! small and dense (one per nondeterministic split so far), so a bitset
//! is the natural representation, matching the teacher's preference for
//! `bit-set`-backed collections over node/edge bitmaps elsewhere in its
//! tableaux module.

use bit_set::BitSet;
use std::fmt;

/// A branching level: a monotonically increasing integer assigned on
/// each nondeterministic split. Level 0 is the initial state.
pub type Level = usize;

/// Set of branching levels a fact depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepSet {
    levels: BitSet,
}

impl DepSet {
    /// The empty dep-set (an unconditional fact).
    pub fn empty() -> Self {
        DepSet {
            levels: BitSet::new(),
        }
    }

    /// A dep-set depending on a single level.
    pub fn singleton(level: Level) -> Self {
        let mut levels = BitSet::new();
        levels.insert(level);
        DepSet { levels }
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Does this dep-set mention `level`?
    pub fn mentions(&self, level: Level) -> bool {
        self.levels.contains(level)
    }

    pub fn insert(&mut self, level: Level) {
        self.levels.insert(level);
    }

    /// The maximum level mentioned, used to choose a backjump target.
    /// `None` for the empty dep-set (nothing to jump to; a clash with
    /// an empty dep-set is a proof of global unsatisfiability).
    pub fn max_level(&self) -> Option<Level> {
        self.levels.iter().max()
    }

    /// Union, idempotent by construction (bitset union).
    pub fn union(&self, other: &DepSet) -> DepSet {
        let mut levels = self.levels.clone();
        levels.union_with(&other.levels);
        DepSet { levels }
    }

    pub fn union_with(&mut self, other: &DepSet) {
        self.levels.union_with(&other.levels);
    }

    /// `self` dominates `other` iff every level `other` depends on is
    /// also a dependency of `self` — i.e. `other`'s fact is at least as
    /// well supported, so re-adding it under `self` would be a no-op
    /// (saturation idempotence, spec.md §8 Laws).
    pub fn dominates(&self, other: &DepSet) -> bool {
        other.levels.is_subset(&self.levels)
    }

    /// Drop every level `>= floor` — used when restoring to a prior
    /// branching level: dep-sets that survive a rollback can no longer
    /// mention levels above the restored one.
    pub fn truncate(&mut self, floor: Level) {
        let dropped: Vec<Level> = self.levels.iter().filter(|&l| l >= floor).collect();
        for l in dropped {
            self.levels.remove(l);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Level> + '_ {
        self.levels.iter()
    }
}

impl fmt::Display for DepSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        let mut first = true;
        for l in self.levels.iter() {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{l}")?;
            first = false;
        }
        write!(f, "}}")
    }
}

impl FromIterator<Level> for DepSet {
    fn from_iter<I: IntoIterator<Item = Level>>(iter: I) -> Self {
        let mut levels = BitSet::new();
        for l in iter {
            levels.insert(l);
        }
        DepSet { levels }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_is_idempotent() {
        let a = DepSet::singleton(1);
        let b = a.union(&a);
        assert_eq!(a, b);
    }

    #[test]
    fn max_level_picks_backjump_target() {
        let d: DepSet = [0, 2, 1].into_iter().collect();
        assert_eq!(d.max_level(), Some(2));
        assert_eq!(DepSet::empty().max_level(), None);
    }

    #[test]
    fn dominates_models_saturation_idempotence() {
        let wide = DepSet::singleton(0).union(&DepSet::singleton(1));
        let narrow = DepSet::singleton(0);
        assert!(wide.dominates(&narrow));
        assert!(!narrow.dominates(&wide));
    }

    #[test]
    fn truncate_drops_levels_above_floor() {
        let mut d: DepSet = [0, 1, 2, 3].into_iter().collect();
        d.truncate(2);
        assert!(d.mentions(0));
        assert!(d.mentions(1));
        assert!(!d.mentions(2));
        assert!(!d.mentions(3));
    }
}
