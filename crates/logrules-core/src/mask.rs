//! Fixed-width bitset of rule indices.

use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

/// Maximum number of rules a [`RuleSet`](crate::rule::RuleSet) can hold:
/// one bit of [`RuleMask`] per rule.
pub const MAX_RULES: usize = u64::BITS as usize;

/// A set of rule indices in `0..MAX_RULES`.
///
/// Indices at or beyond [`MAX_RULES`] are a contract violation: they trip a
/// debug assertion and are otherwise ignored (the bit is never set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RuleMask(u64);

impl RuleMask {
    pub const EMPTY: RuleMask = RuleMask(0);

    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    fn bit(index: usize) -> u64 {
        debug_assert!(index < MAX_RULES, "rule index {index} out of range");
        u32::try_from(index)
            .ok()
            .and_then(|shift| 1u64.checked_shl(shift))
            .unwrap_or(0)
    }

    /// Mask with only `index` set.
    pub fn single(index: usize) -> Self {
        Self(Self::bit(index))
    }

    pub fn set(&mut self, index: usize) {
        self.0 |= Self::bit(index);
    }

    pub fn clear(&mut self, index: usize) {
        self.0 &= !Self::bit(index);
    }

    pub fn contains(self, index: usize) -> bool {
        index < MAX_RULES && self.0 & Self::bit(index) != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of set bits.
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Bits set in `self` but not in `other`.
    pub const fn difference(self, other: RuleMask) -> RuleMask {
        RuleMask(self.0 & !other.0)
    }

    pub const fn is_subset_of(self, other: RuleMask) -> bool {
        self.0 & !other.0 == 0
    }

    /// Set indices in ascending order.
    pub fn iter(self) -> Indices {
        Indices(self.0)
    }
}

/// Iterator over the set indices of a [`RuleMask`], lowest first.
#[derive(Debug, Clone)]
pub struct Indices(u64);

impl Iterator for Indices {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.0 == 0 {
            return None;
        }
        let index = self.0.trailing_zeros() as usize;
        self.0 &= self.0 - 1;
        Some(index)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.0.count_ones() as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for Indices {}

impl IntoIterator for RuleMask {
    type Item = usize;
    type IntoIter = Indices;

    fn into_iter(self) -> Indices {
        self.iter()
    }
}

impl FromIterator<usize> for RuleMask {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut mask = RuleMask::EMPTY;
        for index in iter {
            mask.set(index);
        }
        mask
    }
}

impl BitOr for RuleMask {
    type Output = RuleMask;

    fn bitor(self, rhs: RuleMask) -> RuleMask {
        RuleMask(self.0 | rhs.0)
    }
}

impl BitOrAssign for RuleMask {
    fn bitor_assign(&mut self, rhs: RuleMask) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for RuleMask {
    type Output = RuleMask;

    fn bitand(self, rhs: RuleMask) -> RuleMask {
        RuleMask(self.0 & rhs.0)
    }
}

impl BitAndAssign for RuleMask {
    fn bitand_assign(&mut self, rhs: RuleMask) {
        self.0 &= rhs.0;
    }
}

impl Not for RuleMask {
    type Output = RuleMask;

    fn not(self) -> RuleMask {
        RuleMask(!self.0)
    }
}

impl fmt::Display for RuleMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl fmt::Binary for RuleMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Binary::fmt(&self.0, f)
    }
}
