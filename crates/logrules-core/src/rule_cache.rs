//! Per-thread memo of which rules are active.
//!
//! The cache records, for one rule-set generation, which rules have been
//! evaluated against the owning thread's attributes and which of those were
//! active. A generation is identified by the sequence number the rule owner
//! hands out with each [`RuleSnapshot`](crate::category::RuleSnapshot); the
//! cache trusts that a given sequence number always denotes the same rules.
//!
//! Invariant: `active ⊆ evaluated`.

use std::fmt;

use tracing::trace;

use crate::attribute::AttributeContainer;
use crate::mask::RuleMask;
use crate::print::Printer;
use crate::rule::RuleCollection;

/// Evaluated and active rule masks for one generation of the rule set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleEvaluationCache {
    evaluated: RuleMask,
    active: RuleMask,
    /// `None` until the first update.
    sequence: Option<u64>,
}

impl RuleEvaluationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether every rule in `mask` has been evaluated for generation
    /// `sequence`. The two mask accessors are only meaningful when this
    /// holds.
    pub fn is_data_available(&self, sequence: u64, mask: RuleMask) -> bool {
        self.sequence == Some(sequence) && mask.is_subset_of(self.evaluated)
    }

    /// Rules evaluated and found active in the cached generation.
    pub fn known_active_rules(&self) -> RuleMask {
        self.active
    }

    /// Rules evaluated in the cached generation.
    pub fn evaluated_rules(&self) -> RuleMask {
        self.evaluated
    }

    /// Generation of the cached data, `None` if never updated since the last
    /// clear.
    pub fn sequence_number(&self) -> Option<u64> {
        self.sequence
    }

    /// Forget everything. Required whenever the attributes the cached
    /// answers were computed from change.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Evaluate every rule in `relevant` not yet evaluated for `sequence`
    /// and return the active subset of `relevant`.
    ///
    /// A different `sequence` than the cached one discards all cached
    /// results first. `rules` must be exactly generation `sequence`.
    pub fn update<R>(
        &mut self,
        sequence: u64,
        relevant: RuleMask,
        rules: &R,
        attributes: &dyn AttributeContainer,
    ) -> RuleMask
    where
        R: RuleCollection + ?Sized,
    {
        if self.sequence != Some(sequence) {
            trace!(
                cached = ?self.sequence,
                sequence,
                "rule generation changed, discarding cached evaluations"
            );
            self.evaluated = RuleMask::EMPTY;
            self.active = RuleMask::EMPTY;
            self.sequence = Some(sequence);
        }

        let pending = relevant.difference(self.evaluated);
        for index in pending {
            if rules.is_rule_active(index, attributes) {
                self.active.set(index);
            }
        }
        self.evaluated |= pending;

        debug_assert!(self.active.is_subset_of(self.evaluated));
        self.active & relevant
    }

    /// Debug dump; see [`print`](crate::print) for the formatting contract.
    pub fn print(&self, out: &mut dyn fmt::Write, level: i32, spaces_per_level: i32) -> fmt::Result {
        let mut printer = Printer::new(out, level, spaces_per_level);
        printer.start()?;
        match self.sequence {
            Some(sequence) => printer.field("sequence number", &sequence)?,
            None => printer.field("sequence number", &"none")?,
        }
        printer.field("evaluated rules", &self.evaluated)?;
        printer.field("active rules", &self.active)?;
        printer.end()
    }
}

impl fmt::Display for RuleEvaluationCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.print(f, 0, -1)
    }
}
