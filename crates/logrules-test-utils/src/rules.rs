//! Rule collection doubles.

use std::sync::atomic::{AtomicUsize, Ordering};

use logrules_core::{
    AttributeContainer, Rule, RuleCollection, RuleMask, RuleSet, RuleSetError, ThresholdLevels,
};

/// A [`RuleSet`] that counts how many times rule activity was evaluated.
///
/// Used to check that repeated lookups against an unchanged context are
/// served from the evaluation cache.
#[derive(Debug, Default)]
pub struct CountingRules {
    rules: RuleSet,
    evaluations: AtomicUsize,
}

impl CountingRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: impl IntoIterator<Item = Rule>) -> Result<Self, RuleSetError> {
        let mut set = RuleSet::new();
        set.add_rules(rules)?;
        Ok(Self {
            rules: set,
            evaluations: AtomicUsize::new(0),
        })
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::Relaxed)
    }

    pub fn reset_evaluations(&self) {
        self.evaluations.store(0, Ordering::Relaxed);
    }
}

impl RuleCollection for CountingRules {
    fn rule_count(&self) -> usize {
        self.rules.rule_count()
    }

    fn relevant_rules(&self, category_name: &str) -> RuleMask {
        self.rules.relevant_rules(category_name)
    }

    fn is_rule_active(&self, index: usize, attributes: &dyn AttributeContainer) -> bool {
        self.evaluations.fetch_add(1, Ordering::Relaxed);
        self.rules.is_rule_active(index, attributes)
    }

    fn rule_thresholds(&self, index: usize) -> Option<ThresholdLevels> {
        self.rules.rule_thresholds(index)
    }
}
