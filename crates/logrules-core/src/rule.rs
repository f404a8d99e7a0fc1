//! Rule engine: name patterns, attribute predicates, and the rule set.
//!
//! A [`Rule`] pairs a category-name pattern with a set of [`Predicate`]s and
//! four threshold levels. A rule is *relevant* to a category when its
//! pattern matches the category name, and *active* when every predicate is
//! satisfied by the current thread's attributes.
//!
//! Rules live in a [`RuleSet`] at stable indices so that a [`RuleMask`] can
//! describe any subset of them.

use std::collections::BTreeSet;
use std::fmt;

use crate::attribute::{Attribute, AttributeContainer, AttributeValue};
use crate::mask::{MAX_RULES, RuleMask};
use crate::threshold::ThresholdLevels;

/// Errors from rule-set mutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleSetError {
    #[error("rule set is full ({MAX_RULES} rules)")]
    Full,

    #[error("an identical rule already exists at index {0}")]
    Duplicate(usize),
}

/// Requires an attribute with this exact name and value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Predicate {
    attribute: Attribute,
}

impl Predicate {
    pub fn new(name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self {
            attribute: Attribute::new(name, value),
        }
    }

    pub fn attribute(&self) -> &Attribute {
        &self.attribute
    }

    pub fn is_satisfied(&self, attributes: &dyn AttributeContainer) -> bool {
        attributes.has_value(&self.attribute)
    }
}

impl From<Attribute> for Predicate {
    fn from(attribute: Attribute) -> Self {
        Self { attribute }
    }
}

/// A single rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rule {
    pattern: String,
    predicates: BTreeSet<Predicate>,
    thresholds: ThresholdLevels,
}

impl Rule {
    /// Create a rule with no predicates (active whenever relevant).
    pub fn new(pattern: impl Into<String>, thresholds: ThresholdLevels) -> Self {
        Self {
            pattern: pattern.into(),
            predicates: BTreeSet::new(),
            thresholds,
        }
    }

    /// Add a predicate.
    pub fn with_predicate(mut self, predicate: impl Into<Predicate>) -> Self {
        self.predicates.insert(predicate.into());
        self
    }

    pub fn add_predicate(&mut self, predicate: impl Into<Predicate>) -> bool {
        self.predicates.insert(predicate.into())
    }

    pub fn remove_predicate(&mut self, predicate: &Predicate) -> bool {
        self.predicates.remove(predicate)
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn predicates(&self) -> impl Iterator<Item = &Predicate> {
        self.predicates.iter()
    }

    pub fn thresholds(&self) -> ThresholdLevels {
        self.thresholds
    }

    /// Whether this rule is relevant to the category `name`.
    pub fn is_match(&self, name: &str) -> bool {
        pattern_matches(&self.pattern, name)
    }

    /// Whether every predicate is satisfied by `attributes`.
    pub fn evaluate(&self, attributes: &dyn AttributeContainer) -> bool {
        self.predicates.iter().all(|p| p.is_satisfied(attributes))
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[ pattern = {:?} thresholds = {} predicates = [", self.pattern, self.thresholds)?;
        for predicate in &self.predicates {
            write!(f, " {}", predicate.attribute)?;
        }
        f.write_str(" ] ]")
    }
}

/// Match a category name against a rule pattern.
///
/// Characters match literally, except that a trailing unescaped `*` matches
/// any suffix (including the empty one), `\*` matches a literal `*`, and
/// `\\` matches a literal `\`. A `*` anywhere but the end is literal.
pub fn pattern_matches(pattern: &str, name: &str) -> bool {
    let mut name = name.chars();
    let mut pattern = pattern.chars().peekable();
    while let Some(c) = pattern.next() {
        let literal = match c {
            '\\' => pattern.next().unwrap_or('\\'),
            '*' if pattern.peek().is_none() => return true,
            other => other,
        };
        if name.next() != Some(literal) {
            return false;
        }
    }
    name.next().is_none()
}

/// The rule-side collaborator used by the evaluation cache.
///
/// [`RuleSet`] is the production implementation; tests substitute doubles
/// that count evaluations.
pub trait RuleCollection {
    /// Number of rules present.
    fn rule_count(&self) -> usize;

    /// Indices of the rules whose pattern matches `category_name`.
    fn relevant_rules(&self, category_name: &str) -> RuleMask;

    /// Whether rule `index` exists and its predicates are all satisfied.
    fn is_rule_active(&self, index: usize, attributes: &dyn AttributeContainer) -> bool;

    /// Thresholds of rule `index`, if it exists.
    fn rule_thresholds(&self, index: usize) -> Option<ThresholdLevels>;
}

/// Up to [`MAX_RULES`] rules at stable indices.
///
/// Removing a rule frees its index for reuse; other indices never move.
/// Identical rules are stored once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    slots: Vec<Option<Rule>>,
    len: usize,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule, returning its index.
    pub fn add_rule(&mut self, rule: Rule) -> Result<usize, RuleSetError> {
        if let Some(index) = self.find(&rule) {
            return Err(RuleSetError::Duplicate(index));
        }
        let index = match self.slots.iter().position(Option::is_none) {
            Some(free) => {
                self.slots[free] = Some(rule);
                free
            }
            None if self.slots.len() < MAX_RULES => {
                self.slots.push(Some(rule));
                self.slots.len() - 1
            }
            None => return Err(RuleSetError::Full),
        };
        self.len += 1;
        Ok(index)
    }

    /// Add every rule not already present; returns how many were added.
    ///
    /// Stops at the first rule that does not fit, leaving the rules added
    /// before it in place.
    pub fn add_rules(&mut self, rules: impl IntoIterator<Item = Rule>) -> Result<usize, RuleSetError> {
        let mut added = 0;
        for rule in rules {
            match self.add_rule(rule) {
                Ok(_) => added += 1,
                Err(RuleSetError::Duplicate(_)) => {}
                Err(RuleSetError::Full) => return Err(RuleSetError::Full),
            }
        }
        Ok(added)
    }

    /// Remove the rule equal to `rule`, returning the index it occupied.
    pub fn remove_rule(&mut self, rule: &Rule) -> Option<usize> {
        let index = self.find(rule)?;
        self.remove_rule_at(index);
        Some(index)
    }

    /// Remove the rule at `index`.
    pub fn remove_rule_at(&mut self, index: usize) -> Option<Rule> {
        let removed = self.slots.get_mut(index)?.take()?;
        self.len -= 1;
        while matches!(self.slots.last(), Some(None)) {
            self.slots.pop();
        }
        Some(removed)
    }

    /// Remove every rule; returns how many were removed.
    pub fn remove_all_rules(&mut self) -> usize {
        let removed = self.len;
        self.slots.clear();
        self.len = 0;
        removed
    }

    pub fn find(&self, rule: &Rule) -> Option<usize> {
        self.slots.iter().position(|slot| slot.as_ref() == Some(rule))
    }

    pub fn get(&self, index: usize) -> Option<&Rule> {
        self.slots.get(index)?.as_ref()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// `(index, rule)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Rule)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|rule| (index, rule)))
    }
}

impl RuleCollection for RuleSet {
    fn rule_count(&self) -> usize {
        self.len
    }

    fn relevant_rules(&self, category_name: &str) -> RuleMask {
        self.iter()
            .filter(|(_, rule)| rule.is_match(category_name))
            .map(|(index, _)| index)
            .collect()
    }

    fn is_rule_active(&self, index: usize, attributes: &dyn AttributeContainer) -> bool {
        self.get(index).is_some_and(|rule| rule.evaluate(attributes))
    }

    fn rule_thresholds(&self, index: usize) -> Option<ThresholdLevels> {
        self.get(index).map(Rule::thresholds)
    }
}
