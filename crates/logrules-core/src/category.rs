//! Categories and the process-wide owner of the rule set.
//!
//! [`CategoryManager`] holds the shared [`RuleSet`] together with its
//! sequence number. Every structural change to the rule set bumps the
//! sequence number inside the same critical section, so a
//! [`RuleSnapshot`] always pairs a sequence number with exactly the rules it
//! describes. Readers clone an `Arc` under the read lock and evaluate
//! predicates after releasing it.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use logrules_config::{AppConfig, ConfigError};
use tracing::debug;

use crate::rule::{Predicate, Rule, RuleSet, RuleSetError};
use crate::threshold::ThresholdLevels;

/// A named logging category with its own thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Category {
    name: String,
    thresholds: ThresholdLevels,
}

impl Category {
    pub fn new(name: impl Into<String>, thresholds: ThresholdLevels) -> Self {
        Self {
            name: name.into(),
            thresholds,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn thresholds(&self) -> ThresholdLevels {
        self.thresholds
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[ name = {:?} thresholds = {} ]", self.name, self.thresholds)
    }
}

/// Errors building a [`CategoryManager`] from configuration.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("rule {index} could not be added: {source}")]
    Rules {
        index: usize,
        #[source]
        source: RuleSetError,
    },
}

/// A consistent view of the rule set: `rules` is exactly generation
/// `sequence`.
#[derive(Debug, Clone)]
pub struct RuleSnapshot {
    pub sequence: u64,
    pub rules: Arc<RuleSet>,
}

#[derive(Debug, Default)]
struct RuleState {
    rules: Arc<RuleSet>,
    sequence: u64,
}

/// Owner of the shared rule set and the category table.
#[derive(Debug)]
pub struct CategoryManager {
    rules: RwLock<RuleState>,
    categories: RwLock<HashMap<String, Arc<Category>>>,
    default_thresholds: ThresholdLevels,
}

impl CategoryManager {
    /// Create a manager with no rules and no categories.
    pub fn new(default_thresholds: ThresholdLevels) -> Self {
        Self {
            rules: RwLock::new(RuleState::default()),
            categories: RwLock::new(HashMap::new()),
            default_thresholds,
        }
    }

    /// Build rules and categories from a configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, SetupError> {
        config.validate()?;
        let manager = Self::new(ThresholdLevels::from_array(config.defaults.resolve()?));

        for category in &config.categories {
            let thresholds = config.thresholds_for(&category.name)?;
            manager.add_category(&category.name, ThresholdLevels::from_array(thresholds));
        }

        {
            let mut state = manager.write_rules();
            let rules = Arc::make_mut(&mut state.rules);
            for (index, entry) in config.rules.iter().enumerate() {
                let mut rule = Rule::new(
                    entry.pattern.as_str(),
                    ThresholdLevels::from_array(entry.thresholds.resolve()?),
                );
                for predicate in &entry.predicates {
                    rule.add_predicate(Predicate::new(predicate.name.as_str(), &predicate.value));
                }
                match rules.add_rule(rule) {
                    Ok(_) => {}
                    Err(RuleSetError::Duplicate(existing)) => {
                        debug!(index, existing, "skipping duplicate rule");
                    }
                    Err(source) => return Err(SetupError::Rules { index, source }),
                }
            }
        }

        Ok(manager)
    }

    fn read_rules(&self) -> std::sync::RwLockReadGuard<'_, RuleState> {
        self.rules.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_rules(&self) -> std::sync::RwLockWriteGuard<'_, RuleState> {
        self.rules.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current sequence number and rule set.
    pub fn snapshot(&self) -> RuleSnapshot {
        let state = self.read_rules();
        RuleSnapshot {
            sequence: state.sequence,
            rules: Arc::clone(&state.rules),
        }
    }

    pub fn sequence_number(&self) -> u64 {
        self.read_rules().sequence
    }

    pub fn rule_count(&self) -> usize {
        self.read_rules().rules.len()
    }

    /// Apply `mutate` to the rule set; when it reports a change, bump the
    /// sequence number under the same lock.
    fn mutate_rules<T>(&self, mutate: impl FnOnce(&mut RuleSet) -> (T, bool)) -> T {
        let mut state = self.write_rules();
        let (result, changed) = mutate(Arc::make_mut(&mut state.rules));
        if changed {
            state.sequence += 1;
            debug!(
                sequence = state.sequence,
                rules = state.rules.len(),
                "rule set changed"
            );
        }
        result
    }

    /// Add a rule, returning its index.
    pub fn add_rule(&self, rule: Rule) -> Result<usize, RuleSetError> {
        self.mutate_rules(|rules| {
            let result = rules.add_rule(rule);
            let changed = result.is_ok();
            (result, changed)
        })
    }

    /// Add every rule not already present; returns how many were added.
    pub fn add_rules(&self, rules: impl IntoIterator<Item = Rule>) -> Result<usize, RuleSetError> {
        self.mutate_rules(|set| {
            let before = set.len();
            let result = set.add_rules(rules);
            let changed = set.len() != before;
            (result, changed)
        })
    }

    /// Remove the rule equal to `rule`; returns whether it was present.
    pub fn remove_rule(&self, rule: &Rule) -> bool {
        self.mutate_rules(|rules| {
            let removed = rules.remove_rule(rule).is_some();
            (removed, removed)
        })
    }

    /// Remove every rule; returns how many were removed.
    pub fn remove_all_rules(&self) -> usize {
        self.mutate_rules(|rules| {
            let removed = rules.remove_all_rules();
            (removed, removed > 0)
        })
    }

    pub fn default_thresholds(&self) -> ThresholdLevels {
        self.default_thresholds
    }

    /// Register a category; `None` if the name is taken.
    pub fn add_category(&self, name: &str, thresholds: ThresholdLevels) -> Option<Arc<Category>> {
        let mut categories = self.categories.write().unwrap_or_else(PoisonError::into_inner);
        if categories.contains_key(name) {
            return None;
        }
        let category = Arc::new(Category::new(name, thresholds));
        categories.insert(name.to_string(), Arc::clone(&category));
        Some(category)
    }

    pub fn lookup_category(&self, name: &str) -> Option<Arc<Category>> {
        self.categories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// The category `name`, registering it with the default thresholds if
    /// it does not exist yet.
    pub fn category_or_default(&self, name: &str) -> Arc<Category> {
        let mut categories = self.categories.write().unwrap_or_else(PoisonError::into_inner);
        let category = categories
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Category::new(name, self.default_thresholds)));
        Arc::clone(category)
    }

    /// Replace the thresholds of an existing category. Holders of the old
    /// `Arc<Category>` keep the old values.
    pub fn set_thresholds(&self, name: &str, thresholds: ThresholdLevels) -> Option<Arc<Category>> {
        let mut categories = self.categories.write().unwrap_or_else(PoisonError::into_inner);
        let slot = categories.get_mut(name)?;
        *slot = Arc::new(Category::new(name, thresholds));
        Some(Arc::clone(slot))
    }

    /// Registered category names, sorted.
    pub fn category_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .categories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

impl Default for CategoryManager {
    fn default() -> Self {
        Self::new(ThresholdLevels::DEFAULT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn levels(n: u8) -> ThresholdLevels {
        ThresholdLevels::new(n, n, n, n)
    }

    #[test]
    fn test_new_manager_is_generation_zero() {
        let manager = CategoryManager::default();
        let snapshot = manager.snapshot();
        assert_eq!(snapshot.sequence, 0);
        assert!(snapshot.rules.is_empty());
    }

    #[test_log::test]
    fn test_structural_changes_bump_sequence() {
        let manager = CategoryManager::default();
        let rule = Rule::new("db.*", levels(1));

        manager.add_rule(rule.clone()).unwrap();
        assert_eq!(manager.sequence_number(), 1);

        // Rejected duplicate: no change.
        assert!(manager.add_rule(rule.clone()).is_err());
        assert_eq!(manager.sequence_number(), 1);

        assert!(manager.remove_rule(&rule));
        assert_eq!(manager.sequence_number(), 2);
        assert!(!manager.remove_rule(&rule));
        assert_eq!(manager.sequence_number(), 2);

        assert_eq!(manager.remove_all_rules(), 0);
        assert_eq!(manager.sequence_number(), 2);
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_changes() {
        let manager = CategoryManager::default();
        manager.add_rule(Rule::new("a", levels(1))).unwrap();
        let before = manager.snapshot();

        manager.add_rule(Rule::new("b", levels(1))).unwrap();
        assert_eq!(before.rules.len(), 1);
        assert_eq!(manager.snapshot().rules.len(), 2);
        assert_ne!(before.sequence, manager.sequence_number());
    }

    #[test]
    fn test_add_rules_bumps_once() {
        let manager = CategoryManager::default();
        let added = manager
            .add_rules([Rule::new("a", levels(1)), Rule::new("b", levels(1))])
            .unwrap();
        assert_eq!(added, 2);
        assert_eq!(manager.sequence_number(), 1);
        assert_eq!(manager.rule_count(), 2);
    }

    #[test]
    fn test_categories() {
        let manager = CategoryManager::new(levels(5));
        assert!(manager.add_category("db", levels(9)).is_some());
        assert!(manager.add_category("db", levels(1)).is_none());
        assert_eq!(manager.lookup_category("db").unwrap().thresholds(), levels(9));
        assert!(manager.lookup_category("net").is_none());

        let net = manager.category_or_default("net");
        assert_eq!(net.thresholds(), levels(5));
        assert_eq!(manager.category_names(), vec!["db".to_string(), "net".to_string()]);

        let updated = manager.set_thresholds("net", levels(7)).unwrap();
        assert_eq!(updated.thresholds(), levels(7));
        assert_eq!(net.thresholds(), levels(5));
        assert!(manager.set_thresholds("missing", levels(7)).is_none());
    }

    #[test]
    fn test_from_config() {
        let config = AppConfig::parse(
            r#"
            [defaults]
            record = "off"
            pass = "warn"
            trigger = "off"
            trigger_all = "off"

            [[categories]]
            name = "db.pool"
            thresholds = { record = 128, pass = 96, trigger = 64, trigger_all = 32 }

            [[rules]]
            pattern = "db.*"
            thresholds = { record = 120, pass = 110, trigger = 70, trigger_all = 40 }
            predicates = [ { name = "user", value = "alice" } ]

            [[rules]]
            pattern = "db.*"
            thresholds = { record = 120, pass = 110, trigger = 70, trigger_all = 40 }
            predicates = [ { name = "user", value = "alice" } ]
            "#,
        )
        .unwrap();

        let manager = CategoryManager::from_config(&config).unwrap();
        assert_eq!(manager.default_thresholds(), ThresholdLevels::new(0, 96, 0, 0));
        assert_eq!(
            manager.lookup_category("db.pool").unwrap().thresholds(),
            ThresholdLevels::new(128, 96, 64, 32)
        );

        let snapshot = manager.snapshot();
        assert_eq!(snapshot.rules.len(), 1);
        let rule = snapshot.rules.get(0).unwrap();
        assert_eq!(rule.pattern(), "db.*");
        assert_eq!(rule.thresholds(), ThresholdLevels::new(120, 110, 70, 40));
        assert_eq!(rule.predicates().count(), 1);
    }
}
