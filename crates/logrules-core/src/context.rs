//! Per-thread attribute context.
//!
//! An [`AttributeContext`] collects the attribute containers describing the
//! work a thread is currently doing and answers, for a given category,
//! whether any rule is relevant and active and what the effective threshold
//! levels are. Contexts are normally obtained through the
//! [`registry`](crate::registry), which keeps one per thread.
//!
//! A context is only ever touched by its own thread, so none of its state is
//! synchronised; the only lock on the query path is the brief read of the
//! rule owner's snapshot.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::trace;

use crate::attribute::{Attribute, AttributeContainer};
use crate::category::{Category, CategoryManager};
use crate::container_list::{AttributeContainerList, ContainerHandle};
use crate::mask::RuleMask;
use crate::print::Printer;
use crate::rule::{RuleCollection, RuleSet};
use crate::rule_cache::RuleEvaluationCache;
use crate::threshold::ThresholdLevels;

static CONTEXT_ID: AtomicU64 = AtomicU64::new(0);

/// Identity of one context instance, unique within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Attributes of the current thread plus the cache of rule evaluations
/// against them.
pub struct AttributeContext {
    id: ContextId,
    manager: Arc<CategoryManager>,
    containers: AttributeContainerList,
    rule_cache: RuleEvaluationCache,
}

impl AttributeContext {
    /// Create a context evaluating the rules owned by `manager`.
    pub fn new(manager: Arc<CategoryManager>) -> Self {
        Self {
            id: ContextId(CONTEXT_ID.fetch_add(1, Ordering::Relaxed)),
            manager,
            containers: AttributeContainerList::new(),
            rule_cache: RuleEvaluationCache::new(),
        }
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn manager(&self) -> &Arc<CategoryManager> {
        &self.manager
    }

    /// Attach `container` and invalidate cached rule results.
    ///
    /// The container must not change what it reports while attached unless
    /// [`clear_cache`](Self::clear_cache) is called after each change.
    pub fn add_attributes(&mut self, container: Arc<dyn AttributeContainer>) -> ContainerHandle {
        let handle = self.containers.push(container);
        self.clear_cache();
        handle
    }

    /// Detach the container behind `handle` and invalidate cached results.
    ///
    /// `handle` must come from [`add_attributes`](Self::add_attributes) on
    /// this context and must not have been removed already; debug builds
    /// assert this.
    pub fn remove_attributes(&mut self, handle: ContainerHandle) -> Option<Arc<dyn AttributeContainer>> {
        let removed = self.containers.remove(handle);
        debug_assert!(
            removed.is_some(),
            "container handle {handle:?} is not attached to context {}",
            self.id
        );
        self.clear_cache();
        removed
    }

    /// Invalidate cached rule results, e.g. after changing an attached
    /// container in place.
    pub fn clear_cache(&mut self) {
        self.rule_cache.clear();
    }

    /// Whether any attached container holds `attribute`. Not cached.
    pub fn has_attribute(&self, attribute: &Attribute) -> bool {
        self.containers.has_value(attribute)
    }

    pub fn containers(&self) -> &AttributeContainerList {
        &self.containers
    }

    pub fn rule_cache(&self) -> &RuleEvaluationCache {
        &self.rule_cache
    }

    /// Whether any rule relevant to `category` is active for this thread.
    pub fn has_relevant_active_rules(&mut self, category: &Category) -> bool {
        !self.active_rules(category).0.is_empty()
    }

    /// The category's thresholds combined, by per-field maximum, with those
    /// of every relevant active rule.
    pub fn determine_threshold_levels(&mut self, category: &Category) -> ThresholdLevels {
        let (active, rules) = self.active_rules(category);
        combine(category, active, &*rules)
    }

    /// Both queries above in one pass: `None` when no relevant rule is
    /// active, otherwise the combined thresholds.
    pub fn relevant_threshold_levels(&mut self, category: &Category) -> Option<ThresholdLevels> {
        let (active, rules) = self.active_rules(category);
        if active.is_empty() {
            return None;
        }
        Some(combine(category, active, &*rules))
    }

    fn active_rules(&mut self, category: &Category) -> (RuleMask, Arc<RuleSet>) {
        let snapshot = self.manager.snapshot();
        let relevant = snapshot.rules.relevant_rules(category.name());
        if !self.rule_cache.is_data_available(snapshot.sequence, relevant) {
            trace!(
                context = %self.id,
                category = category.name(),
                sequence = snapshot.sequence,
                %relevant,
                "evaluating rules"
            );
        }
        let active = self.rule_cache.update(
            snapshot.sequence,
            relevant,
            &*snapshot.rules,
            &self.containers,
        );
        (active, snapshot.rules)
    }

    /// Debug dump; see [`print`](crate::print) for the formatting contract.
    pub fn print(&self, out: &mut dyn fmt::Write, level: i32, spaces_per_level: i32) -> fmt::Result {
        let mut printer = Printer::new(out, level, spaces_per_level);
        printer.start()?;
        printer.field("id", &self.id)?;
        printer.nested_field("containers", |out, level, spaces| {
            self.containers.print(out, level, spaces)
        })?;
        printer.nested_field("rule cache", |out, level, spaces| {
            self.rule_cache.print(out, level, spaces)
        })?;
        printer.end()
    }
}

fn combine<R>(category: &Category, active: RuleMask, rules: &R) -> ThresholdLevels
where
    R: RuleCollection + ?Sized,
{
    active
        .iter()
        .filter_map(|index| rules.rule_thresholds(index))
        .fold(category.thresholds(), ThresholdLevels::combine_max)
}

impl fmt::Display for AttributeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.print(f, 0, -1)
    }
}

impl fmt::Debug for AttributeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeContext")
            .field("id", &self.id)
            .field("containers", &self.containers)
            .field("rule_cache", &self.rule_cache)
            .finish_non_exhaustive()
    }
}
