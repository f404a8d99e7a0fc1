#![deny(unsafe_code)]

//! logrules core: thread-local attribute contexts and rule-evaluation caching.
//!
//! Logging categories carry four threshold levels. Rules, owned process-wide
//! by a [`CategoryManager`], can relax those thresholds for threads whose
//! attributes satisfy the rule's predicates. Each thread keeps an
//! [`AttributeContext`] holding its attributes and a [`RuleEvaluationCache`]
//! that memoises which rules are active, so the logging hot path only takes
//! a brief read lock to snapshot the rule set.
//!
//! ```
//! use std::sync::Arc;
//! use logrules_core::{AttributeContext, AttributeSet, Category, CategoryManager, Predicate, Rule,
//!     ThresholdLevels};
//!
//! let manager = Arc::new(CategoryManager::default());
//! manager
//!     .add_rule(
//!         Rule::new("db.*", ThresholdLevels::new(120, 110, 70, 40))
//!             .with_predicate(Predicate::new("user", "alice")),
//!     )
//!     .unwrap();
//!
//! let mut context = AttributeContext::new(manager);
//! context.add_attributes(Arc::new(AttributeSet::new().with("user", "alice")));
//!
//! let category = Category::new("db.pool", ThresholdLevels::new(128, 96, 64, 32));
//! assert!(context.has_relevant_active_rules(&category));
//! assert_eq!(
//!     context.determine_threshold_levels(&category),
//!     ThresholdLevels::new(128, 110, 70, 40)
//! );
//! ```

/// Attributes, attribute values, and the container trait.
pub mod attribute;
/// Categories and the shared rule owner.
pub mod category;
/// Ordered list of attribute containers with removal handles.
pub mod container_list;
/// Per-thread attribute context.
pub mod context;
/// Fixed-width rule bitmask.
pub mod mask;
/// Indented debug output shared by the printable types.
pub mod print;
/// Process-wide registry and thread-local context access.
pub mod registry;
/// Rules, predicates, pattern matching, and the rule set.
pub mod rule;
/// Memo of evaluated and active rules per rule-set generation.
pub mod rule_cache;
/// Threshold levels and severities.
pub mod threshold;

pub use attribute::{Attribute, AttributeContainer, AttributeSet, AttributeValue};
pub use category::{Category, CategoryManager, RuleSnapshot, SetupError};
pub use container_list::{AttributeContainerList, ContainerHandle};
pub use context::{AttributeContext, ContextId};
pub use mask::{MAX_RULES, RuleMask};
pub use registry::{ContextProctor, RegistryError, ScopedAttributes};
pub use rule::{Predicate, Rule, RuleCollection, RuleSet, RuleSetError};
pub use rule_cache::RuleEvaluationCache;
pub use threshold::{Severity, ThresholdLevels};
