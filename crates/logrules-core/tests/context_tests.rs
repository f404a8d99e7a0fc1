//! Attribute contexts driven by configuration, and cache memoisation
//! measured with a counting rule collection.

use std::sync::Arc;

use logrules_config::PredicateValue;
use logrules_core::{
    AttributeContainerList, AttributeContext, AttributeSet, CategoryManager, Predicate, Rule,
    RuleCollection, RuleEvaluationCache, ThresholdLevels,
};
use logrules_test_utils::config::TestConfigBuilder;
use logrules_test_utils::config_file::TestConfigFile;
use logrules_test_utils::rules::CountingRules;
use logrules_test_utils::tracing_setup::init_test_tracing;
use pretty_assertions::assert_eq;

const CONFIG: &str = r#"
[defaults]
record = "off"
pass = "warn"

[[categories]]
name = "db.pool"
thresholds = { record = 128, pass = 96, trigger = 64, trigger_all = 32 }

[[rules]]
pattern = "db.*"
thresholds = { record = 120, pass = 110, trigger = 70, trigger_all = 40 }
predicates = [{ name = "user", value = "alice" }]

[[rules]]
pattern = "net.*"
thresholds = { record = "trace", pass = "trace", trigger = "off", trigger_all = "off" }
predicates = [{ name = "port", value = 8080 }]
"#;

#[tokio::test]
async fn test_thresholds_from_config_file() {
    init_test_tracing();
    let file = TestConfigFile::with_toml(CONFIG).await;
    let manager = Arc::clone(&file.manager);
    assert_eq!(manager.rule_count(), 2);

    let pool = manager.lookup_category("db.pool").expect("configured category");
    let mut context = AttributeContext::new(Arc::clone(&manager));
    assert!(!context.has_relevant_active_rules(&pool));
    assert_eq!(context.determine_threshold_levels(&pool), pool.thresholds());

    context.add_attributes(Arc::new(AttributeSet::new().with("user", "alice")));
    assert!(context.has_relevant_active_rules(&pool));
    assert_eq!(
        context.determine_threshold_levels(&pool),
        ThresholdLevels::new(128, 110, 70, 40)
    );
}

#[tokio::test]
async fn test_unlisted_category_uses_defaults() {
    let file = TestConfigFile::with_toml(CONFIG).await;
    let listener = file.manager.category_or_default("net.listener");
    assert_eq!(listener.thresholds(), ThresholdLevels::new(0, 96, 0, 0));

    let mut context = AttributeContext::new(Arc::clone(&file.manager));
    context.add_attributes(Arc::new(AttributeSet::new().with("port", 8080)));
    assert_eq!(
        context.relevant_threshold_levels(&listener),
        Some(ThresholdLevels::new(192, 192, 0, 0))
    );

    // String "8080" is a different value than integer 8080.
    let mut context = AttributeContext::new(Arc::clone(&file.manager));
    context.add_attributes(Arc::new(AttributeSet::new().with("port", "8080")));
    assert_eq!(context.relevant_threshold_levels(&listener), None);
}

#[tokio::test]
async fn test_empty_config_file() {
    let file = TestConfigFile::empty().await;
    assert_eq!(file.manager.rule_count(), 0);
    assert_eq!(file.manager.default_thresholds(), ThresholdLevels::DEFAULT);
}

#[test]
fn test_builder_config_matches_worked_example() {
    let config = TestConfigBuilder::new()
        .category("db.pool", [128, 96, 64, 32])
        .rule("db.*", [120, 110, 70, 40], &[("user", PredicateValue::from("alice"))])
        .build();
    let manager = Arc::new(CategoryManager::from_config(&config).unwrap());
    let pool = manager.lookup_category("db.pool").unwrap();

    let mut alice = AttributeContext::new(Arc::clone(&manager));
    alice.add_attributes(Arc::new(AttributeSet::new().with("user", "alice")));
    let mut bob = AttributeContext::new(Arc::clone(&manager));
    bob.add_attributes(Arc::new(AttributeSet::new().with("user", "bob")));

    assert_eq!(
        alice.determine_threshold_levels(&pool),
        ThresholdLevels::new(128, 110, 70, 40)
    );
    assert_eq!(bob.determine_threshold_levels(&pool), pool.thresholds());
}

#[test]
fn test_rule_added_after_first_query_is_seen() {
    let manager = Arc::new(CategoryManager::default());
    let category = manager.category_or_default("db.query");
    let mut context = AttributeContext::new(Arc::clone(&manager));
    context.add_attributes(Arc::new(AttributeSet::new().with("tenant", 7)));

    assert!(!context.has_relevant_active_rules(&category));
    let before = context.rule_cache().sequence_number();

    manager
        .add_rule(
            Rule::new("db.*", ThresholdLevels::new(0, 160, 0, 0))
                .with_predicate(Predicate::new("tenant", 7)),
        )
        .unwrap();

    assert!(context.has_relevant_active_rules(&category));
    assert_ne!(context.rule_cache().sequence_number(), before);
    assert_eq!(
        context.determine_threshold_levels(&category),
        ThresholdLevels::new(0, 160, 0, 0)
    );
}

#[test]
fn test_cache_memoises_rule_evaluation() {
    let rules = CountingRules::with_rules([
        Rule::new("db.*", ThresholdLevels::new(1, 1, 1, 1)).with_predicate(Predicate::new("user", "alice")),
        Rule::new("db.pool", ThresholdLevels::new(2, 2, 2, 2)),
        Rule::new("net.*", ThresholdLevels::new(3, 3, 3, 3)),
    ])
    .unwrap();

    let mut containers = AttributeContainerList::new();
    containers.push(Arc::new(AttributeSet::new().with("user", "alice")));
    let mut cache = RuleEvaluationCache::new();

    let relevant = rules.relevant_rules("db.pool");
    assert_eq!(relevant.len(), 2);

    let first = cache.update(0, relevant, &rules, &containers);
    assert_eq!(rules.evaluations(), 2);
    for _ in 0..10 {
        assert_eq!(cache.update(0, relevant, &rules, &containers), first);
    }
    assert_eq!(rules.evaluations(), 2);

    // Only the newly relevant rule is evaluated.
    cache.update(0, rules.relevant_rules("net.io"), &rules, &containers);
    assert_eq!(rules.evaluations(), 3);

    // A new generation evaluates everything requested again.
    rules.reset_evaluations();
    cache.update(1, relevant, &rules, &containers);
    assert_eq!(rules.evaluations(), 2);
}

#[test]
fn test_cleared_cache_reevaluates() {
    let rules = CountingRules::with_rules([Rule::new("*", ThresholdLevels::OFF)]).unwrap();
    let containers = AttributeContainerList::new();
    let mut cache = RuleEvaluationCache::new();
    let relevant = rules.relevant_rules("anything");

    cache.update(5, relevant, &rules, &containers);
    cache.clear();
    cache.update(5, relevant, &rules, &containers);
    assert_eq!(rules.evaluations(), 2);
}

#[test]
fn test_contexts_on_different_threads_are_independent() {
    let manager = Arc::new(CategoryManager::default());
    manager
        .add_rule(
            Rule::new("app.*", ThresholdLevels::new(0, 192, 0, 0))
                .with_predicate(Predicate::new("request", 1)),
        )
        .unwrap();
    let category = manager.category_or_default("app.handler");

    let handles: Vec<_> = (0..4)
        .map(|request| {
            let manager = Arc::clone(&manager);
            let category = Arc::clone(&category);
            std::thread::spawn(move || {
                let mut context = AttributeContext::new(manager);
                context.add_attributes(Arc::new(AttributeSet::new().with("request", request)));
                (0..100)
                    .map(|_| context.has_relevant_active_rules(&category))
                    .all(|active| active == (request == 1))
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
}
