//! Configuration builders for tests.
//!
//! Use [`TestConfigBuilder`] to create customised [`AppConfig`] values without
//! repeating TOML boilerplate across crate boundaries.

use logrules_config::{
    AppConfig, CategoryConfig, LevelSpec, PredicateConfig, PredicateValue, RuleConfig,
    ThresholdConfig,
};

/// Fluent builder for [`AppConfig`] in tests.
///
/// # Example
///
/// ```ignore
/// let config = TestConfigBuilder::new()
///     .category("db.pool", [128, 96, 64, 32])
///     .rule("db.*", [120, 110, 70, 40], &[("user", "alice".into())])
///     .build();
/// ```
pub struct TestConfigBuilder {
    config: AppConfig,
}

fn thresholds(levels: [u8; 4]) -> ThresholdConfig {
    let [record, pass, trigger, trigger_all] = levels.map(LevelSpec::Numeric);
    ThresholdConfig {
        record,
        pass,
        trigger,
        trigger_all,
    }
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn log_level(mut self, level: &str) -> Self {
        self.config.logging.level = level.to_string();
        self
    }

    pub fn defaults(mut self, levels: [u8; 4]) -> Self {
        self.config.defaults = thresholds(levels);
        self
    }

    pub fn category(mut self, name: &str, levels: [u8; 4]) -> Self {
        self.config.categories.push(CategoryConfig {
            name: name.to_string(),
            thresholds: Some(thresholds(levels)),
        });
        self
    }

    pub fn rule(mut self, pattern: &str, levels: [u8; 4], predicates: &[(&str, PredicateValue)]) -> Self {
        self.config.rules.push(RuleConfig {
            pattern: pattern.to_string(),
            thresholds: thresholds(levels),
            predicates: predicates
                .iter()
                .map(|(name, value)| PredicateConfig {
                    name: name.to_string(),
                    value: value.clone(),
                })
                .collect(),
        });
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
