#![deny(unsafe_code)]

//! Configuration loading and validation for logrules.
//!
//! Loads TOML configuration files describing logging categories, their
//! threshold levels, and the rules that may relax those thresholds for
//! threads carrying particular attributes. [`AppConfig`] is the central
//! configuration structure; [`severity`] holds the named severity levels.

/// Named severity levels.
pub mod severity;

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub use severity::Severity;

/// Upper bound on the number of configured rules (one bit per rule).
pub const MAX_CONFIGURED_RULES: usize = 64;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Top-level application configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Logging configuration for the process itself.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Thresholds applied to categories that are not listed explicitly.
    #[serde(default)]
    pub defaults: ThresholdConfig,

    /// Explicitly configured categories.
    #[serde(default)]
    pub categories: Vec<CategoryConfig>,

    /// Rules, in index order.
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug", "trace").
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// A threshold level as written in TOML: either a severity name or a number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LevelSpec {
    Numeric(u8),
    Named(String),
}

impl LevelSpec {
    /// Resolve to a numeric level; `None` for an unknown name.
    pub fn resolve(&self) -> Option<u8> {
        match self {
            LevelSpec::Numeric(value) => Some(*value),
            LevelSpec::Named(name) => Severity::from_name(name).map(Severity::value),
        }
    }
}

impl From<Severity> for LevelSpec {
    fn from(level: Severity) -> Self {
        LevelSpec::Named(level.name().to_string())
    }
}

impl From<u8> for LevelSpec {
    fn from(value: u8) -> Self {
        LevelSpec::Numeric(value)
    }
}

/// The four threshold levels of a category or rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    #[serde(default = "default_record")]
    pub record: LevelSpec,
    #[serde(default = "default_pass")]
    pub pass: LevelSpec,
    #[serde(default = "default_trigger")]
    pub trigger: LevelSpec,
    #[serde(default = "default_trigger_all")]
    pub trigger_all: LevelSpec,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            record: default_record(),
            pass: default_pass(),
            trigger: default_trigger(),
            trigger_all: default_trigger_all(),
        }
    }
}

fn default_record() -> LevelSpec {
    Severity::Off.into()
}

fn default_pass() -> LevelSpec {
    Severity::Error.into()
}

fn default_trigger() -> LevelSpec {
    Severity::Off.into()
}

fn default_trigger_all() -> LevelSpec {
    Severity::Off.into()
}

impl ThresholdConfig {
    /// Build from four levels in `record, pass, trigger, trigger_all` order.
    pub fn new(
        record: impl Into<LevelSpec>,
        pass: impl Into<LevelSpec>,
        trigger: impl Into<LevelSpec>,
        trigger_all: impl Into<LevelSpec>,
    ) -> Self {
        Self {
            record: record.into(),
            pass: pass.into(),
            trigger: trigger.into(),
            trigger_all: trigger_all.into(),
        }
    }

    /// Resolve all four levels, in `record, pass, trigger, trigger_all` order.
    pub fn resolve(&self) -> Result<[u8; 4], ConfigError> {
        let fields = [
            ("record", &self.record),
            ("pass", &self.pass),
            ("trigger", &self.trigger),
            ("trigger_all", &self.trigger_all),
        ];
        let mut levels = [0u8; 4];
        for (slot, (field, level)) in levels.iter_mut().zip(fields) {
            *slot = level.resolve().ok_or_else(|| {
                ConfigError::Validation(format!("{field}: unknown severity {level:?}"))
            })?;
        }
        Ok(levels)
    }
}

/// A category with explicit thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryConfig {
    /// Category name (e.g. "db.pool").
    pub name: String,

    /// Thresholds; `[defaults]` apply when omitted.
    #[serde(default)]
    pub thresholds: Option<ThresholdConfig>,
}

/// A single rule as expressed in TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Category-name pattern; a trailing `*` matches any suffix.
    pub pattern: String,

    /// Thresholds applied while the rule is active.
    #[serde(default)]
    pub thresholds: ThresholdConfig,

    /// Attributes that must all be present for the rule to be active.
    #[serde(default)]
    pub predicates: Vec<PredicateConfig>,
}

/// An attribute predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredicateConfig {
    pub name: String,
    pub value: PredicateValue,
}

/// Attribute value of a predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredicateValue {
    Int(i64),
    Str(String),
}

impl From<i64> for PredicateValue {
    fn from(value: i64) -> Self {
        PredicateValue::Int(value)
    }
}

impl From<&str> for PredicateValue {
    fn from(value: &str) -> Self {
        PredicateValue::Str(value.to_string())
    }
}

impl AppConfig {
    /// Load configuration from a TOML file at the given path using async I/O.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let config = Self::parse(&content)?;
        tracing::debug!(
            path = %path.display(),
            categories = config.categories.len(),
            rules = config.rules.len(),
            "loaded configuration"
        );
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.logging.level.is_empty() {
            return Err(ConfigError::Validation(
                "logging.level must not be empty".to_string(),
            ));
        }

        self.defaults
            .resolve()
            .map_err(|e| ConfigError::Validation(format!("defaults.{}", validation_detail(&e))))?;

        let mut seen = HashSet::new();
        for (i, category) in self.categories.iter().enumerate() {
            if category.name.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "categories[{i}].name must not be empty"
                )));
            }
            if !seen.insert(category.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "categories[{i}].name {:?} is defined more than once",
                    category.name
                )));
            }
            if let Some(thresholds) = &category.thresholds {
                thresholds.resolve().map_err(|e| {
                    ConfigError::Validation(format!(
                        "categories[{i}].thresholds.{}",
                        validation_detail(&e)
                    ))
                })?;
            }
        }

        if self.rules.len() > MAX_CONFIGURED_RULES {
            return Err(ConfigError::Validation(format!(
                "at most {MAX_CONFIGURED_RULES} rules are supported, got {}",
                self.rules.len()
            )));
        }
        for (i, rule) in self.rules.iter().enumerate() {
            if rule.pattern.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "rules[{i}].pattern must not be empty"
                )));
            }
            rule.thresholds.resolve().map_err(|e| {
                ConfigError::Validation(format!("rules[{i}].thresholds.{}", validation_detail(&e)))
            })?;
            if let Some(j) = rule.predicates.iter().position(|p| p.name.is_empty()) {
                return Err(ConfigError::Validation(format!(
                    "rules[{i}].predicates[{j}].name must not be empty"
                )));
            }
        }

        Ok(())
    }

    /// Resolved thresholds for a category name: its own entry if configured,
    /// otherwise `[defaults]`.
    pub fn thresholds_for(&self, category: &str) -> Result<[u8; 4], ConfigError> {
        self.categories
            .iter()
            .find(|c| c.name == category)
            .and_then(|c| c.thresholds.as_ref())
            .unwrap_or(&self.defaults)
            .resolve()
    }
}

fn validation_detail(err: &ConfigError) -> String {
    match err {
        ConfigError::Validation(msg) => msg.clone(),
        other => other.to_string(),
    }
}
