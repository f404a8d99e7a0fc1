#![deny(unsafe_code)]

//! logrules CLI: validate rule configuration and evaluate categories.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result, bail};
use clap::{Parser, Subcommand};
use logrules_config::AppConfig;
use logrules_core::registry;
use logrules_core::{
    Attribute, AttributeContext, AttributeSet, AttributeValue, Category, CategoryManager,
    ContextProctor, RuleCollection, ScopedAttributes, ThresholdLevels,
};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// logrules: per-thread logging thresholds driven by attribute rules.
#[derive(Debug, Parser)]
#[command(name = "logrules", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, default_value = "logrules.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v, -vv). Overrides `logging.level`.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Validate and display configuration.
    Config {
        /// Show the resolved configuration.
        #[arg(long)]
        show: bool,
    },

    /// List configured rules by index.
    Rules,

    /// Evaluate a category against a set of thread attributes.
    Check {
        /// Category name (e.g. "db.pool").
        #[arg(long)]
        category: String,

        /// Attribute as `name=value`; integer values are matched as integers.
        #[arg(long = "attr", value_parser = parse_attribute)]
        attributes: Vec<Attribute>,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,

        /// Also print the thread's attribute context.
        #[arg(long)]
        dump: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, found) = load_config(&cli.config).await?;

    let filter = match cli.verbose {
        0 => config.logging.level.clone(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if !found {
        info!(path = %cli.config.display(), "Config file not found, using defaults");
    }

    match cli.command {
        Commands::Config { show } => cmd_config(&cli.config, &config, show)?,
        Commands::Rules => cmd_rules(&config)?,
        Commands::Check {
            category,
            attributes,
            json,
            dump,
        } => cmd_check(&config, &category, attributes, json, dump)?,
    }

    Ok(())
}

fn cmd_config(config_path: &Path, config: &AppConfig, show: bool) -> Result<()> {
    if show {
        let toml_str = toml::to_string_pretty(config).context("failed to serialize config")?;
        println!("{toml_str}");
    } else {
        println!("Configuration at '{}' is valid.", config_path.display());
    }
    Ok(())
}

fn cmd_rules(config: &AppConfig) -> Result<()> {
    let manager = CategoryManager::from_config(config)?;
    let snapshot = manager.snapshot();
    if snapshot.rules.is_empty() {
        println!("No rules configured.");
        return Ok(());
    }
    for (index, rule) in snapshot.rules.iter() {
        println!("{index:>2}  {rule}");
    }
    Ok(())
}

fn cmd_check(
    config: &AppConfig,
    category: &str,
    attributes: Vec<Attribute>,
    json: bool,
    dump: bool,
) -> Result<()> {
    let manager = Arc::new(CategoryManager::from_config(config)?);
    registry::initialize(Arc::clone(&manager))?;

    let _proctor = ContextProctor::new();
    let attributes: AttributeSet = attributes.into_iter().collect();
    debug!(%attributes, "attaching attributes");
    let _scope = ScopedAttributes::try_new(Arc::new(attributes))?;

    let category = manager.category_or_default(category);
    let (report, context_dump) = registry::try_with_context(|ctx| {
        let report = CheckReport::evaluate(ctx, &category);
        let mut out = String::new();
        let dumped = if dump {
            ctx.print(&mut out, 0, 4).map(|()| Some(out))
        } else {
            Ok(None)
        };
        (report, dumped)
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{report}");
    }
    if let Some(out) = context_dump.context("failed to format attribute context")? {
        print!("{out}");
    }
    Ok(())
}

/// Outcome of evaluating one category in one attribute context.
#[derive(Debug, Serialize)]
struct CheckReport {
    category: String,
    category_thresholds: ThresholdLevels,
    relevant_rules: Vec<usize>,
    active_rules: Vec<usize>,
    thresholds: ThresholdLevels,
}

impl CheckReport {
    fn evaluate(context: &mut AttributeContext, category: &Category) -> Self {
        let thresholds = context.determine_threshold_levels(category);
        let relevant = context
            .manager()
            .snapshot()
            .rules
            .relevant_rules(category.name());
        let active = context.rule_cache().known_active_rules() & relevant;
        Self {
            category: category.name().to_string(),
            category_thresholds: category.thresholds(),
            relevant_rules: relevant.iter().collect(),
            active_rules: active.iter().collect(),
            thresholds,
        }
    }

    fn is_active(&self) -> bool {
        !self.active_rules.is_empty()
    }
}

impl std::fmt::Display for CheckReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "category:             {}", self.category)?;
        writeln!(f, "category thresholds:  {}", self.category_thresholds)?;
        writeln!(f, "relevant rules:       {:?}", self.relevant_rules)?;
        writeln!(f, "active rules:         {:?}", self.active_rules)?;
        if self.is_active() {
            writeln!(f, "effective thresholds: {}", self.thresholds)
        } else {
            writeln!(f, "effective thresholds: {} (unchanged)", self.thresholds)
        }
    }
}

/// Parse `name=value`. Values that parse as `i64` become integer attributes.
fn parse_attribute(s: &str) -> Result<Attribute> {
    let Some((name, value)) = s.split_once('=') else {
        bail!("expected NAME=VALUE, got {s:?}");
    };
    if name.is_empty() {
        bail!("attribute name must not be empty in {s:?}");
    }
    let value = match value.parse::<i64>() {
        Ok(number) => AttributeValue::Int(number),
        Err(_) => AttributeValue::Str(value.to_string()),
    };
    Ok(Attribute::new(name, value))
}

async fn load_config(path: &Path) -> Result<(AppConfig, bool)> {
    if tokio::fs::try_exists(path).await.unwrap_or(false) {
        let config = AppConfig::load(path)
            .await
            .with_context(|| format!("failed to load {}", path.display()))?;
        Ok((config, true))
    } else {
        Ok((AppConfig::default(), false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logrules_config::PredicateValue;
    use logrules_test_utils::config::TestConfigBuilder;
    use logrules_test_utils::config_file::TestConfigFile;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_attribute() {
        assert_eq!(
            parse_attribute("user=alice").unwrap(),
            Attribute::new("user", "alice")
        );
        assert_eq!(
            parse_attribute("port=8080").unwrap(),
            Attribute::new("port", 8080i64)
        );
        assert_eq!(
            parse_attribute("query=a=b").unwrap(),
            Attribute::new("query", "a=b")
        );
        assert_eq!(parse_attribute("empty=").unwrap(), Attribute::new("empty", ""));
        assert!(parse_attribute("novalue").is_err());
        assert!(parse_attribute("=x").is_err());
    }

    #[test]
    fn test_cli_parses_check() {
        let cli = Cli::try_parse_from([
            "logrules",
            "-c",
            "custom.toml",
            "check",
            "--category",
            "db.pool",
            "--attr",
            "user=alice",
            "--attr",
            "tenant=7",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("custom.toml"));
        match cli.command {
            Commands::Check {
                category,
                attributes,
                json,
                dump,
            } => {
                assert_eq!(category, "db.pool");
                assert_eq!(
                    attributes,
                    vec![Attribute::new("user", "alice"), Attribute::new("tenant", 7i64)]
                );
                assert!(json);
                assert!(!dump);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_rejects_bad_attribute() {
        let result = Cli::try_parse_from(["logrules", "check", "--category", "x", "--attr", "oops"]);
        assert!(result.is_err());
    }

    #[test_log::test]
    fn test_check_report() {
        let config = TestConfigBuilder::new()
            .category("db.pool", [128, 96, 64, 32])
            .rule("db.*", [120, 110, 70, 40], &[("user", PredicateValue::from("alice"))])
            .rule("net.*", [192, 192, 0, 0], &[])
            .build();
        let manager = Arc::new(CategoryManager::from_config(&config).unwrap());
        let pool = manager.lookup_category("db.pool").unwrap();

        let mut context = AttributeContext::new(Arc::clone(&manager));
        let report = CheckReport::evaluate(&mut context, &pool);
        assert_eq!(report.relevant_rules, vec![0]);
        assert!(!report.is_active());
        assert_eq!(report.thresholds, pool.thresholds());

        context.add_attributes(Arc::new(AttributeSet::new().with("user", "alice")));
        let report = CheckReport::evaluate(&mut context, &pool);
        assert_eq!(report.active_rules, vec![0]);
        assert_eq!(report.thresholds, ThresholdLevels::new(128, 110, 70, 40));
        assert!(report.to_string().contains("[ record = 128 pass = 110 trigger = 70 trigger_all = 40 ]"));

        let json: serde_json::Value = serde_json::to_value(&report).unwrap();
        assert_eq!(json["thresholds"]["pass"], 110);
        assert_eq!(json["active_rules"], serde_json::json!([0]));
    }

    #[tokio::test]
    async fn test_load_config_from_file() {
        let file = TestConfigFile::with_toml(
            r#"
            [logging]
            level = "debug"

            [[rules]]
            pattern = "app.*"
            predicates = [{ name = "tenant", value = 7 }]
            "#,
        )
        .await;
        let (config, found) = load_config(&file.path).await.unwrap();
        assert!(found);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.rules.len(), 1);
        assert!(cmd_rules(&config).is_ok());
    }

    #[tokio::test]
    async fn test_missing_config_uses_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let (config, found) = load_config(&dir.path().join("absent.toml")).await.unwrap();
        assert!(!found);
        assert!(config.rules.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_config_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        tokio::fs::write(&path, "[[rules]]\npattern = \"\"\n").await.unwrap();
        assert!(load_config(&path).await.is_err());
    }
}
