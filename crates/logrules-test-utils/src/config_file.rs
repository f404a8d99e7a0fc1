//! Temporary configuration files.
//!
//! Helpers for loading a [`CategoryManager`] from a real TOML file on disk,
//! the same way the CLI does.

use std::path::PathBuf;
use std::sync::Arc;

use logrules_config::AppConfig;
use logrules_core::CategoryManager;
use tempfile::TempDir;

/// A test-scoped config file and the manager built from it.
///
/// The temp directory is deleted automatically when this value is dropped,
/// guaranteeing cleanup even on panic.
pub struct TestConfigFile {
    pub config: AppConfig,
    pub manager: Arc<CategoryManager>,
    pub path: PathBuf,
    _temp_dir: TempDir,
}

impl TestConfigFile {
    /// Write `toml_content` to a temporary `logrules.toml`, load it, and
    /// build a manager from it.
    pub async fn with_toml(toml_content: &str) -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("logrules.toml");
        tokio::fs::write(&path, toml_content)
            .await
            .expect("failed to write test config");

        let config = AppConfig::load(&path)
            .await
            .expect("failed to parse test config");
        let manager = Arc::new(
            CategoryManager::from_config(&config).expect("failed to build category manager"),
        );

        Self {
            config,
            manager,
            path,
            _temp_dir: temp_dir,
        }
    }

    /// An empty config file: defaults only, no rules.
    pub async fn empty() -> Self {
        Self::with_toml("").await
    }

    /// Overwrite the file with new content (for reload testing).
    pub async fn write(&self, toml_content: &str) {
        tokio::fs::write(&self.path, toml_content)
            .await
            .expect("failed to write updated config");
    }
}
