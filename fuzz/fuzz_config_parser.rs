//! Fuzz target for the TOML configuration parser.
//!
//! Run with: cargo +nightly fuzz run fuzz_config_parser
//!
//! Feeds arbitrary text to `AppConfig::parse()` and builds a category
//! manager from anything that validates.

#![no_main]

use libfuzzer_sys::fuzz_target;
use logrules_config::AppConfig;
use logrules_core::CategoryManager;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(config) = AppConfig::parse(s) {
        // Validated configs must always produce a manager.
        let manager = CategoryManager::from_config(&config).expect("validated config");
        assert!(manager.rule_count() <= config.rules.len());
    }
});
