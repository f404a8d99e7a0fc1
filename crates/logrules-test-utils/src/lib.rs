#![deny(unsafe_code)]

//! Shared test utilities for the logrules workspace.
//!
//! Provides reusable fixtures, config builders, rule doubles, and tracing
//! helpers so that individual crate tests stay concise and consistent.
//!
//! Add this crate as a `[dev-dependency]` in any workspace member:
//!
//! ```toml
//! [dev-dependencies]
//! logrules-test-utils = { workspace = true }
//! ```

pub mod capture;
pub mod config;
pub mod config_file;
pub mod rules;
pub mod tracing_setup;
