#![deny(unsafe_code)]

//! Shared test utilities for the PromptStack workspace.
//!
//! Provides reusable fixtures, config builders, and tracing helpers so that
//! individual crate tests stay concise and consistent.
//!
//! Add this crate as a `[dev-dependency]` in any workspace member:
//!
//! ```toml
//! [dev-dependencies]
//! promptstack-test-utils = { workspace = true }
//! ```

pub mod config;
pub mod files;
pub mod fixtures;
pub mod tracing_setup;

pub use config::TestConfigBuilder;
pub use files::TestFiles;
pub use fixtures::{FixedClock, ItemBuilder, ScriptedTransport, edit};
pub use tracing_setup::init_test_tracing;
