//! Engine configuration
//!
//! Provides types and parsing for `spv.toml`, plus discovery and overrides.

pub mod loader;
pub mod schema;

pub use loader::{load_config, merge_cli_overrides, read_config, validated, CliOverrides, ConfigError};
pub use schema::*;
