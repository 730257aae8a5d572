//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module handles:
//!
//! - Reading the TOML configuration file from the platform-appropriate directory.
//! - Writing it back when settings change.
//! - Providing defaults when the file does not exist yet (first run).
//! - Converting the on-disk values into runtime `LinkSettings`.

pub mod config;

pub use config::{load_config, load_from, save_config, save_to, AppConfig, ConfigError};
