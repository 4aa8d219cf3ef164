//! Storage infrastructure: configuration file loading.
//!
//! The `config` sub-module handles:
//!
//! - Reading the TOML configuration file from `--config` or the
//!   platform-appropriate directory.
//! - Providing sensible defaults when no file exists (first run).
//! - Rendering the effective configuration for `--print-config`.

pub mod config;
