//! CLI-specific functionality for podunit
//!
//! This module contains all CLI-related code including argument parsing,
//! configuration discovery, and unit output.

pub mod args;
pub mod config;
pub mod output;

pub use args::{Args, ExecutionMode, GenerateConfig, OutputFormat};
pub use config::{ConfigDiscovery, ConfigError, GeneratorConfig};
pub use output::{format_paths, format_units, write_unit_files, OutputError};
