//! Configuration discovery and loading
//!
//! This module handles the configuration discovery hierarchy:
//! 1. Current directory: ./podunit.toml or ./.podunit/config.toml
//! 2. User config: ~/.config/podunit/config.toml
//! 3. System config: /etc/podunit/config.toml
//! 4. Built-in defaults

use crate::env;
use crate::generate::RestartPolicy;
use serde::{Deserialize, Serialize};
use std::env as std_env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading a config file
    #[error("IO error on config file '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Config file content is not valid
    #[error("invalid config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Defaults for `podunit generate`, overridable on the command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Engine executable written into units; looked up on PATH when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executable: Option<String>,
    pub container_prefix: String,
    pub pod_prefix: String,
    pub separator: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restart_policy: Option<RestartPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restart_sec: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_timeout: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_timeout: Option<u32>,
    pub use_name: bool,
    pub new: bool,
    pub no_header: bool,
    /// Where `--files` writes units when no directory is given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            executable: None,
            container_prefix: env::unit::DEFAULT_CONTAINER_PREFIX.to_string(),
            pod_prefix: env::unit::DEFAULT_POD_PREFIX.to_string(),
            separator: env::unit::DEFAULT_SEPARATOR.to_string(),
            restart_policy: None,
            restart_sec: None,
            stop_timeout: None,
            start_timeout: None,
            use_name: false,
            new: false,
            no_header: false,
            output_dir: None,
        }
    }
}

impl GeneratorConfig {
    /// Load from TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Configuration discovery system
pub struct ConfigDiscovery;

impl ConfigDiscovery {
    /// Discover and load configuration using the hierarchy
    pub fn discover_config() -> Result<GeneratorConfig, ConfigError> {
        if let Some(config_path) = Self::find_config_file() {
            info!("Loading configuration from: {:?}", config_path);
            return GeneratorConfig::from_toml_file(config_path);
        }

        debug!("No configuration file found, using defaults");
        Ok(GeneratorConfig::default())
    }

    /// Find configuration file using discovery hierarchy
    pub fn find_config_file() -> Option<PathBuf> {
        let candidates = Self::get_config_candidates();

        for candidate in candidates {
            debug!("Checking for config file: {:?}", candidate);
            if candidate.is_file() {
                debug!("Found config file: {:?}", candidate);
                return Some(candidate);
            }
        }

        debug!("No config file found in discovery hierarchy");
        None
    }

    /// Get list of configuration file candidates in priority order
    fn get_config_candidates() -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        // 1. Current directory
        if let Ok(current_dir) = std_env::current_dir() {
            candidates.push(current_dir.join(env::LOCAL_CONFIG_FILE_NAME));
            candidates.push(env::local_config_file_path(&current_dir));
        }

        // 2. User config
        if let Some(home_dir) = Self::get_home_dir() {
            candidates.push(env::user_config_file_path(&home_dir));
        }

        // 3. System config
        candidates.push(PathBuf::from(env::SYSTEM_CONFIG_FILE));

        candidates
    }

    /// Get home directory path
    fn get_home_dir() -> Option<PathBuf> {
        std_env::var("HOME").ok().map(PathBuf::from)
    }

    /// Describe the discovery hierarchy and the active configuration
    pub fn discovery_info() -> String {
        let mut out = String::from("Configuration Discovery Hierarchy:\n\n");

        for (i, candidate) in Self::get_config_candidates().iter().enumerate() {
            let status = if candidate.exists() {
                if candidate.is_file() {
                    "✓ EXISTS"
                } else {
                    "✗ NOT A FILE"
                }
            } else {
                "✗ NOT FOUND"
            };
            out.push_str(&format!("  {}. {:?} - {}\n", i + 1, candidate, status));
        }

        out.push('\n');
        match Self::find_config_file() {
            Some(found) => out.push_str(&format!("Active configuration: {:?}\n", found)),
            None => out.push_str("Active configuration: Built-in defaults\n"),
        }
        out
    }

    /// Show configuration discovery information for debugging
    pub fn show_discovery_info() {
        print!("{}", Self::discovery_info());
    }
}
