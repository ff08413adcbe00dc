//! Environment constants and path utilities for unit generation.
//!
//! This module centralizes the fixed names and values the generator and the
//! CLI rely on, so unit text and config discovery stay consistent.

use std::path::{Path, PathBuf};

/// Application directory name used for local and user configuration
pub const PODUNIT_DIR_NAME: &str = "podunit";

/// Hidden local configuration directory name
pub const LOCAL_DIR_NAME: &str = ".podunit";

/// Configuration file name
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration file name looked up directly in the current directory
pub const LOCAL_CONFIG_FILE_NAME: &str = "podunit.toml";

/// System-wide configuration file
pub const SYSTEM_CONFIG_FILE: &str = "/etc/podunit/config.toml";

/// Environment variable set in every generated unit so the container engine
/// can tell which unit manages it.
pub const SYSTEMD_UNIT_ENV_VARIABLE: &str = "PODMAN_SYSTEMD_UNIT";

/// Floor added to the entity's stop timeout for `TimeoutStopSec=`. Once
/// exceeded, systemd kills the remaining processes and cleans up the cgroup.
pub const MIN_TIMEOUT_STOP_SEC: u32 = 60;

/// Engine binary looked up on `PATH` when no executable is configured
pub const ENGINE_BINARY_NAME: &str = "podman";

/// Executable used when the engine cannot be found on `PATH`
pub const DEFAULT_EXECUTABLE: &str = "/usr/bin/podman";

/// Command used by `ExecStartPre=` to clear stale PID and ID files
pub const REMOVE_COMMAND: &str = "/bin/rm -f";

/// Unit-related names and suffixes
pub mod unit {
    /// Default prefix for container service names
    pub const DEFAULT_CONTAINER_PREFIX: &str = "container";

    /// Default prefix for pod service names
    pub const DEFAULT_POD_PREFIX: &str = "pod";

    /// Default separator between prefix and name or ID
    pub const DEFAULT_SEPARATOR: &str = "-";

    /// File extension of generated units
    pub const SERVICE_EXTENSION: &str = "service";

    /// Suffix of PID files under the runtime directory
    pub const PID_FILE_SUFFIX: &str = "pid";

    /// Suffix of container ID files under the runtime directory
    pub const CONTAINER_ID_FILE_SUFFIX: &str = "ctr-id";

    /// Suffix of pod ID files under the runtime directory
    pub const POD_ID_FILE_SUFFIX: &str = "pod-id";
}

/// Build a runtime-directory path (`%t/<stem>.<suffix>`) that systemd
/// resolves at activation time.
pub fn runtime_dir_file(stem: &str, suffix: &str) -> String {
    format!("%t/{}.{}", stem, suffix)
}

/// Build the file name of a generated unit
pub fn unit_file_name(service_name: &str) -> String {
    format!("{}.{}", service_name, unit::SERVICE_EXTENSION)
}

/// Build the config directory path in the user's home directory
pub fn user_config_dir_path(home_dir: &Path) -> PathBuf {
    home_dir.join(".config").join(PODUNIT_DIR_NAME)
}

/// Build the config file path in the user's home directory
pub fn user_config_file_path(home_dir: &Path) -> PathBuf {
    user_config_dir_path(home_dir).join(CONFIG_FILE_NAME)
}

/// Build the hidden local config file path in the current directory
pub fn local_config_file_path(current_dir: &Path) -> PathBuf {
    current_dir.join(LOCAL_DIR_NAME).join(CONFIG_FILE_NAME)
}
