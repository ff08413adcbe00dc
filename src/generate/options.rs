//! User-facing generation options.

use super::GenerateError;
use crate::env;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// systemd `Restart=` policy of a generated unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestartPolicy {
    No,
    OnSuccess,
    #[default]
    OnFailure,
    OnAbnormal,
    OnWatchdog,
    OnAbort,
    Always,
}

impl RestartPolicy {
    /// Every policy systemd accepts, in its documented order
    pub const ALL: [RestartPolicy; 7] = [
        Self::No,
        Self::OnSuccess,
        Self::OnFailure,
        Self::OnAbnormal,
        Self::OnWatchdog,
        Self::OnAbort,
        Self::Always,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::No => "no",
            Self::OnSuccess => "on-success",
            Self::OnFailure => "on-failure",
            Self::OnAbnormal => "on-abnormal",
            Self::OnWatchdog => "on-watchdog",
            Self::OnAbort => "on-abort",
            Self::Always => "always",
        }
    }
}

impl fmt::Display for RestartPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RestartPolicy {
    type Err = GenerateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| GenerateError::InvalidRestartPolicy(s.to_string()))
    }
}

/// Options controlling one generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateOptions {
    /// Refer to entities by name instead of ID
    pub use_name: bool,
    /// Create the entity on every activation instead of starting an existing one
    pub new: bool,
    /// Omit the autogenerated header and timestamp
    pub no_header: bool,
    /// Generate an instantiable `name@.service` template unit
    pub template_unit_file: bool,
    pub restart_policy: Option<RestartPolicy>,
    /// Seconds systemd sleeps before restarting the service
    pub restart_sec: Option<u32>,
    /// Overrides the entity's own stop timeout
    pub stop_timeout: Option<u32>,
    /// Seconds systemd waits for the service to start
    pub start_timeout: Option<u32>,
    pub container_prefix: String,
    pub pod_prefix: String,
    pub separator: String,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            use_name: false,
            new: false,
            no_header: false,
            template_unit_file: false,
            restart_policy: None,
            restart_sec: None,
            stop_timeout: None,
            start_timeout: None,
            container_prefix: env::unit::DEFAULT_CONTAINER_PREFIX.to_string(),
            pod_prefix: env::unit::DEFAULT_POD_PREFIX.to_string(),
            separator: env::unit::DEFAULT_SEPARATOR.to_string(),
        }
    }
}

impl GenerateOptions {
    /// The restart policy to render, falling back to `on-failure`.
    pub fn effective_restart_policy(&self) -> RestartPolicy {
        self.restart_policy.unwrap_or_default()
    }

    /// Service name of a container referred to by `name_or_id`.
    pub fn container_service_name(&self, name_or_id: &str) -> String {
        service_name(&self.container_prefix, &self.separator, name_or_id)
    }

    /// Service name of a pod referred to by `name_or_id`.
    pub fn pod_service_name(&self, name_or_id: &str) -> String {
        service_name(&self.pod_prefix, &self.separator, name_or_id)
    }
}

/// `<prefix><separator><nameOrID>`, or the bare name when the prefix is empty.
fn service_name(prefix: &str, separator: &str, name_or_id: &str) -> String {
    if prefix.is_empty() {
        name_or_id.to_string()
    } else {
        format!("{}{}{}", prefix, separator, name_or_id)
    }
}
