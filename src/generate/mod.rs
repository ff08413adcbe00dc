//! systemd unit generation for pods and containers.
//!
//! Generation is a pure transform from runtime state and options to a map of
//! service name to unit text:
//!
//! - [`graph`]: container dependency graph with the infra container as root
//! - [`command`]: rewriting of recorded creation commands for new mode
//! - [`template`]: unit templates and the two-pass renderer
//! - `pod` / `container`: unit record assembly and the unit coordinators
//!
//! ## Usage
//!
//! ```rust
//! use podunit::generate::{GenerateOptions, Generator};
//! use podunit::runtime::{ContainerRecord, DependencyKind, PodRecord, Snapshot};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let snapshot = Snapshot::new()
//!     .with_pod(PodRecord::new("p1", "p1").with_infra_container("i1"))
//!     .with_container(
//!         ContainerRecord::new("i1", "p1-infra")
//!             .with_pod("p1")
//!             .infra()
//!             .with_conmon_pid_file("/run/i1.pid"),
//!     )
//!     .with_container(
//!         ContainerRecord::new("c1", "c1")
//!             .with_pod("p1")
//!             .with_conmon_pid_file("/run/c1.pid")
//!             .with_dependency("i1", DependencyKind::Network),
//!     );
//!
//! let generator = Generator::with_executable("/usr/bin/podman");
//! let report = generator.generate(&snapshot, "p1", &GenerateOptions::default())?;
//! assert_eq!(report.units.len(), 2);
//! # Ok(())
//! # }
//! ```

pub mod command;
mod container;
pub mod graph;
mod options;
mod pod;
pub mod template;

#[cfg(test)]
mod tests;

pub use command::CommandError;
pub use container::ContainerInfo;
pub use graph::{DependencyGraph, GraphError};
pub use options::{GenerateOptions, RestartPolicy};
pub use pod::PodInfo;

use crate::env;
use crate::runtime::{Runtime, RuntimeError};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Unit generation errors.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// Template unit files can only be generated for containers
    #[error("--template is not supported for pods")]
    TemplateNotSupportedForPods,

    /// Template unit files need the entity to be created on activation
    #[error("--template is only supported in combination with --new")]
    TemplateRequiresNew,

    /// The pod has no infra container to act as its main service
    #[error("error generating systemd unit files: pod '{0}' has no infra container")]
    NoInfraContainer(String),

    /// The pod has no containers besides its infra container
    #[error("error generating systemd unit files: pod '{0}' has no containers")]
    NoContainers(String),

    /// The entity was created without a conmon PID file
    #[error(
        "conmon PID file path is empty for '{0}', try to recreate the container with --conmon-pidfile flag"
    )]
    MissingPidFile(String),

    /// New mode without a recorded creation command
    #[error("cannot use --new on {kind} '{id}': no create command found")]
    MissingCreateCommand { kind: &'static str, id: String },

    /// Units for infra containers are generated through their pod
    #[error("'{container}' is the infra container of pod '{pod}', generate units for the pod instead")]
    InfraContainerUnit { container: String, pod: String },

    /// Unknown restart policy
    #[error("'{0}' is not a valid restart policy, expected one of: no, on-success, on-failure, on-abnormal, on-watchdog, on-abort, always")]
    InvalidRestartPolicy(String),

    /// Two units of one output set share a service name
    #[error("service name '{0}' is used by more than one unit")]
    DuplicateServiceName(String),

    /// No pod or container with that name or ID
    #[error("no such pod or container: '{0}'")]
    NotFound(String),

    /// Rendering a unit template failed
    #[error("failed to render unit '{unit}' ({pass} pass): {reason}")]
    Template {
        unit: String,
        pass: &'static str,
        reason: String,
    },

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Result type for generation.
pub type Result<T> = std::result::Result<T, GenerateError>;

/// Units produced by one generation call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenerateReport {
    /// Service name to unit file text
    pub units: BTreeMap<String, String>,
}

impl GenerateReport {
    /// Service names in output order
    pub fn service_names(&self) -> impl Iterator<Item = &str> {
        self.units.keys().map(String::as_str)
    }
}

/// Unit generator.
///
/// Holds the settings that stay fixed across generation calls: the engine
/// executable written into `Exec*=` lines, the version named in the header,
/// and whether headers carry a timestamp.
#[derive(Debug, Clone)]
pub struct Generator {
    executable: String,
    version: String,
    timestamps: bool,
}

impl Default for Generator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator {
    /// Create a generator using the engine executable found on `PATH`.
    pub fn new() -> Self {
        let executable = match which::which(env::ENGINE_BINARY_NAME) {
            Ok(path) => path.to_string_lossy().into_owned(),
            Err(e) => {
                warn!(
                    "Could not find {} executable location, using default {}: {}",
                    env::ENGINE_BINARY_NAME,
                    env::DEFAULT_EXECUTABLE,
                    e
                );
                env::DEFAULT_EXECUTABLE.to_string()
            }
        };
        Self::with_executable(executable)
    }

    /// Create a generator writing `executable` into every `Exec*=` line.
    pub fn with_executable(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamps: true,
        }
    }

    /// Set the version named in the autogenerated header
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Enable or disable the header timestamp
    pub fn with_timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = enabled;
        self
    }

    /// Generate units for the pod or container named by `name_or_id`.
    ///
    /// Containers are looked up first, then pods. A pod yields its own unit
    /// plus one unit per member container.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::NotFound`] if nothing matches, and any error
    /// of [`Generator::pod_units`] or [`Generator::container_unit`].
    pub fn generate(
        &self,
        runtime: &dyn Runtime,
        name_or_id: &str,
        options: &GenerateOptions,
    ) -> Result<GenerateReport> {
        if let Some(container) = runtime.lookup_container(name_or_id)? {
            if container.is_infra() {
                return Err(GenerateError::InfraContainerUnit {
                    container: container.name().to_string(),
                    pod: container.pod_id().unwrap_or_default().to_string(),
                });
            }
            let (service_name, unit) = self.container_unit(container.as_ref(), options)?;
            let mut units = BTreeMap::new();
            units.insert(service_name, unit);
            info!("Generated 1 unit for container {}", name_or_id);
            return Ok(GenerateReport { units });
        }

        if let Some(pod) = runtime.lookup_pod(name_or_id)? {
            let units = self.pod_units(pod.as_ref(), options)?;
            info!("Generated {} units for pod {}", units.len(), name_or_id);
            return Ok(GenerateReport { units });
        }

        Err(GenerateError::NotFound(name_or_id.to_string()))
    }

    fn header(&self, options: &GenerateOptions, run_root: Option<&str>) -> template::UnitHeader {
        let timestamp = (self.timestamps && !options.no_header).then(|| {
            chrono::Local::now()
                .format("%a %b %e %H:%M:%S %Z %Y")
                .to_string()
        });
        debug!("Unit header timestamp: {:?}", timestamp);

        template::UnitHeader {
            generate_no_header: options.no_header,
            timestamp,
            generator_version: self.version.clone(),
            run_root: run_root.map(str::to_string),
            identify_specifier: false,
        }
    }

    fn service_settings(&self, options: &GenerateOptions, stop_timeout: u32) -> template::ServiceSettings {
        template::ServiceSettings {
            env_variable: env::SYSTEMD_UNIT_ENV_VARIABLE.to_string(),
            restart_policy: options.effective_restart_policy(),
            restart_sec: options.restart_sec,
            start_timeout: options.start_timeout,
            stop_timeout,
            timeout_stop_sec: env::MIN_TIMEOUT_STOP_SEC.saturating_add(stop_timeout),
            executable: self.executable.clone(),
            root_flags: String::new(),
        }
    }
}
