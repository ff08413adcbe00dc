//! Container runtime collaborator contract.
//!
//! The generator never talks to the container engine itself. Everything it
//! needs about pods and containers comes through the handles defined here,
//! queried synchronously for the duration of one generation call.
//!
//! - [`ContainerHandle`]: a single container's identity, config and dependencies
//! - [`PodHandle`]: a pod, its infra container and its members
//! - [`Runtime`]: name/ID resolution for pods and containers
//! - [`Snapshot`]: a serde-backed implementation of all three, loaded from
//!   TOML or JSON

mod snapshot;

pub use snapshot::{ContainerRecord, PodRecord, Snapshot};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// How one container depends on another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    /// Joins the other container's network namespace
    Network,
    /// Joins the other container's IPC namespace
    Ipc,
    /// Joins the other container's PID namespace
    Pid,
    /// Joins the other container's UTS namespace
    Uts,
    /// Joins the other container's mount namespace
    Mount,
    /// Joins the other container's user namespace
    User,
    /// Joins the other container's cgroup namespace
    Cgroup,
    /// Explicit `--requires` declaration
    Requires,
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Network => "network",
            Self::Ipc => "ipc",
            Self::Pid => "pid",
            Self::Uts => "uts",
            Self::Mount => "mount",
            Self::User => "user",
            Self::Cgroup => "cgroup",
            Self::Requires => "requires",
        };
        f.write_str(name)
    }
}

/// A declared dependency on another container, by container ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub container: String,
    pub kind: DependencyKind,
}

impl Dependency {
    pub fn new(container: impl Into<String>, kind: DependencyKind) -> Self {
        Self {
            container: container.into(),
            kind,
        }
    }
}

/// Read access to a container's state.
pub trait ContainerHandle {
    /// Full container ID
    fn id(&self) -> &str;

    /// Container name
    fn name(&self) -> &str;

    /// Seconds the engine waits before killing the container on stop
    fn stop_timeout(&self) -> u32;

    /// Path of the conmon PID file, if the container was created with one
    fn conmon_pid_file(&self) -> Option<&str>;

    /// The literal argv the container was created with
    fn create_command(&self) -> &[String];

    /// ID of the pod the container belongs to
    fn pod_id(&self) -> Option<&str>;

    /// Whether this is its pod's infra container
    fn is_infra(&self) -> bool;

    /// Namespace-sharing and explicit dependencies on other containers
    fn dependencies(&self) -> Vec<Dependency>;

    /// Run root of the engine's storage, if known
    fn run_root(&self) -> Option<&str> {
        None
    }
}

/// Read access to a pod's state.
pub trait PodHandle {
    /// Full pod ID
    fn id(&self) -> &str;

    /// Pod name
    fn name(&self) -> &str;

    /// The literal argv the pod was created with
    fn create_command(&self) -> &[String];

    fn has_infra_container(&self) -> bool;

    /// The pod's infra container
    ///
    /// # Errors
    ///
    /// Returns an error if the pod has no infra container or it cannot be read.
    fn infra_container(&self) -> Result<&dyn ContainerHandle>;

    /// Every container of the pod, infra container included
    ///
    /// # Errors
    ///
    /// Returns an error if the pod's containers cannot be enumerated.
    fn all_containers(&self) -> Result<Vec<&dyn ContainerHandle>>;
}

/// Resolves names and IDs to pod and container handles.
pub trait Runtime {
    /// Look up a pod by exact name, exact ID or unique ID prefix
    ///
    /// # Errors
    ///
    /// Returns an error if the name is ambiguous or the state cannot be read.
    fn lookup_pod(&self, name_or_id: &str) -> Result<Option<Box<dyn PodHandle + '_>>>;

    /// Look up a container by exact name, exact ID or unique ID prefix
    ///
    /// # Errors
    ///
    /// Returns an error if the name is ambiguous or the state cannot be read.
    fn lookup_container(&self, name_or_id: &str)
    -> Result<Option<Box<dyn ContainerHandle + '_>>>;
}

/// Runtime collaborator errors.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// A name or ID prefix matched more than one entity
    #[error("'{name}' matches {matches} {kind}s, use a longer ID")]
    Ambiguous {
        name: String,
        kind: &'static str,
        matches: usize,
    },

    /// The pod has no infra container
    #[error("pod '{pod}' has no infra container")]
    InfraContainerMissing { pod: String },

    /// The pod's infra container is not among its containers
    #[error("infra container '{container}' of pod '{pod}' not found")]
    InfraContainerNotFound { pod: String, container: String },

    /// A container references a pod that does not exist
    #[error("container '{container}' belongs to unknown pod '{pod}'")]
    UnknownPod { container: String, pod: String },

    /// Two entities share an ID
    #[error("duplicate {kind} ID '{id}'")]
    DuplicateId { kind: &'static str, id: String },

    /// IO error reading a snapshot
    #[error("IO error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Snapshot content could not be parsed
    #[error("failed to parse {format} snapshot: {reason}")]
    Parse { format: &'static str, reason: String },

    /// Snapshot file extension is neither TOML nor JSON
    #[error("unsupported snapshot format '{0}', expected .toml or .json")]
    UnsupportedFormat(PathBuf),
}

/// Result type for runtime operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;
