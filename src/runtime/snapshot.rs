//! Serde-backed runtime state.
//!
//! A [`Snapshot`] is a frozen view of pods and containers, typically exported
//! from the engine's inspect output and stored as TOML or JSON. It implements
//! the runtime collaborator traits so the generator can run against it.

use super::{ContainerHandle, Dependency, DependencyKind, PodHandle, Result, Runtime, RuntimeError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Default stop timeout of the engine, in seconds
const DEFAULT_STOP_TIMEOUT: u32 = 10;

fn default_stop_timeout() -> u32 {
    DEFAULT_STOP_TIMEOUT
}

/// Frozen pod and container state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Storage run root, inherited by containers that don't set their own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_root: Option<String>,
    #[serde(default)]
    pub pods: Vec<PodRecord>,
    #[serde(default)]
    pub containers: Vec<ContainerRecord>,
}

/// A pod as recorded in a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub create_command: Vec<String>,
    /// ID of the infra container
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infra_container: Option<String>,
}

/// A container as recorded in a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerRecord {
    pub id: String,
    pub name: String,
    #[serde(default = "default_stop_timeout")]
    pub stop_timeout: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conmon_pid_file: Option<String>,
    #[serde(default)]
    pub create_command: Vec<String>,
    /// ID of the pod the container belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod: Option<String>,
    #[serde(default)]
    pub infra: bool,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_root: Option<String>,
}

impl PodRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            create_command: Vec::new(),
            infra_container: None,
        }
    }

    /// Set the infra container ID.
    pub fn with_infra_container(mut self, id: impl Into<String>) -> Self {
        self.infra_container = Some(id.into());
        self
    }

    /// Set the recorded create command.
    pub fn with_create_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.create_command = command.into_iter().map(|s| s.into()).collect();
        self
    }
}

impl ContainerRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            conmon_pid_file: None,
            create_command: Vec::new(),
            pod: None,
            infra: false,
            dependencies: Vec::new(),
            run_root: None,
        }
    }

    /// Place the container in a pod.
    pub fn with_pod(mut self, pod_id: impl Into<String>) -> Self {
        self.pod = Some(pod_id.into());
        self
    }

    /// Mark the container as its pod's infra container.
    pub fn infra(mut self) -> Self {
        self.infra = true;
        self
    }

    pub fn with_stop_timeout(mut self, seconds: u32) -> Self {
        self.stop_timeout = seconds;
        self
    }

    pub fn with_conmon_pid_file(mut self, path: impl Into<String>) -> Self {
        self.conmon_pid_file = Some(path.into());
        self
    }

    pub fn with_create_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.create_command = command.into_iter().map(|s| s.into()).collect();
        self
    }

    /// Declare a dependency on another container.
    pub fn with_dependency(mut self, container: impl Into<String>, kind: DependencyKind) -> Self {
        self.dependencies.push(Dependency::new(container, kind));
        self
    }

    pub fn with_run_root(mut self, run_root: impl Into<String>) -> Self {
        self.run_root = Some(run_root.into());
        self
    }
}

impl ContainerHandle for ContainerRecord {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn stop_timeout(&self) -> u32 {
        self.stop_timeout
    }

    fn conmon_pid_file(&self) -> Option<&str> {
        self.conmon_pid_file.as_deref().filter(|p| !p.is_empty())
    }

    fn create_command(&self) -> &[String] {
        &self.create_command
    }

    fn pod_id(&self) -> Option<&str> {
        self.pod.as_deref()
    }

    fn is_infra(&self) -> bool {
        self.infra
    }

    fn dependencies(&self) -> Vec<Dependency> {
        self.dependencies.clone()
    }

    fn run_root(&self) -> Option<&str> {
        self.run_root.as_deref()
    }
}

/// A pod record bound to the snapshot that holds its containers.
struct SnapshotPod<'a> {
    record: &'a PodRecord,
    snapshot: &'a Snapshot,
}

impl PodHandle for SnapshotPod<'_> {
    fn id(&self) -> &str {
        &self.record.id
    }

    fn name(&self) -> &str {
        &self.record.name
    }

    fn create_command(&self) -> &[String] {
        &self.record.create_command
    }

    fn has_infra_container(&self) -> bool {
        self.record.infra_container.is_some()
    }

    fn infra_container(&self) -> Result<&dyn ContainerHandle> {
        let infra_id = self.record.infra_container.as_deref().ok_or_else(|| {
            RuntimeError::InfraContainerMissing {
                pod: self.record.name.clone(),
            }
        })?;

        self.snapshot
            .members(&self.record.id)
            .find(|c| c.id == infra_id)
            .map(|c| c as &dyn ContainerHandle)
            .ok_or_else(|| RuntimeError::InfraContainerNotFound {
                pod: self.record.name.clone(),
                container: infra_id.to_string(),
            })
    }

    fn all_containers(&self) -> Result<Vec<&dyn ContainerHandle>> {
        Ok(self
            .snapshot
            .members(&self.record.id)
            .map(|c| c as &dyn ContainerHandle)
            .collect())
    }
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pod(mut self, pod: PodRecord) -> Self {
        self.pods.push(pod);
        self
    }

    pub fn with_container(mut self, container: ContainerRecord) -> Self {
        self.containers.push(container);
        self
    }

    /// Parse a TOML snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the content is not valid TOML or fails validation.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let snapshot: Snapshot = toml::from_str(content).map_err(|e| RuntimeError::Parse {
            format: "TOML",
            reason: e.to_string(),
        })?;
        snapshot.prepare()
    }

    /// Parse a JSON snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the content is not valid JSON or fails validation.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let snapshot: Snapshot =
            serde_json::from_str(content).map_err(|e| RuntimeError::Parse {
                format: "JSON",
                reason: e.to_string(),
            })?;
        snapshot.prepare()
    }

    /// Load a snapshot file, choosing the format by extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, has an unknown extension
    /// or fails to parse.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading runtime snapshot from {:?}", path);

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        let content = fs::read_to_string(path).map_err(|source| RuntimeError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        match extension.as_deref() {
            Some("toml") => Self::from_toml_str(&content),
            Some("json") => Self::from_json_str(&content),
            _ => Err(RuntimeError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    /// Check referential integrity between pods and containers.
    ///
    /// # Errors
    ///
    /// Returns an error on duplicate IDs, containers in unknown pods, or pods
    /// whose infra container is not one of their members.
    pub fn validate(&self) -> Result<()> {
        let mut pod_ids = HashSet::new();
        for pod in &self.pods {
            if !pod_ids.insert(pod.id.as_str()) {
                return Err(RuntimeError::DuplicateId {
                    kind: "pod",
                    id: pod.id.clone(),
                });
            }
        }

        let mut container_ids = HashSet::new();
        for container in &self.containers {
            if !container_ids.insert(container.id.as_str()) {
                return Err(RuntimeError::DuplicateId {
                    kind: "container",
                    id: container.id.clone(),
                });
            }
            if let Some(pod) = &container.pod {
                if !pod_ids.contains(pod.as_str()) {
                    return Err(RuntimeError::UnknownPod {
                        container: container.name.clone(),
                        pod: pod.clone(),
                    });
                }
            }
        }

        for pod in &self.pods {
            if let Some(infra_id) = &pod.infra_container {
                if !self.members(&pod.id).any(|c| &c.id == infra_id) {
                    return Err(RuntimeError::InfraContainerNotFound {
                        pod: pod.name.clone(),
                        container: infra_id.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Containers belonging to the given pod.
    pub fn members<'a>(&'a self, pod_id: &'a str) -> impl Iterator<Item = &'a ContainerRecord> {
        self.containers
            .iter()
            .filter(move |c| c.pod.as_deref() == Some(pod_id))
    }

    /// Validate, mark infra containers and propagate the shared run root.
    fn prepare(mut self) -> Result<Self> {
        self.validate()?;

        let infra_ids: HashSet<String> = self
            .pods
            .iter()
            .filter_map(|p| p.infra_container.clone())
            .collect();
        for container in &mut self.containers {
            if infra_ids.contains(&container.id) {
                container.infra = true;
            }
            if container.run_root.is_none() {
                container.run_root = self.run_root.clone();
            }
        }

        debug!(
            "Snapshot holds {} pods and {} containers",
            self.pods.len(),
            self.containers.len()
        );
        Ok(self)
    }
}

/// Resolve by exact name, exact ID, then unique ID prefix.
fn resolve<'a, T>(
    items: &'a [T],
    name_or_id: &str,
    kind: &'static str,
    id: impl Fn(&T) -> &str,
    name: impl Fn(&T) -> &str,
) -> Result<Option<&'a T>> {
    if let Some(item) = items.iter().find(|i| name(*i) == name_or_id) {
        return Ok(Some(item));
    }
    if let Some(item) = items.iter().find(|i| id(*i) == name_or_id) {
        return Ok(Some(item));
    }
    if name_or_id.is_empty() {
        return Ok(None);
    }

    let matches: Vec<&T> = items
        .iter()
        .filter(|i| id(*i).starts_with(name_or_id))
        .collect();
    match matches.len() {
        0 => Ok(None),
        1 => Ok(Some(matches[0])),
        n => Err(RuntimeError::Ambiguous {
            name: name_or_id.to_string(),
            kind,
            matches: n,
        }),
    }
}

impl Runtime for Snapshot {
    fn lookup_pod(&self, name_or_id: &str) -> Result<Option<Box<dyn PodHandle + '_>>> {
        let record = resolve(
            &self.pods,
            name_or_id,
            "pod",
            |p| p.id.as_str(),
            |p| p.name.as_str(),
        )?;
        Ok(record.map(|record| {
            Box::new(SnapshotPod {
                record,
                snapshot: self,
            }) as Box<dyn PodHandle + '_>
        }))
    }

    fn lookup_container(
        &self,
        name_or_id: &str,
    ) -> Result<Option<Box<dyn ContainerHandle + '_>>> {
        let record = resolve(
            &self.containers,
            name_or_id,
            "container",
            |c| c.id.as_str(),
            |c| c.name.as_str(),
        )?;
        Ok(record.map(|c| Box::new(c.clone()) as Box<dyn ContainerHandle + '_>))
    }
}
