//! Container dependency graph.
//!
//! Dependencies come from namespace sharing and explicit `--requires`
//! declarations. The pod's infra container anchors startup ordering: every
//! other container that declares no dependency is made to depend on it.

use crate::runtime::{ContainerHandle, DependencyKind};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Dependency graph errors.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// The same container ID was passed twice
    #[error("container '{0}' appears more than once in the input list")]
    DuplicateContainer(String),

    /// More than one container claims to be the infra container
    #[error("containers '{first}' and '{second}' are both infra containers")]
    MultipleInfra { first: String, second: String },

    /// A dependency points outside the input list
    #[error("container '{container}' depends on container '{dependency}' not found in input list")]
    MissingDependency {
        container: String,
        dependency: String,
    },

    /// The dependencies form a cycle
    #[error("dependency cycle detected: {}", .0.join(" -> "))]
    Cycle(Vec<String>),
}

/// Result type for graph operations.
pub type Result<T> = std::result::Result<T, GraphError>;

struct Node<'a> {
    container: &'a dyn ContainerHandle,
    /// IDs this container must start after, in declaration order
    depends_on: Vec<String>,
}

/// Directed graph of container dependencies, keyed by container ID.
pub struct DependencyGraph<'a> {
    nodes: HashMap<String, Node<'a>>,
    infra_id: Option<String>,
}

impl<'a> DependencyGraph<'a> {
    /// Build the graph for the given containers.
    ///
    /// # Errors
    ///
    /// Returns an error on duplicate IDs, multiple infra containers,
    /// dependencies outside the input list, or a dependency cycle.
    pub fn build(containers: &[&'a dyn ContainerHandle]) -> Result<Self> {
        let mut nodes: HashMap<String, Node<'a>> = HashMap::with_capacity(containers.len());
        let mut infra_id: Option<String> = None;

        for &container in containers {
            let id = container.id().to_string();
            if nodes.contains_key(&id) {
                return Err(GraphError::DuplicateContainer(id));
            }
            if container.is_infra() {
                if let Some(first) = &infra_id {
                    return Err(GraphError::MultipleInfra {
                        first: first.clone(),
                        second: id,
                    });
                }
                infra_id = Some(id.clone());
            }
            nodes.insert(
                id,
                Node {
                    container,
                    depends_on: Vec::new(),
                },
            );
        }

        let mut graph = Self { nodes, infra_id };

        for &container in containers {
            for dependency in container.dependencies() {
                graph.add_edge(container.id(), &dependency.container, dependency.kind)?;
            }
        }

        if let Some(infra_id) = graph.infra_id.clone() {
            let unanchored: Vec<String> = graph
                .nodes
                .iter()
                .filter(|(id, node)| **id != infra_id && node.depends_on.is_empty())
                .map(|(id, _)| id.clone())
                .collect();
            for id in unanchored {
                graph.add_edge(&id, &infra_id, DependencyKind::Requires)?;
            }
        }

        if let Some(cycle) = graph.find_cycle() {
            return Err(GraphError::Cycle(cycle));
        }

        debug!(
            "Built dependency graph with {} containers, infra: {:?}",
            graph.nodes.len(),
            graph.infra_id
        );
        Ok(graph)
    }

    fn add_edge(&mut self, from: &str, to: &str, kind: DependencyKind) -> Result<()> {
        if !self.nodes.contains_key(to) {
            return Err(GraphError::MissingDependency {
                container: from.to_string(),
                dependency: to.to_string(),
            });
        }

        let Some(node) = self.nodes.get_mut(from) else {
            return Err(GraphError::MissingDependency {
                container: to.to_string(),
                dependency: from.to_string(),
            });
        };
        if node.depends_on.iter().any(|d| d == to) {
            return Ok(());
        }
        node.depends_on.push(to.to_string());

        debug!("Container {} depends on {} ({})", from, to, kind);
        Ok(())
    }

    /// Return one dependency cycle as a path of IDs, if any exists.
    fn find_cycle(&self) -> Option<Vec<String>> {
        let mut ids: Vec<&String> = self.nodes.keys().collect();
        ids.sort();

        let mut visited = HashSet::new();
        for id in ids {
            let mut path = Vec::new();
            if let Some(cycle) = self.find_cycle_helper(id, &mut visited, &mut path) {
                return Some(cycle);
            }
        }
        None
    }

    fn find_cycle_helper(
        &self,
        id: &str,
        visited: &mut HashSet<String>,
        path: &mut Vec<String>,
    ) -> Option<Vec<String>> {
        if let Some(start) = path.iter().position(|p| p == id) {
            let mut cycle = path[start..].to_vec();
            cycle.push(id.to_string());
            return Some(cycle);
        }

        if visited.contains(id) {
            return None;
        }

        visited.insert(id.to_string());
        path.push(id.to_string());

        if let Some(node) = self.nodes.get(id) {
            for dep in &node.depends_on {
                if let Some(cycle) = self.find_cycle_helper(dep, visited, path) {
                    return Some(cycle);
                }
            }
        }

        path.pop();
        None
    }

    /// The infra container, if one was part of the input.
    pub fn infra(&self) -> Option<&'a dyn ContainerHandle> {
        self.infra_id
            .as_ref()
            .and_then(|id| self.nodes.get(id))
            .map(|node| node.container)
    }

    /// Every container with its dependencies. Iteration order is unspecified.
    pub fn dependency_map(&self) -> Vec<(&'a dyn ContainerHandle, Vec<&'a dyn ContainerHandle>)> {
        self.nodes
            .values()
            .map(|node| (node.container, self.resolve(&node.depends_on)))
            .collect()
    }

    fn resolve(&self, ids: &[String]) -> Vec<&'a dyn ContainerHandle> {
        ids.iter()
            .filter_map(|id| self.nodes.get(id))
            .map(|node| node.container)
            .collect()
    }
}
