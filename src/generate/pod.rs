//! Pod unit records and the pod coordinator.

use super::command;
use super::container::container_name_or_id;
use super::template::{self, ServiceSettings, UnitHeader, POD_TEMPLATE};
use super::{ContainerInfo, DependencyGraph, GenerateError, GenerateOptions, Generator, Result};
use crate::env::{self, unit};
use crate::runtime::PodHandle;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Everything the pod template needs.
#[derive(Debug, Clone, Serialize)]
pub struct PodInfo {
    pub service_name: String,
    /// Infra container name or ID, depending on [`GenerateOptions::use_name`]
    pub infra_name_or_id: String,
    #[serde(flatten)]
    pub header: UnitHeader,
    #[serde(flatten)]
    pub service: ServiceSettings,
    /// conmon PID file of the infra container, or a runtime-directory path
    /// in new mode
    pub pid_file: String,
    /// New mode only
    pub pod_id_file: Option<String>,
    /// Member container services, sorted
    pub required_services: Vec<String>,
    pub create_command: Vec<String>,
    pub exec_start_pre1: Option<String>,
    pub exec_start_pre2: Option<String>,
    pub exec_start: String,
    pub exec_stop: String,
    pub exec_stop_post: String,
}

impl PodInfo {
    pub fn render(&self) -> Result<String> {
        template::render(POD_TEMPLATE, self, &self.service_name)
    }
}

impl Generator {
    /// Generate the units of a pod: one for the pod itself, backed by its
    /// infra container, and one per member container.
    ///
    /// # Errors
    ///
    /// Fails without output if template mode is requested, the pod has no
    /// infra container or no members, the dependency graph is invalid, two
    /// units would share a service name, or any unit fails to assemble or
    /// render.
    pub fn pod_units(
        &self,
        pod: &dyn PodHandle,
        options: &GenerateOptions,
    ) -> Result<BTreeMap<String, String>> {
        if options.template_unit_file {
            return Err(GenerateError::TemplateNotSupportedForPods);
        }
        if !pod.has_infra_container() {
            return Err(GenerateError::NoInfraContainer(pod.name().to_string()));
        }

        let mut pod_info = self.pod_info(pod, options)?;
        debug!("Collected infra container of pod {}", pod.name());

        let containers = pod.all_containers()?;
        let graph = DependencyGraph::build(&containers)?;
        debug!("Built dependency graph of pod {}", pod.name());

        let infra_id = graph
            .infra()
            .map(|infra| infra.id().to_string())
            .ok_or_else(|| GenerateError::NoInfraContainer(pod.name().to_string()))?;

        if containers.iter().all(|c| c.id() == infra_id) {
            return Err(GenerateError::NoContainers(pod.name().to_string()));
        }

        let mut container_infos: Vec<ContainerInfo> = Vec::with_capacity(containers.len());
        for (container, dependencies) in graph.dependency_map() {
            if container.id() == infra_id {
                continue;
            }

            let mut info =
                self.container_info(container, options, pod_info.pod_id_file.as_deref())?;
            info.bind_to(dependencies.iter().map(|dep| {
                if dep.id() == infra_id {
                    pod_info.service_name.clone()
                } else {
                    options.container_service_name(container_name_or_id(*dep, options))
                }
            }));
            pod_info.required_services.push(info.service_name.clone());
            container_infos.push(info);
        }
        pod_info.required_services.sort();
        debug!(
            "Assembled {} container units for pod {}",
            container_infos.len(),
            pod.name()
        );

        let mut seen = BTreeSet::new();
        for name in std::iter::once(&pod_info.service_name).chain(&pod_info.required_services) {
            if !seen.insert(name) {
                return Err(GenerateError::DuplicateServiceName(name.clone()));
            }
        }

        let mut units = BTreeMap::new();
        units.insert(pod_info.service_name.clone(), pod_info.render()?);
        for info in &container_infos {
            units.insert(info.service_name.clone(), info.render()?);
        }
        debug!("Rendered {} units for pod {}", units.len(), pod.name());

        Ok(units)
    }

    fn pod_info(&self, pod: &dyn PodHandle, options: &GenerateOptions) -> Result<PodInfo> {
        let infra = pod.infra_container()?;

        let stop_timeout = options.stop_timeout.unwrap_or_else(|| infra.stop_timeout());

        let conmon_pid_file = infra
            .conmon_pid_file()
            .ok_or_else(|| GenerateError::MissingPidFile(infra.name().to_string()))?;

        let create_command = pod.create_command();
        if options.new && create_command.is_empty() {
            return Err(GenerateError::MissingCreateCommand {
                kind: "pod",
                id: pod.id().to_string(),
            });
        }

        let (name_or_id, infra_name_or_id) = if options.use_name {
            (pod.name(), infra.name())
        } else {
            (pod.id(), infra.id())
        };
        let service_name = options.pod_service_name(name_or_id);

        let mut info = PodInfo {
            infra_name_or_id: infra_name_or_id.to_string(),
            header: self.header(options, infra.run_root()),
            service: self.service_settings(options, stop_timeout),
            pid_file: conmon_pid_file.to_string(),
            pod_id_file: None,
            required_services: Vec::new(),
            create_command: create_command.to_vec(),
            exec_start_pre1: None,
            exec_start_pre2: None,
            exec_start: "{{ executable }} start {{ infra_name_or_id }}".to_string(),
            exec_stop: "{{ executable }} stop -t {{ stop_timeout }} {{ infra_name_or_id }}"
                .to_string(),
            exec_stop_post: "{{ executable }} stop -t {{ stop_timeout }} {{ infra_name_or_id }}"
                .to_string(),
            service_name,
        };

        if options.new {
            info.pid_file = env::runtime_dir_file(&info.service_name, unit::PID_FILE_SUFFIX);
            info.pod_id_file = Some(env::runtime_dir_file(
                &info.service_name,
                unit::POD_ID_FILE_SUFFIX,
            ));

            let rewritten = command::rewrite_pod_create(create_command, &self.executable)?;
            info.service.root_flags = rewritten.root_flags;

            info.exec_start_pre1 = Some(format!(
                "{} {{{{ pid_file }}}} {{{{ pod_id_file }}}}",
                env::REMOVE_COMMAND
            ));
            info.exec_start_pre2 = Some(rewritten.create);
            info.exec_start = "{{ executable }} {% if root_flags %}{{ root_flags }} {% endif %}\
                pod start --pod-id-file {{ pod_id_file }}"
                .to_string();
            info.exec_stop = "{{ executable }} {% if root_flags %}{{ root_flags }} {% endif %}\
                pod stop --ignore --pod-id-file {{ pod_id_file }} -t {{ stop_timeout }}"
                .to_string();
            info.exec_stop_post = "{{ executable }} {% if root_flags %}{{ root_flags }} {% endif %}\
                pod rm --ignore -f --pod-id-file {{ pod_id_file }}"
                .to_string();
        }

        Ok(info)
    }
}
