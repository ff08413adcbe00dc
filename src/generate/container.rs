//! Container unit records and the standalone container coordinator.

use super::command::{self, ContainerRewrite};
use super::template::{self, ServiceSettings, UnitHeader, CONTAINER_TEMPLATE};
use super::{GenerateError, GenerateOptions, Generator, Result};
use crate::env::{self, unit};
use crate::runtime::ContainerHandle;
use serde::Serialize;
use tracing::debug;

/// Everything the container template needs.
#[derive(Debug, Clone, Serialize)]
pub struct ContainerInfo {
    pub service_name: String,
    /// Container name or ID, depending on [`GenerateOptions::use_name`]
    pub container_name_or_id: String,
    #[serde(flatten)]
    pub header: UnitHeader,
    #[serde(flatten)]
    pub service: ServiceSettings,
    /// conmon PID file, or a runtime-directory path in new mode
    pub pid_file: String,
    /// New mode only
    pub container_id_file: Option<String>,
    /// ID file of the pod the container joins, new mode only
    pub pod_id_file: Option<String>,
    /// Services this container's lifecycle is bound to, sorted
    pub bound_to_services: Vec<String>,
    pub create_command: Vec<String>,
    pub exec_start_pre: Option<String>,
    pub exec_start: String,
    pub exec_stop: String,
    pub exec_stop_post: String,
}

impl ContainerInfo {
    /// Bind the container to `services`, keeping the list sorted and free of
    /// duplicates and of the container's own service.
    pub fn bind_to(&mut self, services: impl IntoIterator<Item = String>) {
        self.bound_to_services.extend(services);
        self.bound_to_services.retain(|s| *s != self.service_name);
        self.bound_to_services.sort();
        self.bound_to_services.dedup();
    }

    pub fn render(&self) -> Result<String> {
        template::render(CONTAINER_TEMPLATE, self, &self.service_name)
    }
}

/// Name or ID used to refer to a container, per the options.
pub(super) fn container_name_or_id<'a>(
    container: &'a dyn ContainerHandle,
    options: &GenerateOptions,
) -> &'a str {
    if options.use_name {
        container.name()
    } else {
        container.id()
    }
}

impl Generator {
    /// Generate the unit of a single container.
    ///
    /// Returns the service name and the unit text.
    ///
    /// # Errors
    ///
    /// Fails if the container has no conmon PID file, if template mode is
    /// requested without new mode, or if new mode cannot rewrite the
    /// container's creation command.
    pub fn container_unit(
        &self,
        container: &dyn ContainerHandle,
        options: &GenerateOptions,
    ) -> Result<(String, String)> {
        let info = self.container_info(container, options, None)?;
        let unit = info.render()?;
        Ok((info.service_name, unit))
    }

    /// Assemble the unit record of a container. `pod_id_file` is the ID file
    /// of the pod unit the container is generated with, if any.
    pub(super) fn container_info(
        &self,
        container: &dyn ContainerHandle,
        options: &GenerateOptions,
        pod_id_file: Option<&str>,
    ) -> Result<ContainerInfo> {
        if options.template_unit_file && !options.new {
            return Err(GenerateError::TemplateRequiresNew);
        }

        let stop_timeout = options
            .stop_timeout
            .unwrap_or_else(|| container.stop_timeout());

        let conmon_pid_file = container
            .conmon_pid_file()
            .ok_or_else(|| GenerateError::MissingPidFile(container.name().to_string()))?;

        let create_command = container.create_command();
        if options.new && create_command.is_empty() {
            return Err(GenerateError::MissingCreateCommand {
                kind: "container",
                id: container.id().to_string(),
            });
        }

        let name_or_id = container_name_or_id(container, options);
        let mut service_name = options.container_service_name(name_or_id);
        if options.template_unit_file {
            service_name.push('@');
        }

        let mut header = self.header(options, container.run_root());
        header.identify_specifier = options.template_unit_file;

        let mut info = ContainerInfo {
            service_name,
            container_name_or_id: name_or_id.to_string(),
            header,
            service: self.service_settings(options, stop_timeout),
            pid_file: conmon_pid_file.to_string(),
            container_id_file: None,
            pod_id_file: None,
            bound_to_services: Vec::new(),
            create_command: create_command.to_vec(),
            exec_start_pre: None,
            exec_start: "{{ executable }} start {{ container_name_or_id }}".to_string(),
            exec_stop: "{{ executable }} stop -t {{ stop_timeout }} {{ container_name_or_id }}"
                .to_string(),
            exec_stop_post: "{{ executable }} stop -t {{ stop_timeout }} {{ container_name_or_id }}"
                .to_string(),
        };

        if options.new {
            // Instances of a template unit share one definition, so their
            // files are keyed on the instance's full unit name.
            let stem = if options.template_unit_file {
                "%n"
            } else {
                info.service_name.as_str()
            };
            info.pid_file = env::runtime_dir_file(stem, unit::PID_FILE_SUFFIX);
            info.container_id_file =
                Some(env::runtime_dir_file(stem, unit::CONTAINER_ID_FILE_SUFFIX));
            info.pod_id_file = pod_id_file.map(str::to_string);

            let rewritten = command::rewrite_container_run(
                create_command,
                &self.executable,
                ContainerRewrite {
                    in_pod: pod_id_file.is_some(),
                    instance_name: options.template_unit_file,
                },
            )?;
            info.service.root_flags = rewritten.root_flags;

            info.exec_start_pre = Some(format!(
                "{} {{{{ pid_file }}}} {{{{ container_id_file }}}}",
                env::REMOVE_COMMAND
            ));
            info.exec_start = rewritten.run;
            info.exec_stop = "{{ executable }} {% if root_flags %}{{ root_flags }} {% endif %}\
                stop --ignore --cidfile {{ container_id_file }} -t {{ stop_timeout }}"
                .to_string();
            info.exec_stop_post = "{{ executable }} {% if root_flags %}{{ root_flags }} {% endif %}\
                rm --ignore -f --cidfile {{ container_id_file }}"
                .to_string();
        }

        debug!(
            "Assembled unit record {} for container {}",
            info.service_name,
            container.id()
        );
        Ok(info)
    }
}
