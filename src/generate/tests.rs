use super::*;
use crate::runtime::{ContainerRecord, DependencyKind, PodRecord, Snapshot};

fn generator() -> Generator {
    Generator::with_executable("/usr/bin/podman").with_timestamps(false)
}

fn infra(pod: &str) -> ContainerRecord {
    ContainerRecord::new(format!("infra-{}", pod), format!("{}-infra", pod))
        .with_pod(pod)
        .infra()
        .with_conmon_pid_file(format!("/run/{}-infra.pid", pod))
}

fn member(id: &str, pod: &str) -> ContainerRecord {
    ContainerRecord::new(id, id)
        .with_pod(pod)
        .with_conmon_pid_file(format!("/run/{}.pid", id))
        .with_create_command(["podman", "run", "--pod", pod, "--name", id, "alpine", "top"])
}

fn pod_snapshot() -> Snapshot {
    Snapshot::new()
        .with_pod(
            PodRecord::new("p1", "p1")
                .with_infra_container("infra-p1")
                .with_create_command(["podman", "pod", "create", "--name", "p1"]),
        )
        .with_container(infra("p1"))
        .with_container(member("c1", "p1").with_dependency("infra-p1", DependencyKind::Network))
}

/// Value of the last `key=` line; `After=` also appears in the header.
fn line<'a>(unit: &'a str, key: &str) -> &'a str {
    unit.lines()
        .filter_map(|l| l.strip_prefix(key).and_then(|rest| rest.strip_prefix('=')))
        .next_back()
        .unwrap_or_else(|| panic!("no {key}= line in unit:\n{unit}"))
}

fn services(value: &str) -> Vec<String> {
    value
        .split_whitespace()
        .map(|s| s.trim_end_matches(".service").to_string())
        .collect()
}

#[test]
fn test_pod_scenario() {
    let report = generator()
        .generate(&pod_snapshot(), "p1", &GenerateOptions::default())
        .unwrap();

    let names: Vec<&str> = report.service_names().collect();
    assert_eq!(names, vec!["container-c1", "pod-p1"]);

    let container = &report.units["container-c1"];
    assert_eq!(services(line(container, "BindsTo")), vec!["pod-p1"]);
    assert_eq!(services(line(container, "After")), vec!["pod-p1"]);

    let pod = &report.units["pod-p1"];
    assert_eq!(services(line(pod, "Requires")), vec!["container-c1"]);
    assert_eq!(services(line(pod, "Before")), vec!["container-c1"]);
    assert_eq!(line(pod, "ExecStart"), "/usr/bin/podman start infra-p1");
    assert_eq!(line(pod, "ExecStop"), "/usr/bin/podman stop -t 10 infra-p1");
    assert_eq!(line(pod, "PIDFile"), "/run/p1-infra.pid");
    assert_eq!(line(pod, "TimeoutStopSec"), "70");
}

#[test]
fn test_pod_units_count_and_ordering() {
    let mut snapshot = pod_snapshot()
        .with_container(member("c2", "p1"))
        .with_container(member("c3", "p1").with_dependency("c2", DependencyKind::Ipc))
        .with_container(
            member("c4", "p1")
                .with_dependency("c3", DependencyKind::Requires)
                .with_dependency("c1", DependencyKind::Pid),
        );
    snapshot.containers.reverse();

    let report = generator()
        .generate(&snapshot, "p1", &GenerateOptions::default())
        .unwrap();

    // N members plus the pod unit
    assert_eq!(report.units.len(), 5);
    assert!(!report.units.contains_key("container-infra-p1"));

    let pod = &report.units["pod-p1"];
    assert_eq!(
        services(line(pod, "Requires")),
        vec!["container-c1", "container-c2", "container-c3", "container-c4"]
    );

    assert_eq!(
        services(line(&report.units["container-c3"], "BindsTo")),
        vec!["container-c2"]
    );
    assert_eq!(
        services(line(&report.units["container-c2"], "BindsTo")),
        vec!["pod-p1"]
    );

    for (name, unit) in report.units.iter().filter(|(n, _)| n.starts_with("container-")) {
        let bound = services(line(unit, "BindsTo"));
        let mut sorted = bound.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(bound, sorted);
        assert!(!bound.contains(name));
    }

    let c4 = services(line(&report.units["container-c4"], "BindsTo"));
    assert_eq!(c4, vec!["container-c1", "container-c3"]);
}

#[test]
fn test_generation_is_reproducible() {
    let snapshot = pod_snapshot()
        .with_container(member("c2", "p1"))
        .with_container(member("c3", "p1"));
    let first = generator()
        .generate(&snapshot, "p1", &GenerateOptions::default())
        .unwrap();
    let second = generator()
        .generate(&snapshot, "p1", &GenerateOptions::default())
        .unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_template_rejected_for_pods() {
    let options = GenerateOptions {
        template_unit_file: true,
        new: true,
        ..GenerateOptions::default()
    };
    let err = generator()
        .generate(&pod_snapshot(), "p1", &options)
        .unwrap_err();
    assert!(matches!(err, GenerateError::TemplateNotSupportedForPods));
}

#[test]
fn test_pod_new_mode() {
    let options = GenerateOptions {
        new: true,
        use_name: true,
        ..GenerateOptions::default()
    };
    let report = generator()
        .generate(&pod_snapshot(), "p1", &options)
        .unwrap();

    let pod = &report.units["pod-p1"];
    let pre: Vec<&str> = pod
        .lines()
        .filter_map(|l| l.strip_prefix("ExecStartPre="))
        .collect();
    assert_eq!(
        pre,
        vec![
            "/bin/rm -f %t/pod-p1.pid %t/pod-p1.pod-id",
            "/usr/bin/podman pod create --infra-conmon-pidfile %t/pod-p1.pid \
             --pod-id-file %t/pod-p1.pod-id --name p1 --replace",
        ]
    );
    assert!(!pod.contains("--rm"));
    assert_eq!(
        line(pod, "ExecStart"),
        "/usr/bin/podman pod start --pod-id-file %t/pod-p1.pod-id"
    );
    assert_eq!(
        line(pod, "ExecStop"),
        "/usr/bin/podman pod stop --ignore --pod-id-file %t/pod-p1.pod-id -t 10"
    );
    assert_eq!(
        line(pod, "ExecStopPost"),
        "/usr/bin/podman pod rm --ignore -f --pod-id-file %t/pod-p1.pod-id"
    );
    assert_eq!(line(pod, "PIDFile"), "%t/pod-p1.pid");

    let container = &report.units["container-c1"];
    assert_eq!(
        line(container, "ExecStart"),
        "/usr/bin/podman run --conmon-pidfile %t/container-c1.pid \
         --cidfile %t/container-c1.ctr-id --cgroups=no-conmon \
         --pod-id-file %t/pod-p1.pod-id -d --replace --name c1 alpine top"
    );
}

#[test]
fn test_pod_new_mode_requires_create_command() {
    let mut snapshot = pod_snapshot();
    snapshot.pods[0].create_command.clear();
    let options = GenerateOptions {
        new: true,
        ..GenerateOptions::default()
    };
    let err = generator().generate(&snapshot, "p1", &options).unwrap_err();
    assert!(matches!(err, GenerateError::MissingCreateCommand { kind: "pod", .. }));
}

#[test]
fn test_short_create_command_yields_no_units() {
    let mut snapshot = pod_snapshot();
    snapshot.pods[0].create_command = vec!["podman".to_string(), "pod".to_string()];
    let options = GenerateOptions {
        new: true,
        ..GenerateOptions::default()
    };
    let err = generator().generate(&snapshot, "p1", &options).unwrap_err();
    assert!(matches!(
        err,
        GenerateError::Command(CommandError::TooShort { .. })
    ));
}

#[test]
fn test_create_command_without_executable_is_an_error() {
    let mut snapshot = pod_snapshot();
    snapshot.pods[0].create_command = ["pod", "create", "--name", "p1"]
        .map(str::to_string)
        .to_vec();
    let options = GenerateOptions {
        new: true,
        ..GenerateOptions::default()
    };
    let err = generator().generate(&snapshot, "p1", &options).unwrap_err();
    assert!(matches!(
        err,
        GenerateError::Command(CommandError::MarkerNotFound { .. })
    ));
}

#[test]
fn test_pod_without_infra() {
    let snapshot = Snapshot::new()
        .with_pod(PodRecord::new("p2", "p2"))
        .with_container(member("c9", "p2"));
    let err = generator()
        .generate(&snapshot, "p2", &GenerateOptions::default())
        .unwrap_err();
    assert!(matches!(err, GenerateError::NoInfraContainer(ref p) if p == "p2"));
}

#[test]
fn test_pod_without_members() {
    let snapshot = Snapshot::new()
        .with_pod(PodRecord::new("p1", "p1").with_infra_container("infra-p1"))
        .with_container(infra("p1"));
    let err = generator()
        .generate(&snapshot, "p1", &GenerateOptions::default())
        .unwrap_err();
    assert!(matches!(err, GenerateError::NoContainers(_)));
}

#[test]
fn test_pod_cycle_is_fatal() {
    let snapshot = pod_snapshot()
        .with_container(member("a", "p1").with_dependency("b", DependencyKind::Network))
        .with_container(member("b", "p1").with_dependency("a", DependencyKind::Network));
    let err = generator()
        .generate(&snapshot, "p1", &GenerateOptions::default())
        .unwrap_err();
    assert!(matches!(err, GenerateError::Graph(GraphError::Cycle(_))));
}

#[test]
fn test_duplicate_service_names() {
    let options = GenerateOptions {
        use_name: true,
        pod_prefix: "svc".to_string(),
        container_prefix: "svc".to_string(),
        ..GenerateOptions::default()
    };
    let mut snapshot = Snapshot::new()
        .with_pod(PodRecord::new("p1", "web").with_infra_container("infra-p1"))
        .with_container(infra("p1"))
        .with_container(member("c1", "p1"));
    snapshot.containers[1].name = "web".to_string();

    let err = generator().generate(&snapshot, "p1", &options).unwrap_err();
    assert!(matches!(err, GenerateError::DuplicateServiceName(ref n) if n == "svc-web"));
}

#[test]
fn test_infra_container_is_not_generated_directly() {
    let err = generator()
        .generate(&pod_snapshot(), "p1-infra", &GenerateOptions::default())
        .unwrap_err();
    assert!(matches!(err, GenerateError::InfraContainerUnit { .. }));
}

#[test]
fn test_unknown_name() {
    let err = generator()
        .generate(&pod_snapshot(), "nope", &GenerateOptions::default())
        .unwrap_err();
    assert!(matches!(err, GenerateError::NotFound(ref n) if n == "nope"));
}

#[test]
fn test_standalone_container_in_pod_keeps_pod_flag() {
    let options = GenerateOptions {
        new: true,
        ..GenerateOptions::default()
    };
    let report = generator().generate(&pod_snapshot(), "c1", &options).unwrap();

    let unit = &report.units["container-c1"];
    assert!(line(unit, "ExecStart").ends_with("-d --replace --pod p1 --name c1 alpine top"));
    assert!(!unit.contains("BindsTo"));
}

#[test]
fn test_timeout_stop_sec_floor() {
    for stop_timeout in 0..=3600u32 {
        let options = GenerateOptions {
            stop_timeout: Some(stop_timeout),
            ..GenerateOptions::default()
        };
        let info = generator()
            .container_info(&member("c1", "p1"), &options, None)
            .unwrap();
        assert!(info.service.timeout_stop_sec >= stop_timeout + env::MIN_TIMEOUT_STOP_SEC);
    }

    let options = GenerateOptions {
        stop_timeout: Some(120),
        ..GenerateOptions::default()
    };
    let report = generator()
        .generate(&pod_snapshot(), "p1", &options)
        .unwrap();
    assert_eq!(line(&report.units["pod-p1"], "TimeoutStopSec"), "180");
    assert_eq!(line(&report.units["container-c1"], "TimeoutStopSec"), "180");
}

#[test]
fn test_header_options() {
    let snapshot = pod_snapshot();
    let with_timestamp = Generator::with_executable("/usr/bin/podman")
        .with_version("9.9.9")
        .generate(&snapshot, "c1", &GenerateOptions::default())
        .unwrap();
    let unit = &with_timestamp.units["container-c1"];
    let header: Vec<&str> = unit.lines().take(3).collect();
    assert_eq!(header[0], "# container-c1.service");
    assert_eq!(header[1], "# autogenerated by podunit 9.9.9");
    assert!(header[2].starts_with("# "));

    let options = GenerateOptions {
        no_header: true,
        ..GenerateOptions::default()
    };
    let report = generator().generate(&snapshot, "c1", &options).unwrap();
    assert!(report.units["container-c1"].starts_with("# container-c1.service\n\n[Unit]\n"));
}

#[test]
fn test_run_root_and_restart_settings() {
    let mut snapshot = pod_snapshot();
    for container in &mut snapshot.containers {
        container.run_root = Some("/run/containers/storage".to_string());
    }
    let options = GenerateOptions {
        restart_policy: Some(RestartPolicy::Always),
        restart_sec: Some(0),
        start_timeout: Some(30),
        ..GenerateOptions::default()
    };
    let report = generator().generate(&snapshot, "p1", &options).unwrap();

    for unit in report.units.values() {
        assert_eq!(line(unit, "RequiresMountsFor"), "/run/containers/storage");
        assert_eq!(line(unit, "Restart"), "always");
        assert_eq!(line(unit, "TimeoutStartSec"), "30");
        assert!(!unit.contains("RestartSec="));
    }
}

#[test]
fn test_empty_prefix() {
    let options = GenerateOptions {
        container_prefix: String::new(),
        ..GenerateOptions::default()
    };
    let report = generator().generate(&pod_snapshot(), "p1", &options).unwrap();
    assert!(report.units.contains_key("c1"));
    assert_eq!(services(line(&report.units["pod-p1"], "Requires")), vec!["c1"]);
}
