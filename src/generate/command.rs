//! Rewriting of recorded creation commands for replay by systemd.
//!
//! A pod or container remembers the argv it was created with. In new mode the
//! generated unit re-runs that argv on every activation, so flags that make no
//! sense under systemd are dropped, flags the generator pins itself are
//! replaced, and every token is escaped for an `Exec*=` line.
//!
//! Flag detection is a small scanner, not a full parser. It knows the flags
//! that influence the rewrite plus the common boolean flags (so that `--rm
//! image` does not swallow the image), and treats any other `--flag value`
//! pair the way a permissive flag parser would. Commands produced by tools
//! other than the engine's own CLI may not be rewritten faithfully.

use std::fmt;
use tracing::{debug, warn};

/// Errors raised while rewriting a creation command.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Too few tokens to contain an executable, a subcommand and arguments
    #[error("{kind} does not appear to be created via `{expected}`: {command:?}")]
    TooShort {
        kind: EntityKind,
        expected: &'static str,
        command: Vec<String>,
    },

    /// The create subcommand could not be located
    #[error("{kind} does not appear to be created via `{expected}`: {command:?}")]
    MarkerNotFound {
        kind: EntityKind,
        expected: &'static str,
        command: Vec<String>,
    },

    /// A boolean flag carries a value that is not a boolean
    #[error("invalid boolean value '{value}' for flag '{flag}'")]
    InvalidBool { flag: String, value: String },
}

/// Result type for command rewriting.
pub type Result<T> = std::result::Result<T, CommandError>;

/// What kind of entity a command creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Pod,
    Container,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pod => f.write_str("pod"),
            Self::Container => f.write_str("container"),
        }
    }
}

/// Long boolean flags. A separate `true`/`false` token is not their value.
const BOOL_FLAGS: &[&str] = &[
    "rm",
    "detach",
    "replace",
    "sig-proxy",
    "interactive",
    "tty",
    "privileged",
    "init",
    "read-only",
    "publish-all",
    "no-hosts",
    "quiet",
    "help",
    "infra",
    "rootfs",
    "read-only-tmpfs",
    "oom-kill-disable",
    "tls-verify",
];

/// Long flags that always take a value.
const VALUE_FLAGS: &[&str] = &[
    "name",
    "pod",
    "pod-id-file",
    "infra-conmon-pidfile",
    "conmon-pidfile",
    "cidfile",
    "cgroups",
    "restart",
    "sdnotify",
    "env",
    "publish",
    "volume",
    "label",
    "network",
    "hostname",
    "workdir",
    "user",
    "entrypoint",
];

const SHORT_BOOL_FLAGS: &[(char, &str)] = &[
    ('d', "detach"),
    ('i', "interactive"),
    ('t', "tty"),
    ('P', "publish-all"),
    ('q', "quiet"),
];

const SHORT_VALUE_FLAGS: &[(char, &str)] = &[
    ('e', "env"),
    ('p', "publish"),
    ('v', "volume"),
    ('l', "label"),
    ('w', "workdir"),
    ('u', "user"),
];

/// Flags dropped from every replayed container command.
const CONTAINER_FILTERED_FLAGS: &[&str] = &[
    "rm",
    "sig-proxy",
    "detach",
    "cgroups",
    "cidfile",
    "conmon-pidfile",
    "restart",
    "sdnotify",
];

/// Additional flags dropped when the container joins a pod; the pod's ID
/// file replaces them.
const POD_MEMBER_FILTERED_FLAGS: &[&str] = &["pod", "pod-id-file", "infra-conmon-pidfile"];

/// Flags dropped from a replayed pod command.
const POD_FILTERED_FLAGS: &[&str] = &["pod-id-file", "infra-conmon-pidfile", "rm"];

#[derive(Debug, Clone, PartialEq)]
enum FlagValue {
    Bool(bool),
    Text(Option<String>),
}

/// One flag occurrence in the flag region of an argv.
#[derive(Debug, Clone)]
struct ScannedFlag {
    name: String,
    value: FlagValue,
    /// Index of the flag token
    start: usize,
    /// Number of tokens the flag occupies (1 or 2)
    len: usize,
    /// Whether the token is a single flag rather than a short-flag cluster
    standalone: bool,
}

/// Flags recognized in an argv, up to the first positional argument.
#[derive(Debug)]
struct ScannedArgs {
    flags: Vec<ScannedFlag>,
    /// Index of the first positional token, or the argv length
    positional_start: usize,
}

impl ScannedArgs {
    fn last(&self, name: &str) -> Option<&ScannedFlag> {
        self.flags.iter().rev().find(|f| f.name == name)
    }

    fn is_set(&self, name: &str) -> bool {
        self.last(name).is_some()
    }

    fn bool_value(&self, name: &str) -> Option<bool> {
        match self.last(name)?.value {
            FlagValue::Bool(b) => Some(b),
            FlagValue::Text(_) => None,
        }
    }

    /// Index of the token holding the value of the last occurrence of a
    /// value flag, and whether the value is inline (`--flag=value`).
    fn value_position(&self, name: &str) -> Option<(usize, bool)> {
        let flag = self.last(name)?;
        if !flag.standalone {
            return None;
        }
        match (&flag.value, flag.len) {
            (FlagValue::Text(Some(_)), 1) => Some((flag.start, true)),
            (FlagValue::Text(Some(_)), 2) => Some((flag.start + 1, false)),
            _ => None,
        }
    }
}

fn long_name(short: char, table: &[(char, &'static str)]) -> Option<&'static str> {
    table.iter().find(|(c, _)| *c == short).map(|(_, name)| *name)
}

/// Parse a boolean the way the engine's CLI does.
fn parse_bool(flag: &str, value: &str) -> Result<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        _ => Err(CommandError::InvalidBool {
            flag: flag.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Scan the flag region of `args`. Scanning stops at `--` or at the first
/// token that is not a flag.
fn scan(args: &[String]) -> Result<ScannedArgs> {
    let mut flags = Vec::new();
    let mut i = 0;

    while i < args.len() {
        let arg = args[i].as_str();
        if arg == "--" || arg == "-" || !arg.starts_with('-') {
            break;
        }

        if let Some(body) = arg.strip_prefix("--") {
            let (name, inline) = match body.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (body, None),
            };
            let flag = scan_flag(args, i, name, inline, BOOL_FLAGS.contains(&name))?;
            i += flag.len;
            flags.push(flag);
            continue;
        }

        let body = &arg[1..];
        let mut chars = body.chars();
        let first = chars.next();
        let single = first.is_some() && (chars.as_str().is_empty() || chars.as_str().starts_with('='));

        if let (Some(short), true) = (first, single) {
            let inline = body.split_once('=').map(|(_, value)| value);
            let (name, is_bool) = match (
                long_name(short, SHORT_BOOL_FLAGS),
                long_name(short, SHORT_VALUE_FLAGS),
            ) {
                (Some(name), _) => (name.to_string(), true),
                (None, Some(name)) => (name.to_string(), false),
                (None, None) => (short.to_string(), false),
            };
            let flag = scan_flag(args, i, &name, inline, is_bool)?;
            i += flag.len;
            flags.push(flag);
            continue;
        }

        // Short-flag cluster such as `-it` or `-ite FOO=bar`
        let mut len = 1;
        for (pos, short) in body.char_indices() {
            if let Some(name) = long_name(short, SHORT_BOOL_FLAGS) {
                flags.push(ScannedFlag {
                    name: name.to_string(),
                    value: FlagValue::Bool(true),
                    start: i,
                    len: 1,
                    standalone: false,
                });
                continue;
            }

            let rest = &body[pos + short.len_utf8()..];
            let value = if !rest.is_empty() {
                Some(rest.to_string())
            } else if let Some(next) = args.get(i + 1) {
                len = 2;
                Some(next.clone())
            } else {
                None
            };
            flags.push(ScannedFlag {
                name: long_name(short, SHORT_VALUE_FLAGS)
                    .map(str::to_string)
                    .unwrap_or_else(|| short.to_string()),
                value: FlagValue::Text(value),
                start: i,
                len,
                standalone: false,
            });
            break;
        }
        i += len;
    }

    Ok(ScannedArgs {
        flags,
        positional_start: i,
    })
}

fn scan_flag(
    args: &[String],
    index: usize,
    name: &str,
    inline: Option<&str>,
    is_bool: bool,
) -> Result<ScannedFlag> {
    let (value, len) = if is_bool {
        let value = match inline {
            Some(v) => parse_bool(name, v)?,
            None => true,
        };
        (FlagValue::Bool(value), 1)
    } else if let Some(v) = inline {
        (FlagValue::Text(Some(v.to_string())), 1)
    } else if VALUE_FLAGS.contains(&name) {
        match args.get(index + 1) {
            Some(next) => (FlagValue::Text(Some(next.clone())), 2),
            None => {
                warn!("Flag '--{}' is missing its value", name);
                (FlagValue::Text(None), 1)
            }
        }
    } else {
        // Unknown flag: take the next token as its value unless it looks
        // like another flag.
        match args.get(index + 1) {
            Some(next) if !next.starts_with('-') => (FlagValue::Text(Some(next.clone())), 2),
            _ => (FlagValue::Text(None), 1),
        }
    };

    Ok(ScannedFlag {
        name: name.to_string(),
        value,
        start: index,
        len,
        standalone: true,
    })
}

/// Drop standalone occurrences of the named flags, with their values.
fn remove_flags(args: &[String], scanned: &ScannedArgs, names: &[&str]) -> Vec<String> {
    let mut skip = vec![false; args.len()];
    for flag in &scanned.flags {
        if flag.standalone && names.contains(&flag.name.as_str()) {
            for slot in skip.iter_mut().skip(flag.start).take(flag.len) {
                *slot = true;
            }
        }
    }

    args.iter()
        .zip(skip)
        .filter(|(_, skip)| !skip)
        .map(|(arg, _)| arg.clone())
        .collect()
}

/// Escape one argument for an `Exec*=` line.
///
/// `$` and `%` are doubled so systemd expands neither variables nor
/// specifiers. Arguments with whitespace are double-quoted with C-style
/// escapes; otherwise backslashes are doubled. An empty argument becomes
/// `""` so it keeps its position on the line.
pub fn escape_systemd_arg(arg: &str) -> String {
    if arg.is_empty() {
        return "\"\"".to_string();
    }
    let arg = arg.replace('$', "$$").replace('%', "%%");
    if arg.contains([' ', '\t', '\n', '\r']) {
        let mut quoted = String::with_capacity(arg.len() + 2);
        quoted.push('"');
        for c in arg.chars() {
            match c {
                '\\' => quoted.push_str("\\\\"),
                '"' => quoted.push_str("\\\""),
                '\n' => quoted.push_str("\\n"),
                '\t' => quoted.push_str("\\t"),
                '\r' => quoted.push_str("\\r"),
                c => quoted.push(c),
            }
        }
        quoted.push('"');
        quoted
    } else if arg.contains('\\') {
        arg.replace('\\', "\\\\")
    } else {
        arg
    }
}

/// Escape every argument for an `Exec*=` line.
pub fn escape_systemd_args(args: &[String]) -> Vec<String> {
    args.iter().map(|a| escape_systemd_arg(a)).collect()
}

/// Wrap a token containing template delimiters so the second render pass
/// emits it verbatim.
fn protect(token: String) -> String {
    if token.contains("{{") || token.contains("{%") || token.contains("{#") {
        format!("{{% raw %}}{}{{% endraw %}}", token)
    } else {
        token
    }
}

/// Rewritten pod creation command.
#[derive(Debug, Clone, PartialEq)]
pub struct PodCreateCommand {
    /// Escaped root flags, replayed on every pod start/stop/rm
    pub root_flags: String,
    /// Full `pod create` line with PID and ID file placeholders
    pub create: String,
}

/// Rewrite a recorded `pod create` command.
///
/// The result references `{{ pid_file }}` and `{{ pod_id_file }}`, resolved
/// in the second render pass.
///
/// # Errors
///
/// Returns an error if the command is shorter than three tokens, has no
/// adjacent `pod create` pair, or carries a malformed boolean flag.
pub fn rewrite_pod_create(command: &[String], executable: &str) -> Result<PodCreateCommand> {
    const EXPECTED: &str = "podman pod create";

    if command.len() < 3 {
        return Err(CommandError::TooShort {
            kind: EntityKind::Pod,
            expected: EXPECTED,
            command: command.to_vec(),
        });
    }

    // The marker must follow the executable.
    let create_index = (2..command.len())
        .find(|&i| command[i - 1] == "pod" && command[i] == "create")
        .ok_or_else(|| CommandError::MarkerNotFound {
            kind: EntityKind::Pod,
            expected: EXPECTED,
            command: command.to_vec(),
        })?;

    let root_args = &command[1..create_index - 1];
    let pod_args = &command[create_index + 1..];

    let scanned = scan(pod_args)?;
    let filtered = add_replace(
        remove_flags(pod_args, &scanned, POD_FILTERED_FLAGS),
        &scanned,
    )?;

    let mut line: Vec<String> = Vec::new();
    line.push(protect(escape_systemd_arg(executable)));
    line.extend(escape_systemd_args(root_args).into_iter().map(protect));
    line.extend(
        [
            "pod",
            "create",
            "--infra-conmon-pidfile",
            "{{ pid_file }}",
            "--pod-id-file",
            "{{ pod_id_file }}",
        ]
        .map(str::to_string),
    );
    line.extend(escape_systemd_args(&filtered).into_iter().map(protect));

    debug!("Rewrote pod create command with {} arguments", line.len());
    Ok(PodCreateCommand {
        root_flags: escape_systemd_args(root_args).join(" "),
        create: line.join(" "),
    })
}

/// Append `--replace` to the flag region of `args` when `--name` is set
/// without a true `--replace`. `scanned` is the scan of the unfiltered argv.
fn add_replace(args: Vec<String>, scanned: &ScannedArgs) -> Result<Vec<String>> {
    if !scanned.is_set("name") || scanned.bool_value("replace") == Some(true) {
        return Ok(args);
    }

    // An explicit `--replace=false` would override the appended flag.
    let rescanned = scan(&args)?;
    let mut result = remove_flags(&args, &rescanned, &["replace"]);
    let boundary = rescanned.positional_start - (args.len() - result.len());
    result.insert(boundary, "--replace".to_string());

    debug!("Added --replace to recorded command");
    Ok(result)
}

/// Settings for rewriting a container creation command.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContainerRewrite {
    /// The container is a pod member and joins the pod via its ID file
    pub in_pod: bool,
    /// Suffix the container name with the instance specifier
    pub instance_name: bool,
}

/// Rewritten container creation command.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerRunCommand {
    /// Escaped root flags, replayed on every stop/rm
    pub root_flags: String,
    /// Full `run` line with PID, container ID and pod ID file placeholders
    pub run: String,
}

/// Rewrite a recorded `run` or `create` container command into a detached
/// `run` line.
///
/// The result references `{{ pid_file }}`, `{{ container_id_file }}` and,
/// for pod members, `{{ pod_id_file }}`.
///
/// # Errors
///
/// Returns an error if the command is shorter than three tokens, has no
/// `run`/`create` subcommand, or carries a malformed boolean flag.
pub fn rewrite_container_run(
    command: &[String],
    executable: &str,
    rewrite: ContainerRewrite,
) -> Result<ContainerRunCommand> {
    const EXPECTED: &str = "podman run";

    if command.len() < 3 {
        return Err(CommandError::TooShort {
            kind: EntityKind::Container,
            expected: EXPECTED,
            command: command.to_vec(),
        });
    }

    // First `run`/`create` token wins, even as the value of a root flag.
    let index = (1..command.len())
        .find(|&i| command[i] == "run" || command[i] == "create")
        .ok_or_else(|| CommandError::MarkerNotFound {
            kind: EntityKind::Container,
            expected: EXPECTED,
            command: command.to_vec(),
        })?;

    let root_end = if command[index - 1] == "container" {
        index - 1
    } else {
        index
    };
    let root_args = &command[1..root_end.max(1)];
    let run_args = &command[index + 1..];

    let mut filters: Vec<&str> = CONTAINER_FILTERED_FLAGS.to_vec();
    if rewrite.in_pod {
        filters.extend_from_slice(POD_MEMBER_FILTERED_FLAGS);
    }

    let scanned = scan(run_args)?;
    let mut filtered = remove_flags(run_args, &scanned, &filters);

    let needs_replace =
        scanned.is_set("name") && scanned.bool_value("replace") != Some(true);
    if needs_replace {
        let rescanned = scan(&filtered)?;
        filtered = remove_flags(&filtered, &rescanned, &["replace"]);
    }

    let mut escaped = escape_systemd_args(&filtered);
    if rewrite.instance_name {
        let rescanned = scan(&filtered)?;
        if let Some((position, _)) = rescanned.value_position("name") {
            escaped[position].push_str("-%i");
        }
    }

    let mut line: Vec<String> = Vec::new();
    line.push(protect(escape_systemd_arg(executable)));
    line.extend(escape_systemd_args(root_args).into_iter().map(protect));
    line.extend(
        [
            "run",
            "--conmon-pidfile",
            "{{ pid_file }}",
            "--cidfile",
            "{{ container_id_file }}",
            "--cgroups=no-conmon",
        ]
        .map(str::to_string),
    );
    if rewrite.in_pod {
        line.push("--pod-id-file".to_string());
        line.push("{{ pod_id_file }}".to_string());
    }
    line.push("-d".to_string());
    if needs_replace {
        line.push("--replace".to_string());
    }
    line.extend(escaped.into_iter().map(protect));

    debug!("Rewrote container command with {} arguments", line.len());
    Ok(ContainerRunCommand {
        root_flags: escape_systemd_args(root_args).join(" "),
        run: line.join(" "),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn test_escape_systemd_arg() {
        assert_eq!(escape_systemd_arg("plain"), "plain");
        assert_eq!(escape_systemd_arg("$HOME"), "$$HOME");
        assert_eq!(escape_systemd_arg("50%"), "50%%");
        assert_eq!(escape_systemd_arg("a b"), "\"a b\"");
        assert_eq!(escape_systemd_arg("say \"hi\" now"), "\"say \\\"hi\\\" now\"");
        assert_eq!(escape_systemd_arg("tab\there"), "\"tab\\there\"");
        assert_eq!(escape_systemd_arg("C:\\dir"), "C:\\\\dir");
        assert_eq!(escape_systemd_arg("a\\b c"), "\"a\\\\b c\"");
        assert_eq!(escape_systemd_arg(""), "\"\"");
    }

    #[test]
    fn test_empty_argument_keeps_its_position() {
        let mut command = argv("podman pod create --name foo --label");
        command.push(String::new());

        let cmd = rewrite_pod_create(&command, "/usr/bin/podman").unwrap();
        assert!(cmd.create.ends_with("--name foo --label \"\" --replace"));
    }

    #[test]
    fn test_scan_stops_at_positionals() {
        let args = argv("--rm -it --name web -e A=1 --unknown val alpine sh -c --rm");
        let scanned = scan(&args).unwrap();

        assert_eq!(args[scanned.positional_start], "alpine");
        assert!(scanned.is_set("rm"));
        assert!(scanned.is_set("tty"));
        assert!(scanned.is_set("interactive"));
        assert_eq!(scanned.value_position("name"), Some((3, false)));
        assert_eq!(scanned.flags.iter().filter(|f| f.name == "rm").count(), 1);
    }

    #[test]
    fn test_scan_double_dash() {
        let args = argv("--name x -- --rm");
        let scanned = scan(&args).unwrap();
        assert_eq!(scanned.positional_start, 2);
        assert!(!scanned.is_set("rm"));
    }

    #[test]
    fn test_scan_invalid_bool() {
        let err = scan(&argv("--rm=maybe image")).unwrap_err();
        assert!(matches!(err, CommandError::InvalidBool { ref flag, .. } if flag == "rm"));
    }

    #[test]
    fn test_pod_create_appends_replace() {
        let cmd = rewrite_pod_create(&argv("podman pod create --name foo"), "/usr/bin/podman")
            .unwrap();

        assert_eq!(
            cmd.create,
            "/usr/bin/podman pod create --infra-conmon-pidfile {{ pid_file }} \
             --pod-id-file {{ pod_id_file }} --name foo --replace"
        );
        assert!(!cmd.create.contains("--rm"));
        assert_eq!(cmd.root_flags, "");
    }

    #[test]
    fn test_pod_create_keeps_explicit_replace() {
        let cmd = rewrite_pod_create(
            &argv("podman pod create --name foo --replace"),
            "/usr/bin/podman",
        )
        .unwrap();
        assert_eq!(cmd.create.matches("--replace").count(), 1);
    }

    #[test]
    fn test_pod_create_inline_replace_false_is_replaced() {
        let cmd = rewrite_pod_create(
            &argv("podman pod create --replace=false --name foo"),
            "/usr/bin/podman",
        )
        .unwrap();

        assert!(!cmd.create.contains("--replace=false"));
        assert!(cmd.create.ends_with("--name foo --replace"));
    }

    #[test]
    fn test_pod_create_separate_replace_false_is_positional() {
        // `--replace false`: the boolean flag does not take the next token,
        // so replace is already true and `false` is a positional argument.
        let cmd = rewrite_pod_create(
            &argv("podman pod create --name foo --replace false"),
            "/usr/bin/podman",
        )
        .unwrap();

        assert!(cmd.create.ends_with("--name foo --replace false"));
        assert_eq!(cmd.create.matches("--replace").count(), 1);
    }

    #[test]
    fn test_pod_create_root_flags_and_filters() {
        let cmd = rewrite_pod_create(
            &argv(
                "podman --events-backend none pod create --pod-id-file /tmp/x \
                 --infra-conmon-pidfile=/tmp/y --rm --share net",
            ),
            "/usr/bin/podman",
        )
        .unwrap();

        assert_eq!(cmd.root_flags, "--events-backend none");
        assert_eq!(
            cmd.create,
            "/usr/bin/podman --events-backend none pod create --infra-conmon-pidfile {{ pid_file }} \
             --pod-id-file {{ pod_id_file }} --share net"
        );
    }

    #[test]
    fn test_pod_create_errors() {
        let err = rewrite_pod_create(&argv("podman pod"), "/usr/bin/podman").unwrap_err();
        assert!(matches!(err, CommandError::TooShort { .. }));

        let err =
            rewrite_pod_create(&argv("podman run --pod new:foo alpine"), "/usr/bin/podman")
                .unwrap_err();
        assert!(matches!(err, CommandError::MarkerNotFound { .. }));
        assert!(err.to_string().contains("podman pod create"));

        // No executable in front of the subcommand
        let err = rewrite_pod_create(&argv("pod create --name x"), "/usr/bin/podman").unwrap_err();
        assert!(matches!(err, CommandError::MarkerNotFound { .. }));
    }

    #[test]
    fn test_container_run_filters_and_injects() {
        let cmd = rewrite_container_run(
            &argv(
                "podman run --rm -d --sig-proxy=false --cidfile /tmp/cid --restart always \
                 --name web -p 8080:80 nginx:latest",
            ),
            "/usr/bin/podman",
            ContainerRewrite::default(),
        )
        .unwrap();

        assert_eq!(
            cmd.run,
            "/usr/bin/podman run --conmon-pidfile {{ pid_file }} --cidfile {{ container_id_file }} \
             --cgroups=no-conmon -d --replace --name web -p 8080:80 nginx:latest"
        );
    }

    #[test]
    fn test_container_inline_replace_false_is_replaced() {
        let cmd = rewrite_container_run(
            &argv("podman run --name web --replace=false alpine"),
            "/usr/bin/podman",
            ContainerRewrite::default(),
        )
        .unwrap();

        assert!(!cmd.run.contains("--replace=false"));
        assert!(cmd.run.ends_with("--cgroups=no-conmon -d --replace --name web alpine"));
    }

    #[test]
    fn test_container_separate_replace_false_is_positional() {
        let cmd = rewrite_container_run(
            &argv("podman run --name web --replace false alpine"),
            "/usr/bin/podman",
            ContainerRewrite::default(),
        )
        .unwrap();

        assert!(cmd.run.ends_with("--cgroups=no-conmon -d --name web --replace false alpine"));
        assert_eq!(cmd.run.matches("--replace").count(), 1);
    }

    #[test]
    fn test_container_detach_false_is_removed() {
        let cmd = rewrite_container_run(
            &argv("podman create --detach=false -d=false alpine top"),
            "/usr/bin/podman",
            ContainerRewrite::default(),
        )
        .unwrap();

        assert!(!cmd.run.contains("false"));
        assert!(cmd.run.ends_with("-d alpine top"));
        assert!(!cmd.run.contains("--replace"));
    }

    #[test]
    fn test_container_in_pod() {
        let cmd = rewrite_container_run(
            &argv("podman --root /srv container run --pod=web --infra-conmon-pidfile x alpine"),
            "/usr/bin/podman",
            ContainerRewrite {
                in_pod: true,
                ..ContainerRewrite::default()
            },
        )
        .unwrap();

        assert_eq!(cmd.root_flags, "--root /srv");
        assert_eq!(
            cmd.run,
            "/usr/bin/podman --root /srv run --conmon-pidfile {{ pid_file }} \
             --cidfile {{ container_id_file }} --cgroups=no-conmon \
             --pod-id-file {{ pod_id_file }} -d alpine"
        );
    }

    #[test]
    fn test_container_instance_name() {
        let cmd = rewrite_container_run(
            &argv("podman run --name=web alpine"),
            "/usr/bin/podman",
            ContainerRewrite {
                instance_name: true,
                ..ContainerRewrite::default()
            },
        )
        .unwrap();
        assert!(cmd.run.ends_with("-d --replace --name=web-%i alpine"));

        let cmd = rewrite_container_run(
            &argv("podman run --name web alpine"),
            "/usr/bin/podman",
            ContainerRewrite {
                instance_name: true,
                ..ContainerRewrite::default()
            },
        )
        .unwrap();
        assert!(cmd.run.ends_with("--name web-%i alpine"));
    }

    #[test]
    fn test_template_delimiters_are_protected() {
        let cmd = rewrite_container_run(
            &argv("podman run alpine echo {{x}}"),
            "/usr/bin/podman",
            ContainerRewrite::default(),
        )
        .unwrap();
        assert!(cmd.run.ends_with("echo {% raw %}{{x}}{% endraw %}"));
    }

    #[test]
    fn test_container_errors() {
        let err = rewrite_container_run(
            &argv("podman run"),
            "/usr/bin/podman",
            ContainerRewrite::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CommandError::TooShort { .. }));

        let err = rewrite_container_run(
            &argv("podman start web"),
            "/usr/bin/podman",
            ContainerRewrite::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CommandError::MarkerNotFound { .. }));
    }
}
