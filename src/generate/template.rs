//! Unit templates and the two-pass renderer.
//!
//! Several fields of a unit record are template fragments themselves, for
//! example an `ExecStart` line referencing `{{ pid_file }}`. The first pass
//! expands the unit template, the second pass parses that output again and
//! resolves the fragments against the same record.

use super::{GenerateError, RestartPolicy};
use serde::Serialize;
use tera::{Context, Tera};

/// `[Unit]` header shared by pod and container templates.
macro_rules! unit_header {
    () => {
        r#"# {{ service_name }}.service
{%- if not generate_no_header %}
# autogenerated by podunit {{ generator_version }}
{%- if timestamp %}
# {{ timestamp }}
{%- endif %}
{%- endif %}

[Unit]
Description=Podman {{ service_name }}.service{% if identify_specifier %} for %I{% endif %}
Documentation=man:podman-generate-systemd(1)
Wants=network-online.target
After=network-online.target
{%- if run_root %}
RequiresMountsFor={{ run_root }}
{%- endif %}"#
    };
}

/// `[Service]` lines shared by pod and container templates, up to
/// `TimeoutStopSec=`.
macro_rules! service_settings {
    () => {
        r#"Restart={{ restart_policy }}
{%- if restart_sec %}
RestartSec={{ restart_sec }}
{%- endif %}
{%- if start_timeout %}
TimeoutStartSec={{ start_timeout }}
{%- endif %}
TimeoutStopSec={{ timeout_stop_sec }}"#
    };
}

/// `[Service]` tail and `[Install]` section shared by both templates.
macro_rules! service_footer {
    () => {
        r#"
ExecStart={{ exec_start }}
ExecStop={{ exec_stop }}
ExecStopPost={{ exec_stop_post }}
PIDFile={{ pid_file }}
Type=forking

[Install]
WantedBy=default.target
"#
    };
}

pub const POD_TEMPLATE: &str = concat!(
    unit_header!(),
    r#"
Requires={% for s in required_services %}{% if not loop.first %} {% endif %}{{ s }}.service{% endfor %}
Before={% for s in required_services %}{% if not loop.first %} {% endif %}{{ s }}.service{% endfor %}

[Service]
Environment={{ env_variable }}=%n
"#,
    service_settings!(),
    r#"
{%- if exec_start_pre1 %}
ExecStartPre={{ exec_start_pre1 }}
{%- endif %}
{%- if exec_start_pre2 %}
ExecStartPre={{ exec_start_pre2 }}
{%- endif %}"#,
    service_footer!()
);

pub const CONTAINER_TEMPLATE: &str = concat!(
    unit_header!(),
    r#"
{%- if bound_to_services %}
BindsTo={% for s in bound_to_services %}{% if not loop.first %} {% endif %}{{ s }}.service{% endfor %}
After={% for s in bound_to_services %}{% if not loop.first %} {% endif %}{{ s }}.service{% endfor %}
{%- endif %}

[Service]
Environment={{ env_variable }}=%n{% if identify_specifier %}-%i{% endif %}
"#,
    service_settings!(),
    r#"
{%- if exec_start_pre %}
ExecStartPre={{ exec_start_pre }}
{%- endif %}"#,
    service_footer!()
);

/// Header metadata of a unit.
#[derive(Debug, Clone, Serialize)]
pub struct UnitHeader {
    pub generate_no_header: bool,
    /// Generation time, absent when timestamps are disabled
    pub timestamp: Option<String>,
    pub generator_version: String,
    /// Emitted as `RequiresMountsFor=`
    pub run_root: Option<String>,
    /// Add `%I`/`%i` instance specifiers to the description and environment
    pub identify_specifier: bool,
}

/// `[Service]` settings common to pod and container units.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceSettings {
    pub env_variable: String,
    pub restart_policy: RestartPolicy,
    pub restart_sec: Option<u32>,
    pub start_timeout: Option<u32>,
    pub stop_timeout: u32,
    pub timeout_stop_sec: u32,
    pub executable: String,
    /// Escaped root flags of the recorded command, new mode only
    pub root_flags: String,
}

/// Render `template` against `info` in two passes.
///
/// # Errors
///
/// Returns [`GenerateError::Template`] naming the unit and the failing pass
/// if either pass fails, for example because a field that is not protected
/// contains template delimiters.
pub fn render<T: Serialize>(template: &str, info: &T, unit: &str) -> Result<String, GenerateError> {
    let context =
        Context::from_serialize(info).map_err(|e| template_error(unit, "context", &e))?;
    let first = Tera::one_off(template, &context, false)
        .map_err(|e| template_error(unit, "first", &e))?;
    Tera::one_off(&first, &context, false).map_err(|e| template_error(unit, "second", &e))
}

fn template_error(unit: &str, pass: &'static str, err: &tera::Error) -> GenerateError {
    let mut reason = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        reason.push_str(": ");
        reason.push_str(&cause.to_string());
        source = cause.source();
    }
    GenerateError::Template {
        unit: unit.to_string(),
        pass,
        reason,
    }
}
