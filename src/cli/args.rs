//! Command line argument parsing
//!
//! This module handles CLI argument parsing with subcommands:
//! - `generate`: Generate systemd units for a pod or container
//! - `show-config`: Show configuration discovery information

use super::config::GeneratorConfig;
use crate::generate::{GenerateOptions, RestartPolicy};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug)]
pub enum ExecutionMode {
    Generate(GenerateConfig),
    ShowConfig,
}

/// How generated units are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Unit text, or one written path per line with --files
    #[default]
    Text,
    /// JSON object keyed by service name
    Json,
}

#[derive(Debug)]
pub struct GenerateConfig {
    pub name_or_id: String,
    pub snapshot: PathBuf,
    pub use_name: bool,
    pub new: bool,
    pub no_header: bool,
    pub template: bool,
    pub restart_policy: Option<RestartPolicy>,
    pub restart_sec: Option<u32>,
    pub stop_timeout: Option<u32>,
    pub start_timeout: Option<u32>,
    pub container_prefix: Option<String>,
    pub pod_prefix: Option<String>,
    pub separator: Option<String>,
    pub executable: Option<String>,
    pub files: bool,
    pub output_dir: Option<PathBuf>,
    pub format: OutputFormat,
    pub config_override: Option<PathBuf>,
    pub verbose: bool,
}

impl GenerateConfig {
    /// Merge command line flags over the configured defaults.
    ///
    /// Values given on the command line win; boolean switches can only be
    /// turned on.
    pub fn options(&self, defaults: &GeneratorConfig) -> GenerateOptions {
        GenerateOptions {
            use_name: self.use_name || defaults.use_name,
            new: self.new || defaults.new,
            no_header: self.no_header || defaults.no_header,
            template_unit_file: self.template,
            restart_policy: self.restart_policy.or(defaults.restart_policy),
            restart_sec: self.restart_sec.or(defaults.restart_sec),
            stop_timeout: self.stop_timeout.or(defaults.stop_timeout),
            start_timeout: self.start_timeout.or(defaults.start_timeout),
            container_prefix: self
                .container_prefix
                .clone()
                .unwrap_or_else(|| defaults.container_prefix.clone()),
            pod_prefix: self
                .pod_prefix
                .clone()
                .unwrap_or_else(|| defaults.pod_prefix.clone()),
            separator: self
                .separator
                .clone()
                .unwrap_or_else(|| defaults.separator.clone()),
        }
    }

    /// Engine executable to write into units, if one was configured
    pub fn executable<'a>(&'a self, defaults: &'a GeneratorConfig) -> Option<&'a str> {
        self.executable
            .as_deref()
            .or(defaults.executable.as_deref())
    }

    /// Directory unit files are written to, if one was configured
    pub fn output_dir(&self, defaults: &GeneratorConfig) -> Option<PathBuf> {
        self.output_dir
            .clone()
            .or_else(|| defaults.output_dir.clone())
    }
}

#[derive(Debug, Parser)]
#[command(name = "podunit")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Generate systemd units for podman pods and containers")]
#[command(long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate systemd units for a pod or container
    Generate {
        /// Name or ID of the pod or container
        name_or_id: String,
        /// Runtime state snapshot (TOML or JSON)
        #[arg(short = 's', long = "snapshot", value_name = "FILE")]
        snapshot: PathBuf,
        /// Refer to pods and containers by name instead of ID
        #[arg(short = 'n', long = "name")]
        use_name: bool,
        /// Create the pod or container on every unit activation
        #[arg(long = "new")]
        new: bool,
        /// Omit the autogenerated header and timestamp
        #[arg(long = "no-header")]
        no_header: bool,
        /// Generate an instantiable template unit (containers, with --new)
        #[arg(long = "template")]
        template: bool,
        /// systemd restart policy
        #[arg(long = "restart-policy", value_name = "POLICY")]
        restart_policy: Option<String>,
        /// Seconds to wait before restarting
        #[arg(long = "restart-sec", value_name = "SECONDS")]
        restart_sec: Option<u32>,
        /// Stop timeout override in seconds
        #[arg(short = 't', long = "stop-timeout", value_name = "SECONDS")]
        stop_timeout: Option<u32>,
        /// Start timeout in seconds
        #[arg(long = "start-timeout", value_name = "SECONDS")]
        start_timeout: Option<u32>,
        /// Service name prefix for containers
        #[arg(long = "container-prefix", value_name = "PREFIX")]
        container_prefix: Option<String>,
        /// Service name prefix for pods
        #[arg(long = "pod-prefix", value_name = "PREFIX")]
        pod_prefix: Option<String>,
        /// Separator between prefix and name or ID
        #[arg(long = "separator", value_name = "SEPARATOR")]
        separator: Option<String>,
        /// Engine executable written into the units
        #[arg(long = "executable", value_name = "PATH")]
        executable: Option<String>,
        /// Write unit files instead of printing them
        #[arg(short = 'f', long = "files")]
        files: bool,
        /// Directory for --files (default: current directory)
        #[arg(short = 'o', long = "output-dir", value_name = "DIR")]
        output_dir: Option<PathBuf>,
        /// Output format
        #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Configuration file path
        #[arg(short = 'c', long = "config")]
        config: Option<PathBuf>,
        /// Enable verbose output
        #[arg(short = 'v', long = "verbose")]
        verbose: bool,
    },
    /// Show configuration discovery information
    ShowConfig,
}

impl Args {
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Whether verbose logging was requested
    pub fn verbose(&self) -> bool {
        matches!(&self.command, Some(Commands::Generate { verbose: true, .. }))
    }

    pub fn mode(&self) -> Result<ExecutionMode, String> {
        match &self.command {
            Some(Commands::Generate {
                name_or_id,
                snapshot,
                use_name,
                new,
                no_header,
                template,
                restart_policy,
                restart_sec,
                stop_timeout,
                start_timeout,
                container_prefix,
                pod_prefix,
                separator,
                executable,
                files,
                output_dir,
                format,
                config,
                verbose,
            }) => {
                let restart_policy = restart_policy
                    .as_deref()
                    .map(str::parse::<RestartPolicy>)
                    .transpose()
                    .map_err(|e| e.to_string())?;

                if output_dir.is_some() && !files {
                    return Err("--output-dir requires --files".to_string());
                }

                Ok(ExecutionMode::Generate(GenerateConfig {
                    name_or_id: name_or_id.clone(),
                    snapshot: snapshot.clone(),
                    use_name: *use_name,
                    new: *new,
                    no_header: *no_header,
                    template: *template,
                    restart_policy,
                    restart_sec: *restart_sec,
                    stop_timeout: *stop_timeout,
                    start_timeout: *start_timeout,
                    container_prefix: container_prefix.clone(),
                    pod_prefix: pod_prefix.clone(),
                    separator: separator.clone(),
                    executable: executable.clone(),
                    files: *files,
                    output_dir: output_dir.clone(),
                    format: *format,
                    config_override: config.clone(),
                    verbose: *verbose,
                }))
            }
            Some(Commands::ShowConfig) => Ok(ExecutionMode::ShowConfig),
            None => Err(
                "No command specified. Use 'podunit --help' to see available commands."
                    .to_string(),
            ),
        }
    }
}
