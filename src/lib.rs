//! # podunit
//!
//! Generates systemd service units for podman pods and containers.
//!
//! A pod yields one unit for the pod itself, backed by its infra container,
//! plus one unit per member container. Member units are bound to the units
//! of the containers they depend on, so systemd starts and stops them in
//! dependency order.
//!
//! ## Architecture Overview
//!
//! - **[`runtime`]**: the read-only view of pods and containers the generator
//!   consumes, with a file-backed [`Snapshot`] implementation
//! - **[`generate`]**: dependency graph, command rewriting, templates and the
//!   [`Generator`] itself
//! - **[`cli`]**: argument parsing, configuration discovery and output
//! - **[`env`]**: fixed names, suffixes and paths
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use podunit::{GenerateOptions, Generator, Snapshot};
//!
//! fn main() -> anyhow::Result<()> {
//!     let snapshot = Snapshot::from_file("state.toml")?;
//!     let options = GenerateOptions {
//!         new: true,
//!         use_name: true,
//!         ..GenerateOptions::default()
//!     };
//!
//!     let report = Generator::new().generate(&snapshot, "web", &options)?;
//!     for (service_name, unit) in &report.units {
//!         println!("# {}\n{}", service_name, unit);
//!     }
//!     Ok(())
//! }
//! ```

/// Environment constants and path utilities.
pub mod env;

/// Pod and container state consumed by the generator.
pub mod runtime;

/// systemd unit generation.
pub mod generate;

// CLI module for command-line interface
pub mod cli;

pub use generate::{GenerateError, GenerateOptions, GenerateReport, Generator, RestartPolicy};
pub use runtime::{ContainerHandle, PodHandle, Runtime, RuntimeError, Snapshot};
