use anyhow::{Context, Result};
use podunit::cli::{
    Args, ConfigDiscovery, ExecutionMode, GenerateConfig, GeneratorConfig, format_paths,
    format_units, write_unit_files,
};
use podunit::{Generator, Snapshot};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; diagnostics go to stderr so stdout stays unit text
    let default_filter = if args.verbose() {
        "podunit=debug"
    } else {
        "podunit=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(io::stderr)
        .init();

    let mode = match args.mode() {
        Ok(mode) => mode,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    match mode {
        ExecutionMode::Generate(config) => run_generate(config),
        ExecutionMode::ShowConfig => {
            ConfigDiscovery::show_discovery_info();
            Ok(())
        }
    }
}

fn run_generate(config: GenerateConfig) -> Result<()> {
    info!("Generating units for {}", config.name_or_id);

    let defaults = if let Some(ref config_override) = config.config_override {
        info!("Loading configuration override from: {:?}", config_override);
        GeneratorConfig::from_toml_file(config_override)?
    } else {
        debug!("Discovering default configuration...");
        ConfigDiscovery::discover_config()?
    };

    let options = config.options(&defaults);
    debug!("Generation options: {:?}", options);

    let generator = match config.executable(&defaults) {
        Some(executable) => Generator::with_executable(executable),
        None => Generator::new(),
    };

    let snapshot = Snapshot::from_file(&config.snapshot)
        .with_context(|| format!("failed to load runtime snapshot {:?}", config.snapshot))?;

    let report = generator
        .generate(&snapshot, &config.name_or_id, &options)
        .with_context(|| format!("failed to generate units for '{}'", config.name_or_id))?;

    let output = if config.files {
        let dir = config
            .output_dir(&defaults)
            .unwrap_or_else(|| PathBuf::from("."));
        let written = write_unit_files(&report, &dir)
            .with_context(|| format!("failed to write unit files to {:?}", dir))?;
        format_paths(&written, config.format)?
    } else {
        format_units(&report, config.format)?
    };

    let mut stdout = io::stdout().lock();
    stdout.write_all(output.as_bytes())?;
    stdout.flush()?;

    info!("Generated {} units", report.units.len());
    Ok(())
}
