//! Printing and writing generated units.

use super::args::OutputFormat;
use crate::env;
use crate::generate::GenerateReport;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Output errors.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error writing a unit file
    #[error("failed to write '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to encode output: {0}")]
    Json(#[from] serde_json::Error),
}

/// Format units for stdout, in service-name order.
pub fn format_units(report: &GenerateReport, format: OutputFormat) -> Result<String, OutputError> {
    match format {
        OutputFormat::Text => Ok(report
            .units
            .values()
            .map(|unit| unit.trim_end().to_string())
            .collect::<Vec<_>>()
            .join("\n\n")
            + "\n"),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&report.units)? + "\n"),
    }
}

/// Write each unit to `<dir>/<service name>.service`, creating `dir` if
/// needed. Returns the written path per service name.
pub fn write_unit_files(
    report: &GenerateReport,
    dir: &Path,
) -> Result<BTreeMap<String, PathBuf>, OutputError> {
    fs::create_dir_all(dir).map_err(|source| OutputError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut written = BTreeMap::new();
    for (service_name, unit) in &report.units {
        let path = dir.join(env::unit_file_name(service_name));
        fs::write(&path, unit).map_err(|source| OutputError::Io {
            path: path.clone(),
            source,
        })?;
        info!("Wrote unit file {:?}", path);
        written.insert(service_name.clone(), path);
    }
    Ok(written)
}

/// Format the paths of written unit files for stdout.
pub fn format_paths(
    paths: &BTreeMap<String, PathBuf>,
    format: OutputFormat,
) -> Result<String, OutputError> {
    match format {
        OutputFormat::Text => Ok(paths
            .values()
            .map(|p| format!("{}\n", p.display()))
            .collect()),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(paths)? + "\n"),
    }
}
