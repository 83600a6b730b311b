//! JSON result file writer
//!
//! The result file is a JSON array with one entry per thread, in discovery
//! order. Each entry is an array of `{"author": ..., "txt": ...}` objects.
//! The file is written to a temporary sibling and renamed into place, so a
//! reader never sees a half-written file.

use crate::crawler::RunReport;
use crate::HarvestError;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes the results of a run to `path`, replacing any existing file
///
/// # Returns
///
/// * `Ok(())` - The file is in place
/// * `Err(HarvestError)` - Serialization or filesystem failure; any
///   temporary file is removed
pub fn write_results(path: &Path, report: &RunReport) -> Result<(), HarvestError> {
    let temp_path = temporary_path(path);

    let written = File::create(&temp_path)
        .map_err(HarvestError::from)
        .and_then(|file| {
            let mut writer = BufWriter::new(file);
            write_results_to(&mut writer, report)?;
            let file = writer.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()?;
            Ok(())
        })
        .and_then(|()| fs::rename(&temp_path, path).map_err(HarvestError::from));

    match &written {
        Ok(()) => tracing::info!("Wrote {} threads to {}", report.items.len(), path.display()),
        Err(_) => {
            let _ = fs::remove_file(&temp_path);
        }
    }
    written
}

/// Serializes the results of a run as a JSON array
pub fn write_results_to<W: Write>(writer: &mut W, report: &RunReport) -> Result<(), HarvestError> {
    serde_json::to_writer(&mut *writer, &report.fragments())?;
    writer.flush()?;
    Ok(())
}

fn temporary_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "result.json".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}
