use anyhow::{Context, Result};
use atomic_write_file::AtomicWriteFile;
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::session::Evaluation;

const REPORT_VERSION: u32 = 1;

#[derive(Serialize)]
struct ReportFile<'a> {
    version: u32,
    submittable: bool,
    #[serde(flatten)]
    evaluation: &'a Evaluation,
}

/// Save an evaluation as JSON atomically
///
/// Uses atomic-write-file so a reader never sees a half-written report.
/// Creates the parent directory if it doesn't exist.
pub fn save_report(path: &Path, evaluation: &Evaluation) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create report directory at {}", dir.display()))?;
    }

    let report = ReportFile {
        version: REPORT_VERSION,
        submittable: evaluation.submittable(),
        evaluation,
    };

    let mut file = AtomicWriteFile::open(path)
        .with_context(|| format!("Failed to open atomic write file at {}", path.display()))?;

    serde_json::to_writer_pretty(&mut file, &report).context("Failed to serialize report")?;

    file.commit().context("Failed to save report")?;

    Ok(())
}
