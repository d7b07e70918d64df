use crate::error::{MirrorError, Result};
use crate::report::ChangeReport;
use std::fs;
use std::path::{Path, PathBuf};

/// Persists the commit message and notification message of a run.
pub struct ReportWriter {
    commit_message_path: PathBuf,
    notification_message_path: PathBuf,
}

impl ReportWriter {
    pub fn new(commit_message_path: PathBuf, notification_message_path: PathBuf) -> Self {
        Self {
            commit_message_path,
            notification_message_path,
        }
    }

    pub fn commit_message_path(&self) -> &Path {
        &self.commit_message_path
    }

    pub fn notification_message_path(&self) -> &Path {
        &self.notification_message_path
    }

    /// Writes both files. Returns `false` without touching the disk when the
    /// report has nothing to say.
    pub fn write(&self, report: &ChangeReport) -> Result<bool> {
        if !report.has_content() {
            return Ok(false);
        }

        write_file(&self.commit_message_path, &report.commit_message)?;
        write_file(&self.notification_message_path, &report.notification_message)?;

        Ok(true)
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| MirrorError::Report {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
    }

    fs::write(path, content).map_err(|e| MirrorError::Report {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}
