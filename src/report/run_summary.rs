use crate::extractor::ExtractionOutcome;
use crate::fetcher::RevisionsOutcome;
use crate::report::{ChangeReport, FailedDownload};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// What a run did, for console and JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub total_urls: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub files_seen: usize,
    pub files_changed: usize,
    pub files_new: usize,
    pub failures: Vec<FailedDownload>,
    pub conflicts: Vec<PathBuf>,
    pub revisions: RevisionsOutcome,
    pub dry_run: bool,
    pub reports_written: bool,
    pub commit_message: String,
    pub notification_message: String,
}

impl RunSummary {
    pub fn new(
        started_at: DateTime<Utc>,
        duration: Duration,
        outcomes: &[ExtractionOutcome],
        report: &ChangeReport,
        revisions: RevisionsOutcome,
    ) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.success).count();
        let change_set = &report.change_set;

        Self {
            started_at,
            duration_ms: duration.as_millis() as u64,
            total_urls: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
            files_seen: outcomes.iter().map(|o| o.files.len()).sum(),
            files_changed: change_set.changed_count(),
            files_new: change_set.changes.values().filter(|t| t.is_none()).count(),
            failures: change_set.failures.clone(),
            conflicts: change_set.conflicts.clone(),
            revisions,
            dry_run: false,
            reports_written: false,
            commit_message: report.commit_message.clone(),
            notification_message: report.notification_message.clone(),
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_reports_written(mut self, written: bool) -> Self {
        self.reports_written = written;
        self
    }

    /// Nothing changed and nothing failed.
    pub fn is_noop(&self) -> bool {
        self.files_changed == 0 && self.failed == 0
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}
