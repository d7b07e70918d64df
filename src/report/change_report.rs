use crate::extractor::ExtractionOutcome;
use crate::report::RelativeTimeFormatter;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const BLOCK_MARKER: &str = "```";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedDownload {
    pub url: String,
    pub error: String,
}

/// Everything that changed or failed during one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Local path -> modification time before the overwrite (`None` = new file).
    pub changes: HashMap<PathBuf, Option<DateTime<Utc>>>,
    /// In outcome order.
    pub failures: Vec<FailedDownload>,
    /// Local paths produced by more than one sourcemap. Last write wins.
    pub conflicts: Vec<PathBuf>,
}

impl ChangeSet {
    pub fn from_outcomes(outcomes: &[ExtractionOutcome]) -> Self {
        let mut change_set = ChangeSet::default();
        let mut owners: HashMap<&PathBuf, &str> = HashMap::new();

        for outcome in outcomes {
            if !outcome.success {
                change_set.failures.push(FailedDownload {
                    url: outcome.url.clone(),
                    error: outcome
                        .error
                        .clone()
                        .unwrap_or_else(|| "Unknown error".to_string()),
                });
            }

            // A failed job may still have written files before it stopped

            for file in &outcome.files {
                if let Some(previous) = owners.insert(&file.path, &outcome.url) {
                    if previous != outcome.url && !change_set.conflicts.contains(&file.path) {
                        change_set.conflicts.push(file.path.clone());
                    }
                }
                if file.is_changed {
                    change_set
                        .changes
                        .insert(file.path.clone(), file.previous_modified_time);
                }
            }
        }

        change_set.conflicts.sort_by(|a, b| locale_compare(&display(a), &display(b)));
        change_set
    }

    pub fn changed_count(&self) -> usize {
        self.changes.len()
    }

    /// Nothing changed and nothing failed: the run is a no-op.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.failures.is_empty()
    }

    /// Changed paths in report order.
    pub fn sorted_changes(&self) -> Vec<(&PathBuf, Option<DateTime<Utc>>)> {
        let mut entries: Vec<_> = self.changes.iter().map(|(p, t)| (p, *t)).collect();
        entries.sort_by(|(a, _), (b, _)| locale_compare(&display(a), &display(b)));
        entries
    }
}

/// Both rendered reports plus the data they were rendered from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeReport {
    pub change_set: ChangeSet,
    pub commit_message: String,
    pub notification_message: String,
}

impl ChangeReport {
    pub fn has_content(&self) -> bool {
        !self.change_set.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ReportLine {
    Text(String),
    Blank,
    BlockMarker,
}

pub struct ChangeReportBuilder {
    now: Option<DateTime<Utc>>,
}

impl ChangeReportBuilder {
    pub fn new() -> Self {
        Self { now: None }
    }

    /// Pins the reference time for relative phrases.
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    pub fn build(&self, outcomes: &[ExtractionOutcome]) -> ChangeReport {
        let change_set = ChangeSet::from_outcomes(outcomes);
        let header = format!("chore: Changed {} file(s)", change_set.changed_count());
        let body = self.body_lines(&change_set);

        let mut commit_message = header;
        if !body.is_empty() {
            commit_message.push_str("\n\n");
            commit_message.push_str(&render(&body, false));
        }
        let notification_message = render(&body, true);

        ChangeReport {
            change_set,
            commit_message,
            notification_message,
        }
    }

    fn body_lines(&self, change_set: &ChangeSet) -> Vec<ReportLine> {
        let now = self.now.unwrap_or_else(Utc::now);
        let mut lines = Vec::new();

        if change_set.changed_count() > 0 {
            lines.push(ReportLine::Text("Changed files:".to_string()));
            lines.push(ReportLine::BlockMarker);
            for (path, previous) in change_set.sorted_changes() {
                let suffix = match previous {
                    Some(time) => RelativeTimeFormatter::format_from(time, now),
                    None => "new".to_string(),
                };
                lines.push(ReportLine::Text(format!("{} ({})", display(path), suffix)));
            }
            lines.push(ReportLine::BlockMarker);
        }

        if !change_set.failures.is_empty() {
            if !lines.is_empty() {
                lines.push(ReportLine::Blank);
            }
            lines.push(ReportLine::Text("Failed downloads:".to_string()));
            lines.push(ReportLine::BlockMarker);
            for failure in &change_set.failures {
                lines.push(ReportLine::Text(format!("{} ({})", failure.url, failure.error)));
            }
            lines.push(ReportLine::BlockMarker);
        }

        lines
    }
}

impl Default for ChangeReportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn render(lines: &[ReportLine], with_markers: bool) -> String {
    lines
        .iter()
        .filter_map(|line| match line {
            ReportLine::Text(text) => Some(text.as_str()),
            ReportLine::Blank => Some(""),
            ReportLine::BlockMarker if with_markers => Some(BLOCK_MARKER),
            ReportLine::BlockMarker => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn display(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// ASCII whitespace, punctuation and symbols in root collation order.
const SYMBOL_ORDER: &str = "\t\n\x0b\x0c\r _-,;:!?.'\"()[]{}@*/\\&#%`^+<=>|~$";

/// Symbols sort before digits, digits before letters.
fn primary_weight(c: char) -> (u8, u32) {
    if let Some(position) = SYMBOL_ORDER.find(c) {
        (0, position as u32)
    } else if c.is_ascii_digit() {
        (1, c as u32)
    } else {
        (2, c.to_lowercase().next().unwrap_or(c) as u32)
    }
}

/// Approximates the root-locale collator for ASCII paths: case-insensitive
/// primary order with symbols first, then lowercase before uppercase on
/// ties. Non-ASCII letters sort after `z` by code point.
fn locale_compare(a: &str, b: &str) -> Ordering {
    a.chars()
        .map(primary_weight)
        .cmp(b.chars().map(primary_weight))
        .then_with(|| b.cmp(a))
}
