use crate::error::FetchError;
use crate::extractor::{ContentHasher, LocalFileStore};
use crate::fetcher::SourcemapDocument;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::debug;

/// Result of reconciling one embedded source against the mirror.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub is_changed: bool,
    /// Set only when the file already existed and its content changed.
    pub previous_modified_time: Option<DateTime<Utc>>,
}

impl FileOutcome {
    pub fn is_new(&self) -> bool {
        self.is_changed && self.previous_modified_time.is_none()
    }
}

/// Result of one sourcemap URL job. Built once, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionOutcome {
    pub url: String,
    pub success: bool,
    pub error: Option<String>,
    pub files: Vec<FileOutcome>,
}

impl ExtractionOutcome {
    pub fn succeeded(url: impl Into<String>, files: Vec<FileOutcome>) -> Self {
        Self {
            url: url.into(),
            success: true,
            error: None,
            files,
        }
    }

    pub fn failed(url: impl Into<String>, error: &FetchError) -> Self {
        Self {
            url: url.into(),
            success: false,
            error: Some(error.to_string()),
            files: Vec::new(),
        }
    }

    /// Entries reconciled before the job failed. Their writes already
    /// happened and must still be reported.
    pub fn with_files(mut self, files: Vec<FileOutcome>) -> Self {
        self.files = files;
        self
    }

    pub fn changed_files(&self) -> impl Iterator<Item = &FileOutcome> {
        self.files.iter().filter(|f| f.is_changed)
    }
}

/// An extraction that stopped at `error`. `files` holds every entry
/// reconciled before it.
#[derive(Debug)]
pub struct PartialExtraction {
    pub files: Vec<FileOutcome>,
    pub error: FetchError,
}

fn scheme_prefix() -> &'static Regex {
    static SCHEME: OnceLock<Regex> = OnceLock::new();
    SCHEME.get_or_init(|| Regex::new(r"^[a-z]+://").expect("scheme pattern is valid"))
}

/// Strips a leading `scheme://` (e.g. `webpack://`) from a sourcemap entry.
pub fn strip_scheme(source: &str) -> &str {
    match scheme_prefix().find(source) {
        Some(m) => &source[m.end()..],
        None => source,
    }
}

pub struct SourceExtractor {
    store: LocalFileStore,
}

impl SourceExtractor {
    pub fn new(store: LocalFileStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &LocalFileStore {
        &self.store
    }

    /// Writes every new or changed embedded source into the mirror and
    /// classifies each one. Entries without content are skipped. The first
    /// failing entry stops the extraction; earlier outcomes are kept.
    pub async fn extract(
        &self,
        document: &SourcemapDocument,
    ) -> Result<Vec<FileOutcome>, PartialExtraction> {
        let mut outcomes = Vec::new();

        for (source, content) in document.entries() {
            let local_path = self.store.resolve(strip_scheme(source));
            match self.reconcile(local_path, content).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(error) => {
                    return Err(PartialExtraction {
                        files: outcomes,
                        error,
                    })
                }
            }
        }

        Ok(outcomes)
    }

    async fn reconcile(&self, local_path: PathBuf, content: &str) -> Result<FileOutcome, FetchError> {
        let _guard = self.store.lock_path(&local_path).await;
        let new_hash = ContentHasher::hash(content);

        let (is_changed, previous_modified_time) = if self.store.exists(&local_path).await {
            let existing = self.store.read_bytes(&local_path).await?;
            if ContentHasher::hash(&existing) == new_hash {
                (false, None)
            } else {
                // Must be captured before the overwrite below
                let mtime = self.store.modified_time(&local_path).await?;
                (true, Some(mtime))
            }
        } else {
            (true, None)
        };

        if is_changed {
            self.store.write_text(&local_path, content).await?;
            debug!(
                path = %local_path.display(),
                new = previous_modified_time.is_none(),
                "Wrote changed source"
            );
        } else {
            debug!(path = %local_path.display(), "Source unchanged");
        }

        Ok(FileOutcome {
            path: local_path,
            is_changed,
            previous_modified_time,
        })
    }
}
