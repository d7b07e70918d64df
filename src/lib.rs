pub mod cli;
pub mod config;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod report;
pub mod scheduler;
pub mod ui;

// Public API re-exports
pub use cli::{Cli, OutputFormat};
pub use config::{CliOverrides, Config};
pub use error::{FetchError, MirrorError, Result, UserFriendlyError};

// Core functionality re-exports
pub use extractor::{
    ContentHasher, ExtractionOutcome, FileOutcome, LocalFileStore, PartialExtraction, SourceExtractor,
};
pub use fetcher::{RevisionsOutcome, RevisionsRefresher, SourcemapDocument, SourcemapFetcher, SourcemapSource};
pub use report::{ChangeReport, ChangeReportBuilder, ChangeSet, RelativeTimeFormatter, ReportWriter, RunSummary};
pub use scheduler::{run_batches, BatchProgress};
pub use ui::{OutputFormatter, OutputMode, ProgressManager};

use chrono::Utc;
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Main library interface: one instance drives one sync run.
pub struct SourceMirror {
    config: Config,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
    client: reqwest::Client,
    source: Arc<dyn SourcemapSource>,
    dry_run: bool,
}

impl SourceMirror {
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Result<Self> {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        let progress_manager = ProgressManager::new(!quiet && output_mode == OutputMode::Human);
        let client = fetcher::build_client(&config)?;
        let source = Arc::new(SourcemapFetcher::new(client.clone()));

        Ok(Self {
            config,
            output_formatter,
            progress_manager,
            client,
            source,
            dry_run: false,
        })
    }

    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        let output_mode = match cli_args.output_format {
            OutputFormat::Human => OutputMode::Human,
            OutputFormat::Json => OutputMode::Json,
            OutputFormat::Plain => OutputMode::Plain,
        };

        Ok(Self::new(config, output_mode, cli_args.verbose, cli_args.quiet)?
            .with_dry_run(cli_args.dry_run))
    }

    /// Replaces the HTTP fetcher, e.g. with an in-memory source.
    pub fn with_source(mut self, source: Arc<dyn SourcemapSource>) -> Self {
        self.source = source;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let started_at = Utc::now();
        let start_time = Instant::now();

        self.output_formatter.start_operation("Loading sourcemap list");
        let fragments = load_links(&self.config.mirror.links_file)?;
        let urls = expand_links(&self.config.remote.base_url, &fragments)?;
        self.output_formatter
            .info(&format!("Found {} sourcemaps", urls.len()));

        let outcomes = self.extract_all(urls).await?;
        let revisions = self.refresh_revisions().await;

        let report = ChangeReportBuilder::new().build(&outcomes);
        for conflict in &report.change_set.conflicts {
            warn!(path = %conflict.display(), "Local path produced by more than one sourcemap");
        }

        let reports_written = if self.dry_run {
            false
        } else {
            ReportWriter::new(
                self.config.commit_message_path(),
                self.config.notification_message_path(),
            )
            .write(&report)?
        };

        if !report.has_content() {
            self.output_formatter
                .success("Nothing changed and nothing failed, no report written");
        } else if reports_written {
            self.output_formatter.success(&format!(
                "Wrote {} and {}",
                self.config.commit_message_path().display(),
                self.config.notification_message_path().display()
            ));
        }

        let duration = start_time.elapsed();
        self.output_formatter.info(&format!(
            "Total duration: {}",
            ui::progress::format_duration(duration)
        ));

        Ok(
            RunSummary::new(started_at, duration, &outcomes, &report, revisions)
                .with_dry_run(self.dry_run)
                .with_reports_written(reports_written),
        )
    }

    async fn extract_all(&self, urls: Vec<String>) -> Result<Vec<ExtractionOutcome>> {
        let batch_size = NonZeroUsize::new(self.config.batch.size).ok_or_else(|| MirrorError::Config {
            message: "Batch size must be greater than 0".to_string(),
        })?;

        self.output_formatter.start_operation("Extracting sourcemaps");
        let extractor = SourceExtractor::new(
            LocalFileStore::new(&self.config.mirror.root).with_dry_run(self.dry_run),
        );

        let batch_progress = self.progress_manager.create_batch_progress(urls.len() as u64);
        let progress_callback: &(dyn Fn(&BatchProgress) + Send + Sync) = &|progress| {
            ui::progress::update_batch_progress(&batch_progress, progress);
            self.progress_manager
                .suspend(|| self.output_formatter.print_batch_progress(progress));
        };

        let outcomes = run_batches(
            urls,
            batch_size,
            |url| self.process_url(&extractor, url),
            Some(progress_callback),
        )
        .await;

        let failed = outcomes.iter().filter(|o| !o.success).count();
        ui::progress::finish_progress_with_summary(
            &batch_progress,
            &format!("{} sourcemaps processed, {} failed", outcomes.len(), failed),
            batch_progress.elapsed(),
        );

        Ok(outcomes)
    }

    /// Never fails: every error ends up in the returned outcome, together
    /// with the files reconciled before it.
    async fn process_url(&self, extractor: &SourceExtractor, url: String) -> ExtractionOutcome {
        let document = match self.source.fetch(&url).await {
            Ok(document) => document,
            Err(error) => return self.failed(url, &error, Vec::new()),
        };

        match extractor.extract(&document).await {
            Ok(files) => {
                info!(
                    url = %url,
                    files = files.len(),
                    changed = files.iter().filter(|f| f.is_changed).count(),
                    "Sourcemap processed"
                );
                ExtractionOutcome::succeeded(url, files)
            }
            Err(PartialExtraction { files, error }) => self.failed(url, &error, files),
        }
    }

    fn failed(&self, url: String, error: &FetchError, files: Vec<FileOutcome>) -> ExtractionOutcome {
        warn!(
            url = %url,
            kind = error.kind(),
            written = files.iter().filter(|f| f.is_changed).count(),
            %error,
            "Sourcemap failed"
        );
        ExtractionOutcome::failed(url, error).with_files(files)
    }

    async fn refresh_revisions(&self) -> RevisionsOutcome {
        if !self.config.revisions.enabled || self.dry_run {
            return RevisionsOutcome::Skipped;
        }

        let base_url = match self.config.base_url() {
            Ok(url) => url,
            Err(e) => return RevisionsOutcome::Failed { error: e.to_string() },
        };
        let refresher = match RevisionsRefresher::new(self.client.clone(), &base_url) {
            Ok(refresher) => refresher,
            Err(e) => return RevisionsOutcome::Failed { error: e.to_string() },
        };

        let spinner = self.progress_manager.create_spinner("Refreshing revision manifest");
        let outcome = refresher.refresh(&self.config.revisions.output_file).await;
        spinner.finish_and_clear();

        if let RevisionsOutcome::Failed { ref error } = outcome {
            self.output_formatter
                .warning(&format!("Revision manifest refresh failed: {}", error));
        }

        outcome
    }

    /// Generate sample configuration file
    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        let sample_config = Config::create_sample_config();
        std::fs::write(output_path.as_ref(), sample_config)?;
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Handle error with user-friendly output
    pub fn handle_error(&self, error: &MirrorError) {
        self.output_formatter.print_user_friendly_error(error);
    }
}

/// Reads the JSON array of path fragments.
pub fn load_links<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let links_error = |message: String| MirrorError::LinksFile {
        path: path.display().to_string(),
        message,
    };

    let content = std::fs::read_to_string(path).map_err(|e| links_error(e.to_string()))?;
    serde_json::from_str(&content).map_err(|e| links_error(e.to_string()))
}

/// Turns fragments into `{base_url}{fragment}.map` URLs. Duplicates are
/// dropped, keeping the first occurrence, so no two jobs share a URL.
pub fn expand_links(base_url: &str, fragments: &[String]) -> Result<Vec<String>> {
    let base = base_url.trim_end_matches('/');
    let mut seen = HashSet::new();
    let mut urls = Vec::with_capacity(fragments.len());

    for fragment in fragments {
        let fragment = fragment.trim();
        let separator = if fragment.starts_with('/') { "" } else { "/" };
        let candidate = format!("{}{}{}.map", base, separator, fragment);

        let parsed = url::Url::parse(&candidate).map_err(|_| MirrorError::InvalidUrl {
            url: candidate.clone(),
        })?;

        if seen.insert(parsed.as_str().to_string()) {
            urls.push(candidate);
        }
    }

    Ok(urls)
}

/// Get version information
pub fn version_info() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
