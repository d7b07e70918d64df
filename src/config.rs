use crate::error::{MirrorError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub remote: RemoteConfig,
    pub mirror: MirrorConfig,
    pub batch: BatchConfig,
    pub report: ReportConfig,
    pub revisions: RevisionsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub base_url: String,
    pub cookie_name: String,
    pub timeout: u64,
    pub user_agent: String,
    /// Credential token. Never read from or written to the config file.
    #[serde(skip)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MirrorConfig {
    pub root: PathBuf,
    pub links_file: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BatchConfig {
    pub size: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportConfig {
    pub directory: PathBuf,
    pub commit_message_file: String,
    pub notification_message_file: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RevisionsConfig {
    pub enabled: bool,
    pub output_file: PathBuf,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(), // Must be provided
            cookie_name: "session".to_string(),
            timeout: 30,
            user_agent: format!("mapmirror/{}", env!("CARGO_PKG_VERSION")),
            token: None,
        }
    }
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            links_file: PathBuf::from("links.json"),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { size: 10 }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            commit_message_file: "commit-message.txt".to_string(),
            notification_message_file: "telegram-message.txt".to_string(),
        }
    }
}

impl Default for RevisionsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            output_file: PathBuf::from("revisions.json"),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(MirrorError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| MirrorError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| MirrorError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_paths = ["mapmirror.toml", ".mapmirror.toml"];

                for default_path in &default_paths {
                    if Path::new(default_path).exists() {
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(ref base_url) = cli_args.base_url {
            self.remote.base_url = base_url.clone();
        }

        if let Some(ref token) = cli_args.token {
            self.remote.token = Some(token.clone());
        }

        if let Some(ref links_file) = cli_args.links_file {
            self.mirror.links_file = links_file.clone();
        }

        if let Some(ref root) = cli_args.mirror_root {
            self.mirror.root = root.clone();
        }

        if let Some(ref directory) = cli_args.report_dir {
            self.report.directory = directory.clone();
        }

        if let Some(batch_size) = cli_args.batch_size {
            self.batch.size = batch_size;
        }

        if let Some(timeout) = cli_args.timeout {
            self.remote.timeout = timeout;
        }

        if cli_args.refresh_revisions {
            self.revisions.enabled = true;
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| MirrorError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        std::fs::write(path, content).map_err(|e| MirrorError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.remote.base_url.trim().is_empty() {
            return Err(MirrorError::Config {
                message: "remote.base_url must be set (or pass --base-url)".to_string(),
            });
        }

        let base = self.base_url()?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(MirrorError::Config {
                message: format!("Unsupported scheme in base_url: {}", base.scheme()),
            });
        }

        if self.batch.size == 0 {
            return Err(MirrorError::Config {
                message: "Batch size must be greater than 0".to_string(),
            });
        }

        if self.remote.timeout == 0 {
            return Err(MirrorError::Config {
                message: "Request timeout must be greater than 0".to_string(),
            });
        }

        if self.report.commit_message_file.trim().is_empty()
            || self.report.notification_message_file.trim().is_empty()
        {
            return Err(MirrorError::Config {
                message: "Report file names must not be empty".to_string(),
            });
        }

        Ok(())
    }

    pub fn base_url(&self) -> Result<Url> {
        Url::parse(self.remote.base_url.trim()).map_err(|e| MirrorError::Config {
            message: format!("Invalid base_url '{}': {}", self.remote.base_url, e),
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.remote.timeout)
    }

    pub fn commit_message_path(&self) -> PathBuf {
        self.report.directory.join(&self.report.commit_message_file)
    }

    pub fn notification_message_path(&self) -> PathBuf {
        self.report
            .directory
            .join(&self.report.notification_message_file)
    }

    pub fn create_sample_config() -> String {
        let mut sample_config = Self::default();
        sample_config.remote.base_url = "https://cdn.example.com".to_string();
        toml::to_string_pretty(&sample_config).unwrap_or_else(|_| String::new())
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub links_file: Option<PathBuf>,
    pub mirror_root: Option<PathBuf>,
    pub report_dir: Option<PathBuf>,
    pub batch_size: Option<usize>,
    pub timeout: Option<u64>,
    pub refresh_revisions: bool,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn with_links_file(mut self, links_file: Option<PathBuf>) -> Self {
        self.links_file = links_file;
        self
    }

    pub fn with_mirror_root(mut self, root: Option<PathBuf>) -> Self {
        self.mirror_root = root;
        self
    }

    pub fn with_report_dir(mut self, directory: Option<PathBuf>) -> Self {
        self.report_dir = directory;
        self
    }

    pub fn with_batch_size(mut self, batch_size: Option<usize>) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<u64>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_refresh_revisions(mut self, refresh: bool) -> Self {
        self.refresh_revisions = refresh;
        self
    }
}
