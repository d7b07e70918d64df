use thiserror::Error;

/// Run-level failures. These abort the whole run.
#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Failed to load links file {path}: {message}")]
    LinksFile { path: String, message: String },

    #[error("Invalid URL: {url}")]
    InvalidUrl { url: String },

    #[error("HTTP client error: {message}")]
    Http { message: String },

    #[error("Failed to write report {path}: {message}")]
    Report { path: String, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure of a single sourcemap URL. Never aborts the run; it is folded into
/// the job's `ExtractionOutcome` and surfaced in the report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("{message}")]
    Transport { message: String },

    #[error("HTTP {code}")]
    HttpStatus { code: u16 },

    #[error("Invalid sourcemap format")]
    InvalidFormat,

    #[error("IO error: {message}")]
    Io { message: String },
}

impl FetchError {
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Transport { .. } => "transport",
            FetchError::HttpStatus { .. } => "http_status",
            FetchError::InvalidFormat => "invalid_format",
            FetchError::Io { .. } => "io",
        }
    }
}

impl From<std::io::Error> for FetchError {
    fn from(error: std::io::Error) -> Self {
        FetchError::Io {
            message: error.to_string(),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(error: reqwest::Error) -> Self {
        if let Some(status) = error.status() {
            return FetchError::HttpStatus {
                code: status.as_u16(),
            };
        }
        if error.is_decode() {
            return FetchError::InvalidFormat;
        }
        FetchError::Transport {
            message: error.to_string(),
        }
    }
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for MirrorError {
    fn user_message(&self) -> String {
        match self {
            MirrorError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            MirrorError::LinksFile { path, message } => {
                format!("Could not read link list {}: {}", path, message)
            }
            MirrorError::InvalidUrl { url } => {
                format!("Invalid sourcemap URL: {}", url)
            }
            MirrorError::Http { message } => {
                format!("Could not set up HTTP client: {}", message)
            }
            MirrorError::Report { path, message } => {
                format!("Could not write report {}: {}", path, message)
            }
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            MirrorError::Config { .. } => Some(
                "Check your configuration file syntax, or pass --base-url explicitly. Run with --generate-config for a sample.".to_string()
            ),
            MirrorError::LinksFile { .. } => Some(
                "The links file must be a JSON array of path strings, e.g. [\"/js/app\", \"/css/main\"].".to_string()
            ),
            MirrorError::InvalidUrl { .. } => Some(
                "Make sure base_url includes a scheme and host (e.g. https://cdn.example.com).".to_string()
            ),
            MirrorError::Report { .. } => Some(
                "Ensure the report directory exists and is writable.".to_string()
            ),
            _ => None,
        }
    }
}

impl From<url::ParseError> for MirrorError {
    fn from(error: url::ParseError) -> Self {
        MirrorError::InvalidUrl {
            url: error.to_string(),
        }
    }
}

impl From<toml::de::Error> for MirrorError {
    fn from(error: toml::de::Error) -> Self {
        MirrorError::Config {
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MirrorError>;
