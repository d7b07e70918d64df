use crate::config::{CliOverrides, Config};
use crate::error::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "mapmirror")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Mirror original sources embedded in remote sourcemaps and report what changed")]
#[command(
    long_about = "MapMirror downloads a list of JS/CSS sourcemaps, writes the original sources \
                  they embed into a local mirror, and produces a commit message and a \
                  notification message describing which files changed since the last run."
)]
#[command(after_help = "EXAMPLES:\n  \
    mapmirror --base-url https://cdn.example.com --links links.json\n  \
    MAPMIRROR_TOKEN=... mapmirror --config mapmirror.toml --batch-size 5\n  \
    mapmirror --base-url https://cdn.example.com --dry-run --output-format json\n  \
    mapmirror --generate-config --config mapmirror.toml")]
pub struct Cli {
    /// JSON file listing sourcemap path fragments
    #[arg(short, long, help = "Path to links.json (array of path fragments)")]
    pub links: Option<PathBuf>,

    /// Scheme and host the fragments are resolved against
    #[arg(long, value_parser = validate_base_url)]
    pub base_url: Option<String>,

    /// Session token sent as the credential cookie
    #[arg(long, env = "MAPMIRROR_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Root directory of the local mirror
    #[arg(short, long)]
    pub mirror_root: Option<PathBuf>,

    /// Directory the report files are written to
    #[arg(long)]
    pub report_dir: Option<PathBuf>,

    /// Number of sourcemaps fetched concurrently
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    pub batch_size: Option<u64>,

    /// Request timeout in seconds
    #[arg(long, help = "Timeout for each HTTP request (seconds)")]
    pub timeout: Option<u64>,

    /// Also refresh revisions.json from the remote manifest
    #[arg(long)]
    pub refresh_revisions: bool,

    /// Configuration file path
    #[arg(short, long, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Verbose output level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Compare against the mirror without writing files or reports
    #[arg(long)]
    pub dry_run: bool,

    /// Generate sample configuration file
    #[arg(long, help = "Generate a sample configuration file")]
    pub generate_config: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        CliOverrides::new()
            .with_base_url(self.base_url.clone())
            .with_token(self.token.clone())
            .with_links_file(self.links.clone())
            .with_mirror_root(self.mirror_root.clone())
            .with_report_dir(self.report_dir.clone())
            .with_batch_size(self.batch_size.map(|n| n as usize))
            .with_timeout(self.timeout)
            .with_refresh_revisions(self.refresh_revisions)
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }

    /// Default tracing directive for the chosen verbosity.
    pub fn log_filter(&self) -> &'static str {
        match self.verbosity_level() {
            _ if self.quiet => "mapmirror=error",
            0 => "mapmirror=warn",
            1 => "mapmirror=info",
            2 => "mapmirror=debug",
            _ => "mapmirror=trace",
        }
    }
}

pub fn validate_base_url(s: &str) -> std::result::Result<String, String> {
    let url =
        Url::parse(s).map_err(|_| "Invalid URL format. Please provide a valid URL.".to_string())?;

    match url.scheme() {
        "https" | "http" => {}
        other => return Err(format!("Unsupported scheme '{}': use http or https", other)),
    }

    if url.host_str().is_none_or(|h| h.is_empty()) {
        return Err("URL must include a valid hostname".to_string());
    }

    Ok(s.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["mapmirror"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_valid_base_urls() {
        assert_eq!(validate_base_url("https://cdn.example.com").unwrap(), "https://cdn.example.com");
        assert_eq!(validate_base_url("http://127.0.0.1:8080/").unwrap(), "http://127.0.0.1:8080");
    }

    #[test]
    fn test_invalid_base_urls() {
        for url in ["not-a-url", "ftp://cdn.example.com", "file:///etc/passwd"] {
            assert!(validate_base_url(url).is_err(), "Should reject: {}", url);
        }
    }

    #[test]
    fn test_overrides_from_args() {
        let cli = parse(&[
            "--base-url",
            "https://cdn.example.com",
            "--links",
            "maps.json",
            "-b",
            "4",
            "--refresh-revisions",
        ]);

        let mut config = Config::default();
        config.merge_with_cli_args(&cli.create_cli_overrides());

        assert_eq!(config.remote.base_url, "https://cdn.example.com");
        assert_eq!(config.mirror.links_file, PathBuf::from("maps.json"));
        assert_eq!(config.batch.size, 4);
        assert!(config.revisions.enabled);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let result = Cli::try_parse_from(["mapmirror", "--batch-size", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["mapmirror", "-q", "-v"]).is_err());
    }

    #[test]
    fn test_log_filter() {
        assert_eq!(parse(&[]).log_filter(), "mapmirror=warn");
        assert_eq!(parse(&["-vv"]).log_filter(), "mapmirror=debug");
        assert_eq!(parse(&["-q"]).log_filter(), "mapmirror=error");
    }
}
