use crate::error::FetchError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use url::Url;

/// Outcome of the revision-manifest refresh. Independent of the sourcemap
/// pipeline: a failure here never affects extraction or the exit code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RevisionsOutcome {
    Skipped,
    Updated { count: usize, path: PathBuf },
    Failed { error: String },
}

impl RevisionsOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, RevisionsOutcome::Failed { .. })
    }
}

#[derive(Debug, Deserialize)]
struct RevisionManifest {
    #[serde(default)]
    js: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    css: BTreeMap<String, serde_json::Value>,
}

impl RevisionManifest {
    fn paths(self) -> BTreeSet<String> {
        self.js.into_keys().chain(self.css.into_keys()).collect()
    }
}

pub struct RevisionsRefresher {
    client: reqwest::Client,
    manifest_url: Url,
}

impl RevisionsRefresher {
    pub fn new(client: reqwest::Client, base_url: &Url) -> Result<Self, url::ParseError> {
        Ok(Self {
            client,
            manifest_url: base_url.join("/js/revisions.json")?,
        })
    }

    pub fn manifest_url(&self) -> &Url {
        &self.manifest_url
    }

    /// Downloads the manifest and writes the sorted union of its `js` and
    /// `css` keys to `output` as a JSON array.
    pub async fn refresh(&self, output: &Path) -> RevisionsOutcome {
        match self.try_refresh(output).await {
            Ok(count) => {
                info!(count, path = %output.display(), "Revision manifest updated");
                RevisionsOutcome::Updated {
                    count,
                    path: output.to_path_buf(),
                }
            }
            Err(error) => {
                warn!(url = %self.manifest_url, %error, "Revision manifest refresh failed");
                RevisionsOutcome::Failed {
                    error: error.to_string(),
                }
            }
        }
    }

    async fn try_refresh(&self, output: &Path) -> Result<usize, FetchError> {
        let manifest: RevisionManifest = self
            .client
            .get(self.manifest_url.clone())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let paths = manifest.paths();
        let json = serde_json::to_string_pretty(&paths).map_err(|_| FetchError::InvalidFormat)?;
        tokio::fs::write(output, json).await?;

        Ok(paths.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_refresh_writes_sorted_union() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/js/revisions.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "js": {"/js/b": "r2", "/js/a": "r1"},
                "css": {"/css/main": "r3", "/js/a": "r1"}
            })))
            .expect(1)
            .mount(&mock_server)
            .await;
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("revisions.json");

        let base = Url::parse(&mock_server.uri()).unwrap();
        let refresher = RevisionsRefresher::new(reqwest::Client::new(), &base).unwrap();
        let outcome = refresher.refresh(&output).await;

        assert_eq!(outcome, RevisionsOutcome::Updated { count: 3, path: output.clone() });
        let written: Vec<String> =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written, vec!["/css/main", "/js/a", "/js/b"]);
    }

    #[tokio::test]
    async fn test_refresh_failure_is_reported_not_raised() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/js/revisions.json"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("revisions.json");

        let base = Url::parse(&mock_server.uri()).unwrap();
        let refresher = RevisionsRefresher::new(reqwest::Client::new(), &base).unwrap();
        let outcome = refresher.refresh(&output).await;

        assert_eq!(outcome, RevisionsOutcome::Failed { error: "HTTP 503".to_string() });
        assert!(outcome.is_failure());
        assert!(!output.exists());
    }

    #[test]
    fn test_manifest_url_is_rooted() {
        let base = Url::parse("https://cdn.example.com/some/prefix").unwrap();
        let refresher = RevisionsRefresher::new(reqwest::Client::new(), &base).unwrap();
        assert_eq!(refresher.manifest_url().as_str(), "https://cdn.example.com/js/revisions.json");
    }
}
