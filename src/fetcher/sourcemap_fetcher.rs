use crate::error::FetchError;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

/// The parts of a sourcemap this tool cares about. `sources` and
/// `sources_content` are index-aligned and always the same length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcemapDocument {
    pub sources: Vec<String>,
    pub sources_content: Vec<Option<String>>,
}

#[derive(Deserialize)]
struct RawSourcemap {
    sources: Option<Vec<String>>,
    #[serde(rename = "sourcesContent")]
    sources_content: Option<Vec<Option<String>>>,
}

impl SourcemapDocument {
    pub fn from_slice(body: &[u8]) -> Result<Self, FetchError> {
        let raw: RawSourcemap =
            serde_json::from_slice(body).map_err(|_| FetchError::InvalidFormat)?;

        match (raw.sources, raw.sources_content) {
            (Some(sources), Some(sources_content)) if sources.len() == sources_content.len() => {
                Ok(Self {
                    sources,
                    sources_content,
                })
            }
            _ => Err(FetchError::InvalidFormat),
        }
    }

    /// `(source, content)` pairs that carry non-empty embedded content.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.sources
            .iter()
            .zip(&self.sources_content)
            .filter_map(|(source, content)| match content.as_deref() {
                Some(content) if !content.is_empty() => Some((source.as_str(), content)),
                _ => None,
            })
    }
}

/// Anything that can produce a decoded sourcemap for a URL.
#[async_trait]
pub trait SourcemapSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<SourcemapDocument, FetchError>;
}

/// Fetches sourcemaps over HTTP. One attempt per URL, no retries.
pub struct SourcemapFetcher {
    client: reqwest::Client,
}

impl SourcemapFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourcemapSource for SourcemapFetcher {
    async fn fetch(&self, url: &str) -> Result<SourcemapDocument, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                code: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| FetchError::Transport {
            message: e.to_string(),
        })?;
        debug!(url, bytes = body.len(), "Fetched sourcemap");

        SourcemapDocument::from_slice(&body)
    }
}
