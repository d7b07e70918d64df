use crate::config::Config;
use crate::error::{MirrorError, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, COOKIE};

/// Builds the client shared by every request of a run. The credential cookie
/// is attached as a default header so individual requests never handle it.
pub fn build_client(config: &Config) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    if let Some(ref token) = config.remote.token {
        let mut cookie = HeaderValue::from_str(&format!("{}={}", config.remote.cookie_name, token))
            .map_err(|e| MirrorError::Http {
                message: format!("Invalid credential token: {}", e),
            })?;
        cookie.set_sensitive(true);
        headers.insert(COOKIE, cookie);
    }

    reqwest::Client::builder()
        .timeout(config.request_timeout())
        .user_agent(config.remote.user_agent.clone())
        .default_headers(headers)
        .build()
        .map_err(|e| MirrorError::Http {
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_client_with_token() {
        let mut config = Config::default();
        config.remote.token = Some("abc123".to_string());
        assert!(build_client(&config).is_ok());
    }

    #[test]
    fn test_token_with_newline_is_rejected() {
        let mut config = Config::default();
        config.remote.token = Some("abc\n123".to_string());
        assert!(matches!(build_client(&config), Err(MirrorError::Http { .. })));
    }
}
