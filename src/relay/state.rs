use std::sync::Arc;

use anyhow::{Context, Result};
use url::Url;

use super::error::RelayError;
use crate::config::RelayConfig;

/// Shared relay state passed to all handlers.
#[derive(Clone)]
pub struct RelayState {
    pub http: reqwest::Client,
    pub config: Arc<RelayConfig>,
    upstream: Arc<Url>,
}

impl RelayState {
    pub fn new(config: RelayConfig) -> Result<Self> {
        let upstream = Url::parse(&config.upstream_base)
            .with_context(|| format!("invalid upstream base URL {}", config.upstream_base))?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            config: Arc::new(config),
            upstream: Arc::new(upstream),
        })
    }

    pub fn upstream_base(&self) -> &Url {
        &self.upstream
    }

    /// Resolve a logical path onto the upstream, appending passthrough query pairs.
    pub fn upstream_url(&self, path: &str, query: &[(String, String)]) -> Result<Url, RelayError> {
        let base = self.upstream.as_str().trim_end_matches('/');
        let sep = if path.starts_with('/') { "" } else { "/" };
        let mut url = Url::parse(&format!("{base}{sep}{path}"))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Soft checks apply only to GET requests under the configured prefix.
    pub fn soft_check_applies(&self, method: &axum::http::Method, path: &str) -> bool {
        *method == axum::http::Method::GET && path.starts_with(&self.config.soft_check_prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;

    fn state(base: &str) -> RelayState {
        RelayState::new(RelayConfig {
            upstream_base: base.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn joins_path_onto_base() {
        let s = state("https://api.example.com");
        let url = s.upstream_url("/api/predictions/pool/abc", &[]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/api/predictions/pool/abc");

        let s = state("https://api.example.com/");
        let url = s.upstream_url("api/markets", &[]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/api/markets");
    }

    #[test]
    fn appends_query_in_order() {
        let s = state("http://localhost:9000");
        let query = vec![
            ("limit".to_string(), "10".to_string()),
            ("q".to_string(), "a b".to_string()),
        ];
        let url = s.upstream_url("/api/markets", &query).unwrap();
        assert_eq!(url.as_str(), "http://localhost:9000/api/markets?limit=10&q=a+b");
    }

    #[test]
    fn soft_check_scope() {
        let s = state("http://localhost:9000");
        assert!(s.soft_check_applies(&Method::GET, "/api/predictions/pool/abc"));
        assert!(!s.soft_check_applies(&Method::POST, "/api/predictions/pool/abc"));
        assert!(!s.soft_check_applies(&Method::GET, "/api/markets"));
    }

    #[test]
    fn rejects_invalid_base() {
        let err = RelayState::new(RelayConfig {
            upstream_base: "not a url".to_string(),
            ..Default::default()
        });
        assert!(err.is_err());
    }
}
