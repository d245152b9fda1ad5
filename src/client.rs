use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::types::{MarketWindow, PoolCheck};
use crate::{PATH_PARAM, POOL_PATH_PREFIX, SOFT_CHECK_PARAM};

/// Client for a running relay (e.g. `http://localhost:8080/relay`).
#[derive(Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    relay_url: Url,
}

impl RelayClient {
    pub fn new(relay_url: &str, timeout: Duration) -> Result<Self> {
        let relay_url =
            Url::parse(relay_url).with_context(|| format!("invalid relay URL {relay_url}"))?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http, relay_url })
    }

    /// Relay URL for a logical upstream path plus extra query pairs.
    pub fn url_for(&self, path: &str, query: &[(&str, &str)]) -> Url {
        let mut url = self.relay_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair(PATH_PARAM, path);
            for (k, v) in query {
                pairs.append_pair(k, v);
            }
        }
        url
    }

    /// GET a logical path through the relay.
    ///
    /// Non-2xx relay answers become errors carrying the relay's `error` field.
    pub async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value> {
        let url = self.url_for(path, query);
        let response = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("relay request for {path} failed"))?;
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .with_context(|| format!("relay returned invalid JSON for {path}"))?;

        if !status.is_success() {
            let msg = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            let origin = if body.get("upstream").and_then(Value::as_bool) == Some(true) {
                "upstream"
            } else {
                "relay"
            };
            bail!("{origin} error {status} for {path}: {msg}");
        }

        debug!("Fetched {path} ({status})");
        Ok(body)
    }

    /// Soft existence check for a prediction pool. Never fails on upstream
    /// errors; only a broken relay connection is an error.
    pub async fn pool_exists(&self, pool_id: &str) -> Result<PoolCheck> {
        let path = format!("{POOL_PATH_PREFIX}{pool_id}");
        let body = self.get_json(&path, &[(SOFT_CHECK_PARAM, "1")]).await?;
        serde_json::from_value(body).context("unexpected soft-check response shape")
    }

    /// Fetch a market/event object and keep the fields the classifier needs.
    pub async fn fetch_market(&self, path: &str) -> Result<MarketWindow> {
        let body = self.get_json(path, &[]).await?;
        serde_json::from_value(body).with_context(|| format!("unexpected market shape at {path}"))
    }
}
