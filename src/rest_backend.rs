//! Search procedures over a PostgREST-style RPC endpoint.
//!
//! Each procedure is `POST {url}/rest/v1/rpc/{name}` with the parameter
//! record as the JSON body. The service key is sent both as the `apikey`
//! header and as a bearer token.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use pmmsherpa_core::backend::{
    HybridSearchParams, HybridSearchRow, MatchChunksParams, MatchChunksRow, SearchBackend,
    HYBRID_SEARCH, MATCH_CHUNKS,
};
use pmmsherpa_core::error::UpstreamError;

use crate::config::BackendConfig;

pub struct RestRpcBackend {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl RestRpcBackend {
    pub fn new(base_url: &str, service_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let service_key = service_key.into();
        if service_key.trim().is_empty() {
            bail!("service key must not be empty");
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
        })
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("backend.url required for rest backend"))?;
        let key = std::env::var(&config.service_key_env).map_err(|_| {
            anyhow::anyhow!("{} environment variable not set", config.service_key_env)
        })?;
        Self::new(url, key, Duration::from_secs(config.timeout_secs))
    }

    fn rpc_url(&self, procedure: &str) -> String {
        format!("{}/rest/v1/rpc/{}", self.base_url, procedure)
    }

    async fn call<P, R>(&self, procedure: &str, params: &P) -> Result<Vec<R>, UpstreamError>
    where
        P: Serialize + Sync,
        R: DeserializeOwned,
    {
        debug!(procedure, "rpc call");

        let response = self
            .client
            .post(self.rpc_url(procedure))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .json(params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    UpstreamError::timeout(procedure)
                } else {
                    UpstreamError::rpc(procedure, e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::rpc(procedure, format!("HTTP {}: {}", status, body)));
        }

        response
            .json::<Vec<R>>()
            .await
            .map_err(|e| UpstreamError::invalid_response(procedure, e.to_string()))
    }
}

#[async_trait]
impl SearchBackend for RestRpcBackend {
    fn name(&self) -> &str {
        "rest"
    }

    async fn hybrid_search(
        &self,
        params: &HybridSearchParams,
    ) -> Result<Vec<HybridSearchRow>, UpstreamError> {
        self.call(HYBRID_SEARCH, params).await
    }

    async fn match_chunks(
        &self,
        params: &MatchChunksParams,
    ) -> Result<Vec<MatchChunksRow>, UpstreamError> {
        self.call(MATCH_CHUNKS, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_url() {
        let timeout = Duration::from_secs(1);
        let b = RestRpcBackend::new("https://kb.example.co/", "key", timeout).unwrap();
        assert_eq!(
            b.rpc_url("hybrid_search"),
            "https://kb.example.co/rest/v1/rpc/hybrid_search"
        );
    }

    #[test]
    fn test_rejects_blank_key() {
        let timeout = Duration::from_secs(1);
        let backend = RestRpcBackend::new("https://kb.example.co", "", timeout);
        assert!(backend.is_err());
    }
}
