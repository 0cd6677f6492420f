//! HTTP client for the Morningstar China fund API.
//!
//! Every resource lives at `GET <base>/<code>/<resource>` and answers with an
//! envelope `{"_meta": {"response_status": "200011"}, "data": {...}}`. The
//! envelope is stripped here, once, and callers receive the typed payload.

use crate::core::config::MorningstarProviderConfig;
use crate::core::error::{Endpoint, FetchError};
use crate::core::payload::{FeesData, IdentityData, PerformanceData};
use crate::core::provider::FundDataProvider;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// `response_status` of a successful call.
const STATUS_OK: &str = "200011";

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(rename = "_meta")]
    meta: Meta,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct Meta {
    response_status: String,
}

pub struct MorningstarProvider {
    base_url: String,
    client: reqwest::Client,
}

impl MorningstarProvider {
    pub fn new(config: &MorningstarProviderConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(MorningstarProvider {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, code: &str, endpoint: Endpoint) -> String {
        format!("{}/{}/{}", self.base_url, code, endpoint.resource())
    }

    async fn get_endpoint<T: DeserializeOwned>(
        &self,
        code: &str,
        endpoint: Endpoint,
    ) -> Result<T, FetchError> {
        let url = self.url(code, endpoint);
        debug!(code, %endpoint, url = %url, "Requesting");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            debug!(code, %endpoint, status = status.as_u16(), "Non-success status");
            return Err(FetchError::Http {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(classify_transport)?;
        let envelope: Envelope<serde_json::Value> =
            serde_json::from_slice(&body).map_err(decode_error)?;

        if envelope.meta.response_status != STATUS_OK {
            return Err(FetchError::UpstreamStatus {
                status: envelope.meta.response_status,
            });
        }
        let data = envelope.data.ok_or(FetchError::UpstreamStatus {
            status: format!("{STATUS_OK} without data"),
        })?;
        // A second `data` layer would decode into an all-empty payload.
        if data.get("data").is_some() {
            return Err(FetchError::Decode {
                message: "payload is still wrapped in a data object".to_string(),
            });
        }
        serde_json::from_value(data).map_err(decode_error)
    }
}

fn decode_error(err: serde_json::Error) -> FetchError {
    FetchError::Decode {
        message: err.to_string(),
    }
}

fn classify_transport(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else if err.is_decode() {
        FetchError::Decode {
            message: err.to_string(),
        }
    } else {
        FetchError::Connection {
            message: err.to_string(),
        }
    }
}

#[async_trait]
impl FundDataProvider for MorningstarProvider {
    async fn fetch_identity(&self, code: &str) -> Result<IdentityData, FetchError> {
        self.get_endpoint(code, Endpoint::CommonData).await
    }

    async fn fetch_performance(&self, code: &str) -> Result<PerformanceData, FetchError> {
        self.get_endpoint(code, Endpoint::Performance).await
    }

    async fn fetch_fees(&self, code: &str) -> Result<FeesData, FetchError> {
        self.get_endpoint(code, Endpoint::Fees).await
    }
}
