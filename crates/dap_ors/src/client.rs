use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::{headers::OrsHeaders, ors_api::OrsEndpoint};

#[derive(Debug, Error)]
pub enum OrsError {
    #[error("Connection to backend failed: {0}")]
    Request(reqwest::Error),

    #[error("Backend did not answer in time: {0}")]
    Timeout(reqwest::Error),

    #[error("Invalid {0} header value")]
    InvalidHeader(&'static str),
}

impl From<reqwest::Error> for OrsError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            OrsError::Timeout(error)
        } else {
            OrsError::Request(error)
        }
    }
}

/// Raw backend answer, passed on without interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrsResponse {
    pub status: u16,
    pub body: String,
    pub content_type: Option<String>,
}

impl OrsResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub struct OrsClientParams {
    pub base_url: String,
    pub timeout: Duration,
}

pub struct OrsClient {
    params: OrsClientParams,
    client: reqwest::Client,
}

impl OrsClient {
    pub fn new(params: OrsClientParams) -> Result<Self, OrsError> {
        let client = reqwest::Client::builder().timeout(params.timeout).build()?;

        Ok(Self { params, client })
    }

    pub fn base_url(&self) -> &str {
        &self.params.base_url
    }

    /// Posts `body` to `{base_url}{endpoint}`. `base_url` defaults to the
    /// configured backend. Nothing is retried.
    pub async fn relay(
        &self,
        base_url: Option<&str>,
        endpoint: &OrsEndpoint,
        headers: &OrsHeaders,
        body: &Value,
    ) -> Result<OrsResponse, OrsError> {
        let base_url = base_url.unwrap_or(&self.params.base_url);
        let url = format!("{}{}", base_url.trim_end_matches('/'), endpoint.path());

        debug!("OrsClient: POST {}", url);

        let response = self
            .client
            .post(&url)
            .headers(headers.to_header_map()?)
            .json(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response.text().await?;

        debug!("OrsClient: {} answered with status {}", url, status);

        Ok(OrsResponse {
            status,
            body,
            content_type,
        })
    }
}
